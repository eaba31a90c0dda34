pub mod auth;
pub mod org;
