pub mod auth;
pub mod booking;
pub mod event_type;
pub mod job;
pub mod organization;
pub mod schedule;
pub mod tag;
pub mod user;
