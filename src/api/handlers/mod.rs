pub mod admin;
pub mod auth;
pub mod availability;
pub mod booking;
pub mod calendar;
pub mod event_type;
pub mod health;
pub mod member;
pub mod profile;
pub mod schedule;
pub mod subscription;
pub mod tag;
pub mod widget;
