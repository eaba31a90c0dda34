pub mod auth_service;
pub mod availability;
pub mod booking_service;
pub mod calendar;
pub mod calendar_sync;
pub mod host_selection;
pub mod notification_service;
pub mod subscription;
