pub mod sqlite_booking_repo;
pub mod sqlite_event_type_repo;
pub mod sqlite_job_repo;
pub mod sqlite_organization_repo;
pub mod sqlite_schedule_repo;
pub mod sqlite_tag_repo;
pub mod sqlite_user_repo;

pub mod postgres_booking_repo;
pub mod postgres_event_type_repo;
pub mod postgres_job_repo;
pub mod postgres_organization_repo;
pub mod postgres_schedule_repo;
pub mod postgres_tag_repo;
pub mod postgres_user_repo;
