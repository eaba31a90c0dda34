use crate::domain::models::{
    organization::Organization, user::User, schedule::ScheduleWindow,
    event_type::{EventType, EventTypeWithHosts}, booking::Booking, tag::Tag, job::Job,
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// One page of an admin listing plus the total number of matches.
#[derive(Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

/// Case-insensitive substring filter with offset pagination.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl ListFilter {
    /// `%term%` for LIKE, lowercased.
    pub fn pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s.to_lowercase()))
    }
}

#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    async fn create(&self, organization: &Organization) -> Result<Organization, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Organization>, AppError>;
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Organization>, AppError>;
    /// Newest first, matching name or slug.
    async fn list(&self, filter: &ListFilter) -> Result<Page<Organization>, AppError>;
    async fn update(&self, organization: &Organization) -> Result<Organization, AppError>;
    /// Cascades to members, event types and bookings.
    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &User) -> Result<User, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
    async fn list_by_organization(&self, organization_id: &str) -> Result<Vec<User>, AppError>;
    async fn count_by_organization(&self, organization_id: &str) -> Result<i64, AppError>;
    /// Oldest owner, else oldest admin.
    async fn find_first_admin(&self, organization_id: &str) -> Result<Option<User>, AppError>;
    /// Newest first, matching name, email or username.
    async fn list(&self, filter: &ListFilter) -> Result<Page<User>, AppError>;
    async fn update_profile(&self, user: &User) -> Result<User, AppError>;
    /// Writes name, username, role and organization.
    async fn update_account(&self, user: &User) -> Result<User, AppError>;
    async fn set_calendar_token(&self, user_id: &str, token: Option<&str>) -> Result<(), AppError>;
    async fn delete(&self, organization_id: &str, id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<ScheduleWindow>, AppError>;
    async fn list_for_users(&self, user_ids: &[String]) -> Result<Vec<ScheduleWindow>, AppError>;
    /// Deletes every window of the user and inserts `windows`, atomically.
    async fn replace_for_user(&self, user_id: &str, windows: &[ScheduleWindow]) -> Result<Vec<ScheduleWindow>, AppError>;
}

#[async_trait]
pub trait EventTypeRepository: Send + Sync {
    async fn create(&self, event_type: &EventType, host_ids: &[String]) -> Result<EventTypeWithHosts, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<EventTypeWithHosts>, AppError>;
    async fn find_by_owner_slug(&self, owner_id: &str, slug: &str) -> Result<Option<EventType>, AppError>;
    async fn list_by_organization(&self, organization_id: &str) -> Result<Vec<EventTypeWithHosts>, AppError>;
    async fn count_by_owner(&self, owner_id: &str) -> Result<i64, AppError>;
    /// `host_ids = None` leaves the host set untouched.
    async fn update(&self, event_type: &EventType, host_ids: Option<&[String]>) -> Result<EventTypeWithHosts, AppError>;
    /// Removes the event type together with its hosts and bookings.
    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Inserts the booking and its jobs only if the host has no overlapping
    /// non-cancelled booking. `Ok(None)` means the slot was taken.
    async fn create_if_free(&self, booking: &Booking, jobs: Vec<Job>) -> Result<Option<Booking>, AppError>;
    /// Moves the booking only if the new interval is free for its host,
    /// replacing its pending jobs with `jobs`. `Ok(None)` means conflict.
    async fn reschedule_if_free(&self, booking: &Booking, start: DateTime<Utc>, end: DateTime<Utc>, jobs: Vec<Job>) -> Result<Option<Booking>, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>, AppError>;
    /// Non-cancelled bookings of any of `host_ids` intersecting `[start, end)`.
    async fn list_blocking_for_hosts(&self, host_ids: &[String], start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Booking>, AppError>;
    async fn list_by_host(&self, host_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Booking>, AppError>;
    async fn list_by_organization(&self, organization_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Booking>, AppError>;
    /// Bookings counted against the monthly allowance: neither cancelled nor blocked.
    async fn count_for_host_between(&self, host_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<i64, AppError>;
    async fn count_for_organization_between(&self, organization_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<i64, AppError>;
    async fn update(&self, booking: &Booking) -> Result<Booking, AppError>;
    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait TagRepository: Send + Sync {
    async fn create(&self, tag: &Tag) -> Result<Tag, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Tag>, AppError>;
    async fn list(&self, organization_id: &str) -> Result<Vec<Tag>, AppError>;
    async fn update(&self, tag: &Tag) -> Result<Tag, AppError>;
    async fn delete(&self, organization_id: &str, id: &str) -> Result<(), AppError>;
    async fn assign(&self, user_id: &str, tag_id: &str) -> Result<(), AppError>;
    async fn unassign(&self, user_id: &str, tag_id: &str) -> Result<(), AppError>;
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Tag>, AppError>;
}

#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn create(&self, job: &Job) -> Result<Job, AppError>;
    async fn find_pending(&self, limit: i32) -> Result<Vec<Job>, AppError>;
    async fn update_status(&self, id: &str, status: &str, error_message: Option<String>) -> Result<(), AppError>;
    async fn cancel_jobs_for_booking(&self, booking_id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait EmailService: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, html_body: &str, attachment_name: Option<&str>, attachment_data: Option<&[u8]>) -> Result<(), AppError>;
}

/// Event data pushed to a host's external calendar.
#[derive(Debug, Clone)]
pub struct CalendarEventData {
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location: Option<String>,
    pub attendee_email: Option<String>,
    pub attendee_name: Option<String>,
}

#[async_trait]
pub trait CalendarService: Send + Sync {
    async fn is_busy(&self, host_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<bool, AppError>;
    async fn create_event(&self, host_id: &str, event: &CalendarEventData) -> Result<Option<String>, AppError>;
    async fn update_event(&self, host_id: &str, event_id: &str, event: &CalendarEventData) -> Result<(), AppError>;
    async fn delete_event(&self, host_id: &str, event_id: &str) -> Result<(), AppError>;
}
