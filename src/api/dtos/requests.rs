use crate::domain::models::booking::BookingStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub organization_name: Option<String>,
    pub timezone: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct CreateMemberRequest {
    pub name: String,
    pub email: String,
    pub role: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub timezone: Option<String>,
}

#[derive(Deserialize)]
pub struct ScheduleQuery {
    pub user_id: Option<String>,
}

#[derive(Deserialize)]
pub struct ScheduleEntry {
    pub day: i32,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Deserialize)]
pub struct ReplaceScheduleRequest {
    pub user_id: Option<String>,
    pub schedules: Vec<ScheduleEntry>,
}

#[derive(Deserialize)]
pub struct CreateEventTypeRequest {
    pub title: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub duration_minutes: i32,
    pub location_type: Option<String>,
    pub host_ids: Option<Vec<String>>,
}

#[derive(Deserialize)]
pub struct UpdateEventTypeRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub duration_minutes: Option<i32>,
    pub location_type: Option<String>,
    pub host_ids: Option<Vec<String>>,
}

#[derive(Deserialize)]
pub struct DayAvailabilityQuery {
    pub event_type_id: String,
    pub date: String,
    pub tz: Option<String>,
}

#[derive(Deserialize)]
pub struct MonthAvailabilityQuery {
    pub event_type_id: String,
    pub month: String,
}

#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub event_type_id: String,
    pub start_time: DateTime<Utc>,
    pub attendee_name: String,
    pub attendee_email: String,
    pub attendee_phone: Option<String>,
    pub attendee_notes: Option<String>,
}

#[derive(Deserialize)]
pub struct ManualBookingRequest {
    /// Blocked time may leave title and attendee out.
    #[serde(default)]
    pub title: String,
    pub host_id: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub attendee_name: String,
    #[serde(default)]
    pub attendee_email: String,
    pub attendee_phone: Option<String>,
    pub attendee_notes: Option<String>,
    pub status: Option<BookingStatus>,
}

#[derive(Deserialize)]
pub struct BookingRangeQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub struct UpdateBookingRequest {
    pub start_time: Option<DateTime<Utc>>,
    pub attendee_name: Option<String>,
    pub attendee_email: Option<String>,
    pub attendee_phone: Option<String>,
    pub attendee_notes: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub meeting_url: Option<Option<String>>,
    pub status: Option<BookingStatus>,
}

#[derive(Deserialize)]
pub struct CreateTagRequest {
    pub name: String,
    pub color: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateTagRequest {
    pub name: Option<String>,
    pub color: Option<String>,
}

#[derive(Deserialize)]
pub struct CalendarTokenRequest {
    pub access_token: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateSubscriptionRequest {
    pub plan: String,
}

#[derive(Deserialize)]
pub struct WidgetQuery {
    /// Username or organization slug.
    pub identifier: Option<String>,
    pub slug: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct AdminListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
}

#[derive(Deserialize)]
pub struct AdminCreateUserRequest {
    pub name: String,
    pub email: String,
    pub organization_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

#[derive(Deserialize)]
pub struct AdminUpdateUserRequest {
    pub name: Option<String>,
    pub username: Option<String>,
    pub role: Option<String>,
    pub organization_id: Option<String>,
}

#[derive(Deserialize)]
pub struct AdminCreateOrganizationRequest {
    pub name: String,
    pub slug: String,
    pub subscription_plan: Option<String>,
}

#[derive(Deserialize)]
pub struct AdminUpdateOrganizationRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub subscription_plan: Option<String>,
}
