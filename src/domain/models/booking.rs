use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

pub const BLOCKED_TITLE: &str = "Blocked Time";
pub const BLOCKED_ATTENDEE_NAME: &str = "Blocked";
pub const BLOCKED_ATTENDEE_EMAIL: &str = "blocked@internal.com";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
    Rejected,
    /// Host time held back without an attendee.
    Blocked,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Rejected => "rejected",
            BookingStatus::Blocked => "blocked",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Booking {
    pub id: String,
    pub organization_id: String,
    pub event_type_id: String,
    pub host_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub attendee_name: String,
    pub attendee_email: String,
    pub attendee_phone: Option<String>,
    pub attendee_notes: Option<String>,
    pub status: String,
    pub meeting_url: Option<String>,
    pub calendar_event_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub struct NewBookingParams {
    pub organization_id: String,
    pub event_type_id: String,
    pub host_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub attendee_name: String,
    pub attendee_email: String,
    pub attendee_phone: Option<String>,
    pub attendee_notes: Option<String>,
    pub status: BookingStatus,
    pub meeting_url: Option<String>,
}

impl Booking {
    pub fn new(params: NewBookingParams) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            organization_id: params.organization_id,
            event_type_id: params.event_type_id,
            host_id: params.host_id,
            start_time: params.start,
            end_time: params.end,
            attendee_name: params.attendee_name,
            attendee_email: params.attendee_email,
            attendee_phone: params.attendee_phone,
            attendee_notes: params.attendee_notes,
            status: params.status.as_str().to_string(),
            meeting_url: params.meeting_url,
            calendar_event_id: None,
            created_at: Utc::now(),
        }
    }

    /// Every status except `cancelled` occupies the host's time.
    pub fn blocks_time(&self) -> bool {
        self.status != BookingStatus::Cancelled.as_str()
    }

    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start < self.end_time && end > self.start_time
    }
}
