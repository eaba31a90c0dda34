use crate::domain::models::{event_type::EventType, organization::Organization, user::User};
use crate::domain::services::subscription::Plan;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Serialize)]
pub struct SlotsResponse {
    pub date: String,
    pub slots: Vec<DateTime<Utc>>,
    /// Same instants rendered in the requested timezone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_slots: Option<Vec<String>>,
}

#[derive(Serialize)]
pub struct MonthAvailabilityResponse {
    pub month: String,
    pub available_days: Vec<String>,
}

#[derive(Serialize)]
pub struct MemberCreatedResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub username: String,
    pub role: String,
    pub temporary_password: String,
}

#[derive(Serialize)]
pub struct PublicHost {
    pub name: String,
    pub username: String,
    pub timezone: String,
}

#[derive(Serialize)]
pub struct PublicEventTypeResponse {
    pub event_type: EventType,
    pub host: PublicHost,
}

#[derive(Serialize)]
pub struct UsageResponse {
    pub event_types: i64,
    pub bookings_this_month: i64,
    pub team_members: i64,
}

#[derive(Serialize)]
pub struct SubscriptionResponse {
    pub plan: Plan,
    pub usage: UsageResponse,
}

#[derive(Serialize)]
pub struct CalendarStatusResponse {
    pub provider: &'static str,
    pub connected: bool,
}

#[derive(Serialize)]
pub struct WidgetHost {
    pub id: String,
    pub name: String,
    pub username: String,
    pub timezone: String,
}

#[derive(Serialize)]
pub struct WidgetEventTypeResponse {
    #[serde(flatten)]
    pub event_type: EventType,
    pub hosts: Vec<WidgetHost>,
}

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

#[derive(Serialize)]
pub struct AdminUserList {
    pub users: Vec<User>,
    pub pagination: Pagination,
}

#[derive(Serialize)]
pub struct AdminUserCreatedResponse {
    #[serde(flatten)]
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporary_password: Option<String>,
}

#[derive(Serialize)]
pub struct AdminOrganization {
    #[serde(flatten)]
    pub organization: Organization,
    pub member_count: i64,
}

#[derive(Serialize)]
pub struct AdminOrganizationList {
    pub organizations: Vec<AdminOrganization>,
    pub pagination: Pagination,
}
