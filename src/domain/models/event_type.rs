use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

pub const LOCATION_MIROTALK: &str = "mirotalk";

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct EventType {
    pub id: String,
    pub organization_id: String,
    pub owner_id: String,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub duration_minutes: i32,
    pub location_type: String,
    pub created_at: DateTime<Utc>,
}

pub struct NewEventTypeParams {
    pub organization_id: String,
    pub owner_id: String,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub duration_minutes: i32,
    pub location_type: String,
}

impl EventType {
    pub fn new(params: NewEventTypeParams) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            organization_id: params.organization_id,
            owner_id: params.owner_id,
            title: params.title,
            slug: params.slug,
            description: params.description,
            duration_minutes: params.duration_minutes,
            location_type: params.location_type,
            created_at: Utc::now(),
        }
    }
}

/// Event type together with its assigned host ids.
#[derive(Debug, Serialize, Clone)]
pub struct EventTypeWithHosts {
    #[serde(flatten)]
    pub event_type: EventType,
    pub host_ids: Vec<String>,
}

/// Row of the `event_type_hosts` join table.
#[derive(Debug, FromRow, Clone)]
pub struct EventTypeHost {
    pub event_type_id: String,
    pub user_id: String,
}

impl EventTypeWithHosts {
    pub fn assemble(event_type: EventType, rows: &[EventTypeHost]) -> Self {
        let host_ids = rows
            .iter()
            .filter(|r| r.event_type_id == event_type.id)
            .map(|r| r.user_id.clone())
            .collect();
        Self { event_type, host_ids }
    }
}

/// Lowercase, `[a-z0-9-]`, at most 50 chars.
pub fn slugify(title: &str) -> String {
    let mut slug = String::new();
    let mut last_dash = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash && !slug.is_empty() {
            slug.push('-');
            last_dash = true;
        }
    }
    let slug: String = slug.trim_end_matches('-').chars().take(50).collect();
    if slug.is_empty() { "manual-booking".to_string() } else { slug }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Intro Call (30 min)"), "intro-call-30-min");
        assert_eq!(slugify("  ---  "), "manual-booking");
        assert_eq!(slugify(&"a".repeat(80)).len(), 50);
    }
}
