use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

pub const DEFAULT_TAG_COLOR: &str = "#3b82f6";

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Tag {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

impl Tag {
    pub fn new(organization_id: String, name: String, color: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            organization_id,
            name,
            color: color.unwrap_or_else(|| DEFAULT_TAG_COLOR.to_string()),
            created_at: Utc::now(),
        }
    }
}
