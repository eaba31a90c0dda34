use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub subscription_plan: String,
    pub created_at: DateTime<Utc>,
}

impl Organization {
    pub fn new(name: String, slug: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            slug,
            subscription_plan: "free".to_string(),
            created_at: Utc::now(),
        }
    }
}
