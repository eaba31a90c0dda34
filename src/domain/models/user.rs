use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

pub const ROLE_OWNER: &str = "owner";
pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_MEMBER: &str = "member";

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct User {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub timezone: String,
    #[serde(skip_serializing)]
    pub calendar_access_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub struct NewUserParams {
    pub organization_id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: &'static str,
}

impl User {
    pub fn new(params: NewUserParams) -> Self {
        let email = params.email.trim().to_lowercase();
        let username = username_from_email(&email);

        Self {
            id: Uuid::new_v4().to_string(),
            organization_id: params.organization_id,
            name: params.name,
            email,
            username,
            password_hash: params.password_hash,
            role: params.role.to_string(),
            timezone: "UTC".to_string(),
            calendar_access_token: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_org_admin(&self) -> bool {
        self.role == ROLE_OWNER || self.role == ROLE_ADMIN
    }
}

/// Local part of the address, reduced to `[a-z0-9-]`.
pub fn username_from_email(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    let cleaned: String = local
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    let trimmed = cleaned.trim_matches('-');
    if trimmed.is_empty() { "user".to_string() } else { trimmed.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_from_email() {
        assert_eq!(username_from_email("jane.doe@example.com"), "jane-doe");
        assert_eq!(username_from_email("Bob@x.io"), "bob");
        assert_eq!(username_from_email("@nowhere"), "user");
    }
}
