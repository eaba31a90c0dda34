use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub exp: usize,
    pub iat: usize,
    pub jti: String,

    #[serde(rename = "https://scheduling.app/claims/org_id")]
    pub organization_id: String,

    #[serde(rename = "https://scheduling.app/claims/role")]
    pub role: String,

    #[serde(rename = "https://scheduling.app/claims/email")]
    pub email: String,

    #[serde(rename = "https://scheduling.app/claims/csrf")]
    pub csrf_token: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub csrf_token: String,
    pub user: UserProfile,
}

#[derive(Serialize)]
pub struct UserProfile {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub email: String,
    pub username: String,
    pub role: String,
}

/// Caller identity carried by the access token.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
    pub organization_id: String,
    pub role: String,
    pub email: String,
}

impl Identity {
    pub fn is_org_admin(&self) -> bool {
        self.role == super::user::ROLE_OWNER || self.role == super::user::ROLE_ADMIN
    }

    /// Owner/admin of the organization, or the user themselves.
    pub fn can_manage(&self, user_id: &str) -> bool {
        self.user_id == user_id || self.is_org_admin()
    }
}
