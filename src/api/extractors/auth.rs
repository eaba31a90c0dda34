use axum::{
    extract::{FromRequestParts, FromRef},
    http::{request::Parts, StatusCode},
};
use crate::config::Config;
use crate::state::AppState;
use crate::domain::models::auth::{Claims, Identity};
use crate::domain::services::auth_service::TOKEN_AUDIENCE;
use crate::error::AppError;
use std::sync::Arc;
use tower_cookies::Cookies;
use jsonwebtoken::{decode, DecodingKey, Validation, Algorithm};
use tracing::Span;

pub const ACCESS_COOKIE: &str = "access_token";
pub const CSRF_HEADER: &str = "X-CSRF-Token";

pub struct AuthUser(pub Identity);

impl AuthUser {
    /// Rejects callers whose token belongs to another organization.
    pub fn require_org(&self, organization_id: &str) -> Result<(), AppError> {
        if self.0.organization_id != organization_id {
            return Err(AppError::Forbidden("Not a member of this organization".into()));
        }
        Ok(())
    }

    /// Operators listed in `SYSTEM_ADMIN_EMAILS`, across all organizations.
    pub fn require_system_admin(&self, config: &Config) -> Result<(), AppError> {
        if !config.is_system_admin(&self.0.email) {
            return Err(AppError::Forbidden("System admin access required".into()));
        }
        Ok(())
    }

    pub fn require_admin(&self, organization_id: &str) -> Result<(), AppError> {
        self.require_org(organization_id)?;
        if !self.0.is_org_admin() {
            return Err(AppError::Forbidden("Owner or admin role required".into()));
        }
        Ok(())
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let cookies = parts.extensions.get::<Cookies>()
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

        let access_token = cookies.get(ACCESS_COOKIE)
            .ok_or(StatusCode::UNAUTHORIZED)?
            .value()
            .to_string();

        let app_state = <Arc<AppState> as FromRef<S>>::from_ref(state);

        let decoding_key = DecodingKey::from_ed_pem(app_state.config.jwt_public_key.as_bytes())
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        let mut validation = Validation::new(Algorithm::EdDSA);
        validation.set_audience(&[TOKEN_AUDIENCE]);
        validation.set_issuer(&[app_state.config.auth_issuer.as_str()]);

        let token_data = decode::<Claims>(&access_token, &decoding_key, &validation)
            .map_err(|_| StatusCode::UNAUTHORIZED)?;

        let method = &parts.method;
        if method != "GET" && method != "HEAD" && method != "OPTIONS" {
            let csrf_header_val = parts.headers.get(CSRF_HEADER)
                .ok_or(StatusCode::FORBIDDEN)?
                .to_str()
                .map_err(|_| StatusCode::FORBIDDEN)?;

            if csrf_header_val != token_data.claims.csrf_token {
                return Err(StatusCode::FORBIDDEN);
            }
        }

        let claims = token_data.claims;
        let identity = Identity {
            user_id: claims.sub,
            organization_id: claims.organization_id,
            role: claims.role,
            email: claims.email,
        };

        Span::current().record("org_id", &identity.organization_id);
        Span::current().record("user_id", &identity.user_id);

        Ok(AuthUser(identity))
    }
}
