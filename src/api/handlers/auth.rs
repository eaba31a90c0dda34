use axum::{extract::State, response::IntoResponse, Json, http::StatusCode};
use crate::state::AppState;
use crate::error::AppError;
use crate::api::dtos::requests::{LoginRequest, RegisterRequest};
use crate::api::extractors::auth::ACCESS_COOKIE;
use crate::domain::models::auth::{AuthResponse, UserProfile};
use crate::domain::models::organization::Organization;
use crate::domain::models::event_type::slugify;
use crate::domain::models::user::{NewUserParams, User, ROLE_OWNER};
use crate::domain::services::auth_service::{hash_password, random_token, verify_password, ACCESS_TOKEN_MINUTES};
use chrono_tz::Tz;
use std::sync::Arc;
use tower_cookies::{Cookies, Cookie};
use tower_cookies::cookie::SameSite;
use time::Duration;
use tracing::info;

pub const MIN_PASSWORD_LEN: usize = 8;

pub fn profile_of(user: &User) -> UserProfile {
    UserProfile {
        id: user.id.clone(),
        organization_id: user.organization_id.clone(),
        name: user.name.clone(),
        email: user.email.clone(),
        username: user.username.clone(),
        role: user.role.clone(),
    }
}

/// Picks a free username, appending a short random suffix on collision.
pub async fn unique_username(state: &AppState, base: &str) -> Result<String, AppError> {
    let mut candidate = base.to_string();
    for _ in 0..5 {
        if state.user_repo.find_by_username(&candidate).await?.is_none() {
            return Ok(candidate);
        }
        candidate = format!("{}-{}", base, random_token(4).to_lowercase());
    }
    Err(AppError::Conflict("Could not allocate a username".into()))
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("Name is required".into()));
    }
    if !payload.email.contains('@') {
        return Err(AppError::Validation("Invalid email".into()));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!("Password must be at least {} characters", MIN_PASSWORD_LEN)));
    }
    if let Some(tz) = &payload.timezone
        && tz.parse::<Tz>().is_err() {
        return Err(AppError::Validation("Invalid timezone".into()));
    }
    if state.user_repo.find_by_email(&payload.email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let org_name = payload.organization_name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| format!("{}'s Organization", payload.name.trim()));
    let org_slug = format!("{}-{}", slugify(&org_name), random_token(6).to_lowercase());
    let organization = state.organization_repo.create(&Organization::new(org_name, org_slug)).await?;

    let mut user = User::new(NewUserParams {
        organization_id: organization.id.clone(),
        name: payload.name.trim().to_string(),
        email: payload.email,
        password_hash: hash_password(&payload.password)?,
        role: ROLE_OWNER,
    });
    user.username = unique_username(&state, &user.username).await?;
    if let Some(tz) = payload.timezone {
        user.timezone = tz;
    }
    let user = state.user_repo.create(&user).await?;

    let (access_jwt, csrf_token) = state.auth_service.issue_access_token(&user)?;
    set_access_cookie(&cookies, &access_jwt);

    info!(organization_id = %organization.id, "Registered owner {}", user.id);

    Ok((StatusCode::CREATED, Json(AuthResponse { csrf_token, user: profile_of(&user) })))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.user_repo.find_by_email(&payload.email).await?
        .ok_or(AppError::Unauthorized)?;

    if !verify_password(&payload.password, &user.password_hash) {
        return Err(AppError::Unauthorized);
    }

    let (access_jwt, csrf_token) = state.auth_service.issue_access_token(&user)?;
    set_access_cookie(&cookies, &access_jwt);

    info!("User logged in: {}", user.id);

    Ok(Json(AuthResponse { csrf_token, user: profile_of(&user) }))
}

pub async fn logout(cookies: Cookies) -> Result<impl IntoResponse, AppError> {
    cookies.remove(Cookie::build((ACCESS_COOKIE, "")).path("/").into());
    info!("User logged out");
    Ok(StatusCode::OK)
}

fn set_access_cookie(cookies: &Cookies, access: &str) {
    let mut access_c = Cookie::new(ACCESS_COOKIE, access.to_string());
    access_c.set_http_only(true);
    access_c.set_secure(true);
    access_c.set_same_site(SameSite::Strict);
    access_c.set_path("/");
    access_c.set_max_age(Duration::minutes(ACCESS_TOKEN_MINUTES));
    cookies.add(access_c);
}
