use axum::{extract::{State, Path}, response::IntoResponse, Json, http::StatusCode};
use crate::state::AppState;
use crate::api::dtos::{requests::CreateMemberRequest, responses::MemberCreatedResponse};
use crate::api::extractors::{auth::AuthUser, org::OrgId};
use crate::api::handlers::auth::unique_username;
use crate::domain::models::user::{NewUserParams, User, ROLE_ADMIN, ROLE_MEMBER, ROLE_OWNER};
use crate::domain::services::auth_service::{hash_password, random_token};
use crate::domain::services::booking_service::organization_plan;
use crate::domain::services::subscription::Feature;
use std::sync::Arc;
use crate::error::AppError;
use tracing::{info, error};

const TEMP_PASSWORD_LEN: usize = 12;

pub async fn create_member(
    State(state): State<Arc<AppState>>,
    OrgId(org_id): OrgId,
    admin: AuthUser,
    Json(payload): Json<CreateMemberRequest>,
) -> Result<impl IntoResponse, AppError> {
    admin.require_admin(&org_id)?;

    let role = match payload.role.as_deref() {
        None | Some(ROLE_MEMBER) => ROLE_MEMBER,
        Some(ROLE_ADMIN) => ROLE_ADMIN,
        Some(_) => return Err(AppError::Validation("Role must be admin or member".into())),
    };
    if payload.name.trim().is_empty() || !payload.email.contains('@') {
        return Err(AppError::Validation("Name and a valid email are required".into()));
    }

    let plan = organization_plan(&state, &org_id).await?;
    let members = state.user_repo.count_by_organization(&org_id).await?;
    if !plan.within_limit(Feature::TeamMembers, members) {
        return Err(AppError::LimitReached(plan.limit_message(Feature::TeamMembers)));
    }

    if state.user_repo.find_by_email(&payload.email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let temporary_password = random_token(TEMP_PASSWORD_LEN);
    let mut user = User::new(NewUserParams {
        organization_id: org_id.clone(),
        name: payload.name.trim().to_string(),
        email: payload.email,
        password_hash: hash_password(&temporary_password)?,
        role,
    });
    user.username = unique_username(&state, &user.username).await?;
    let created = state.user_repo.create(&user).await?;

    info!("Created member user: {}", created.id);

    Ok((StatusCode::CREATED, Json(MemberCreatedResponse {
        id: created.id,
        name: created.name,
        email: created.email,
        username: created.username,
        role: created.role,
        temporary_password,
    })))
}

pub async fn list_members(
    State(state): State<Arc<AppState>>,
    OrgId(org_id): OrgId,
    auth: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    auth.require_org(&org_id)?;
    let members = state.user_repo.list_by_organization(&org_id).await?;
    Ok(Json(members))
}

pub async fn delete_member(
    State(state): State<Arc<AppState>>,
    OrgId(org_id): OrgId,
    admin: AuthUser,
    Path((_, user_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    admin.require_admin(&org_id)?;
    if admin.0.user_id == user_id {
        return Err(AppError::Conflict("Cannot delete yourself".into()));
    }

    let target = state.user_repo.find_by_id(&user_id).await?
        .filter(|u| u.organization_id == org_id)
        .ok_or(AppError::NotFound("User not found".into()))?;
    if target.role == ROLE_OWNER {
        return Err(AppError::Forbidden("The organization owner cannot be removed".into()));
    }

    match state.user_repo.delete(&org_id, &target.id).await {
        Ok(_) => {
            info!("Deleted user {}", user_id);
            Ok(Json(serde_json::json!({"status": "deleted"})))
        },
        Err(e) => {
            error!("Failed to delete user {}: {:?}", user_id, e);
            Err(e)
        }
    }
}
