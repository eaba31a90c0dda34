use axum::{extract::{Path, Query, State}, response::IntoResponse, Json, http::StatusCode};
use crate::api::dtos::{
    requests::{
        AdminCreateOrganizationRequest, AdminCreateUserRequest, AdminListQuery,
        AdminUpdateOrganizationRequest, AdminUpdateUserRequest,
    },
    responses::{AdminOrganization, AdminOrganizationList, AdminUserCreatedResponse, AdminUserList, Pagination},
};
use crate::api::extractors::auth::AuthUser;
use crate::api::handlers::auth::{unique_username, MIN_PASSWORD_LEN};
use crate::domain::models::organization::Organization;
use crate::domain::models::user::{username_from_email, NewUserParams, User, ROLE_ADMIN, ROLE_MEMBER, ROLE_OWNER};
use crate::domain::ports::ListFilter;
use crate::domain::services::auth_service::{hash_password, random_token};
use crate::domain::services::subscription::PlanId;
use crate::error::AppError;
use crate::state::AppState;
use std::sync::Arc;
use tracing::info;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 100;
const TEMP_PASSWORD_LEN: usize = 12;

struct PageRequest {
    page: i64,
    limit: i64,
}

impl PageRequest {
    fn from_query(query: &AdminListQuery) -> Self {
        Self {
            page: query.page.unwrap_or(1).max(1),
            limit: query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    fn filter(&self, search: Option<String>) -> ListFilter {
        ListFilter {
            search,
            limit: self.limit,
            offset: (self.page - 1) * self.limit,
        }
    }

    fn pagination(&self, total: i64) -> Pagination {
        Pagination {
            page: self.page,
            limit: self.limit,
            total,
            total_pages: (total + self.limit - 1) / self.limit,
        }
    }
}

fn parse_role(role: &str) -> Result<&'static str, AppError> {
    match role {
        ROLE_OWNER => Ok(ROLE_OWNER),
        ROLE_ADMIN => Ok(ROLE_ADMIN),
        ROLE_MEMBER => Ok(ROLE_MEMBER),
        _ => Err(AppError::Validation("Role must be owner, admin or member".into())),
    }
}

fn parse_plan(plan: &str) -> Result<PlanId, AppError> {
    PlanId::parse(plan).ok_or(AppError::Validation("Plan must be free, pro or team".into()))
}

/// 3-30 characters of letters, digits, `-` or `_`, stored lowercase.
fn normalize_username(raw: &str) -> Result<String, AppError> {
    let username = raw.trim().to_lowercase();
    let valid = (3..=30).contains(&username.len())
        && username.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(AppError::Validation("Username must be 3-30 letters, digits, '-' or '_'".into()));
    }
    Ok(username)
}

/// 2-50 characters of lowercase letters, digits or `-`.
fn validate_org_slug(slug: &str) -> Result<(), AppError> {
    let valid = (2..=50).contains(&slug.len())
        && slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !valid {
        return Err(AppError::Validation("Slug must be 2-50 lowercase letters, digits or '-'".into()));
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<(), AppError> {
    if name.trim().chars().count() < 2 {
        return Err(AppError::Validation("Name must be at least 2 characters".into()));
    }
    Ok(())
}

async fn ensure_organization(state: &AppState, organization_id: &str) -> Result<(), AppError> {
    state.organization_repo.find_by_id(organization_id).await?
        .ok_or(AppError::NotFound("Organization not found".into()))?;
    Ok(())
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<AdminListQuery>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_system_admin(&state.config)?;
    let paging = PageRequest::from_query(&query);
    let page = state.user_repo.list(&paging.filter(query.search)).await?;

    Ok(Json(AdminUserList {
        users: page.items,
        pagination: paging.pagination(page.total),
    }))
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(payload): Json<AdminCreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_system_admin(&state.config)?;

    validate_name(&payload.name)?;
    if !payload.email.contains('@') {
        return Err(AppError::Validation("Invalid email".into()));
    }
    let role = parse_role(payload.role.as_deref().unwrap_or(ROLE_MEMBER))?;
    ensure_organization(&state, &payload.organization_id).await?;

    if state.user_repo.find_by_email(&payload.email).await?.is_some() {
        return Err(AppError::Conflict("User with this email already exists".into()));
    }

    let username = match &payload.username {
        Some(raw) => {
            let username = normalize_username(raw)?;
            if state.user_repo.find_by_username(&username).await?.is_some() {
                return Err(AppError::Conflict("Username already taken".into()));
            }
            username
        }
        None => unique_username(&state, &username_from_email(&payload.email)).await?,
    };

    let (password, temporary_password) = match payload.password {
        Some(p) if p.len() < MIN_PASSWORD_LEN => {
            return Err(AppError::Validation(format!("Password must be at least {} characters", MIN_PASSWORD_LEN)));
        }
        Some(p) => (p, None),
        None => {
            let generated = random_token(TEMP_PASSWORD_LEN);
            (generated.clone(), Some(generated))
        }
    };

    let mut user = User::new(NewUserParams {
        organization_id: payload.organization_id,
        name: payload.name.trim().to_string(),
        email: payload.email,
        password_hash: hash_password(&password)?,
        role,
    });
    user.username = username;
    let created = state.user_repo.create(&user).await?;

    info!(user_id = %created.id, organization_id = %created.organization_id, "System admin created user");
    Ok((StatusCode::CREATED, Json(AdminUserCreatedResponse { user: created, temporary_password })))
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(user_id): Path<String>,
    Json(payload): Json<AdminUpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_system_admin(&state.config)?;

    let mut user = state.user_repo.find_by_id(&user_id).await?
        .ok_or(AppError::NotFound("User not found".into()))?;

    if let Some(name) = &payload.name {
        validate_name(name)?;
        user.name = name.trim().to_string();
    }
    if let Some(raw) = &payload.username {
        let username = normalize_username(raw)?;
        let taken = state.user_repo.find_by_username(&username).await?
            .is_some_and(|other| other.id != user.id);
        if taken {
            return Err(AppError::Conflict("Username already taken".into()));
        }
        user.username = username;
    }
    if let Some(role) = &payload.role {
        user.role = parse_role(role)?.to_string();
    }
    if let Some(organization_id) = payload.organization_id {
        ensure_organization(&state, &organization_id).await?;
        user.organization_id = organization_id;
    }

    let updated = state.user_repo.update_account(&user).await?;
    info!(user_id = %updated.id, role = %updated.role, "System admin updated user");
    Ok(Json(updated))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_system_admin(&state.config)?;
    if auth.0.user_id == user_id {
        return Err(AppError::Validation("Cannot delete your own account".into()));
    }

    let user = state.user_repo.find_by_id(&user_id).await?
        .ok_or(AppError::NotFound("User not found".into()))?;
    state.user_repo.delete(&user.organization_id, &user.id).await?;

    info!(user_id = %user.id, "System admin deleted user");
    Ok(Json(serde_json::json!({"status": "deleted"})))
}

async fn with_member_count(state: &AppState, organization: Organization) -> Result<AdminOrganization, AppError> {
    let member_count = state.user_repo.count_by_organization(&organization.id).await?;
    Ok(AdminOrganization { organization, member_count })
}

pub async fn list_organizations(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<AdminListQuery>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_system_admin(&state.config)?;
    let paging = PageRequest::from_query(&query);
    let page = state.organization_repo.list(&paging.filter(query.search)).await?;

    let mut organizations = Vec::with_capacity(page.items.len());
    for organization in page.items {
        organizations.push(with_member_count(&state, organization).await?);
    }

    Ok(Json(AdminOrganizationList {
        organizations,
        pagination: paging.pagination(page.total),
    }))
}

pub async fn create_organization(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(payload): Json<AdminCreateOrganizationRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_system_admin(&state.config)?;

    validate_name(&payload.name)?;
    validate_org_slug(&payload.slug)?;
    let plan = parse_plan(payload.subscription_plan.as_deref().unwrap_or("free"))?;
    if state.organization_repo.find_by_slug(&payload.slug).await?.is_some() {
        return Err(AppError::Conflict("Organization with this slug already exists".into()));
    }

    let mut organization = Organization::new(payload.name.trim().to_string(), payload.slug);
    organization.subscription_plan = plan.as_str().to_string();
    let created = state.organization_repo.create(&organization).await?;

    info!(organization_id = %created.id, plan = plan.as_str(), "System admin created organization");
    Ok((StatusCode::CREATED, Json(AdminOrganization { organization: created, member_count: 0 })))
}

pub async fn update_organization(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(org_id): Path<String>,
    Json(payload): Json<AdminUpdateOrganizationRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_system_admin(&state.config)?;

    let mut organization = state.organization_repo.find_by_id(&org_id).await?
        .ok_or(AppError::NotFound("Organization not found".into()))?;

    if let Some(name) = &payload.name {
        validate_name(name)?;
        organization.name = name.trim().to_string();
    }
    if let Some(slug) = payload.slug {
        validate_org_slug(&slug)?;
        let taken = state.organization_repo.find_by_slug(&slug).await?
            .is_some_and(|other| other.id != organization.id);
        if taken {
            return Err(AppError::Conflict("Slug already taken".into()));
        }
        organization.slug = slug;
    }
    if let Some(plan) = &payload.subscription_plan {
        organization.subscription_plan = parse_plan(plan)?.as_str().to_string();
    }

    let updated = state.organization_repo.update(&organization).await?;
    info!(organization_id = %updated.id, "System admin updated organization");
    Ok(Json(with_member_count(&state, updated).await?))
}

pub async fn delete_organization(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(org_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_system_admin(&state.config)?;
    if auth.0.organization_id == org_id {
        return Err(AppError::Validation("Cannot delete your own organization".into()));
    }

    state.organization_repo.delete(&org_id).await?;
    info!(organization_id = %org_id, "System admin deleted organization");
    Ok(Json(serde_json::json!({"status": "deleted"})))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paging_defaults_and_bounds() {
        let paging = PageRequest::from_query(&AdminListQuery::default());
        assert_eq!((paging.page, paging.limit), (1, DEFAULT_PAGE_SIZE));

        let paging = PageRequest::from_query(&AdminListQuery { page: Some(0), limit: Some(1000), search: None });
        assert_eq!((paging.page, paging.limit), (1, MAX_PAGE_SIZE));

        let paging = PageRequest::from_query(&AdminListQuery { page: Some(3), limit: Some(20), search: None });
        assert_eq!(paging.filter(None).offset, 40);
        assert_eq!(paging.pagination(41).total_pages, 3);
        assert_eq!(paging.pagination(0).total_pages, 0);
    }

    #[test]
    fn test_username_and_slug_rules() {
        assert_eq!(normalize_username(" Jane_Doe ").unwrap(), "jane_doe");
        assert!(normalize_username("ab").is_err());
        assert!(normalize_username("has space").is_err());
        assert!(validate_org_slug("acme-2").is_ok());
        assert!(validate_org_slug("Acme").is_err());
        assert!(validate_org_slug("a").is_err());
    }
}
