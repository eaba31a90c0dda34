use crate::domain::{models::user::User, ports::{ListFilter, Page, UserRepository}};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::{Row, PgPool};
use tracing::error;

pub struct PostgresUserRepo {
    pool: PgPool,
}

impl PostgresUserRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepo {
    async fn create(&self, user: &User) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (id, organization_id, name, email, username, password_hash, role, timezone, calendar_access_token, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING *",
        )
            .bind(&user.id)
            .bind(&user.organization_id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(&user.role)
            .bind(&user.timezone)
            .bind(&user.calendar_access_token)
            .bind(user.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_by_organization(&self, organization_id: &str) -> Result<Vec<User>, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE organization_id = $1 ORDER BY created_at ASC")
            .bind(organization_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn count_by_organization(&self, organization_id: &str) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM users WHERE organization_id = $1")
            .bind(organization_id)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(row.get::<i64, _>("count"))
    }

    async fn find_first_admin(&self, organization_id: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE organization_id = $1 AND role IN ('owner', 'admin')
             ORDER BY CASE role WHEN 'owner' THEN 0 ELSE 1 END, created_at ASC LIMIT 1"
        )
            .bind(organization_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list(&self, filter: &ListFilter) -> Result<Page<User>, AppError> {
        let pattern = filter.pattern();

        let items = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE ($1::text IS NULL OR name ILIKE $1 OR email ILIKE $1 OR username ILIKE $1)
             ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        )
            .bind(&pattern)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)?;

        let total = sqlx::query("SELECT COUNT(*) as count FROM users WHERE ($1::text IS NULL OR name ILIKE $1 OR email ILIKE $1 OR username ILIKE $1)")
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)?
            .get::<i64, _>("count");

        Ok(Page { items, total })
    }

    async fn update_account(&self, user: &User) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET name = $1, username = $2, role = $3, organization_id = $4 WHERE id = $5 RETURNING *"
        )
            .bind(&user.name)
            .bind(&user.username)
            .bind(&user.role)
            .bind(&user.organization_id)
            .bind(&user.id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?
            .ok_or(AppError::NotFound("User not found".into()))
    }

    async fn update_profile(&self, user: &User) -> Result<User, AppError> {
        sqlx::query_as::<_, User>("UPDATE users SET name = $1, timezone = $2 WHERE id = $3 RETURNING *")
            .bind(&user.name)
            .bind(&user.timezone)
            .bind(&user.id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?
            .ok_or(AppError::NotFound("User not found".into()))
    }

    async fn set_calendar_token(&self, user_id: &str, token: Option<&str>) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET calendar_access_token = $1 WHERE id = $2")
            .bind(token)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    async fn delete(&self, organization_id: &str, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM users WHERE organization_id = $1 AND id = $2")
            .bind(organization_id)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("User deletion failed: {:?}", e);
                AppError::Database(e)
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Member not found".into()));
        }
        Ok(())
    }
}
