use crate::domain::{models::organization::Organization, ports::{ListFilter, OrganizationRepository, Page}};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::{PgPool, Row};

pub struct PostgresOrganizationRepo {
    pool: PgPool,
}

impl PostgresOrganizationRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrganizationRepository for PostgresOrganizationRepo {
    async fn create(&self, organization: &Organization) -> Result<Organization, AppError> {
        sqlx::query_as::<_, Organization>(
            "INSERT INTO organizations (id, name, slug, subscription_plan, created_at) VALUES ($1, $2, $3, $4, $5) RETURNING *"
        )
            .bind(&organization.id)
            .bind(&organization.name)
            .bind(&organization.slug)
            .bind(&organization.subscription_plan)
            .bind(organization.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Organization>, AppError> {
        sqlx::query_as::<_, Organization>("SELECT * FROM organizations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Organization>, AppError> {
        sqlx::query_as::<_, Organization>("SELECT * FROM organizations WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list(&self, filter: &ListFilter) -> Result<Page<Organization>, AppError> {
        let pattern = filter.pattern();

        let items = sqlx::query_as::<_, Organization>(
            "SELECT * FROM organizations
             WHERE ($1::text IS NULL OR name ILIKE $1 OR slug ILIKE $1)
             ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        )
            .bind(&pattern)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)?;

        let total = sqlx::query(
            "SELECT COUNT(*) as count FROM organizations WHERE ($1::text IS NULL OR name ILIKE $1 OR slug ILIKE $1)"
        )
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)?
            .get::<i64, _>("count");

        Ok(Page { items, total })
    }

    async fn update(&self, organization: &Organization) -> Result<Organization, AppError> {
        sqlx::query_as::<_, Organization>(
            "UPDATE organizations SET name = $1, slug = $2, subscription_plan = $3 WHERE id = $4 RETURNING *"
        )
            .bind(&organization.name)
            .bind(&organization.slug)
            .bind(&organization.subscription_plan)
            .bind(&organization.id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?
            .ok_or(AppError::NotFound("Organization not found".into()))
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM organizations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Organization not found".into()));
        }
        Ok(())
    }
}
