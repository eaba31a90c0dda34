use crate::domain::{models::tag::Tag, ports::TagRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::PgPool;

pub struct PostgresTagRepo {
    pool: PgPool,
}

impl PostgresTagRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TagRepository for PostgresTagRepo {
    async fn create(&self, tag: &Tag) -> Result<Tag, AppError> {
        sqlx::query_as::<_, Tag>(
            "INSERT INTO tags (id, organization_id, name, color, created_at) VALUES ($1, $2, $3, $4, $5) RETURNING *"
        )
            .bind(&tag.id)
            .bind(&tag.organization_id)
            .bind(&tag.name)
            .bind(&tag.color)
            .bind(tag.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Tag>, AppError> {
        sqlx::query_as::<_, Tag>("SELECT * FROM tags WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn list(&self, organization_id: &str) -> Result<Vec<Tag>, AppError> {
        sqlx::query_as::<_, Tag>("SELECT * FROM tags WHERE organization_id = $1 ORDER BY name ASC")
            .bind(organization_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn update(&self, tag: &Tag) -> Result<Tag, AppError> {
        sqlx::query_as::<_, Tag>("UPDATE tags SET name = $1, color = $2 WHERE id = $3 RETURNING *")
            .bind(&tag.name)
            .bind(&tag.color)
            .bind(&tag.id)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn delete(&self, organization_id: &str, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM tags WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(organization_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Tag not found".into()));
        }
        Ok(())
    }

    async fn assign(&self, user_id: &str, tag_id: &str) -> Result<(), AppError> {
        sqlx::query("INSERT INTO user_tags (user_id, tag_id) VALUES ($1, $2) ON CONFLICT (user_id, tag_id) DO NOTHING")
            .bind(user_id)
            .bind(tag_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    async fn unassign(&self, user_id: &str, tag_id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM user_tags WHERE user_id = $1 AND tag_id = $2")
            .bind(user_id)
            .bind(tag_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Tag>, AppError> {
        sqlx::query_as::<_, Tag>(
            "SELECT t.* FROM tags t JOIN user_tags ut ON ut.tag_id = t.id WHERE ut.user_id = $1 ORDER BY t.name ASC"
        )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }
}
