use crate::domain::{
    models::event_type::{EventType, EventTypeHost, EventTypeWithHosts},
    ports::EventTypeRepository,
};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::{Row, SqliteConnection, SqlitePool};

pub struct SqliteEventTypeRepo {
    pool: SqlitePool,
}

impl SqliteEventTypeRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

async fn insert_hosts(conn: &mut SqliteConnection, event_type_id: &str, host_ids: &[String]) -> Result<(), AppError> {
    for host_id in host_ids {
        sqlx::query("INSERT INTO event_type_hosts (event_type_id, user_id) VALUES (?, ?) ON CONFLICT DO NOTHING")
            .bind(event_type_id)
            .bind(host_id)
            .execute(&mut *conn)
            .await
            .map_err(AppError::Database)?;
    }
    Ok(())
}

async fn host_rows(conn: &mut SqliteConnection, event_type_id: &str) -> Result<Vec<EventTypeHost>, AppError> {
    sqlx::query_as::<_, EventTypeHost>("SELECT event_type_id, user_id FROM event_type_hosts WHERE event_type_id = ? ORDER BY user_id")
        .bind(event_type_id)
        .fetch_all(conn)
        .await
        .map_err(AppError::Database)
}

#[async_trait]
impl EventTypeRepository for SqliteEventTypeRepo {
    async fn create(&self, event_type: &EventType, host_ids: &[String]) -> Result<EventTypeWithHosts, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let created = sqlx::query_as::<_, EventType>(
            "INSERT INTO event_types (id, organization_id, owner_id, title, slug, description, duration_minutes, location_type, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING *"
        )
            .bind(&event_type.id)
            .bind(&event_type.organization_id)
            .bind(&event_type.owner_id)
            .bind(&event_type.title)
            .bind(&event_type.slug)
            .bind(&event_type.description)
            .bind(event_type.duration_minutes)
            .bind(&event_type.location_type)
            .bind(event_type.created_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        insert_hosts(&mut tx, &created.id, host_ids).await?;
        let rows = host_rows(&mut tx, &created.id).await?;
        tx.commit().await.map_err(AppError::Database)?;

        Ok(EventTypeWithHosts::assemble(created, &rows))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<EventTypeWithHosts>, AppError> {
        let mut conn = self.pool.acquire().await.map_err(AppError::Database)?;
        let Some(event_type) = sqlx::query_as::<_, EventType>("SELECT * FROM event_types WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(AppError::Database)? else {
            return Ok(None);
        };

        let rows = host_rows(&mut conn, id).await?;
        Ok(Some(EventTypeWithHosts::assemble(event_type, &rows)))
    }

    async fn find_by_owner_slug(&self, owner_id: &str, slug: &str) -> Result<Option<EventType>, AppError> {
        sqlx::query_as::<_, EventType>("SELECT * FROM event_types WHERE owner_id = ? AND slug = ?")
            .bind(owner_id)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_by_organization(&self, organization_id: &str) -> Result<Vec<EventTypeWithHosts>, AppError> {
        let event_types = sqlx::query_as::<_, EventType>("SELECT * FROM event_types WHERE organization_id = ? ORDER BY created_at ASC")
            .bind(organization_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)?;

        let rows = sqlx::query_as::<_, EventTypeHost>(
            "SELECT h.event_type_id, h.user_id FROM event_type_hosts h JOIN event_types e ON e.id = h.event_type_id WHERE e.organization_id = ? ORDER BY h.user_id"
        )
            .bind(organization_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)?;

        Ok(event_types.into_iter().map(|et| EventTypeWithHosts::assemble(et, &rows)).collect())
    }

    async fn count_by_owner(&self, owner_id: &str) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM event_types WHERE owner_id = ?")
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(row.get::<i64, _>("count"))
    }

    async fn update(&self, event_type: &EventType, host_ids: Option<&[String]>) -> Result<EventTypeWithHosts, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let updated = sqlx::query_as::<_, EventType>(
            "UPDATE event_types SET title = ?, slug = ?, description = ?, duration_minutes = ?, location_type = ? WHERE id = ? RETURNING *"
        )
            .bind(&event_type.title)
            .bind(&event_type.slug)
            .bind(&event_type.description)
            .bind(event_type.duration_minutes)
            .bind(&event_type.location_type)
            .bind(&event_type.id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(AppError::Database)?
            .ok_or(AppError::NotFound("Event type not found".into()))?;

        if let Some(host_ids) = host_ids {
            sqlx::query("DELETE FROM event_type_hosts WHERE event_type_id = ?")
                .bind(&updated.id)
                .execute(&mut *tx)
                .await
                .map_err(AppError::Database)?;
            insert_hosts(&mut tx, &updated.id, host_ids).await?;
        }

        let rows = host_rows(&mut tx, &updated.id).await?;
        tx.commit().await.map_err(AppError::Database)?;
        Ok(EventTypeWithHosts::assemble(updated, &rows))
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        sqlx::query("DELETE FROM bookings WHERE event_type_id = ?").bind(id).execute(&mut *tx).await.map_err(AppError::Database)?;
        sqlx::query("DELETE FROM event_type_hosts WHERE event_type_id = ?").bind(id).execute(&mut *tx).await.map_err(AppError::Database)?;
        let result = sqlx::query("DELETE FROM event_types WHERE id = ?").bind(id).execute(&mut *tx).await.map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Event type not found".into()));
        }
        tx.commit().await.map_err(AppError::Database)?;
        Ok(())
    }
}
