use crate::domain::{models::schedule::ScheduleWindow, ports::ScheduleRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::PgPool;

pub struct PostgresScheduleRepo {
    pool: PgPool,
}

impl PostgresScheduleRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScheduleRepository for PostgresScheduleRepo {
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<ScheduleWindow>, AppError> {
        sqlx::query_as::<_, ScheduleWindow>("SELECT * FROM schedules WHERE user_id = $1 ORDER BY day ASC")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_for_users(&self, user_ids: &[String]) -> Result<Vec<ScheduleWindow>, AppError> {
        sqlx::query_as::<_, ScheduleWindow>("SELECT * FROM schedules WHERE user_id = ANY($1) ORDER BY user_id, day ASC")
            .bind(user_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn replace_for_user(&self, user_id: &str, windows: &[ScheduleWindow]) -> Result<Vec<ScheduleWindow>, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        sqlx::query("DELETE FROM schedules WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        let mut saved = Vec::with_capacity(windows.len());
        for window in windows {
            let row = sqlx::query_as::<_, ScheduleWindow>(
                "INSERT INTO schedules (id, user_id, day, start_time, end_time, created_at) VALUES ($1, $2, $3, $4, $5, $6) RETURNING *"
            )
                .bind(&window.id)
                .bind(user_id)
                .bind(window.day)
                .bind(&window.start_time)
                .bind(&window.end_time)
                .bind(window.created_at)
                .fetch_one(&mut *tx)
                .await
                .map_err(AppError::Database)?;
            saved.push(row);
        }

        tx.commit().await.map_err(AppError::Database)?;
        saved.sort_by_key(|w| w.day);
        Ok(saved)
    }
}
