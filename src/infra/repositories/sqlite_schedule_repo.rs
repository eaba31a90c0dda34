use crate::domain::{models::schedule::ScheduleWindow, ports::ScheduleRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

pub struct SqliteScheduleRepo {
    pool: SqlitePool,
}

impl SqliteScheduleRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScheduleRepository for SqliteScheduleRepo {
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<ScheduleWindow>, AppError> {
        sqlx::query_as::<_, ScheduleWindow>("SELECT * FROM schedules WHERE user_id = ? ORDER BY day ASC")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_for_users(&self, user_ids: &[String]) -> Result<Vec<ScheduleWindow>, AppError> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM schedules WHERE user_id IN (");
        let mut ids = qb.separated(", ");
        for id in user_ids {
            ids.push_bind(id.clone());
        }
        ids.push_unseparated(") ORDER BY user_id, day ASC");

        qb.build_query_as::<ScheduleWindow>().fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn replace_for_user(&self, user_id: &str, windows: &[ScheduleWindow]) -> Result<Vec<ScheduleWindow>, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        sqlx::query("DELETE FROM schedules WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        let mut saved = Vec::with_capacity(windows.len());
        for window in windows {
            let row = sqlx::query_as::<_, ScheduleWindow>(
                "INSERT INTO schedules (id, user_id, day, start_time, end_time, created_at) VALUES (?, ?, ?, ?, ?, ?) RETURNING *"
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
