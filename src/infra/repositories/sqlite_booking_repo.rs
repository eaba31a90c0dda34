use crate::domain::{models::{booking::Booking, job::Job}, ports::BookingRepository};
use crate::error::AppError;
use crate::infra::repositories::sqlite_job_repo::insert_job;
use async_trait::async_trait;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use chrono::{DateTime, Utc};

pub struct SqliteBookingRepo {
    pool: SqlitePool,
}

impl SqliteBookingRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingRepository for SqliteBookingRepo {
    async fn create_if_free(&self, booking: &Booking, jobs: Vec<Job>) -> Result<Option<Booking>, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        // Single statement: the overlap check and the insert share one write lock.
        let created = sqlx::query_as::<_, Booking>(
            "INSERT INTO bookings (id, organization_id, event_type_id, host_id, start_time, end_time, attendee_name, attendee_email, attendee_phone, attendee_notes, status, meeting_url, calendar_event_id, created_at)
             SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?
             WHERE ? = 'cancelled' OR NOT EXISTS (
                 SELECT 1 FROM bookings WHERE host_id = ? AND status != 'cancelled' AND start_time < ? AND end_time > ?
             )
             RETURNING *"
        )
            .bind(&booking.id).bind(&booking.organization_id).bind(&booking.event_type_id).bind(&booking.host_id)
            .bind(booking.start_time).bind(booking.end_time).bind(&booking.attendee_name).bind(&booking.attendee_email)
            .bind(&booking.attendee_phone).bind(&booking.attendee_notes).bind(&booking.status).bind(&booking.meeting_url)
            .bind(&booking.calendar_event_id).bind(booking.created_at)
            .bind(&booking.status)
            .bind(&booking.host_id).bind(booking.end_time).bind(booking.start_time)
            .fetch_optional(&mut *tx).await.map_err(AppError::Database)?;

        let Some(created) = created else {
            return Ok(None);
        };

        for job in &jobs {
            insert_job(&mut *tx, job).await?;
        }
        tx.commit().await.map_err(AppError::Database)?;
        Ok(Some(created))
    }

    async fn reschedule_if_free(&self, booking: &Booking, start: DateTime<Utc>, end: DateTime<Utc>, jobs: Vec<Job>) -> Result<Option<Booking>, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let moved = sqlx::query_as::<_, Booking>(
            "UPDATE bookings SET start_time = ?, end_time = ?, attendee_name = ?, attendee_email = ?, attendee_phone = ?, attendee_notes = ?, status = ?, meeting_url = ?, calendar_event_id = ?
             WHERE id = ? AND NOT EXISTS (
                 SELECT 1 FROM bookings o WHERE o.host_id = ? AND o.id != ? AND o.status != 'cancelled' AND o.start_time < ? AND o.end_time > ?
             )
             RETURNING *"
        )
            .bind(start).bind(end).bind(&booking.attendee_name).bind(&booking.attendee_email)
            .bind(&booking.attendee_phone).bind(&booking.attendee_notes).bind(&booking.status)
            .bind(&booking.meeting_url).bind(&booking.calendar_event_id)
            .bind(&booking.id)
            .bind(&booking.host_id).bind(&booking.id).bind(end).bind(start)
            .fetch_optional(&mut *tx).await.map_err(AppError::Database)?;

        let Some(moved) = moved else {
            return Ok(None);
        };

        sqlx::query("UPDATE jobs SET status = 'CANCELLED' WHERE json_extract(payload, '$.booking_id') = ? AND status = 'PENDING'")
            .bind(&booking.id).execute(&mut *tx).await.map_err(AppError::Database)?;
        for job in &jobs {
            insert_job(&mut *tx, job).await?;
        }
        tx.commit().await.map_err(AppError::Database)?;
        Ok(Some(moved))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>, AppError> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = ?").bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_blocking_for_hosts(&self, host_ids: &[String], start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Booking>, AppError> {
        if host_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM bookings WHERE status != 'cancelled' AND start_time < ");
        qb.push_bind(end).push(" AND end_time > ").push_bind(start).push(" AND host_id IN (");
        let mut ids = qb.separated(", ");
        for id in host_ids {
            ids.push_bind(id.clone());
        }
        ids.push_unseparated(") ORDER BY start_time ASC");

        qb.build_query_as::<Booking>().fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_by_host(&self, host_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Booking>, AppError> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE host_id = ? AND start_time < ? AND end_time > ? ORDER BY start_time ASC")
            .bind(host_id).bind(end).bind(start).fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_by_organization(&self, organization_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Booking>, AppError> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE organization_id = ? AND start_time < ? AND end_time > ? ORDER BY start_time ASC")
            .bind(organization_id).bind(end).bind(start).fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn count_for_host_between(&self, host_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM bookings WHERE host_id = ? AND status NOT IN ('cancelled', 'blocked') AND start_time >= ? AND start_time < ?")
            .bind(host_id).bind(start).bind(end).fetch_one(&self.pool).await.map_err(AppError::Database)?;
        Ok(row.get::<i64, _>("count"))
    }

    async fn count_for_organization_between(&self, organization_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM bookings WHERE organization_id = ? AND status NOT IN ('cancelled', 'blocked') AND start_time >= ? AND start_time < ?")
            .bind(organization_id).bind(start).bind(end).fetch_one(&self.pool).await.map_err(AppError::Database)?;
        Ok(row.get::<i64, _>("count"))
    }

    async fn update(&self, booking: &Booking) -> Result<Booking, AppError> {
        sqlx::query_as::<_, Booking>(
            "UPDATE bookings SET attendee_name=?, attendee_email=?, attendee_phone=?, attendee_notes=?, status=?, meeting_url=?, calendar_event_id=?
             WHERE id=?
             RETURNING *"
        )
            .bind(&booking.attendee_name).bind(&booking.attendee_email).bind(&booking.attendee_phone)
            .bind(&booking.attendee_notes).bind(&booking.status).bind(&booking.meeting_url)
            .bind(&booking.calendar_event_id).bind(&booking.id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)?
            .ok_or(AppError::NotFound("Booking not found".into()))
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = ?").bind(id).execute(&self.pool).await.map_err(AppError::Database)?;
        if result.rows_affected() == 0 { return Err(AppError::NotFound("Booking not found".into())); }
        Ok(())
    }
}
