use crate::domain::{models::{booking::Booking, job::Job}, ports::BookingRepository};
use crate::error::AppError;
use crate::infra::repositories::postgres_job_repo::insert_job;
use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Row};
use chrono::{DateTime, Utc};

pub struct PostgresBookingRepo {
    pool: PgPool,
}

impl PostgresBookingRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Serializes writers per host until the surrounding transaction ends.
async fn lock_host(conn: &mut PgConnection, host_id: &str) -> Result<(), AppError> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(host_id)
        .execute(conn)
        .await
        .map_err(AppError::Database)?;
    Ok(())
}

async fn has_overlap(conn: &mut PgConnection, host_id: &str, exclude_id: Option<&str>, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<bool, AppError> {
    let row = sqlx::query(
        "SELECT EXISTS (SELECT 1 FROM bookings WHERE host_id = $1 AND ($2::TEXT IS NULL OR id != $2) AND status != 'cancelled' AND start_time < $3 AND end_time > $4) AS taken"
    )
        .bind(host_id).bind(exclude_id).bind(end).bind(start)
        .fetch_one(conn).await.map_err(AppError::Database)?;
    Ok(row.get::<bool, _>("taken"))
}

#[async_trait]
impl BookingRepository for PostgresBookingRepo {
    async fn create_if_free(&self, booking: &Booking, jobs: Vec<Job>) -> Result<Option<Booking>, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        lock_host(&mut tx, &booking.host_id).await?;

        if booking.blocks_time() && has_overlap(&mut tx, &booking.host_id, None, booking.start_time, booking.end_time).await? {
            return Ok(None);
        }

        let created = sqlx::query_as::<_, Booking>("INSERT INTO bookings (id, organization_id, event_type_id, host_id, start_time, end_time, attendee_name, attendee_email, attendee_phone, attendee_notes, status, meeting_url, calendar_event_id, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) RETURNING *")
            .bind(&booking.id).bind(&booking.organization_id).bind(&booking.event_type_id).bind(&booking.host_id)
            .bind(booking.start_time).bind(booking.end_time).bind(&booking.attendee_name).bind(&booking.attendee_email)
            .bind(&booking.attendee_phone).bind(&booking.attendee_notes).bind(&booking.status).bind(&booking.meeting_url)
            .bind(&booking.calendar_event_id).bind(booking.created_at)
            .fetch_one(&mut *tx).await.map_err(AppError::Database)?;

        for job in &jobs {
            insert_job(&mut *tx, job).await?;
        }
        tx.commit().await.map_err(AppError::Database)?;
        Ok(Some(created))
    }

    async fn reschedule_if_free(&self, booking: &Booking, start: DateTime<Utc>, end: DateTime<Utc>, jobs: Vec<Job>) -> Result<Option<Booking>, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        lock_host(&mut tx, &booking.host_id).await?;

        if has_overlap(&mut tx, &booking.host_id, Some(&booking.id), start, end).await? {
            return Ok(None);
        }

        let moved = sqlx::query_as::<_, Booking>("UPDATE bookings SET start_time=$1, end_time=$2, attendee_name=$3, attendee_email=$4, attendee_phone=$5, attendee_notes=$6, status=$7, meeting_url=$8, calendar_event_id=$9 WHERE id=$10 RETURNING *")
            .bind(start).bind(end).bind(&booking.attendee_name).bind(&booking.attendee_email)
            .bind(&booking.attendee_phone).bind(&booking.attendee_notes).bind(&booking.status)
            .bind(&booking.meeting_url).bind(&booking.calendar_event_id).bind(&booking.id)
            .fetch_optional(&mut *tx).await.map_err(AppError::Database)?
            .ok_or(AppError::NotFound("Booking not found".into()))?;

        sqlx::query("UPDATE jobs SET status = 'CANCELLED' WHERE payload->>'booking_id' = $1 AND status = 'PENDING'")
            .bind(&booking.id).execute(&mut *tx).await.map_err(AppError::Database)?;
        for job in &jobs {
            insert_job(&mut *tx, job).await?;
        }
        tx.commit().await.map_err(AppError::Database)?;
        Ok(Some(moved))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>, AppError> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1").bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_blocking_for_hosts(&self, host_ids: &[String], start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Booking>, AppError> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE host_id = ANY($1) AND status != 'cancelled' AND start_time < $2 AND end_time > $3 ORDER BY start_time ASC")
            .bind(host_ids).bind(end).bind(start).fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_by_host(&self, host_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Booking>, AppError> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE host_id = $1 AND start_time < $2 AND end_time > $3 ORDER BY start_time ASC")
            .bind(host_id).bind(end).bind(start).fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_by_organization(&self, organization_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Booking>, AppError> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE organization_id = $1 AND start_time < $2 AND end_time > $3 ORDER BY start_time ASC")
            .bind(organization_id).bind(end).bind(start).fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn count_for_host_between(&self, host_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM bookings WHERE host_id = $1 AND status NOT IN ('cancelled', 'blocked') AND start_time >= $2 AND start_time < $3")
            .bind(host_id).bind(start).bind(end).fetch_one(&self.pool).await.map_err(AppError::Database)?;
        Ok(row.get::<i64, _>("count"))
    }

    async fn count_for_organization_between(&self, organization_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM bookings WHERE organization_id = $1 AND status NOT IN ('cancelled', 'blocked') AND start_time >= $2 AND start_time < $3")
            .bind(organization_id).bind(start).bind(end).fetch_one(&self.pool).await.map_err(AppError::Database)?;
        Ok(row.get::<i64, _>("count"))
    }

    async fn update(&self, booking: &Booking) -> Result<Booking, AppError> {
        sqlx::query_as::<_, Booking>("UPDATE bookings SET attendee_name=$1, attendee_email=$2, attendee_phone=$3, attendee_notes=$4, status=$5, meeting_url=$6, calendar_event_id=$7 WHERE id=$8 RETURNING *")
            .bind(&booking.attendee_name).bind(&booking.attendee_email).bind(&booking.attendee_phone)
            .bind(&booking.attendee_notes).bind(&booking.status).bind(&booking.meeting_url)
            .bind(&booking.calendar_event_id).bind(&booking.id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)?
            .ok_or(AppError::NotFound("Booking not found".into()))
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = $1").bind(id).execute(&self.pool).await.map_err(AppError::Database)?;
        if result.rows_affected() == 0 { return Err(AppError::NotFound("Booking not found".into())); }
        Ok(())
    }
}
