use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, info_span, Instrument};
use crate::domain::models::{booking::BookingStatus, job::Job};
use crate::domain::services::notification_service::{self, NotificationKind};
use crate::error::AppError;
use crate::state::AppState;

const POLL_INTERVAL: Duration = Duration::from_secs(5);
const BATCH_SIZE: i32 = 10;

pub async fn start_background_worker(state: Arc<AppState>) {
    info!("Starting background job worker...");

    loop {
        run_once(&state).await;
        sleep(POLL_INTERVAL).await;
    }
}

/// Claims one batch of due jobs and processes it. Returns the number claimed.
pub async fn run_once(state: &Arc<AppState>) -> usize {
    let jobs = match state.job_repo.find_pending(BATCH_SIZE).await {
        Ok(jobs) => jobs,
        Err(e) => {
            error!("Failed to fetch pending jobs: {:?}", e);
            return 0;
        }
    };
    let claimed = jobs.len();

    for job in jobs {
        let span = info_span!(
            "background_job",
            job_id = %job.id,
            job_type = %job.job_type,
            organization_id = %job.payload.organization_id
        );

        async {
            info!("Processing job: {}", job.job_type);
            match process_job(state, &job).await {
                Ok(_) => {
                    info!("Job completed successfully");
                    if let Err(e) = state.job_repo.update_status(&job.id, "COMPLETED", None).await {
                        error!("Failed to mark job as completed: {:?}", e);
                    }
                }
                Err(e) => {
                    let err_msg = format!("{}", e);
                    error!("Job failed with error: {}", err_msg);
                    if let Err(up_err) = state.job_repo.update_status(&job.id, "FAILED", Some(err_msg)).await {
                        error!("Failed to mark job as failed: {:?}", up_err);
                    }
                }
            }
        }
            .instrument(span)
            .await;
    }

    claimed
}

async fn process_job(state: &AppState, job: &Job) -> Result<(), AppError> {
    let kind = NotificationKind::from_job_type(&job.job_type)
        .ok_or_else(|| AppError::InternalWithMsg(format!("Unknown job type {}", job.job_type)))?;
    let booking_id = &job.payload.booking_id;

    let Some(booking) = state.booking_repo.find_by_id(booking_id).await? else {
        info!("Booking {} no longer exists, skipping", booking_id);
        return Ok(());
    };

    // Only the cancellation notice outlives a confirmed booking.
    if kind != NotificationKind::Cancellation && booking.status != BookingStatus::Confirmed.as_str() {
        info!("Booking {} is {}, skipping {}", booking_id, booking.status, job.job_type);
        return Ok(());
    }

    let event_type = state.event_type_repo.find_by_id(&booking.event_type_id).await?
        .ok_or(AppError::NotFound(format!("Event type {} not found", booking.event_type_id)))?
        .event_type;
    let host = state.user_repo.find_by_id(&booking.host_id).await?
        .ok_or(AppError::NotFound(format!("Host {} not found", booking.host_id)))?;

    notification_service::deliver(
        state.email_service.as_ref(),
        &state.templates,
        kind,
        &booking,
        &event_type,
        &host,
        &state.config.public_base_url,
    )
    .await
}
