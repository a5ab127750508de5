use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::future::join_all;
use serde_json::{Map, Value};
use tracing::{error, info};

use nguma_db::Database;
use nguma_mail::Mailer;
use nguma_types::api::{EnqueueEmailRequest, EnqueueEmailResponse, QueueRunResponse};
use nguma_types::models::QueuedEmail;

use crate::error::ApiError;
use crate::state::AppState;

/// Claim up to `batch` pending jobs, send them concurrently and record each
/// outcome. Used by the cron endpoint and the in-process worker.
pub async fn run_batch(
    db: Arc<Database>,
    mailer: Arc<Mailer>,
    batch: usize,
) -> anyhow::Result<QueueRunResponse> {
    let claim_db = db.clone();
    let jobs = tokio::task::spawn_blocking(move || claim_db.claim_pending_emails(batch)).await??;
    if jobs.is_empty() {
        return Ok(QueueRunResponse::default());
    }
    info!("Processing {} queued emails", jobs.len());

    let outcomes = join_all(jobs.into_iter().map(|job| {
        let db = db.clone();
        let mailer = mailer.clone();
        async move { deliver(db, mailer, job).await }
    }))
    .await;

    let mut result = QueueRunResponse {
        processed: outcomes.len(),
        ..Default::default()
    };
    for sent in outcomes {
        if sent {
            result.sent += 1;
        } else {
            result.failed += 1;
        }
    }
    Ok(result)
}

/// Send one job and record the result. Returns whether it was sent.
async fn deliver(db: Arc<Database>, mailer: Arc<Mailer>, job: QueuedEmail) -> bool {
    let params = match job.notification_params {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    let outcome = mailer
        .send_template(&job.template_id, &job.recipient_email, params)
        .await;
    let sent = outcome.is_ok();

    let id = job.id;
    let recorded = tokio::task::spawn_blocking(move || match outcome {
        Ok(_) => db.mark_email_sent(id),
        Err(e) => {
            error!("Queued email {} failed: {}", id, e);
            db.mark_email_failed(id, &e.to_string())
        }
    })
    .await;

    match recorded {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("Failed to record outcome of queued email {}: {:#}", id, e),
        Err(e) => error!("spawn_blocking join error: {}", e),
    }
    sent
}

/// `POST /functions/v1/process-notification-queue`
pub async fn process_queue(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let result = run_batch(state.db.clone(), state.mailer.clone(), state.queue_batch_size).await?;
    Ok(Json(result))
}

/// `POST /functions/v1/enqueue-email`
pub async fn enqueue_email(
    State(state): State<AppState>,
    payload: Result<Json<EnqueueEmailRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    if req.template_id.trim().is_empty() || req.recipient_email.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Missing required fields (template_id, recipient_email)".into(),
        ));
    }
    if nguma_mail::templates::find(&req.template_id).is_none() {
        return Err(ApiError::NotFound(format!("Invalid template_id: {}", req.template_id)));
    }

    let params = Value::Object(req.notification_params);
    let queued = state
        .blocking(move |db| db.enqueue_email(&req.template_id, &req.recipient_email, &params))
        .await?;

    Ok((StatusCode::CREATED, Json(EnqueueEmailResponse { id: queued.id })))
}
