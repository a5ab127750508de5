use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use nguma_api::queue::run_batch;
use nguma_db::Database;
use nguma_mail::Mailer;

/// Background task that drains the notification queue on an interval.
pub async fn run_queue_loop(
    db: Arc<Database>,
    mailer: Arc<Mailer>,
    interval_secs: u64,
    batch: usize,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        match run_batch(db.clone(), mailer.clone(), batch).await {
            Ok(run) => {
                if run.processed > 0 {
                    info!("Queue: {} sent, {} failed", run.sent, run.failed);
                }
            }
            Err(e) => {
                warn!("Queue worker error: {:#}", e);
            }
        }
    }
}
