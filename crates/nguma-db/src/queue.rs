use crate::Database;
use crate::models::{QUEUE_COLUMNS, now_ts, queued_email_from_row};
use crate::queries::OptionalExt;
use anyhow::Result;
use nguma_types::models::{QueueStatus, QueuedEmail};
use uuid::Uuid;

impl Database {
    pub fn enqueue_email(
        &self,
        template_id: &str,
        recipient_email: &str,
        params: &serde_json::Value,
    ) -> Result<QueuedEmail> {
        self.with_conn(|conn| {
            let id = Uuid::new_v4().to_string();
            conn.execute(
                "INSERT INTO notifications_queue (id, template_id, recipient_email, notification_params, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, template_id, recipient_email, params.to_string(), now_ts()],
            )?;
            conn.query_row(
                &format!("SELECT {} FROM notifications_queue WHERE id = ?1", QUEUE_COLUMNS),
                [&id],
                queued_email_from_row,
            )
            .map_err(Into::into)
        })
    }

    pub fn get_queued_email(&self, id: Uuid) -> Result<Option<QueuedEmail>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {} FROM notifications_queue WHERE id = ?1", QUEUE_COLUMNS),
                [id.to_string()],
                queued_email_from_row,
            )
            .optional()
        })
    }

    /// Move up to `batch` pending jobs to `processing` and return them, oldest first.
    /// Runs in one transaction so two workers never claim the same job.
    pub fn claim_pending_emails(&self, batch: usize) -> Result<Vec<QueuedEmail>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let claimed = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {} FROM notifications_queue
                     WHERE status = 'pending'
                     ORDER BY created_at ASC, rowid ASC
                     LIMIT ?1",
                    QUEUE_COLUMNS
                ))?;
                stmt.query_map([batch as i64], queued_email_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?
            };

            {
                let mut update = tx.prepare(
                    "UPDATE notifications_queue SET status = 'processing' WHERE id = ?1",
                )?;
                for job in &claimed {
                    update.execute([job.id.to_string()])?;
                }
            }
            tx.commit()?;

            Ok(claimed
                .into_iter()
                .map(|mut job| {
                    job.status = QueueStatus::Processing;
                    job
                })
                .collect())
        })
    }

    pub fn mark_email_sent(&self, id: Uuid) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE notifications_queue
                 SET status = 'sent', processed_at = ?1, last_error = NULL
                 WHERE id = ?2",
                (now_ts(), id.to_string()),
            )?;
            Ok(())
        })
    }

    pub fn mark_email_failed(&self, id: Uuid, error: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE notifications_queue
                 SET status = 'failed', processed_at = ?1, last_error = ?2,
                     retry_attempts = retry_attempts + 1
                 WHERE id = ?3",
                (now_ts(), error, id.to_string()),
            )?;
            Ok(())
        })
    }
}
