use std::sync::Arc;

use futures::future::join_all;
use log::{debug, warn};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Duration, Instant};

use crate::core::model::{DeleteOutcome, Item, OutcomeEvent};
use crate::core::throttle::RateState;
use crate::http::Transport;

/// Issues one delete per item, staggered by position.
///
/// The delay is sampled once when the batch is scheduled: item `i` starts at
/// `i * delay` after the batch start. Rate-limit signals raised while the
/// batch runs only affect later batches. Attempts run concurrently; each one
/// reports an `OutcomeEvent` as soon as it resolves, and the call returns
/// once all of them have, with outcomes in input order.
pub struct ThrottledDeleter {
    transport: Arc<dyn Transport>,
}

impl ThrottledDeleter {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub async fn drain(
        &self,
        page: usize,
        items: &[Item],
        rate: &Arc<RateState>,
        outcome_tx: &mpsc::Sender<OutcomeEvent>,
    ) -> Vec<DeleteOutcome> {
        let delay_ms = rate.current_delay();
        let start = Instant::now();

        debug!("Scheduling {} delete(s) with a {}ms stagger", items.len(), delay_ms);

        let handles: Vec<_> = items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let transport = Arc::clone(&self.transport);
                let rate = Arc::clone(rate);
                let item = item.clone();
                let outcome_tx = outcome_tx.clone();
                let due = start + stagger_offset(index, delay_ms);

                tokio::spawn(async move {
                    sleep_until(due).await;
                    let outcome = attempt_delete(transport.as_ref(), &rate, &item.id).await;
                    // The receiver only observes; a closed channel must not stop the drain.
                    let _ = outcome_tx
                        .send(OutcomeEvent { page, item, outcome: outcome.clone() })
                        .await;
                    outcome
                })
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .map(|joined| {
                joined.unwrap_or_else(|e| DeleteOutcome::Failed(format!("delete task aborted: {}", e)))
            })
            .collect()
    }
}

/// Offset from batch start for the item at `index`.
pub fn stagger_offset(index: usize, delay_ms: u64) -> Duration {
    Duration::from_millis((index as u64).saturating_mul(delay_ms))
}

async fn attempt_delete(transport: &dyn Transport, rate: &RateState, id: &str) -> DeleteOutcome {
    match transport.delete_item(id).await {
        Ok(resp) if resp.ok => DeleteOutcome::Deleted,
        Ok(resp) if resp.is_rate_limited() => {
            let delay = rate.on_rate_limited();
            warn!("Rate limited deleting {}. Increasing delay to: {}ms", id, delay);
            DeleteOutcome::RateLimited
        }
        Ok(resp) => {
            let reason = resp.error_code.unwrap_or_else(|| "unknown error".to_string());
            warn!("Error deleting {}: {}", id, reason);
            DeleteOutcome::Failed(reason)
        }
        Err(e) => {
            warn!("Error deleting {}: {}", id, e);
            DeleteOutcome::Failed(e.to_string())
        }
    }
}
