use serde::Serialize;
use tokio::sync::mpsc;

use crate::core::engine::{DrainReport, RunStatus};
use crate::core::model::{DeleteOutcome, OutcomeEvent};
use crate::SinkRef;

/// Per-outcome counters for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DrainTally {
    pub attempted: usize,
    pub deleted: usize,
    pub rate_limited: usize,
    pub failed: usize,
}

impl DrainTally {
    pub fn record(&mut self, outcome: &DeleteOutcome) {
        self.attempted += 1;
        match outcome {
            DeleteOutcome::Deleted => self.deleted += 1,
            DeleteOutcome::RateLimited => self.rate_limited += 1,
            DeleteOutcome::Failed(_) => self.failed += 1,
        }
    }
}

/// Forwards the outcome stream to the sink and reports the run summary.
/// Counting is left to `DrainLoop`, whose report carries the tally.
pub struct OutcomeAggregator;

impl OutcomeAggregator {
    pub async fn run(mut receiver: mpsc::Receiver<OutcomeEvent>, sink: SinkRef) {
        while let Some(event) = receiver.recv().await {
            sink.on_outcome(&event);
        }
    }

    pub fn report_summary(report: &DrainReport, sink: &SinkRef) {
        let tally = &report.tally;

        sink.on_log(
            "phase",
            &format!(
                "[*] Processed {} page(s), final delay {}ms",
                report.pages, report.final_delay_ms
            ),
        );

        let level = if tally.deleted == tally.attempted { "success" } else { "warn" };
        sink.on_log(
            level,
            &format!("[+] Deleted {} of {} attempted message(s).", tally.deleted, tally.attempted),
        );

        if tally.rate_limited > 0 {
            sink.on_log(
                "warn",
                &format!(
                    "[!] {} message(s) were rate limited and skipped; run again to retry them.",
                    tally.rate_limited
                ),
            );
        }
        if tally.failed > 0 {
            sink.on_log("error", &format!("[!] {} message(s) failed to delete.", tally.failed));
        }

        if let RunStatus::Aborted { error, resume_cursor } = &report.status {
            sink.on_log("error", &format!("[!] Aborted: {}", error));
            match resume_cursor {
                Some(cursor) => sink.on_log("error", &format!("[!] Last cursor: {}", cursor)),
                None => sink.on_log("error", "[!] Last cursor: <first page>"),
            }
        }
    }
}
