use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::mpsc;

use crate::core::deleter::ThrottledDeleter;
use crate::core::fetcher::PageFetcher;
use crate::core::filter::ItemFilter;
use crate::core::model::{Item, OutcomeEvent, Page};
use crate::core::result_aggregator::DrainTally;
use crate::core::throttle::RateState;
use crate::error::SweepError;
use crate::http::Transport;
use crate::{SinkRef, SweepConfig};

/// Terminal status of one drain run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Done,
    /// `resume_cursor` is the last cursor the backend handed out, i.e. where
    /// a manual resume would start. After a failed fetch that is the cursor
    /// of the failed fetch. When the backend breaks pagination it is either
    /// the processed page's own cursor (no next cursor given, so the page is
    /// read again) or the repeated cursor. `None` means the first page.
    Aborted {
        error: SweepError,
        resume_cursor: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainReport {
    pub status: RunStatus,
    /// Pages fetched successfully.
    pub pages: usize,
    pub tally: DrainTally,
    pub final_delay_ms: u64,
}

impl DrainReport {
    pub fn is_done(&self) -> bool {
        self.status == RunStatus::Done
    }
}

enum LoopState {
    Fetching { cursor: Option<String> },
    Filtering { cursor: Option<String>, page: Page },
    Draining { cursor: Option<String>, page: Page, matched: Vec<Item> },
    Advancing { cursor: Option<String>, page: Page },
    Done,
    Aborted { error: SweepError, resume_cursor: Option<String> },
}

/// Walks the paginated listing one page at a time and purges every item
/// written by the target author.
///
/// Fetch failures end the run; per-item delete failures never do. Pages are
/// processed strictly sequentially: the next fetch only happens after the
/// previous page's deletes have all resolved.
pub struct DrainLoop {
    fetcher: PageFetcher,
    deleter: ThrottledDeleter,
    author_id: String,
    rate: Arc<RateState>,
    sink: SinkRef,
}

impl DrainLoop {
    pub fn new(
        transport: Arc<dyn Transport>,
        author_id: &str,
        initial_delay_ms: u64,
        rate_limit_step_ms: u64,
        sink: SinkRef,
    ) -> Self {
        Self {
            fetcher: PageFetcher::new(Arc::clone(&transport)),
            deleter: ThrottledDeleter::new(transport),
            author_id: author_id.to_string(),
            rate: Arc::new(RateState::new(initial_delay_ms, rate_limit_step_ms)),
            sink,
        }
    }

    pub fn from_config(transport: Arc<dyn Transport>, config: &SweepConfig, sink: SinkRef) -> Self {
        Self::new(
            transport,
            &config.user,
            config.initial_delay_ms,
            config.rate_limit_step_ms,
            sink,
        )
    }

    /// Runs until the listing is exhausted or a fetch fails. One
    /// `OutcomeEvent` is sent per attempted item, as soon as it resolves.
    pub async fn run(self, outcome_tx: mpsc::Sender<OutcomeEvent>) -> DrainReport {
        let mut state = LoopState::Fetching { cursor: None };
        let mut visited: HashSet<String> = HashSet::new();
        let mut pages = 0usize;
        let mut tally = DrainTally::default();

        let status = loop {
            state = match state {
                LoopState::Fetching { cursor } => {
                    self.sink.on_log("info", &format!("[*] Getting chunk number: {}", pages + 1));

                    match self.fetcher.fetch(cursor.as_deref()).await {
                        Ok(page) => {
                            pages += 1;
                            LoopState::Filtering { cursor, page }
                        }
                        Err(error) => LoopState::Aborted { error, resume_cursor: cursor },
                    }
                }

                LoopState::Filtering { cursor, page } => {
                    let matched = ItemFilter::select(&page.items, &self.author_id);
                    debug!(
                        "Page {}: {} of {} item(s) match {}",
                        pages,
                        matched.len(),
                        page.items.len(),
                        self.author_id
                    );
                    self.sink.on_page(pages, matched.len());
                    LoopState::Draining { cursor, page, matched }
                }

                LoopState::Draining { cursor, page, matched } => {
                    if !matched.is_empty() {
                        let delay_before = self.rate.current_delay();
                        let outcomes = self
                            .deleter
                            .drain(pages, &matched, &self.rate, &outcome_tx)
                            .await;

                        for outcome in &outcomes {
                            tally.record(outcome);
                        }

                        let delay_after = self.rate.current_delay();
                        if delay_after > delay_before {
                            self.sink.on_log(
                                "warn",
                                &format!("[!] Increasing delay to: {}ms", delay_after),
                            );
                        }
                        info!("Page {} drained", pages);
                    }
                    LoopState::Advancing { cursor, page }
                }

                LoopState::Advancing { cursor, page } => {
                    if !page.has_more {
                        LoopState::Done
                    } else {
                        match page.next_cursor {
                            None => LoopState::Aborted {
                                error: SweepError::MissingCursor,
                                resume_cursor: cursor,
                            },
                            Some(next) if !visited.insert(next.clone()) => {
                                warn!("Cursor {} was already visited", next);
                                LoopState::Aborted {
                                    error: SweepError::Remote(format!("cursor {} repeated", next)),
                                    resume_cursor: Some(next),
                                }
                            }
                            Some(next) => LoopState::Fetching { cursor: Some(next) },
                        }
                    }
                }

                LoopState::Done => break RunStatus::Done,

                LoopState::Aborted { error, resume_cursor } => {
                    warn!("Drain aborted: {}", error);
                    break RunStatus::Aborted { error, resume_cursor };
                }
            };
        };

        if status == RunStatus::Done {
            self.sink.on_log("success", "[+] Loop finished.");
        }

        DrainReport {
            status,
            pages,
            tally,
            final_delay_ms: self.rate.current_delay(),
        }
    }
}
