pub mod core;
pub mod error;
pub mod http;

#[cfg(test)]
mod testing;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;

pub use crate::core::engine::{DrainLoop, DrainReport, RunStatus};
pub use crate::core::model::{DeleteOutcome, Item, OutcomeEvent, Page};
pub use crate::core::result_aggregator::{DrainTally, OutcomeAggregator};
pub use crate::core::throttle::{RateState, DEFAULT_INITIAL_DELAY_MS, DEFAULT_RATE_LIMIT_STEP_MS};
pub use crate::error::{SweepError, TransportError};
pub use crate::http::client::DEFAULT_API_BASE;
pub use crate::http::{SlackClient, Transport};

/// Shared sweep configuration, resolved by the CLI from flags and environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SweepConfig {
    pub token: String,
    pub channel: String,
    pub user: String,
    pub initial_delay_ms: u64,
    pub rate_limit_step_ms: u64,
    pub page_size: usize,
    pub timeout: u64,
    pub api_base: String,
    pub proxy: String,
    pub dry_run: bool,
    pub verbose: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            channel: String::new(),
            user: String::new(),
            initial_delay_ms: DEFAULT_INITIAL_DELAY_MS,
            rate_limit_step_ms: DEFAULT_RATE_LIMIT_STEP_MS,
            page_size: 1000,
            timeout: 10,
            api_base: DEFAULT_API_BASE.to_string(),
            proxy: String::new(),
            dry_run: false,
            verbose: false,
        }
    }
}

impl SweepConfig {
    pub fn validate(&self) -> Result<(), SweepError> {
        for (name, value) in [("token", &self.token), ("channel", &self.channel), ("user", &self.user)] {
            if value.trim().is_empty() {
                return Err(SweepError::Config(name.to_string()));
            }
        }
        Ok(())
    }

    pub fn proxy_ref(&self) -> Option<&str> {
        if self.proxy.is_empty() { None } else { Some(&self.proxy) }
    }
}

/// Output abstraction for the sweep pipeline.
pub trait SweepEventSink: Send + Sync {
    fn on_log(&self, level: &str, message: &str);
    fn on_outcome(&self, event: &OutcomeEvent);
    fn on_page(&self, index: usize, matched: usize);
}

pub type SinkRef = Arc<dyn SweepEventSink>;

/// Terminal output sink for CLI usage.
pub struct ConsoleSink;

const PREVIEW_CHARS: usize = 60;

fn preview(content: &str) -> String {
    let line = content.lines().next().unwrap_or("");
    if line.chars().count() > PREVIEW_CHARS {
        format!("{}…", line.chars().take(PREVIEW_CHARS).collect::<String>())
    } else {
        line.to_string()
    }
}

impl SweepEventSink for ConsoleSink {
    fn on_log(&self, level: &str, message: &str) {
        use colored::*;
        let colored = match level {
            "success" => message.green().to_string(),
            "error"   => message.red().to_string(),
            "warn"    => message.yellow().to_string(),
            "phase"   => message.bright_cyan().bold().to_string(),
            _         => message.to_string(),
        };
        println!("{}", colored);
    }

    fn on_outcome(&self, event: &OutcomeEvent) {
        use colored::*;
        let text = preview(&event.item.content);
        let line = match &event.outcome {
            DeleteOutcome::Deleted => format!("{} {} {}", "[-]".green().bold(), event.item.id.white(), text.dimmed()),
            DeleteOutcome::RateLimited => format!("{} {} rate limited", "[~]".yellow().bold(), event.item.id.white()),
            DeleteOutcome::Failed(reason) => {
                format!("{} {} {} {}", "[!]".red().bold(), event.item.id.white(), reason.red(), text.dimmed())
            }
        };
        println!("{}", line);
    }

    fn on_page(&self, index: usize, matched: usize) {
        use colored::*;
        if matched > 0 {
            println!("{}", format!("[*] Chunk {}: found {} user message(s)", index, matched).bright_cyan());
        } else {
            println!("{}", format!("[*] Chunk {}: no user messages", index).dimmed());
        }
    }
}

/// Runs a full drain against any transport, feeding outcomes to the sink
/// as they resolve.
pub async fn run_with_transport(
    transport: Arc<dyn Transport>,
    config: &SweepConfig,
    sink: SinkRef,
) -> DrainReport {
    let (outcome_tx, outcome_rx) = mpsc::channel::<OutcomeEvent>(100);
    let drain = DrainLoop::from_config(transport, config, Arc::clone(&sink));

    let (report, ()) = tokio::join!(
        drain.run(outcome_tx),
        OutcomeAggregator::run(outcome_rx, Arc::clone(&sink))
    );

    OutcomeAggregator::report_summary(&report, &sink);
    report
}

/// Builds the Slack client from `config` and drains the channel.
pub async fn run_sweep(config: &SweepConfig, sink: SinkRef) -> Result<DrainReport, SweepError> {
    config.validate()?;

    let client = SlackClient::new(
        &config.token,
        &config.channel,
        &config.api_base,
        config.page_size,
        config.timeout,
        config.proxy_ref(),
    )?;

    Ok(run_with_transport(Arc::new(client), config, sink).await)
}
