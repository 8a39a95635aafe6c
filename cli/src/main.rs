use clap::Parser;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::process;
use std::sync::Arc;
use std::time::Duration;

use sweeper_core::{
    run_sweep, ConsoleSink, OutcomeEvent, SinkRef, SweepConfig, SweepEventSink,
    DEFAULT_API_BASE, DEFAULT_INITIAL_DELAY_MS, DEFAULT_RATE_LIMIT_STEP_MS,
};

#[derive(Parser, Debug)]
#[command(
    name = "sweeper",
    version,
    about = "Delete every message a user posted in a Slack channel, politely",
    after_help = "\x1b[1;36mEXAMPLES:\x1b[0m
  Purge a user:                   sweeper -t xoxp-... -c C0123456 -u U0123456
  Slower start:                   sweeper -t xoxp-... -c C0123456 -u U0123456 -d 1000
  From the environment:           SLACK_TOKEN=... SLACK_CHANNEL=... SLACK_USER=... sweeper
  Dry-run:                        sweeper -c C0123456 -u U0123456 -t xoxp-... --dry-run"
)]
pub struct Args {
    #[arg(short = 't', long, env = "SLACK_TOKEN", hide_env_values = true, help = "Slack token")]
    pub token: String,

    #[arg(short = 'c', long, env = "SLACK_CHANNEL", help = "Slack channel ID")]
    pub channel: String,

    #[arg(short = 'u', long, env = "SLACK_USER", help = "Delete messages for this user ID")]
    pub user: String,

    #[arg(short = 'd', long, env = "SLACK_REQUEST_DELAY", default_value_t = DEFAULT_INITIAL_DELAY_MS,
        help = "Initial delay between delete requests in milliseconds")]
    pub delay: u64,

    #[arg(long, default_value_t = DEFAULT_RATE_LIMIT_STEP_MS,
        help = "Delay increase in milliseconds each time Slack rate limits a delete")]
    pub step: u64,

    #[arg(long, default_value_t = 1000, help = "Messages requested per history page")]
    pub page_size: usize,

    #[arg(long, default_value_t = 10, help = "Request timeout in seconds")]
    pub timeout: u64,

    #[arg(long, default_value = DEFAULT_API_BASE, help = "Slack Web API base URL")]
    pub api_base: String,

    #[arg(long, help = "Proxy URL (e.g. http://127.0.0.1:8080)")]
    pub proxy: Option<String>,

    #[arg(short = 'v', long, default_value_t = false, help = "Show debug logging")]
    pub verbose: bool,

    #[arg(long, help = "Print what would be deleted without contacting Slack")]
    pub dry_run: bool,
}

impl Args {
    fn into_config(self) -> SweepConfig {
        SweepConfig {
            token: self.token,
            channel: self.channel,
            user: self.user,
            initial_delay_ms: self.delay,
            rate_limit_step_ms: self.step,
            page_size: self.page_size,
            timeout: self.timeout,
            api_base: self.api_base,
            proxy: self.proxy.unwrap_or_default(),
            dry_run: self.dry_run,
            verbose: self.verbose,
        }
    }
}

/// Console output with a spinner counting processed messages.
struct ProgressSink {
    console: ConsoleSink,
    bar: ProgressBar,
}

impl ProgressSink {
    fn new_ref() -> SinkRef {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {pos} message(s) processed {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        Arc::new(Self { console: ConsoleSink, bar })
    }
}

impl SweepEventSink for ProgressSink {
    fn on_log(&self, level: &str, message: &str) {
        self.bar.suspend(|| self.console.on_log(level, message));
    }

    fn on_outcome(&self, event: &OutcomeEvent) {
        self.bar.suspend(|| self.console.on_outcome(event));
        self.bar.inc(1);
    }

    fn on_page(&self, index: usize, matched: usize) {
        self.bar.set_message(format!("(chunk {})", index));
        self.bar.suspend(|| self.console.on_page(index, matched));
    }
}

impl Drop for ProgressSink {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

#[tokio::main]
async fn main() {
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let args = Args::parse();
    init_logging(args.verbose);

    let config = args.into_config();

    if let Err(e) = config.validate() {
        eprintln!("{}", format!("[!] {}", e).red());
        process::exit(2);
    }

    print_sweep_config(&config);

    if config.dry_run {
        println!(
            "[DRY RUN] Would delete messages from user {} in channel {}",
            config.user, config.channel
        );
        return;
    }

    match sweep(&config).await {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("{}", format!("[!] {:#}", e).red());
            process::exit(1);
        }
    }
}

/// Runs the sweep and returns whether the listing was fully drained.
async fn sweep(config: &SweepConfig) -> anyhow::Result<bool> {
    println!("{}", "[*] Starting slack channel cleaner.".bright_cyan().bold());

    let sink = ProgressSink::new_ref();
    let report = run_sweep(config, sink).await?;

    log::debug!("Final report: {:?}", report);
    Ok(report.is_done())
}

fn print_sweep_config(config: &SweepConfig) {
    println!("{}", format!("[+] Channel:    {}", config.channel).green().bold());
    println!("{}", format!("[+] User:       {}", config.user).green());
    println!("{}", format!("[+] Delay:      {}ms (+{}ms per rate limit)", config.initial_delay_ms, config.rate_limit_step_ms).blue());
    println!("{}", format!("[+] Page size:  {}", config.page_size).blue());
    println!("{}", format!("[+] Timeout:    {}s", config.timeout).blue());
    if config.api_base != DEFAULT_API_BASE {
        println!("{}", format!("[+] API base:   {}", config.api_base).yellow());
    }
    if let Some(proxy) = config.proxy_ref() {
        println!("{}", format!("[+] Proxy:      {}", proxy).yellow());
    }
    println!("{}", "──────────────────────────────────────────────────".dimmed());
}
