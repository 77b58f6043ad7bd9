//! alarm-executor: delivers one fired alarm.
//!
//! Invoked as the schedule target. Reads the alarm event JSON
//! (`{"userID": "...", "message": "..."}`) from `--event` or stdin and
//! publishes it to the owner's notification channel.

use std::io::Read;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::info;

use reminder_core::config::{load_dotenv, Config};
use reminder_notify::{parse_event, Dispatcher, LogNotifier, Notifier, SnsNotifier};

// ── CLI ─────────────────────────────────────────────────────────────

/// Deliver a fired alarm to its owner.
#[derive(Parser, Debug)]
#[command(name = "alarm-executor", version, about)]
struct Cli {
    /// Alarm event JSON. Read from stdin when omitted.
    #[arg(long)]
    event: Option<String>,

    /// Log the alarm instead of publishing it.
    #[arg(long, env = "EXECUTOR_DRY_RUN", default_value_t = false)]
    dry_run: bool,
}

fn read_event(cli: &Cli) -> anyhow::Result<String> {
    match &cli.event {
        Some(raw) => Ok(raw.clone()),
        None => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("failed to read alarm event from stdin")?;
            Ok(raw)
        }
    }
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let event = parse_event(&read_event(&cli)?).context("invalid alarm event")?;

    let channel: Box<dyn Notifier> = if cli.dry_run {
        Box::new(LogNotifier)
    } else {
        let config = Config::from_env();
        let sdk = reminder_core::aws::sdk_config(&config.aws).await;
        Box::new(SnsNotifier::new(&sdk, &config.notify)?)
    };
    info!(channel = channel.channel_name(), user_id = %event.user_id, "executing alarm");

    let results = Dispatcher::new(vec![channel]).dispatch(&event).await;
    if let Some(failed) = results.iter().find(|r| !r.success) {
        bail!(
            "delivery through {} failed: {}",
            failed.channel,
            failed.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}
