//! CLI tool for sending H-1 booking reminders
//!
//! Intended for deployments that drive reminders from system cron instead
//! of the in-process scheduler.
//!
//! Usage:
//!   send-reminders [--config <path>] [--date <YYYY-MM-DD>] [--dry-run] [--verbose]
//!
//! Options:
//!   --config   Path to configuration file
//!   --date     Remind for bookings starting on this local date (default: tomorrow)
//!   --dry-run  List what would be sent without sending
//!   --verbose  Enable debug output
//!
//! Example cron entry (07:00 every day):
//!   0 7 * * * /usr/local/bin/send-reminders --config /etc/smartspace/config.yaml

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::{error, info};

use smartspace::{
    db, services,
    services::ReminderJob,
    utils::logging::init_logging,
    AppConfig, AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let mut config_path: Option<PathBuf> = None;
    let mut date: Option<NaiveDate> = None;
    let mut dry_run = false;
    let mut verbose = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--date" => {
                if i + 1 < args.len() {
                    date = Some(
                        NaiveDate::parse_from_str(&args[i + 1], "%Y-%m-%d")
                            .with_context(|| format!("Invalid --date: {}", args[i + 1]))?,
                    );
                    i += 1;
                }
            }
            "--dry-run" => {
                dry_run = true;
            }
            "--verbose" | "-v" => {
                verbose = true;
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    if let Some(ref path) = config_path {
        env::set_var("SMARTSPACE_CONFIG", path);
    }
    let config = AppConfig::load().context("Failed to load configuration")?;
    let _log_guard = init_logging(&config.logging, verbose.then_some("debug"));

    info!("SmartSpace - reminder sender");

    let db = db::init_pool(&config.database)
        .await
        .context("Failed to initialize database")?;
    let mailer = services::mailer_from_config(config.email.as_ref())?;
    let state = AppState::build(config, db, mailer).await?;

    let job = ReminderJob::new(state.db.clone(), state.timezone, state.notifier.clone());
    let summary = job.run(date, dry_run).await?;

    let day = summary
        .date
        .map(|d| d.to_string())
        .unwrap_or_else(|| "tomorrow".to_string());
    if dry_run {
        println!("{} approved booking(s) on {} would be reminded", summary.found, day);
        return Ok(());
    }

    info!(
        "Reminders for {}: {} found, {} sent, {} failed",
        day, summary.found, summary.sent, summary.failed
    );

    if summary.failed > 0 {
        error!("{} reminder(s) could not be delivered", summary.failed);
        std::process::exit(1);
    }

    Ok(())
}

fn print_help() {
    println!(
        r#"send-reminders - Send H-1 reminders for approved bookings

USAGE:
    send-reminders [OPTIONS]

OPTIONS:
    --config <PATH>      Path to configuration file
    --date <YYYY-MM-DD>  Local date whose bookings are reminded (default: tomorrow)
    --dry-run            Count matching bookings without sending anything
    -v, --verbose        Enable debug logging
    -h, --help           Print this help message"#
    );
}
