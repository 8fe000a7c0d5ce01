//! CLI entry point for the air-quality report pipeline.
//!
//! Without a subcommand, fetches the configured lookback window, normalizes
//! it, runs the alert rules and writes the spreadsheet report.

use airq_report::config::Config;
use airq_report::fetch::BasicClient;
use airq_report::pipeline::{self, DateWindow, PipelineOptions};
use airq_report::report;
use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "airq_report")]
#[command(about = "Collects air-quality open data and builds an alert report", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, normalize, analyse and export over the last N days
    Run {
        /// Days to look back from today (defaults to AIRQ_LOOKBACK_DAYS)
        #[arg(long)]
        lookback_days: Option<u64>,

        /// Stop after normalization
        #[arg(long, default_value_t = false)]
        skip_analysis: bool,
    },
    /// Same as `run`, for a date range typed on stdin
    Interactive {
        /// Stop after normalization
        #[arg(long, default_value_t = false)]
        skip_analysis: bool,
    },
    /// Normalize the raw files already on disk
    Normalize,
    /// Run the alert rules over the clean tables
    Analyse,
    /// Build the spreadsheet report from the clean tables and alert files
    Export,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/airq_report.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("airq_report.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    config.log_config();

    let command = cli.command.unwrap_or(Commands::Run {
        lookback_days: None,
        skip_analysis: false,
    });

    match command {
        Commands::Run {
            lookback_days,
            skip_analysis,
        } => {
            let days = match lookback_days {
                Some(days) => days,
                None => u64::try_from(config.lookback_days)
                    .context("AIRQ_LOOKBACK_DAYS must not be negative")?,
            };
            let window = DateWindow::lookback(Local::now().date_naive(), days)?;
            run_pipeline(&config, window, !skip_analysis)?;
        }
        Commands::Interactive { skip_analysis } => {
            let window = match prompt_window() {
                Ok(window) => window,
                Err(e) => {
                    error!(error = %e, "Invalid date range");
                    eprintln!("Format de date invalide. Utilisez AAAA-MM-JJ. ({})", e);
                    std::process::exit(1);
                }
            };
            run_pipeline(&config, window, !skip_analysis)?;
        }
        Commands::Normalize => {
            pipeline::normalize_all(&config)?;
        }
        Commands::Analyse => {
            for summary in pipeline::analyse_all(&config)? {
                info!(rule = %summary.rule, alerts = summary.alerts, "Analysis finished");
            }
        }
        Commands::Export => {
            report::export(&config)?;
        }
    }

    Ok(())
}

fn run_pipeline(config: &Config, window: DateWindow, run_analysis: bool) -> Result<()> {
    let client = BasicClient::new();
    let options = PipelineOptions {
        window,
        run_analysis,
    };

    let summary = pipeline::run(config, &client, &options)?;
    info!(
        fetch_failures = summary.fetch_failures,
        datasets = summary.normalized.len(),
        alert_sets = summary.alerts.len(),
        "Pipeline finished"
    );
    Ok(())
}

/// Reads a start and an end date from stdin.
fn prompt_window() -> Result<DateWindow> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut ask = |label: &str| -> Result<String> {
        print!("{} (AAAA-MM-JJ) : ", label);
        io::stdout().flush()?;
        Ok(lines.next().transpose()?.unwrap_or_default())
    };

    let start = ask("Date de début")?;
    let end = ask("Date de fin")?;
    Ok(DateWindow::parse(&start, &end)?)
}
