use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use gcs_metric_extract_core::{
    build_report, render, Config, CsvQuoting, HttpMonitoringClient, MetricKind, OutputFormat,
    Report, ReportOptions,
};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Report the latest Cloud Storage metrics from Cloud Monitoring"
)]
struct Args {
    /// Format of the output: json, ldjson or csv [default: json]
    #[arg(long, global = true)]
    format: Option<OutputFormat>,
    /// Seconds to look back in the query [default: 660]
    #[arg(long, global = true)]
    lookback: Option<u64>,
    /// Points to report per series, 0 or less for all [default: 1]
    #[arg(long, global = true, allow_negative_numbers = true)]
    points: Option<i64>,
    /// CSV quoting: legacy or strict [default: legacy]
    #[arg(long, global = true)]
    csv_quoting: Option<CsvQuoting>,
    /// Path to config TOML
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Override the monitoring API endpoint
    #[arg(long, global = true)]
    endpoint: Option<String>,
    /// OAuth access token; falls back to `gcloud auth print-access-token`
    #[arg(long, global = true, env = "GOOGLE_OAUTH_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,
    /// Increase log verbosity (repeatable)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Request counts per bucket, method and response code
    ApiRequestCount(Projects),
    /// Object counts per bucket and storage class
    ObjectCount(Projects),
    /// Byte-seconds per bucket and storage class
    TotalByteSeconds(Projects),
    /// Total bytes per bucket and storage class
    TotalBytes(Projects),
}

#[derive(clap::Args, Debug)]
struct Projects {
    /// Projects to query
    project_ids: Vec<String>,
}

impl Command {
    fn kind(&self) -> MetricKind {
        match self {
            Command::ApiRequestCount(_) => MetricKind::ApiRequestCount,
            Command::ObjectCount(_) => MetricKind::ObjectCount,
            Command::TotalByteSeconds(_) => MetricKind::TotalByteSeconds,
            Command::TotalBytes(_) => MetricKind::TotalBytes,
        }
    }

    fn project_ids(&self) -> &[String] {
        match self {
            Command::ApiRequestCount(p)
            | Command::ObjectCount(p)
            | Command::TotalByteSeconds(p)
            | Command::TotalBytes(p) => &p.project_ids,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = Config::load(args.config.as_deref())?;
    apply_overrides(&mut config, &args);

    // Flushes the log file on drop, so it lives until main returns.
    let _log_guard = init_logging(&config, args.verbose)?;

    let options = ReportOptions::from(config.report.clone());
    let kind = args.command.kind();
    let project_ids = args.command.project_ids();
    debug!(command = %kind, projects = project_ids.len(), ?options, "starting");

    let report = if project_ids.is_empty() {
        warn!("no projects given, nothing to query");
        Report::new()
    } else {
        let mut client = HttpMonitoringClient::new(&config.client)
            .context("initializing monitoring client")?;
        build_report(&mut client, project_ids, &kind.descriptor(), &options)
            .with_context(|| format!("collecting {kind}"))?
    };

    let stdout = io::stdout();
    render(&report, &options, stdout.lock()).context("writing report")?;
    Ok(())
}

fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(format) = args.format {
        config.report.format = format;
    }
    if let Some(lookback) = args.lookback {
        config.report.lookback = lookback;
    }
    if let Some(points) = args.points {
        config.report.points = points;
    }
    if let Some(quoting) = args.csv_quoting {
        config.report.csv_quoting = quoting;
    }
    if let Some(endpoint) = &args.endpoint {
        config.client.endpoint = endpoint.clone();
    }
    if let Some(token) = &args.access_token {
        config.client.access_token = Some(token.clone());
    }
}

fn log_level(configured: &str, verbose: u8) -> String {
    match verbose {
        0 => configured.to_string(),
        1 => "info".into(),
        2 => "debug".into(),
        _ => "trace".into(),
    }
}

/// `RUST_LOG` wins over the configured level unless `-v` was given.
fn log_filter(configured: &str, verbose: u8) -> EnvFilter {
    if verbose == 0 {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return filter;
        }
    }
    EnvFilter::new(log_level(configured, verbose))
}

/// Logs go to stderr, or to the configured file through a background
/// writer whose guard the caller must hold.
fn init_logging(config: &Config, verbose: u8) -> Result<Option<WorkerGuard>> {
    let (writer, guard) = match &config.logging.file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
            let name = path
                .file_name()
                .with_context(|| format!("log file path {} has no file name", path.display()))?;
            if let Some(dir) = dir {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("creating log directory {}", dir.display()))?;
            }
            let appender = tracing_appender::rolling::never(dir.unwrap_or(Path::new(".")), name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(writer), Some(guard))
        }
        None => (BoxMakeWriter::new(io::stderr), None),
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(&config.logging.level, verbose))
        .with_ansi(guard.is_none() && atty::is(atty::Stream::Stderr))
        .with_target(false)
        .with_writer(writer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing log subscriber: {e}"))?;
    Ok(guard)
}
