use alerter::{TelegramAlerter, run_alerter_service};
use analytics::{AnalyticsEngine, EXPORT_DELIMITER, export_file_name};
use anyhow::Context;
use api_client::ReadingRecord;
use chrono::{DateTime, FixedOffset, Utc};
use clap::{Parser, Subcommand};
use comfy_table::{Table, presets::UTF8_FULL};
use configuration::{ConfigArgs, LoggingConfig, load_config, settings::Config};
use core_types::Reading;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use web_server::AppState;

/// The main entry point for the meter tracker.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; secrets may come from the real environment.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = load_config(&cli.config.config)
        .with_context(|| format!("Failed to load {}", cli.config.config.display()))?;
    let _log_guard = init_logging(&config.logging)?;

    match cli.command {
        Commands::Serve => handle_serve(config).await,
        Commands::History(args) => handle_history(&args.input, &config),
        Commands::Stats(args) => handle_stats(&args.input, &config),
        Commands::Export(args) => handle_export(args, &config),
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Tracks electricity meter readings: photo recognition, history, statistics and export.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API and, when configured, the Telegram notifier.
    Serve,
    /// Print the reading history, newest first, with deltas.
    History(InputArgs),
    /// Print per-meter consumption statistics.
    Stats(InputArgs),
    /// Write readings as `;`-delimited text for spreadsheets.
    Export(ExportArgs),
}

#[derive(Parser)]
struct InputArgs {
    /// A JSON file in the persistence service's list format: `{"readings": [...]}`.
    #[arg(long)]
    input: PathBuf,
}

#[derive(Parser)]
struct ExportArgs {
    /// A JSON file in the persistence service's list format: `{"readings": [...]}`.
    #[arg(long)]
    input: PathBuf,

    /// Destination file. Defaults to `meter_readings_<today>.csv`.
    #[arg(long)]
    output: Option<PathBuf>,
}

// ==============================================================================
// Logging
// ==============================================================================

/// Installs the global subscriber. The returned guard flushes the file writer on drop.
fn init_logging(config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .context("Invalid log filter")?;

    let registry = tracing_subscriber::registry().with(filter).with(fmt::layer());

    match &config.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "meter-tracker.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            registry
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .try_init()?;
            Ok(Some(guard))
        }
        None => {
            registry.try_init()?;
            Ok(None)
        }
    }
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn handle_serve(config: Config) -> anyhow::Result<()> {
    let state = Arc::new(AppState::from_config(&config)?);

    if state.persistence.is_some() {
        match state.reload().await {
            Ok(count) => tracing::info!(count, "Loaded persisted readings."),
            Err(e) => tracing::warn!(error = %e, "Could not load persisted readings; starting empty."),
        }
    }

    if let Some(alerter) = TelegramAlerter::new(&config.telegram)? {
        let events = state.store.read().await.subscribe();
        tokio::spawn(run_alerter_service(alerter, events));
    }

    let addr = config.server.socket_addr()?;
    web_server::run_server(addr, state).await
}

fn handle_history(input: &Path, config: &Config) -> anyhow::Result<()> {
    let readings = read_readings(input)?;
    let engine = engine(config)?;
    let offset = engine.display_offset();
    let rows = engine.derive_history_view(&readings);

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Timestamp", "Meter", "Reading (kWh)", "Change"]);
    for row in rows {
        let change = match row.delta {
            Some(delta) if delta > 0 => format!("+{delta}"),
            Some(delta) => delta.to_string(),
            None => "—".to_string(),
        };
        table.add_row(vec![
            display_time(row.reading.timestamp, offset),
            row.reading.meter_number,
            row.reading.value.to_string(),
            change,
        ]);
    }

    println!("{table}");
    Ok(())
}

fn handle_stats(input: &Path, config: &Config) -> anyhow::Result<()> {
    let readings = read_readings(input)?;
    let report = engine(config)?.compute_statistics(&readings);

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Meter",
        "Readings",
        "Consumption (kWh)",
        "Avg / day",
        "Current (kWh)",
    ]);
    for meter in &report.meters {
        table.add_row(vec![
            meter.meter_number.clone(),
            meter.readings_count.to_string(),
            meter.total_consumption.to_string(),
            format!("{:.1}", meter.average_per_day),
            meter.last_value.to_string(),
        ]);
    }

    println!("{table}");
    println!(
        "Total readings: {}  Meters: {}  Total consumption: {} kWh",
        report.total_readings, report.meter_count, report.total_consumption
    );
    Ok(())
}

fn handle_export(args: ExportArgs, config: &Config) -> anyhow::Result<()> {
    let readings = read_readings(&args.input)?;
    let text = engine(config)?.export_to_delimited_text(&readings, EXPORT_DELIMITER)?;

    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(export_file_name(chrono::Local::now().date_naive())));
    std::fs::write(&output, text).with_context(|| format!("Failed to write {}", output.display()))?;

    tracing::info!(count = readings.len(), path = %output.display(), "Export written.");
    Ok(())
}

/// Renders a timestamp in the configured display offset, the same wall clock the export uses.
fn display_time(timestamp: DateTime<Utc>, offset: FixedOffset) -> String {
    timestamp.with_timezone(&offset).format("%Y-%m-%d %H:%M").to_string()
}

fn engine(config: &Config) -> anyhow::Result<AnalyticsEngine> {
    Ok(AnalyticsEngine::with_display_offset(config.export.display_offset()?))
}

/// Reads a `{"readings": [...]}` file, or a bare array of records.
fn read_readings(path: &Path) -> anyhow::Result<Vec<Reading>> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let mut value: Value = serde_json::from_str(&raw).context("Input is not valid JSON")?;

    let records = if value.get("readings").is_some() {
        value["readings"].take()
    } else {
        value
    };
    let records: Vec<ReadingRecord> =
        serde_json::from_value(records).context("Input does not contain reading records")?;

    records
        .into_iter()
        .map(|record| Reading::try_from(record).map_err(anyhow::Error::from))
        .collect()
}
