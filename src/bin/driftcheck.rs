//! Driftcheck CLI - Command-line interface for Driftcheck
//!
//! Commands:
//! - reconcile: Compare inter-event gaps between presentation and device logs
//! - photocell: Measure photocell latency in both logs
//! - autolog: Compare device auto pulses against client send times
//! - convert: Convert a tab-separated log to comma-separated
//! - inspect: Report which rows of a log parse and which are dropped

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use driftcheck::adapters::{DeviceAdapter, PresentationAdapter};
use driftcheck::autolog::AutoLogComparison;
use driftcheck::delimited::{convert_file, load_rows};
use driftcheck::normalizer::Normalizer;
use driftcheck::types::{ComparisonResult, LatencySummary, NormalizedStream};
use driftcheck::{
    PhotocellReport, ReconcileConfig, ReconcileError, Reconciler, Reconciliation,
    DRIFTCHECK_VERSION, PRODUCER_NAME,
};

/// Driftcheck - timing reconciliation for stimulus and device event logs
#[derive(Parser)]
#[command(name = "driftcheck")]
#[command(version = DRIFTCHECK_VERSION)]
#[command(about = "Compare event timing between presentation and recording-device logs", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Logging verbosity (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Print the report as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare inter-event gaps between the two logs
    Reconcile {
        /// Presentation log (.csv, or .log/.txt for tab-separated)
        #[arg(short, long)]
        presentation: PathBuf,

        /// Device event export
        #[arg(short, long)]
        device: PathBuf,

        /// Level label kept from the presentation log
        #[arg(long)]
        label: Option<String>,

        /// Event codes to compare, comma-separated
        #[arg(short, long, value_delimiter = ',', required = true)]
        tags: Vec<String>,
    },

    /// Measure stimulus-onset to photocell latency in both logs
    Photocell {
        /// Presentation log
        #[arg(short, long)]
        presentation: PathBuf,

        /// Device event export
        #[arg(short, long)]
        device: PathBuf,

        /// Photocell code in the presentation log
        #[arg(long)]
        photocell_tag: Option<String>,

        /// Stimulus-onset codes, comma-separated
        #[arg(short, long, value_delimiter = ',', required = true)]
        tags: Vec<String>,
    },

    /// Compare device auto pulses against client send times
    Autolog {
        /// Device event export
        #[arg(short, long)]
        device: PathBuf,

        /// Client send-time file, one millisecond value per line
        #[arg(short, long)]
        client: PathBuf,
    },

    /// Convert a tab-separated log to comma-separated
    Convert {
        /// Tab-separated input
        #[arg(short, long)]
        input: PathBuf,

        /// Output path (defaults to the input with a .csv extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Report which rows of a log parse and which are dropped
    Inspect {
        /// Log file
        #[arg(short, long)]
        input: PathBuf,

        /// Which kind of log the file is
        #[arg(long, value_enum)]
        stream: StreamKind,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StreamKind {
    /// Stimulus-presentation log
    Presentation,
    /// Recording-device event export
    Device,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    start_logging(&cli.log_level);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

/// Install the stderr log subscriber
fn start_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .without_time()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .init();
}

fn run(cli: Cli) -> Result<(), DriftCliError> {
    let config = match &cli.config {
        Some(path) => ReconcileConfig::load(path)?,
        None => ReconcileConfig::default(),
    };

    match cli.command {
        Commands::Reconcile {
            presentation,
            device,
            label,
            tags,
        } => {
            let config = ReconcileConfig {
                presentation_label: label.unwrap_or(config.presentation_label),
                ..config
            };
            cmd_reconcile(config, &presentation, &device, &tags, cli.json)
        }

        Commands::Photocell {
            presentation,
            device,
            photocell_tag,
            tags,
        } => {
            let config = ReconcileConfig {
                presentation_photocell_tag: photocell_tag.unwrap_or(config.presentation_photocell_tag),
                ..config
            };
            cmd_photocell(config, &presentation, &device, &tags, cli.json)
        }

        Commands::Autolog { device, client } => cmd_autolog(config, &device, &client, cli.json),

        Commands::Convert { input, output } => cmd_convert(&input, output, cli.json),

        Commands::Inspect { input, stream } => cmd_inspect(config, &input, stream, cli.json),
    }
}

fn cmd_reconcile(
    config: ReconcileConfig,
    presentation: &Path,
    device: &Path,
    tags: &[String],
    json: bool,
) -> Result<(), DriftCliError> {
    let reconciler = Reconciler::new(config)?;
    let result = reconciler.reconcile_files(presentation, device, tags)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&Report::new(&result))?);
        return Ok(());
    }

    print_reconciliation(&result, reconciler.config().warn_threshold_ms);
    Ok(())
}

fn cmd_photocell(
    config: ReconcileConfig,
    presentation: &Path,
    device: &Path,
    tags: &[String],
    json: bool,
) -> Result<(), DriftCliError> {
    let reconciler = Reconciler::new(config)?;
    let report = reconciler.photocell_files(presentation, device, tags)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&Report::new(&report))?);
        return Ok(());
    }

    print_photocell(&report, reconciler.config().warn_threshold_ms);
    Ok(())
}

fn cmd_autolog(config: ReconcileConfig, device: &Path, client: &Path, json: bool) -> Result<(), DriftCliError> {
    let reconciler = Reconciler::new(config)?;
    let result = reconciler.auto_log_files(device, client)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&Report::new(&AutoLogView::from(&result)))?);
        return Ok(());
    }

    println!("Auto-pulse Report");
    println!("=================");
    println!("Device gaps (ms): {:?}", result.device_deltas);
    println!("Client gaps (ms): {:?}", result.client_deltas);
    print_comparison(&result.comparison, reconciler.config().warn_threshold_ms);
    Ok(())
}

fn cmd_convert(input: &Path, output: Option<PathBuf>, json: bool) -> Result<(), DriftCliError> {
    let output = output.unwrap_or_else(|| input.with_extension("csv"));
    if output == input {
        return Err(DriftCliError::SameFile(output));
    }
    let rows = convert_file(input, &output)?;

    if json {
        let summary = serde_json::json!({
            "input": input.display().to_string(),
            "output": output.display().to_string(),
            "rows": rows,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Wrote {} rows to {}", rows, output.display());
    }
    Ok(())
}

fn cmd_inspect(config: ReconcileConfig, input: &Path, stream: StreamKind, json: bool) -> Result<(), DriftCliError> {
    let rows = load_rows(input, config.delimiter)?;
    let normalized = match stream {
        StreamKind::Presentation => {
            Normalizer::normalize(&PresentationAdapter::new(&config.presentation_label), &rows)
        }
        StreamKind::Device => Normalizer::normalize(&DeviceAdapter, &rows),
    };
    let report = InspectReport::new(&normalized, rows.len());

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Inspect Report ({})", report.stream);
        println!("==============");
        println!("Total rows:   {}", report.total_rows);
        println!("Kept rows:    {}", report.kept_rows);
        println!("Dropped rows: {}", report.dropped.len());

        if !report.dropped.is_empty() {
            println!("\nDropped:");
            for row in &report.dropped {
                println!("  - line {}: {}", row.line, row.reason);
            }
        }
    }

    if report.kept_rows == 0 {
        Err(DriftCliError::NoRecords)
    } else {
        Ok(())
    }
}

// Text output

fn print_reconciliation(result: &Reconciliation, threshold_ms: f64) {
    println!("Reconciliation Report");
    println!("=====================");
    println!("Presentation timing differences (ms): {:?}", result.presentation_deltas);
    println!("Device timing differences (ms):       {:?}", result.device_deltas);
    if result.presentation_dropped + result.device_dropped > 0 {
        println!(
            "Malformed rows skipped: {} presentation, {} device",
            result.presentation_dropped, result.device_dropped
        );
    }
    print_comparison(&result.comparison, threshold_ms);
}

fn print_comparison(comparison: &ComparisonResult, threshold_ms: f64) {
    println!("Per-index difference (ms): {:?}", comparison.per_index_abs_diff);
    for &idx in &comparison.warnings {
        println!(
            "WARNING: big difference at index {}: {} ms (at or above {} ms)",
            idx, comparison.per_index_abs_diff[idx], threshold_ms
        );
    }
    match comparison.mean_ms {
        Some(mean) => println!("Average difference: {} ms", mean),
        None => println!("Average difference: no data"),
    }
}

fn print_latency(name: &str, summary: &LatencySummary, threshold_ms: f64) {
    println!("{} latencies (ms): {:?}", name, summary.latencies_ms);
    for &idx in &summary.warnings {
        println!(
            "WARNING: big {} photocell latency at index {}: {} ms (at or above {} ms)",
            summary.stream, idx, summary.latencies_ms[idx], threshold_ms
        );
    }
    match summary.mean_ms {
        Some(mean) => println!("Average {} photocell latency: {} ms", summary.stream, mean),
        None => println!("Average {} photocell latency: no data", summary.stream),
    }
}

fn print_photocell(report: &PhotocellReport, threshold_ms: f64) {
    println!("Photocell Report");
    println!("================");
    print_latency("Presentation", &report.presentation, threshold_ms);
    print_latency("Device", &report.device, threshold_ms);
    match &report.drift {
        Some(drift) => {
            println!("\nCross-log latency drift:");
            print_comparison(drift, threshold_ms);
        }
        None => println!("\nCross-log latency drift: not comparable (detection counts differ)"),
    }
}

// Error types

#[derive(Debug)]
enum DriftCliError {
    Reconcile(ReconcileError),
    Json(serde_json::Error),
    SameFile(PathBuf),
    NoRecords,
}

impl From<ReconcileError> for DriftCliError {
    fn from(e: ReconcileError) -> Self {
        DriftCliError::Reconcile(e)
    }
}

impl From<serde_json::Error> for DriftCliError {
    fn from(e: serde_json::Error) -> Self {
        DriftCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<DriftCliError> for CliError {
    fn from(e: DriftCliError) -> Self {
        match e {
            DriftCliError::Reconcile(e) => {
                let (code, hint) = match &e {
                    ReconcileError::Io { .. } => ("IO_ERROR", "Check file paths and permissions"),
                    ReconcileError::LengthMismatch { .. } => (
                        "LENGTH_MISMATCH",
                        "Run 'driftcheck inspect' on both logs and check the event tags",
                    ),
                    ReconcileError::NoRecords(_) => {
                        ("NO_RECORDS", "Check the delimiter and the presentation label")
                    }
                    ReconcileError::InvalidTag(_) => ("INVALID_TAG", "Event tags must not be blank"),
                    ReconcileError::Config(_) | ReconcileError::Toml(_) => {
                        ("CONFIG_ERROR", "Fix the configuration file and retry")
                    }
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            DriftCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            DriftCliError::SameFile(path) => CliError {
                code: "SAME_FILE".to_string(),
                message: format!("Output would overwrite input {}", path.display()),
                hint: Some("Pass --output with a different path".to_string()),
            },
            DriftCliError::NoRecords => CliError {
                code: "NO_RECORDS".to_string(),
                message: "No row of the log could be parsed".to_string(),
                hint: Some("Check --stream, the delimiter and the presentation label".to_string()),
            },
        }
    }
}

// Report types

#[derive(Serialize)]
struct Report<'a, T: Serialize> {
    producer: &'static str,
    version: &'static str,
    computed_at: DateTime<Utc>,
    result: &'a T,
}

impl<'a, T: Serialize> Report<'a, T> {
    fn new(result: &'a T) -> Self {
        Self {
            producer: PRODUCER_NAME,
            version: DRIFTCHECK_VERSION,
            computed_at: Utc::now(),
            result,
        }
    }
}

#[derive(Serialize)]
struct AutoLogView<'a> {
    device_deltas: &'a [f64],
    client_deltas: &'a [f64],
    comparison: &'a ComparisonResult,
}

impl<'a> From<&'a AutoLogComparison> for AutoLogView<'a> {
    fn from(result: &'a AutoLogComparison) -> Self {
        Self {
            device_deltas: &result.device_deltas,
            client_deltas: &result.client_deltas,
            comparison: &result.comparison,
        }
    }
}

#[derive(Serialize)]
struct InspectReport {
    stream: String,
    total_rows: usize,
    kept_rows: usize,
    dropped: Vec<DroppedRow>,
}

#[derive(Serialize)]
struct DroppedRow {
    line: usize,
    reason: String,
}

impl InspectReport {
    fn new(normalized: &NormalizedStream, total_rows: usize) -> Self {
        Self {
            stream: normalized.stream.to_string(),
            total_rows,
            kept_rows: normalized.records.len(),
            dropped: normalized
                .dropped
                .iter()
                .map(|d| DroppedRow {
                    line: d.line,
                    reason: d.reason.to_string(),
                })
                .collect(),
        }
    }
}
