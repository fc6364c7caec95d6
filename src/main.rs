use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use logsentinel::analysis::AnalysisRun;
use logsentinel::config::{AppConfig, LoggingConfig};
use logsentinel::export::{self, ExportFormat};
use logsentinel::ingest::InputFormat;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Parser)]
#[command(
    name = "logsentinel",
    about = "Authentication log anomaly triage with exportable risk reports",
    version,
    long_about = None
)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Bind address (overrides config)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Analyze a log file and store the result
    Analyze {
        /// CSV file or pipe-delimited text file
        path: PathBuf,

        /// Input format: csv or delimited (default: by file extension)
        #[arg(long)]
        format: Option<InputFormat>,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Print a stored analysis as JSON
    Show {
        /// Analysis ID
        id: Uuid,
    },

    /// Export a stored analysis
    Export {
        /// Analysis ID
        id: Uuid,

        /// Export format: csv or pdf
        #[arg(long, default_value = "csv")]
        format: ExportFormat,

        /// Output file path (default: log_analysis_<id>.<ext>)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Check that the classifier is reachable and the API key works
    CheckClassifier,
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn infer_format(path: &Path) -> InputFormat {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => InputFormat::Csv,
        _ => InputFormat::Delimited,
    }
}

fn print_run(run: &AnalysisRun) {
    let a = &run.analysis;
    let counts = run.buckets.counts();
    println!("\n=== LogSentinel Analysis ===");
    println!("Analysis ID:  {}", a.analysis_id);
    println!("Logs:         {}", a.logs_count);
    println!("Overall risk: {}", a.analysis_result.overall_risk_score);
    println!(
        "Buckets:      HIGH {} | MEDIUM {} | LOW {}",
        counts.high, counts.medium, counts.low
    );
    println!("\nSummary:\n  {}", a.analysis_result.risk_summary);

    if !run.buckets.high.is_empty() {
        println!("\nHigh risk entries:");
        println!("{:<6} | {:<20} | {:<16} | Factors", "Log", "Username", "IP");
        println!("{:-<6}-|-{:-<20}-|-{:-<16}-|-{:-<30}", "", "", "", "");
        for r in &run.buckets.high {
            println!(
                "{:<6} | {:<20} | {:<16} | {}",
                r.log_index + 1,
                r.record.username,
                r.record.ip_address,
                r.risk_factors.join("; ")
            );
        }
    }

    if !a.analysis_result.recommendations.is_empty() {
        println!("\nRecommendations:");
        for (i, rec) in a.analysis_result.recommendations.iter().enumerate() {
            println!(" {}. {}", i + 1, rec);
        }
    }
    println!("============================\n");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let resolved = AppConfig::resolve(cli.config.as_deref())?;
    init_tracing(&resolved.config.logging);
    resolved.log();
    let mut config = resolved.config;

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            tracing::info!(bind = %config.server.bind, "Starting LogSentinel server");
            logsentinel::serve(config).await?;
        }
        Commands::Analyze { path, format, json } => {
            let input = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let format = format.unwrap_or_else(|| infer_format(&path));
            let pipeline = logsentinel::build_pipeline(&config)?;

            let run = pipeline.run(&input, format).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&run.analysis)?);
            } else {
                print_run(&run);
            }
        }
        Commands::Show { id } => {
            let store = logsentinel::storage::SqliteStore::open(&config.storage.db_path)?;
            let analysis = logsentinel::storage::AnalysisStore::get(&store, id)
                .await?
                .with_context(|| format!("analysis {} not found", id))?;
            println!("{}", serde_json::to_string_pretty(&analysis)?);
        }
        Commands::Export { id, format, output } => {
            let store = logsentinel::storage::SqliteStore::open(&config.storage.db_path)?;
            let analysis = logsentinel::storage::AnalysisStore::get(&store, id)
                .await?
                .with_context(|| format!("analysis {} not found", id))?;
            let bytes = export::render(&analysis, format, &config.export)?;
            let output = output.unwrap_or_else(|| PathBuf::from(export::file_name(&analysis, format)));
            std::fs::write(&output, &bytes)
                .with_context(|| format!("failed to write {}", output.display()))?;
            println!("Wrote {} ({} bytes)", output.display(), bytes.len());
        }
        Commands::CheckClassifier => {
            let classifier = logsentinel::classify::gemini::GeminiClassifier::new(&config.classifier)?;
            let timeout = std::time::Duration::from_secs(config.classifier.timeout_secs);
            let response = logsentinel::classify::check_connectivity(&classifier, timeout).await?;
            println!("Classifier OK: {}", response.trim());
        }
    }

    Ok(())
}
