//! Sensorboard CLI
//!
//! One-shot commands against a reading source:
//! - Show the current reading
//! - Show recent history and its statistics
//! - Export history to CSV
//! - Check the sensor API status
//! - Generate a default config file

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};
use sensorboard::config::{generate_default_config, Config};
use sensorboard::export::{ExportError, ExportRange, ExportRow, Exporter, FileDownload};
use sensorboard::reading::Reading;
use sensorboard::source::{build_source, ReadingSource, SourceMode};
use sensorboard::stats::aggregate;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "sensorboard-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Query and export environmental sensor readings")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Reading source override (live, synthetic)
    #[arg(short, long, global = true)]
    pub source: Option<SourceMode>,

    /// Sensor API URL (default: from config)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the current reading
    Current,

    /// Show recent readings
    History,

    /// Show statistics over recent readings
    Stats,

    /// Export recent readings to a CSV file
    Export {
        /// Time range (24h, 7d, 30d, all)
        #[arg(short, long, default_value = "all")]
        range: ExportRange,
        /// Output directory (default: from config)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show sensor API status
    Status,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::resolve(cli.config.as_deref()).context("loading configuration")?;
    if let Some(mode) = cli.source {
        config.source.mode = mode;
    }
    if let Some(url) = &cli.api_url {
        config.source.base_url = url.clone();
    }

    let json = cli.format == "json";

    match cli.command {
        Commands::Current => {
            let source = open_source(&config)?;
            let reading = source
                .current()
                .await
                .with_context(|| format!("fetching current reading from {} source", source.name()))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&reading)?);
            } else {
                println!("Temperature: {:.1}°C", reading.temperature);
                println!("Humidity:    {:.1}%", reading.humidity);
                println!("Light:       {}%", reading.light);
                println!("Taken at:    {}", reading.timestamp_string());
            }
        }

        Commands::History => {
            let history = fetch_history(&config).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&history)?);
            } else if history.is_empty() {
                println!("No readings yet");
            } else {
                print_table(&history);
            }
        }

        Commands::Stats => {
            let history = fetch_history(&config).await?;

            match aggregate(&history) {
                Ok(stats) if json => println!("{}", serde_json::to_string_pretty(&stats)?),
                Ok(stats) => {
                    println!("Readings:            {}", stats.sample_count);
                    println!("Average temperature: {:.1}°C", stats.avg_temperature);
                    println!("Average humidity:    {:.1}%", stats.avg_humidity);
                    println!("Average light:       {}%", stats.avg_light);
                }
                Err(_) => println!("No readings yet"),
            }
        }

        Commands::Export { range, output } => {
            let history = fetch_history(&config).await?;
            let dir = output.unwrap_or_else(|| PathBuf::from(&config.export.output_dir));

            let exporter = Exporter::new(FileDownload::new(dir));
            match exporter.export(&ExportRow::from_history(&history), range, Utc::now()) {
                Ok(summary) => {
                    println!(
                        "Exported {} readings ({}) to {}",
                        summary.rows,
                        summary.range,
                        summary.location.display()
                    );
                }
                Err(ExportError::EmptyResult { range }) => {
                    eprintln!("No data available for range {}", range);
                    std::process::exit(1);
                }
                Err(e) => return Err(e).context("exporting readings"),
            }
        }

        Commands::Status => {
            let url = format!("{}/health", config.source.base_url.trim_end_matches('/'));
            let response = reqwest::Client::new().get(&url).send().await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    let health: serde_json::Value = resp.json().await?;

                    if json {
                        println!("{}", serde_json::to_string_pretty(&health)?);
                        return Ok(());
                    }

                    println!("Sensorboard v{}", env!("CARGO_PKG_VERSION"));
                    println!();
                    println!("API Status: {}", health["status"].as_str().unwrap_or("unknown"));
                    println!("Storage:    {}", health["storage"].as_str().unwrap_or("unknown"));
                    if let Some(readings) = health["readings"].as_u64() {
                        println!("Readings:   {}", readings);
                    }
                    if let Some(uptime) = health["uptime_seconds"].as_u64() {
                        println!();
                        println!("Uptime: {}", format_duration(uptime));
                    }
                }
                Ok(resp) => {
                    bail!("API returned error: {}", resp.status());
                }
                Err(e) => {
                    eprintln!("Cannot connect to sensor API at {}", config.source.base_url);
                    eprintln!("Error: {}", e);
                    eprintln!();
                    eprintln!("Make sure the sensor API server is running:");
                    eprintln!("  cargo run --bin sensorboard-api");
                    std::process::exit(1);
                }
            }
        }

        Commands::Config { output } => {
            let config = generate_default_config();

            match output {
                Some(path) => {
                    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &config)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }
    }

    Ok(())
}

fn open_source(config: &Config) -> anyhow::Result<Arc<dyn ReadingSource>> {
    build_source(&config.source).context("creating reading source")
}

async fn fetch_history(config: &Config) -> anyhow::Result<Vec<Reading>> {
    let source = open_source(config)?;
    source
        .history()
        .await
        .with_context(|| format!("fetching history from {} source", source.name()))
}

fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else if seconds < 86400 {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    } else {
        format!("{}d {}h", seconds / 86400, (seconds % 86400) / 3600)
    }
}

fn print_table(history: &[Reading]) {
    println!(
        "{:<6} {:<20} {:>8} {:>9} {:>6}",
        "ID", "Timestamp", "Temp °C", "Humid %", "Light"
    );
    println!("{}", "-".repeat(53));

    for reading in history {
        let id = reading
            .id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<6} {:<20} {:>8.1} {:>9.1} {:>6}",
            id,
            reading.timestamp_string(),
            reading.temperature,
            reading.humidity,
            reading.light
        );
    }
}
