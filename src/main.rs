use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use vigilant::config::{LogFormat, LoggingConfig, VigilantConfig};
use vigilant::incident::{filter, summarize, FilterCriteria};

#[derive(Parser)]
#[command(
    name = "vigilant",
    about = "Real-time threat incident lifecycle and alert filtering service",
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
    /// Start the daemon (API server + monitoring feed)
    Serve {
        /// Bind address (overrides config)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Run the simulated monitoring feed headless and print the incidents
    Simulate {
        /// Number of feed ticks to run
        #[arg(long, default_value = "20")]
        ticks: u32,

        /// Milliseconds between ticks
        #[arg(long, default_value = "50")]
        interval_ms: u64,

        /// Per-tick incident probability (overrides config)
        #[arg(long)]
        probability: Option<f64>,

        /// RNG seed (overrides config)
        #[arg(long)]
        seed: Option<u64>,

        /// Case-insensitive search over description, location and type
        #[arg(long)]
        search: Option<String>,

        /// Severity filter: low, medium, high, critical or all
        #[arg(long)]
        severity: Option<String>,

        /// Status filter: active, investigating, resolved or all
        #[arg(long)]
        status: Option<String>,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration
    Config,
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = VigilantConfig::resolve(cli.config.as_deref())?;
    init_tracing(&config.logging);

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            tracing::info!(bind = %config.server.bind, "Starting Vigilant daemon");
            vigilant::serve(config).await?;
        }
        Commands::Simulate {
            ticks,
            interval_ms,
            probability,
            seed,
            search,
            severity,
            status,
            json,
        } => {
            let criteria =
                FilterCriteria::parse(search.as_deref(), severity.as_deref(), status.as_deref())?;

            config.monitor.tick_interval_ms = interval_ms;
            if let Some(p) = probability {
                config.monitor.incident_probability = p;
            }
            if seed.is_some() {
                config.monitor.seed = seed;
            }
            config.validate()?;

            let interval = config.monitor.tick_interval();
            let run_for = interval
                .checked_mul(ticks)
                .and_then(|d| d.checked_add(interval / 2))
                .context("simulation is too long to schedule: lower --ticks or --interval-ms")?;

            let monitor = vigilant::build_monitor(&config).await?;
            tracing::info!(%ticks, ?interval, "Running simulated feed");

            monitor.start().await?;
            tokio::time::sleep(run_for).await;
            monitor.stop().await?;

            let snapshot = monitor.store().list_all().await;
            let view = filter(&snapshot, &criteria);
            let stats = summarize(&view);
            let feed = monitor.status().await;

            if json {
                let out = serde_json::json!({
                    "incidents": view,
                    "stats": stats,
                    "feed": feed,
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("\nVigilant Simulated Feed");
                println!(
                    "{:<20} | {:<8} | {:<13} | {:<28} | Conf",
                    "Type", "Severity", "Status", "Location"
                );
                println!("{:-<20}-|-{:-<8}-|-{:-<13}-|-{:-<28}-|-{:-<4}", "", "", "", "", "");
                if view.is_empty() {
                    println!("No incidents found. All systems are operating normally.");
                }
                for i in &view {
                    println!(
                        "{:<20} | {:<8} | {:<13} | {:<28} | {:>3}%",
                        i.kind,
                        i.severity.as_str(),
                        i.status.as_str(),
                        i.location,
                        (i.confidence * 100.0).round() as u32
                    );
                }
                println!("\n=== Summary ===");
                println!("Total: {}", stats.total);
                for (status, count) in &stats.by_status {
                    println!("  {:<14}: {}", status, count);
                }
                for (severity, count) in &stats.by_severity {
                    println!("  {:<14}: {}", severity, count);
                }
                println!("Resolution rate: {:.0}%", stats.resolution_rate * 100.0);
                println!(
                    "Feed: {} ticks, {} created, {} dropped",
                    feed.ticks, feed.created, feed.dropped
                );
                println!();
            }
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}
