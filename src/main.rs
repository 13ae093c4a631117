use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sparkfetch::{FetcherConfig, HistoryClient};

#[derive(Parser)]
#[command(
    name = "sparkfetch",
    about = "Fetch Spark application telemetry from a history server",
    version,
    long_about = None
)]
struct Cli {
    /// Config file (defaults to $SPARKFETCH_CONFIG, then /etc/sparkfetch/sparkfetch.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch summary, jobs, stages and executors for one application
    Fetch {
        /// Application id, e.g. application_1459713751000_0042
        app_id: String,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Resolve and print the history server endpoint
    Endpoint,
}

fn build_subscriber(level: &str, json: bool) -> Box<dyn tracing::Subscriber + Send + Sync> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        Box::new(builder.json().finish())
    } else {
        Box::new(builder.finish())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The configured level is not known until the config is loaded, so
    // loading itself logs through a default-level subscriber.
    let config = tracing::subscriber::with_default(build_subscriber("info", cli.log_json), || {
        match &cli.config {
            Some(path) => FetcherConfig::load(path),
            None => Ok(FetcherConfig::load_or_default()),
        }
    })?;
    tracing::subscriber::set_global_default(build_subscriber(
        &config.logging.level,
        cli.log_json,
    ))
    .context("failed to install tracing subscriber")?;

    let client = HistoryClient::new(&config).context("failed to initialise history client")?;

    match cli.command {
        Commands::Endpoint => {
            let endpoint = client.endpoint().await?;
            println!("{}", endpoint);
        }
        Commands::Fetch { app_id, json } => {
            tracing::info!(%app_id, "Fetching application");
            let result = match client.fetch_application(&app_id).await {
                Ok(result) => result,
                Err(e) => {
                    eprintln!("fetch failed ({}): {}", e.disposition(), e);
                    std::process::exit(match e.disposition() {
                        sparkfetch::Disposition::Retry => 75,
                        sparkfetch::Disposition::Skip => 65,
                        sparkfetch::Disposition::Fail => 1,
                    });
                }
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                let summary = &result.summary;
                println!("\n=== {} ({}) ===", summary.name, summary.id);
                if let Some(attempt) = summary.latest_attempt() {
                    println!(
                        "Attempt:    {}",
                        attempt.attempt_id.as_deref().unwrap_or("(single)")
                    );
                    println!("User:       {}", attempt.spark_user);
                    println!(
                        "Started:    {}",
                        sparkfetch::decode::history_time::format(&attempt.start_time)
                    );
                }
                println!();
                println!("{:<10} | {:>6}", "Resource", "Count");
                println!("{:-<10}-|-{:->6}", "", "");
                println!("{:<10} | {:>6}", "jobs", result.jobs.len());
                println!("{:<10} | {:>6}", "stages", result.stages.len());
                println!("{:<10} | {:>6}", "executors", result.executors.len());
                println!();
            }
        }
    }

    Ok(())
}
