use anyhow::Result;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(
    name = "converter",
    version,
    about = "Media conversion worker: extracts audio with ffmpeg and reports to a coordinator",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML); environment variables are used when absent
    #[arg(short, long, global = true, env = "CONVERTER_CONFIG")]
    config: Option<PathBuf>,

    /// Coordinator node address (host:port), may be repeated
    #[arg(short, long = "node", global = true)]
    nodes: Vec<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register with a coordinator and serve jobs
    Serve {
        /// Intake listen address
        #[arg(short, long)]
        bind: Option<SocketAddr>,

        /// Directory for downloaded and converted files
        #[arg(short, long)]
        work_dir: Option<PathBuf>,

        /// Maximum number of jobs converting at once
        #[arg(long)]
        max_jobs: Option<usize>,
    },

    /// Register once and print the resulting coordinator session
    Register,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = commands::load_config(cli.config.as_deref(), &cli.nodes)?;
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }

    setup_tracing(&config.logging.level, &config.logging.format, cli.verbose)?;

    match cli.command {
        Commands::Serve {
            bind,
            work_dir,
            max_jobs,
        } => {
            if let Some(bind) = bind {
                config.server.bind_address = bind;
            }
            if let Some(work_dir) = work_dir {
                config.worker.work_dir = work_dir;
            }
            if let Some(max_jobs) = max_jobs {
                config.worker.max_concurrent_jobs = max_jobs;
            }

            tracing::info!(
                bind = %config.server.bind_address,
                nodes = config.coordinator.nodes.len(),
                work_dir = %config.worker.work_dir.display(),
                "Starting serve command"
            );
            commands::serve(config).await?;
        }

        Commands::Register => {
            tracing::info!(
                nodes = config.coordinator.nodes.len(),
                "Starting register command"
            );
            commands::register(config).await?;
        }
    }

    Ok(())
}

fn setup_tracing(level: &str, format: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("converter=debug,tower_http=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("converter={level},warn")))
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()?;
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()?;
        }
    }

    Ok(())
}
