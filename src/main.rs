//! arbiter CLI - sandboxed code-judging service.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use arbiter::api::{self, ApiState};
use arbiter::config::{self, Config};
use arbiter::pool::SandboxPool;
use arbiter::queue::SubmissionQueue;
use arbiter::runtime::docker::DockerRuntime;
use arbiter::worker::{ResultPublisher, Worker};

#[derive(Parser)]
#[command(name = "arbiter")]
#[command(about = "Sandboxed code-judging service", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "arbiter.toml")]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the judging service
    Serve {
        /// Override the intake bind address
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Validate configuration file
    Validate,

    /// Initialize a new configuration file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Serve { bind } => serve(&cli.config, bind).await,
        Commands::Validate => validate_config(&cli.config),
        Commands::Init => init_config(),
    }
}

fn load_or_default(config_path: &Path) -> Result<Config> {
    if config_path.exists() {
        let config = config::load_config(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
        info!("Loaded configuration from {}", config_path.display());
        Ok(config)
    } else {
        info!(
            "No configuration at {}, running with defaults",
            config_path.display()
        );
        Ok(Config::default())
    }
}

async fn serve(config_path: &Path, bind_override: Option<String>) -> Result<()> {
    let mut config = load_or_default(config_path)?;
    if let Some(bind) = bind_override {
        config.server.bind_addr = bind;
    }

    let runtime = Arc::new(
        DockerRuntime::connect(config.docker.host.as_deref())
            .context("Failed to connect to the container runtime")?,
    );
    let pool = Arc::new(SandboxPool::new(
        runtime,
        config.judge.pool_capacity,
        config.docker.image_map(),
    ));
    let queue = Arc::new(SubmissionQueue::new());

    let publisher = ResultPublisher::new(
        config.callback.base_url.clone(),
        config.callback.request_timeout(),
    )?;
    let worker = Worker::new(
        Arc::clone(&queue),
        Arc::clone(&pool),
        publisher,
        config.judge.compile_budget(),
        config.judge.default_cpu_count,
    );
    tokio::spawn(worker.run());

    info!(
        "Judge ready: pool capacity {}, callback {}",
        config.judge.pool_capacity, config.callback.base_url
    );

    let router = api::router(ApiState { queue });
    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;
    info!("Listening on {}", config.server.bind_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Intake server failed")?;

    info!("Shutting down, draining sandboxes");
    pool.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to install shutdown handler: {e}");
    }
}

fn validate_config(config_path: &Path) -> Result<()> {
    match config::load_config(config_path) {
        Ok(config) => {
            println!("Configuration is valid!");
            println!();
            println!("Settings:");
            println!("  Pool capacity: {}", config.judge.pool_capacity);
            println!("  Compile timeout: {}s", config.judge.compile_timeout_secs);
            println!("  Bind address: {}", config.server.bind_addr);
            println!("  Callback: {}", config.callback.base_url);
            match &config.docker.host {
                Some(host) => println!("  Docker host: {}", host),
                None => println!("  Docker host: local defaults"),
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_config() -> Result<()> {
    let config = r#"# arbiter configuration file

[judge]
# Maximum number of warm sandbox containers.
pool_capacity = 10
# Fixed budget for the compile step, per submission.
compile_timeout_secs = 10
# CPUs per sandbox; submissions do not carry their own count.
default_cpu_count = 1

[server]
bind_addr = "0.0.0.0:8080"

[callback]
# Grading service that receives judging results.
base_url = "http://localhost:5129/"
request_timeout_secs = 30

[docker]
# host = "http://dockerd:2375"

[docker.images]
# cpp = "gcc:latest"
# python = "python:3.11-alpine"
"#;

    let path = PathBuf::from("arbiter.toml");
    if path.exists() {
        eprintln!("arbiter.toml already exists. Remove it first or edit manually.");
        std::process::exit(1);
    }

    std::fs::write(&path, config)?;
    println!("Created arbiter.toml");
    println!();
    println!("Edit the configuration as needed, then run:");
    println!("  arbiter serve");

    Ok(())
}
