//! EduReel server
//!
//! Main entry point for serving lesson video generation over HTTP.

use std::net::SocketAddr;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use edureel_orchestrator::{create_router, AppState, Config};
use edureel_providers::Credentials;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// EduReel - Educational Video Generator
///
/// Serves an HTTP API that turns a topic into a narrated lesson video with a
/// short quiz, published to a CDN.
#[derive(Parser, Debug)]
#[command(name = "edureel")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (default: edureel.json in current directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Address to bind the HTTP server to
    #[arg(long, value_name = "HOST")]
    host: Option<String>,

    /// Port for the HTTP server
    #[arg(short, long)]
    port: Option<u16>,

    /// Root directory for job workspaces
    #[arg(short, long, value_name = "DIR")]
    work_dir: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // A missing .env file is fine; variables may come from the environment.
    let dotenv = dotenvy::dotenv();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();

    match dotenv {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
        Err(e) => tracing::debug!(error = %e, "No .env file loaded"),
    }

    match run_server(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

/// Loads configuration and credentials, then serves until Ctrl+C.
async fn run_server(args: Args) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;

    if let Some(ref host) = args.host {
        config.host.clone_from(host);
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(ref work_dir) = args.work_dir {
        config.work_dir.clone_from(work_dir);
    }

    // Re-validate after overrides
    config.validate()?;

    print_config(&config);

    let credentials = Credentials::from_env()?;
    let state = AppState::from_config(&config, &credentials)?;
    let router = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse().map_err(|e| {
        anyhow::anyhow!(
            "Invalid listen address '{}:{}': {e}\n\nSuggestion: Use an IP address such as 0.0.0.0 for --host",
            config.host,
            config.port
        )
    })?;
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to bind to {addr}: {e}\n\nSuggestion: Try a different port with --port"
        )
    })?;

    tracing::info!(%addr, "EduReel listening");
    println!("EduReel running on http://{addr}");
    println!("Press Ctrl+C to stop");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves when the process receives Ctrl+C.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C, shutting down"),
        Err(e) => tracing::warn!(error = %e, "Failed to listen for Ctrl+C"),
    }
}

/// Loads configuration from the specified path or default location.
fn load_config(config_path: Option<&str>) -> anyhow::Result<Config> {
    match config_path {
        Some(path_str) => {
            let path = Path::new(path_str);
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: '{}'\n\nSuggestion: Check the path or remove the --config flag to use defaults",
                    path.display()
                );
            }
            Config::load_from_file(path).map_err(|e| anyhow::anyhow!("{e}"))
        }
        None => Config::load().map_err(|e| anyhow::anyhow!("{e}")),
    }
}

/// Prints the effective configuration.
fn print_config(config: &Config) {
    println!("Configuration:");
    println!("  Chat model:      {}", config.llm.model);
    println!("  Max retries:     {}", config.max_retries);
    println!(
        "  Renderer:        {} ({})",
        config.render.command,
        config.render.quality.directory_tag()
    );
    println!("  Images per clip: {}", config.assembly.images_per_audio);
    println!("  Work directory:  {}", config.work_dir);
    println!("  Keep on failure: {}", config.cleanup.keep_on_failure);
}
