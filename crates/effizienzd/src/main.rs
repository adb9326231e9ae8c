use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use effizienz_server::GateMatch;
use tracing_subscriber::EnvFilter;

// ── CLI definition ─────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "effizienzd",
    about = "Effizienzd — API server daemon with first-party origin gating",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to listen on (default: $EFFIZIENZ_PORT or 8080)
        #[arg(long, env = "EFFIZIENZ_PORT", default_value = "8080")]
        port: u16,
        /// Host to bind (default: $EFFIZIENZ_HOST or 0.0.0.0)
        #[arg(long, env = "EFFIZIENZ_HOST", default_value = "0.0.0.0")]
        host: String,
        /// Log level: error, warn, info, debug, verbose (default: $EFFIZIENZ_LOG_LEVEL or info)
        #[arg(long, env = "EFFIZIENZ_LOG_LEVEL")]
        log_level: Option<String>,
        /// Read the origin secret from a file instead of $EFFIZIENZ_ORIGIN_SECRET
        #[arg(long, env = "EFFIZIENZ_ORIGIN_SECRET_FILE")]
        secret_file: Option<PathBuf>,
        /// How the users/practices rule matches: substring or segment
        #[arg(long, env = "EFFIZIENZ_GATE_MATCH", default_value = "substring")]
        gate_match: GateMatch,
    },
    /// Print a newly generated origin secret
    Secret,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let effective_log_level = if let Commands::Serve { ref log_level, .. } = cli.command {
        let raw = log_level
            .clone()
            .or_else(|| std::env::var("EFFIZIENZ_LOG_LEVEL").ok())
            .unwrap_or_else(|| "info".into());
        if raw.eq_ignore_ascii_case("verbose") {
            "debug".to_owned()
        } else {
            raw
        }
    } else {
        std::env::var("EFFIZIENZ_LOG_LEVEL").unwrap_or_else(|_| "warn".into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&effective_log_level))
        .init();

    match cli.command {
        Commands::Serve {
            port,
            host,
            log_level: _,
            secret_file,
            gate_match,
        } => cmd_serve(host, port, secret_file, gate_match).await,

        Commands::Secret => {
            println!("{}", effizienz_server::generate_secret());
            Ok(())
        }
    }
}

// ── Command implementations ───────────────────────────────────────────────────

async fn cmd_serve(
    host: String,
    port: u16,
    secret_file: Option<PathBuf>,
    gate_match: GateMatch,
) -> Result<()> {
    let origin_secret = match secret_file {
        Some(path) => Some(effizienz_server::read_secret_file(&path)?),
        None => std::env::var("EFFIZIENZ_ORIGIN_SECRET").ok(),
    };

    let cfg = effizienz_server::ServerConfig {
        host,
        port,
        origin_secret,
        gate_match,
        ..Default::default()
    };

    effizienz_server::run(cfg).await
}
