use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use effizienz::{inspect_token, OriginClient};
use effizienz_server::{read_secret_file, OriginAuthenticator, OriginMode};
use reqwest::Method;
use tracing_subscriber::EnvFilter;

// ── CLI definition ─────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "effizienz",
    about = "Effizienz — first-party API client with origin-token signing",
    version
)]
struct Cli {
    /// Base URL of the API server
    #[arg(long, env = "EFFIZIENZ_URL", default_value = "http://localhost:8080")]
    server: String,
    /// Origin secret shared with the server
    #[arg(long, env = "EFFIZIENZ_ORIGIN_SECRET", hide_env_values = true)]
    secret: Option<String>,
    /// Read the origin secret from a file instead
    #[arg(long, env = "EFFIZIENZ_ORIGIN_SECRET_FILE", conflicts_with = "secret")]
    secret_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a freshly minted x-app-origin token
    Token,
    /// Decode a token and report its age and validity
    Inspect {
        token: String,
    },
    /// Send a signed request and print the response
    Call {
        /// HTTP method, e.g. GET, POST, DELETE
        method: String,
        /// Request path, e.g. /api/documents
        path: String,
        /// JSON request body
        #[arg(long)]
        data: Option<String>,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let level = std::env::var("EFFIZIENZ_LOG_LEVEL").unwrap_or_else(|_| "warn".into());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&level))
        .with_writer(std::io::stderr)
        .init();

    let secret = match cli.secret_file {
        Some(ref path) => Some(read_secret_file(path)?),
        None => cli.secret.clone(),
    };
    let origin = OriginAuthenticator::new(OriginMode::from_secret(secret));

    match cli.command {
        Commands::Token => cmd_token(&origin),
        Commands::Inspect { token } => cmd_inspect(&origin, &token),
        Commands::Call { method, path, data } => {
            cmd_call(&cli.server, origin, &method, &path, data.as_deref()).await
        }
    }
}

// ── Command implementations ───────────────────────────────────────────────────

fn cmd_token(origin: &OriginAuthenticator) -> Result<()> {
    if !origin.is_enforced() {
        anyhow::bail!("no origin secret configured — set EFFIZIENZ_ORIGIN_SECRET");
    }
    println!("{}", origin.generate());
    Ok(())
}

fn cmd_inspect(origin: &OriginAuthenticator, raw: &str) -> Result<()> {
    let report = inspect_token(origin, raw)?;
    println!("timestamp: {}", report.token.timestamp);
    println!("signature: {}", report.token.signature);
    println!("minted:    {}", report.age_text());

    if !origin.is_enforced() {
        println!("verdict:   unchecked (no origin secret configured)");
        return Ok(());
    }
    match report.verdict {
        Ok(()) => println!("verdict:   valid"),
        Err(reason) => println!("verdict:   invalid ({reason})"),
    }
    Ok(())
}

async fn cmd_call(
    server: &str,
    origin: OriginAuthenticator,
    method: &str,
    path: &str,
    data: Option<&str>,
) -> Result<()> {
    let method: Method = method
        .to_ascii_uppercase()
        .parse()
        .with_context(|| format!("invalid HTTP method {method:?}"))?;
    let body = data
        .map(serde_json::from_str::<serde_json::Value>)
        .transpose()
        .context("--data is not valid JSON")?;

    let client = OriginClient::new(server, origin)?;
    let (status, value) = client.send_json(method, path, body.as_ref()).await?;

    println!("{status}");
    if !value.is_null() {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    if !status.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
