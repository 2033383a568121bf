//! Standalone query binary.
//!
//! Usage:
//!   cargo run -p query_client -- <host> [port] [--timeout-ms 5000] [--config query.json] [--json]
//!
//! Queries one server and prints a one-line status summary, or the full
//! status record as JSON with `--json`. Exits with status 1 when the server
//! cannot be reached on any candidate port.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use query_client::QuerySession;
use query_shared::{config::QueryConfig, status::QueryTarget};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "a2s-query", about = "Query a game server over the A2S info protocol")]
struct Args {
    /// Server host or IPv4 address.
    host: String,
    /// Game port; `[7777]` is accepted too.
    port: Option<String>,
    /// Per-receive timeout in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// JSON config file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Print JSON instead of a summary line.
    #[arg(long)]
    json: bool,
}

fn load_config(args: &Args) -> anyhow::Result<QueryConfig> {
    let mut cfg = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("read config {}", path.display()))?;
            QueryConfig::from_json_str(&text)
                .with_context(|| format!("parse config {}", path.display()))?
        }
        None => QueryConfig::default(),
    };
    if let Some(ms) = args.timeout_ms {
        cfg = cfg.with_timeout(Duration::from_millis(ms));
    }
    Ok(cfg)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let cfg = load_config(&args)?;
    let target = QueryTarget::parse(&args.host, args.port.as_deref(), cfg.default_port)
        .context("parse target")?;

    info!(server = %target, timeout_ms = cfg.timeout_ms, "Querying server");

    let session = QuerySession::new(cfg);
    match session.query(&target).await {
        Ok(status) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!("{target} | {status}");
            }
            Ok(())
        }
        Err(failure) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&failure)?);
            } else {
                eprintln!("Could not reach {target}: {}", failure.kind);
                for attempt in &failure.attempts {
                    eprintln!("  {attempt}");
                }
            }
            std::process::exit(1);
        }
    }
}
