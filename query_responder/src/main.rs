//! Standalone responder binary.
//!
//! Usage:
//!   cargo run -p query_responder -- [--addr 127.0.0.1:7777] [--name "Facility 01"]
//!       [--mode challenge]
//!
//! Answers A2S info requests with a fixed status until interrupted. Useful
//! for trying the query binary without a real game server.

use std::net::SocketAddr;

use clap::{Parser, ValueEnum};
use query_responder::{InfoResponder, ResponderMode};
use query_shared::status::{ServerStatus, UNKNOWN};
use tracing::info;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Direct,
    Challenge,
    ChallengeLoop,
    Silent,
}

impl From<Mode> for ResponderMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Direct => ResponderMode::Direct,
            Mode::Challenge => ResponderMode::Challenge,
            Mode::ChallengeLoop => ResponderMode::ChallengeLoop,
            Mode::Silent => ResponderMode::Silent,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "a2s-responder", about = "Answer A2S info queries with a fixed status")]
struct Args {
    #[arg(long, default_value = "127.0.0.1:7777")]
    addr: SocketAddr,
    #[arg(long, default_value = "Facility 01")]
    name: String,
    #[arg(long, default_value = "Facility")]
    map: String,
    #[arg(long, default_value = "scpsl")]
    folder: String,
    #[arg(long, default_value = "Classic")]
    game: String,
    #[arg(long, default_value_t = 0)]
    players: u8,
    #[arg(long, default_value_t = 20)]
    max_players: u8,
    #[arg(long, default_value_t = 0)]
    bots: u8,
    #[arg(long, default_value_t = 0)]
    app_id: u16,
    #[arg(long, value_enum, default_value_t = Mode::Challenge)]
    mode: Mode,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let status = ServerStatus {
        online: true,
        ping_ms: 0,
        players: args.players,
        max_players: args.max_players,
        bots: args.bots,
        server_name: args.name,
        map: args.map,
        game_folder: args.folder,
        game_name: args.game,
        round_time: UNKNOWN.to_string(),
        password_protected: false,
        vac_enabled: false,
        protocol_version: 17,
        server_type: 'd',
        platform: 'l',
    };

    let responder = InfoResponder::bind(args.addr, status, args.mode.into())
        .await?
        .with_app_id(args.app_id);
    info!(addr = %responder.local_addr()?, mode = ?args.mode, "Responder listening");

    responder.serve().await
}
