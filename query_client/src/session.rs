//! Query session.
//!
//! Drives one logical A2S info query against a [`QueryTarget`]:
//! - Sweeps the candidate ports (`port`, `port + 1`, `port - 1`) in order
//! - Per candidate: send request, optionally answer one challenge, decode
//! - Returns the first decoded status, or `Unreachable` listing every attempt
//!
//! Each receive is bounded by the configured timeout. A challenged request
//! that is challenged again abandons the candidate, so a candidate costs at
//! most two round trips.

use std::time::{Duration, Instant};

use query_shared::{
    config::QueryConfig,
    error::{FailureKind, QueryFailure},
    status::{QueryTarget, ServerStatus},
    wire::{self, ReplyKind},
};
use tracing::{debug, info, warn};

use crate::net::{resolve, CandidateSocket};

/// Query engine. Holds configuration only; every query owns its own sockets.
#[derive(Debug, Clone, Default)]
pub struct QuerySession {
    cfg: QueryConfig,
}

impl QuerySession {
    pub fn new(cfg: QueryConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &QueryConfig {
        &self.cfg
    }

    /// Queries `target`, trying each candidate port until one answers.
    pub async fn query(&self, target: &QueryTarget) -> Result<ServerStatus, QueryFailure> {
        let mut attempts = Vec::new();

        for port in target.candidate_ports() {
            match self.query_candidate(&target.host, port).await {
                Ok(status) => {
                    info!(
                        host = %target.host,
                        port,
                        ping_ms = status.ping_ms,
                        players = status.players,
                        "Server answered"
                    );
                    return Ok(status);
                }
                Err(failure) => {
                    debug!(
                        host = %target.host,
                        port,
                        kind = %failure.kind,
                        detail = %failure.detail,
                        "Candidate abandoned"
                    );
                    attempts.push(failure.at_port(port));
                }
            }
        }

        Err(QueryFailure::exhausted(attempts))
    }

    /// Like [`query`](Self::query), logging the failure and returning `None`.
    pub async fn query_status(&self, target: &QueryTarget) -> Option<ServerStatus> {
        match self.query(target).await {
            Ok(status) => Some(status),
            Err(failure) => {
                warn!(
                    server = %target,
                    kind = %failure.kind,
                    detail = %failure.detail,
                    "Query failed"
                );
                None
            }
        }
    }

    /// One candidate attempt. The socket is dropped on every exit path.
    async fn query_candidate(&self, host: &str, port: u16) -> Result<ServerStatus, QueryFailure> {
        let peer = resolve(host, port).await?;
        let socket = CandidateSocket::connect(peer).await?;
        let timeout = self.cfg.timeout();
        let max_len = self.cfg.recv_buffer_size;

        let started = Instant::now();
        socket.send(&wire::build_info_request()).await?;
        let mut reply = socket.recv_timeout(timeout, max_len).await?;

        match wire::classify_reply(&reply) {
            ReplyKind::Info => {}
            ReplyKind::Challenge => {
                let token = wire::extract_challenge(&reply)?;
                debug!(peer = %socket.peer_addr(), token, "Answering challenge");
                socket
                    .send(&wire::build_info_request_with_challenge(token))
                    .await?;
                reply = socket.recv_timeout(timeout, max_len).await?;

                match wire::classify_reply(&reply) {
                    ReplyKind::Info => {}
                    ReplyKind::Challenge => {
                        return Err(QueryFailure::malformed(
                            "challenged again after answering a challenge",
                        ))
                    }
                    ReplyKind::Unrecognized => return Err(unrecognized(&reply)),
                }
            }
            ReplyKind::Unrecognized => return Err(unrecognized(&reply)),
        }

        wire::decode_info(&reply, elapsed_ms(started.elapsed()))
    }
}

fn unrecognized(reply: &[u8]) -> QueryFailure {
    QueryFailure::new(
        FailureKind::Unreachable,
        format!("reply is not an A2S packet ({} bytes)", reply.len()),
    )
}

/// Milliseconds, rounded to nearest.
fn elapsed_ms(elapsed: Duration) -> u32 {
    ((elapsed.as_micros() + 500) / 1000).min(u32::MAX as u128) as u32
}

/// Queries `target` with default settings.
pub async fn query(target: &QueryTarget) -> Result<ServerStatus, QueryFailure> {
    QuerySession::default().query(target).await
}

/// Queries `target` with default settings; `None` on any failure.
pub async fn query_status(target: &QueryTarget) -> Option<ServerStatus> {
    QuerySession::default().query_status(target).await
}
