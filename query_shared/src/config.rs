//! Query configuration.
//!
//! Loads from JSON strings (file IO left to the binaries). Missing fields
//! take the protocol defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::status::DEFAULT_GAME_PORT;
use crate::wire::MAX_PACKET_SIZE;

/// Knobs for a query session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Deadline for each individual receive, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Receive buffer size; longer replies are truncated by the OS.
    #[serde(default = "default_recv_buffer_size")]
    pub recv_buffer_size: usize,
    /// Port used when a target omits one.
    #[serde(default = "default_port")]
    pub default_port: u16,
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_recv_buffer_size() -> usize {
    MAX_PACKET_SIZE
}

fn default_port() -> u16 {
    DEFAULT_GAME_PORT
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            recv_buffer_size: default_recv_buffer_size(),
            default_port: default_port(),
        }
    }
}

impl QueryConfig {
    /// Parses config from JSON.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    /// Returns a copy with a different per-receive timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
