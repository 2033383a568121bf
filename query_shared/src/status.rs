//! Query targets and the server status record.
//!
//! A [`QueryTarget`] is what the caller hands to the session; a
//! [`ServerStatus`] is what comes back when a candidate answers with a
//! decodable info reply. Neither outlives a single query call.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Port most SCP:SL style servers advertise when none is given.
pub const DEFAULT_GAME_PORT: u16 = 7777;

/// Placeholder for text the protocol does not carry.
pub const UNKNOWN: &str = "unknown";

/// Host and advertised game port of a server to query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryTarget {
    /// Hostname or dotted-quad IPv4 address.
    pub host: String,
    /// Advertised game port.
    pub port: u16,
}

/// Errors from turning user input into a [`QueryTarget`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    #[error("host must not be empty")]
    EmptyHost,
    #[error("invalid port number: {0}")]
    InvalidPort(String),
    #[error("port must be between 1 and 65535, got {0}")]
    PortOutOfRange(u64),
}

impl QueryTarget {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Builds a target from loosely formatted input.
    ///
    /// The port may be wrapped in brackets (`[7777]`); a missing port falls
    /// back to `default_port`.
    pub fn parse(host: &str, port: Option<&str>, default_port: u16) -> Result<Self, TargetError> {
        let host = host.trim();
        if host.is_empty() {
            return Err(TargetError::EmptyHost);
        }

        let port = match port {
            None => default_port,
            Some(raw) => {
                let digits = raw.trim().trim_matches(|c| c == '[' || c == ']');
                let value: u64 = digits
                    .parse()
                    .map_err(|_| TargetError::InvalidPort(raw.to_string()))?;
                if !(1..=u16::MAX as u64).contains(&value) {
                    return Err(TargetError::PortOutOfRange(value));
                }
                value as u16
            }
        };

        Ok(Self::new(host, port))
    }

    /// Ports to try, in order: the advertised port, then one above, then one below.
    pub fn candidate_ports(&self) -> Vec<u16> {
        candidate_ports(self.port)
    }
}

impl fmt::Display for QueryTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Returns `[port, port + 1, port - 1]` clamped into `1..=65535`.
///
/// Clamping can make neighbours collide at the edges of the range; repeats
/// are dropped so no port is queried twice.
pub fn candidate_ports(port: u16) -> Vec<u16> {
    let clamp = |p: u16| p.max(1);
    let raw = [
        clamp(port),
        clamp(port.saturating_add(1)),
        clamp(port.saturating_sub(1)),
    ];

    let mut ports = Vec::with_capacity(raw.len());
    for p in raw {
        if !ports.contains(&p) {
            ports.push(p);
        }
    }
    ports
}

/// Status of a server that answered an info query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStatus {
    /// Always true for a decoded reply.
    pub online: bool,
    /// Round trip from first request to final reply, in milliseconds.
    pub ping_ms: u32,
    /// Current players.
    pub players: u8,
    /// Max players.
    pub max_players: u8,
    /// Number of bots.
    pub bots: u8,
    /// Server name.
    pub server_name: String,
    /// Map name.
    pub map: String,
    /// Game directory.
    pub game_folder: String,
    /// Game description, which some games use for the current mode.
    pub game_name: String,
    /// Round clock. The info reply does not carry one.
    pub round_time: String,
    /// Password protected.
    pub password_protected: bool,
    /// VAC secured.
    pub vac_enabled: bool,
    /// Protocol version byte from the reply.
    pub protocol_version: u8,
    /// Server type (d=dedicated, l=listen, p=proxy).
    pub server_type: char,
    /// OS (l=linux, w=windows, m=mac).
    pub platform: char,
}

impl ServerStatus {
    /// Game mode shown to users; the game description, or `"unknown"` if empty.
    pub fn game_mode(&self) -> &str {
        if self.game_name.is_empty() {
            UNKNOWN
        } else {
            &self.game_name
        }
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {}/{} players | map {} | mode {} | round {} | {} ms",
            self.server_name,
            self.players,
            self.max_players,
            self.map,
            self.game_mode(),
            self.round_time,
            self.ping_ms
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_order_is_port_above_below() {
        assert_eq!(candidate_ports(7777), vec![7777, 7778, 7776]);
        assert_eq!(
            QueryTarget::new("127.0.0.1", 27015).candidate_ports(),
            vec![27015, 27016, 27014]
        );
    }

    #[test]
    fn candidate_ports_clamp_at_range_edges() {
        assert_eq!(candidate_ports(u16::MAX), vec![65535, 65534]);
        assert_eq!(candidate_ports(1), vec![1, 2]);
        assert_eq!(candidate_ports(0), vec![1]);
    }

    #[test]
    fn parse_uses_default_port() {
        let target = QueryTarget::parse("203.0.113.5", None, DEFAULT_GAME_PORT).unwrap();
        assert_eq!(target, QueryTarget::new("203.0.113.5", 7777));
        assert_eq!(target.to_string(), "203.0.113.5:7777");
    }

    #[test]
    fn parse_strips_brackets_around_port() {
        let target = QueryTarget::parse(" 10.0.0.2 ", Some("[7778]"), DEFAULT_GAME_PORT).unwrap();
        assert_eq!(target.host, "10.0.0.2");
        assert_eq!(target.port, 7778);
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert_eq!(
            QueryTarget::parse("", None, 7777),
            Err(TargetError::EmptyHost)
        );
        assert_eq!(
            QueryTarget::parse("1.2.3.4", Some("abc"), 7777),
            Err(TargetError::InvalidPort("abc".to_string()))
        );
        assert_eq!(
            QueryTarget::parse("1.2.3.4", Some("0"), 7777),
            Err(TargetError::PortOutOfRange(0))
        );
        assert_eq!(
            QueryTarget::parse("1.2.3.4", Some("70000"), 7777),
            Err(TargetError::PortOutOfRange(70000))
        );
    }

    #[test]
    fn game_mode_falls_back_when_empty() {
        let mut status = ServerStatus {
            online: true,
            ping_ms: 12,
            players: 5,
            max_players: 20,
            bots: 0,
            server_name: "Facility 01".to_string(),
            map: "Facility".to_string(),
            game_folder: "scpsl".to_string(),
            game_name: String::new(),
            round_time: UNKNOWN.to_string(),
            password_protected: false,
            vac_enabled: false,
            protocol_version: 17,
            server_type: 'd',
            platform: 'l',
        };
        assert_eq!(status.game_mode(), "unknown");

        status.game_name = "Classic".to_string();
        assert_eq!(status.game_mode(), "Classic");
        assert_eq!(
            status.to_string(),
            "Facility 01 | 5/20 players | map Facility | mode Classic | round unknown | 12 ms"
        );
    }
}
