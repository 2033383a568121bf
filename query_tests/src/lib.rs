//! Fixtures for the integration tests.
//!
//! The query sweeps `port`, `port + 1`, `port - 1`, so tests need three
//! adjacent loopback ports they control. [`CandidateTrio`] binds them and
//! hands each one to a responder.

use std::net::{Ipv4Addr, UdpSocket};
use std::time::Duration;

use anyhow::bail;
use query_responder::{InfoResponder, ResponderHandle, ResponderMode};
use query_shared::{
    config::QueryConfig,
    status::{QueryTarget, ServerStatus, UNKNOWN},
};

/// Per-receive timeout used by the tests.
pub const TEST_TIMEOUT: Duration = Duration::from_millis(300);

/// Installs a test-friendly tracing subscriber once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

pub fn test_config() -> QueryConfig {
    QueryConfig::default().with_timeout(TEST_TIMEOUT)
}

/// Status a responder serves.
pub fn server_status(name: &str, players: u8, max_players: u8) -> ServerStatus {
    ServerStatus {
        online: true,
        ping_ms: 0,
        players,
        max_players,
        bots: 0,
        server_name: name.to_string(),
        map: "Facility".to_string(),
        game_folder: "scpsl".to_string(),
        game_name: "Classic".to_string(),
        round_time: UNKNOWN.to_string(),
        password_protected: false,
        vac_enabled: true,
        protocol_version: 17,
        server_type: 'd',
        platform: 'l',
    }
}

/// Binds `count` adjacent loopback UDP ports.
pub fn bind_consecutive(count: u16) -> anyhow::Result<Vec<UdpSocket>> {
    for _ in 0..64 {
        let first = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0))?;
        let base = first.local_addr()?.port();
        if base > u16::MAX - count {
            continue;
        }

        let mut sockets = vec![first];
        for offset in 1..count {
            match UdpSocket::bind((Ipv4Addr::LOCALHOST, base + offset)) {
                Ok(socket) => sockets.push(socket),
                Err(_) => break,
            }
        }
        if sockets.len() == count as usize {
            return Ok(sockets);
        }
    }
    bail!("no run of {count} free loopback ports found")
}

/// Three adjacent ports named after their role for a target on `at`.
pub struct CandidateTrio {
    pub below: UdpSocket,
    pub at: UdpSocket,
    pub above: UdpSocket,
}

impl CandidateTrio {
    pub fn bind() -> anyhow::Result<Self> {
        let mut sockets = bind_consecutive(3)?.into_iter();
        match (sockets.next(), sockets.next(), sockets.next()) {
            (Some(below), Some(at), Some(above)) => Ok(Self { below, at, above }),
            _ => bail!("expected three sockets"),
        }
    }

    /// Target whose advertised port is the middle socket.
    pub fn target(&self) -> anyhow::Result<QueryTarget> {
        Ok(QueryTarget::new("127.0.0.1", self.at.local_addr()?.port()))
    }

    pub fn ports(&self) -> anyhow::Result<[u16; 3]> {
        Ok([
            self.at.local_addr()?.port(),
            self.above.local_addr()?.port(),
            self.below.local_addr()?.port(),
        ])
    }

    /// Starts responders serving one status on all three ports.
    pub fn serve(
        self,
        status: &ServerStatus,
        at: ResponderMode,
        above: ResponderMode,
        below: ResponderMode,
    ) -> anyhow::Result<Responders> {
        self.serve_each((status, at), (status, above), (status, below))
    }

    /// Starts responders with a status and mode per port.
    pub fn serve_each(
        self,
        at: (&ServerStatus, ResponderMode),
        above: (&ServerStatus, ResponderMode),
        below: (&ServerStatus, ResponderMode),
    ) -> anyhow::Result<Responders> {
        Ok(Responders {
            at: spawn_on(self.at, at)?,
            above: spawn_on(self.above, above)?,
            below: spawn_on(self.below, below)?,
        })
    }
}

fn spawn_on(
    socket: UdpSocket,
    (status, mode): (&ServerStatus, ResponderMode),
) -> anyhow::Result<ResponderHandle> {
    InfoResponder::from_std(socket, status.clone(), mode)?.spawn()
}

/// Running responders on a [`CandidateTrio`].
pub struct Responders {
    pub at: ResponderHandle,
    pub above: ResponderHandle,
    pub below: ResponderHandle,
}

impl Responders {
    /// Datagrams seen as `[at, above, below]`.
    pub fn requests_seen(&self) -> [usize; 3] {
        [
            self.at.requests_seen(),
            self.above.requests_seen(),
            self.below.requests_seen(),
        ]
    }
}
