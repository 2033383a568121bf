//! Info responder.
//!
//! Serves one fixed [`ServerStatus`] on a UDP socket. How it answers is set
//! by [`ResponderMode`]; every received datagram is counted, answered or not.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use anyhow::Context;
use query_shared::{status::ServerStatus, wire};
use tokio::{net::UdpSocket, task::JoinHandle};
use tracing::{debug, warn};

/// How the responder answers info requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponderMode {
    /// Info reply to every request.
    Direct,
    /// Challenge first; info only once the request echoes the token.
    Challenge,
    /// Challenge every request, token or not.
    ChallengeLoop,
    /// Read requests, never reply.
    Silent,
    /// Reply to any datagram with these bytes.
    Raw(Vec<u8>),
}

/// UDP responder for A2S info requests.
pub struct InfoResponder {
    socket: UdpSocket,
    status: ServerStatus,
    app_id: u16,
    mode: ResponderMode,
    token: u32,
    requests_seen: Arc<AtomicUsize>,
}

impl InfoResponder {
    /// Binds a responder to `addr`.
    pub async fn bind(
        addr: SocketAddr,
        status: ServerStatus,
        mode: ResponderMode,
    ) -> anyhow::Result<Self> {
        let socket = UdpSocket::bind(addr).await.context("udp bind")?;
        Ok(Self::with_socket(socket, status, mode))
    }

    /// Binds a responder to an ephemeral loopback port.
    pub async fn bind_ephemeral(status: ServerStatus, mode: ResponderMode) -> anyhow::Result<Self> {
        Self::bind(
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0),
            status,
            mode,
        )
        .await
    }

    /// Wraps an already bound std socket. Must be called inside a tokio runtime.
    pub fn from_std(
        socket: std::net::UdpSocket,
        status: ServerStatus,
        mode: ResponderMode,
    ) -> anyhow::Result<Self> {
        socket.set_nonblocking(true).context("set nonblocking")?;
        let socket = UdpSocket::from_std(socket).context("register udp socket")?;
        Ok(Self::with_socket(socket, status, mode))
    }

    fn with_socket(socket: UdpSocket, status: ServerStatus, mode: ResponderMode) -> Self {
        Self {
            socket,
            status,
            app_id: 0,
            mode,
            token: rand::random(),
            requests_seen: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_app_id(mut self, app_id: u16) -> Self {
        self.app_id = app_id;
        self
    }

    pub fn with_token(mut self, token: u32) -> Self {
        self.token = token;
        self
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Shared counter of received datagrams.
    pub fn requests_seen(&self) -> Arc<AtomicUsize> {
        self.requests_seen.clone()
    }

    /// Reply for one request datagram, if any.
    pub fn reply_for(&self, request: &[u8]) -> Option<Vec<u8>> {
        match &self.mode {
            ResponderMode::Raw(bytes) => Some(bytes.clone()),
            ResponderMode::Silent => None,
            ResponderMode::Direct => {
                wire::parse_info_request(request)?;
                Some(self.info_reply())
            }
            ResponderMode::ChallengeLoop => {
                wire::parse_info_request(request)?;
                Some(wire::encode_challenge_reply(self.token))
            }
            ResponderMode::Challenge => match wire::parse_info_request(request)? {
                Some(token) if token == self.token => Some(self.info_reply()),
                _ => Some(wire::encode_challenge_reply(self.token)),
            },
        }
    }

    fn info_reply(&self) -> Vec<u8> {
        wire::encode_info_reply(&self.status, self.app_id)
    }

    /// Receives one datagram and answers it.
    pub async fn serve_one(&self) -> anyhow::Result<()> {
        let mut buf = vec![0u8; wire::MAX_PACKET_SIZE];
        let (n, peer) = self.socket.recv_from(&mut buf).await.context("udp recv")?;
        self.requests_seen.fetch_add(1, Ordering::SeqCst);

        match self.reply_for(&buf[..n]) {
            Some(reply) => {
                debug!(%peer, request_len = n, reply_len = reply.len(), "Replying");
                self.socket
                    .send_to(&reply, peer)
                    .await
                    .context("udp send")?;
            }
            None => debug!(%peer, request_len = n, "Not replying"),
        }
        Ok(())
    }

    /// Answers requests until the socket fails.
    pub async fn serve(self) -> anyhow::Result<()> {
        loop {
            if let Err(e) = self.serve_one().await {
                // Loopback ICMP errors from a vanished client surface here.
                warn!(error = %e, "Responder receive failed");
                if !is_transient(&e) {
                    return Err(e);
                }
            }
        }
    }

    /// Serves on a background task. The task stops when the handle drops.
    pub fn spawn(self) -> anyhow::Result<ResponderHandle> {
        let addr = self.local_addr()?;
        let requests_seen = self.requests_seen();
        let task = tokio::spawn(self.serve());
        Ok(ResponderHandle {
            addr,
            requests_seen,
            task,
        })
    }
}

fn is_transient(err: &anyhow::Error) -> bool {
    err.downcast_ref::<std::io::Error>().is_some_and(|io| {
        matches!(
            io.kind(),
            std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::ConnectionReset
        )
    })
}

/// Running responder task.
pub struct ResponderHandle {
    pub addr: SocketAddr,
    requests_seen: Arc<AtomicUsize>,
    task: JoinHandle<anyhow::Result<()>>,
}

impl ResponderHandle {
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Datagrams received so far.
    pub fn requests_seen(&self) -> usize {
        self.requests_seen.load(Ordering::SeqCst)
    }
}

impl Drop for ResponderHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use query_shared::wire::{classify_reply, ReplyKind};

    fn status() -> ServerStatus {
        ServerStatus {
            online: true,
            ping_ms: 0,
            players: 5,
            max_players: 20,
            bots: 0,
            server_name: "Facility 01".to_string(),
            map: "Facility".to_string(),
            game_folder: "scpsl".to_string(),
            game_name: "Classic".to_string(),
            round_time: "unknown".to_string(),
            password_protected: false,
            vac_enabled: false,
            protocol_version: 17,
            server_type: 'd',
            platform: 'l',
        }
    }

    #[tokio::test]
    async fn challenge_mode_requires_matching_token() -> anyhow::Result<()> {
        let responder = InfoResponder::bind_ephemeral(status(), ResponderMode::Challenge)
            .await?
            .with_token(42);

        let first = responder.reply_for(&wire::build_info_request()).unwrap();
        assert_eq!(classify_reply(&first), ReplyKind::Challenge);
        assert_eq!(wire::extract_challenge(&first).unwrap(), 42);

        let wrong = responder
            .reply_for(&wire::build_info_request_with_challenge(7))
            .unwrap();
        assert_eq!(classify_reply(&wrong), ReplyKind::Challenge);

        let info = responder
            .reply_for(&wire::build_info_request_with_challenge(42))
            .unwrap();
        assert_eq!(wire::decode_info(&info, 0).unwrap(), status());
        Ok(())
    }

    #[tokio::test]
    async fn modes_that_do_not_answer_info() -> anyhow::Result<()> {
        let silent = InfoResponder::bind_ephemeral(status(), ResponderMode::Silent).await?;
        assert!(silent.reply_for(&wire::build_info_request()).is_none());

        let looping = InfoResponder::bind_ephemeral(status(), ResponderMode::ChallengeLoop)
            .await?
            .with_token(9);
        let reply = looping
            .reply_for(&wire::build_info_request_with_challenge(9))
            .unwrap();
        assert_eq!(classify_reply(&reply), ReplyKind::Challenge);

        let raw = InfoResponder::bind_ephemeral(status(), ResponderMode::Raw(b"hello".to_vec()))
            .await?;
        assert_eq!(raw.reply_for(b"anything").unwrap(), b"hello");
        Ok(())
    }

    #[tokio::test]
    async fn only_raw_mode_answers_non_requests() -> anyhow::Result<()> {
        let junk = b"\xFF\xFF\xFF\xFFU";
        let responder = InfoResponder::bind_ephemeral(status(), ResponderMode::Direct).await?;
        assert!(responder.reply_for(junk).is_none());
        assert!(responder.reply_for(&wire::build_info_request()).is_some());

        for mode in [
            ResponderMode::Challenge,
            ResponderMode::ChallengeLoop,
            ResponderMode::Silent,
        ] {
            let responder = InfoResponder::bind_ephemeral(status(), mode).await?;
            assert!(responder.reply_for(junk).is_none());
        }

        let raw = InfoResponder::bind_ephemeral(status(), ResponderMode::Raw(vec![1, 2])).await?;
        assert_eq!(raw.reply_for(junk).unwrap(), vec![1, 2]);
        Ok(())
    }

    #[tokio::test]
    async fn spawned_responder_counts_datagrams() -> anyhow::Result<()> {
        let handle = InfoResponder::bind_ephemeral(status(), ResponderMode::Direct)
            .await?
            .spawn()?;

        let client = UdpSocket::bind("127.0.0.1:0").await?;
        client.send_to(&wire::build_info_request(), handle.addr).await?;

        let mut buf = [0u8; 1400];
        let n = tokio::time::timeout(std::time::Duration::from_secs(2), client.recv(&mut buf))
            .await??;
        assert_eq!(classify_reply(&buf[..n]), ReplyKind::Info);
        assert_eq!(handle.requests_seen(), 1);
        Ok(())
    }
}
