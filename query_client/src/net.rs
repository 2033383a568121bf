//! Per-candidate UDP socket.
//!
//! One [`CandidateSocket`] exists per candidate port. It is connected to the
//! candidate address so the OS filters datagrams from other peers and
//! reports ICMP rejections as `ConnectionRefused`. Dropping it closes the
//! socket, including when the owning query future is cancelled.
//!
//! A reply sent from a different source address than the one queried (a
//! multihomed server bound to `0.0.0.0`, for example) is dropped by the OS
//! and shows up as `Timeout`.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use query_shared::error::{FailureKind, QueryFailure};
use tokio::net::{lookup_host, UdpSocket};
use tokio::time;

/// Resolves `host:port`, preferring IPv4.
pub async fn resolve(host: &str, port: u16) -> Result<SocketAddr, QueryFailure> {
    let addrs: Vec<SocketAddr> = lookup_host((host, port))
        .await
        .map_err(|e| {
            QueryFailure::new(FailureKind::Unreachable, format!("resolve {host}: {e}"))
        })?
        .collect();

    addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| {
            QueryFailure::new(FailureKind::Unreachable, format!("{host} has no addresses"))
        })
}

/// UDP socket scoped to one candidate attempt.
#[derive(Debug)]
pub struct CandidateSocket {
    socket: UdpSocket,
    peer: SocketAddr,
}

impl CandidateSocket {
    /// Binds an ephemeral local port and connects it to `peer`.
    pub async fn connect(peer: SocketAddr) -> Result<Self, QueryFailure> {
        let bind = match peer.ip() {
            IpAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
            IpAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
        };
        let socket = UdpSocket::bind(bind)
            .await
            .map_err(|e| QueryFailure::from_io(&e))?;
        socket
            .connect(peer)
            .await
            .map_err(|e| QueryFailure::from_io(&e))?;
        Ok(Self { socket, peer })
    }

    pub async fn send(&self, packet: &[u8]) -> Result<(), QueryFailure> {
        self.socket
            .send(packet)
            .await
            .map_err(|e| QueryFailure::from_io(&e))?;
        Ok(())
    }

    /// Receives one datagram of at most `max_len` bytes within `timeout`.
    pub async fn recv_timeout(
        &self,
        timeout: Duration,
        max_len: usize,
    ) -> Result<Vec<u8>, QueryFailure> {
        let mut buf = vec![0u8; max_len];
        match time::timeout(timeout, self.socket.recv(&mut buf)).await {
            Ok(Ok(n)) => {
                buf.truncate(n);
                Ok(buf)
            }
            Ok(Err(e)) => Err(QueryFailure::from_io(&e)),
            Err(_) => Err(QueryFailure::new(
                FailureKind::Timeout,
                format!("no reply from {} within {} ms", self.peer, timeout.as_millis()),
            )),
        }
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolve_numeric_address() {
        let addr = resolve("127.0.0.1", 7777).await.unwrap();
        assert_eq!(addr, "127.0.0.1:7777".parse().unwrap());
    }

    #[tokio::test]
    async fn recv_times_out_on_silent_peer() -> anyhow::Result<()> {
        let silent = UdpSocket::bind("127.0.0.1:0").await?;
        let sock = CandidateSocket::connect(silent.local_addr()?).await.unwrap();
        sock.send(b"ping").await.unwrap();

        let err = sock
            .recv_timeout(Duration::from_millis(50), 64)
            .await
            .unwrap_err();
        assert_eq!(err.kind, FailureKind::Timeout);
        Ok(())
    }

    #[tokio::test]
    async fn recv_truncates_to_datagram_length() -> anyhow::Result<()> {
        let peer = UdpSocket::bind("127.0.0.1:0").await?;
        let sock = CandidateSocket::connect(peer.local_addr()?).await.unwrap();
        sock.send(b"ping").await.unwrap();

        let mut buf = [0u8; 16];
        let (n, from) = peer.recv_from(&mut buf).await?;
        assert_eq!(&buf[..n], b"ping");
        peer.send_to(b"pong", from).await?;

        let reply = sock
            .recv_timeout(Duration::from_secs(1), 1400)
            .await
            .unwrap();
        assert_eq!(reply, b"pong");
        Ok(())
    }

    #[tokio::test]
    async fn reply_from_other_address_is_a_timeout() -> anyhow::Result<()> {
        let peer = UdpSocket::bind("127.0.0.1:0").await?;
        let stranger = UdpSocket::bind("127.0.0.1:0").await?;
        let sock = CandidateSocket::connect(peer.local_addr()?).await.unwrap();
        sock.send(b"ping").await.unwrap();

        let mut buf = [0u8; 16];
        let (_, from) = peer.recv_from(&mut buf).await?;
        stranger.send_to(b"pong", from).await?;

        let err = sock
            .recv_timeout(Duration::from_millis(100), 64)
            .await
            .unwrap_err();
        assert_eq!(err.kind, FailureKind::Timeout);
        Ok(())
    }
}
