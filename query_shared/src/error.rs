//! Query failure taxonomy.
//!
//! Every error path of a query ends in a [`QueryFailure`] value. Per-candidate
//! failures are recorded as [`CandidateFailure`]s and only the exhausted
//! outcome is surfaced to the caller.

use std::fmt;
use std::io;

use serde::Serialize;
use thiserror::Error;

/// Classification of a failed query or candidate attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FailureKind {
    /// No reply within the per-receive deadline.
    Timeout,
    /// Transport-level rejection (ICMP port unreachable on a connected socket).
    ConnectionRefused,
    /// Reply looked like the protocol but violated the decode contract.
    MalformedResponse,
    /// No candidate produced a usable reply.
    Unreachable,
}

impl FailureKind {
    /// Maps an I/O error raised by socket operations.
    pub fn from_io(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => FailureKind::Timeout,
            io::ErrorKind::ConnectionRefused => FailureKind::ConnectionRefused,
            _ => FailureKind::Unreachable,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::ConnectionRefused => write!(f, "connection refused"),
            FailureKind::MalformedResponse => write!(f, "malformed response"),
            FailureKind::Unreachable => write!(f, "unreachable"),
        }
    }
}

/// Outcome of one abandoned candidate port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateFailure {
    pub port: u16,
    pub kind: FailureKind,
    pub detail: String,
}

impl fmt::Display for CandidateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "port {}: {} ({})", self.port, self.kind, self.detail)
    }
}

/// A classified query failure.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{kind}: {detail}")]
pub struct QueryFailure {
    pub kind: FailureKind,
    pub detail: String,
    /// Candidate attempts in the order they were tried. Empty for codec errors.
    pub attempts: Vec<CandidateFailure>,
}

impl QueryFailure {
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            attempts: Vec::new(),
        }
    }

    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::MalformedResponse, detail)
    }

    pub fn from_io(err: &io::Error) -> Self {
        Self::new(FailureKind::from_io(err), err.to_string())
    }

    /// Aggregates exhausted candidates into the `Unreachable` outcome.
    pub fn exhausted(attempts: Vec<CandidateFailure>) -> Self {
        let detail = if attempts.is_empty() {
            "no candidate ports".to_string()
        } else {
            attempts
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ")
        };
        Self {
            kind: FailureKind::Unreachable,
            detail,
            attempts,
        }
    }

    /// Tags this failure with the candidate port it happened on.
    pub fn at_port(self, port: u16) -> CandidateFailure {
        CandidateFailure {
            port,
            kind: self.kind,
            detail: self.detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_are_classified() {
        let timed_out = io::Error::new(io::ErrorKind::TimedOut, "t");
        let refused = io::Error::new(io::ErrorKind::ConnectionRefused, "r");
        let other = io::Error::new(io::ErrorKind::AddrNotAvailable, "o");

        assert_eq!(FailureKind::from_io(&timed_out), FailureKind::Timeout);
        assert_eq!(FailureKind::from_io(&refused), FailureKind::ConnectionRefused);
        assert_eq!(FailureKind::from_io(&other), FailureKind::Unreachable);
    }

    #[test]
    fn exhausted_lists_every_attempt() {
        let failure = QueryFailure::exhausted(vec![
            QueryFailure::new(FailureKind::Timeout, "no reply").at_port(7777),
            QueryFailure::malformed("bad header").at_port(7778),
        ]);

        assert_eq!(failure.kind, FailureKind::Unreachable);
        assert_eq!(failure.attempts.len(), 2);
        assert!(failure.detail.contains("port 7777: timeout"));
        assert!(failure.detail.contains("port 7778: malformed response"));
        assert!(failure.to_string().starts_with("unreachable: "));
    }

    #[test]
    fn exhausted_without_attempts() {
        let failure = QueryFailure::exhausted(Vec::new());
        assert_eq!(failure.detail, "no candidate ports");
    }
}
