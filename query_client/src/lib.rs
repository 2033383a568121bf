//! `query_client`
//!
//! Client side of the A2S info query:
//! - Per-candidate UDP sockets with bounded receives
//! - Challenge handshake and candidate port sweep
//! - `Option`-returning entry point for callers that only render status
//!
//! Queries share no state; callers may run as many concurrently as they like.

pub mod net;
pub mod session;

pub use session::{query, query_status, QuerySession};
