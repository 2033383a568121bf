//! `query_responder`
//!
//! A fake game server answering A2S info requests over UDP:
//! - Direct info replies, or a challenge handshake first
//! - Misbehaving modes (endless challenges, silence, raw bytes)
//! - A datagram counter so callers can check round trips
//!
//! Built for loopback tests and for pointing the query binary at something
//! local.

pub mod responder;

pub use responder::{InfoResponder, ResponderHandle, ResponderMode};
