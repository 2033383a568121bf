//! `query_shared`
//!
//! Pieces shared by the query client and the test responder:
//! - A2S info wire codec (requests, challenge and info replies)
//! - Query target and server status model
//! - Failure taxonomy
//! - Query configuration
//!
//! No sockets live here; everything is pure and synchronous.

pub mod config;
pub mod error;
pub mod status;
pub mod wire;

pub mod prelude {
    //! Commonly used exports.

    pub use crate::config::QueryConfig;
    pub use crate::error::{CandidateFailure, FailureKind, QueryFailure};
    pub use crate::status::{candidate_ports, QueryTarget, ServerStatus};
    pub use crate::wire::ReplyKind;
}
