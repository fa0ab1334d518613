//! Client side of the line-oriented submission protocol.
//!
//! - [`reply`]: reply parsing and classification
//! - [`command`]: commands and the data-phase payload
//! - [`state`]: the exchange as a finite state machine
//! - [`connection`]: buffered I/O with per-reply timeouts
//! - [`transport`]: the [`Transport`](crate::transport::Transport) built from the above

pub mod command;
pub mod connection;
pub mod error;
pub mod reply;
pub mod state;
pub mod transport;

pub use reply::{Reply, ReplyClass};
pub use state::State;
pub use transport::SubmissionTransport;
