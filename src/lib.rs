//! Sends one test message to a local fauxmail capture server.
//!
//! Two independent transports are available, always chosen explicitly:
//! the line-oriented submission protocol ([`smtp`]) and a JSON `POST`
//! ([`rest`]). A [`Dispatcher`] validates the message, runs exactly one
//! attempt over the chosen transport, and reports the outcome.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod message;
pub mod rest;
pub mod smtp;
pub mod traits;
pub mod transport;

pub use config::{AuthMechanism, Config, Credentials, Timeouts};
pub use dispatch::{Dispatcher, dispatch};
pub use error::{DispatchError, ErrorKind, ProtocolError, ValidationError};
pub use message::{Draft, Message};
pub use rest::RestTransport;
pub use smtp::SubmissionTransport;
pub use transport::{Transport, TransportKind, TransportResult};

pub use tracing;
