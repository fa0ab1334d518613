//! Typed error handling for a single dispatch.
//!
//! Every failure a dispatch can end in is one of the variants of
//! [`DispatchError`]:
//! - Validation failures are detected before any network activity
//! - Connection and timeout failures come from the socket or HTTP client
//! - Protocol failures carry the submission reply that ended the exchange
//!
//! A non-2xx REST status is not an error unless strict HTTP handling has been
//! enabled in the [`Config`](crate::config::Config).

use core::fmt::{self, Display, Formatter};

use thiserror::Error;

pub use crate::smtp::error::{ProtocolError, Stage};

/// Top-level error for a dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The message fields were malformed.
    #[error("Invalid message: {0}")]
    Validation(#[from] ValidationError),

    /// The connection could not be established or was lost.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The submission server replied with a failure, or replied with garbage.
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A suspension point exceeded its deadline.
    #[error("Timed out: {0}")]
    Timeout(String),

    /// The REST endpoint answered with a non-2xx status while strict HTTP
    /// handling was enabled.
    #[error("Rejected with HTTP status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Reasons a [`Message`](crate::message::Message) cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("sender address is empty")]
    EmptySender,

    #[error("no recipients given")]
    NoRecipients,

    #[error("recipient #{index} is empty")]
    EmptyRecipient { index: usize },

    /// Raised by the submission transport, where an address is sent as
    /// part of a command line.
    #[error("sender address contains a line break")]
    LineBreakInSender,

    #[error("recipient #{index} contains a line break")]
    LineBreakInRecipient { index: usize },
}

/// Coarse classification of a [`DispatchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Connection,
    Protocol,
    Timeout,
    Rejected,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Validation => "ValidationError",
            Self::Connection => "ConnectionError",
            Self::Protocol => "ProtocolError",
            Self::Timeout => "TimeoutError",
            Self::Rejected => "RejectedError",
        })
    }
}

impl DispatchError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Connection(_) => ErrorKind::Connection,
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Rejected { .. } => ErrorKind::Rejected,
        }
    }

    /// Returns `true` if the remote end signalled a transient (4xx) failure.
    ///
    /// Nothing in this crate retries; this only informs the caller.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Protocol(err) => err.is_transient(),
            Self::Rejected { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Process exit status used by the `fauxmail-send` binary.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self.kind() {
            ErrorKind::Validation => 2,
            ErrorKind::Connection => 3,
            ErrorKind::Protocol => 4,
            ErrorKind::Timeout => 5,
            ErrorKind::Rejected => 6,
        }
    }
}

impl From<std::io::Error> for DispatchError {
    fn from(error: std::io::Error) -> Self {
        if error.kind() == std::io::ErrorKind::TimedOut {
            Self::Timeout(error.to_string())
        } else {
            Self::Connection(error.to_string())
        }
    }
}

/// REST failures never depend on the status code; only the client error
/// itself decides between a timeout and a connection failure.
impl From<reqwest::Error> for DispatchError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error.to_string())
        } else {
            Self::Connection(error.to_string())
        }
    }
}
