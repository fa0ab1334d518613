//! The seam shared by the two delivery mechanisms.

use core::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use async_trait::async_trait;

use crate::{error::DispatchError, message::Message};

/// Which transport a dispatch uses. Always chosen explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransportKind {
    /// The line-oriented submission protocol.
    #[default]
    Smtp,
    /// JSON over HTTP.
    Rest,
}

impl Display for TransportKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Smtp => "smtp",
            Self::Rest => "rest",
        })
    }
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "smtp" | "submission" => Ok(Self::Smtp),
            "rest" | "http" => Ok(Self::Rest),
            other => Err(format!("unknown transport '{other}', expected smtp or rest")),
        }
    }
}

/// The terminal outcome of a transport round trip that completed.
///
/// Failures are reported as [`DispatchError`] instead, so a value of this
/// type is never partially populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResult {
    pub transport: TransportKind,
    /// Final reply code for SMTP, response status for REST.
    pub status: u16,
    /// What the remote end said: the final reply text, or the response body.
    pub diagnostic: String,
    /// Identifier the capture server assigned to the stored message.
    pub message_id: Option<String>,
}

impl TransportResult {
    /// `false` only for REST responses with a non-2xx status.
    #[must_use]
    pub const fn is_positive(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// A way of handing one message to the capture server.
#[async_trait]
pub trait Transport: Send + Sync {
    fn kind(&self) -> TransportKind;

    /// Performs exactly one delivery attempt.
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`] describing why the attempt failed.
    async fn send(&self, message: &Message) -> Result<TransportResult, DispatchError>;
}
