//! Failures reported by the submission exchange.

use core::fmt::{self, Display, Formatter};

use thiserror::Error;

/// The step of the submission exchange a reply belonged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Greeting,
    Identification,
    Authentication,
    Sender,
    Recipient,
    DataStart,
    DataEnd,
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Greeting => "greeting",
            Self::Identification => "EHLO",
            Self::Authentication => "AUTH",
            Self::Sender => "MAIL FROM",
            Self::Recipient => "RCPT TO",
            Self::DataStart => "DATA",
            Self::DataEnd => "end of data",
        })
    }
}

/// A reply that ended the exchange early.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The server sent something that is not a coded reply.
    #[error("Failed to parse reply: {0}")]
    MalformedReply(String),

    /// A step was answered with anything other than the expected reply class.
    #[error("Server rejected {stage}: {code} {message}")]
    Rejected {
        stage: Stage,
        code: u16,
        message: String,
    },

    /// A recipient was refused; no further recipients or data were sent.
    #[error("Server rejected recipient {recipient}: {code} {message}")]
    RecipientRejected {
        recipient: String,
        code: u16,
        message: String,
    },

    /// Authentication was refused; no message content was sent.
    #[error("Authentication failed: {code} {message}")]
    AuthenticationFailed { code: u16, message: String },
}

impl ProtocolError {
    /// The reply code behind this error, if the server sent one.
    #[must_use]
    pub const fn code(&self) -> Option<u16> {
        match self {
            Self::MalformedReply(_) => None,
            Self::Rejected { code, .. }
            | Self::RecipientRejected { code, .. }
            | Self::AuthenticationFailed { code, .. } => Some(*code),
        }
    }

    /// Returns `true` for 4xx replies.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self.code(), Some(400..=499))
    }

    /// Returns `true` for 5xx replies.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self.code(), Some(500..=599))
    }
}
