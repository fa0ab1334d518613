//! Commands sent during the submission exchange and their wire encoding.

use core::fmt::{self, Display, Formatter};

use base64::{Engine, engine::general_purpose::STANDARD as B64};

use crate::{config::Credentials, error::ValidationError, message::Message};

/// A client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ehlo(String),
    /// `AUTH PLAIN` with the initial response inline.
    AuthPlain(String),
    AuthLogin,
    /// A base64 line answering a `334` challenge.
    AuthResponse(String),
    MailFrom(String),
    RcptTo(String),
    Data,
    /// Message content, already dot-stuffed and terminated.
    Payload(String),
    Quit,
}

impl Command {
    #[must_use]
    pub fn auth_plain(credentials: &Credentials) -> Self {
        let token = format!("\0{}\0{}", credentials.user(), credentials.pass());
        Self::AuthPlain(B64.encode(token))
    }

    #[must_use]
    pub fn auth_response(value: &str) -> Self {
        Self::AuthResponse(B64.encode(value))
    }

    /// The bytes written to the socket, including the line terminator.
    #[must_use]
    pub fn to_wire(&self) -> String {
        match self {
            Self::Ehlo(name) => format!("EHLO {name}\r\n"),
            Self::AuthPlain(token) => format!("AUTH PLAIN {token}\r\n"),
            Self::AuthLogin => "AUTH LOGIN\r\n".to_string(),
            Self::AuthResponse(value) => format!("{value}\r\n"),
            Self::MailFrom(from) => format!("MAIL FROM:<{from}>\r\n"),
            Self::RcptTo(to) => format!("RCPT TO:<{to}>\r\n"),
            Self::Data => "DATA\r\n".to_string(),
            Self::Payload(payload) => payload.clone(),
            Self::Quit => "QUIT\r\n".to_string(),
        }
    }
}

/// Log-safe rendering; credentials and message content are elided.
impl Display for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthPlain(_) => f.write_str("AUTH PLAIN <redacted>"),
            Self::AuthResponse(_) => f.write_str("<redacted>"),
            Self::Payload(payload) => write!(f, "<{} bytes of message data>", payload.len()),
            other => f.write_str(other.to_wire().trim_end()),
        }
    }
}

fn has_line_break(value: &str) -> bool {
    value.contains(['\r', '\n'])
}

/// Checks that every address can be sent inside a single command line.
///
/// # Errors
///
/// Returns a [`ValidationError`] naming the first address containing a CR or
/// LF.
pub fn check_addresses(message: &Message) -> Result<(), ValidationError> {
    if has_line_break(message.from()) {
        return Err(ValidationError::LineBreakInSender);
    }

    match message.to().iter().position(|to| has_line_break(to)) {
        Some(index) => Err(ValidationError::LineBreakInRecipient { index }),
        None => Ok(()),
    }
}

/// Appends `name: value`, folding any line breaks in `value` so that every
/// continuation line starts with a space and the header cannot end early.
fn push_header(payload: &mut String, name: &str, value: &str) {
    payload.push_str(name);
    payload.push_str(": ");

    let mut segments = value.split(['\r', '\n']).filter(|segment| !segment.is_empty());
    if let Some(first) = segments.next() {
        payload.push_str(first);
    }
    for segment in segments {
        payload.push_str("\r\n ");
        payload.push_str(segment);
    }

    payload.push_str("\r\n");
}

/// Renders the message headers and body as the data-phase payload.
///
/// Header values are folded at line breaks. In the body, line endings are
/// normalised to CRLF, lines beginning with `.` are dot-stuffed, and the
/// `<CRLF>.<CRLF>` end-of-data marker is appended.
#[must_use]
pub fn encode_payload(message: &Message) -> String {
    let mut payload = String::with_capacity(message.text().len() + 128);

    push_header(&mut payload, "From", message.from());
    push_header(&mut payload, "To", &message.to().join(", "));
    push_header(&mut payload, "Subject", message.subject());
    payload.push_str("\r\n");

    let text = message.text().replace("\r\n", "\n");
    let text = text.strip_suffix('\n').unwrap_or(&text);
    if !text.is_empty() {
        for line in text.split('\n') {
            if line.starts_with('.') {
                payload.push('.');
            }
            payload.push_str(line);
            payload.push_str("\r\n");
        }
    }

    payload.push_str(".\r\n");
    payload
}
