//! Submission reply parsing and classification.

use core::fmt::{self, Display, Formatter};

use super::error::ProtocolError;

/// The category of a reply, taken from the first digit of its code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplyClass {
    /// 2xx
    Success,
    /// 3xx, e.g. `354` after `DATA` or `334` during `AUTH LOGIN`
    Intermediate,
    /// 4xx
    TransientFailure,
    /// 5xx
    PermanentFailure,
}

/// A single line of a possibly multi-line reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyLine {
    pub code: u16,
    /// `false` when the code is followed by `-`, i.e. more lines follow.
    pub is_last: bool,
    pub text: String,
}

/// A complete reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: u16,
    pub lines: Vec<String>,
}

impl Display for Reply {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.message())
    }
}

impl Reply {
    #[must_use]
    pub const fn new(code: u16, lines: Vec<String>) -> Self {
        Self { code, lines }
    }

    /// All text lines joined with newlines.
    #[must_use]
    pub fn message(&self) -> String {
        self.lines.join("\n")
    }

    /// [`Reply::parse`] only accepts codes from 200 to 599, so anything
    /// outside 2xx-4xx lands in the permanent class.
    #[must_use]
    pub const fn class(&self) -> ReplyClass {
        match self.code {
            200..=299 => ReplyClass::Success,
            300..=399 => ReplyClass::Intermediate,
            400..=499 => ReplyClass::TransientFailure,
            _ => ReplyClass::PermanentFailure,
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.class(), ReplyClass::Success)
    }

    #[must_use]
    pub const fn is_intermediate(&self) -> bool {
        matches!(self.class(), ReplyClass::Intermediate)
    }

    #[must_use]
    pub const fn is_transient_failure(&self) -> bool {
        matches!(self.class(), ReplyClass::TransientFailure)
    }

    #[must_use]
    pub const fn is_permanent_failure(&self) -> bool {
        matches!(self.class(), ReplyClass::PermanentFailure)
    }

    /// The `id=<value>` token the capture server appends to its final `250`.
    #[must_use]
    pub fn message_id(&self) -> Option<String> {
        self.lines
            .iter()
            .flat_map(|line| line.split_whitespace())
            .find_map(|token| token.strip_prefix("id="))
            .filter(|id| !id.is_empty())
            .map(ToString::to_string)
    }

    /// Parses a single reply line without its line terminator.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MalformedReply`] if the line is not a
    /// three-digit code in the 2xx-5xx range followed by nothing, a space or
    /// a dash.
    pub fn parse_line(line: &str) -> Result<ReplyLine, ProtocolError> {
        let malformed = || ProtocolError::MalformedReply(format!("'{line}'"));

        let code_str = line.get(..3).ok_or_else(malformed)?;
        if !code_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }

        let code = code_str.parse::<u16>().map_err(|_| malformed())?;
        if !(200..600).contains(&code) {
            return Err(malformed());
        }

        let (is_last, text) = match line.as_bytes().get(3) {
            None => (true, ""),
            Some(b' ') => (true, &line[4..]),
            Some(b'-') => (false, &line[4..]),
            Some(_) => return Err(malformed()),
        };

        Ok(ReplyLine {
            code,
            is_last,
            text: text.to_string(),
        })
    }

    /// Parses one complete reply from the front of `buffer`.
    ///
    /// Returns the reply and the number of bytes it occupied, or `None` if the
    /// buffer does not yet hold a complete reply.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MalformedReply`] for invalid lines, invalid
    /// UTF-8, or a multi-line reply whose lines disagree on the code.
    pub fn parse(buffer: &[u8]) -> Result<Option<(Self, usize)>, ProtocolError> {
        let mut consumed = 0;
        let mut code = None;
        let mut lines = Vec::new();

        while let Some(end) = buffer[consumed..].iter().position(|b| *b == b'\n') {
            let raw = &buffer[consumed..consumed + end];
            consumed += end + 1;

            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            if raw.is_empty() {
                continue;
            }

            let line = std::str::from_utf8(raw)
                .map_err(|e| ProtocolError::MalformedReply(format!("invalid UTF-8: {e}")))?;
            let parsed = Self::parse_line(line)?;

            match code {
                Some(expected) if expected != parsed.code => {
                    return Err(ProtocolError::MalformedReply(format!(
                        "code mismatch in multi-line reply: expected {expected}, got {}",
                        parsed.code
                    )));
                }
                Some(_) => {}
                None => code = Some(parsed.code),
            }

            lines.push(parsed.text);

            if parsed.is_last {
                return Ok(code.map(|code| (Self::new(code, lines), consumed)));
            }
        }

        Ok(None)
    }
}
