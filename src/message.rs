//! The message handed to a transport.

use crate::error::ValidationError;

/// Unvalidated message fields as supplied by a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub text: String,
}

impl Draft {
    #[must_use]
    pub fn new<I, S>(
        from: impl Into<String>,
        to: I,
        subject: impl Into<String>,
        text: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            from: from.into(),
            to: to.into_iter().map(Into::into).collect(),
            subject: subject.into(),
            text: text.into(),
        }
    }
}

/// A validated, immutable message.
///
/// `from` and every recipient are non-empty and there is at least one
/// recipient. Addresses are kept exactly as given; each transport serialises
/// the message itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    from: String,
    to: Vec<String>,
    subject: String,
    text: String,
}

impl Message {
    /// Validates the fields and builds a message.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if `from` is empty, `to` is empty, or any
    /// recipient is empty.
    pub fn new<I, S>(
        from: impl Into<String>,
        to: I,
        subject: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::try_from(Draft::new(from, to, subject, text))
    }

    #[must_use]
    pub fn from(&self) -> &str {
        &self.from
    }

    #[must_use]
    pub fn to(&self) -> &[String] {
        &self.to
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl TryFrom<Draft> for Message {
    type Error = ValidationError;

    fn try_from(draft: Draft) -> Result<Self, Self::Error> {
        if draft.from.is_empty() {
            return Err(ValidationError::EmptySender);
        }

        if draft.to.is_empty() {
            return Err(ValidationError::NoRecipients);
        }

        if let Some(index) = draft.to.iter().position(String::is_empty) {
            return Err(ValidationError::EmptyRecipient { index });
        }

        Ok(Self {
            from: draft.from,
            to: draft.to,
            subject: draft.subject,
            text: draft.text,
        })
    }
}
