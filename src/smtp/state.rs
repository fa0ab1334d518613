//! The submission exchange as an explicit state machine.
//!
//! Each state names the command to send next (if any) and consumes the reply
//! to it:
//!
//! ```text
//! Connected -> Greeted -> Identified ------------------------> SenderSet -> .. -> RecipientsAccepted -> DataStarted -> Completed
//!                      \-> Authenticating -> Authenticated --/
//! ```
//!
//! Any unexpected reply moves to `Aborted`, which like `Completed` is
//! terminal. Transitions perform no I/O.

use crate::{
    config::{AuthMechanism, Config, Credentials},
    message::Message,
    traits::fsm::FiniteStateMachine,
};

use super::{
    command::{Command, encode_payload},
    error::{ProtocolError, Stage},
    reply::{Reply, ReplyClass},
};

/// Progress through `AUTH LOGIN`; `AUTH PLAIN` only uses `Start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStep {
    Start,
    Username,
    Password,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum State {
    /// Connection open, greeting not yet read.
    #[default]
    Connected,
    /// Greeting accepted, identification pending.
    Greeted,
    Authenticating(AuthStep),
    /// Identified and authenticated, sender pending.
    Authenticated,
    /// Identified without credentials, sender pending.
    Identified,
    /// Sender accepted along with the first `accepted` recipients.
    SenderSet { accepted: usize },
    /// Every recipient accepted, data-start pending.
    RecipientsAccepted,
    /// Server is ready for the message content.
    DataStarted,
    /// Message accepted; holds the final reply.
    Completed(Reply),
    Aborted(ProtocolError),
}

/// Protocol-level context for a single exchange.
#[derive(Debug, Clone)]
pub struct Session {
    message: Message,
    credentials: Option<Credentials>,
    mechanism: AuthMechanism,
    helo_name: String,
    accepted: Vec<String>,
}

impl Session {
    #[must_use]
    pub fn new(config: &Config, message: &Message) -> Self {
        Self {
            message: message.clone(),
            credentials: config.credentials().cloned(),
            mechanism: config.auth_mechanism,
            helo_name: config.helo_name.clone(),
            accepted: Vec::with_capacity(message.to().len()),
        }
    }

    /// Recipients the server has accepted so far, in order.
    #[must_use]
    pub fn accepted(&self) -> &[String] {
        &self.accepted
    }
}

impl State {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Aborted(_))
    }

    /// The step whose reply this state is waiting for.
    #[must_use]
    pub const fn stage(&self) -> Option<Stage> {
        match self {
            Self::Connected => Some(Stage::Greeting),
            Self::Greeted => Some(Stage::Identification),
            Self::Authenticating(_) => Some(Stage::Authentication),
            Self::Authenticated | Self::Identified => Some(Stage::Sender),
            Self::SenderSet { .. } => Some(Stage::Recipient),
            Self::RecipientsAccepted => Some(Stage::DataStart),
            Self::DataStarted => Some(Stage::DataEnd),
            Self::Completed(_) | Self::Aborted(_) => None,
        }
    }

    /// The command to send before the next reply is read.
    ///
    /// `None` for `Connected`, where the server speaks first, and for
    /// terminal states.
    #[must_use]
    pub fn command(&self, session: &Session) -> Option<Command> {
        match self {
            Self::Connected | Self::Completed(_) | Self::Aborted(_) => None,
            Self::Greeted => Some(Command::Ehlo(session.helo_name.clone())),
            Self::Authenticating(step) => {
                let credentials = session.credentials.as_ref()?;
                Some(match (session.mechanism, step) {
                    (AuthMechanism::Plain, _) => Command::auth_plain(credentials),
                    (AuthMechanism::Login, AuthStep::Start) => Command::AuthLogin,
                    (AuthMechanism::Login, AuthStep::Username) => {
                        Command::auth_response(credentials.user())
                    }
                    (AuthMechanism::Login, AuthStep::Password) => {
                        Command::auth_response(credentials.pass())
                    }
                })
            }
            Self::Authenticated | Self::Identified => {
                Some(Command::MailFrom(session.message.from().to_string()))
            }
            Self::SenderSet { accepted } => session
                .message
                .to()
                .get(*accepted)
                .map(|recipient| Command::RcptTo(recipient.clone())),
            Self::RecipientsAccepted => Some(Command::Data),
            Self::DataStarted => Some(Command::Payload(encode_payload(&session.message))),
        }
    }

    fn reject(stage: Stage, reply: &Reply) -> Self {
        Self::Aborted(ProtocolError::Rejected {
            stage,
            code: reply.code,
            message: reply.message(),
        })
    }

    fn authenticate(step: AuthStep, reply: &Reply, session: &Session) -> Self {
        match (session.mechanism, step, reply.class()) {
            (AuthMechanism::Plain, AuthStep::Start, ReplyClass::Success)
            | (AuthMechanism::Login, AuthStep::Password, ReplyClass::Success) => {
                Self::Authenticated
            }
            (AuthMechanism::Login, AuthStep::Start, ReplyClass::Intermediate) => {
                Self::Authenticating(AuthStep::Username)
            }
            (AuthMechanism::Login, AuthStep::Username, ReplyClass::Intermediate) => {
                Self::Authenticating(AuthStep::Password)
            }
            _ => Self::Aborted(ProtocolError::AuthenticationFailed {
                code: reply.code,
                message: reply.message(),
            }),
        }
    }
}

impl FiniteStateMachine for State {
    type Input = Reply;
    type Context = Session;

    fn transition(self, reply: Reply, session: &mut Session) -> Self {
        match self {
            Self::Connected if reply.is_success() => Self::Greeted,
            Self::Connected => Self::reject(Stage::Greeting, &reply),

            Self::Greeted if reply.is_success() => {
                if session.credentials.is_some() {
                    Self::Authenticating(AuthStep::Start)
                } else {
                    Self::Identified
                }
            }
            Self::Greeted => Self::reject(Stage::Identification, &reply),

            Self::Authenticating(step) => Self::authenticate(step, &reply, session),

            Self::Authenticated | Self::Identified if reply.is_success() => {
                Self::SenderSet { accepted: 0 }
            }
            Self::Authenticated | Self::Identified => Self::reject(Stage::Sender, &reply),

            Self::SenderSet { accepted } => {
                let Some(recipient) = session.message.to().get(accepted).cloned() else {
                    return Self::RecipientsAccepted;
                };

                if !reply.is_success() {
                    return Self::Aborted(ProtocolError::RecipientRejected {
                        recipient,
                        code: reply.code,
                        message: reply.message(),
                    });
                }

                session.accepted.push(recipient);
                if accepted + 1 == session.message.to().len() {
                    Self::RecipientsAccepted
                } else {
                    Self::SenderSet {
                        accepted: accepted + 1,
                    }
                }
            }

            Self::RecipientsAccepted if reply.is_intermediate() => Self::DataStarted,
            Self::RecipientsAccepted => Self::reject(Stage::DataStart, &reply),

            Self::DataStarted if reply.is_success() => Self::Completed(reply),
            Self::DataStarted => Self::reject(Stage::DataEnd, &reply),

            terminal @ (Self::Completed(_) | Self::Aborted(_)) => terminal,
        }
    }
}
