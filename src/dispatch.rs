//! Top-level orchestration of a single send.

use crate::{
    config::Config,
    error::DispatchError,
    internal,
    message::{Draft, Message},
    rest::RestTransport,
    smtp::SubmissionTransport,
    transport::{Transport, TransportKind, TransportResult},
};

/// Sends messages with a fixed configuration.
///
/// Holds no connection state, so one dispatcher can drive any number of
/// concurrent sends. Each send uses exactly one connection or request and is
/// never retried or rerouted to the other transport.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    config: Config,
}

impl Dispatcher {
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// A dispatcher configured from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(Config::from_env())
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    fn transport(&self, kind: TransportKind) -> Box<dyn Transport> {
        match kind {
            TransportKind::Smtp => Box::new(SubmissionTransport::new(self.config.clone())),
            TransportKind::Rest => Box::new(RestTransport::new(self.config.clone())),
        }
    }

    /// Validates `draft` and sends it over the chosen transport.
    ///
    /// Validation happens before any network activity. The whole send is
    /// bounded by the overall timeout; when it expires the transport is
    /// dropped, which closes its connection.
    ///
    /// # Errors
    ///
    /// Returns the first [`DispatchError`] encountered. A non-2xx REST status
    /// is only an error when strict HTTP handling is enabled.
    pub async fn dispatch(
        &self,
        kind: TransportKind,
        draft: Draft,
    ) -> Result<TransportResult, DispatchError> {
        let message = Message::try_from(draft).inspect_err(|err| {
            internal!(level = WARN, "Refusing to send: {err}");
        })?;

        self.send(kind, &message).await
    }

    /// Sends an already validated message over the chosen transport.
    ///
    /// # Errors
    ///
    /// As for [`Dispatcher::dispatch`], minus validation.
    pub async fn send(
        &self,
        kind: TransportKind,
        message: &Message,
    ) -> Result<TransportResult, DispatchError> {
        let overall = self.config.timeouts.overall;
        let transport = self.transport(kind);

        internal!(
            level = DEBUG,
            "Sending via {kind} from {} to {} recipient(s)",
            message.from(),
            message.to().len()
        );

        let result = tokio::time::timeout(overall, transport.send(message))
            .await
            .map_err(|_| {
                DispatchError::Timeout(format!("{kind} dispatch exceeded {overall:?}"))
            })?;

        match &result {
            Ok(sent) if !sent.is_positive() => internal!(
                level = WARN,
                "{kind} endpoint answered {}: {}",
                sent.status,
                sent.diagnostic
            ),
            Ok(sent) => internal!(level = INFO, "Sent via {kind}: {}", sent.diagnostic),
            Err(err) => internal!(level = ERROR, "Dispatch via {kind} failed: {err}"),
        }

        result
    }
}

/// Resolves the configuration from the environment and sends one message.
///
/// # Errors
///
/// As for [`Dispatcher::dispatch`].
pub async fn dispatch(kind: TransportKind, draft: Draft) -> Result<TransportResult, DispatchError> {
    Dispatcher::from_env().dispatch(kind, draft).await
}
