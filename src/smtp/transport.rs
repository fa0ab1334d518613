//! Delivery over the submission protocol.
//!
//! One connection per send:
//! 1. Connect and read the greeting
//! 2. `EHLO`, then `AUTH` when credentials are configured
//! 3. `MAIL FROM` and one `RCPT TO` per recipient, in order
//! 4. `DATA` and the message content
//! 5. `QUIT`, whatever the outcome, and close

use async_trait::async_trait;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
};

use crate::{
    config::Config,
    error::DispatchError,
    internal,
    message::Message,
    traits::fsm::FiniteStateMachine,
    transport::{Transport, TransportKind, TransportResult},
};

use super::{
    command::check_addresses,
    connection::Connection,
    reply::Reply,
    state::{Session, State},
};

/// Sends a message by speaking the submission protocol to `host:port`.
#[derive(Debug, Clone)]
pub struct SubmissionTransport {
    config: Config,
}

impl SubmissionTransport {
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    async fn connect(&self) -> Result<Connection<TcpStream>, DispatchError> {
        let address = self.config.submission_address();
        let timeout = self.config.timeouts.connect;

        let stream = tokio::time::timeout(timeout, TcpStream::connect(&address))
            .await
            .map_err(|_| {
                DispatchError::Timeout(format!(
                    "connecting to {address} timed out after {timeout:?}"
                ))
            })?
            .map_err(|e| DispatchError::Connection(format!("Failed to connect to {address}: {e}")))?;

        internal!(level = DEBUG, "Connected to {address}");
        Ok(Connection::new(stream, self.config.timeouts.command))
    }

    /// Runs the whole exchange over an already open connection, then quits
    /// and closes it.
    ///
    /// `QUIT` is skipped only when the connection itself failed or timed out,
    /// since the stream can no longer be trusted at that point.
    ///
    /// # Errors
    ///
    /// Returns a validation error, without writing anything, if an address
    /// contains a line break. Otherwise returns the first connection, timeout
    /// or protocol error encountered.
    pub async fn exchange<S>(
        &self,
        mut connection: Connection<S>,
        message: &Message,
    ) -> Result<TransportResult, DispatchError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        if let Err(err) = check_addresses(message) {
            connection.close().await;
            return Err(err.into());
        }

        let mut session = Session::new(&self.config, message);
        let outcome = drive(&mut connection, &mut session).await;

        if !matches!(
            outcome,
            Err(DispatchError::Connection(_) | DispatchError::Timeout(_))
        ) {
            match connection.quit().await {
                Ok(reply) => internal!(level = DEBUG, "Session closed: {reply}"),
                Err(err) => internal!(level = DEBUG, "QUIT failed: {err}"),
            }
        }
        connection.close().await;

        let reply = outcome?;
        internal!(
            level = INFO,
            "Message accepted for {} recipient(s): {reply}",
            session.accepted().len()
        );

        Ok(TransportResult {
            transport: TransportKind::Smtp,
            status: reply.code,
            diagnostic: reply.message(),
            message_id: reply.message_id(),
        })
    }
}

/// Steps the state machine until it completes or aborts.
async fn drive<S>(
    connection: &mut Connection<S>,
    session: &mut Session,
) -> Result<Reply, DispatchError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut state = State::default();

    loop {
        state = match state {
            State::Completed(reply) => return Ok(reply),
            State::Aborted(error) => {
                let class = if error.is_permanent() {
                    "permanent"
                } else if error.is_transient() {
                    "transient"
                } else {
                    "malformed"
                };
                internal!(level = WARN, "Exchange aborted ({class}): {error}");
                return Err(error.into());
            }
            state => {
                let waiting_for = state
                    .stage()
                    .map_or_else(|| "final".to_string(), |stage| stage.to_string());

                if let Some(command) = state.command(session) {
                    connection.send(&command).await?;
                }

                let reply = connection.read_reply(&waiting_for).await?;
                state.transition(reply, session)
            }
        };
    }
}

#[async_trait]
impl Transport for SubmissionTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Smtp
    }

    #[tracing::instrument(level = "info", skip_all, fields(server = %self.config.submission_address()))]
    async fn send(&self, message: &Message) -> Result<TransportResult, DispatchError> {
        check_addresses(message)?;
        let connection = self.connect().await?;
        self.exchange(connection, message).await
    }
}
