//! Buffered command/reply I/O over any byte stream.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{error::DispatchError, incoming, outgoing};

use super::{command::Command, error::ProtocolError, reply::Reply};

/// Initial size of the read buffer for replies.
const BUFFER_SIZE: usize = 8192;

/// Maximum size of the read buffer (1MB).
const MAX_BUFFER_SIZE: usize = 1024 * 1024;

/// One open submission connection.
///
/// Generic over the stream so the exchange can run over TCP or an in-memory
/// pipe alike.
pub struct Connection<S> {
    stream: S,
    buffer: Vec<u8>,
    buffer_pos: usize,
    command_timeout: Duration,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, command_timeout: Duration) -> Self {
        Self {
            stream,
            buffer: vec![0u8; BUFFER_SIZE],
            buffer_pos: 0,
            command_timeout,
        }
    }

    /// Writes a command, bounded by the command timeout.
    ///
    /// # Errors
    ///
    /// Returns a connection error if the write fails, or a timeout.
    pub async fn send(&mut self, command: &Command) -> Result<(), DispatchError> {
        outgoing!("{command}");

        let timeout = self.command_timeout;
        let wire = command.to_wire();
        let stream = &mut self.stream;
        let write = async move {
            stream.write_all(wire.as_bytes()).await?;
            stream.flush().await?;
            Ok::<_, std::io::Error>(())
        };

        tokio::time::timeout(timeout, write)
            .await
            .map_err(|_| {
                DispatchError::Timeout(format!("sending {command} timed out after {timeout:?}"))
            })??;

        Ok(())
    }

    /// Reads one complete reply, bounded by the command timeout.
    ///
    /// `waiting_for` only names the step in a timeout message.
    ///
    /// # Errors
    ///
    /// Returns a protocol error for an unparsable reply, a connection error if
    /// the stream fails or is closed, or a timeout.
    pub async fn read_reply(&mut self, waiting_for: &str) -> Result<Reply, DispatchError> {
        let timeout = self.command_timeout;
        let reply = tokio::time::timeout(timeout, self.fill_until_reply())
            .await
            .map_err(|_| {
                DispatchError::Timeout(format!(
                    "waiting for {waiting_for} reply timed out after {timeout:?}"
                ))
            })??;

        incoming!("{reply}");
        Ok(reply)
    }

    async fn fill_until_reply(&mut self) -> Result<Reply, DispatchError> {
        loop {
            if let Some((reply, consumed)) = Reply::parse(&self.buffer[..self.buffer_pos])? {
                self.buffer.copy_within(consumed..self.buffer_pos, 0);
                self.buffer_pos -= consumed;
                return Ok(reply);
            }

            if self.buffer_pos >= self.buffer.len() {
                let new_size = self.buffer.len() * 2;
                if new_size > MAX_BUFFER_SIZE {
                    return Err(ProtocolError::MalformedReply(format!(
                        "reply too large (exceeds {MAX_BUFFER_SIZE} bytes)"
                    ))
                    .into());
                }
                self.buffer.resize(new_size, 0);
            }

            let n = self.stream.read(&mut self.buffer[self.buffer_pos..]).await?;
            if n == 0 {
                return Err(DispatchError::Connection(
                    "connection closed by server".to_string(),
                ));
            }
            self.buffer_pos += n;
        }
    }

    /// Sends `QUIT` and reads the closing reply.
    ///
    /// # Errors
    ///
    /// As for [`Connection::send`] and [`Connection::read_reply`].
    pub async fn quit(&mut self) -> Result<Reply, DispatchError> {
        self.send(&Command::Quit).await?;
        self.read_reply("QUIT").await
    }

    /// Shuts the write half down and releases the stream.
    pub async fn close(mut self) {
        let _ = tokio::time::timeout(self.command_timeout, self.stream.shutdown()).await;
    }
}
