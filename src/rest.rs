//! Delivery as a single JSON `POST`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    error::DispatchError,
    incoming, internal,
    message::Message,
    outgoing,
    transport::{Transport, TransportKind, TransportResult},
};

/// Request body accepted by the capture server's send endpoint.
#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    text: &'a str,
}

impl<'a> From<&'a Message> for SendRequest<'a> {
    fn from(message: &'a Message) -> Self {
        Self {
            from: message.from(),
            to: message.to(),
            subject: message.subject(),
            text: message.text(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: String,
}

/// Sends a message to the capture server's HTTP endpoint.
///
/// By default every HTTP response counts as a completed round trip and its
/// body becomes the diagnostic, whatever the status. Only failing to connect
/// or to finish the exchange is an error, unless
/// [`Config::treat_http_errors_as_failure`] is set.
#[derive(Debug, Clone)]
pub struct RestTransport {
    config: Config,
}

impl RestTransport {
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    fn client(&self) -> Result<reqwest::Client, DispatchError> {
        Ok(reqwest::Client::builder()
            .connect_timeout(self.config.timeouts.connect)
            .timeout(self.config.timeouts.overall)
            .build()?)
    }
}

#[async_trait]
impl Transport for RestTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Rest
    }

    #[tracing::instrument(level = "info", skip_all, fields(url = %self.config.rest_url))]
    async fn send(&self, message: &Message) -> Result<TransportResult, DispatchError> {
        let url = &self.config.rest_url;
        outgoing!(
            level = DEBUG,
            "POST {url} ({} recipient(s))",
            message.to().len()
        );

        let response = self
            .client()?
            .post(url)
            .json(&SendRequest::from(message))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        incoming!(level = DEBUG, "{status}: {body}");

        if !status.is_success() && self.config.treat_http_errors_as_failure {
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let message_id = status
            .is_success()
            .then(|| serde_json::from_str::<SendResponse>(&body).ok())
            .flatten()
            .map(|response| response.id);

        internal!(level = INFO, "Endpoint answered {status}");

        Ok(TransportResult {
            transport: TransportKind::Rest,
            status: status.as_u16(),
            diagnostic: body,
            message_id,
        })
    }
}
