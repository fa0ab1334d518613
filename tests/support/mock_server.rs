//! Mock submission server for exercising the SMTP transport.
//!
//! The server can:
//! - Reply to each command with a configurable code and message
//! - Reject individual recipients
//! - Accept `AUTH PLAIN` and `AUTH LOGIN` exchanges
//! - Delay replies or hang on a given command to test timeouts
//! - Record every command and the message content it received
//!
//! # Example
//!
//! ```rust,no_run
//! let server = MockSmtpServer::builder()
//!     .with_rcpt_to_response_for("bad@x", 550, "No such user")
//!     .build()
//!     .await?;
//!
//! // Point the transport at server.addr()
//!
//! server.shutdown();
//! ```

use std::{
    collections::HashMap,
    fmt::Write,
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    sync::RwLock,
    time::timeout,
};

/// A command received by the mock server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmtpCommand {
    Ehlo(String),
    /// `AUTH` with its mechanism and optional initial response.
    Auth(String),
    /// A line sent in answer to a 334 challenge.
    AuthResponse(String),
    MailFrom(String),
    RcptTo(String),
    Data,
    /// Everything between `DATA` and the terminating dot, as sent.
    MessageContent(Vec<u8>),
    Quit,
    Other(String),
}

impl SmtpCommand {
    /// The verb, for asserting on command order.
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Ehlo(_) => "EHLO",
            Self::Auth(_) => "AUTH",
            Self::AuthResponse(_) => "AUTH-RESPONSE",
            Self::MailFrom(_) => "MAIL",
            Self::RcptTo(_) => "RCPT",
            Self::Data => "DATA",
            Self::MessageContent(_) => "CONTENT",
            Self::Quit => "QUIT",
            Self::Other(_) => "OTHER",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SmtpResponse {
    pub code: u16,
    pub message: String,
}

impl SmtpResponse {
    fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        format!("{} {}\r\n", self.code, self.message).into_bytes()
    }
}

#[derive(Clone)]
struct MockServerConfig {
    greeting: SmtpResponse,
    ehlo_code: u16,
    capabilities: Vec<String>,
    auth_response: SmtpResponse,
    mail_from_response: SmtpResponse,
    rcpt_to_response: SmtpResponse,
    rcpt_to_overrides: HashMap<String, SmtpResponse>,
    data_response: SmtpResponse,
    data_end_response: SmtpResponse,
    quit_response: SmtpResponse,

    // Failure injection
    response_delay: Option<Duration>,
    drop_after_commands: Option<usize>,
    timeout_on_command: Option<usize>,
}

impl Default for MockServerConfig {
    fn default() -> Self {
        Self {
            greeting: SmtpResponse::new(220, "fauxmail dev smtp"),
            ehlo_code: 250,
            capabilities: vec![
                "fauxmail".to_string(),
                "AUTH PLAIN LOGIN".to_string(),
                "OK".to_string(),
            ],
            auth_response: SmtpResponse::new(235, "Authentication successful"),
            mail_from_response: SmtpResponse::new(250, "OK"),
            rcpt_to_response: SmtpResponse::new(250, "Accepted"),
            rcpt_to_overrides: HashMap::new(),
            data_response: SmtpResponse::new(354, "End data with <CR><LF>.<CR><LF>"),
            data_end_response: SmtpResponse::new(
                250,
                "OK id=2f0f2c3e-8c4b-4b8e-9a53-6a9d3c1d7e10",
            ),
            quit_response: SmtpResponse::new(221, "Bye"),
            response_delay: None,
            drop_after_commands: None,
            timeout_on_command: None,
        }
    }
}

impl MockServerConfig {
    fn ehlo_bytes(&self) -> Vec<u8> {
        let mut response = String::new();
        let last = self.capabilities.len().saturating_sub(1);

        for (i, capability) in self.capabilities.iter().enumerate() {
            let separator = if i < last { '-' } else { ' ' };
            let _ = write!(&mut response, "{}{separator}{capability}\r\n", self.ehlo_code);
        }

        response.into_bytes()
    }

    fn rcpt_response(&self, argument: &str) -> &SmtpResponse {
        let address = argument
            .trim_start_matches("TO:")
            .trim_start_matches('<')
            .trim_end_matches('>');

        self.rcpt_to_overrides
            .get(address)
            .unwrap_or(&self.rcpt_to_response)
    }
}

pub struct MockSmtpServer {
    addr: SocketAddr,
    commands_received: Arc<RwLock<Vec<SmtpCommand>>>,
    shutdown: Arc<AtomicBool>,
    connection_count: Arc<AtomicUsize>,
    closed_count: Arc<AtomicUsize>,
}

impl MockSmtpServer {
    #[must_use]
    pub fn builder() -> MockSmtpServerBuilder {
        MockSmtpServerBuilder::new()
    }

    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// All commands received so far, across every connection.
    pub async fn commands(&self) -> Vec<SmtpCommand> {
        self.commands_received.read().await.clone()
    }

    /// The message contents received so far, one per completed `DATA`.
    pub async fn messages(&self) -> Vec<Vec<u8>> {
        self.commands_received
            .read()
            .await
            .iter()
            .filter_map(|command| match command {
                SmtpCommand::MessageContent(content) => Some(content.clone()),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connection_count.load(Ordering::Relaxed)
    }

    /// Connections whose session has ended, by either side.
    #[must_use]
    pub fn closed_count(&self) -> usize {
        self.closed_count.load(Ordering::Relaxed)
    }

    /// Waits until `count` sessions have ended, or `within` elapses.
    pub async fn wait_for_closed(&self, count: usize, within: Duration) -> bool {
        timeout(within, async {
            while self.closed_count() < count {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .is_ok()
    }

    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    async fn reply(
        writer: &mut (impl AsyncWriteExt + Unpin),
        config: &MockServerConfig,
        bytes: &[u8],
    ) -> std::io::Result<()> {
        if let Some(delay) = config.response_delay {
            tokio::time::sleep(delay).await;
        }
        writer.write_all(bytes).await?;
        writer.flush().await
    }

    #[allow(clippy::too_many_lines)]
    async fn handle_client(
        mut stream: TcpStream,
        config: Arc<MockServerConfig>,
        commands: Arc<RwLock<Vec<SmtpCommand>>>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let (reader, mut writer) = stream.split();
        let mut reader = BufReader::new(reader);
        let mut line = String::new();
        let mut command_count = 0;

        writer.write_all(&config.greeting.to_bytes()).await?;
        writer.flush().await?;

        loop {
            line.clear();

            if let Some(drop_after) = config.drop_after_commands
                && command_count >= drop_after
            {
                return Ok(());
            }

            if let Some(timeout_on) = config.timeout_on_command
                && command_count == timeout_on
            {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                return Ok(());
            }

            let Ok(read) = timeout(Duration::from_secs(10), reader.read_line(&mut line)).await
            else {
                return Ok(());
            };
            if read? == 0 {
                return Ok(());
            }
            command_count += 1;

            let command_line = line.trim_end_matches(['\r', '\n']).to_string();
            tracing::debug!("Mock server received: {command_line}");

            let (verb, argument) = command_line
                .split_once(' ')
                .unwrap_or((command_line.as_str(), ""));

            match verb.to_ascii_uppercase().as_str() {
                "EHLO" => {
                    commands.write().await.push(SmtpCommand::Ehlo(argument.to_string()));
                    Self::reply(&mut writer, &config, &config.ehlo_bytes()).await?;
                }
                "AUTH" => {
                    commands.write().await.push(SmtpCommand::Auth(argument.to_string()));

                    let challenges: &[&str] = match argument.split_once(' ') {
                        Some(_) => &[],
                        None if argument.eq_ignore_ascii_case("LOGIN") => {
                            &["VXNlcm5hbWU6", "UGFzc3dvcmQ6"]
                        }
                        None => &[""],
                    };

                    for challenge in challenges {
                        Self::reply(&mut writer, &config, format!("334 {challenge}\r\n").as_bytes())
                            .await?;

                        line.clear();
                        if reader.read_line(&mut line).await? == 0 {
                            return Ok(());
                        }
                        commands.write().await.push(SmtpCommand::AuthResponse(
                            line.trim_end_matches(['\r', '\n']).to_string(),
                        ));
                    }

                    Self::reply(&mut writer, &config, &config.auth_response.to_bytes()).await?;
                }
                "MAIL" => {
                    commands.write().await.push(SmtpCommand::MailFrom(argument.to_string()));
                    Self::reply(&mut writer, &config, &config.mail_from_response.to_bytes())
                        .await?;
                }
                "RCPT" => {
                    commands.write().await.push(SmtpCommand::RcptTo(argument.to_string()));
                    let response = config.rcpt_response(argument).to_bytes();
                    Self::reply(&mut writer, &config, &response).await?;
                }
                "DATA" => {
                    commands.write().await.push(SmtpCommand::Data);
                    Self::reply(&mut writer, &config, &config.data_response.to_bytes()).await?;

                    if config.data_response.code != 354 {
                        continue;
                    }

                    let mut content = Vec::new();
                    loop {
                        line.clear();
                        if reader.read_line(&mut line).await? == 0 {
                            return Ok(());
                        }

                        if line == ".\r\n" || line == ".\n" {
                            break;
                        }
                        content.extend_from_slice(line.as_bytes());
                    }

                    commands.write().await.push(SmtpCommand::MessageContent(content));
                    Self::reply(&mut writer, &config, &config.data_end_response.to_bytes())
                        .await?;
                }
                "QUIT" => {
                    commands.write().await.push(SmtpCommand::Quit);
                    writer.write_all(&config.quit_response.to_bytes()).await?;
                    writer.flush().await?;
                    return Ok(());
                }
                _ => {
                    commands
                        .write()
                        .await
                        .push(SmtpCommand::Other(command_line.clone()));
                    Self::reply(
                        &mut writer,
                        &config,
                        &SmtpResponse::new(500, "Unknown command").to_bytes(),
                    )
                    .await?;
                }
            }
        }
    }
}

pub struct MockSmtpServerBuilder {
    config: MockServerConfig,
}

impl MockSmtpServerBuilder {
    fn new() -> Self {
        Self {
            config: MockServerConfig::default(),
        }
    }

    #[must_use]
    pub fn with_greeting(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.greeting = SmtpResponse::new(code, message);
        self
    }

    /// Set the EHLO reply code and the lines it carries
    #[must_use]
    pub fn with_ehlo_response(mut self, code: u16, capabilities: Vec<String>) -> Self {
        self.config.ehlo_code = code;
        self.config.capabilities = capabilities;
        self
    }

    /// Set the reply that ends an `AUTH` exchange
    #[must_use]
    pub fn with_auth_response(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.auth_response = SmtpResponse::new(code, message);
        self
    }

    #[must_use]
    pub fn with_mail_from_response(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.mail_from_response = SmtpResponse::new(code, message);
        self
    }

    /// Set the RCPT TO reply for every recipient without an override
    #[must_use]
    pub fn with_rcpt_to_response(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.rcpt_to_response = SmtpResponse::new(code, message);
        self
    }

    /// Set the RCPT TO reply for one recipient
    #[must_use]
    pub fn with_rcpt_to_response_for(
        mut self,
        recipient: impl Into<String>,
        code: u16,
        message: impl Into<String>,
    ) -> Self {
        self.config
            .rcpt_to_overrides
            .insert(recipient.into(), SmtpResponse::new(code, message));
        self
    }

    #[must_use]
    pub fn with_data_response(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.data_response = SmtpResponse::new(code, message);
        self
    }

    /// Set the reply after the message content (after `<CRLF>.<CRLF>`)
    #[must_use]
    pub fn with_data_end_response(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.data_end_response = SmtpResponse::new(code, message);
        self
    }

    #[must_use]
    pub fn with_quit_response(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.quit_response = SmtpResponse::new(code, message);
        self
    }

    /// Add a delay before sending each reply
    #[must_use]
    pub const fn with_response_delay(mut self, delay: Duration) -> Self {
        self.config.response_delay = Some(delay);
        self
    }

    /// Drop the connection after N commands
    #[must_use]
    pub const fn with_network_error_after_commands(mut self, count: usize) -> Self {
        self.config.drop_after_commands = Some(count);
        self
    }

    /// Hang instead of reading the Nth command (0-indexed)
    #[must_use]
    pub const fn with_timeout_on_command(mut self, command_index: usize) -> Self {
        self.config.timeout_on_command = Some(command_index);
        self
    }

    /// Bind to a random local port and start serving.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to a port
    pub async fn build(self) -> Result<MockSmtpServer, std::io::Error> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let config = Arc::new(self.config);
        let commands = Arc::new(RwLock::new(Vec::new()));
        let shutdown = Arc::new(AtomicBool::new(false));
        let connection_count = Arc::new(AtomicUsize::new(0));
        let closed_count = Arc::new(AtomicUsize::new(0));

        let commands_clone = Arc::clone(&commands);
        let shutdown_clone = Arc::clone(&shutdown);
        let connection_count_clone = Arc::clone(&connection_count);
        let closed_count_clone = Arc::clone(&closed_count);

        tokio::spawn(async move {
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    break;
                }

                // Accept with a timeout so the shutdown flag is re-checked
                let accept_result = timeout(Duration::from_millis(100), listener.accept()).await;

                if let Ok(Ok((stream, _peer))) = accept_result {
                    connection_count_clone.fetch_add(1, Ordering::Relaxed);
                    let config = Arc::clone(&config);
                    let commands = Arc::clone(&commands_clone);
                    let closed_count = Arc::clone(&closed_count_clone);

                    tokio::spawn(async move {
                        if let Err(e) = MockSmtpServer::handle_client(stream, config, commands).await
                        {
                            tracing::debug!("Mock server client error: {e}");
                        }
                        closed_count.fetch_add(1, Ordering::Relaxed);
                    });
                }
            }
        });

        Ok(MockSmtpServer {
            addr,
            commands_received: commands,
            shutdown,
            connection_count,
            closed_count,
        })
    }
}
