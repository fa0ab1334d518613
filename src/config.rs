//! Transport parameters resolved from environment-style inputs.
//!
//! Resolution is total: absent or empty inputs take the documented defaults,
//! and malformed numbers fall back to their defaults instead of failing.

use core::fmt::{self, Debug, Formatter};
use std::time::Duration;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 1025;
pub const DEFAULT_REST_URL: &str = "http://127.0.0.1:8025/send";
pub const DEFAULT_HELO_NAME: &str = "localhost";

pub const ENV_HOST: &str = "FAUXMAIL_HOST";
pub const ENV_PORT: &str = "FAUXMAIL_PORT";
pub const ENV_USER: &str = "FAUXMAIL_SMTP_USER";
pub const ENV_PASS: &str = "FAUXMAIL_SMTP_PASS";
pub const ENV_REST_URL: &str = "FAUXMAIL_HTTP";
pub const ENV_HELO_NAME: &str = "FAUXMAIL_HELO";
pub const ENV_AUTH_MECHANISM: &str = "FAUXMAIL_SMTP_AUTH";
pub const ENV_HTTP_STRICT: &str = "FAUXMAIL_HTTP_STRICT";
pub const ENV_CONNECT_TIMEOUT: &str = "FAUXMAIL_CONNECT_TIMEOUT_SECS";
pub const ENV_COMMAND_TIMEOUT: &str = "FAUXMAIL_COMMAND_TIMEOUT_SECS";
pub const ENV_TIMEOUT: &str = "FAUXMAIL_TIMEOUT_SECS";

/// SASL mechanism used when credentials are configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMechanism {
    #[default]
    Plain,
    Login,
}

impl AuthMechanism {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PLAIN" => Some(Self::Plain),
            "LOGIN" => Some(Self::Login),
            _ => None,
        }
    }
}

/// A username and password pair. Only ever constructed with both halves.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    user: String,
    pass: String,
}

impl Credentials {
    #[must_use]
    pub fn new(user: impl Into<String>, pass: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            pass: pass.into(),
        }
    }

    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    #[must_use]
    pub fn pass(&self) -> &str {
        &self.pass
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .finish()
    }
}

/// Deadlines applied to a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Establishing the TCP connection or HTTP connection.
    ///
    /// Default: 5 seconds
    pub connect: Duration,

    /// Waiting for any single submission reply.
    ///
    /// Default: 10 seconds
    pub command: Duration,

    /// The whole dispatch, end to end.
    ///
    /// Default: 30 seconds
    pub overall: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(5),
            command: Duration::from_secs(10),
            overall: Duration::from_secs(30),
        }
    }
}

/// Everything a dispatch needs to reach the capture server.
///
/// Built once per dispatch and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub rest_url: String,
    pub helo_name: String,
    pub auth_mechanism: AuthMechanism,
    /// When set, a non-2xx REST status fails the dispatch.
    pub treat_http_errors_as_failure: bool,
    pub timeouts: Timeouts,
    credentials: Option<Credentials>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            rest_url: DEFAULT_REST_URL.to_string(),
            helo_name: DEFAULT_HELO_NAME.to_string(),
            auth_mechanism: AuthMechanism::default(),
            treat_http_errors_as_failure: false,
            timeouts: Timeouts::default(),
            credentials: None,
        }
    }
}

impl Config {
    /// Resolves a configuration from a snapshot of named inputs.
    ///
    /// `lookup` is queried once per input name; `None` and empty strings are
    /// both treated as absent.
    pub fn resolve<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let port = get(ENV_PORT)
            .and_then(|port| port.trim().parse::<u16>().ok())
            .filter(|port| *port != 0)
            .unwrap_or(defaults.port);

        let seconds = |name: &str, fallback: Duration| {
            get(name)
                .and_then(|secs| secs.trim().parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map_or(fallback, Duration::from_secs)
        };

        let credentials = match (get(ENV_USER), get(ENV_PASS)) {
            (Some(user), Some(pass)) => Some(Credentials::new(user, pass)),
            _ => None,
        };

        Self {
            host: get(ENV_HOST).unwrap_or(defaults.host),
            port,
            rest_url: get(ENV_REST_URL).unwrap_or(defaults.rest_url),
            helo_name: get(ENV_HELO_NAME).unwrap_or(defaults.helo_name),
            auth_mechanism: get(ENV_AUTH_MECHANISM)
                .and_then(|mechanism| AuthMechanism::parse(&mechanism))
                .unwrap_or_default(),
            treat_http_errors_as_failure: get(ENV_HTTP_STRICT).is_some_and(|flag| {
                matches!(
                    flag.trim().to_ascii_lowercase().as_str(),
                    "1" | "true" | "yes" | "on"
                )
            }),
            timeouts: Timeouts {
                connect: seconds(ENV_CONNECT_TIMEOUT, defaults.timeouts.connect),
                command: seconds(ENV_COMMAND_TIMEOUT, defaults.timeouts.command),
                overall: seconds(ENV_TIMEOUT, defaults.timeouts.overall),
            },
            credentials,
        }
    }

    /// Resolves a configuration from the process environment.
    pub fn from_env() -> Self {
        Self::resolve(|name| std::env::var(name).ok())
    }

    /// Replaces the credentials. Supplying only one half clears them.
    #[must_use]
    pub fn with_credentials(mut self, user: Option<String>, pass: Option<String>) -> Self {
        self.credentials = match (user, pass) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => {
                Some(Credentials::new(user, pass))
            }
            _ => None,
        };
        self
    }

    #[must_use]
    pub const fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    #[must_use]
    pub const fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    #[must_use]
    pub fn user(&self) -> Option<&str> {
        self.credentials.as_ref().map(Credentials::user)
    }

    #[must_use]
    pub fn pass(&self) -> Option<&str> {
        self.credentials.as_ref().map(Credentials::pass)
    }

    /// The `host:port` pair of the submission endpoint.
    #[must_use]
    pub fn submission_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
