//! Connection settings for the HTTP backend.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::time::Duration;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// How the client authenticates.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Static API key, sent as `x-api-key`.
    ApiKey(String),
    /// Username and password, exchanged once for a session token.
    Session {
        /// Login email
        username: String,
        /// Password
        password: String,
    },
}

// Never print secrets, even at trace level.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApiKey(_) => f.write_str("ApiKey(**redacted**)"),
            Self::Session { username, .. } => f
                .debug_struct("Session")
                .field("username", username)
                .field("password", &"**redacted**")
                .finish(),
        }
    }
}

/// Everything needed to reach a Metabase instance.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL, e.g. `https://metabase.example.com`
    pub host: String,
    /// Authentication method
    pub credentials: Credentials,
    /// Extra headers attached to every request
    pub headers: BTreeMap<String, String>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl ClientConfig {
    /// Create a config with no extra headers and the default timeout.
    pub fn new(host: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            host: host.into(),
            credentials,
            headers: BTreeMap::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Add a header sent with every request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Override the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check that every required value is present.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Config("host must not be empty".to_string()));
        }
        match &self.credentials {
            Credentials::ApiKey(key) if key.is_empty() => {
                Err(Error::Config("API key must not be empty".to_string()))
            }
            Credentials::Session { username, password }
                if username.is_empty() || password.is_empty() =>
            {
                Err(Error::Config(
                    "username and password must not be empty".to_string(),
                ))
            }
            _ => Ok(()),
        }
    }

    /// The API root (`{host}/api`), without a trailing slash.
    #[must_use]
    pub fn api_base(&self) -> String {
        format!("{}/api", self.host.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_base_strips_trailing_slash() {
        let config = ClientConfig::new(
            "https://metabase.example.com/",
            Credentials::ApiKey("k".into()),
        );
        assert_eq!(config.api_base(), "https://metabase.example.com/api");
    }

    #[test]
    fn test_validate_rejects_empty_host() {
        let config = ClientConfig::new("  ", Credentials::ApiKey("k".into()));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_password() {
        let config = ClientConfig::new(
            "http://localhost:3000",
            Credentials::Session {
                username: "admin@example.com".into(),
                password: String::new(),
            },
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let creds = Credentials::Session {
            username: "admin@example.com".into(),
            password: "hunter2".into(),
        };
        let debug = format!("{creds:?}");
        assert!(debug.contains("admin@example.com"));
        assert!(!debug.contains("hunter2"));

        let key = format!("{:?}", Credentials::ApiKey("mb_secret".into()));
        assert!(!key.contains("mb_secret"));
    }

    #[test]
    fn test_builder_helpers() {
        let config = ClientConfig::new("http://localhost:3000", Credentials::ApiKey("k".into()))
            .header("X-Tenant", "acme")
            .timeout(Duration::from_secs(3));
        assert_eq!(config.headers.get("X-Tenant").map(String::as_str), Some("acme"));
        assert_eq!(config.timeout, Duration::from_secs(3));
    }
}
