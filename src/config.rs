//! Provider configuration: how to reach and authenticate with Metabase.
//!
//! Values come from the `[provider]` table of the manifest, each falling back
//! to a `METABASE_*` environment variable when left out.

use anyhow::{Context, Result, bail};
use metabase_api::{Client, ClientConfig, Credentials};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

pub const ENV_HOST: &str = "METABASE_HOST";
pub const ENV_API_KEY: &str = "METABASE_API_KEY";
pub const ENV_USERNAME: &str = "METABASE_USERNAME";
pub const ENV_PASSWORD: &str = "METABASE_PASSWORD";

/// The `[provider]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Base URL of the Metabase instance
    pub host: Option<String>,
    /// API key; takes precedence over username/password
    pub api_key: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Extra headers sent with every request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Per-request timeout in seconds
    pub timeout_secs: Option<u64>,
}

impl ProviderConfig {
    /// Resolve against the process environment.
    pub fn resolve(&self) -> Result<ClientConfig> {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    /// Resolve, looking up fallbacks through `env`.
    pub fn resolve_with(&self, env: impl Fn(&str) -> Option<String>) -> Result<ClientConfig> {
        let pick = |explicit: &Option<String>, var: &str| {
            explicit
                .clone()
                .or_else(|| env(var))
                .filter(|v| !v.is_empty())
        };

        let Some(host) = pick(&self.host, ENV_HOST) else {
            bail!(
                "Missing required value for host. Either provide explicitly in the provider \
                 config or set the {ENV_HOST} environment variable."
            );
        };

        let api_key = pick(&self.api_key, ENV_API_KEY);
        let username = pick(&self.username, ENV_USERNAME);
        let password = pick(&self.password, ENV_PASSWORD);

        let credentials = match (api_key, username, password) {
            (Some(key), _, _) => Credentials::ApiKey(key),
            (None, Some(username), Some(password)) => Credentials::Session { username, password },
            _ => bail!(
                "Invalid authentication configuration: you must set either the API key (via the \
                 api_key attribute or {ENV_API_KEY} environment variable) or username and \
                 password (via the username and password attributes, or {ENV_USERNAME} and \
                 {ENV_PASSWORD} environment variables)."
            ),
        };

        let mut config = ClientConfig::new(host, credentials);
        for (name, value) in &self.headers {
            config = config.header(name, value);
        }
        if let Some(secs) = self.timeout_secs {
            config = config.timeout(Duration::from_secs(secs));
        }
        config.validate().context("Invalid provider configuration")?;

        log::debug!("Resolved provider config for {}", config.host);
        Ok(config)
    }

    /// Resolve and build the client shared by every operation.
    pub fn connect(&self) -> Result<Client> {
        let config = self.resolve()?;
        Client::connect(&config).context("Unable to create client")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let pairs: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| {
            pairs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
        }
    }

    #[test]
    fn test_explicit_api_key() {
        let provider = ProviderConfig {
            host: Some("https://mb.example.com".into()),
            api_key: Some("mb_key".into()),
            ..Default::default()
        };
        let config = provider.resolve_with(env_of(&[])).unwrap();
        assert_eq!(config.host, "https://mb.example.com");
        assert_eq!(config.credentials, Credentials::ApiKey("mb_key".into()));
    }

    #[test]
    fn test_env_fallback_for_session() {
        let config = ProviderConfig::default()
            .resolve_with(env_of(&[
                (ENV_HOST, "http://localhost:3000"),
                (ENV_USERNAME, "admin@example.com"),
                (ENV_PASSWORD, "hunter2"),
            ]))
            .unwrap();
        assert_eq!(
            config.credentials,
            Credentials::Session {
                username: "admin@example.com".into(),
                password: "hunter2".into(),
            }
        );
    }

    #[test]
    fn test_explicit_value_beats_env() {
        let provider = ProviderConfig {
            host: Some("http://explicit".into()),
            ..Default::default()
        };
        let config = provider
            .resolve_with(env_of(&[(ENV_HOST, "http://env"), (ENV_API_KEY, "k")]))
            .unwrap();
        assert_eq!(config.host, "http://explicit");
    }

    #[test]
    fn test_api_key_wins_over_password() {
        let config = ProviderConfig::default()
            .resolve_with(env_of(&[
                (ENV_HOST, "http://h"),
                (ENV_API_KEY, "k"),
                (ENV_USERNAME, "u"),
                (ENV_PASSWORD, "p"),
            ]))
            .unwrap();
        assert_eq!(config.credentials, Credentials::ApiKey("k".into()));
    }

    #[test]
    fn test_missing_host() {
        let err = ProviderConfig::default()
            .resolve_with(env_of(&[(ENV_API_KEY, "k")]))
            .unwrap_err();
        assert!(err.to_string().contains("METABASE_HOST"));
    }

    #[test]
    fn test_username_without_password_is_rejected() {
        let err = ProviderConfig::default()
            .resolve_with(env_of(&[(ENV_HOST, "http://h"), (ENV_USERNAME, "u")]))
            .unwrap_err();
        assert!(err.to_string().contains("either the API key"));
    }

    #[test]
    fn test_headers_and_timeout() {
        let mut provider = ProviderConfig {
            api_key: Some("k".into()),
            timeout_secs: Some(30),
            ..Default::default()
        };
        provider
            .headers
            .insert("X-Tenant".into(), "analytics".into());
        let config = provider
            .resolve_with(env_of(&[(ENV_HOST, "http://h")]))
            .unwrap();
        assert_eq!(config.headers.get("X-Tenant").map(String::as_str), Some("analytics"));
        assert_eq!(config.timeout, Duration::from_secs(30));
    }
}
