// src/config.rs

//! Manages client configuration: loading, defaults, and validation.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;
use tracing::warn;
use url::Url;

/// Controls how long requests stay in the correlation registry.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Entries older than this are evicted by the purger. `0` disables eviction
    /// and keeps every entry for the lifetime of the client.
    #[serde(default = "default_request_ttl", with = "humantime_serde")]
    pub request_ttl: Duration,
    /// How often the purger scans the registry.
    #[serde(default = "default_purge_interval", with = "humantime_serde")]
    pub purge_interval: Duration,
}

fn default_request_ttl() -> Duration {
    Duration::from_secs(600)
}
fn default_purge_interval() -> Duration {
    Duration::from_secs(30)
}

impl RegistryConfig {
    /// The effective time-to-live, or `None` when eviction is disabled.
    pub fn ttl(&self) -> Option<Duration> {
        (!self.request_ttl.is_zero()).then_some(self.request_ttl)
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            request_ttl: default_request_ttl(),
            purge_interval: default_purge_interval(),
        }
    }
}

/// A raw representation of the config file before validation.
#[derive(Deserialize)]
struct RawConfig {
    #[serde(default = "default_url")]
    url: String,
    #[serde(default = "default_login")]
    login: String,
    #[serde(default)]
    password: String,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    connect_timeout: Duration,
    #[serde(default = "default_login_timeout", with = "humantime_serde")]
    login_timeout: Duration,
    #[serde(default)]
    queries: Vec<String>,
    #[serde(default)]
    registry: RegistryConfig,
}

fn default_url() -> String {
    "ws://localhost:8000/websocket".to_string()
}
fn default_login() -> String {
    "guest".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}
fn default_login_timeout() -> Duration {
    Duration::from_secs(10)
}

/// The validated client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// The server endpoint, `ws://` or `wss://`.
    pub url: String,
    pub login: String,
    /// Sent in plaintext inside the login request.
    #[serde(skip_serializing)]
    pub password: String,
    pub log_level: String,
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub login_timeout: Duration,
    /// Queries submitted by the binary once the login succeeds.
    #[serde(default)]
    pub queries: Vec<String>,
    #[serde(default)]
    pub registry: RegistryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: default_url(),
            login: default_login(),
            password: String::new(),
            log_level: default_log_level(),
            connect_timeout: default_connect_timeout(),
            login_timeout: default_login_timeout(),
            queries: Vec::new(),
            registry: RegistryConfig::default(),
        }
    }
}

impl Config {
    /// Creates a new `Config` instance by reading and parsing a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{path}'"))?;
        Self::from_toml_str(&contents).with_context(|| format!("Invalid config in '{path}'"))
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let raw_config: RawConfig =
            toml::from_str(contents).context("Failed to parse TOML configuration")?;

        let config = Config {
            url: raw_config.url,
            login: raw_config.login,
            password: raw_config.password,
            log_level: raw_config.log_level,
            connect_timeout: raw_config.connect_timeout,
            login_timeout: raw_config.login_timeout,
            queries: raw_config.queries,
            registry: raw_config.registry,
        };

        config.validate()?;
        Ok(config)
    }

    /// Parses the endpoint and checks that it names a WebSocket scheme.
    pub fn endpoint(&self) -> Result<Url> {
        let url = Url::parse(&self.url).with_context(|| format!("Invalid url '{}'", self.url))?;
        match url.scheme() {
            "ws" | "wss" => Ok(url),
            other => Err(anyhow!(
                "url scheme must be 'ws' or 'wss', got '{other}'"
            )),
        }
    }

    /// Validates the configuration for logical consistency.
    pub fn validate(&self) -> Result<()> {
        self.endpoint()?;

        if self.login.trim().is_empty() {
            return Err(anyhow!("login cannot be empty"));
        }
        if self.password.is_empty() {
            warn!("password is empty; the server will most likely reject the login");
        }
        if self.connect_timeout.is_zero() {
            return Err(anyhow!("connect_timeout cannot be 0"));
        }
        if self.login_timeout.is_zero() {
            return Err(anyhow!("login_timeout cannot be 0"));
        }

        if self.registry.ttl().is_some() {
            if self.registry.purge_interval.is_zero() {
                return Err(anyhow!(
                    "registry.purge_interval cannot be 0 when request_ttl is set"
                ));
            }
        } else {
            warn!(
                "registry.request_ttl is disabled; tracked requests will accumulate for the lifetime of the client"
            );
        }

        for (i, query) in self.queries.iter().enumerate() {
            if query.trim().is_empty() {
                return Err(anyhow!("query #{} cannot be empty", i + 1));
            }
        }
        Ok(())
    }
}
