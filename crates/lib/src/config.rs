//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.parley/config.json`) and
//! environment. Missing file means defaults.

use crate::client::BackoffPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Relay server settings.
    #[serde(default)]
    pub relay: RelayConfig,

    /// Client-side settings (service URL, backoff).
    #[serde(default)]
    pub client: ClientConfig,

    /// Defaults for `parley chat` / `parley send`.
    #[serde(default)]
    pub chat: ChatDefaults,
}

/// Relay bind, port, and long-poll hold settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayConfig {
    /// Port for the service endpoints (default 16161).
    #[serde(default = "default_relay_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_relay_bind")]
    pub bind: String,

    /// How long a poll is parked before an empty batch is returned, in ms
    /// (default 25000).
    #[serde(default = "default_hold_ms")]
    pub hold_ms: u64,
}

fn default_relay_port() -> u16 {
    16161
}

fn default_relay_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_hold_ms() -> u64 {
    25_000
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: default_relay_port(),
            bind: default_relay_bind(),
            hold_ms: default_hold_ms(),
        }
    }
}

/// Client settings: where the relay is and how to retry failed polls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Base URL of the relay service (default http://127.0.0.1:16161).
    /// Overridden by PARLEY_SERVICE_URL.
    #[serde(default = "default_service_url")]
    pub service_url: String,

    /// First retry delay after a failed poll, in ms (default 500).
    #[serde(default = "default_backoff_initial_ms")]
    pub backoff_initial_ms: u64,

    /// Retry delay cap, in ms (default 15000).
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,

    /// Optional per-request timeout, in ms. Unset means a poll stays pending
    /// for as long as the relay holds it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_ms: Option<u64>,
}

fn default_service_url() -> String {
    "http://127.0.0.1:16161".to_string()
}

fn default_backoff_initial_ms() -> u64 {
    500
}

fn default_backoff_max_ms() -> u64 {
    15_000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            service_url: default_service_url(),
            backoff_initial_ms: default_backoff_initial_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            request_timeout_ms: None,
        }
    }
}

/// Default channel and user for the chat commands.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatDefaults {
    pub channel: Option<String>,
    pub user: Option<String>,
}

/// Resolve the service URL: env PARLEY_SERVICE_URL overrides config.
pub fn resolve_service_url(config: &Config) -> String {
    std::env::var("PARLEY_SERVICE_URL")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| config.client.service_url.trim().to_string())
}

/// Backoff policy from client config. A zero initial is clamped to 1 ms so
/// repeated failures can never hot-loop.
pub fn resolve_backoff(client: &ClientConfig) -> BackoffPolicy {
    let initial = client.backoff_initial_ms.max(1);
    let max = client.backoff_max_ms.max(initial);
    BackoffPolicy {
        initial: Duration::from_millis(initial),
        max: Duration::from_millis(max),
    }
}

/// Optional request timeout from client config.
pub fn resolve_request_timeout(client: &ClientConfig) -> Option<Duration> {
    client.request_timeout_ms.map(Duration::from_millis)
}

/// True if the bind address is loopback (127.0.0.1, ::1, etc.).
pub fn is_loopback_bind(bind: &str) -> bool {
    let b = bind.trim();
    b == "127.0.0.1" || b == "::1" || b == "localhost"
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("PARLEY_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".parley").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the default path (or PARLEY_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_relay_port_and_bind() {
        let r = RelayConfig::default();
        assert_eq!(r.port, 16161);
        assert_eq!(r.bind, "127.0.0.1");
        assert_eq!(r.hold_ms, 25_000);
    }

    #[test]
    fn backoff_from_defaults() {
        let policy = resolve_backoff(&ClientConfig::default());
        assert_eq!(policy.initial, Duration::from_millis(500));
        assert_eq!(policy.max, Duration::from_secs(15));
    }

    #[test]
    fn backoff_zero_initial_clamped() {
        let mut client = ClientConfig::default();
        client.backoff_initial_ms = 0;
        client.backoff_max_ms = 0;
        let policy = resolve_backoff(&client);
        assert!(policy.initial >= Duration::from_millis(1));
        assert!(policy.max >= policy.initial);
    }

    #[test]
    fn empty_config_parses_to_defaults() {
        let config: Config = serde_json::from_str("{}").expect("parse empty config");
        assert_eq!(config.relay.port, 16161);
        assert_eq!(config.client.service_url, "http://127.0.0.1:16161");
        assert!(config.chat.channel.is_none());
    }

    #[test]
    fn loopback_bind_detection() {
        assert!(is_loopback_bind("127.0.0.1"));
        assert!(is_loopback_bind("localhost"));
        assert!(!is_loopback_bind("0.0.0.0"));
    }
}
