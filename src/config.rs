//! Bridge configuration.
//!
//! A small serde schema with per-field defaults, overridable through
//! environment variables:
//! - `SCENE_BRIDGE_PORT`                 -- listening port (default 8765)
//! - `SCENE_BRIDGE_BIND`                 -- bind address (default 127.0.0.1)
//! - `SCENE_BRIDGE_HEARTBEAT_SECS`       -- heartbeat interval (default 30)
//! - `SCENE_BRIDGE_REQUEST_TIMEOUT_SECS` -- bounded wait on async tools
//!   (unset by default: completions are awaited indefinitely)

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
            heartbeat_secs: default_heartbeat_secs(),
            request_timeout_secs: None,
        }
    }
}

impl BridgeConfig {
    /// Defaults overlaid with any environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(port) = env_parse("SCENE_BRIDGE_PORT") {
            config.port = port;
        }
        if let Ok(bind) = std::env::var("SCENE_BRIDGE_BIND") {
            if !bind.is_empty() {
                config.bind_address = bind;
            }
        }
        if let Some(secs) = env_parse("SCENE_BRIDGE_HEARTBEAT_SECS") {
            config.heartbeat_secs = secs;
        }
        if let Some(secs) = env_parse("SCENE_BRIDGE_REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs = Some(secs);
        }
        config
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs.max(1))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

fn default_port() -> u16 {
    8765
}

fn default_bind_address() -> String {
    "127.0.0.1".into()
}

fn default_heartbeat_secs() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_observed_deployment() {
        let config = BridgeConfig::default();
        assert_eq!(config.port, 8765);
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.heartbeat_secs, 30);
        assert_eq!(config.request_timeout_secs, None);
    }

    #[test]
    fn deserializes_with_missing_fields() {
        let config: BridgeConfig = serde_json::from_str(r#"{"port": 9001}"#).unwrap();
        assert_eq!(config.port, 9001);
        assert_eq!(config.heartbeat_secs, 30);
    }

    #[test]
    fn heartbeat_interval_is_clamped_above_zero() {
        let config = BridgeConfig {
            heartbeat_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.heartbeat_interval(), Duration::from_secs(1));
    }
}
