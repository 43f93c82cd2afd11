//! Server configuration.
//!
//! Defaults, then an optional JSON file named by `AETHER_CONFIG`, then
//! individual env var overrides:
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `AETHER_CONFIG` | Path to a JSON `ServerConfig` |
//! | `AETHER_BIND` | Full bind address, e.g. `127.0.0.1:9000` |
//! | `PORT` | Port only, keeps the configured host |
//! | `AETHER_MATCH_SECS` | Match duration in seconds |
//! | `AETHER_LOCKOUTS` | `1`/`true` enables timed lockouts with defaults |

use std::net::SocketAddr;
use std::path::PathBuf;

use aether_logic::{LockoutConfig, MatchConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub max_room_players: usize,
    /// Keep a persistent `LOCAL` match for clients that never join a room.
    pub legacy_match: bool,
    #[serde(rename = "match")]
    pub match_config: MatchConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_room_players: 4,
            legacy_match: true,
            match_config: MatchConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup("AETHER_CONFIG") {
            Some(path) => {
                let path = PathBuf::from(path);
                let raw = std::fs::read_to_string(&path)
                    .map_err(|source| ConfigError::Read { path, source })?;
                serde_json::from_str(&raw)?
            }
            None => ServerConfig::default(),
        };

        if let Some(bind) = lookup("AETHER_BIND") {
            config.bind = parse_var("AETHER_BIND", &bind)?;
        }
        if let Some(port) = lookup("PORT") {
            config.bind.set_port(parse_var("PORT", &port)?);
        }
        if let Some(secs) = lookup("AETHER_MATCH_SECS") {
            config.match_config.duration_secs = parse_var("AETHER_MATCH_SECS", &secs)?;
        }
        if let Some(flag) = lookup("AETHER_LOCKOUTS") {
            let enabled = match flag.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: "AETHER_LOCKOUTS",
                        value: flag,
                    })
                }
            };
            config.match_config.lockouts = if enabled {
                config.match_config.lockouts.take().or_else(|| Some(LockoutConfig::default()))
            } else {
                None
            };
        }
        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        var,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let c = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(c, ServerConfig::default());
        assert_eq!(c.bind.port(), 8080);
        assert_eq!(c.max_room_players, 4);
        assert!(c.legacy_match);
    }

    #[test]
    fn test_env_overrides() {
        let c = ServerConfig::from_lookup(lookup(&[
            ("AETHER_BIND", "127.0.0.1:9000"),
            ("PORT", "9100"),
            ("AETHER_MATCH_SECS", "90"),
            ("AETHER_LOCKOUTS", "true"),
        ]))
        .unwrap();
        assert_eq!(c.bind.to_string(), "127.0.0.1:9100");
        assert_eq!(c.match_config.duration_secs, 90);
        assert_eq!(c.match_config.lockouts, Some(LockoutConfig::default()));
    }

    #[test]
    fn test_invalid_values() {
        let err = ServerConfig::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var: "PORT", .. }));
        let err = ServerConfig::from_lookup(lookup(&[("AETHER_LOCKOUTS", "maybe")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var: "AETHER_LOCKOUTS", .. }));
    }

    #[test]
    fn test_missing_config_file() {
        let err = ServerConfig::from_lookup(lookup(&[(
            "AETHER_CONFIG",
            "/nonexistent/aether.json",
        )]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_partial_json() {
        let c: ServerConfig =
            serde_json::from_str(r#"{"maxRoomPlayers": 2, "match": {"durationSecs": 60}}"#)
                .unwrap();
        assert_eq!(c.max_room_players, 2);
        assert_eq!(c.match_config.duration_secs, 60);
        assert_eq!(c.match_config.tick_interval_ms, 1000);
        assert!(c.legacy_match);
    }
}
