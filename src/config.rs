use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;
use thiserror::Error;

pub const HTTP_ADDR_VAR: &str = "RESOURCE_CAPACITY_HTTP_ADDR";
pub const SNAPSHOT_VAR: &str = "RESOURCE_CAPACITY_SNAPSHOT";
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {var} '{value}': {source}")]
    InvalidAddr {
        var: &'static str,
        value: String,
        source: AddrParseError,
    },
}

/// Process settings for the binaries. Capacity thresholds are not configurable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub http_addr: SocketAddr,
    /// JSON allocation snapshot to load at startup.
    pub snapshot_path: Option<PathBuf>,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_addr = lookup(HTTP_ADDR_VAR).unwrap_or_else(|| DEFAULT_HTTP_ADDR.to_string());
        let http_addr = raw_addr
            .trim()
            .parse()
            .map_err(|source| ConfigError::InvalidAddr {
                var: HTTP_ADDR_VAR,
                value: raw_addr.clone(),
                source,
            })?;
        let snapshot_path = lookup(SNAPSHOT_VAR)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            http_addr,
            snapshot_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_apply_when_unset() {
        let config = ServiceConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.http_addr, DEFAULT_HTTP_ADDR.parse().unwrap());
        assert!(config.snapshot_path.is_none());
    }

    #[test]
    fn reads_overrides() {
        let vars = HashMap::from([
            (HTTP_ADDR_VAR, "127.0.0.1:8080"),
            (SNAPSHOT_VAR, "/tmp/allocations.json"),
        ]);
        let config = ServiceConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.http_addr.port(), 8080);
        assert_eq!(config.snapshot_path, Some(PathBuf::from("/tmp/allocations.json")));
    }

    #[test]
    fn rejects_bad_address() {
        let err = ServiceConfig::from_lookup(|key| {
            (key == HTTP_ADDR_VAR).then(|| "not-an-addr".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains(HTTP_ADDR_VAR));
    }
}
