//! Server-level configuration: network bind address, storage endpoints,
//! and the per-subsystem simulation tunables from `outpost_core::ZoneConfig`.
//! Loaded from an optional TOML file and then overridden field-by-field by
//! whatever CLI flags the user actually passed.

use std::fs;
use std::path::Path;

use outpost_core::ZoneConfig;
use serde::Deserialize;

pub const DEFAULT_PORT: u16 = 7777;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self { bind: "0.0.0.0".to_string(), port: DEFAULT_PORT }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub redis_host: String,
    pub redis_port: u16,
    pub scylla_host: String,
    pub scylla_port: u16,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            redis_host: "127.0.0.1".to_string(),
            redis_port: 6379,
            scylla_host: "127.0.0.1".to_string(),
            scylla_port: 9042,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    pub zone_id: u32,
    pub network: NetworkConfig,
    pub storage: StorageConfig,
    pub zone: ZoneConfig,
}

impl ServerConfig {
    /// Loads from `path` if given and present; falls back to `Default` when
    /// no path is given. A path that's given but unreadable is an error —
    /// a typo'd `--config` shouldn't silently run with defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => {
                let text = fs::read_to_string(p)?;
                Ok(toml::from_str(&text)?)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.network.bind, self.network.port)
    }
}
