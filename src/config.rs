// Configuration management module
// This file handles loading and parsing of configuration settings
// from APP__-prefixed environment variables
//
// Numan Thabit 2025 Nov

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::control::Credentials;
use crate::router::RouterSettings;

/// Well-known placeholders callers use for the chain's native value.
pub const DEFAULT_NATIVE_ALIASES: [&str; 2] = [
    "0x0000000000000000000000000000000000000000",
    "0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE",
];

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// HTTP API bind address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Actors allowed to run admin operations (comma separated)
    #[serde(default)]
    pub admins: Vec<String>,
    /// API bearer tokens as `token=actor` pairs (comma separated)
    #[serde(default)]
    pub api_tokens: Vec<String>,
    /// Concurrency control
    #[serde(default = "default_max_inflight")]
    pub max_inflight: usize,
    /// Exchanges admitted per second (defaults to 200)
    pub rate_per_sec: Option<u32>,
    /// Upper bound on a single adapter call
    #[serde(default = "default_hop_timeout_ms")]
    pub hop_timeout_ms: u64,
    /// Asset labels treated as native value (comma separated)
    #[serde(default = "default_native_aliases")]
    pub native_aliases: Vec<String>,
    /// Asset label of the wrapped native token
    pub wrapped_native: Option<String>,
    /// Optional YAML file seeding adapters, tables and balances
    pub bootstrap_path: Option<PathBuf>,
    /// Capacity of the router event channel
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_max_inflight() -> usize {
    64
}

fn default_hop_timeout_ms() -> u64 {
    5_000
}

fn default_native_aliases() -> Vec<String> {
    DEFAULT_NATIVE_ALIASES.iter().map(|s| s.to_string()).collect()
}

fn default_event_buffer() -> usize {
    1024
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::from_source(None)
    }

    /// Load from an explicit variable map instead of the process environment.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self> {
        Self::from_source(Some(vars))
    }

    fn from_source(vars: Option<HashMap<String, String>>) -> Result<Self> {
        let env = config::Environment::with_prefix("APP")
            .prefix_separator("__")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("admins")
            .with_list_parse_key("api_tokens")
            .with_list_parse_key("native_aliases")
            .try_parsing(true)
            .source(vars);
        let cfg = config::Config::builder()
            .add_source(env)
            .build()
            .context("read APP__ environment")?;
        cfg.try_deserialize().context("deserialize AppConfig")
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen_addr
            .parse()
            .with_context(|| format!("invalid listen address: {}", self.listen_addr))
    }

    pub fn hop_timeout(&self) -> Duration {
        Duration::from_millis(self.hop_timeout_ms)
    }

    /// Bearer credentials parsed from `api_tokens`.
    pub fn credentials(&self) -> Result<Credentials> {
        let pairs = self
            .api_tokens
            .iter()
            .map(|entry| {
                let (token, actor) = entry
                    .split_once('=')
                    .ok_or_else(|| anyhow!("api token entry without '=' separator"))?;
                let (token, actor) = (token.trim(), actor.trim());
                if token.is_empty() || actor.is_empty() {
                    return Err(anyhow!("api token entry with empty token or actor"));
                }
                Ok((token.to_string(), actor.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Credentials::new(pairs))
    }

    pub fn router_settings(&self) -> RouterSettings {
        RouterSettings {
            hop_timeout: self.hop_timeout(),
            max_inflight: self.max_inflight,
            rate_per_sec: self.rate_per_sec,
            event_buffer: self.event_buffer,
        }
    }
}
