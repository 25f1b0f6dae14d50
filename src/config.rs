use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
    #[serde(default)]
    pub blobs: BlobsConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Memory,
    Mongo,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(Self::Memory),
            "mongo" | "mongodb" => Ok(Self::Mongo),
            o => Err(format!("unknown backend: {}", o)),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: Backend,
    #[serde(default = "default_mongo_uri")]
    pub uri: String,
    #[serde(default = "default_database")]
    pub database: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            uri: default_mongo_uri(),
            database: default_database(),
        }
    }
}

fn default_backend() -> Backend { Backend::Memory }
fn default_mongo_uri() -> String { "mongodb://localhost:27017".to_string() }
fn default_database() -> String { "m-temple".to_string() }

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AlertsConfig {
    /// discord webhook url; alerts are dropped when unset.
    #[serde(default)]
    pub webhook_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct BlobsConfig {
    /// kept in memory when unset.
    #[serde(default)]
    pub root: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LedgerConfig {
    #[serde(default = "default_min_gift")]
    pub min_gift_cents: i64,
    #[serde(default = "default_min_withdrawal")]
    pub min_withdrawal_cents: i64,
    #[serde(default = "default_plan_days")]
    pub plan_days: u64,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            min_gift_cents: default_min_gift(),
            min_withdrawal_cents: default_min_withdrawal(),
            plan_days: default_plan_days(),
            page_size: default_page_size(),
        }
    }
}

fn default_min_gift() -> i64 { 10 }
fn default_min_withdrawal() -> i64 { 1_000 }
fn default_plan_days() -> u64 { 30 }
fn default_page_size() -> usize { 10 }

impl LedgerConfig {
    pub fn plan_secs(&self) -> u64 { self.plan_days * 24 * 60 * 60 }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.ledger.page_size == 0 {
        bail!("ledger.page_size must be > 0");
    }
    if config.ledger.min_gift_cents < 1 {
        bail!("ledger.min_gift_cents must be >= 1");
    }
    if config.ledger.min_withdrawal_cents < 1 {
        bail!("ledger.min_withdrawal_cents must be >= 1");
    }

    Ok(())
}

/// `MTEMPLE_*` variables win over the file.
pub fn apply_env(mut config: Config) -> Result<Config> {
    apply_vars(&mut config, |k| std::env::var(k).ok())?;
    validate(&config)?;

    Ok(config)
}

fn apply_vars(config: &mut Config, var: impl Fn(&str) -> Option<String>) -> Result<()> {
    if let Some(v) = var("MTEMPLE_BACKEND") {
        config.store.backend = v.parse().map_err(::anyhow::Error::msg)?;
    }
    if let Some(v) = var("MTEMPLE_MONGO_URI") {
        config.store.uri = v;
    }
    if let Some(v) = var("MTEMPLE_MONGO_DB") {
        config.store.database = v;
    }
    if let Some(v) = var("MTEMPLE_WEBHOOK_URL") {
        config.alerts.webhook_url = Some(v);
    }
    if let Some(v) = var("MTEMPLE_BLOB_ROOT") {
        config.blobs.root = Some(PathBuf::from(v));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();

        assert_eq!(config.store.backend, Backend::Memory);
        assert_eq!(config.ledger.min_withdrawal_cents, 1_000);
        assert_eq!(config.ledger.plan_secs(), 30 * 86_400);
        assert!(config.alerts.webhook_url.is_none());
    }

    #[test]
    fn sections_parse() {
        let config: Config = toml::from_str(
            r#"
            [store]
            backend = "mongo"
            database = "staging"

            [blobs]
            root = "/tmp/blobs"

            [ledger]
            page_size = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.store.backend, Backend::Mongo);
        assert_eq!(config.store.database, "staging");
        assert_eq!(config.store.uri, "mongodb://localhost:27017");
        assert_eq!(config.blobs.root, Some(PathBuf::from("/tmp/blobs")));
        assert_eq!(config.ledger.page_size, 5);
    }

    #[test]
    fn env_overrides_file() {
        let vars: HashMap<&str, &str> = [
            ("MTEMPLE_BACKEND", "mongodb"),
            ("MTEMPLE_WEBHOOK_URL", "https://discord.com/api/webhooks/1/abc"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        apply_vars(&mut config, |k| vars.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.store.backend, Backend::Mongo);
        assert_eq!(
            config.alerts.webhook_url.as_deref(),
            Some("https://discord.com/api/webhooks/1/abc")
        );
    }

    #[test]
    fn bad_backend_is_rejected() {
        let mut config = Config::default();
        assert!(apply_vars(&mut config, |_| Some("sqlite".to_string())).is_err());
    }
}
