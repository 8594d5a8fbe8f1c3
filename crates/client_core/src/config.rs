use std::{fs, path::Path, time::Duration};

use anyhow::{anyhow, Context};
use serde::Deserialize;
use shared::domain::{FuelParams, DEFAULT_FUEL_LIMIT, DEFAULT_FUEL_PRICE};
use url::Url;

use crate::gateway::AckPolicy;

pub const DEFAULT_SETTINGS_FILE: &str = "todo_client.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub base_url: String,
    pub logic_id: String,
    pub fuel_price: u64,
    pub fuel_limit: u64,
    pub poll_interval_ms: u64,
    pub ack_timeout_ms: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8545".into(),
            logic_id: "todo-buddy".into(),
            fuel_price: DEFAULT_FUEL_PRICE,
            fuel_limit: DEFAULT_FUEL_LIMIT,
            poll_interval_ms: 250,
            ack_timeout_ms: 60_000,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    base_url: Option<String>,
    logic_id: Option<String>,
    fuel_price: Option<u64>,
    fuel_limit: Option<u64>,
    poll_interval_ms: Option<u64>,
    ack_timeout_ms: Option<u64>,
}

impl ClientSettings {
    pub fn fuel(&self) -> FuelParams {
        FuelParams {
            fuel_price: self.fuel_price,
            fuel_limit: self.fuel_limit,
        }
    }

    pub fn ack_policy(&self) -> AckPolicy {
        AckPolicy {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            timeout: Duration::from_millis(self.ack_timeout_ms),
        }
    }

    pub fn base_url(&self) -> anyhow::Result<Url> {
        let url = Url::parse(self.base_url.trim())
            .with_context(|| format!("invalid base url '{}'", self.base_url))?;
        if url.cannot_be_a_base() {
            return Err(anyhow!("base url '{}' cannot carry paths", self.base_url));
        }
        Ok(url)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.base_url()?;
        if self.logic_id.trim().is_empty() {
            return Err(anyhow!("logic id must not be empty"));
        }
        if self.fuel_price == 0 {
            return Err(anyhow!("fuel price must be positive"));
        }
        if self.poll_interval_ms == 0 {
            return Err(anyhow!("poll interval must be positive"));
        }
        Ok(())
    }

    fn apply_file(&mut self, file_cfg: FileSettings) {
        if let Some(v) = file_cfg.base_url {
            self.base_url = v;
        }
        if let Some(v) = file_cfg.logic_id {
            self.logic_id = v;
        }
        if let Some(v) = file_cfg.fuel_price {
            self.fuel_price = v;
        }
        if let Some(v) = file_cfg.fuel_limit {
            self.fuel_limit = v;
        }
        if let Some(v) = file_cfg.poll_interval_ms {
            self.poll_interval_ms = v;
        }
        if let Some(v) = file_cfg.ack_timeout_ms {
            self.ack_timeout_ms = v;
        }
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(v) = lookup("APP__BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = lookup("APP__LOGIC_ID") {
            self.logic_id = v;
        }
        if let Some(v) = lookup("APP__FUEL_PRICE") {
            self.fuel_price = parse_number("APP__FUEL_PRICE", &v)?;
        }
        if let Some(v) = lookup("APP__FUEL_LIMIT") {
            self.fuel_limit = parse_number("APP__FUEL_LIMIT", &v)?;
        }
        if let Some(v) = lookup("APP__POLL_INTERVAL_MS") {
            self.poll_interval_ms = parse_number("APP__POLL_INTERVAL_MS", &v)?;
        }
        if let Some(v) = lookup("APP__ACK_TIMEOUT_MS") {
            self.ack_timeout_ms = parse_number("APP__ACK_TIMEOUT_MS", &v)?;
        }
        Ok(())
    }
}

fn parse_number(key: &str, raw: &str) -> anyhow::Result<u64> {
    raw.trim()
        .parse::<u64>()
        .with_context(|| format!("{key} must be a non-negative integer, got '{raw}'"))
}

/// Defaults, then `todo_client.toml` in the working directory, then `APP__*` variables.
pub fn load_settings() -> anyhow::Result<ClientSettings> {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE), |key| std::env::var(key).ok())
}

pub fn load_settings_from(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<ClientSettings> {
    let mut settings = ClientSettings::default();

    if path.exists() {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
        let file_cfg: FileSettings = toml::from_str(&raw)
            .with_context(|| format!("failed to parse settings file '{}'", path.display()))?;
        settings.apply_file(file_cfg);
    }

    settings.apply_env(env)?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
