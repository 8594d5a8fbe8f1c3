use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::Context;

use crate::logic::{RoutineCosts, DEFAULT_RECEIPT_RETENTION};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub bind_addr: String,
    pub logic_id: String,
    pub confirm_delay_ms: u64,
    pub add_fuel_cost: u64,
    pub complete_fuel_cost: u64,
    pub receipt_retention: usize,
}

impl Default for Settings {
    fn default() -> Self {
        let costs = RoutineCosts::default();
        Self {
            bind_addr: "127.0.0.1:8545".into(),
            logic_id: "todo-buddy".into(),
            confirm_delay_ms: 1500,
            add_fuel_cost: costs.add,
            complete_fuel_cost: costs.complete,
            receipt_retention: DEFAULT_RECEIPT_RETENTION,
        }
    }
}

impl Settings {
    pub fn confirm_delay(&self) -> Duration {
        Duration::from_millis(self.confirm_delay_ms)
    }

    pub fn costs(&self) -> RoutineCosts {
        RoutineCosts {
            add: self.add_fuel_cost,
            complete: self.complete_fuel_cost,
        }
    }
}

pub fn load_settings() -> anyhow::Result<Settings> {
    load_settings_from(Path::new("logic_server.toml"), |key| std::env::var(key).ok())
}

pub fn load_settings_from(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    if path.exists() {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read '{}'", path.display()))?;
        let file_cfg = toml::from_str::<HashMap<String, toml::Value>>(&raw)
            .with_context(|| format!("failed to parse '{}'", path.display()))?;
        if let Some(v) = file_cfg.get("bind_addr").and_then(toml::Value::as_str) {
            settings.bind_addr = v.to_string();
        }
        if let Some(v) = file_cfg.get("logic_id").and_then(toml::Value::as_str) {
            settings.logic_id = v.to_string();
        }
        if let Some(v) = file_cfg.get("confirm_delay_ms").and_then(as_u64) {
            settings.confirm_delay_ms = v;
        }
        if let Some(v) = file_cfg.get("add_fuel_cost").and_then(as_u64) {
            settings.add_fuel_cost = v;
        }
        if let Some(v) = file_cfg.get("complete_fuel_cost").and_then(as_u64) {
            settings.complete_fuel_cost = v;
        }
        if let Some(v) = file_cfg
            .get("receipt_retention")
            .and_then(as_u64)
            .and_then(|v| usize::try_from(v).ok())
        {
            settings.receipt_retention = v;
        }
    }

    if let Some(v) = env("APP__BIND_ADDR") {
        settings.bind_addr = v;
    }
    if let Some(v) = env("APP__LOGIC_ID") {
        settings.logic_id = v;
    }
    if let Some(v) = env("APP__CONFIRM_DELAY_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.confirm_delay_ms = parsed;
        }
    }
    if let Some(v) = env("APP__ADD_FUEL_COST") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.add_fuel_cost = parsed;
        }
    }
    if let Some(v) = env("APP__COMPLETE_FUEL_COST") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.complete_fuel_cost = parsed;
        }
    }
    if let Some(v) = env("APP__RECEIPT_RETENTION") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.receipt_retention = parsed;
        }
    }

    Ok(settings)
}

fn as_u64(value: &toml::Value) -> Option<u64> {
    value.as_integer().and_then(|v| u64::try_from(v).ok())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
