// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

use crate::SettingKey;

/// Flat, persistent key-value store shared by all screens. Values are strings;
/// numbers are stored in their decimal text form.
pub trait SettingsStore {
    fn get_string(&self, key: SettingKey) -> Result<Option<String>>;
    fn set_string(&mut self, key: SettingKey, value: &str) -> Result<()>;
    fn remove(&mut self, key: SettingKey) -> Result<()>;

    fn get_number(&self, key: SettingKey) -> Result<Option<f64>> {
        let Some(raw) = self.get_string(key)? else {
            return Ok(None);
        };
        let value = raw.trim().parse::<f64>().with_context(|| {
            format!(
                "setting `{}` holds non-numeric value {raw:?}",
                key.as_str()
            )
        })?;
        Ok(Some(value))
    }

    fn set_number(&mut self, key: SettingKey, value: f64) -> Result<()> {
        if !value.is_finite() {
            bail!("setting `{}` cannot store {value}", key.as_str());
        }
        self.set_string(key, &value.to_string())
    }
}

/// Reads a JSON value, falling back to `default` when the key is missing or
/// the stored text does not decode. Corruption is logged, never surfaced.
pub fn read_json_or<S, T>(store: &S, key: SettingKey, default: T) -> T
where
    S: SettingsStore + ?Sized,
    T: DeserializeOwned,
{
    let raw = match store.get_string(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return default,
        Err(error) => {
            tracing::error!(key = key.as_str(), "read setting failed: {error:#}");
            return default;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(error) => {
            tracing::warn!(key = key.as_str(), "stored JSON is corrupt, using default: {error}");
            default
        }
    }
}

pub fn write_json<S, T>(store: &mut S, key: SettingKey, value: &T) -> Result<()>
where
    S: SettingsStore + ?Sized,
    T: Serialize + ?Sized,
{
    let encoded =
        serde_json::to_string(value).with_context(|| format!("encode `{}`", key.as_str()))?;
    store.set_string(key, &encoded)
}

/// Process-local store used for tests and ephemeral sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemorySettings {
    values: BTreeMap<SettingKey, String>,
    writes: usize,
    fail_writes: bool,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, key: SettingKey, raw: &str) -> Self {
        self.values.insert(key, raw.to_owned());
        self
    }

    pub fn raw(&self, key: SettingKey) -> Option<&str> {
        self.values.get(&key).map(String::as_str)
    }

    /// Number of successful `set_string`/`remove` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes
    }

    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }
}

impl SettingsStore for MemorySettings {
    fn get_string(&self, key: SettingKey) -> Result<Option<String>> {
        Ok(self.values.get(&key).cloned())
    }

    fn set_string(&mut self, key: SettingKey, value: &str) -> Result<()> {
        if self.fail_writes {
            bail!("write `{}` rejected: store is read-only", key.as_str());
        }
        self.values.insert(key, value.to_owned());
        self.writes += 1;
        Ok(())
    }

    fn remove(&mut self, key: SettingKey) -> Result<()> {
        if self.fail_writes {
            bail!("remove `{}` rejected: store is read-only", key.as_str());
        }
        self.values.remove(&key);
        self.writes += 1;
        Ok(())
    }
}
