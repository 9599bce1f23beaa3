// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use carely_app::DEFAULT_TICK_INTERVAL;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_VERSION: i64 = 1;
pub const CONFIG_PATH_ENV: &str = "CARELY_CONFIG_PATH";
const DEFAULT_CHAT_TIMEOUT: &str = "30s";
const DEFAULT_TICK: &str = "2s";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub chat: Chat,
    #[serde(default)]
    pub steps: Steps,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            storage: Storage::default(),
            chat: Chat::default(),
            steps: Steps::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Storage {
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub enabled: Option<bool>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub timeout: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl Default for Chat {
    fn default() -> Self {
        Self {
            enabled: Some(true),
            base_url: Some(carely_llm::DEFAULT_BASE_URL.to_owned()),
            model: Some(carely_llm::DEFAULT_MODEL.to_owned()),
            api_key: None,
            timeout: Some(DEFAULT_CHAT_TIMEOUT.to_owned()),
            max_tokens: Some(carely_llm::DEFAULT_MAX_TOKENS),
            temperature: Some(carely_llm::DEFAULT_TEMPERATURE),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Steps {
    pub tick_interval: Option<String>,
}

impl Default for Steps {
    fn default() -> Self {
        Self {
            tick_interval: Some(DEFAULT_TICK.to_owned()),
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set {CONFIG_PATH_ENV} to the config file")
        })?;

        let app_dir = config_root.join(carely_db::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version; add `version = 1` and put values under [storage], [chat], and [steps]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(db_path) = &self.storage.db_path {
            carely_db::validate_db_path(db_path)?;
        }

        if let Some(timeout) = &self.chat.timeout
            && parse_duration(timeout)?.is_zero()
        {
            bail!(
                "chat.timeout in {} must be positive, got {}",
                path.display(),
                timeout
            );
        }

        if self.chat.max_tokens == Some(0) {
            bail!("chat.max_tokens in {} must be at least 1", path.display());
        }

        if let Some(temperature) = self.chat.temperature
            && !(0.0..=2.0).contains(&temperature)
        {
            bail!(
                "chat.temperature in {} must be between 0 and 2, got {}",
                path.display(),
                temperature
            );
        }

        if let Some(interval) = &self.steps.tick_interval
            && parse_duration(interval)?.is_zero()
        {
            bail!(
                "steps.tick_interval in {} must be positive, got {}",
                path.display(),
                interval
            );
        }

        Ok(())
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.storage.db_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => carely_db::default_db_path(),
        }
    }

    pub fn chat_enabled(&self) -> bool {
        self.chat.enabled.unwrap_or(true)
    }

    pub fn chat_base_url(&self) -> &str {
        self.chat
            .base_url
            .as_deref()
            .unwrap_or(carely_llm::DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn chat_model(&self) -> &str {
        self.chat
            .model
            .as_deref()
            .unwrap_or(carely_llm::DEFAULT_MODEL)
    }

    pub fn chat_api_key(&self) -> Option<&str> {
        self.chat
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn chat_timeout(&self) -> Result<Duration> {
        parse_duration(self.chat.timeout.as_deref().unwrap_or(DEFAULT_CHAT_TIMEOUT))
    }

    pub fn chat_max_tokens(&self) -> u32 {
        self.chat
            .max_tokens
            .unwrap_or(carely_llm::DEFAULT_MAX_TOKENS)
    }

    pub fn chat_temperature(&self) -> f32 {
        self.chat
            .temperature
            .unwrap_or(carely_llm::DEFAULT_TEMPERATURE)
    }

    pub fn tick_interval(&self) -> Result<Duration> {
        match &self.steps.tick_interval {
            Some(raw) => parse_duration(raw),
            None => Ok(DEFAULT_TICK_INTERVAL),
        }
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# carely config\n# Place this file at: {}\n\nversion = 1\n\n[storage]\n# Optional. Default is the platform data dir (for example ~/.local/share/carely/carely.db)\n# db_path = \"/absolute/path/to/carely.db\"\n\n[chat]\nenabled = true\nbase_url = \"{}\"\nmodel = \"{}\"\n# Required before the assistant will answer.\n# api_key = \"sk-...\"\ntimeout = \"{}\"\nmax_tokens = {}\ntemperature = {}\n\n[steps]\ntick_interval = \"{}\"\n",
            path.display(),
            carely_llm::DEFAULT_BASE_URL,
            carely_llm::DEFAULT_MODEL,
            DEFAULT_CHAT_TIMEOUT,
            carely_llm::DEFAULT_MAX_TOKENS,
            carely_llm::DEFAULT_TEMPERATURE,
            DEFAULT_TICK,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 2s)")
}

#[cfg(test)]
mod tests {
    use super::{CONFIG_PATH_ENV, Config, parse_duration};
    use anyhow::Result;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;

    fn write_config(content: &str) -> Result<(tempfile::TempDir, PathBuf)> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, content)?;
        Ok((temp, path))
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        match ENV_LOCK.get_or_init(|| Mutex::new(())).lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[test]
    fn missing_config_uses_defaults() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let config = Config::load(&temp.path().join("missing.toml"))?;
        assert_eq!(config.version, 1);
        assert!(config.chat_enabled());
        assert_eq!(config.chat_api_key(), None);
        assert_eq!(config.chat_base_url(), "https://api.openai.com/v1");
        assert_eq!(config.chat_timeout()?, Duration::from_secs(30));
        assert_eq!(config.tick_interval()?, Duration::from_secs(2));
        Ok(())
    }

    #[test]
    fn unversioned_config_is_rejected_with_actionable_message() -> Result<()> {
        let (_temp, path) = write_config("[chat]\nmodel=\"gpt-4o-mini\"\n")?;
        let error = Config::load(&path).expect_err("unversioned config should fail");
        let message = error.to_string();
        assert!(message.contains("version = 1"));
        assert!(message.contains("[storage], [chat], and [steps]"));
        Ok(())
    }

    #[test]
    fn full_config_parses() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[storage]\ndb_path = \"/data/carely.db\"\n[chat]\nbase_url = \"http://localhost:8080/v1/\"\nmodel = \"local-model\"\napi_key = \"  sk-local  \"\ntimeout = \"500ms\"\nmax_tokens = 256\ntemperature = 0.2\n[steps]\ntick_interval = \"1s\"\n",
        )?;

        let config = Config::load(&path)?;
        assert_eq!(config.db_path()?, PathBuf::from("/data/carely.db"));
        assert_eq!(config.chat_base_url(), "http://localhost:8080/v1");
        assert_eq!(config.chat_model(), "local-model");
        assert_eq!(config.chat_api_key(), Some("sk-local"));
        assert_eq!(config.chat_timeout()?, Duration::from_millis(500));
        assert_eq!(config.chat_max_tokens(), 256);
        assert!((config.chat_temperature() - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.tick_interval()?, Duration::from_secs(1));
        Ok(())
    }

    #[test]
    fn blank_api_key_counts_as_unset() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[chat]\napi_key = \"   \"\n")?;
        let config = Config::load(&path)?;
        assert_eq!(config.chat_api_key(), None);
        Ok(())
    }

    #[test]
    fn malformed_config_returns_parse_error() -> Result<()> {
        let (_temp, path) = write_config("{{not toml")?;
        let error = Config::load(&path).expect_err("malformed config should fail");
        assert!(error.to_string().contains("parse TOML config"));
        Ok(())
    }

    #[test]
    fn unsupported_config_version_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 2\n")?;
        let error = Config::load(&path).expect_err("v2 config should fail");
        assert!(error.to_string().contains("unsupported config version 2"));
        Ok(())
    }

    #[test]
    fn default_path_honors_env_override() -> Result<()> {
        let _guard = env_lock();
        let temp = tempfile::tempdir()?;
        let override_path = temp.path().join("custom-config.toml");
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var(CONFIG_PATH_ENV, &override_path);
        }
        let resolved = Config::default_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var(CONFIG_PATH_ENV);
        }
        assert_eq!(resolved, override_path);
        Ok(())
    }

    #[test]
    fn db_path_prefers_storage_config_over_env_override() -> Result<()> {
        let _guard = env_lock();
        let (_temp, path) =
            write_config("version = 1\n[storage]\ndb_path = \"/explicit/from-config.db\"\n")?;
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var(carely_db::DB_PATH_ENV, "/from/env.db");
        }
        let config = Config::load(&path)?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var(carely_db::DB_PATH_ENV);
        }
        assert_eq!(config.db_path()?, PathBuf::from("/explicit/from-config.db"));
        Ok(())
    }

    #[test]
    fn db_path_uses_env_override_when_storage_db_path_missing() -> Result<()> {
        let _guard = env_lock();
        let (_temp, path) = write_config("version = 1\n")?;
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var(carely_db::DB_PATH_ENV, "/from/env-only.db");
        }
        let config = Config::load(&path)?;
        let resolved = config.db_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var(carely_db::DB_PATH_ENV);
        }
        assert_eq!(resolved, PathBuf::from("/from/env-only.db"));
        Ok(())
    }

    #[test]
    fn db_path_rejects_uri_style_storage_value() -> Result<()> {
        let (_temp, path) =
            write_config("version = 1\n[storage]\ndb_path = \"https://evil.example/carely.db\"\n")?;
        assert!(Config::load(&path).is_err());
        Ok(())
    }

    #[test]
    fn durations_parse_ms_seconds_and_minutes() -> Result<()> {
        assert_eq!(parse_duration("500ms")?, Duration::from_millis(500));
        assert_eq!(parse_duration("5s")?, Duration::from_secs(5));
        assert_eq!(parse_duration("2m")?, Duration::from_secs(120));
        assert!(parse_duration("oops").is_err());
        assert!(parse_duration("5h").is_err());
        Ok(())
    }

    #[test]
    fn non_positive_durations_are_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[chat]\ntimeout = \"0s\"\n")?;
        let error = Config::load(&path).expect_err("zero timeout should fail");
        assert!(error.to_string().contains("chat.timeout"));

        let (_temp, path) = write_config("version = 1\n[steps]\ntick_interval = \"0ms\"\n")?;
        let error = Config::load(&path).expect_err("zero tick interval should fail");
        assert!(error.to_string().contains("steps.tick_interval"));
        Ok(())
    }

    #[test]
    fn sampling_values_are_validated() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[chat]\nmax_tokens = 0\n")?;
        let error = Config::load(&path).expect_err("zero max_tokens should fail");
        assert!(error.to_string().contains("max_tokens"));

        let (_temp, path) = write_config("version = 1\n[chat]\ntemperature = 3.5\n")?;
        let error = Config::load(&path).expect_err("temperature out of range should fail");
        assert!(error.to_string().contains("temperature"));
        Ok(())
    }

    #[test]
    fn example_config_round_trips_through_load() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        let example = Config::example_config(&path);
        assert!(example.contains("[storage]"));
        assert!(example.contains("[chat]"));
        assert!(example.contains("[steps]"));

        std::fs::write(&path, &example)?;
        let config = Config::load(&path)?;
        assert_eq!(config.chat_model(), "gpt-3.5-turbo");
        assert_eq!(config.chat_api_key(), None);
        Ok(())
    }
}
