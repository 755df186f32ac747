// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use mlfs_app::{DEFAULT_FILTER_DEBOUNCE, DEFAULT_PAGE_SIZE, ResourceKind};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_NAME: &str = "mlfs";
pub const CONFIG_PATH_ENV: &str = "MLFS_CONFIG_PATH";

const CONFIG_VERSION: i64 = 1;
const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_TIMEOUT: &str = "10s";
const DEFAULT_LOG_LEVEL: &str = "info";
const MAX_PAGE_SIZE: usize = 1_000;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub api: Api,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            api: Api::default(),
            ui: Ui::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Api {
    pub base_url: Option<String>,
    pub timeout: Option<String>,
}

impl Default for Api {
    fn default() -> Self {
        Self {
            base_url: Some(DEFAULT_BASE_URL.to_owned()),
            timeout: Some(DEFAULT_TIMEOUT.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ui {
    pub resource: Option<String>,
    pub page_size: Option<usize>,
    pub filter_debounce: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub file: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: Some(DEFAULT_LOG_LEVEL.to_owned()),
            file: None,
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
        Ok(config_root.join(APP_NAME).join("config.toml"))
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
                    "config file {} has no version. Add `version = 1` and put values under [api], [ui], and [log]",
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
        let base_url = self.base_url();
        if base_url.is_empty() {
            bail!("api.base_url in {} must not be empty", path.display());
        }
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            bail!(
                "api.base_url in {} must start with http:// or https://, got {}",
                path.display(),
                base_url
            );
        }

        if let Some(timeout) = &self.api.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "api.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if let Some(page_size) = self.ui.page_size
            && !(1..=MAX_PAGE_SIZE).contains(&page_size)
        {
            bail!(
                "ui.page_size in {} must be between 1 and {MAX_PAGE_SIZE}, got {}",
                path.display(),
                page_size
            );
        }

        if let Some(debounce) = &self.ui.filter_debounce {
            parse_duration(debounce)
                .with_context(|| format!("ui.filter_debounce in {}", path.display()))?;
        }

        if let Some(resource) = &self.ui.resource {
            parse_resource(resource)
                .with_context(|| format!("ui.resource in {}", path.display()))?;
        }

        Ok(())
    }

    pub fn base_url(&self) -> &str {
        self.api
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim()
            .trim_end_matches('/')
    }

    pub fn api_timeout(&self) -> Result<Duration> {
        parse_duration(self.api.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn resource(&self) -> Result<ResourceKind> {
        match &self.ui.resource {
            Some(resource) => parse_resource(resource),
            None => Ok(ResourceKind::BusinessPlanActivities),
        }
    }

    pub fn page_size(&self) -> usize {
        self.ui.page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn filter_debounce(&self) -> Result<Duration> {
        match &self.ui.filter_debounce {
            Some(raw) => parse_duration(raw),
            None => Ok(DEFAULT_FILTER_DEBOUNCE),
        }
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_file(&self) -> Result<PathBuf> {
        if let Some(file) = &self.log.file {
            return Ok(PathBuf::from(file));
        }
        let root = dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .ok_or_else(|| anyhow!("cannot resolve a log directory; set [log].file"))?;
        Ok(root.join(APP_NAME).join("mlfs.log"))
    }

    pub fn example_config(path: &Path) -> String {
        let resources = ResourceKind::ALL
            .iter()
            .map(|resource| resource.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "# mlfs config\n# Place this file at: {}\n\nversion = 1\n\n[api]\nbase_url = \"{}\"\n# <N>ms, <N>s, or <N>m\ntimeout = \"{}\"\n\n[ui]\n# One of: {}\nresource = \"{}\"\npage_size = {}\nfilter_debounce = \"{}ms\"\n\n[log]\n# tracing filter directives, for example \"debug\" or \"mlfs_grid=debug,info\"\nlevel = \"{}\"\n# Optional. Default is the platform state dir (for example ~/.local/state/mlfs/mlfs.log)\n# file = \"/absolute/path/to/mlfs.log\"\n",
            path.display(),
            DEFAULT_BASE_URL,
            DEFAULT_TIMEOUT,
            resources,
            ResourceKind::BusinessPlanActivities.as_str(),
            DEFAULT_PAGE_SIZE,
            DEFAULT_FILTER_DEBOUNCE.as_millis(),
            DEFAULT_LOG_LEVEL,
        )
    }
}

pub fn parse_resource(raw: &str) -> Result<ResourceKind> {
    ResourceKind::parse(raw.trim()).ok_or_else(|| {
        let known = ResourceKind::ALL
            .iter()
            .map(|resource| resource.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        anyhow!("unknown resource {raw:?}; use one of: {known}")
    })
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

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 400ms or 10s)")
}

#[cfg(test)]
mod tests {
    use super::{CONFIG_PATH_ENV, Config, parse_duration, parse_resource};
    use anyhow::Result;
    use mlfs_app::ResourceKind;
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
        assert_eq!(config.base_url(), "http://localhost:8000");
        assert_eq!(config.api_timeout()?, Duration::from_secs(10));
        assert_eq!(config.resource()?, ResourceKind::BusinessPlanActivities);
        assert_eq!(config.page_size(), 50);
        assert_eq!(config.filter_debounce()?, Duration::from_millis(400));
        assert_eq!(config.log_level(), "info");
        Ok(())
    }

    #[test]
    fn unversioned_config_is_rejected_with_actionable_message() -> Result<()> {
        let (_temp, path) = write_config("[api]\nbase_url = \"http://localhost:8000\"\n")?;
        let error = Config::load(&path).expect_err("unversioned config should fail");
        let message = error.to_string();
        assert!(message.contains("version = 1"));
        assert!(message.contains("[api], [ui], and [log]"));
        Ok(())
    }

    #[test]
    fn full_config_parses() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[api]\nbase_url = \"https://mlfs.example.org/\"\ntimeout = \"2s\"\n[ui]\nresource = \"contributions\"\npage_size = 25\nfilter_debounce = \"250ms\"\n[log]\nlevel = \"debug\"\nfile = \"/tmp/mlfs-test.log\"\n",
        )?;

        let config = Config::load(&path)?;
        assert_eq!(config.base_url(), "https://mlfs.example.org");
        assert_eq!(config.api_timeout()?, Duration::from_secs(2));
        assert_eq!(config.resource()?, ResourceKind::Contributions);
        assert_eq!(config.page_size(), 25);
        assert_eq!(config.filter_debounce()?, Duration::from_millis(250));
        assert_eq!(config.log_level(), "debug");
        assert_eq!(config.log_file()?, PathBuf::from("/tmp/mlfs-test.log"));
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
    fn non_http_base_url_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[api]\nbase_url = \"ftp://files\"\n")?;
        let error = Config::load(&path).expect_err("ftp base url should fail");
        assert!(error.to_string().contains("http:// or https://"));
        Ok(())
    }

    #[test]
    fn zero_timeout_and_page_size_are_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[api]\ntimeout = \"0s\"\n")?;
        let error = Config::load(&path).expect_err("zero timeout should fail");
        assert!(error.to_string().contains("must be positive"));

        let (_temp, path) = write_config("version = 1\n[ui]\npage_size = 0\n")?;
        let error = Config::load(&path).expect_err("zero page size should fail");
        assert!(error.to_string().contains("ui.page_size"));
        Ok(())
    }

    #[test]
    fn unknown_resource_lists_known_names() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[ui]\nresource = \"budgets\"\n")?;
        let error = Config::load(&path).expect_err("unknown resource should fail");
        let message = format!("{error:#}");
        assert!(message.contains("unknown resource \"budgets\""));
        assert!(message.contains("business_plans"));

        assert_eq!(parse_resource(" projects ")?, ResourceKind::ProjectSubmissions);
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
    fn default_path_uses_config_toml_suffix_when_no_env_override() -> Result<()> {
        let _guard = env_lock();
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::remove_var(CONFIG_PATH_ENV);
        }
        let path = Config::default_path()?;
        assert!(path.ends_with("mlfs/config.toml"));
        Ok(())
    }

    #[test]
    fn durations_parse_ms_seconds_and_minutes() -> Result<()> {
        assert_eq!(parse_duration("400ms")?, Duration::from_millis(400));
        assert_eq!(parse_duration("5s")?, Duration::from_secs(5));
        assert_eq!(parse_duration("2m")?, Duration::from_secs(120));
        let error = parse_duration("soon").expect_err("invalid duration should fail");
        assert!(error.to_string().contains("invalid duration"));
        Ok(())
    }

    #[test]
    fn example_config_loads_back() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        let example = Config::example_config(&path);
        assert!(example.contains("version = 1"));
        assert!(example.contains("[api]"));
        assert!(example.contains("[ui]"));
        assert!(example.contains("[log]"));

        std::fs::write(&path, &example)?;
        let config = Config::load(&path)?;
        assert_eq!(config.filter_debounce()?, Duration::from_millis(400));
        Ok(())
    }
}
