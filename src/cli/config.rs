use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::sink::{InfluxTarget, RetryConfig};

pub const CONFIG_FILENAME: &str = ".build2influx.toml";
pub const DEFAULT_LISTEN: &str = "127.0.0.1:8080";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen")]
    pub listen: String,
    pub influx: InfluxConfig,
    #[serde(default)]
    pub retry: RetrySettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfluxConfig {
    pub url: String,
    pub database: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    /// Switches to exponential backoff capped at this delay
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_delay_ms: Option<u64>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
            max_delay_ms: None,
        }
    }
}

fn default_listen() -> String {
    DEFAULT_LISTEN.to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_delay_ms() -> u64 {
    500
}

impl Config {
    pub fn new(url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            listen: default_listen(),
            influx: InfluxConfig {
                url: url.into(),
                database: database.into(),
                retention_policy: None,
                token: None,
                username: None,
                password: None,
            },
            retry: RetrySettings::default(),
        }
    }

    pub fn load() -> Result<Self> {
        load_config_from_path(CONFIG_FILENAME)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write {}", path.as_ref().display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.influx.url.trim();
        if url.is_empty() {
            bail!("influx.url must not be empty");
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            bail!("influx.url must start with http:// or https://, got '{}'", url);
        }
        if self.influx.database.trim().is_empty() {
            bail!("influx.database must not be empty");
        }
        if self.influx.username.is_some() != self.influx.password.is_some() {
            bail!("influx.username and influx.password must be set together");
        }
        Ok(())
    }

    pub fn influx_target(&self) -> InfluxTarget {
        InfluxTarget {
            url: self.influx.url.clone(),
            database: self.influx.database.clone(),
            retention_policy: self.influx.retention_policy.clone(),
            token: self.influx.token.clone(),
            username: self.influx.username.clone(),
            password: self.influx.password.clone(),
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        match self.retry.max_delay_ms {
            Some(max_ms) => {
                RetryConfig::exponential(self.retry.max_attempts, self.retry.delay_ms, max_ms)
            }
            None => RetryConfig::fixed(
                self.retry.max_attempts,
                Duration::from_millis(self.retry.delay_ms),
            ),
        }
    }

    /// Apply command-line / environment overrides
    pub fn with_overrides(
        mut self,
        url: Option<String>,
        database: Option<String>,
        token: Option<String>,
    ) -> Self {
        if let Some(url) = url {
            self.influx.url = url;
        }
        if let Some(database) = database {
            self.influx.database = database;
        }
        if token.is_some() {
            self.influx.token = token;
        }
        self
    }
}

pub fn load_config_from_path(path: impl AsRef<Path>) -> Result<Config> {
    let content = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read {}", path.as_ref().display()))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.as_ref().display()))?;
    Ok(config)
}

/// Load from an explicit path, the default file, or fall back to overrides
/// alone when no file exists and both URL and database are given.
pub fn resolve_config(
    path: Option<&Path>,
    url: Option<String>,
    database: Option<String>,
    token: Option<String>,
) -> Result<Config> {
    let config = match path {
        Some(path) => load_config_from_path(path)?,
        None if Path::new(CONFIG_FILENAME).exists() => Config::load()?,
        None => match (&url, &database) {
            (Some(u), Some(d)) => Config::new(u.clone(), d.clone()),
            _ => bail!(
                "No {} found. Run 'build2influx init' first, or pass --url and --database.",
                CONFIG_FILENAME
            ),
        },
    };
    let config = config.with_overrides(url, database, token);
    config.validate()?;
    Ok(config)
}
