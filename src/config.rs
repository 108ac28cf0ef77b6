use crate::constants::{DEFAULT_BIND_ADDR, DEFAULT_CACHE_PATH, DEFAULT_GEOCODER_URL};
use crate::error::{Result, ScraperError};
use serde::Deserialize;
use std::fs;
use std::path::Path;

const DEFAULT_CONFIG_PATH: &str = "ttf.toml";

/// Runtime settings: optional `ttf.toml` (or the file named by `TTF_CONFIG`),
/// overridden by `TTF_*` environment variables
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,
    pub server: ServerConfig,
    pub http: HttpConfig,
    pub scheduler: SchedulerConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub path: String,
    /// Mirror the durable cache in memory
    pub memory: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub geocoder_url: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub interval_hours: u64,
    pub comp_type: Option<String>,
    /// Comma-separated source ids
    pub federations: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct MetricsConfig {
    /// Prometheus exporter port; disabled when unset
    pub port: Option<u16>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_CACHE_PATH.to_string(),
            memory: true,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            geocoder_url: DEFAULT_GEOCODER_URL.to_string(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_hours: 24,
            comp_type: None,
            federations: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let explicit = std::env::var("TTF_CONFIG").ok();
        let path = explicit.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);

        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else if explicit.is_some() {
            return Err(ScraperError::Config(format!(
                "Config file '{}' named by TTF_CONFIG does not exist",
                path
            )));
        } else {
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ScraperError::Config(format!("Failed to read config file '{}': {}", path, e))
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Overlay `TTF_*` variables returned by `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = var("TTF_CACHE_PATH") {
            self.cache.path = v;
        }
        if let Some(v) = var("TTF_CACHE_MEMORY") {
            self.cache.memory = parse_bool("TTF_CACHE_MEMORY", &v)?;
        }
        if let Some(v) = var("TTF_BIND") {
            self.server.bind = v;
        }
        if let Some(v) = var("TTF_HTTP_TIMEOUT_SECS") {
            self.http.timeout_secs = parse_number("TTF_HTTP_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = var("TTF_USER_AGENT") {
            self.http.user_agent = v;
        }
        if let Some(v) = var("TTF_GEOCODER_URL") {
            self.http.geocoder_url = v;
        }
        if let Some(v) = var("TTF_SCHEDULER_ENABLED") {
            self.scheduler.enabled = parse_bool("TTF_SCHEDULER_ENABLED", &v)?;
        }
        if let Some(v) = var("TTF_SCHEDULER_INTERVAL_HOURS") {
            self.scheduler.interval_hours = parse_number("TTF_SCHEDULER_INTERVAL_HOURS", &v)?;
        }
        if let Some(v) = var("TTF_SCHEDULER_COMP_TYPE") {
            self.scheduler.comp_type = Some(v);
        }
        if let Some(v) = var("TTF_SCHEDULER_FEDERATIONS") {
            self.scheduler.federations = Some(v);
        }
        if let Some(v) = var("TTF_METRICS_PORT") {
            self.metrics.port = Some(parse_number("TTF_METRICS_PORT", &v)?);
        }

        if self.scheduler.interval_hours == 0 {
            return Err(ScraperError::Config(
                "scheduler interval must be at least one hour".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ScraperError::Config(format!(
            "{} must be a boolean, got '{}'",
            key, other
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ScraperError::Config(format!("{} must be a number, got '{}'", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.cache.path, "./data/cache.db");
        assert!(config.cache.memory);
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.http.timeout_secs, 30);
        assert!(!config.scheduler.enabled);
        assert_eq!(config.scheduler.interval_hours, 24);
        assert_eq!(config.metrics.port, None);
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config: Config = toml::from_str(
            r#"
            [cache]
            path = "/var/lib/ttf/cache.db"

            [scheduler]
            enabled = true
            federations = "BAD,HTV"
            "#,
        )
        .unwrap();
        assert!(config.cache.memory);

        config
            .apply_env(env(&[
                ("TTF_CACHE_MEMORY", "false"),
                ("TTF_SCHEDULER_INTERVAL_HOURS", "6"),
                ("TTF_METRICS_PORT", "9100"),
                ("TTF_BIND", ""),
            ]))
            .unwrap();

        assert_eq!(config.cache.path, "/var/lib/ttf/cache.db");
        assert!(!config.cache.memory);
        assert!(config.scheduler.enabled);
        assert_eq!(config.scheduler.interval_hours, 6);
        assert_eq!(config.scheduler.federations.as_deref(), Some("BAD,HTV"));
        assert_eq!(config.metrics.port, Some(9100));
        assert_eq!(config.server.bind, "0.0.0.0:8080");
    }

    #[test]
    fn rejects_malformed_values() {
        let mut config = Config::default();
        assert!(config.apply_env(env(&[("TTF_CACHE_MEMORY", "maybe")])).is_err());
        assert!(config.apply_env(env(&[("TTF_HTTP_TIMEOUT_SECS", "soon")])).is_err());
        assert!(config.apply_env(env(&[("TTF_SCHEDULER_INTERVAL_HOURS", "0")])).is_err());
    }
}
