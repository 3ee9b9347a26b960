use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_SETUP_CONFIG_PATH: &str = "/etc/incident-timeline/config.json";

pub(crate) fn setup_config_path() -> PathBuf {
    if let Ok(path) = std::env::var("TIMELINE_SETUP_CONFIG_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    PathBuf::from(DEFAULT_SETUP_CONFIG_PATH)
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SetupConfigOverrides {
    #[serde(default)]
    database_url: Option<String>,
    #[serde(default)]
    db_max_connections: Option<u32>,
    #[serde(default)]
    db_acquire_timeout_seconds: Option<u64>,
    #[serde(default)]
    comparison_cache_enabled: Option<bool>,
    #[serde(default)]
    comparison_cache_ttl_seconds: Option<u64>,
    #[serde(default)]
    comparison_cache_capacity: Option<usize>,
    #[serde(default)]
    max_events_per_comparison: Option<usize>,
    #[serde(default)]
    max_chunks_per_series: Option<usize>,
}

fn load_setup_config_overrides() -> Option<SetupConfigOverrides> {
    let path = setup_config_path();
    if !path.exists() {
        return None;
    }
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "failed to read setup config; using env defaults"
            );
            return None;
        }
    };
    match serde_json::from_str(&contents) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "failed to parse setup config; using env defaults"
            );
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout_seconds: u64,
    pub comparison_cache_enabled: bool,
    pub comparison_cache_ttl_seconds: u64,
    pub comparison_cache_capacity: usize,
    pub max_events_per_comparison: usize,
    pub max_chunks_per_series: usize,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        let overrides = load_setup_config_overrides().unwrap_or_default();
        Self::resolve(&overrides)
    }

    /// Env wins over the setup file; the setup file wins over defaults.
    fn resolve(overrides: &SetupConfigOverrides) -> Result<Self> {
        let database_url = env_optional_string("TIMELINE_DATABASE_URL")
            .or_else(|| {
                overrides
                    .database_url
                    .as_deref()
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
                    .map(|value| value.to_string())
            })
            .context("TIMELINE_DATABASE_URL must be set (or present as database_url in the setup config)")?;
        let database_url = normalize_database_url(database_url);

        let db_max_connections = env_u64("TIMELINE_DB_MAX_CONNECTIONS")
            .map(|value| value as u32)
            .or(overrides.db_max_connections)
            .unwrap_or(10)
            .clamp(1, 64);
        let db_acquire_timeout_seconds = env_u64("TIMELINE_DB_ACQUIRE_TIMEOUT_SECONDS")
            .or(overrides.db_acquire_timeout_seconds)
            .unwrap_or(8)
            .clamp(1, 120);
        let comparison_cache_enabled = env_bool("TIMELINE_COMPARISON_CACHE_ENABLED")
            .or(overrides.comparison_cache_enabled)
            .unwrap_or(false);
        let comparison_cache_ttl_seconds = env_u64("TIMELINE_COMPARISON_CACHE_TTL_SECONDS")
            .or(overrides.comparison_cache_ttl_seconds)
            .unwrap_or(60)
            .clamp(1, 3600);
        let comparison_cache_capacity = env_u64("TIMELINE_COMPARISON_CACHE_CAPACITY")
            .map(|value| value as usize)
            .or(overrides.comparison_cache_capacity)
            .unwrap_or(128)
            .clamp(1, 10_000);
        let max_events_per_comparison = env_u64("TIMELINE_MAX_EVENTS_PER_COMPARISON")
            .map(|value| value as usize)
            .or(overrides.max_events_per_comparison)
            .unwrap_or(50)
            .clamp(2, 500);
        let max_chunks_per_series = env_u64("TIMELINE_MAX_CHUNKS_PER_SERIES")
            .map(|value| value as usize)
            .or(overrides.max_chunks_per_series)
            .unwrap_or(10_000)
            .max(1);
        let rate_limit_per_second = env_u64("TIMELINE_RATE_LIMIT_PER_SECOND")
            .unwrap_or(20)
            .max(1);
        let rate_limit_burst = env_u64("TIMELINE_RATE_LIMIT_BURST")
            .map(|value| value.min(u32::MAX as u64) as u32)
            .unwrap_or(60)
            .max(1);

        Ok(Self {
            database_url,
            db_max_connections,
            db_acquire_timeout_seconds,
            comparison_cache_enabled,
            comparison_cache_ttl_seconds,
            comparison_cache_capacity,
            max_events_per_comparison,
            max_chunks_per_series,
            rate_limit_per_second,
            rate_limit_burst,
        })
    }

    pub fn comparison_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.comparison_cache_ttl_seconds)
    }
}

fn env_optional_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_bool(key: &str) -> Option<bool> {
    match env_optional_string(key)?.to_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

fn env_u64(key: &str) -> Option<u64> {
    env_optional_string(key).and_then(|value| value.parse::<u64>().ok())
}

fn normalize_database_url(url: String) -> String {
    if let Some(stripped) = url.strip_prefix("postgresql+psycopg://") {
        return format!("postgresql://{stripped}");
    }
    if let Some(stripped) = url.strip_prefix("postgresql+asyncpg://") {
        return format!("postgresql://{stripped}");
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_driver_prefixed_urls() {
        assert_eq!(
            normalize_database_url("postgresql+asyncpg://u@h/db".to_string()),
            "postgresql://u@h/db"
        );
        assert_eq!(
            normalize_database_url("postgresql+psycopg://u@h/db".to_string()),
            "postgresql://u@h/db"
        );
        assert_eq!(
            normalize_database_url("postgres://u@h/db".to_string()),
            "postgres://u@h/db"
        );
    }

    #[test]
    fn setup_file_values_are_clamped() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "database_url": "postgresql+psycopg://timeline@db/incidents",
                "db_max_connections": 500,
                "comparison_cache_enabled": true,
                "comparison_cache_ttl_seconds": 0,
                "max_events_per_comparison": 1
            }"#,
        )?;
        let overrides: SetupConfigOverrides =
            serde_json::from_str(&std::fs::read_to_string(&path)?)?;

        let config = ServerConfig::resolve(&overrides)?;
        if std::env::var("TIMELINE_DATABASE_URL").is_err() {
            assert_eq!(config.database_url, "postgresql://timeline@db/incidents");
        }
        if std::env::var("TIMELINE_DB_MAX_CONNECTIONS").is_err() {
            assert_eq!(config.db_max_connections, 64);
        }
        if std::env::var("TIMELINE_COMPARISON_CACHE_TTL_SECONDS").is_err() {
            assert_eq!(config.comparison_cache_ttl(), Duration::from_secs(1));
        }
        if std::env::var("TIMELINE_MAX_EVENTS_PER_COMPARISON").is_err() {
            assert_eq!(config.max_events_per_comparison, 2);
        }
        Ok(())
    }

    #[test]
    fn missing_database_url_is_an_error() {
        if std::env::var("TIMELINE_DATABASE_URL").is_ok() {
            return;
        }
        let err = ServerConfig::resolve(&SetupConfigOverrides::default()).unwrap_err();
        assert!(err.to_string().contains("TIMELINE_DATABASE_URL"));
    }
}
