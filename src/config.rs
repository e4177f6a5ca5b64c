use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::services::analysis::ClassificationPolicy;

fn default_max_file_size() -> usize {
    // 10 MB in bytes
    10 * 1024 * 1024
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub max_file_size: usize,
    /// Sampling depth for per-column classification requests.
    pub classify_sample_size: usize,
    /// Sampling depth for the whole-dataset dashboard rollup.
    pub rollup_sample_size: usize,
    pub numeric_threshold: f64,
    /// `None` keeps the session store in memory.
    pub session_db_path: Option<PathBuf>,
    pub recent_analyses_limit: usize,
    pub metrics_cache_capacity: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            max_file_size: default_max_file_size(),
            classify_sample_size: ClassificationPolicy::STANDALONE_SAMPLE_SIZE,
            rollup_sample_size: ClassificationPolicy::ROLLUP_SAMPLE_SIZE,
            numeric_threshold: ClassificationPolicy::DEFAULT_THRESHOLD,
            session_db_path: None,
            recent_analyses_limit: 10,
            metrics_cache_capacity: 64,
        }
    }
}

impl Config {
    pub fn new() -> Result<Self> {
        // Load .env file first
        dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup, falling back to defaults
    /// for absent keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let config = Config {
            bind_addr: parse_var(&lookup, "BIND_ADDR")?.unwrap_or(defaults.bind_addr),
            max_file_size: parse_var(&lookup, "MAX_FILE_SIZE")?.unwrap_or(defaults.max_file_size),
            classify_sample_size: parse_var(&lookup, "CLASSIFY_SAMPLE_SIZE")?
                .unwrap_or(defaults.classify_sample_size),
            rollup_sample_size: parse_var(&lookup, "ROLLUP_SAMPLE_SIZE")?
                .unwrap_or(defaults.rollup_sample_size),
            numeric_threshold: parse_var(&lookup, "NUMERIC_THRESHOLD")?
                .unwrap_or(defaults.numeric_threshold),
            session_db_path: lookup("SESSION_DB_PATH")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            recent_analyses_limit: parse_var(&lookup, "RECENT_ANALYSES_LIMIT")?
                .unwrap_or(defaults.recent_analyses_limit),
            metrics_cache_capacity: parse_var(&lookup, "METRICS_CACHE_CAPACITY")?
                .unwrap_or(defaults.metrics_cache_capacity),
        };

        if !(0.0..1.0).contains(&config.numeric_threshold) {
            anyhow::bail!(
                "NUMERIC_THRESHOLD must be in [0, 1), got {}",
                config.numeric_threshold
            );
        }
        if config.classify_sample_size == 0 || config.rollup_sample_size == 0 {
            anyhow::bail!("classification sample sizes must be positive");
        }

        Ok(config)
    }

    pub fn standalone_policy(&self) -> ClassificationPolicy {
        ClassificationPolicy::new(self.classify_sample_size, self.numeric_threshold)
    }

    pub fn rollup_policy(&self) -> ClassificationPolicy {
        ClassificationPolicy::new(self.rollup_sample_size, self.numeric_threshold)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("Failed to parse {}={:?}", key, raw)),
        _ => Ok(None),
    }
}

pub fn load_config() -> Result<Config> {
    let config = Config::new()?;
    tracing::info!(
        "Loaded configuration: bind={}, max_file_size={}B, sampling={}/{} rows, threshold={}",
        config.bind_addr,
        config.max_file_size,
        config.classify_sample_size,
        config.rollup_sample_size,
        config.numeric_threshold
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.max_file_size, 10 * 1024 * 1024);
        assert_eq!(config.classify_sample_size, 20);
        assert_eq!(config.rollup_sample_size, 10);
        assert_eq!(config.recent_analyses_limit, 10);
        assert!(config.session_db_path.is_none());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = Config::from_lookup(lookup_from(&[
            ("BIND_ADDR", "0.0.0.0:8080"),
            ("MAX_FILE_SIZE", "1024"),
            ("ROLLUP_SAMPLE_SIZE", "20"),
            ("SESSION_DB_PATH", "/tmp/session.db"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.max_file_size, 1024);
        assert_eq!(config.rollup_policy().sample_size(), 20);
        assert_eq!(config.session_db_path, Some(PathBuf::from("/tmp/session.db")));
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(Config::from_lookup(lookup_from(&[("MAX_FILE_SIZE", "lots")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("NUMERIC_THRESHOLD", "1.5")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("CLASSIFY_SAMPLE_SIZE", "0")])).is_err());
    }
}
