//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::pipeline::DEFAULT_SOURCE_TIMEOUT;
use crate::pipeline::fetch::{DEFAULT_ENDPOINT, DEFAULT_PAGE_SIZE};
use crate::sentiment::{BackendKind, ModelSource};

/// Environment variable names.
pub mod keys {
    pub const SOURCE: &str = "BRAND_MONITOR_SOURCE";
    pub const BACKEND: &str = "BRAND_MONITOR_BACKEND";
    pub const MODEL: &str = "BRAND_MONITOR_MODEL";
    pub const MODEL_ENDPOINT: &str = "BRAND_MONITOR_MODEL_ENDPOINT";
    pub const ENDPOINT: &str = "BRAND_MONITOR_ENDPOINT";
    pub const PAGE_SIZE: &str = "BRAND_MONITOR_PAGE_SIZE";
    pub const TIMEOUT_SECS: &str = "BRAND_MONITOR_TIMEOUT_SECS";
}

/// Monitor configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    /// Review snapshot read by `report` and written by `fetch`.
    pub source_path: PathBuf,
    /// Sentiment backend.
    pub backend: BackendKind,
    /// Hub repository or local directory of the pretrained classifier.
    pub model: ModelSource,
    /// GraphQL endpoint for `fetch`.
    pub endpoint: String,
    /// Reviews requested per fetch.
    pub page_size: u32,
    /// Caller-supplied bound on loading any source.
    pub source_timeout: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            source_path: PathBuf::from("reviews.json"),
            backend: BackendKind::default(),
            model: ModelSource::default(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            source_timeout: DEFAULT_SOURCE_TIMEOUT,
        }
    }
}

impl MonitorConfig {
    /// Build from process environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = get(keys::SOURCE) {
            config.source_path = PathBuf::from(path);
        }

        if let Some(backend) = get(keys::BACKEND) {
            config.backend = backend.parse().map_err(|message| ConfigError::InvalidValue {
                key: keys::BACKEND.to_string(),
                message,
            })?;
        }

        if let Some(model) = get(keys::MODEL) {
            config.model = ModelSource::parse(&model);
        }

        if let Some(url) = get(keys::MODEL_ENDPOINT) {
            config.model = config.model.with_endpoint(url);
        }

        if let Some(endpoint) = get(keys::ENDPOINT) {
            config.endpoint = endpoint;
        }

        if let Some(page_size) = get(keys::PAGE_SIZE) {
            config.page_size = parse_positive(keys::PAGE_SIZE, &page_size)?;
        }

        if let Some(secs) = get(keys::TIMEOUT_SECS) {
            config.source_timeout =
                Duration::from_secs(parse_positive(keys::TIMEOUT_SECS, &secs)?.into());
        }

        Ok(config)
    }
}

fn parse_positive(key: &str, value: &str) -> Result<u32, ConfigError> {
    match value.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        Ok(_) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "must be greater than zero".to_string(),
        }),
        Err(e) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{value}' is not a number: {e}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = MonitorConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, MonitorConfig::default());
        assert_eq!(config.backend, BackendKind::Lexical);
        assert_eq!(config.source_timeout, Duration::from_secs(30));
    }

    #[test]
    fn reads_every_key() {
        let config = MonitorConfig::from_lookup(lookup(&[
            (keys::SOURCE, "data/reviews.json"),
            (keys::BACKEND, "pretrained"),
            (keys::MODEL, "acme/review-sentiment@v2"),
            (keys::MODEL_ENDPOINT, "http://hub.internal"),
            (keys::ENDPOINT, "http://localhost:4000/graphql"),
            (keys::PAGE_SIZE, "50"),
            (keys::TIMEOUT_SECS, "5"),
        ]))
        .unwrap();

        assert_eq!(config.source_path, PathBuf::from("data/reviews.json"));
        assert_eq!(config.backend, BackendKind::Pretrained);
        assert_eq!(
            config.model,
            ModelSource::Hub {
                repo: "acme/review-sentiment".into(),
                revision: "v2".into(),
                endpoint: Some("http://hub.internal".into()),
            }
        );
        assert_eq!(config.endpoint, "http://localhost:4000/graphql");
        assert_eq!(config.page_size, 50);
        assert_eq!(config.source_timeout, Duration::from_secs(5));
    }

    #[test]
    fn model_directory_is_local() {
        let config =
            MonitorConfig::from_lookup(lookup(&[(keys::MODEL, "./models/sst2")])).unwrap();
        assert_eq!(config.model, ModelSource::Local(PathBuf::from("./models/sst2")));
    }

    #[test]
    fn blank_values_fall_back() {
        let config = MonitorConfig::from_lookup(lookup(&[(keys::BACKEND, "  ")])).unwrap();
        assert_eq!(config.backend, BackendKind::Lexical);
    }

    #[test]
    fn invalid_backend_names_key() {
        let err = MonitorConfig::from_lookup(lookup(&[(keys::BACKEND, "vader")])).unwrap_err();
        let ConfigError::InvalidValue { key, .. } = err;
        assert_eq!(key, keys::BACKEND);
    }

    #[test]
    fn invalid_numbers_rejected() {
        assert!(MonitorConfig::from_lookup(lookup(&[(keys::PAGE_SIZE, "many")])).is_err());
        assert!(MonitorConfig::from_lookup(lookup(&[(keys::TIMEOUT_SECS, "0")])).is_err());
    }
}
