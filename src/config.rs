//! Runtime configuration.
//!
//! Configuration is read from a JSON file (every field optional) and then
//! overridden by `PEGASUS_*` environment variables.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PegasusError, Result};
use crate::types::Modality;
use crate::vector::ZeroNormPolicy;

/// Settings for the embedding dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Embed batch items concurrently.
    pub parallel: bool,

    /// Worker threads used when `parallel` is set.
    pub workers: usize,

    /// Memoize embeddings by (modality, input).
    pub cache_enabled: bool,

    /// Maximum cached embeddings. New entries are skipped once full.
    pub cache_capacity: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            parallel: false,
            workers: num_cpus::get(),
            cache_enabled: false,
            cache_capacity: 10_000,
        }
    }
}

/// Results per query row when neither the request nor the config says.
pub const DEFAULT_N_RESULTS: usize = 10;

/// Settings for retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Modalities this deployment serves. Cross-modal targets are resolved
    /// against this set.
    pub modalities: Vec<Modality>,

    pub zero_norm_policy: ZeroNormPolicy,

    /// Results per query row when a request does not set `n_results`.
    /// `null` returns every candidate.
    pub default_top_k: Option<usize>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            modalities: vec![Modality::Text, Modality::Vision],
            zero_norm_policy: ZeroNormPolicy::default(),
            default_top_k: Some(DEFAULT_N_RESULTS),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PegasusConfig {
    pub embedding: EmbeddingConfig,
    pub search: SearchConfig,
}

impl PegasusConfig {
    /// Load a JSON config file, apply environment overrides and validate.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON config file without applying overrides.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content).map_err(|e| {
            PegasusError::invalid_config(format!("{}: {e}", path.display()))
        })?;
        log::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply `PEGASUS_*` overrides read through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("PEGASUS_PARALLEL") {
            self.embedding.parallel = parse_bool("PEGASUS_PARALLEL", &value)?;
        }
        if let Some(value) = lookup("PEGASUS_WORKERS") {
            self.embedding.workers = parse_number("PEGASUS_WORKERS", &value)?;
        }
        if let Some(value) = lookup("PEGASUS_CACHE_ENABLED") {
            self.embedding.cache_enabled = parse_bool("PEGASUS_CACHE_ENABLED", &value)?;
        }
        if let Some(value) = lookup("PEGASUS_CACHE_CAPACITY") {
            self.embedding.cache_capacity = parse_number("PEGASUS_CACHE_CAPACITY", &value)?;
        }
        if let Some(value) = lookup("PEGASUS_MODALITIES") {
            self.search.modalities = value
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(str::parse)
                .collect::<Result<Vec<Modality>>>()
                .map_err(|e| PegasusError::invalid_config(format!("PEGASUS_MODALITIES: {e}")))?;
        }
        if let Some(value) = lookup("PEGASUS_ZERO_NORM_POLICY") {
            self.search.zero_norm_policy = value.parse().map_err(|e| {
                PegasusError::invalid_config(format!("PEGASUS_ZERO_NORM_POLICY: {e}"))
            })?;
        }
        if let Some(value) = lookup("PEGASUS_TOP_K") {
            self.search.default_top_k = Some(parse_number("PEGASUS_TOP_K", &value)?);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.embedding.workers == 0 {
            return Err(PegasusError::invalid_config(
                "embedding.workers must be at least 1",
            ));
        }
        if self.search.modalities.is_empty() {
            return Err(PegasusError::invalid_config(
                "search.modalities must name at least one modality",
            ));
        }

        let mut seen = self.search.modalities.clone();
        seen.sort();
        if let Some(pair) = seen.windows(2).find(|w| w[0] == w[1]) {
            return Err(PegasusError::invalid_config(format!(
                "search.modalities lists {} more than once",
                pair[0]
            )));
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(PegasusError::invalid_config(format!(
            "{key}: expected a boolean, got {other:?}"
        ))),
    }
}

fn parse_number(key: &str, value: &str) -> Result<usize> {
    value.trim().parse().map_err(|_| {
        PegasusError::invalid_config(format!("{key}: expected a non-negative integer, got {value:?}"))
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = PegasusConfig::default();
        assert!(!config.embedding.parallel);
        assert!(config.embedding.workers >= 1);
        assert_eq!(
            config.search.modalities,
            vec![Modality::Text, Modality::Vision]
        );
        assert_eq!(config.search.zero_norm_policy, ZeroNormPolicy::ScoreZero);
        assert_eq!(config.search.default_top_k, Some(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"search": {{"modalities": ["vision", "audio"], "zero_norm_policy": "reject"}}}}"#
        )
        .unwrap();

        let config = PegasusConfig::from_file(file.path()).unwrap();
        assert_eq!(
            config.search.modalities,
            vec![Modality::Vision, Modality::Audio]
        );
        assert_eq!(config.search.zero_norm_policy, ZeroNormPolicy::Reject);
        assert_eq!(config.embedding, EmbeddingConfig::default());
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        let err = PegasusConfig::from_file(file.path()).unwrap_err();
        assert_eq!(err.kind(), "Config");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = PegasusConfig::default();
        config
            .apply_env_overrides(env(&[
                ("PEGASUS_PARALLEL", "true"),
                ("PEGASUS_WORKERS", "3"),
                ("PEGASUS_CACHE_ENABLED", "1"),
                ("PEGASUS_CACHE_CAPACITY", "42"),
                ("PEGASUS_MODALITIES", "text, audio"),
                ("PEGASUS_ZERO_NORM_POLICY", "reject"),
                ("PEGASUS_TOP_K", "5"),
            ]))
            .unwrap();

        assert!(config.embedding.parallel);
        assert_eq!(config.embedding.workers, 3);
        assert!(config.embedding.cache_enabled);
        assert_eq!(config.embedding.cache_capacity, 42);
        assert_eq!(
            config.search.modalities,
            vec![Modality::Text, Modality::Audio]
        );
        assert_eq!(config.search.zero_norm_policy, ZeroNormPolicy::Reject);
        assert_eq!(config.search.default_top_k, Some(5));
    }

    #[test]
    fn test_bad_env_values() {
        for (key, value) in [
            ("PEGASUS_PARALLEL", "maybe"),
            ("PEGASUS_WORKERS", "-1"),
            ("PEGASUS_MODALITIES", "text,smell"),
            ("PEGASUS_ZERO_NORM_POLICY", "ignore"),
        ] {
            let mut config = PegasusConfig::default();
            let err = config.apply_env_overrides(env(&[(key, value)])).unwrap_err();
            assert_eq!(err.kind(), "Config", "{key}={value}");
        }
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = PegasusConfig::default();
        config.embedding.workers = 0;
        assert_eq!(config.validate().unwrap_err().kind(), "Config");

        let mut config = PegasusConfig::default();
        config.search.modalities.clear();
        assert_eq!(config.validate().unwrap_err().kind(), "Config");

        let mut config = PegasusConfig::default();
        config.search.modalities = vec![Modality::Text, Modality::Vision, Modality::Text];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("text"));
    }
}
