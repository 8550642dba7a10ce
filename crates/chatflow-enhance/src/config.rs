//! Engine configuration
//!
//! Loaded from TOML; every field has a default so partial files are valid.
//!
//! ```toml
//! [enhancer]
//! mean_mode = "weighted"
//! parallel_alignment = true
//!
//! [cache]
//! max_capacity = 500
//! ttl_secs = 3600
//! ```

use crate::error::ConfigError;
use crate::performance::MeanMode;
use chatflow_graph::IdentityCache;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatflowConfig {
    /// Enhancement passes
    pub enhancer: EnhancerConfig,
    /// Identity cache
    pub cache: CacheConfig,
}

impl ChatflowConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML
    ///
    /// # Errors
    /// Returns error on invalid TOML or unknown enum values
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Read a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// With enhancer settings
    #[inline]
    #[must_use]
    pub fn with_enhancer(mut self, enhancer: EnhancerConfig) -> Self {
        self.enhancer = enhancer;
        self
    }

    /// With cache settings
    #[inline]
    #[must_use]
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }
}

/// Enhancer settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancerConfig {
    /// Running-mean mode of the performance pass
    pub mean_mode: MeanMode,
    /// Align variants on the rayon pool
    pub parallel_alignment: bool,
    /// Reduce silent routing transitions during synthesis
    pub reduce_invisibles: bool,
}

impl EnhancerConfig {
    /// With mean mode
    #[inline]
    #[must_use]
    pub fn with_mean_mode(mut self, mode: MeanMode) -> Self {
        self.mean_mode = mode;
        self
    }

    /// With parallel alignment
    #[inline]
    #[must_use]
    pub fn with_parallel_alignment(mut self, enabled: bool) -> Self {
        self.parallel_alignment = enabled;
        self
    }

    /// With invisible reduction
    #[inline]
    #[must_use]
    pub fn with_reduce_invisibles(mut self, enabled: bool) -> Self {
        self.reduce_invisibles = enabled;
        self
    }
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        Self {
            mean_mode: MeanMode::Naive,
            parallel_alignment: false,
            reduce_invisibles: true,
        }
    }
}

/// Identity cache settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum cached bot revisions
    pub max_capacity: u64,
    /// Time to live in seconds; `None` keeps entries until evicted
    pub ttl_secs: Option<u64>,
}

impl CacheConfig {
    /// Build the cache described by this config
    #[must_use]
    pub fn build(&self) -> IdentityCache {
        match self.ttl_secs {
            Some(secs) => IdentityCache::with_ttl(self.max_capacity, Duration::from_secs(secs)),
            None => IdentityCache::new(self.max_capacity),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 1_000,
            ttl_secs: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = ChatflowConfig::from_toml_str(
            r#"
            [enhancer]
            mean_mode = "weighted"
            "#,
        )
        .unwrap();
        assert_eq!(config.enhancer.mean_mode, MeanMode::Weighted);
        assert!(config.enhancer.reduce_invisibles);
        assert_eq!(config.cache, CacheConfig::default());
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(ChatflowConfig::from_toml_str("").unwrap(), ChatflowConfig::default());
    }

    #[test]
    fn unknown_mean_mode_is_rejected() {
        let err = ChatflowConfig::from_toml_str("[enhancer]\nmean_mode = \"median\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn builders_and_cache() {
        let config = ChatflowConfig::new()
            .with_enhancer(EnhancerConfig::default().with_parallel_alignment(true))
            .with_cache(CacheConfig {
                max_capacity: 8,
                ttl_secs: Some(60),
            });
        assert!(config.enhancer.parallel_alignment);
        assert_eq!(config.cache.build().stats().entry_count, 0);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = ChatflowConfig::load("/nonexistent/chatflow.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/chatflow.toml"));
    }
}
