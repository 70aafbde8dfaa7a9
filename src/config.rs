//! Configuration for the conflict resolver.
//!
//! Configuration is carried by the [`ShardContext`](crate::shard::ShardContext)
//! and can be constructed programmatically or deserialized from YAML/JSON.
//!
//! # Quick Start
//!
//! ```rust
//! use history_conflict_resolver::config::{ResolverConfig, VisibilityWritingMode};
//!
//! let mut config = ResolverConfig::default();
//! config.settings.visibility.writing_mode = VisibilityWritingMode::Dual;
//! assert_eq!(config.settings.replay.page_size, 1000);
//! ```
//!
//! # Configuration Structure
//!
//! ```text
//! ResolverConfig
//! └── settings: ResolverSettings
//!     ├── replay: ReplayConfig          # History pagination
//!     ├── visibility: VisibilityConfig  # Advanced visibility writing mode
//!     ├── encoding: EncodingConfig      # Event encoding (default + per-domain)
//!     └── slo: SloConfig                # Latency thresholds
//! ```
//!
//! # YAML Example
//!
//! ```yaml
//! settings:
//!   replay:
//!     page_size: 500
//!   visibility:
//!     writing_mode: dual
//!   encoding:
//!     default: thriftrw
//!     domain_overrides:
//!       "payments-domain-id": json
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

// ═══════════════════════════════════════════════════════════════════════════════
// Top-level config
// ═══════════════════════════════════════════════════════════════════════════════

/// The top-level config object carried by a shard.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Settings for replay, snapshot derivation and alerting.
    #[serde(default)]
    pub settings: ResolverSettings,
}

impl ResolverConfig {
    /// Create a config for tests: small pages, dual visibility writing.
    pub fn for_testing() -> Self {
        Self {
            settings: ResolverSettings {
                replay: ReplayConfig { page_size: 10 },
                visibility: VisibilityConfig {
                    writing_mode: VisibilityWritingMode::Dual,
                },
                ..Default::default()
            },
        }
    }
}

/// General settings for the reset path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolverSettings {
    #[serde(default)]
    pub replay: ReplayConfig,
    #[serde(default)]
    pub visibility: VisibilityConfig,
    #[serde(default)]
    pub encoding: EncodingConfig,
    #[serde(default)]
    pub slo: SloConfig,
}

// ═══════════════════════════════════════════════════════════════════════════════
// ReplayConfig: history pagination
// ═══════════════════════════════════════════════════════════════════════════════

/// History replay configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Maximum events requested per history page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page_size() -> usize {
    1000
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self { page_size: 1000 }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// VisibilityConfig: advanced visibility writing
// ═══════════════════════════════════════════════════════════════════════════════

/// How visibility records are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisibilityWritingMode {
    /// Basic visibility only.
    #[default]
    Off,
    /// Advanced visibility only.
    On,
    /// Basic and advanced visibility.
    Dual,
}

impl VisibilityWritingMode {
    /// Whether search-attribute upserts must be emitted.
    pub fn writes_advanced(&self) -> bool {
        matches!(self, Self::On | Self::Dual)
    }
}

/// Advanced visibility configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisibilityConfig {
    /// Shard-wide writing mode, used unless the domain overrides it.
    #[serde(default)]
    pub writing_mode: VisibilityWritingMode,
}

// ═══════════════════════════════════════════════════════════════════════════════
// EncodingConfig: persisted event encoding
// ═══════════════════════════════════════════════════════════════════════════════

/// Encoding used for persisted blobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingType {
    #[default]
    ThriftRW,
    Json,
}

impl std::fmt::Display for EncodingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EncodingType::ThriftRW => write!(f, "thriftrw"),
            EncodingType::Json => write!(f, "json"),
        }
    }
}

/// Event encoding configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EncodingConfig {
    /// Encoding used when neither the domain nor an override names one.
    #[serde(default)]
    pub default: EncodingType,

    /// Per-domain overrides keyed by domain ID.
    #[serde(default)]
    pub domain_overrides: HashMap<String, EncodingType>,
}

impl EncodingConfig {
    /// Encoding configured for a domain ID.
    pub fn for_domain(&self, domain_id: &str) -> EncodingType {
        self.domain_overrides
            .get(domain_id)
            .copied()
            .unwrap_or(self.default)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SloConfig: latency thresholds for alerting
// ═══════════════════════════════════════════════════════════════════════════════

/// SLO thresholds for detecting slow resets.
///
/// Violations are logged at warn level. Nothing is aborted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SloConfig {
    /// Maximum acceptable latency for a single history page read (ms).
    #[serde(default = "default_max_page_read_latency_ms")]
    pub max_page_read_latency_ms: u64,

    /// Maximum acceptable latency for a full replay (ms).
    #[serde(default = "default_max_replay_latency_ms")]
    pub max_replay_latency_ms: u64,

    /// Maximum acceptable latency for the conditional write (ms).
    #[serde(default = "default_max_cas_latency_ms")]
    pub max_cas_latency_ms: u64,
}

fn default_max_page_read_latency_ms() -> u64 {
    200
}

fn default_max_replay_latency_ms() -> u64 {
    2_000
}

fn default_max_cas_latency_ms() -> u64 {
    500
}

impl Default for SloConfig {
    fn default() -> Self {
        Self {
            max_page_read_latency_ms: 200,
            max_replay_latency_ms: 2_000,
            max_cas_latency_ms: 500,
        }
    }
}

impl SloConfig {
    /// Check if a page read latency violates SLO.
    pub fn is_page_read_violation(&self, latency: Duration) -> bool {
        latency.as_millis() as u64 > self.max_page_read_latency_ms
    }

    /// Check if a replay latency violates SLO.
    pub fn is_replay_violation(&self, latency: Duration) -> bool {
        latency.as_millis() as u64 > self.max_replay_latency_ms
    }

    /// Check if a conditional write latency violates SLO.
    pub fn is_cas_violation(&self, latency: Duration) -> bool {
        latency.as_millis() as u64 > self.max_cas_latency_ms
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ResolverConfig::default();
        assert_eq!(config.settings.replay.page_size, 1000);
        assert_eq!(config.settings.visibility.writing_mode, VisibilityWritingMode::Off);
        assert_eq!(config.settings.encoding.default, EncodingType::ThriftRW);
    }

    #[test]
    fn test_for_testing_config() {
        let config = ResolverConfig::for_testing();
        assert_eq!(config.settings.replay.page_size, 10);
        assert!(config.settings.visibility.writing_mode.writes_advanced());
    }

    #[test]
    fn test_writing_mode_writes_advanced() {
        assert!(!VisibilityWritingMode::Off.writes_advanced());
        assert!(VisibilityWritingMode::On.writes_advanced());
        assert!(VisibilityWritingMode::Dual.writes_advanced());
    }

    #[test]
    fn test_encoding_for_domain_override() {
        let mut config = EncodingConfig::default();
        config
            .domain_overrides
            .insert("domain-json".to_string(), EncodingType::Json);

        assert_eq!(config.for_domain("domain-json"), EncodingType::Json);
        assert_eq!(config.for_domain("domain-other"), EncodingType::ThriftRW);
    }

    #[test]
    fn test_slo_page_read_violation() {
        let config = SloConfig::default(); // 200ms threshold

        assert!(!config.is_page_read_violation(Duration::from_millis(100)));
        assert!(!config.is_page_read_violation(Duration::from_millis(200)));
        assert!(config.is_page_read_violation(Duration::from_millis(201)));
    }

    #[test]
    fn test_slo_replay_and_cas_violation() {
        let config = SloConfig::default();

        assert!(!config.is_replay_violation(Duration::from_secs(1)));
        assert!(config.is_replay_violation(Duration::from_secs(3)));
        assert!(!config.is_cas_violation(Duration::from_millis(500)));
        assert!(config.is_cas_violation(Duration::from_millis(501)));
    }

    #[test]
    fn test_config_from_partial_json() {
        let json = r#"{
            "settings": {
                "replay": { "page_size": 250 },
                "visibility": { "writing_mode": "dual" },
                "encoding": { "domain_overrides": { "d1": "json" } }
            }
        }"#;
        let config: ResolverConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.settings.replay.page_size, 250);
        assert_eq!(config.settings.visibility.writing_mode, VisibilityWritingMode::Dual);
        assert_eq!(config.settings.encoding.for_domain("d1"), EncodingType::Json);
        // Untouched sections keep their defaults
        assert_eq!(config.settings.slo.max_cas_latency_ms, 500);
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let config: ResolverConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.settings.replay.page_size, 1000);
        assert_eq!(config.settings.slo.max_replay_latency_ms, 2_000);
    }
}
