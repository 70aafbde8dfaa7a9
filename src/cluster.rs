//! Cluster metadata and domain directory seams.
//!
//! [`ClusterMetadata`] maps failover versions to the region that produced
//! them. [`DomainDirectory`] resolves a domain ID to its configuration.
//!
//! [`ClusterTopology`] is the configuration-driven `ClusterMetadata`: every
//! region owns one initial failover version, and a version belongs to the
//! region whose initial version equals `version % failover_version_increment`.
//!
//! ```text
//! increment = 10, regions = { east: 1, west: 2 }
//!
//!   version 1, 11, 21, ...  → east
//!   version 2, 12, 22, ...  → west
//!   version 3               → unknown
//! ```

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{EncodingType, VisibilityWritingMode};

/// Version → region lookups against cluster metadata.
pub trait ClusterMetadata: Send + Sync + 'static {
    /// Region that produced `version`, or `None` if no region claims it.
    fn region_for_version(&self, version: i64) -> Option<String>;

    /// Whether more than one region can write.
    fn is_multi_region_enabled(&self) -> bool;

    /// The region this process runs in.
    fn current_region(&self) -> String;
}

/// Static cluster topology, usually loaded from config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterTopology {
    pub current_region: String,

    /// Whether global (multi-region) domains are enabled.
    #[serde(default)]
    pub multi_region_enabled: bool,

    /// Versions of one region are congruent modulo this value.
    pub failover_version_increment: i64,

    /// Region name → initial failover version.
    pub regions: BTreeMap<String, i64>,
}

impl ClusterTopology {
    /// Single-region topology.
    pub fn single(region: &str) -> Self {
        Self {
            current_region: region.to_string(),
            multi_region_enabled: false,
            failover_version_increment: 10,
            regions: BTreeMap::from([(region.to_string(), 0)]),
        }
    }

    /// Add a region with its initial failover version.
    pub fn with_region(mut self, region: &str, initial_failover_version: i64) -> Self {
        self.regions
            .insert(region.to_string(), initial_failover_version);
        self.multi_region_enabled = self.regions.len() > 1;
        self
    }
}

impl ClusterMetadata for ClusterTopology {
    fn region_for_version(&self, version: i64) -> Option<String> {
        if version < 0 || self.failover_version_increment <= 0 {
            return None;
        }
        let initial = version % self.failover_version_increment;
        self.regions
            .iter()
            .find(|(_, v)| **v == initial)
            .map(|(name, _)| name.clone())
    }

    fn is_multi_region_enabled(&self) -> bool {
        self.multi_region_enabled
    }

    fn current_region(&self) -> String {
        self.current_region.clone()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Domain directory
// ═══════════════════════════════════════════════════════════════════════════════

/// Boxed future returned by [`DomainDirectory`].
pub type DomainFuture<'a, T> =
    Pin<Box<dyn Future<Output = std::result::Result<T, DomainError>> + Send + 'a>>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("domain not found: {0}")]
    NotFound(String),

    #[error("domain directory unavailable: {0}")]
    Unavailable(String),
}

/// Per-domain configuration relevant to a reset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainConfig {
    #[serde(default)]
    pub retention_days: i32,

    /// Overrides the shard-wide visibility writing mode.
    #[serde(default)]
    pub visibility_writing_mode: Option<VisibilityWritingMode>,

    /// Overrides the configured event encoding.
    #[serde(default)]
    pub event_encoding: Option<EncodingType>,
}

/// A resolved domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainEntry {
    pub id: String,
    pub name: String,
    pub is_global: bool,
    #[serde(default)]
    pub config: DomainConfig,
}

impl DomainEntry {
    /// A local (single-region) domain with default configuration.
    pub fn local(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            is_global: false,
            config: DomainConfig::default(),
        }
    }
}

/// Domain ID → configuration lookups.
pub trait DomainDirectory: Send + Sync + 'static {
    fn get_domain_by_id(&self, domain_id: &str) -> DomainFuture<'_, DomainEntry>;
}
