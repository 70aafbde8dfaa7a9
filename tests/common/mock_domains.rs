//! Static domain directory and shard helpers.

use history_conflict_resolver::cluster::{
    ClusterMetadata, ClusterTopology, DomainConfig, DomainDirectory, DomainEntry, DomainError,
    DomainFuture,
};
use history_conflict_resolver::config::{ResolverConfig, VisibilityWritingMode};
use history_conflict_resolver::shard::ShardContext;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const DOMAIN_ID: &str = "some random domain ID";
pub const DOMAIN_NAME: &str = "some random domain name";
pub const SHARD_ID: i32 = 10;
pub const RANGE_ID: i64 = 1;

/// Domain directory backed by a fixed map.
pub struct StaticDomains {
    domains: HashMap<String, DomainEntry>,
    lookups: AtomicUsize,
}

impl StaticDomains {
    pub fn new(entries: Vec<DomainEntry>) -> Self {
        Self {
            domains: entries.into_iter().map(|e| (e.id.clone(), e)).collect(),
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl DomainDirectory for StaticDomains {
    fn get_domain_by_id(&self, domain_id: &str) -> DomainFuture<'_, DomainEntry> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let found = self
            .domains
            .get(domain_id)
            .cloned()
            .ok_or_else(|| DomainError::NotFound(domain_id.to_string()));
        Box::pin(async move { found })
    }
}

/// Global domain with dual visibility writing.
pub fn dual_visibility_domain() -> DomainEntry {
    DomainEntry {
        id: DOMAIN_ID.to_string(),
        name: DOMAIN_NAME.to_string(),
        is_global: true,
        config: DomainConfig {
            retention_days: 1,
            visibility_writing_mode: Some(VisibilityWritingMode::Dual),
            event_encoding: None,
        },
    }
}

/// Two regions: `active` owns versions ≡ 2 (mod 10), `standby` ≡ 1.
pub fn two_region_cluster() -> ClusterTopology {
    ClusterTopology::single("active")
        .with_region("active", 2)
        .with_region("standby", 1)
}

pub fn shard_with(
    config: ResolverConfig,
    cluster: impl ClusterMetadata,
    domains: Vec<DomainEntry>,
) -> ShardContext {
    ShardContext::new(
        SHARD_ID,
        RANGE_ID,
        Arc::new(config),
        Arc::new(cluster),
        Arc::new(StaticDomains::new(domains)),
    )
}

/// Shard with test config, two regions and the dual-visibility domain.
pub fn test_shard() -> ShardContext {
    shard_with(
        ResolverConfig::for_testing(),
        two_region_cluster(),
        vec![dual_visibility_domain()],
    )
}
