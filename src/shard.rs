//! Shard context.
//!
//! Every component call receives the owning shard by reference. The shard
//! carries the fencing token (range ID), the resolver configuration and the
//! shard-scoped collaborators. Nothing is looked up globally.
//!
//! Once a conditional write is rejected for a stale range ID the shard is
//! marked as lost; later calls through the same context fail fast with
//! [`ResetError::ShardOwnershipLost`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::error;

use crate::cluster::{ClusterMetadata, DomainDirectory};
use crate::config::ResolverConfig;
use crate::error::{ResetError, Result};

/// Explicit context for one owned shard.
pub struct ShardContext {
    shard_id: i32,
    range_id: i64,
    config: Arc<ResolverConfig>,
    cluster: Arc<dyn ClusterMetadata>,
    domains: Arc<dyn DomainDirectory>,
    ownership_lost: AtomicBool,
}

impl ShardContext {
    pub fn new(
        shard_id: i32,
        range_id: i64,
        config: Arc<ResolverConfig>,
        cluster: Arc<dyn ClusterMetadata>,
        domains: Arc<dyn DomainDirectory>,
    ) -> Self {
        Self {
            shard_id,
            range_id,
            config,
            cluster,
            domains,
            ownership_lost: AtomicBool::new(false),
        }
    }

    pub fn shard_id(&self) -> i32 {
        self.shard_id
    }

    /// Fencing token included in every conditional write.
    pub fn range_id(&self) -> i64 {
        self.range_id
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn cluster(&self) -> &dyn ClusterMetadata {
        self.cluster.as_ref()
    }

    pub fn domains(&self) -> &dyn DomainDirectory {
        self.domains.as_ref()
    }

    pub fn is_owned(&self) -> bool {
        !self.ownership_lost.load(Ordering::Acquire)
    }

    /// Fail fast if this shard already lost ownership.
    pub fn ensure_owned(&self) -> Result<()> {
        if self.is_owned() {
            Ok(())
        } else {
            Err(ResetError::ShardOwnershipLost {
                shard_id: self.shard_id,
                range_id: self.range_id,
                message: "shard was already marked as lost".to_string(),
            })
        }
    }

    /// Record that the persistence layer rejected our fencing token.
    pub fn mark_ownership_lost(&self) {
        if !self.ownership_lost.swap(true, Ordering::AcqRel) {
            error!(
                shard_id = self.shard_id,
                range_id = self.range_id,
                "Shard ownership lost, refusing further writes"
            );
            crate::metrics::record_shard_ownership_lost(self.shard_id);
        }
    }
}

impl std::fmt::Debug for ShardContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardContext")
            .field("shard_id", &self.shard_id)
            .field("range_id", &self.range_id)
            .field("owned", &self.is_owned())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{ClusterTopology, DomainEntry, DomainError, DomainFuture};

    struct NoDomains;

    impl DomainDirectory for NoDomains {
        fn get_domain_by_id(&self, domain_id: &str) -> DomainFuture<'_, DomainEntry> {
            let id = domain_id.to_string();
            Box::pin(async move { Err(DomainError::NotFound(id)) })
        }
    }

    fn shard() -> ShardContext {
        ShardContext::new(
            10,
            1,
            Arc::new(ResolverConfig::default()),
            Arc::new(ClusterTopology::single("east")),
            Arc::new(NoDomains),
        )
    }

    #[test]
    fn test_new_shard_is_owned() {
        let shard = shard();
        assert!(shard.is_owned());
        assert!(shard.ensure_owned().is_ok());
        assert_eq!(shard.shard_id(), 10);
        assert_eq!(shard.range_id(), 1);
    }

    #[test]
    fn test_mark_ownership_lost() {
        let shard = shard();
        shard.mark_ownership_lost();
        // Idempotent
        shard.mark_ownership_lost();

        assert!(!shard.is_owned());
        let err = shard.ensure_owned().unwrap_err();
        assert!(matches!(err, ResetError::ShardOwnershipLost { shard_id: 10, .. }));
    }

    #[test]
    fn test_debug_hides_collaborators() {
        let debug = format!("{:?}", shard());
        assert!(debug.contains("shard_id: 10"));
        assert!(debug.contains("owned: true"));
    }
}
