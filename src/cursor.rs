// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Replication cursors.
//!
//! Tracks, per region, the last (version, event ID) pair observed while
//! replaying a run. The replayer records contiguous runs of events that share
//! a version ([`VersionSegments`]); the resolver maps each distinct version to
//! its region once and folds the segments into the run's
//! [`ReplicationState`].
//!
//! ## Cursor Semantics
//!
//! A region's cursor is the **last** event that region contributed. Cursors
//! never regress: an update with an event ID not greater than the stored one
//! is ignored.
//!
//! ```text
//! events:   1  2  3 | 4  5 | 6
//! version: 11 11 11 |12 12 |21
//! region:     east  | west | east
//!
//! cursors:  east → (21, 6)   west → (12, 5)
//! ```

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::cluster::ClusterMetadata;
use crate::error::{ResetError, Result};
use crate::state::{ReplicationInfo, ReplicationState, EMPTY_VERSION};

/// Contiguous run of events written under one version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionSegment {
    pub version: i64,
    pub first_event_id: i64,
    pub last_event_id: i64,
}

/// Version segments observed during a replay, in event order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionSegments {
    segments: Vec<VersionSegment>,
}

impl VersionSegments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one folded event.
    pub fn observe(&mut self, version: i64, event_id: i64) {
        match self.segments.last_mut() {
            Some(last) if last.version == version => last.last_event_id = event_id,
            _ => self.segments.push(VersionSegment {
                version,
                first_event_id: event_id,
                last_event_id: event_id,
            }),
        }
    }

    pub fn as_slice(&self) -> &[VersionSegment] {
        &self.segments
    }

    pub fn first(&self) -> Option<&VersionSegment> {
        self.segments.first()
    }

    pub fn last(&self) -> Option<&VersionSegment> {
        self.segments.last()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Update a region's cursor. Returns `true` if the cursor moved.
pub fn advance_cursor(
    cursors: &mut BTreeMap<String, ReplicationInfo>,
    region: &str,
    version: i64,
    last_event_id: i64,
) -> bool {
    match cursors.get_mut(region) {
        Some(existing) if existing.last_event_id >= last_event_id => false,
        Some(existing) => {
            existing.version = version;
            existing.last_event_id = last_event_id;
            true
        }
        None => {
            cursors.insert(
                region.to_string(),
                ReplicationInfo {
                    version,
                    last_event_id,
                },
            );
            true
        }
    }
}

/// Resolves versions to regions and folds segments into replication state.
pub struct ReplicationCursorResolver<'a> {
    cluster: &'a dyn ClusterMetadata,
    /// version → region, filled lazily so each version is resolved once.
    resolved: BTreeMap<i64, String>,
}

impl<'a> ReplicationCursorResolver<'a> {
    pub fn new(cluster: &'a dyn ClusterMetadata) -> Self {
        Self {
            cluster,
            resolved: BTreeMap::new(),
        }
    }

    /// Region that produced `version`.
    pub fn resolve_region(&mut self, version: i64) -> Result<String> {
        if let Some(region) = self.resolved.get(&version) {
            return Ok(region.clone());
        }
        let region = self
            .cluster
            .region_for_version(version)
            .ok_or(ResetError::UnknownVersion { version })?;
        trace!(version, region = %region, "Resolved version to region");
        self.resolved.insert(version, region.clone());
        Ok(region)
    }

    /// Number of distinct versions resolved so far.
    pub fn resolved_count(&self) -> usize {
        self.resolved.len()
    }

    /// Fold observed segments into `state`.
    ///
    /// The last segment sets the current and last-write version bookkeeping.
    /// Per-region cursors are only kept when the cluster runs multiple
    /// regions; events written without a version never resolve.
    pub fn fold(&mut self, state: &mut ReplicationState, segments: &VersionSegments) -> Result<()> {
        let Some(last) = segments.last() else {
            return Ok(());
        };

        if self.cluster.is_multi_region_enabled() {
            for segment in segments.as_slice() {
                if segment.version == EMPTY_VERSION {
                    continue;
                }
                let region = self.resolve_region(segment.version)?;
                if advance_cursor(
                    &mut state.last_replication_info,
                    &region,
                    segment.version,
                    segment.last_event_id,
                ) {
                    debug!(
                        region = %region,
                        version = segment.version,
                        last_event_id = segment.last_event_id,
                        "Replication cursor advanced"
                    );
                }
            }
        }

        state.current_version = last.version;
        state.last_write_version = last.version;
        state.last_write_event_id = last.last_event_id;

        crate::metrics::record_regions_observed(state.last_replication_info.len());
        Ok(())
    }
}
