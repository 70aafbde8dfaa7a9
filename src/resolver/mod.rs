// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Conflict resolver.
//!
//! The orchestrator that ties together:
//! - History replay via [`crate::replay::HistoryReplayer`]
//! - Cursor folding via [`crate::cursor::ReplicationCursorResolver`]
//! - Snapshot building via [`crate::snapshot::SnapshotBuilder`]
//! - The conditional write via [`crate::persistence::ExecutionStore`]
//!
//! # Reset Flow
//!
//! ```text
//! seed ExecutionInfo ──┐
//!                      ▼
//!            ┌──────────────────┐   pages    ┌────────────┐
//!            │ HistoryReplayer  │◀───────────│ HistoryLog │
//!            └────────┬─────────┘            └────────────┘
//!                     │ MutableState + version segments
//!                     ▼
//!        ┌───────────────────────────┐  region_for_version  ┌─────────────────┐
//!        │ ReplicationCursorResolver │◀────────────────────│ ClusterMetadata │
//!        └────────────┬──────────────┘                      └─────────────────┘
//!                     │ stamp seed fields, State = Created
//!                     ▼
//!            ┌──────────────────┐   get_domain_by_id   ┌─────────────────┐
//!            │ SnapshotBuilder  │◀─────────────────────│ DomainDirectory │
//!            └────────┬─────────┘                      └─────────────────┘
//!                     │ WorkflowSnapshot + encoding + range ID + CAS
//!                     ▼
//!            ┌──────────────────┐
//!            │ ExecutionStore   │──▶ applied | stale | fenced
//!            └──────────────────┘
//! ```
//!
//! # Concurrency
//!
//! Nothing here locks. Concurrent resets of the same workflow race on the
//! CAS precondition and the shard's range ID; at most one write applies and
//! the losers see [`ResetError::ConflictResolutionStale`] or
//! [`ResetError::ShardOwnershipLost`]. Neither is retried here.

mod types;

pub use types::{CurrentWorkflowCas, ResetRequest};

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, instrument, warn};

use crate::cursor::ReplicationCursorResolver;
use crate::error::{ResetError, Result};
use crate::metrics;
use crate::persistence::{
    ConflictResolveWorkflowExecutionRequest, ExecutionStore, HistoryLog, PersistenceError,
};
use crate::replay::{HistoryReplayer, ReplayRange};
use crate::shard::ShardContext;
use crate::snapshot::SnapshotBuilder;
use crate::state::{CloseStatus, MutableState, WorkflowIdentity, WorkflowState};

/// Rebuilds a workflow from its history and replaces the current execution.
///
/// Holds only the storage collaborators. Everything shard-scoped (range ID,
/// config, cluster metadata, domains) arrives per call via [`ShardContext`].
pub struct ConflictResolver<L: HistoryLog, S: ExecutionStore> {
    log: Arc<L>,
    store: Arc<S>,
}

impl<L: HistoryLog, S: ExecutionStore> ConflictResolver<L, S> {
    pub fn new(log: Arc<L>, store: Arc<S>) -> Self {
        Self { log, store }
    }

    pub fn log(&self) -> &Arc<L> {
        &self.log
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Read the current-run pointer and derive a CAS precondition from it.
    ///
    /// Used by callers before [`reset`](Self::reset), and again after a
    /// [`ResetError::ConflictResolutionStale`] before deciding to retry.
    pub async fn load_current_cas(
        &self,
        shard: &ShardContext,
        domain_id: &str,
        workflow_id: &str,
    ) -> Result<CurrentWorkflowCas> {
        shard.ensure_owned()?;
        let current = self
            .store
            .get_current_execution(domain_id, workflow_id)
            .await
            .map_err(|e| self.map_store_error(shard, e, workflow_id, ""))?;
        debug!(
            domain_id = %domain_id,
            workflow_id = %workflow_id,
            run_id = %current.run_id,
            last_write_version = current.last_write_version,
            "Loaded current execution"
        );
        Ok(CurrentWorkflowCas::from_current(&current))
    }

    /// Replay events `1..=decision_finish_event_id`, rebuild the run and
    /// conditionally replace the current execution with it.
    ///
    /// Returns the rebuilt mutable state for in-memory adoption.
    #[instrument(
        skip_all,
        fields(
            shard_id = shard.shard_id(),
            domain_id = %request.seed.domain_id,
            workflow_id = %request.seed.workflow_id,
            run_id = %request.seed.run_id,
        )
    )]
    pub async fn reset(&self, shard: &ShardContext, request: ResetRequest) -> Result<MutableState> {
        let started = Instant::now();
        let result = self.reset_inner(shard, request).await;
        let elapsed = started.elapsed();

        metrics::record_reset(result.is_ok(), elapsed);
        match &result {
            Ok(state) => info!(
                next_event_id = state.next_event_id(),
                history_size = state.execution_stats.history_size,
                duration_ms = elapsed.as_millis() as u64,
                "Workflow reset committed"
            ),
            Err(e) => {
                metrics::record_error(e.kind());
                if e.is_corruption() {
                    error!(error = %e, "Workflow reset failed on inconsistent data");
                } else if e.is_expected_race() {
                    warn!(error = %e, "Workflow reset lost a race");
                } else {
                    warn!(error = %e, "Workflow reset failed");
                }
            }
        }
        result
    }

    async fn reset_inner(
        &self,
        shard: &ShardContext,
        request: ResetRequest,
    ) -> Result<MutableState> {
        shard.ensure_owned()?;

        let ResetRequest {
            cas,
            request_id,
            decision_finish_event_id,
            seed,
            update_condition,
        } = request;
        let identity = seed.identity();

        info!(
            prev_run_id = %cas.prev_run_id,
            prev_last_write_version = cas.prev_last_write_version,
            prev_state = %cas.prev_state,
            decision_finish_event_id,
            "Resetting workflow"
        );

        let domain = shard
            .domains()
            .get_domain_by_id(&identity.domain_id)
            .await
            .map_err(|e| ResetError::DomainLookup {
                domain_id: identity.domain_id.clone(),
                message: e.to_string(),
            })?;

        let replayer = HistoryReplayer::new(shard, self.log.as_ref());
        let outcome = replayer
            .replay(
                &identity,
                &seed.branch_token,
                ReplayRange::through(decision_finish_event_id),
            )
            .await?;
        debug!(
            pages = outcome.pages_read,
            events = outcome.events_folded,
            last_event_id = outcome.last_event.event_id,
            "Replay complete"
        );

        let mut state = outcome.mutable_state;
        ReplicationCursorResolver::new(shard.cluster())
            .fold(&mut state.replication_state, &outcome.segments)?;

        let info = &mut state.execution_info;
        info.branch_token = seed.branch_token;
        info.start_timestamp = seed.start_timestamp;
        info.last_updated_timestamp = seed.last_updated_timestamp;
        info.create_request_id = request_id;
        // A close folded from the range does not survive into the rebuilt run
        info.state = WorkflowState::Created;
        info.close_status = CloseStatus::None;
        state.update_condition = update_condition;

        let builder = SnapshotBuilder::new(shard.config());
        let write = ConflictResolveWorkflowExecutionRequest {
            range_id: shard.range_id(),
            current_workflow_cas: cas,
            reset_workflow_snapshot: builder.build(&state, &domain),
            encoding: builder.encoding(&domain),
        };

        self.conditional_write(shard, write, &identity).await?;
        Ok(state)
    }

    async fn conditional_write(
        &self,
        shard: &ShardContext,
        request: ConflictResolveWorkflowExecutionRequest,
        identity: &WorkflowIdentity,
    ) -> Result<()> {
        // Replay may have taken a while; another call could have lost the shard.
        shard.ensure_owned()?;

        let prev_run_id = request.current_workflow_cas.prev_run_id.clone();
        let started = Instant::now();
        let result = self.store.conflict_resolve_workflow_execution(request).await;
        let elapsed = started.elapsed();

        let slo = &shard.config().settings.slo;
        if slo.is_cas_violation(elapsed) {
            metrics::record_slo_violation("cas", elapsed.as_millis() as u64);
            warn!(
                latency_ms = elapsed.as_millis() as u64,
                threshold_ms = slo.max_cas_latency_ms,
                "Conditional write exceeded SLO"
            );
        }

        let outcome = match &result {
            Ok(()) => "applied",
            Err(PersistenceError::ConditionFailed(_)) => "stale",
            Err(PersistenceError::ShardOwnershipLost { .. }) => "fenced",
            Err(_) => "error",
        };
        metrics::record_cas_outcome(outcome, elapsed);

        result.map_err(|e| self.map_store_error(shard, e, &identity.workflow_id, &prev_run_id))
    }

    fn map_store_error(
        &self,
        shard: &ShardContext,
        error: PersistenceError,
        workflow_id: &str,
        prev_run_id: &str,
    ) -> ResetError {
        match error {
            PersistenceError::ConditionFailed(message) => ResetError::ConflictResolutionStale {
                workflow_id: workflow_id.to_string(),
                prev_run_id: prev_run_id.to_string(),
                message,
            },
            PersistenceError::ShardOwnershipLost { range_id, message } => {
                shard.mark_ownership_lost();
                ResetError::ShardOwnershipLost {
                    shard_id: shard.shard_id(),
                    range_id,
                    message,
                }
            }
            other => ResetError::Persistence(other),
        }
    }
}
