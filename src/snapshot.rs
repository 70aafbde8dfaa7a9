//! Workflow snapshots.
//!
//! A [`WorkflowSnapshot`] is the unit handed to the execution store: the
//! rebuilt execution plus every sub-entity collection and the derived task
//! lists. Collections are always present; an empty `Vec` is how "no pending
//! activities" is written, never a missing field.
//!
//! # Derived Tasks
//!
//! | Task | Derived when |
//! |------|--------------|
//! | `UpsertWorkflowSearchAttributes` transfer task | effective visibility mode is `on` or `dual` |
//! | replication tasks | never on a reset |
//! | timer tasks | never on a reset |
//!
//! The domain's own settings win over the shard configuration for both the
//! visibility mode and the event encoding.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cluster::DomainEntry;
use crate::config::{EncodingType, ResolverConfig, VisibilityWritingMode};
use crate::state::{
    ActivityInfo, ChildExecutionInfo, ExecutionInfo, ExecutionStats, MutableState,
    ReplicationState, RequestCancelInfo, SignalInfo, TimerInfo,
};

/// Work queued for the transfer queue processor after the write commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferTask {
    /// Push the run's search attributes to advanced visibility.
    UpsertWorkflowSearchAttributes { version: i64 },
}

/// Work queued for cross-region replication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplicationTask {
    History {
        first_event_id: i64,
        next_event_id: i64,
        version: i64,
    },
}

/// Durable timers fired by the timer queue processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerTask {
    UserTimer { event_id: i64, version: i64 },
    ActivityTimeout { event_id: i64, version: i64 },
    DecisionTimeout { event_id: i64, version: i64 },
}

/// Everything one conditional write persists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSnapshot {
    pub execution_info: ExecutionInfo,
    pub execution_stats: ExecutionStats,
    pub replication_state: ReplicationState,
    pub activity_infos: Vec<ActivityInfo>,
    pub timer_infos: Vec<TimerInfo>,
    pub child_execution_infos: Vec<ChildExecutionInfo>,
    pub request_cancel_infos: Vec<RequestCancelInfo>,
    pub signal_infos: Vec<SignalInfo>,
    pub signal_requested_ids: Vec<String>,
    pub transfer_tasks: Vec<TransferTask>,
    pub replication_tasks: Vec<ReplicationTask>,
    pub timer_tasks: Vec<TimerTask>,
    /// NextEventID the persisted record must hold for the next update.
    pub condition: i64,
}

impl WorkflowSnapshot {
    /// Canonical serialized content, for byte-level comparisons.
    pub fn content_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Builds snapshots from rebuilt mutable state.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotBuilder<'a> {
    config: &'a ResolverConfig,
}

impl<'a> SnapshotBuilder<'a> {
    pub fn new(config: &'a ResolverConfig) -> Self {
        Self { config }
    }

    /// Visibility writing mode in effect for `domain`.
    pub fn visibility_mode(&self, domain: &DomainEntry) -> VisibilityWritingMode {
        domain
            .config
            .visibility_writing_mode
            .unwrap_or(self.config.settings.visibility.writing_mode)
    }

    /// Event encoding for the outbound write.
    pub fn encoding(&self, domain: &DomainEntry) -> EncodingType {
        domain
            .config
            .event_encoding
            .unwrap_or_else(|| self.config.settings.encoding.for_domain(&domain.id))
    }

    pub fn build(&self, state: &MutableState, domain: &DomainEntry) -> WorkflowSnapshot {
        let mode = self.visibility_mode(domain);
        let mut transfer_tasks = Vec::new();
        if mode.writes_advanced() {
            transfer_tasks.push(TransferTask::UpsertWorkflowSearchAttributes {
                version: state.replication_state.current_version,
            });
        }

        debug!(
            domain = %domain.name,
            visibility_mode = ?mode,
            transfer_tasks = transfer_tasks.len(),
            pending = state.pending_count(),
            "Built workflow snapshot"
        );

        WorkflowSnapshot {
            execution_info: state.execution_info.clone(),
            execution_stats: state.execution_stats.clone(),
            replication_state: state.replication_state.clone(),
            activity_infos: state.activity_infos.values().cloned().collect(),
            timer_infos: state.timer_infos.values().cloned().collect(),
            child_execution_infos: state.child_execution_infos.values().cloned().collect(),
            request_cancel_infos: state.request_cancel_infos.values().cloned().collect(),
            signal_infos: state.signal_infos.values().cloned().collect(),
            signal_requested_ids: state.signal_requested_ids.iter().cloned().collect(),
            transfer_tasks,
            replication_tasks: Vec::new(),
            timer_tasks: Vec::new(),
            condition: state.update_condition,
        }
    }
}
