//! Mutable state of a workflow run.
//!
//! [`MutableState`] is the in-memory projection that replay produces:
//! execution metadata, size accounting, replication cursors and the
//! per-entity sub-state keyed by initiating event ID.
//!
//! All collections are ordered maps so that two folds of the same history
//! serialize to identical bytes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Sentinel for "no event".
pub const EMPTY_EVENT_ID: i64 = -23;
/// Sentinel for "no version".
pub const EMPTY_VERSION: i64 = -24;
/// Sentinel for "no request ID".
pub const EMPTY_UUID: &str = "emptyUuid";

/// Identifies one execution lineage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkflowIdentity {
    pub domain_id: String,
    pub workflow_id: String,
    pub run_id: String,
}

impl WorkflowIdentity {
    pub fn new(
        domain_id: impl Into<String>,
        workflow_id: impl Into<String>,
        run_id: impl Into<String>,
    ) -> Self {
        Self {
            domain_id: domain_id.into(),
            workflow_id: workflow_id.into(),
            run_id: run_id.into(),
        }
    }
}

impl std::fmt::Display for WorkflowIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.domain_id, self.workflow_id, self.run_id)
    }
}

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowState {
    #[default]
    Created,
    Running,
    Completed,
    Zombie,
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkflowState::Created => write!(f, "Created"),
            WorkflowState::Running => write!(f, "Running"),
            WorkflowState::Completed => write!(f, "Completed"),
            WorkflowState::Zombie => write!(f, "Zombie"),
        }
    }
}

/// How a closed run ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseStatus {
    #[default]
    None,
    Completed,
    Failed,
    Canceled,
    Terminated,
    ContinuedAsNew,
    TimedOut,
}

/// Execution metadata of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionInfo {
    pub domain_id: String,
    pub workflow_id: String,
    pub run_id: String,
    pub parent_domain_id: String,
    pub parent_workflow_id: String,
    pub parent_run_id: String,
    pub initiated_id: i64,
    pub task_list: String,
    pub workflow_type_name: String,
    /// Seconds.
    pub workflow_timeout: i32,
    /// Seconds.
    pub decision_start_to_close_timeout: i32,
    pub creator_identity: String,
    pub state: WorkflowState,
    pub close_status: CloseStatus,
    pub last_first_event_id: i64,
    /// One past the last applied event.
    pub next_event_id: i64,
    pub last_processed_event: i64,
    pub start_timestamp: DateTime<Utc>,
    pub last_updated_timestamp: DateTime<Utc>,
    pub create_request_id: String,
    pub decision_version: i64,
    pub decision_schedule_id: i64,
    pub decision_started_id: i64,
    pub decision_request_id: String,
    pub decision_timeout: i32,
    pub decision_attempt: i64,
    pub decision_scheduled_timestamp: i64,
    pub decision_started_timestamp: i64,
    pub cancel_requested: bool,
    pub attempt: i32,
    pub signal_count: i32,
    pub completion_event_batch_id: i64,
    pub branch_token: Vec<u8>,
    pub search_attributes: BTreeMap<String, Vec<u8>>,
}

impl ExecutionInfo {
    /// Blank execution info for an identity; every cursor holds its sentinel.
    pub fn new(identity: &WorkflowIdentity) -> Self {
        Self {
            domain_id: identity.domain_id.clone(),
            workflow_id: identity.workflow_id.clone(),
            run_id: identity.run_id.clone(),
            parent_domain_id: String::new(),
            parent_workflow_id: String::new(),
            parent_run_id: String::new(),
            initiated_id: EMPTY_EVENT_ID,
            task_list: String::new(),
            workflow_type_name: String::new(),
            workflow_timeout: 0,
            decision_start_to_close_timeout: 0,
            creator_identity: String::new(),
            state: WorkflowState::Created,
            close_status: CloseStatus::None,
            last_first_event_id: EMPTY_EVENT_ID,
            next_event_id: crate::event::FIRST_EVENT_ID,
            last_processed_event: EMPTY_EVENT_ID,
            start_timestamp: DateTime::<Utc>::UNIX_EPOCH,
            last_updated_timestamp: DateTime::<Utc>::UNIX_EPOCH,
            create_request_id: String::new(),
            decision_version: EMPTY_VERSION,
            decision_schedule_id: EMPTY_EVENT_ID,
            decision_started_id: EMPTY_EVENT_ID,
            decision_request_id: EMPTY_UUID.to_string(),
            decision_timeout: 0,
            decision_attempt: 0,
            decision_scheduled_timestamp: 0,
            decision_started_timestamp: 0,
            cancel_requested: false,
            attempt: 0,
            signal_count: 0,
            completion_event_batch_id: EMPTY_EVENT_ID,
            branch_token: Vec::new(),
            search_attributes: BTreeMap::new(),
        }
    }

    pub fn identity(&self) -> WorkflowIdentity {
        WorkflowIdentity::new(&self.domain_id, &self.workflow_id, &self.run_id)
    }

    /// Whether a decision is scheduled and not yet closed.
    pub fn has_pending_decision(&self) -> bool {
        self.decision_schedule_id != EMPTY_EVENT_ID
    }

    /// Reset every decision cursor to its sentinel.
    pub fn clear_decision(&mut self) {
        self.decision_version = EMPTY_VERSION;
        self.decision_schedule_id = EMPTY_EVENT_ID;
        self.decision_started_id = EMPTY_EVENT_ID;
        self.decision_request_id = EMPTY_UUID.to_string();
        self.decision_timeout = 0;
        self.decision_attempt = 0;
        self.decision_scheduled_timestamp = 0;
        self.decision_started_timestamp = 0;
    }
}

/// Size accounting attached to an execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStats {
    /// Bytes of history as reported by the log reader.
    pub history_size: i64,
}

/// Last (version, event ID) seen from one region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationInfo {
    pub version: i64,
    pub last_event_id: i64,
}

/// Multi-region version bookkeeping of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationState {
    pub current_version: i64,
    pub start_version: i64,
    pub last_write_version: i64,
    pub last_write_event_id: i64,
    /// Keyed by region name.
    pub last_replication_info: BTreeMap<String, ReplicationInfo>,
}

impl ReplicationState {
    /// Fresh state for a run whose first event carries `start_version`.
    pub fn new(start_version: i64) -> Self {
        Self {
            current_version: start_version,
            start_version,
            last_write_version: EMPTY_VERSION,
            last_write_event_id: EMPTY_EVENT_ID,
            last_replication_info: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityInfo {
    pub version: i64,
    pub schedule_id: i64,
    pub scheduled_event_batch_id: i64,
    pub scheduled_time: i64,
    pub started_id: i64,
    pub started_time: i64,
    pub activity_id: String,
    pub activity_type: String,
    pub task_list: String,
    pub request_id: String,
    pub schedule_to_start_timeout: i32,
    pub schedule_to_close_timeout: i32,
    pub start_to_close_timeout: i32,
    pub heartbeat_timeout: i32,
    pub cancel_requested: bool,
    pub cancel_request_id: i64,
    pub attempt: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerInfo {
    pub version: i64,
    pub timer_id: String,
    pub started_id: i64,
    /// Unix nanoseconds.
    pub expiry_time: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildExecutionInfo {
    pub version: i64,
    pub initiated_id: i64,
    pub initiated_event_batch_id: i64,
    pub started_id: i64,
    pub started_workflow_id: String,
    pub started_run_id: String,
    pub create_request_id: String,
    pub domain_name: String,
    pub workflow_type_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCancelInfo {
    pub version: i64,
    pub initiated_id: i64,
    pub initiated_event_batch_id: i64,
    pub cancel_request_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalInfo {
    pub version: i64,
    pub initiated_id: i64,
    pub initiated_event_batch_id: i64,
    pub signal_request_id: String,
    pub signal_name: String,
    pub input: Vec<u8>,
    pub control: Vec<u8>,
}

/// The in-memory state of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutableState {
    pub execution_info: ExecutionInfo,
    pub execution_stats: ExecutionStats,
    pub replication_state: ReplicationState,
    pub activity_infos: BTreeMap<i64, ActivityInfo>,
    /// Keyed by the timer's started event ID.
    pub timer_infos: BTreeMap<i64, TimerInfo>,
    pub child_execution_infos: BTreeMap<i64, ChildExecutionInfo>,
    pub request_cancel_infos: BTreeMap<i64, RequestCancelInfo>,
    pub signal_infos: BTreeMap<i64, SignalInfo>,
    pub signal_requested_ids: BTreeSet<String>,
    /// NextEventID the persisted record must hold for the next update.
    pub update_condition: i64,
}

impl MutableState {
    pub fn new(identity: &WorkflowIdentity, start_version: i64) -> Self {
        Self {
            execution_info: ExecutionInfo::new(identity),
            execution_stats: ExecutionStats::default(),
            replication_state: ReplicationState::new(start_version),
            activity_infos: BTreeMap::new(),
            timer_infos: BTreeMap::new(),
            child_execution_infos: BTreeMap::new(),
            request_cancel_infos: BTreeMap::new(),
            signal_infos: BTreeMap::new(),
            signal_requested_ids: BTreeSet::new(),
            update_condition: 0,
        }
    }

    pub fn next_event_id(&self) -> i64 {
        self.execution_info.next_event_id
    }

    /// Find a pending activity by its user-facing activity ID.
    pub fn activity_by_id_mut(&mut self, activity_id: &str) -> Option<&mut ActivityInfo> {
        self.activity_infos
            .values_mut()
            .find(|a| a.activity_id == activity_id)
    }

    /// Number of sub-entities still pending.
    pub fn pending_count(&self) -> usize {
        self.activity_infos.len()
            + self.timer_infos.len()
            + self.child_execution_infos.len()
            + self.request_cancel_infos.len()
            + self.signal_infos.len()
    }
}
