//! Reset request types.
//!
//! # CAS Precondition
//!
//! ```text
//! persisted current-run pointer          CurrentWorkflowCas
//! ┌────────────────────────────┐        ┌────────────────────────────┐
//! │ run_id                     │ ══════ │ prev_run_id                │
//! │ last_write_version         │ ══════ │ prev_last_write_version    │
//! │ state                      │ ══════ │ prev_state                 │
//! └────────────────────────────┘        └────────────────────────────┘
//!             all three equal ──▶ write applies
//!             any mismatch    ──▶ ConflictResolutionStale
//! ```

use serde::{Deserialize, Serialize};

use crate::persistence::CurrentExecution;
use crate::state::{ExecutionInfo, WorkflowState};

/// Optimistic-concurrency precondition on the current-run pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentWorkflowCas {
    pub prev_run_id: String,
    pub prev_last_write_version: i64,
    pub prev_state: WorkflowState,
}

impl CurrentWorkflowCas {
    pub fn new(
        prev_run_id: impl Into<String>,
        prev_last_write_version: i64,
        prev_state: WorkflowState,
    ) -> Self {
        Self {
            prev_run_id: prev_run_id.into(),
            prev_last_write_version,
            prev_state,
        }
    }

    /// Precondition matching a freshly read current-run pointer.
    pub fn from_current(current: &CurrentExecution) -> Self {
        Self::new(&current.run_id, current.last_write_version, current.state)
    }

    /// Whether `current` still satisfies this precondition.
    pub fn matches(&self, current: &CurrentExecution) -> bool {
        self.prev_run_id == current.run_id
            && self.prev_last_write_version == current.last_write_version
            && self.prev_state == current.state
    }
}

/// Arguments of one reset.
#[derive(Debug, Clone, PartialEq)]
pub struct ResetRequest {
    pub cas: CurrentWorkflowCas,
    /// Stamped verbatim as the rebuilt run's create request ID.
    pub request_id: String,
    /// Last event to replay, inclusive.
    pub decision_finish_event_id: i64,
    /// Supplies identity, branch token and timestamps of the rebuilt run.
    pub seed: ExecutionInfo,
    /// NextEventID condition stored on the rebuilt state.
    pub update_condition: i64,
}

impl ResetRequest {
    pub fn new(
        cas: CurrentWorkflowCas,
        request_id: impl Into<String>,
        decision_finish_event_id: i64,
        seed: ExecutionInfo,
        update_condition: i64,
    ) -> Self {
        Self {
            cas,
            request_id: request_id.into(),
            decision_finish_event_id,
            seed,
            update_condition,
        }
    }
}
