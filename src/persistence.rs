// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Persistence integration traits.
//!
//! Defines the two storage seams the resolver depends on:
//!
//! - [`HistoryLog`]: paginated reads of a run's append-only event log
//! - [`ExecutionStore`]: the conditional write of a rebuilt execution, and the
//!   read of the current-run record callers use to derive CAS parameters
//!
//! Both return boxed futures so they can be used as trait objects and
//! substituted with in-memory fakes in tests.
//!
//! # Example
//!
//! ```rust,no_run
//! use history_conflict_resolver::persistence::{
//!     HistoryLog, LogFuture, ReadHistoryBranchRequest, ReadHistoryBranchResponse,
//! };
//!
//! struct EmptyLog;
//!
//! impl HistoryLog for EmptyLog {
//!     fn read_history_branch(
//!         &self,
//!         _request: ReadHistoryBranchRequest,
//!     ) -> LogFuture<'_, ReadHistoryBranchResponse> {
//!         Box::pin(async move { Ok(ReadHistoryBranchResponse::default()) })
//!     }
//! }
//! ```

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::EncodingType;
use crate::event::HistoryEvent;
use crate::resolver::CurrentWorkflowCas;
use crate::snapshot::WorkflowSnapshot;
use crate::state::{CloseStatus, WorkflowState};

/// Boxed future returned by [`HistoryLog`].
pub type LogFuture<'a, T> =
    Pin<Box<dyn Future<Output = std::result::Result<T, LogReadError>> + Send + 'a>>;

/// Boxed future returned by [`ExecutionStore`].
pub type StoreFuture<'a, T> =
    Pin<Box<dyn Future<Output = std::result::Result<T, PersistenceError>> + Send + 'a>>;

/// Errors reported by the log reader.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LogReadError {
    #[error("history read timed out")]
    Timeout,

    #[error("history branch not found: {0}")]
    NotFound(String),

    #[error("invalid page token: {0}")]
    InvalidPageToken(String),

    #[error("log unavailable: {0}")]
    Unavailable(String),
}

/// Errors reported by the execution store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    /// The current-run precondition did not match.
    #[error("condition failed: {0}")]
    ConditionFailed(String),

    /// The supplied range ID is stale.
    #[error("shard ownership lost (range_id={range_id}): {message}")]
    ShardOwnershipLost { range_id: i64, message: String },

    #[error("execution not found: {0}")]
    NotFound(String),

    #[error("persistence timed out")]
    Timeout,

    #[error("persistence unavailable: {0}")]
    Unavailable(String),
}

// ═══════════════════════════════════════════════════════════════════════════════
// History log
// ═══════════════════════════════════════════════════════════════════════════════

/// One page request against a history branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadHistoryBranchRequest {
    /// Opaque branch handle.
    pub branch_token: Vec<u8>,
    /// Inclusive.
    pub min_event_id: i64,
    /// Exclusive.
    pub max_event_id: i64,
    pub page_size: usize,
    /// `None` on the first page.
    pub next_page_token: Option<Vec<u8>>,
    pub shard_id: i32,
}

/// One page of history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadHistoryBranchResponse {
    /// Ascending by event ID.
    pub history_events: Vec<HistoryEvent>,
    /// `None` (or empty) once the branch is exhausted.
    pub next_page_token: Option<Vec<u8>>,
    /// First event ID of the last batch on this page.
    pub last_first_event_id: i64,
    /// Bytes read for this page.
    pub size: i64,
}

impl ReadHistoryBranchResponse {
    /// Whether another page must be requested.
    pub fn has_more(&self) -> bool {
        self.next_page_token
            .as_ref()
            .map(|token| !token.is_empty())
            .unwrap_or(false)
    }
}

/// Read access to the durable event log.
pub trait HistoryLog: Send + Sync + 'static {
    /// Read one page of events in `[min_event_id, max_event_id)`.
    ///
    /// Events must come back in ascending event ID order.
    fn read_history_branch(
        &self,
        request: ReadHistoryBranchRequest,
    ) -> LogFuture<'_, ReadHistoryBranchResponse>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// Execution store
// ═══════════════════════════════════════════════════════════════════════════════

/// Conditional replacement of the current execution with a rebuilt one.
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictResolveWorkflowExecutionRequest {
    /// Fencing token of the writing shard.
    pub range_id: i64,
    pub current_workflow_cas: CurrentWorkflowCas,
    pub reset_workflow_snapshot: WorkflowSnapshot,
    pub encoding: EncodingType,
}

/// The persisted "current run" pointer of a workflow ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentExecution {
    pub run_id: String,
    pub state: WorkflowState,
    pub close_status: CloseStatus,
    pub last_write_version: i64,
    pub start_request_id: String,
}

/// Write access to persisted executions.
pub trait ExecutionStore: Send + Sync + 'static {
    /// Replace the current execution if `current_workflow_cas` still matches
    /// and `range_id` is still the shard's fencing token.
    fn conflict_resolve_workflow_execution(
        &self,
        request: ConflictResolveWorkflowExecutionRequest,
    ) -> StoreFuture<'_, ()>;

    /// Read the current-run pointer for a workflow ID.
    fn get_current_execution(
        &self,
        domain_id: &str,
        workflow_id: &str,
    ) -> StoreFuture<'_, CurrentExecution>;
}
