// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Error types for the conflict resolver.
//!
//! Errors are categorized by what went wrong: the history itself, the
//! collaborators we read from, or the conditional write at the end of a reset.
//!
//! # Error Categories
//!
//! | Error Type | Expected race | Corruption | Description |
//! |------------|---------------|------------|-------------|
//! | `MalformedHistory` | No | Yes | Missing/invalid start event, inverted range, gaps |
//! | `HistoryReadFailure` | No | No | Log reader I/O failure, including timeouts |
//! | `UnknownVersion` | No | Yes | No region claims an observed version |
//! | `ConflictResolutionStale` | Yes | No | CAS precondition no longer holds |
//! | `ShardOwnershipLost` | Yes | No | Fencing token rejected, shard must stop |
//! | `DomainLookup` | No | No | Domain directory could not resolve the domain |
//! | `Persistence` | No | No | Any other gateway failure, including timeouts |
//!
//! # Retry Behavior
//!
//! Nothing in this crate retries. [`ResetError::is_expected_race()`] marks the
//! failures a recovery coordinator is expected to see under contention; it
//! must re-read the current execution before deriving new CAS parameters.
//! [`ResetError::is_corruption()`] marks failures that should page someone.

use thiserror::Error;

use crate::persistence::{LogReadError, PersistenceError};

/// Result type alias for reset operations.
pub type Result<T> = std::result::Result<T, ResetError>;

/// Errors that can occur while rebuilding and committing a workflow.
#[derive(Error, Debug)]
pub enum ResetError {
    /// The replayed history violates a structural precondition.
    ///
    /// The first event is absent or not a start event, the requested range is
    /// inverted, event IDs are not contiguous, or the log ends early.
    #[error("Malformed history: {0}")]
    MalformedHistory(String),

    /// The log reader failed.
    ///
    /// Timeouts reported by the log reader land here too.
    #[error("History read failure (min_event_id={min_event_id}): {message}")]
    HistoryReadFailure {
        min_event_id: i64,
        message: String,
        #[source]
        source: Option<LogReadError>,
    },

    /// No region claims the version carried by a replayed event.
    ///
    /// Cluster metadata and the log disagree. Not retryable.
    #[error("Unknown version {version}: no region claims it")]
    UnknownVersion { version: i64 },

    /// The current-run precondition no longer matches the persisted record.
    ///
    /// Expected under races. The caller decides whether to re-derive and retry.
    #[error("Stale conflict resolution for {workflow_id} (prev_run_id={prev_run_id}): {message}")]
    ConflictResolutionStale {
        workflow_id: String,
        prev_run_id: String,
        message: String,
    },

    /// The fencing token was rejected.
    ///
    /// The calling shard is no longer authoritative and must stop processing.
    #[error("Shard {shard_id} ownership lost (range_id={range_id}): {message}")]
    ShardOwnershipLost {
        shard_id: i32,
        range_id: i64,
        message: String,
    },

    /// The domain directory failed to resolve the target domain.
    #[error("Domain lookup failed ({domain_id}): {message}")]
    DomainLookup { domain_id: String, message: String },

    /// Any other persistence gateway failure.
    #[error("Persistence error: {0}")]
    Persistence(#[source] PersistenceError),
}

impl ResetError {
    /// Create a malformed history error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedHistory(message.into())
    }

    /// Create a read failure from a log reader error.
    pub fn read_failure(min_event_id: i64, source: LogReadError) -> Self {
        Self::HistoryReadFailure {
            min_event_id,
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Failures that are a normal outcome of concurrent writers.
    pub fn is_expected_race(&self) -> bool {
        matches!(
            self,
            Self::ConflictResolutionStale { .. } | Self::ShardOwnershipLost { .. }
        )
    }

    /// Failures that indicate inconsistent or corrupt data.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::MalformedHistory(_) | Self::UnknownVersion { .. })
    }

    /// Whether a caller may re-derive its inputs and call `reset` again.
    ///
    /// Lost shard ownership is terminal for the shard, so it is excluded.
    pub fn is_retryable_by_caller(&self) -> bool {
        match self {
            Self::ConflictResolutionStale { .. } => true,
            Self::HistoryReadFailure { .. } => true,
            Self::Persistence(e) => !matches!(e, PersistenceError::ConditionFailed(_)),
            Self::DomainLookup { .. } => true,
            Self::MalformedHistory(_) => false,
            Self::UnknownVersion { .. } => false,
            Self::ShardOwnershipLost { .. } => false,
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedHistory(_) => "malformed_history",
            Self::HistoryReadFailure { .. } => "history_read_failure",
            Self::UnknownVersion { .. } => "unknown_version",
            Self::ConflictResolutionStale { .. } => "conflict_resolution_stale",
            Self::ShardOwnershipLost { .. } => "shard_ownership_lost",
            Self::DomainLookup { .. } => "domain_lookup",
            Self::Persistence(_) => "persistence",
        }
    }
}
