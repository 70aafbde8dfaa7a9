//! # History Conflict Resolver
//!
//! The reset/replay core of a multi-region workflow history store.
//!
//! When a workflow's history diverges across regions, the resolver rebuilds an
//! authoritative [`MutableState`] by replaying the run's durable event log and
//! replaces the persisted current execution with it through a conditional
//! (compare-and-swap) write.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────────────┐
//! │                        history-conflict-resolver                          │
//! │                                                                           │
//! │  ┌─────────────────┐   ┌───────────────────────────┐   ┌───────────────┐  │
//! │  │ HistoryReplayer │──►│ ReplicationCursorResolver │──►│SnapshotBuilder│  │
//! │  │ (paged fold)    │   │ (version → region)        │   │ (tasks, enc.) │  │
//! │  └─────────────────┘   └───────────────────────────┘   └───────────────┘  │
//! │          ▲                                                     │          │
//! │          │                 ConflictResolver::reset             ▼          │
//! │  ┌───────┴──────┐                                     ┌────────────────┐  │
//! │  │  HistoryLog  │                                     │ ExecutionStore │  │
//! │  │ (trait seam) │                                     │ (CAS + fence)  │  │
//! │  └──────────────┘                                     └────────────────┘  │
//! └───────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every call receives an explicit [`ShardContext`] carrying the fencing token
//! (range ID), configuration, cluster metadata and domain directory.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use history_conflict_resolver::{ConflictResolver, ResetRequest, ShardContext};
//! use history_conflict_resolver::persistence::{ExecutionStore, HistoryLog};
//! use history_conflict_resolver::state::ExecutionInfo;
//!
//! async fn recover<L: HistoryLog, S: ExecutionStore>(
//!     resolver: &ConflictResolver<L, S>,
//!     shard: &ShardContext,
//!     seed: ExecutionInfo,
//!     decision_finish_event_id: i64,
//! ) -> history_conflict_resolver::Result<()> {
//!     let cas = resolver
//!         .load_current_cas(shard, &seed.domain_id, &seed.workflow_id)
//!         .await?;
//!     let request = ResetRequest::new(cas, "request-id", decision_finish_event_id, seed, 0);
//!     let rebuilt = resolver.reset(shard, request).await?;
//!     println!("next event: {}", rebuilt.next_event_id());
//!     Ok(())
//! }
//! ```

pub mod cluster;
pub mod config;
pub mod cursor;
pub mod error;
pub mod event;
pub mod metrics;
pub mod persistence;
pub mod replay;
pub mod resolver;
pub mod shard;
pub mod snapshot;
pub mod state;

// Re-exports for convenience
pub use cluster::{ClusterMetadata, ClusterTopology, DomainDirectory, DomainEntry};
pub use config::{EncodingType, ResolverConfig, ResolverSettings, VisibilityWritingMode};
pub use cursor::ReplicationCursorResolver;
pub use error::{ResetError, Result};
pub use event::{EventAttributes, HistoryEvent};
pub use persistence::{ExecutionStore, HistoryLog};
pub use replay::{HistoryReplayer, ReplayOutcome, ReplayRange};
pub use resolver::{ConflictResolver, CurrentWorkflowCas, ResetRequest};
pub use shard::ShardContext;
pub use snapshot::{SnapshotBuilder, TransferTask, WorkflowSnapshot};
pub use state::{ExecutionInfo, MutableState, WorkflowIdentity, WorkflowState};
