//! Mock ExecutionStore for testing.
//!
//! Keeps one current-run pointer per (domain, workflow) and applies the same
//! checks a real store does, atomically under one lock:
//! 1. the request's range ID must equal the shard's current range ID
//! 2. the CAS precondition must match the current-run pointer
//!
//! Records every attempted write and every applied snapshot.

use history_conflict_resolver::persistence::{
    ConflictResolveWorkflowExecutionRequest, CurrentExecution, ExecutionStore, PersistenceError,
    StoreFuture,
};
use history_conflict_resolver::snapshot::WorkflowSnapshot;
use history_conflict_resolver::state::{CloseStatus, WorkflowState};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

type ExecutionKey = (String, String);

/// Mock implementation of ExecutionStore with a real CAS check.
///
/// # Example
/// ```rust,ignore
/// let store = MockExecutionStore::new(1);
/// store.set_current("domain", "wf", current_execution("run-0", 12)).await;
///
/// // Use in tests...
///
/// assert_eq!(store.applied().await.len(), 1);
/// ```
pub struct MockExecutionStore {
    current: RwLock<HashMap<ExecutionKey, CurrentExecution>>,
    range_id: AtomicI64,
    attempts: RwLock<Vec<ConflictResolveWorkflowExecutionRequest>>,
    applied: RwLock<Vec<WorkflowSnapshot>>,
    /// Error returned by the next write instead of evaluating it.
    fail_next: RwLock<Option<PersistenceError>>,
    /// Held inside the write critical section to widen race windows.
    write_delay: Option<Duration>,
    current_reads: AtomicUsize,
}

impl MockExecutionStore {
    pub fn new(range_id: i64) -> Self {
        Self {
            current: RwLock::new(HashMap::new()),
            range_id: AtomicI64::new(range_id),
            attempts: RwLock::new(Vec::new()),
            applied: RwLock::new(Vec::new()),
            fail_next: RwLock::new(None),
            write_delay: None,
            current_reads: AtomicUsize::new(0),
        }
    }

    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    pub async fn set_current(&self, domain_id: &str, workflow_id: &str, current: CurrentExecution) {
        self.current
            .write()
            .await
            .insert((domain_id.to_string(), workflow_id.to_string()), current);
    }

    /// Simulate another host acquiring the shard.
    pub fn steal_shard(&self, new_range_id: i64) {
        self.range_id.store(new_range_id, Ordering::SeqCst);
    }

    pub async fn fail_next_write(&self, error: PersistenceError) {
        *self.fail_next.write().await = Some(error);
    }

    // =========================================================================
    // Query Methods
    // =========================================================================

    pub async fn current(&self, domain_id: &str, workflow_id: &str) -> Option<CurrentExecution> {
        self.current
            .read()
            .await
            .get(&(domain_id.to_string(), workflow_id.to_string()))
            .cloned()
    }

    /// Every write request received, applied or not.
    pub async fn attempts(&self) -> Vec<ConflictResolveWorkflowExecutionRequest> {
        self.attempts.read().await.clone()
    }

    /// Snapshots that passed both checks.
    pub async fn applied(&self) -> Vec<WorkflowSnapshot> {
        self.applied.read().await.clone()
    }

    pub fn current_reads(&self) -> usize {
        self.current_reads.load(Ordering::SeqCst)
    }
}

impl ExecutionStore for MockExecutionStore {
    fn conflict_resolve_workflow_execution(
        &self,
        request: ConflictResolveWorkflowExecutionRequest,
    ) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.attempts.write().await.push(request.clone());

            if let Some(error) = self.fail_next.write().await.take() {
                return Err(error);
            }

            // One lock for check-and-set
            let mut current = self.current.write().await;
            if let Some(delay) = self.write_delay {
                tokio::time::sleep(delay).await;
            }

            let shard_range_id = self.range_id.load(Ordering::SeqCst);
            if request.range_id != shard_range_id {
                return Err(PersistenceError::ShardOwnershipLost {
                    range_id: shard_range_id,
                    message: format!(
                        "request range_id {} != shard range_id {}",
                        request.range_id, shard_range_id
                    ),
                });
            }

            let info = &request.reset_workflow_snapshot.execution_info;
            let key = (info.domain_id.clone(), info.workflow_id.clone());
            let cas = &request.current_workflow_cas;
            let matches = current.get(&key).is_some_and(|existing| {
                existing.run_id == cas.prev_run_id
                    && existing.last_write_version == cas.prev_last_write_version
                    && existing.state == cas.prev_state
            });
            if !matches {
                return Err(PersistenceError::ConditionFailed(format!(
                    "current run of {} does not match {:?}",
                    info.workflow_id, cas
                )));
            }

            let last_write_version = request
                .reset_workflow_snapshot
                .replication_state
                .last_write_version;
            current.insert(
                key,
                CurrentExecution {
                    run_id: info.run_id.clone(),
                    state: info.state,
                    close_status: info.close_status,
                    last_write_version,
                    start_request_id: info.create_request_id.clone(),
                },
            );
            self.applied
                .write()
                .await
                .push(request.reset_workflow_snapshot.clone());
            Ok(())
        })
    }

    fn get_current_execution(
        &self,
        domain_id: &str,
        workflow_id: &str,
    ) -> StoreFuture<'_, CurrentExecution> {
        let key = (domain_id.to_string(), workflow_id.to_string());
        Box::pin(async move {
            self.current_reads.fetch_add(1, Ordering::SeqCst);
            self.current
                .read()
                .await
                .get(&key)
                .cloned()
                .ok_or_else(|| PersistenceError::NotFound(format!("{}/{}", key.0, key.1)))
        })
    }
}

/// A current-run pointer for a running workflow.
pub fn running_execution(run_id: &str, last_write_version: i64) -> CurrentExecution {
    CurrentExecution {
        run_id: run_id.to_string(),
        state: WorkflowState::Running,
        close_status: CloseStatus::None,
        last_write_version,
        start_request_id: format!("{}-start", run_id),
    }
}
