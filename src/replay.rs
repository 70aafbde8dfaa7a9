// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! History replay.
//!
//! Reads a bounded range of a run's history page by page and folds it into a
//! fresh [`MutableState`].
//!
//! # Read Loop
//!
//! ```text
//! read [from, to + 1) ──▶ page ──▶ fold events ≤ to ──▶ next_page_token?
//!        ▲                                                   │ yes
//!        └───────────────────────────────────────────────────┘
//! ```
//!
//! Pages are fetched one at a time, in order. Every page's byte size counts
//! toward the history size, including events past `to` that the reader
//! returned anyway.
//!
//! # Fold Rules
//!
//! - The first event must be a workflow start event; it seeds the execution.
//! - Each later event is applied by an exhaustive match over its attributes.
//!   Variants without state of their own (markers, failed cancels) only
//!   advance the watermark.
//! - Event IDs must be contiguous. A sub-entity event whose initiating event
//!   was never folded is malformed history.
//!
//! After a successful replay `next_event_id == to + 1`.

use std::time::Instant;

use chrono::{TimeZone, Utc};
use tracing::{debug, trace, warn};

use crate::cursor::VersionSegments;
use crate::error::{ResetError, Result};
use crate::event::{EventAttributes, HistoryEvent, FIRST_EVENT_ID};
use crate::metrics;
use crate::persistence::{HistoryLog, ReadHistoryBranchRequest};
use crate::shard::ShardContext;
use crate::state::{
    ActivityInfo, ChildExecutionInfo, CloseStatus, MutableState, RequestCancelInfo, SignalInfo,
    TimerInfo, WorkflowIdentity, WorkflowState, EMPTY_EVENT_ID, EMPTY_UUID,
};

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Inclusive event ID range to replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayRange {
    pub from_event_id: i64,
    pub to_event_id: i64,
}

impl ReplayRange {
    /// Replay from the first event through `to_event_id`.
    pub fn through(to_event_id: i64) -> Self {
        Self {
            from_event_id: FIRST_EVENT_ID,
            to_event_id,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.to_event_id < self.from_event_id {
            return Err(ResetError::malformed(format!(
                "inverted replay range: to_event_id {} < from_event_id {}",
                self.to_event_id, self.from_event_id
            )));
        }
        Ok(())
    }

    /// Exclusive upper bound sent to the log reader.
    pub fn max_event_id(&self) -> Result<i64> {
        self.to_event_id.checked_add(1).ok_or_else(|| {
            ResetError::malformed(format!(
                "replay range end {} has no successor event ID",
                self.to_event_id
            ))
        })
    }
}

/// Everything a replay produces.
#[derive(Debug, Clone)]
pub struct ReplayOutcome {
    pub mutable_state: MutableState,
    pub last_event: HistoryEvent,
    pub segments: VersionSegments,
    pub pages_read: usize,
    pub events_folded: usize,
}

/// Reads and folds history for one shard.
pub struct HistoryReplayer<'a, L: HistoryLog> {
    shard: &'a ShardContext,
    log: &'a L,
}

impl<'a, L: HistoryLog> HistoryReplayer<'a, L> {
    pub fn new(shard: &'a ShardContext, log: &'a L) -> Self {
        Self { shard, log }
    }

    /// Replay `range` of the branch into a fresh mutable state.
    pub async fn replay(
        &self,
        identity: &WorkflowIdentity,
        branch_token: &[u8],
        range: ReplayRange,
    ) -> Result<ReplayOutcome> {
        range.validate()?;
        let max_event_id = range.max_event_id()?;

        let started = Instant::now();
        let slo = &self.shard.config().settings.slo;
        let mut request = ReadHistoryBranchRequest {
            branch_token: branch_token.to_vec(),
            min_event_id: range.from_event_id,
            max_event_id,
            page_size: self.shard.config().settings.replay.page_size,
            next_page_token: None,
            shard_id: self.shard.shard_id(),
        };

        let mut state: Option<MutableState> = None;
        let mut last_event: Option<HistoryEvent> = None;
        let mut segments = VersionSegments::new();
        let mut history_size: i64 = 0;
        let mut last_first_event_id = EMPTY_EVENT_ID;
        let mut expected_event_id = range.from_event_id;
        let mut pages_read = 0;
        let mut events_folded = 0;

        loop {
            let page_started = Instant::now();
            let page = self
                .log
                .read_history_branch(request.clone())
                .await
                .map_err(|e| ResetError::read_failure(range.from_event_id, e))?;
            let page_latency = page_started.elapsed();
            pages_read += 1;
            history_size += page.size;

            metrics::record_history_page_read(page.history_events.len(), page.size, page_latency);
            if slo.is_page_read_violation(page_latency) {
                metrics::record_slo_violation("page_read", page_latency.as_millis() as u64);
                warn!(
                    workflow_id = %identity.workflow_id,
                    latency_ms = page_latency.as_millis() as u64,
                    threshold_ms = slo.max_page_read_latency_ms,
                    "History page read exceeded SLO"
                );
            }
            debug!(
                workflow_id = %identity.workflow_id,
                page = pages_read,
                events = page.history_events.len(),
                size = page.size,
                has_more = page.has_more(),
                "Read history page"
            );

            let mut first_folded_on_page = None;
            for event in &page.history_events {
                if event.event_id > range.to_event_id {
                    break;
                }
                if event.event_id != expected_event_id {
                    return Err(ResetError::malformed(format!(
                        "expected event {}, got {}",
                        expected_event_id, event.event_id
                    )));
                }

                if state.is_none() && !event.is_workflow_start() {
                    return Err(ResetError::malformed(format!(
                        "first event {} is {}, not a workflow start",
                        event.event_id,
                        event.event_type()
                    )));
                }
                let current =
                    state.get_or_insert_with(|| MutableState::new(identity, event.version));

                apply_event(current, event)?;
                trace!(event_id = event.event_id, event_type = event.event_type(), "Folded event");

                segments.observe(event.version, event.event_id);
                first_folded_on_page.get_or_insert(event.event_id);
                expected_event_id += 1;
                events_folded += 1;
                last_event = Some(event.clone());
            }

            if let (Some(first_folded), Some(last)) = (first_folded_on_page, last_event.as_ref()) {
                let reported = page.last_first_event_id;
                last_first_event_id = if reported >= first_folded && reported <= last.event_id {
                    reported
                } else {
                    first_folded
                };
            }

            if !page.has_more() {
                break;
            }
            request.next_page_token = page.next_page_token;
        }

        let (Some(mut mutable_state), Some(last_event)) = (state, last_event) else {
            return Err(ResetError::malformed(format!(
                "no events in [{}, {}]",
                range.from_event_id, range.to_event_id
            )));
        };
        if last_event.event_id != range.to_event_id {
            return Err(ResetError::malformed(format!(
                "history ends at event {} before requested event {}",
                last_event.event_id, range.to_event_id
            )));
        }

        mutable_state.execution_info.next_event_id = max_event_id;
        mutable_state.execution_info.last_first_event_id = last_first_event_id;
        mutable_state.execution_stats.history_size = history_size;

        let elapsed = started.elapsed();
        metrics::record_replay(events_folded, history_size, elapsed);
        if slo.is_replay_violation(elapsed) {
            metrics::record_slo_violation("replay", elapsed.as_millis() as u64);
            warn!(
                workflow_id = %identity.workflow_id,
                latency_ms = elapsed.as_millis() as u64,
                threshold_ms = slo.max_replay_latency_ms,
                "Replay exceeded SLO"
            );
        }

        Ok(ReplayOutcome {
            mutable_state,
            last_event,
            segments,
            pages_read,
            events_folded,
        })
    }
}

/// Request ID for a sub-entity created by replay.
///
/// Derived from the run and the initiating event so refolds agree.
fn derived_request_id(state: &MutableState, initiated_id: i64) -> String {
    format!("{}-{}", state.execution_info.run_id, initiated_id)
}

fn missing(entity: &str, id: i64, event: &HistoryEvent) -> ResetError {
    ResetError::malformed(format!(
        "{} at event {} references unknown {} {}",
        event.event_type(),
        event.event_id,
        entity,
        id
    ))
}

/// Apply one event to `state` and advance the watermark.
pub fn apply_event(state: &mut MutableState, event: &HistoryEvent) -> Result<()> {
    use EventAttributes::*;

    let event_id = event.event_id;
    let version = event.version;
    let next_event_id = event_id
        .checked_add(1)
        .ok_or_else(|| ResetError::malformed(format!("event ID {} has no successor", event_id)))?;

    match &event.attributes {
        WorkflowExecutionStarted(attrs) => {
            if event_id != FIRST_EVENT_ID || state.execution_info.next_event_id != FIRST_EVENT_ID {
                return Err(ResetError::malformed(format!(
                    "workflow start at event {}",
                    event_id
                )));
            }
            let info = &mut state.execution_info;
            info.workflow_type_name = attrs.workflow_type.clone();
            info.task_list = attrs.task_list.clone();
            info.workflow_timeout = attrs.execution_start_to_close_timeout_seconds;
            info.decision_start_to_close_timeout = attrs.task_start_to_close_timeout_seconds;
            info.creator_identity = attrs.identity.clone();
            info.attempt = attrs.attempt;
            info.search_attributes = attrs.search_attributes.clone();
            info.start_timestamp = Utc.timestamp_nanos(event.timestamp);
            info.state = WorkflowState::Running;
            if let Some(parent) = &attrs.parent {
                info.parent_domain_id = parent.domain_id.clone();
                info.parent_workflow_id = parent.workflow_id.clone();
                info.parent_run_id = parent.run_id.clone();
                info.initiated_id = parent.initiated_id;
            }
        }

        WorkflowExecutionCompleted(_) => close(state, CloseStatus::Completed, event_id),
        WorkflowExecutionFailed(_) => close(state, CloseStatus::Failed, event_id),
        WorkflowExecutionTimedOut(_) => close(state, CloseStatus::TimedOut, event_id),
        WorkflowExecutionCanceled(_) => close(state, CloseStatus::Canceled, event_id),
        WorkflowExecutionTerminated(_) => close(state, CloseStatus::Terminated, event_id),
        WorkflowExecutionContinuedAsNew(_) => close(state, CloseStatus::ContinuedAsNew, event_id),

        WorkflowExecutionSignaled(_) => {
            state.execution_info.signal_count += 1;
        }
        WorkflowExecutionCancelRequested(_) => {
            state.execution_info.cancel_requested = true;
        }
        UpsertWorkflowSearchAttributes(attrs) => {
            for (key, value) in &attrs.search_attributes {
                state
                    .execution_info
                    .search_attributes
                    .insert(key.clone(), value.clone());
            }
        }

        DecisionTaskScheduled(attrs) => {
            let info = &mut state.execution_info;
            info.decision_version = version;
            info.decision_schedule_id = event_id;
            info.decision_started_id = EMPTY_EVENT_ID;
            info.decision_request_id = EMPTY_UUID.to_string();
            info.decision_timeout = attrs.start_to_close_timeout_seconds;
            info.decision_attempt = attrs.attempt;
            info.decision_scheduled_timestamp = event.timestamp;
            info.decision_started_timestamp = 0;
        }
        DecisionTaskStarted(attrs) => {
            let info = &mut state.execution_info;
            if info.decision_schedule_id != attrs.scheduled_event_id {
                return Err(missing("decision", attrs.scheduled_event_id, event));
            }
            info.decision_started_id = event_id;
            info.decision_request_id = attrs.request_id.clone();
            info.decision_started_timestamp = event.timestamp;
        }
        DecisionTaskCompleted(attrs) => {
            let info = &mut state.execution_info;
            if info.decision_schedule_id != attrs.scheduled_event_id {
                return Err(missing("decision", attrs.scheduled_event_id, event));
            }
            info.last_processed_event = attrs.started_event_id;
            info.clear_decision();
        }
        DecisionTaskTimedOut(attrs) | DecisionTaskFailed(attrs) => {
            let info = &mut state.execution_info;
            if info.decision_schedule_id != attrs.scheduled_event_id {
                return Err(missing("decision", attrs.scheduled_event_id, event));
            }
            let attempt = info.decision_attempt + 1;
            info.clear_decision();
            info.decision_attempt = attempt;
        }

        ActivityTaskScheduled(attrs) => {
            state.activity_infos.insert(
                event_id,
                ActivityInfo {
                    version,
                    schedule_id: event_id,
                    scheduled_event_batch_id: attrs.decision_task_completed_event_id,
                    scheduled_time: event.timestamp,
                    started_id: EMPTY_EVENT_ID,
                    started_time: 0,
                    activity_id: attrs.activity_id.clone(),
                    activity_type: attrs.activity_type.clone(),
                    task_list: attrs.task_list.clone(),
                    request_id: String::new(),
                    schedule_to_start_timeout: attrs.schedule_to_start_timeout_seconds,
                    schedule_to_close_timeout: attrs.schedule_to_close_timeout_seconds,
                    start_to_close_timeout: attrs.start_to_close_timeout_seconds,
                    heartbeat_timeout: attrs.heartbeat_timeout_seconds,
                    cancel_requested: false,
                    cancel_request_id: EMPTY_EVENT_ID,
                    attempt: 0,
                },
            );
        }
        ActivityTaskStarted(attrs) => {
            let activity = state
                .activity_infos
                .get_mut(&attrs.scheduled_event_id)
                .ok_or_else(|| missing("activity", attrs.scheduled_event_id, event))?;
            activity.version = version;
            activity.started_id = event_id;
            activity.started_time = event.timestamp;
            activity.request_id = attrs.request_id.clone();
            activity.attempt = attrs.attempt;
        }
        ActivityTaskCompleted(attrs)
        | ActivityTaskFailed(attrs)
        | ActivityTaskTimedOut(attrs)
        | ActivityTaskCanceled(attrs) => {
            state
                .activity_infos
                .remove(&attrs.scheduled_event_id)
                .ok_or_else(|| missing("activity", attrs.scheduled_event_id, event))?;
        }
        ActivityTaskCancelRequested(attrs) => {
            // An invalid request is answered by a RequestCancelActivityTaskFailed event.
            if let Some(activity) = state.activity_by_id_mut(&attrs.activity_id) {
                activity.version = version;
                activity.cancel_requested = true;
                activity.cancel_request_id = event_id;
            }
        }

        TimerStarted(attrs) => {
            let fire_after = attrs
                .start_to_fire_timeout_seconds
                .saturating_mul(NANOS_PER_SECOND);
            let expiry_time = event.timestamp.saturating_add(fire_after);
            state.timer_infos.insert(
                event_id,
                TimerInfo {
                    version,
                    timer_id: attrs.timer_id.clone(),
                    started_id: event_id,
                    expiry_time,
                },
            );
        }
        TimerFired(attrs) | TimerCanceled(attrs) => {
            let timer = state
                .timer_infos
                .remove(&attrs.started_event_id)
                .ok_or_else(|| missing("timer", attrs.started_event_id, event))?;
            if timer.timer_id != attrs.timer_id {
                return Err(ResetError::malformed(format!(
                    "{} at event {} names timer {:?}, started timer is {:?}",
                    event.event_type(),
                    event_id,
                    attrs.timer_id,
                    timer.timer_id
                )));
            }
        }

        StartChildWorkflowExecutionInitiated(attrs) => {
            let create_request_id = derived_request_id(state, event_id);
            state.child_execution_infos.insert(
                event_id,
                ChildExecutionInfo {
                    version,
                    initiated_id: event_id,
                    initiated_event_batch_id: attrs.decision_task_completed_event_id,
                    started_id: EMPTY_EVENT_ID,
                    started_workflow_id: attrs.workflow_id.clone(),
                    started_run_id: String::new(),
                    create_request_id,
                    domain_name: attrs.domain.clone(),
                    workflow_type_name: attrs.workflow_type.clone(),
                },
            );
        }
        ChildWorkflowExecutionStarted(attrs) => {
            let child = state
                .child_execution_infos
                .get_mut(&attrs.initiated_event_id)
                .ok_or_else(|| missing("child", attrs.initiated_event_id, event))?;
            child.started_id = event_id;
            child.started_workflow_id = attrs.workflow_id.clone();
            child.started_run_id = attrs.run_id.clone();
        }
        StartChildWorkflowExecutionFailed(attrs)
        | ChildWorkflowExecutionCompleted(attrs)
        | ChildWorkflowExecutionFailed(attrs)
        | ChildWorkflowExecutionCanceled(attrs)
        | ChildWorkflowExecutionTimedOut(attrs)
        | ChildWorkflowExecutionTerminated(attrs) => {
            state
                .child_execution_infos
                .remove(&attrs.initiated_event_id)
                .ok_or_else(|| missing("child", attrs.initiated_event_id, event))?;
        }

        RequestCancelExternalWorkflowExecutionInitiated(attrs) => {
            let cancel_request_id = derived_request_id(state, event_id);
            state.request_cancel_infos.insert(
                event_id,
                RequestCancelInfo {
                    version,
                    initiated_id: event_id,
                    initiated_event_batch_id: attrs.decision_task_completed_event_id,
                    cancel_request_id,
                },
            );
        }
        RequestCancelExternalWorkflowExecutionFailed(attrs)
        | ExternalWorkflowExecutionCancelRequested(attrs) => {
            state
                .request_cancel_infos
                .remove(&attrs.initiated_event_id)
                .ok_or_else(|| missing("request cancel", attrs.initiated_event_id, event))?;
        }

        SignalExternalWorkflowExecutionInitiated(attrs) => {
            let signal_request_id = derived_request_id(state, event_id);
            state.signal_infos.insert(
                event_id,
                SignalInfo {
                    version,
                    initiated_id: event_id,
                    initiated_event_batch_id: attrs.decision_task_completed_event_id,
                    signal_request_id,
                    signal_name: attrs.signal_name.clone(),
                    input: attrs.input.clone(),
                    control: attrs.control.clone(),
                },
            );
        }
        SignalExternalWorkflowExecutionFailed(attrs) | ExternalWorkflowExecutionSignaled(attrs) => {
            state
                .signal_infos
                .remove(&attrs.initiated_event_id)
                .ok_or_else(|| missing("signal", attrs.initiated_event_id, event))?;
        }

        RequestCancelActivityTaskFailed(_) | CancelTimerFailed(_) | MarkerRecorded(_) => {}
    }

    let info = &mut state.execution_info;
    info.next_event_id = next_event_id;
    info.last_updated_timestamp = Utc.timestamp_nanos(event.timestamp);
    Ok(())
}

fn close(state: &mut MutableState, status: CloseStatus, event_id: i64) {
    let info = &mut state.execution_info;
    info.state = WorkflowState::Completed;
    info.close_status = status;
    info.completion_event_batch_id = event_id;
}
