//! History event builders and seed fixtures.

use chrono::{TimeZone, Utc};
use history_conflict_resolver::event::*;
use history_conflict_resolver::state::{ExecutionInfo, WorkflowIdentity};

use super::DOMAIN_ID;

pub const BRANCH_TOKEN: &[u8] = b"some random branch token";
pub const WORKFLOW_ID: &str = "some random workflow ID";
pub const RUN_ID: &str = "some random run ID";
pub const PREV_RUN_ID: &str = "some random prev run ID";
pub const TASK_LIST: &str = "T";

pub fn identity() -> WorkflowIdentity {
    WorkflowIdentity::new(DOMAIN_ID, WORKFLOW_ID, RUN_ID)
}

/// Seed execution info a caller hands to `reset`.
pub fn seed_execution_info() -> ExecutionInfo {
    let mut seed = ExecutionInfo::new(&identity());
    seed.branch_token = BRANCH_TOKEN.to_vec();
    seed.start_timestamp = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    seed.last_updated_timestamp = Utc.timestamp_opt(1_700_000_500, 0).unwrap();
    seed
}

pub fn start_event(version: i64) -> HistoryEvent {
    HistoryEvent::new(
        FIRST_EVENT_ID,
        version,
        EventAttributes::WorkflowExecutionStarted(Box::new(WorkflowExecutionStartedAttributes {
            workflow_type: "some random workflow type".to_string(),
            task_list: TASK_LIST.to_string(),
            input: b"some random input".to_vec(),
            execution_start_to_close_timeout_seconds: 123,
            task_start_to_close_timeout_seconds: 233,
            identity: "some random identity".to_string(),
            ..Default::default()
        })),
    )
    .at(1_000)
}

pub fn decision_scheduled(event_id: i64, version: i64) -> HistoryEvent {
    HistoryEvent::new(
        event_id,
        version,
        EventAttributes::DecisionTaskScheduled(DecisionTaskScheduledAttributes {
            task_list: TASK_LIST.to_string(),
            start_to_close_timeout_seconds: 233,
            attempt: 0,
        }),
    )
}

pub fn decision_started(event_id: i64, version: i64, scheduled_event_id: i64) -> HistoryEvent {
    HistoryEvent::new(
        event_id,
        version,
        EventAttributes::DecisionTaskStarted(DecisionTaskStartedAttributes {
            scheduled_event_id,
            request_id: format!("decision-{}", scheduled_event_id),
            identity: "worker".to_string(),
        }),
    )
}

pub fn decision_completed(event_id: i64, version: i64, scheduled_event_id: i64) -> HistoryEvent {
    HistoryEvent::new(
        event_id,
        version,
        EventAttributes::DecisionTaskCompleted(DecisionTaskClosedAttributes {
            scheduled_event_id,
            started_event_id: scheduled_event_id + 1,
        }),
    )
}

pub fn activity_scheduled(
    event_id: i64,
    version: i64,
    activity_id: &str,
    completed_id: i64,
) -> HistoryEvent {
    HistoryEvent::new(
        event_id,
        version,
        EventAttributes::ActivityTaskScheduled(ActivityTaskScheduledAttributes {
            activity_id: activity_id.to_string(),
            activity_type: "some activity".to_string(),
            task_list: TASK_LIST.to_string(),
            schedule_to_close_timeout_seconds: 60,
            schedule_to_start_timeout_seconds: 10,
            start_to_close_timeout_seconds: 50,
            heartbeat_timeout_seconds: 5,
            decision_task_completed_event_id: completed_id,
        }),
    )
}

pub fn activity_completed(event_id: i64, version: i64, scheduled_event_id: i64) -> HistoryEvent {
    HistoryEvent::new(
        event_id,
        version,
        EventAttributes::ActivityTaskCompleted(ActivityTaskClosedAttributes {
            scheduled_event_id,
            started_event_id: scheduled_event_id + 1,
        }),
    )
}

pub fn timer_started(
    event_id: i64,
    version: i64,
    timer_id: &str,
    completed_id: i64,
) -> HistoryEvent {
    HistoryEvent::new(
        event_id,
        version,
        EventAttributes::TimerStarted(TimerStartedAttributes {
            timer_id: timer_id.to_string(),
            start_to_fire_timeout_seconds: 30,
            decision_task_completed_event_id: completed_id,
        }),
    )
}

pub fn workflow_completed(event_id: i64, version: i64, completed_id: i64) -> HistoryEvent {
    HistoryEvent::new(
        event_id,
        version,
        EventAttributes::WorkflowExecutionCompleted(WorkflowExecutionClosedAttributes {
            decision_task_completed_event_id: completed_id,
            details: b"some random result".to_vec(),
        }),
    )
}

pub fn marker(event_id: i64, version: i64) -> HistoryEvent {
    HistoryEvent::new(
        event_id,
        version,
        EventAttributes::MarkerRecorded(MarkerRecordedAttributes {
            marker_name: "some marker".to_string(),
            details: Vec::new(),
        }),
    )
}

/// A start event followed by markers, one per entry of `versions`.
///
/// Event `i + 1` carries `versions[i]`; the first version goes on the start event.
pub fn history_with_versions(versions: &[i64]) -> Vec<HistoryEvent> {
    versions
        .iter()
        .enumerate()
        .map(|(i, version)| {
            let event_id = i as i64 + 1;
            if event_id == FIRST_EVENT_ID {
                start_event(*version)
            } else {
                marker(event_id, *version)
            }
        })
        .collect()
}

/// Start (event 1, version 12) plus a scheduled decision (event 2).
pub fn scenario_history() -> Vec<HistoryEvent> {
    vec![start_event(12), decision_scheduled(2, 12)]
}
