//! History events as read from the durable log.
//!
//! A [`HistoryEvent`] is immutable once appended. Its payload is the tagged
//! union [`EventAttributes`]; the replayer folds events with an exhaustive
//! match over it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Event ID of the first event of every run.
pub const FIRST_EVENT_ID: i64 = 1;

/// A single event in a run's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEvent {
    /// Strictly increasing per run, starting at [`FIRST_EVENT_ID`].
    pub event_id: i64,
    /// Failover version of the region that produced the event.
    pub version: i64,
    /// Unix nanoseconds.
    pub timestamp: i64,
    pub attributes: EventAttributes,
}

impl HistoryEvent {
    pub fn new(event_id: i64, version: i64, attributes: EventAttributes) -> Self {
        Self {
            event_id,
            version,
            timestamp: 0,
            attributes,
        }
    }

    /// Set the event timestamp (unix nanos).
    pub fn at(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn is_workflow_start(&self) -> bool {
        matches!(self.attributes, EventAttributes::WorkflowExecutionStarted(_))
    }

    pub fn event_type(&self) -> &'static str {
        self.attributes.event_type()
    }
}

/// Reference to another workflow execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRef {
    pub domain: String,
    pub workflow_id: String,
    pub run_id: String,
}

/// Parent linkage recorded on a child's start event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentExecution {
    pub domain_id: String,
    pub workflow_id: String,
    pub run_id: String,
    pub initiated_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowExecutionStartedAttributes {
    pub workflow_type: String,
    pub task_list: String,
    pub input: Vec<u8>,
    pub execution_start_to_close_timeout_seconds: i32,
    pub task_start_to_close_timeout_seconds: i32,
    pub identity: String,
    pub parent: Option<ParentExecution>,
    pub attempt: i32,
    pub search_attributes: BTreeMap<String, Vec<u8>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionTaskScheduledAttributes {
    pub task_list: String,
    pub start_to_close_timeout_seconds: i32,
    pub attempt: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionTaskStartedAttributes {
    pub scheduled_event_id: i64,
    pub request_id: String,
    pub identity: String,
}

/// Shared by completed, timed-out and failed decision events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionTaskClosedAttributes {
    pub scheduled_event_id: i64,
    pub started_event_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityTaskScheduledAttributes {
    pub activity_id: String,
    pub activity_type: String,
    pub task_list: String,
    pub schedule_to_close_timeout_seconds: i32,
    pub schedule_to_start_timeout_seconds: i32,
    pub start_to_close_timeout_seconds: i32,
    pub heartbeat_timeout_seconds: i32,
    pub decision_task_completed_event_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityTaskStartedAttributes {
    pub scheduled_event_id: i64,
    pub request_id: String,
    pub identity: String,
    pub attempt: i32,
}

/// Shared by completed, failed, timed-out and canceled activity events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityTaskClosedAttributes {
    pub scheduled_event_id: i64,
    pub started_event_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityTaskCancelRequestedAttributes {
    pub activity_id: String,
    pub decision_task_completed_event_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerStartedAttributes {
    pub timer_id: String,
    pub start_to_fire_timeout_seconds: i64,
    pub decision_task_completed_event_id: i64,
}

/// Shared by fired and canceled timer events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerClosedAttributes {
    pub timer_id: String,
    pub started_event_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartChildWorkflowExecutionInitiatedAttributes {
    pub domain: String,
    pub workflow_id: String,
    pub workflow_type: String,
    pub task_list: String,
    pub decision_task_completed_event_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildWorkflowExecutionStartedAttributes {
    pub initiated_event_id: i64,
    pub workflow_id: String,
    pub run_id: String,
}

/// Any event that resolves an earlier initiated event: child closes,
/// external cancel/signal outcomes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiatedOutcomeAttributes {
    pub initiated_event_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCancelExternalInitiatedAttributes {
    pub target: ExecutionRef,
    pub control: Vec<u8>,
    pub decision_task_completed_event_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalExternalInitiatedAttributes {
    pub target: ExecutionRef,
    pub signal_name: String,
    pub input: Vec<u8>,
    pub control: Vec<u8>,
    pub decision_task_completed_event_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowExecutionSignaledAttributes {
    pub signal_name: String,
    pub input: Vec<u8>,
    pub identity: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowExecutionCancelRequestedAttributes {
    pub cause: String,
    pub identity: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertSearchAttributesAttributes {
    pub search_attributes: BTreeMap<String, Vec<u8>>,
}

/// Shared by every event that closes the workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowExecutionClosedAttributes {
    pub decision_task_completed_event_id: i64,
    pub details: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerRecordedAttributes {
    pub marker_name: String,
    pub details: Vec<u8>,
}

/// Typed event payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventAttributes {
    WorkflowExecutionStarted(Box<WorkflowExecutionStartedAttributes>),
    WorkflowExecutionCompleted(WorkflowExecutionClosedAttributes),
    WorkflowExecutionFailed(WorkflowExecutionClosedAttributes),
    WorkflowExecutionTimedOut(WorkflowExecutionClosedAttributes),
    WorkflowExecutionCanceled(WorkflowExecutionClosedAttributes),
    WorkflowExecutionTerminated(WorkflowExecutionClosedAttributes),
    WorkflowExecutionContinuedAsNew(WorkflowExecutionClosedAttributes),
    WorkflowExecutionSignaled(WorkflowExecutionSignaledAttributes),
    WorkflowExecutionCancelRequested(WorkflowExecutionCancelRequestedAttributes),
    UpsertWorkflowSearchAttributes(UpsertSearchAttributesAttributes),
    DecisionTaskScheduled(DecisionTaskScheduledAttributes),
    DecisionTaskStarted(DecisionTaskStartedAttributes),
    DecisionTaskCompleted(DecisionTaskClosedAttributes),
    DecisionTaskTimedOut(DecisionTaskClosedAttributes),
    DecisionTaskFailed(DecisionTaskClosedAttributes),
    ActivityTaskScheduled(ActivityTaskScheduledAttributes),
    ActivityTaskStarted(ActivityTaskStartedAttributes),
    ActivityTaskCompleted(ActivityTaskClosedAttributes),
    ActivityTaskFailed(ActivityTaskClosedAttributes),
    ActivityTaskTimedOut(ActivityTaskClosedAttributes),
    ActivityTaskCanceled(ActivityTaskClosedAttributes),
    ActivityTaskCancelRequested(ActivityTaskCancelRequestedAttributes),
    RequestCancelActivityTaskFailed(ActivityTaskCancelRequestedAttributes),
    TimerStarted(TimerStartedAttributes),
    TimerFired(TimerClosedAttributes),
    TimerCanceled(TimerClosedAttributes),
    CancelTimerFailed(TimerClosedAttributes),
    StartChildWorkflowExecutionInitiated(StartChildWorkflowExecutionInitiatedAttributes),
    StartChildWorkflowExecutionFailed(InitiatedOutcomeAttributes),
    ChildWorkflowExecutionStarted(ChildWorkflowExecutionStartedAttributes),
    ChildWorkflowExecutionCompleted(InitiatedOutcomeAttributes),
    ChildWorkflowExecutionFailed(InitiatedOutcomeAttributes),
    ChildWorkflowExecutionCanceled(InitiatedOutcomeAttributes),
    ChildWorkflowExecutionTimedOut(InitiatedOutcomeAttributes),
    ChildWorkflowExecutionTerminated(InitiatedOutcomeAttributes),
    RequestCancelExternalWorkflowExecutionInitiated(RequestCancelExternalInitiatedAttributes),
    RequestCancelExternalWorkflowExecutionFailed(InitiatedOutcomeAttributes),
    ExternalWorkflowExecutionCancelRequested(InitiatedOutcomeAttributes),
    SignalExternalWorkflowExecutionInitiated(SignalExternalInitiatedAttributes),
    SignalExternalWorkflowExecutionFailed(InitiatedOutcomeAttributes),
    ExternalWorkflowExecutionSignaled(InitiatedOutcomeAttributes),
    MarkerRecorded(MarkerRecordedAttributes),
}

impl EventAttributes {
    /// Event type name for logging and metrics.
    pub fn event_type(&self) -> &'static str {
        use EventAttributes::*;
        match self {
            WorkflowExecutionStarted(_) => "WorkflowExecutionStarted",
            WorkflowExecutionCompleted(_) => "WorkflowExecutionCompleted",
            WorkflowExecutionFailed(_) => "WorkflowExecutionFailed",
            WorkflowExecutionTimedOut(_) => "WorkflowExecutionTimedOut",
            WorkflowExecutionCanceled(_) => "WorkflowExecutionCanceled",
            WorkflowExecutionTerminated(_) => "WorkflowExecutionTerminated",
            WorkflowExecutionContinuedAsNew(_) => "WorkflowExecutionContinuedAsNew",
            WorkflowExecutionSignaled(_) => "WorkflowExecutionSignaled",
            WorkflowExecutionCancelRequested(_) => "WorkflowExecutionCancelRequested",
            UpsertWorkflowSearchAttributes(_) => "UpsertWorkflowSearchAttributes",
            DecisionTaskScheduled(_) => "DecisionTaskScheduled",
            DecisionTaskStarted(_) => "DecisionTaskStarted",
            DecisionTaskCompleted(_) => "DecisionTaskCompleted",
            DecisionTaskTimedOut(_) => "DecisionTaskTimedOut",
            DecisionTaskFailed(_) => "DecisionTaskFailed",
            ActivityTaskScheduled(_) => "ActivityTaskScheduled",
            ActivityTaskStarted(_) => "ActivityTaskStarted",
            ActivityTaskCompleted(_) => "ActivityTaskCompleted",
            ActivityTaskFailed(_) => "ActivityTaskFailed",
            ActivityTaskTimedOut(_) => "ActivityTaskTimedOut",
            ActivityTaskCanceled(_) => "ActivityTaskCanceled",
            ActivityTaskCancelRequested(_) => "ActivityTaskCancelRequested",
            RequestCancelActivityTaskFailed(_) => "RequestCancelActivityTaskFailed",
            TimerStarted(_) => "TimerStarted",
            TimerFired(_) => "TimerFired",
            TimerCanceled(_) => "TimerCanceled",
            CancelTimerFailed(_) => "CancelTimerFailed",
            StartChildWorkflowExecutionInitiated(_) => "StartChildWorkflowExecutionInitiated",
            StartChildWorkflowExecutionFailed(_) => "StartChildWorkflowExecutionFailed",
            ChildWorkflowExecutionStarted(_) => "ChildWorkflowExecutionStarted",
            ChildWorkflowExecutionCompleted(_) => "ChildWorkflowExecutionCompleted",
            ChildWorkflowExecutionFailed(_) => "ChildWorkflowExecutionFailed",
            ChildWorkflowExecutionCanceled(_) => "ChildWorkflowExecutionCanceled",
            ChildWorkflowExecutionTimedOut(_) => "ChildWorkflowExecutionTimedOut",
            ChildWorkflowExecutionTerminated(_) => "ChildWorkflowExecutionTerminated",
            RequestCancelExternalWorkflowExecutionInitiated(_) => {
                "RequestCancelExternalWorkflowExecutionInitiated"
            }
            RequestCancelExternalWorkflowExecutionFailed(_) => {
                "RequestCancelExternalWorkflowExecutionFailed"
            }
            ExternalWorkflowExecutionCancelRequested(_) => {
                "ExternalWorkflowExecutionCancelRequested"
            }
            SignalExternalWorkflowExecutionInitiated(_) => {
                "SignalExternalWorkflowExecutionInitiated"
            }
            SignalExternalWorkflowExecutionFailed(_) => "SignalExternalWorkflowExecutionFailed",
            ExternalWorkflowExecutionSignaled(_) => "ExternalWorkflowExecutionSignaled",
            MarkerRecorded(_) => "MarkerRecorded",
        }
    }
}
