use std::fmt;

use copydesk_core::{
    ClaimReport, OperationKind, Payload, ProgressMessage, RequestId, TaskFailure, TaskId,
};

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    TaskStarted {
        request_id: RequestId,
        kind: OperationKind,
        task_id: TaskId,
    },
    TaskProgress {
        request_id: RequestId,
        kind: OperationKind,
        messages: Vec<ProgressMessage>,
    },
    TaskCompleted {
        request_id: RequestId,
        kind: OperationKind,
        result: Payload,
    },
    TaskFailed {
        request_id: RequestId,
        kind: OperationKind,
        failure: TaskFailure,
    },
    ClaimsChecked {
        request_id: RequestId,
        result: Result<ClaimReport, ApiError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: FailureKind,
    pub message: String,
}

impl ApiError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// The engine thread has exited; commands are no longer delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("engine is not running")]
pub struct EngineStopped;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    Decode,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Decode => write!(f, "unexpected response body"),
        }
    }
}
