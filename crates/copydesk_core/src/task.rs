use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque result payload, interpreted by whoever started the task.
pub type Payload = serde_json::Value;

/// Opaque identifier assigned by the remote system when a task starts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Error,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Error)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProgressMessage {
    pub timestamp: String,
    pub message: String,
}

impl ProgressMessage {
    pub fn new(timestamp: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            message: message.into(),
        }
    }
}

/// Status document returned by the remote status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusReport {
    pub task_id: TaskId,
    pub status: TaskStatus,
    #[serde(default)]
    pub progress_messages: Vec<ProgressMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Payload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskFailure {
    #[error("task failed: {0}")]
    Remote(String),
    #[error("status fetch failed {attempts} times in a row: {last_error}")]
    TransportBudgetExhausted { attempts: u32, last_error: String },
    #[error("task did not finish within {polls} polls")]
    PollBudgetExhausted { polls: u32 },
    #[error("could not decode task result: {0}")]
    Decode(String),
    #[error("task could not be started: {0}")]
    StartFailed(String),
}

/// Append-only progress history, de-duplicated by `(timestamp, message)`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgressLog {
    messages: Vec<ProgressMessage>,
    seen: HashSet<ProgressMessage>,
}

impl ProgressLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends every message not recorded yet and returns the new ones, in
    /// the order they were offered.
    pub fn merge(&mut self, incoming: &[ProgressMessage]) -> Vec<ProgressMessage> {
        let mut added = Vec::new();
        for message in incoming {
            if self.seen.insert(message.clone()) {
                self.messages.push(message.clone());
                added.push(message.clone());
            }
        }
        added
    }

    pub fn messages(&self) -> &[ProgressMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn latest(&self) -> Option<&ProgressMessage> {
        self.messages.last()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollBudget {
    /// Consecutive transport failures tolerated before giving up.
    pub max_transient_failures: u32,
    /// Upper bound on status fetches for one task; `None` polls forever.
    pub max_polls: Option<u32>,
}

impl Default for PollBudget {
    fn default() -> Self {
        Self {
            max_transient_failures: 3,
            max_polls: None,
        }
    }
}

/// Decision taken after one status fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum PollStep {
    Continue {
        new_messages: Vec<ProgressMessage>,
    },
    Completed {
        new_messages: Vec<ProgressMessage>,
        result: Payload,
    },
    Failed {
        new_messages: Vec<ProgressMessage>,
        failure: TaskFailure,
    },
}

impl PollStep {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollStep::Continue { .. })
    }

    pub fn new_messages(&self) -> &[ProgressMessage] {
        match self {
            PollStep::Continue { new_messages }
            | PollStep::Completed { new_messages, .. }
            | PollStep::Failed { new_messages, .. } => new_messages,
        }
    }
}

/// Pure bookkeeping for one polled task: progress de-duplication, the
/// transient failure budget and terminal detection.
#[derive(Debug, Clone)]
pub struct PollTracker {
    budget: PollBudget,
    progress: ProgressLog,
    consecutive_failures: u32,
    polls: u32,
    finished: bool,
}

impl PollTracker {
    pub fn new(budget: PollBudget) -> Self {
        Self {
            budget,
            progress: ProgressLog::new(),
            consecutive_failures: 0,
            polls: 0,
            finished: false,
        }
    }

    pub fn progress(&self) -> &ProgressLog {
        &self.progress
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn observe(&mut self, report: TaskStatusReport) -> PollStep {
        self.polls += 1;
        self.consecutive_failures = 0;
        let new_messages = self.progress.merge(&report.progress_messages);

        let step = match report.status {
            TaskStatus::Pending | TaskStatus::Running => self.check_poll_budget(new_messages),
            TaskStatus::Completed => PollStep::Completed {
                new_messages,
                result: report.result.unwrap_or(Payload::Null),
            },
            TaskStatus::Error => PollStep::Failed {
                new_messages,
                failure: TaskFailure::Remote(
                    report
                        .error
                        .unwrap_or_else(|| "task failed without an error message".to_string()),
                ),
            },
        };
        self.finished = step.is_terminal();
        step
    }

    pub fn observe_transport_failure(&mut self, message: impl Into<String>) -> PollStep {
        self.polls += 1;
        self.consecutive_failures += 1;
        let step = if self.consecutive_failures > self.budget.max_transient_failures {
            PollStep::Failed {
                new_messages: Vec::new(),
                failure: TaskFailure::TransportBudgetExhausted {
                    attempts: self.consecutive_failures,
                    last_error: message.into(),
                },
            }
        } else {
            self.check_poll_budget(Vec::new())
        };
        self.finished = step.is_terminal();
        step
    }

    fn check_poll_budget(&self, new_messages: Vec<ProgressMessage>) -> PollStep {
        match self.budget.max_polls {
            Some(limit) if self.polls >= limit => PollStep::Failed {
                new_messages,
                failure: TaskFailure::PollBudgetExhausted { polls: self.polls },
            },
            _ => PollStep::Continue { new_messages },
        }
    }
}
