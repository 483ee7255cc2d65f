#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use copydesk_core::{
    ClaimReport, OperationRequest, Payload, ProgressMessage, TaskId, TaskStatus, TaskStatusReport,
};
use copydesk_engine::{ApiError, FailureKind, TaskApi};
use tokio::sync::Notify;

pub enum Reply {
    Report(TaskStatusReport),
    Fail(ApiError),
    /// Parks the call until the notify fires.
    Held(Arc<Notify>, TaskStatusReport),
}

pub enum StartReply {
    Id(&'static str),
    Held(Arc<Notify>, &'static str),
    Fail(ApiError),
}

pub fn report(
    task_id: &str,
    status: TaskStatus,
    messages: &[(&str, &str)],
    result: Option<Payload>,
) -> TaskStatusReport {
    TaskStatusReport {
        task_id: TaskId::new(task_id),
        status,
        progress_messages: messages
            .iter()
            .map(|(timestamp, message)| ProgressMessage::new(*timestamp, *message))
            .collect(),
        result,
        error: None,
    }
}

pub fn network_error(message: &str) -> ApiError {
    ApiError {
        kind: FailureKind::Network,
        message: message.to_string(),
    }
}

/// In-memory `TaskApi` answering from per-task scripts. Unscripted polls
/// report the task as still running.
#[derive(Default)]
pub struct ScriptedApi {
    statuses: Mutex<HashMap<TaskId, VecDeque<Reply>>>,
    starts: Mutex<VecDeque<StartReply>>,
    claims: Mutex<Option<Result<ClaimReport, ApiError>>>,
    pub started: Mutex<Vec<OperationRequest>>,
    pub polls: AtomicUsize,
    pub held: AtomicUsize,
}

impl ScriptedApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, task_id: &str, replies: Vec<Reply>) {
        self.statuses
            .lock()
            .unwrap()
            .insert(TaskId::new(task_id), replies.into());
    }

    pub fn queue_start(&self, reply: StartReply) {
        self.starts.lock().unwrap().push_back(reply);
    }

    pub fn set_claims(&self, result: Result<ClaimReport, ApiError>) {
        *self.claims.lock().unwrap() = Some(result);
    }

    pub fn held_calls(&self) -> usize {
        self.held.load(Ordering::SeqCst)
    }

    async fn park(&self, gate: &Notify) {
        self.held.fetch_add(1, Ordering::SeqCst);
        gate.notified().await;
        self.held.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl TaskApi for ScriptedApi {
    async fn start_task(&self, request: &OperationRequest) -> Result<TaskId, ApiError> {
        self.started.lock().unwrap().push(request.clone());
        let reply = self.starts.lock().unwrap().pop_front();
        match reply {
            Some(StartReply::Id(id)) => Ok(TaskId::new(id)),
            Some(StartReply::Held(gate, id)) => {
                self.park(&gate).await;
                Ok(TaskId::new(id))
            }
            Some(StartReply::Fail(err)) => Err(err),
            None => Err(ApiError {
                kind: FailureKind::HttpStatus(503),
                message: "no scripted start".to_string(),
            }),
        }
    }

    async fn poll_task_status(&self, task_id: &TaskId) -> Result<TaskStatusReport, ApiError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let reply = self
            .statuses
            .lock()
            .unwrap()
            .get_mut(task_id)
            .and_then(VecDeque::pop_front);
        match reply {
            Some(Reply::Report(report)) => Ok(report),
            Some(Reply::Fail(err)) => Err(err),
            Some(Reply::Held(gate, report)) => {
                self.park(&gate).await;
                Ok(report)
            }
            None => Ok(report(task_id.as_str(), TaskStatus::Running, &[], None)),
        }
    }

    async fn check_claims(&self, _content: &str) -> Result<ClaimReport, ApiError> {
        let result = self.claims.lock().unwrap().clone();
        result.unwrap_or_else(|| Ok(ClaimReport::default()))
    }
}

/// Polls `condition` for up to two seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..400 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
