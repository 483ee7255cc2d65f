use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use copydesk_core::{
    OperationKind, OperationRequest, Payload, ProgressMessage, RequestId, TaskFailure, TaskId,
};
use copydesk_logging::{desk_debug, desk_error, desk_info};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::{EngineEvent, EngineStopped, PollHandler, PollSettings, TaskApi, TaskPoller};

enum EngineCommand {
    Start {
        request_id: RequestId,
        request: OperationRequest,
    },
    Cancel {
        kind: OperationKind,
    },
    CheckClaims {
        request_id: RequestId,
        text: String,
    },
    /// Sent back by a start job once the remote task exists.
    BeginPolling {
        request_id: RequestId,
        kind: OperationKind,
        task_id: TaskId,
    },
    Shutdown,
}

/// Handle to the engine thread. Clones share the same thread and event stream.
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: Arc<Mutex<mpsc::Receiver<EngineEvent>>>,
}

impl EngineHandle {
    pub fn new(api: Arc<dyn TaskApi>, settings: PollSettings) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let loop_tx = cmd_tx.clone();

        thread::spawn(move || {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(err) => {
                    desk_error!("engine runtime failed to start: {}", err);
                    return;
                }
            };
            let mut engine = Engine {
                api,
                settings,
                runtime: runtime.handle().clone(),
                cmd_tx: loop_tx,
                event_tx,
                workers: BTreeMap::new(),
            };
            while let Ok(command) = cmd_rx.recv() {
                if !engine.handle(command) {
                    break;
                }
            }
            engine.workers.clear();
            desk_info!("engine stopped");
        });

        Self {
            cmd_tx,
            event_rx: Arc::new(Mutex::new(event_rx)),
        }
    }

    pub fn start_task(
        &self,
        request_id: RequestId,
        request: OperationRequest,
    ) -> Result<(), EngineStopped> {
        self.send(EngineCommand::Start {
            request_id,
            request,
        })
    }

    pub fn cancel(&self, kind: OperationKind) -> Result<(), EngineStopped> {
        self.send(EngineCommand::Cancel { kind })
    }

    pub fn check_claims(
        &self,
        request_id: RequestId,
        text: impl Into<String>,
    ) -> Result<(), EngineStopped> {
        self.send(EngineCommand::CheckClaims {
            request_id,
            text: text.into(),
        })
    }

    /// Stops every poller and ends the engine thread. Calling it again is a no-op.
    pub fn shutdown(&self) {
        let _ = self.send(EngineCommand::Shutdown);
    }

    /// Waits up to `timeout` for the next event. `Ok(None)` means nothing
    /// arrived in time; `Err` means the engine thread is gone and no event
    /// will ever arrive.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<EngineEvent>, EngineStopped> {
        let events = self.event_rx.lock().unwrap_or_else(PoisonError::into_inner);
        match events.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(mpsc::RecvTimeoutError::Timeout) => Ok(None),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(EngineStopped),
        }
    }

    fn send(&self, command: EngineCommand) -> Result<(), EngineStopped> {
        self.cmd_tx.send(command).map_err(|_| EngineStopped)
    }
}

/// Forwards poll outcomes for one kind as engine events.
struct ChannelHandler {
    kind: OperationKind,
    request_id: AtomicU64,
    event_tx: mpsc::Sender<EngineEvent>,
}

impl PollHandler for ChannelHandler {
    type Output = Payload;

    fn decode(&self, payload: Payload) -> Result<Payload, String> {
        Ok(payload)
    }

    fn on_progress(&self, _task_id: &TaskId, messages: Vec<ProgressMessage>) {
        let _ = self.event_tx.send(EngineEvent::TaskProgress {
            request_id: self.request_id.load(Ordering::SeqCst),
            kind: self.kind,
            messages,
        });
    }

    fn on_complete(&self, task_id: &TaskId, output: Payload) {
        desk_info!("{} task {} completed", self.kind, task_id);
        let _ = self.event_tx.send(EngineEvent::TaskCompleted {
            request_id: self.request_id.load(Ordering::SeqCst),
            kind: self.kind,
            result: output,
        });
    }

    fn on_error(&self, task_id: &TaskId, failure: TaskFailure) {
        desk_info!("{} task {} failed: {}", self.kind, task_id, failure);
        let _ = self.event_tx.send(EngineEvent::TaskFailed {
            request_id: self.request_id.load(Ordering::SeqCst),
            kind: self.kind,
            failure,
        });
    }
}

struct KindWorker {
    current: Option<RequestId>,
    starting: Option<CancellationToken>,
    poller: TaskPoller<ChannelHandler>,
}

impl KindWorker {
    fn supersede(&mut self) {
        if let Some(token) = self.starting.take() {
            token.cancel();
        }
        self.poller.stop();
        self.current = None;
    }
}

struct Engine {
    api: Arc<dyn TaskApi>,
    settings: PollSettings,
    runtime: Handle,
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_tx: mpsc::Sender<EngineEvent>,
    workers: BTreeMap<OperationKind, KindWorker>,
}

impl Engine {
    /// Applies one command; returns `false` once the engine should exit.
    fn handle(&mut self, command: EngineCommand) -> bool {
        match command {
            EngineCommand::Start {
                request_id,
                request,
            } => self.start(request_id, request),
            EngineCommand::Cancel { kind } => {
                if let Some(worker) = self.workers.get_mut(&kind) {
                    desk_debug!("cancelling {} work", kind);
                    worker.supersede();
                }
            }
            EngineCommand::CheckClaims { request_id, text } => {
                let api = self.api.clone();
                let event_tx = self.event_tx.clone();
                self.runtime.spawn(async move {
                    let result = api.check_claims(&text).await;
                    let _ = event_tx.send(EngineEvent::ClaimsChecked { request_id, result });
                });
            }
            EngineCommand::BeginPolling {
                request_id,
                kind,
                task_id,
            } => {
                let Some(worker) = self.workers.get_mut(&kind) else {
                    return true;
                };
                if worker.current != Some(request_id) {
                    desk_debug!("task {} belongs to a superseded {} request", task_id, kind);
                    return true;
                }
                worker.starting = None;
                worker
                    .poller
                    .handler()
                    .request_id
                    .store(request_id, Ordering::SeqCst);
                worker.poller.start(task_id);
            }
            EngineCommand::Shutdown => return false,
        }
        true
    }

    fn start(&mut self, request_id: RequestId, request: OperationRequest) {
        let kind = request.kind();
        let worker = self.worker(kind);
        worker.supersede();
        let token = CancellationToken::new();
        worker.current = Some(request_id);
        worker.starting = Some(token.clone());

        let api = self.api.clone();
        let event_tx = self.event_tx.clone();
        let cmd_tx = self.cmd_tx.clone();
        self.runtime.spawn(async move {
            let started = tokio::select! {
                _ = token.cancelled() => return,
                started = api.start_task(&request) => started,
            };
            if token.is_cancelled() {
                return;
            }
            match started {
                Ok(task_id) => {
                    let _ = event_tx.send(EngineEvent::TaskStarted {
                        request_id,
                        kind,
                        task_id: task_id.clone(),
                    });
                    let _ = cmd_tx.send(EngineCommand::BeginPolling {
                        request_id,
                        kind,
                        task_id,
                    });
                }
                Err(err) => {
                    let _ = event_tx.send(EngineEvent::TaskFailed {
                        request_id,
                        kind,
                        failure: TaskFailure::StartFailed(err.to_string()),
                    });
                }
            }
        });
    }

    fn worker(&mut self, kind: OperationKind) -> &mut KindWorker {
        let api = &self.api;
        let settings = self.settings;
        let runtime = &self.runtime;
        let event_tx = &self.event_tx;
        self.workers.entry(kind).or_insert_with(|| KindWorker {
            current: None,
            starting: None,
            poller: TaskPoller::new(
                api.clone(),
                Arc::new(ChannelHandler {
                    kind,
                    request_id: AtomicU64::new(0),
                    event_tx: event_tx.clone(),
                }),
                settings,
                runtime.clone(),
            ),
        })
    }
}
