use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use copydesk_core::{Payload, PollBudget, PollStep, PollTracker, ProgressMessage, TaskFailure, TaskId};
use copydesk_logging::{desk_debug, desk_warn};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::TaskApi;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub budget: PollBudget,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            budget: PollBudget::default(),
        }
    }
}

/// Receives the outcome of a polled task.
///
/// Callbacks run on a runtime worker while the poller's dispatch gate is
/// held, so they should hand work off quickly (for example over a channel)
/// and must not call back into the owning [`TaskPoller`].
pub trait PollHandler: Send + Sync + 'static {
    type Output: Send;

    fn decode(&self, payload: Payload) -> Result<Self::Output, String>;

    fn on_progress(&self, task_id: &TaskId, messages: Vec<ProgressMessage>);

    fn on_complete(&self, task_id: &TaskId, output: Self::Output);

    fn on_error(&self, task_id: &TaskId, failure: TaskFailure);
}

struct ActivePoll {
    task_id: TaskId,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Polls one remote task at a time and reports through a [`PollHandler`].
pub struct TaskPoller<H: PollHandler> {
    api: Arc<dyn TaskApi>,
    handler: Arc<H>,
    settings: PollSettings,
    runtime: Handle,
    /// Generation of the loop allowed to deliver callbacks.
    gate: Arc<Mutex<u64>>,
    active: Option<ActivePoll>,
}

impl<H: PollHandler> TaskPoller<H> {
    pub fn new(api: Arc<dyn TaskApi>, handler: Arc<H>, settings: PollSettings, runtime: Handle) -> Self {
        Self {
            api,
            handler,
            settings,
            runtime,
            gate: Arc::new(Mutex::new(0)),
            active: None,
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Begins polling `task_id`, stopping any loop already running.
    pub fn start(&mut self, task_id: TaskId) {
        self.stop();
        let generation = *self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        let cancel = CancellationToken::new();
        desk_debug!("polling task {} every {:?}", task_id, self.settings.interval);

        let handle = self.runtime.spawn(poll_loop(
            self.api.clone(),
            self.handler.clone(),
            self.settings,
            self.gate.clone(),
            generation,
            task_id.clone(),
            cancel.clone(),
        ));
        self.active = Some(ActivePoll {
            task_id,
            cancel,
            handle,
        });
    }

    /// Stops the active loop. Once this returns no callback from that loop
    /// will run, even if its in-flight fetch resolves later.
    pub fn stop(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        active.cancel.cancel();
        // Waits for a callback in progress, then closes the gate on that loop.
        *self.gate.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        active.handle.abort();
        desk_debug!("stopped polling task {}", active.task_id);
    }

    pub fn is_polling(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| !active.handle.is_finished())
    }

    pub fn task_id(&self) -> Option<&TaskId> {
        self.active.as_ref().map(|active| &active.task_id)
    }
}

impl<H: PollHandler> Drop for TaskPoller<H> {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll_loop<H: PollHandler>(
    api: Arc<dyn TaskApi>,
    handler: Arc<H>,
    settings: PollSettings,
    gate: Arc<Mutex<u64>>,
    generation: u64,
    task_id: TaskId,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(settings.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut tracker = PollTracker::new(settings.budget);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }
        let fetched = tokio::select! {
            _ = cancel.cancelled() => return,
            fetched = api.poll_task_status(&task_id) => fetched,
        };

        let step = match fetched {
            Ok(report) => tracker.observe(report),
            Err(err) => {
                desk_warn!("status fetch for task {} failed: {}", task_id, err);
                tracker.observe_transport_failure(err.to_string())
            }
        };
        let finished = step.is_terminal();
        let delivered = dispatch(&gate, generation, || deliver(handler.as_ref(), &task_id, step));
        if !delivered || finished {
            return;
        }
    }
}

/// Runs `callback` only while `generation` is still current; returns whether it ran.
fn dispatch(gate: &Mutex<u64>, generation: u64, callback: impl FnOnce()) -> bool {
    let current = gate.lock().unwrap_or_else(PoisonError::into_inner);
    if *current != generation {
        return false;
    }
    callback();
    true
}

fn deliver<H: PollHandler>(handler: &H, task_id: &TaskId, step: PollStep) {
    match step {
        PollStep::Continue { new_messages } => {
            if !new_messages.is_empty() {
                handler.on_progress(task_id, new_messages);
            }
        }
        PollStep::Completed {
            new_messages,
            result,
        } => {
            if !new_messages.is_empty() {
                handler.on_progress(task_id, new_messages);
            }
            match handler.decode(result) {
                Ok(output) => handler.on_complete(task_id, output),
                Err(message) => handler.on_error(task_id, TaskFailure::Decode(message)),
            }
        }
        PollStep::Failed {
            new_messages,
            failure,
        } => {
            if !new_messages.is_empty() {
                handler.on_progress(task_id, new_messages);
            }
            handler.on_error(task_id, failure);
        }
    }
}
