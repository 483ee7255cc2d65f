use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use copydesk_core::{CacheEntry, Effect, Msg, OperationKind, RequestId, TaskFailure};
use copydesk_engine::{EngineEvent, EngineHandle, EngineStopped};
use copydesk_logging::{desk_error, desk_info, desk_warn};

use super::persistence::{self, CacheStore};

/// Executes effects against the engine and the cache store, and turns
/// engine events back into messages.
pub struct EffectRunner {
    engine: EngineHandle,
    cache: CacheStore,
    /// Requests the engine still owes a terminal event for.
    in_flight: BTreeMap<OperationKind, RequestId>,
    fact_check: Option<RequestId>,
    /// Failures synthesized for requests a stopped engine will never answer.
    orphaned: VecDeque<Msg>,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle, cache: CacheStore) -> Self {
        Self {
            engine,
            cache,
            in_flight: BTreeMap::new(),
            fact_check: None,
            orphaned: VecDeque::new(),
        }
    }

    pub fn restored_cache(&self) -> Vec<CacheEntry> {
        persistence::cached_entries(&self.cache)
    }

    pub fn run(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StartTask {
                    request_id,
                    request,
                } => {
                    let kind = request.kind();
                    desk_info!("StartTask request_id={} kind={}", request_id, kind);
                    self.in_flight.insert(kind, request_id);
                    if self.engine.start_task(request_id, request).is_err() {
                        self.orphan_in_flight();
                    }
                }
                Effect::CancelTask { kind } => {
                    desk_info!("CancelTask kind={}", kind);
                    self.in_flight.remove(&kind);
                    if let Err(err) = self.engine.cancel(kind) {
                        desk_warn!("CancelTask kind={} not delivered: {}", kind, err);
                    }
                }
                Effect::CheckClaims { request_id, text } => {
                    desk_info!("CheckClaims request_id={} text_len={}", request_id, text.len());
                    self.fact_check = Some(request_id);
                    if self.engine.check_claims(request_id, text).is_err() {
                        self.orphan_in_flight();
                    }
                }
                Effect::PersistCache { entries } => {
                    if let Err(err) = persistence::save_entries(&mut self.cache, &entries) {
                        desk_error!("Failed to persist result cache: {}", err);
                    }
                }
                Effect::DocumentChanged { section_ids } => {
                    desk_info!("Sections rewritten: {}", section_ids.join(", "));
                }
            }
        }
    }

    /// Next message for the state machine, if one arrives within `timeout`.
    /// Fails once the engine is gone and every request it owed has been
    /// failed.
    pub fn next_msg(&mut self, timeout: Duration) -> Result<Option<Msg>, EngineStopped> {
        if let Some(msg) = self.orphaned.pop_front() {
            return Ok(Some(msg));
        }
        match self.engine.recv_timeout(timeout) {
            Ok(Some(event)) => {
                self.settle(&event);
                Ok(Some(event_to_msg(event)))
            }
            Ok(None) => Ok(None),
            Err(stopped) => {
                self.orphan_in_flight();
                self.orphaned.pop_front().map(Some).ok_or(stopped)
            }
        }
    }

    pub fn shutdown(&self) {
        self.engine.shutdown();
    }

    fn settle(&mut self, event: &EngineEvent) {
        match event {
            EngineEvent::TaskCompleted {
                request_id, kind, ..
            }
            | EngineEvent::TaskFailed {
                request_id, kind, ..
            } => {
                if self.in_flight.get(kind) == Some(request_id) {
                    self.in_flight.remove(kind);
                }
            }
            EngineEvent::ClaimsChecked { request_id, .. } => {
                if self.fact_check == Some(*request_id) {
                    self.fact_check = None;
                }
            }
            EngineEvent::TaskStarted { .. } | EngineEvent::TaskProgress { .. } => {}
        }
    }

    fn orphan_in_flight(&mut self) {
        let reason = EngineStopped.to_string();
        for (kind, request_id) in std::mem::take(&mut self.in_flight) {
            desk_error!("{} request {} lost: {}", kind, request_id, reason);
            self.orphaned.push_back(Msg::TaskFailed {
                request_id,
                kind,
                failure: TaskFailure::StartFailed(reason.clone()),
            });
        }
        if let Some(request_id) = self.fact_check.take() {
            desk_error!("fact-check request {} lost: {}", request_id, reason);
            self.orphaned.push_back(Msg::FactCheckFailed {
                request_id,
                message: reason.clone(),
            });
        }
    }
}

pub(crate) fn event_to_msg(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::TaskStarted {
            request_id,
            kind,
            task_id,
        } => Msg::TaskStarted {
            request_id,
            kind,
            task_id,
        },
        EngineEvent::TaskProgress {
            request_id,
            kind,
            messages,
        } => Msg::TaskProgress {
            request_id,
            kind,
            messages,
        },
        EngineEvent::TaskCompleted {
            request_id,
            kind,
            result,
        } => Msg::TaskCompleted {
            request_id,
            kind,
            result,
        },
        EngineEvent::TaskFailed {
            request_id,
            kind,
            failure,
        } => Msg::TaskFailed {
            request_id,
            kind,
            failure,
        },
        EngineEvent::ClaimsChecked { request_id, result } => match result {
            Ok(report) => Msg::ClaimsReceived { request_id, report },
            Err(err) => Msg::FactCheckFailed {
                request_id,
                message: err.to_string(),
            },
        },
    }
}
