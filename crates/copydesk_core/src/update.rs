use copydesk_logging::{desk_debug, desk_info};

use crate::document::strip_heading_lines;
use crate::state::{ClaimPreview, PendingFix, SlotPhase, TaskSlot};
use crate::{apply_patch, cite, diff, AppState, ClaimLocator, Effect, Msg, OperationRequest};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::DocumentLoaded(document) => {
            state.replace_document(document);
            state.set_claims(Vec::new());
            state.set_preview(None);
            state.set_fact_check_request(None);
            Vec::new()
        }
        Msg::SectionEdited {
            section_id,
            content,
        } => {
            if state.document_mut().set_section_content(&section_id, content) {
                state.bump_revision();
                // Any pending fix was computed against the old text.
                state.set_preview(None);
            } else {
                state.set_error(format!("no section with id {section_id}"));
            }
            Vec::new()
        }
        Msg::OperationRequested(request) => request_operation(&mut state, request),
        Msg::CancelOperation(kind) => {
            if state.is_active(kind) {
                if let Some(slot) = state.slot(kind).cloned() {
                    state.put_slot(
                        kind,
                        TaskSlot {
                            phase: SlotPhase::Cancelled,
                            ..slot
                        },
                    );
                }
                vec![Effect::CancelTask { kind }]
            } else {
                Vec::new()
            }
        }
        Msg::TaskStarted {
            request_id,
            kind,
            task_id,
        } => {
            if let Some(slot) = state.current_slot_mut(kind, request_id) {
                if slot.phase == SlotPhase::Starting {
                    desk_info!("{} request {} started as task {}", kind, request_id, task_id);
                    slot.task_id = Some(task_id);
                    slot.phase = SlotPhase::Polling;
                    state.mark_dirty();
                }
            }
            Vec::new()
        }
        Msg::TaskProgress {
            request_id,
            kind,
            messages,
        } => {
            if let Some(slot) = state.current_slot_mut(kind, request_id) {
                if slot.phase.is_active() && !slot.progress.merge(&messages).is_empty() {
                    state.mark_dirty();
                }
            }
            Vec::new()
        }
        Msg::TaskCompleted {
            request_id,
            kind,
            result,
        } => {
            let mut fingerprint = None;
            if let Some(slot) = state.current_slot_mut(kind, request_id) {
                if slot.phase.is_active() {
                    desk_info!("{} request {} completed", kind, request_id);
                    slot.phase = SlotPhase::Completed;
                    slot.result = Some(result.clone());
                    fingerprint = Some(slot.fingerprint.clone());
                    state.mark_dirty();
                }
            }
            match fingerprint.flatten() {
                Some(key) => {
                    state.cache_mut().put(key, result);
                    vec![Effect::PersistCache {
                        entries: state.cache_snapshot(),
                    }]
                }
                None => Vec::new(),
            }
        }
        Msg::TaskFailed {
            request_id,
            kind,
            failure,
        } => {
            let mut failed = false;
            if let Some(slot) = state.current_slot_mut(kind, request_id) {
                if slot.phase.is_active() {
                    slot.phase = SlotPhase::Failed;
                    slot.failure = Some(failure.clone());
                    failed = true;
                }
            }
            if failed {
                state.set_error(format!("{kind}: {failure}"));
            }
            Vec::new()
        }
        Msg::FactCheckRequested => {
            if state.document().is_empty() {
                state.set_error("nothing to fact-check: the document is empty");
                Vec::new()
            } else {
                let request_id = state.next_request_id();
                state.set_fact_check_request(Some(request_id));
                vec![Effect::CheckClaims {
                    request_id,
                    text: state.document().flatten(),
                }]
            }
        }
        Msg::ClaimsReceived { request_id, report } => {
            if state.fact_check_request() == Some(request_id) {
                desk_info!(
                    "fact-check returned {} claims ({} reported)",
                    report.claims.len(),
                    report.total_claims
                );
                state.set_fact_check_request(None);
                state.set_claims(report.claims);
                state.set_preview(None);
            } else {
                desk_debug!("dropping stale fact-check result {}", request_id);
            }
            Vec::new()
        }
        Msg::FactCheckFailed {
            request_id,
            message,
        } => {
            if state.fact_check_request() == Some(request_id) {
                state.set_fact_check_request(None);
                state.set_error(format!("fact-check failed: {message}"));
            }
            Vec::new()
        }
        Msg::ClaimPreviewRequested { claim_index } => {
            preview_claim(&mut state, claim_index);
            Vec::new()
        }
        Msg::ClaimFixApproved => approve_fix(&mut state),
        Msg::ClaimFixDismissed => {
            state.take_preview();
            Vec::new()
        }
        Msg::RestoreCache(entries) => {
            if !entries.is_empty() {
                state.cache_mut().restore(entries);
                state.mark_dirty();
            }
            Vec::new()
        }
    };

    (state, effects)
}

fn request_operation(state: &mut AppState, request: OperationRequest) -> Vec<Effect> {
    let kind = request.kind();
    let fingerprint = request.fingerprint().map(|fingerprint| fingerprint.key());
    let request_id = state.next_request_id();

    let mut effects = Vec::with_capacity(2);
    if state.is_active(kind) {
        // At most one in-flight task per kind; the new request supersedes it.
        effects.push(Effect::CancelTask { kind });
    }

    let cached = fingerprint
        .as_ref()
        .and_then(|key| state.cache().get(key).cloned());
    match (cached, fingerprint) {
        (Some(result), Some(key)) => {
            desk_info!("{} request {} served from cache", kind, request_id);
            state.put_slot(kind, TaskSlot::cached(request_id, request, key, result));
        }
        (_, fingerprint) => {
            state.put_slot(
                kind,
                TaskSlot::starting(request_id, request.clone(), fingerprint),
            );
            effects.push(Effect::StartTask {
                request_id,
                request,
            });
        }
    }
    effects
}

fn preview_claim(state: &mut AppState, claim_index: usize) {
    let Some(claim) = state
        .claims()
        .get(claim_index)
        .map(|entry| entry.claim.clone())
    else {
        state.set_error(format!("no claim at index {claim_index}"));
        return;
    };

    let text = state.document().flatten();
    let locator = ClaimLocator::new(state.locator_config());
    let Some(found) = locator.locate(&text, &claim.text) else {
        state.set_preview(Some(ClaimPreview::NoMatch { claim_index }));
        return;
    };
    let url = match claim.citation_source() {
        Some(source) if !source.url.trim().is_empty() => source.url.trim().to_string(),
        _ => {
            state.set_preview(Some(ClaimPreview::NoSource { claim_index }));
            return;
        }
    };

    let shown = match strip_heading_lines(&found.sentence) {
        "" => found.sentence.as_str(),
        body => body,
    };
    let proposed = cite(shown, &url);
    let fix = PendingFix {
        claim_index,
        sentence_index: found.index,
        diff: diff(shown, &proposed),
        original: shown.to_string(),
        proposed,
        replacement: cite(&found.sentence, &url),
        tier: found.tier,
        revision: state.revision(),
    };
    state.set_preview(Some(ClaimPreview::Ready(fix)));
}

fn approve_fix(state: &mut AppState) -> Vec<Effect> {
    let fix = match state.take_preview() {
        Some(ClaimPreview::Ready(fix)) => fix,
        _ => return Vec::new(),
    };
    if fix.revision != state.revision() {
        state.set_error("the document changed since this fix was previewed; preview it again");
        return Vec::new();
    }

    match apply_patch(state.document(), fix.sentence_index, &fix.replacement) {
        Ok(outcome) => {
            if !outcome.missing_headings.is_empty() {
                state.set_error(format!(
                    "could not place the fix under heading(s): {}",
                    outcome.missing_headings.join(", ")
                ));
            }
            if outcome.changed_sections.is_empty() {
                return Vec::new();
            }
            desk_info!(
                "applied fix for claim {} to sections {:?}",
                fix.claim_index,
                outcome.changed_sections
            );
            state.replace_document(outcome.document);
            state.mark_claim_resolved(fix.claim_index);
            vec![Effect::DocumentChanged {
                section_ids: outcome.changed_sections,
            }]
        }
        Err(err) => {
            state.set_error(err.to_string());
            Vec::new()
        }
    }
}
