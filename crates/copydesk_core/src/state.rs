use std::collections::BTreeMap;

use crate::view_model::{AppViewModel, ClaimRowView, PreviewView, SectionView, TaskRowView};
use crate::{
    CacheEntry, Claim, Document, FingerprintKey, LocatorConfig, MatchTier, OperationKind,
    OperationRequest, Payload, ProgressLog, ResultCache, SentenceDiff, TaskFailure, TaskId,
};

/// Monotonic id attached to every dispatched request, used to drop late
/// responses for superseded work.
pub type RequestId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotPhase {
    Starting,
    Polling,
    Completed,
    Failed,
    Cancelled,
}

impl SlotPhase {
    pub fn is_active(self) -> bool {
        matches!(self, SlotPhase::Starting | SlotPhase::Polling)
    }
}

/// Latest request of one operation kind.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSlot {
    pub request_id: RequestId,
    pub request: OperationRequest,
    pub fingerprint: Option<FingerprintKey>,
    pub task_id: Option<TaskId>,
    pub phase: SlotPhase,
    pub progress: ProgressLog,
    pub result: Option<Payload>,
    pub failure: Option<TaskFailure>,
    pub from_cache: bool,
}

impl TaskSlot {
    pub(crate) fn starting(
        request_id: RequestId,
        request: OperationRequest,
        fingerprint: Option<FingerprintKey>,
    ) -> Self {
        Self {
            request_id,
            request,
            fingerprint,
            task_id: None,
            phase: SlotPhase::Starting,
            progress: ProgressLog::new(),
            result: None,
            failure: None,
            from_cache: false,
        }
    }

    pub(crate) fn cached(
        request_id: RequestId,
        request: OperationRequest,
        fingerprint: FingerprintKey,
        result: Payload,
    ) -> Self {
        Self {
            phase: SlotPhase::Completed,
            result: Some(result),
            from_cache: true,
            ..Self::starting(request_id, request, Some(fingerprint))
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClaimEntry {
    pub claim: Claim,
    pub resolved: bool,
}

/// A located claim with its proposed patch, waiting for approval.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingFix {
    pub claim_index: usize,
    pub sentence_index: usize,
    /// Located sentence as shown to the user, without a leading heading.
    pub original: String,
    pub proposed: String,
    /// Text spliced over the whole located sentence span on approval.
    pub replacement: String,
    pub diff: SentenceDiff,
    pub tier: MatchTier,
    /// Document revision the fix was computed against.
    pub revision: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClaimPreview {
    NoMatch { claim_index: usize },
    NoSource { claim_index: usize },
    Ready(PendingFix),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    last_request_id: RequestId,
    document: Document,
    revision: u64,
    slots: BTreeMap<OperationKind, TaskSlot>,
    cache: ResultCache,
    fact_check: Option<RequestId>,
    claims: Vec<ClaimEntry>,
    preview: Option<ClaimPreview>,
    locator: LocatorConfig,
    last_error: Option<String>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_locator_config(mut self, locator: LocatorConfig) -> Self {
        self.locator = locator;
        self
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            tasks: self.slots.iter().map(|(kind, slot)| task_row(*kind, slot)).collect(),
            sections: self
                .document
                .sections
                .iter()
                .map(|section| SectionView {
                    id: section.id.clone(),
                    heading: section.heading.clone(),
                    word_count: section.content.split_whitespace().count(),
                })
                .collect(),
            claims: self
                .claims
                .iter()
                .enumerate()
                .map(|(index, entry)| ClaimRowView {
                    index,
                    text: entry.claim.text.clone(),
                    assessment: entry.claim.assessment.clone(),
                    confidence: entry.claim.confidence,
                    source_url: entry.claim.citation_source().map(|s| s.url.clone()),
                    resolved: entry.resolved,
                })
                .collect(),
            preview: self.preview.as_ref().map(preview_view),
            fact_check_pending: self.fact_check.is_some(),
            cache_entries: self.cache.len(),
            last_error: self.last_error.clone(),
            dirty: self.dirty,
        }
    }

    /// Returns whether anything changed since the last call, and resets the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn slot(&self, kind: OperationKind) -> Option<&TaskSlot> {
        self.slots.get(&kind)
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn cache_snapshot(&self) -> Vec<CacheEntry> {
        self.cache.snapshot()
    }

    pub fn claims(&self) -> &[ClaimEntry] {
        &self.claims
    }

    pub fn preview(&self) -> Option<&ClaimPreview> {
        self.preview.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn fact_check_pending(&self) -> bool {
        self.fact_check.is_some()
    }

    pub(crate) fn locator_config(&self) -> LocatorConfig {
        self.locator
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn next_request_id(&mut self) -> RequestId {
        self.last_request_id += 1;
        self.last_request_id
    }

    pub(crate) fn set_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        copydesk_logging::desk_warn!("{}", message);
        self.last_error = Some(message);
        self.dirty = true;
    }

    pub(crate) fn is_active(&self, kind: OperationKind) -> bool {
        self.slots
            .get(&kind)
            .is_some_and(|slot| slot.phase.is_active())
    }

    pub(crate) fn put_slot(&mut self, kind: OperationKind, slot: TaskSlot) {
        self.slots.insert(kind, slot);
        self.dirty = true;
    }

    /// The slot for `kind`, only while `request_id` is its current request.
    pub(crate) fn current_slot_mut(
        &mut self,
        kind: OperationKind,
        request_id: RequestId,
    ) -> Option<&mut TaskSlot> {
        match self.slots.get_mut(&kind) {
            Some(slot) if slot.request_id == request_id => Some(slot),
            _ => {
                copydesk_logging::desk_debug!(
                    "dropping stale {} message for request {}",
                    kind,
                    request_id
                );
                None
            }
        }
    }

    pub(crate) fn cache_mut(&mut self) -> &mut ResultCache {
        &mut self.cache
    }

    pub(crate) fn replace_document(&mut self, document: Document) {
        self.document = document;
        self.revision += 1;
        self.dirty = true;
    }

    pub(crate) fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub(crate) fn bump_revision(&mut self) {
        self.revision += 1;
        self.dirty = true;
    }

    pub(crate) fn fact_check_request(&self) -> Option<RequestId> {
        self.fact_check
    }

    pub(crate) fn set_fact_check_request(&mut self, request_id: Option<RequestId>) {
        self.fact_check = request_id;
        self.dirty = true;
    }

    pub(crate) fn set_claims(&mut self, claims: Vec<Claim>) {
        self.claims = claims
            .into_iter()
            .map(|claim| ClaimEntry {
                claim,
                resolved: false,
            })
            .collect();
        self.dirty = true;
    }

    pub(crate) fn mark_claim_resolved(&mut self, index: usize) {
        if let Some(entry) = self.claims.get_mut(index) {
            entry.resolved = true;
            self.dirty = true;
        }
    }

    pub(crate) fn set_preview(&mut self, preview: Option<ClaimPreview>) {
        if self.preview != preview {
            self.preview = preview;
            self.dirty = true;
        }
    }

    pub(crate) fn take_preview(&mut self) -> Option<ClaimPreview> {
        let preview = self.preview.take();
        if preview.is_some() {
            self.dirty = true;
        }
        preview
    }
}

fn task_row(kind: OperationKind, slot: &TaskSlot) -> TaskRowView {
    TaskRowView {
        kind,
        phase: slot.phase,
        task_id: slot.task_id.as_ref().map(|id| id.to_string()),
        progress: slot
            .progress
            .messages()
            .iter()
            .rev()
            .map(|m| m.message.clone())
            .collect(),
        from_cache: slot.from_cache,
        error: slot.failure.as_ref().map(|failure| failure.to_string()),
    }
}

fn preview_view(preview: &ClaimPreview) -> PreviewView {
    match preview {
        ClaimPreview::NoMatch { claim_index } => PreviewView::NoMatch {
            claim_index: *claim_index,
        },
        ClaimPreview::NoSource { claim_index } => PreviewView::NoSource {
            claim_index: *claim_index,
        },
        ClaimPreview::Ready(fix) => PreviewView::Diff {
            claim_index: fix.claim_index,
            before_markup: fix.diff.before_markup(),
            after_markup: fix.diff.after_markup(),
        },
    }
}
