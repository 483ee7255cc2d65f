use crate::{
    CacheEntry, ClaimReport, Document, OperationKind, OperationRequest, Payload, ProgressMessage,
    RequestId, TaskFailure, TaskId,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// Editor loaded or replaced the whole document.
    DocumentLoaded(Document),
    /// User edited one section by hand.
    SectionEdited { section_id: String, content: String },
    /// User asked for a research/outline/generation/rewrite run.
    OperationRequested(OperationRequest),
    /// User cancelled the running operation of this kind.
    CancelOperation(OperationKind),
    /// Engine: the remote system accepted the request.
    TaskStarted {
        request_id: RequestId,
        kind: OperationKind,
        task_id: TaskId,
    },
    /// Engine: progress messages not seen before.
    TaskProgress {
        request_id: RequestId,
        kind: OperationKind,
        messages: Vec<ProgressMessage>,
    },
    /// Engine: the task completed.
    TaskCompleted {
        request_id: RequestId,
        kind: OperationKind,
        result: Payload,
    },
    /// Engine: the task could not be started or ended in error.
    TaskFailed {
        request_id: RequestId,
        kind: OperationKind,
        failure: TaskFailure,
    },
    /// User asked to fact-check the current document.
    FactCheckRequested,
    /// Engine: fact-check results.
    ClaimsReceived {
        request_id: RequestId,
        report: ClaimReport,
    },
    /// Engine: fact-check call failed.
    FactCheckFailed {
        request_id: RequestId,
        message: String,
    },
    /// User opened the fix preview for a claim.
    ClaimPreviewRequested { claim_index: usize },
    /// User accepted the previewed fix.
    ClaimFixApproved,
    /// User closed the preview without applying it.
    ClaimFixDismissed,
    /// Restore cached results loaded at session start.
    RestoreCache(Vec<CacheEntry>),
}
