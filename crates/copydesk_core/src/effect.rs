use crate::{CacheEntry, OperationKind, OperationRequest, RequestId};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Start the request remotely and poll it to completion.
    StartTask {
        request_id: RequestId,
        request: OperationRequest,
    },
    /// Stop polling the running task of this kind.
    CancelTask { kind: OperationKind },
    /// Send the flattened document to the fact-checking service.
    CheckClaims { request_id: RequestId, text: String },
    /// The result cache changed; persist the full snapshot.
    PersistCache { entries: Vec<CacheEntry> },
    /// A patch rewrote these sections.
    DocumentChanged { section_ids: Vec<String> },
}
