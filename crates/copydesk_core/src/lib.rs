//! Copydesk core: pure data model, matching/patching algorithms and the
//! editor state machine.
mod cache;
mod claim;
mod diff;
mod document;
mod effect;
mod fingerprint;
mod locate;
mod msg;
mod operation;
mod patch;
mod segment;
mod state;
mod task;
mod update;
mod view_model;

pub use cache::{CacheEntry, ResultCache};
pub use claim::{Claim, ClaimReport, SupportingSource};
pub use diff::{diff, SentenceDiff};
pub use document::{Document, Section};
pub use effect::Effect;
pub use fingerprint::{compute_fingerprint, normalize_term, Fingerprint, FingerprintKey};
pub use locate::{
    dice_coefficient, locate_claim, word_bigrams, ClaimLocator, ClaimMatch, LocatorConfig,
    MatchTier,
};
pub use msg::Msg;
pub use operation::{OperationKind, OperationRequest};
pub use patch::{apply_patch, cite, PatchError, PatchOutcome};
pub use segment::{segment, Segmentation, Sentence};
pub use state::{
    AppState, ClaimEntry, ClaimPreview, PendingFix, RequestId, SlotPhase, TaskSlot,
};
pub use task::{
    Payload, PollBudget, PollStep, PollTracker, ProgressLog, ProgressMessage, TaskFailure, TaskId,
    TaskStatus, TaskStatusReport,
};
pub use update::update;
pub use view_model::{AppViewModel, ClaimRowView, PreviewView, SectionView, TaskRowView};
