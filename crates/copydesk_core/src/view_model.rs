use crate::{OperationKind, SlotPhase};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppViewModel {
    pub tasks: Vec<TaskRowView>,
    pub sections: Vec<SectionView>,
    pub claims: Vec<ClaimRowView>,
    pub preview: Option<PreviewView>,
    pub fact_check_pending: bool,
    pub cache_entries: usize,
    pub last_error: Option<String>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRowView {
    pub kind: OperationKind,
    pub phase: SlotPhase,
    pub task_id: Option<String>,
    /// Progress messages, latest first.
    pub progress: Vec<String>,
    pub from_cache: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionView {
    pub id: String,
    pub heading: String,
    pub word_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClaimRowView {
    pub index: usize,
    pub text: String,
    pub assessment: String,
    pub confidence: f64,
    pub source_url: Option<String>,
    pub resolved: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewView {
    NoMatch {
        claim_index: usize,
    },
    NoSource {
        claim_index: usize,
    },
    Diff {
        claim_index: usize,
        before_markup: String,
        after_markup: String,
    },
}
