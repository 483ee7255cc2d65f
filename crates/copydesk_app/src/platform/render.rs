use std::collections::BTreeMap;

use copydesk_core::{AppViewModel, ClaimRowView, OperationKind, PreviewView, SlotPhase};

#[derive(Debug, Default, Clone, PartialEq)]
struct RowMark {
    task_id: Option<String>,
    progress: usize,
    phase: Option<SlotPhase>,
}

/// Turns successive view models into terminal lines, printing each
/// progress message and phase change once.
#[derive(Debug, Default)]
pub(crate) struct ProgressRenderer {
    rows: BTreeMap<OperationKind, RowMark>,
    last_error: Option<String>,
}

impl ProgressRenderer {
    pub(crate) fn render(&mut self, view: &AppViewModel) -> Vec<String> {
        let mut lines = Vec::new();
        for row in &view.tasks {
            let mark = self.rows.entry(row.kind).or_default();
            if row.task_id != mark.task_id {
                if let Some(task_id) = &row.task_id {
                    lines.push(format!("[{}] started task {}", row.kind, task_id));
                }
                mark.task_id = row.task_id.clone();
            }

            // A new request of the same kind starts with a fresh log.
            if row.progress.len() < mark.progress {
                mark.progress = 0;
            }
            let unseen = row.progress.len() - mark.progress;
            for message in row.progress[..unseen].iter().rev() {
                lines.push(format!("[{}] {}", row.kind, message));
            }
            mark.progress = row.progress.len();

            if mark.phase != Some(row.phase) {
                match row.phase {
                    SlotPhase::Completed if row.from_cache => {
                        lines.push(format!("[{}] completed (cached)", row.kind))
                    }
                    SlotPhase::Completed => lines.push(format!("[{}] completed", row.kind)),
                    SlotPhase::Failed => lines.push(format!("[{}] failed", row.kind)),
                    SlotPhase::Cancelled => lines.push(format!("[{}] cancelled", row.kind)),
                    SlotPhase::Starting | SlotPhase::Polling => {}
                }
                mark.phase = Some(row.phase);
            }
        }

        if view.last_error != self.last_error {
            if let Some(error) = &view.last_error {
                lines.push(format!("error: {error}"));
            }
            self.last_error = view.last_error.clone();
        }
        lines
    }
}

pub(crate) fn claim_line(claim: &ClaimRowView) -> String {
    let status = if claim.resolved { " (cited)" } else { "" };
    let source = claim.source_url.as_deref().unwrap_or("no source");
    format!(
        "#{} [{} {:.2}] {} | {}{}",
        claim.index, claim.assessment, claim.confidence, claim.text, source, status
    )
}

pub(crate) fn preview_lines(preview: &PreviewView) -> Vec<String> {
    match preview {
        PreviewView::NoMatch { claim_index } => {
            vec![format!("#{claim_index}: no matching sentence in the document")]
        }
        PreviewView::NoSource { claim_index } => {
            vec![format!("#{claim_index}: no supporting source to cite")]
        }
        PreviewView::Diff {
            claim_index,
            before_markup,
            after_markup,
        } => vec![
            format!("#{claim_index}:"),
            format!("  - {before_markup}"),
            format!("  + {after_markup}"),
        ],
    }
}
