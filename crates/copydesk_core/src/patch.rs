use std::ops::Range;

use crate::document::{find_heading, heading_marker};
use crate::segment::segment;
use crate::{Document, Section};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatchError {
    #[error("sentence {index} is out of range (document has {len} sentences)")]
    SentenceOutOfRange { index: usize, len: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchOutcome {
    pub document: Document,
    /// Ids of sections whose content changed.
    pub changed_sections: Vec<String>,
    /// Headings that could not be found after patching; those sections kept
    /// their original content.
    pub missing_headings: Vec<String>,
}

/// Default patch proposal: the sentence followed by a markdown citation.
pub fn cite(sentence: &str, url: &str) -> String {
    format!("{sentence} [source]({url})")
}

/// Replace sentence `sentence_index` of the flattened document and split the
/// result back into the original sections by heading.
///
/// Only sections overlapping the replaced sentence can change; every other
/// section is returned byte-identical. A section whose heading disappeared
/// keeps its original content.
pub fn apply_patch(
    document: &Document,
    sentence_index: usize,
    replacement: &str,
) -> Result<PatchOutcome, PatchError> {
    let (flat, spans) = document.flatten_with_spans();
    let segmentation = segment(&flat);
    let out_of_range = PatchError::SentenceOutOfRange {
        index: sentence_index,
        len: segmentation.len(),
    };
    let target = segmentation.get(sentence_index).ok_or(out_of_range.clone())?;
    let target = target.start..target.end;
    let patched = segmentation
        .replace(sentence_index, replacement)
        .ok_or(out_of_range)?;

    let chunks = repartition(&patched, &document.sections);
    let mut sections = Vec::with_capacity(document.sections.len());
    let mut changed_sections = Vec::new();
    let mut missing_headings = Vec::new();

    for ((section, span), chunk) in document.sections.iter().zip(&spans).zip(chunks) {
        if !overlaps(span, &target) {
            sections.push(section.clone());
            continue;
        }
        match chunk {
            Some(content) if content != section.content.trim() => {
                changed_sections.push(section.id.clone());
                sections.push(Section {
                    content,
                    ..section.clone()
                });
            }
            Some(_) => sections.push(section.clone()),
            None => {
                copydesk_logging::desk_warn!(
                    "heading {:?} not found after patch; keeping section {} unchanged",
                    section.heading,
                    section.id
                );
                missing_headings.push(section.heading.clone());
                sections.push(section.clone());
            }
        }
    }

    Ok(PatchOutcome {
        document: Document::new(sections),
        changed_sections,
        missing_headings,
    })
}

/// Content of each section in `text`, found by splitting on the sections'
/// heading markers in order. `None` where a heading is missing.
fn repartition(text: &str, sections: &[Section]) -> Vec<Option<String>> {
    let mut cursor = 0;
    let mut bounds: Vec<Option<(usize, usize)>> = Vec::with_capacity(sections.len());
    for section in sections {
        let bound = match heading_marker(&section.heading) {
            Some(marker) => find_heading(text, cursor, &marker).map(|pos| {
                cursor = pos + marker.len();
                (pos, cursor)
            }),
            None => Some((cursor, cursor)),
        };
        bounds.push(bound);
    }

    (0..bounds.len())
        .map(|i| {
            let (_, content_start) = bounds[i]?;
            let content_end = bounds[i + 1..]
                .iter()
                .flatten()
                .map(|&(marker_start, _)| marker_start)
                .next()
                .unwrap_or(text.len())
                .max(content_start);
            Some(text[content_start..content_end].trim().to_string())
        })
        .collect()
}

fn overlaps(span: &Range<usize>, target: &Range<usize>) -> bool {
    if target.is_empty() {
        return span.start <= target.start && target.start <= span.end;
    }
    target.start < span.end && span.start < target.end
}
