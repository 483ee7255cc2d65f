use std::ops::Range;

use serde::{Deserialize, Serialize};

const HEADING_PREFIX: &str = "## ";
const SECTION_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub heading: String,
    pub content: String,
}

impl Section {
    pub fn new(id: impl Into<String>, heading: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            heading: heading.into(),
            content: content.into(),
        }
    }
}

/// Heading-delimited document owned by the editor.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Document {
    pub sections: Vec<Section>,
}

impl Document {
    pub fn new(sections: Vec<Section>) -> Self {
        Self { sections }
    }

    /// Parse `## ` headings into sections. Text before the first heading
    /// becomes an untitled section when it is not blank.
    pub fn from_markdown(markdown: &str) -> Self {
        let mut sections = Vec::new();
        let mut heading: Option<String> = None;
        let mut body: Vec<&str> = Vec::new();

        for line in markdown.lines() {
            if let Some(title) = line.strip_prefix(HEADING_PREFIX) {
                flush_section(heading.take(), &mut body, &mut sections);
                heading = Some(title.trim().to_string());
            } else {
                body.push(line);
            }
        }
        flush_section(heading, &mut body, &mut sections);

        Self { sections }
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.id == id)
    }

    /// Replace one section's content; `false` if no section has that id.
    pub fn set_section_content(&mut self, id: &str, content: impl Into<String>) -> bool {
        match self.sections.iter_mut().find(|section| section.id == id) {
            Some(section) => {
                section.content = content.into();
                true
            }
            None => false,
        }
    }

    /// Heading and content of every section, joined by blank lines.
    pub fn flatten(&self) -> String {
        self.flatten_with_spans().0
    }

    /// Flattened text plus the byte range each section occupies in it.
    pub(crate) fn flatten_with_spans(&self) -> (String, Vec<Range<usize>>) {
        let mut text = String::new();
        let mut spans = Vec::with_capacity(self.sections.len());
        for (i, section) in self.sections.iter().enumerate() {
            if i > 0 {
                text.push_str(SECTION_SEPARATOR);
            }
            let start = text.len();
            if let Some(marker) = heading_marker(&section.heading) {
                text.push_str(&marker);
                text.push_str(SECTION_SEPARATOR);
            }
            text.push_str(&section.content);
            spans.push(start..text.len());
        }
        (text, spans)
    }
}

fn flush_section(heading: Option<String>, body: &mut Vec<&str>, sections: &mut Vec<Section>) {
    let content = body.join("\n").trim().to_string();
    body.clear();
    if heading.is_none() && content.is_empty() {
        return;
    }
    let id = format!("section-{}", sections.len() + 1);
    sections.push(Section::new(id, heading.unwrap_or_default(), content));
}

pub(crate) fn heading_marker(heading: &str) -> Option<String> {
    if heading.is_empty() {
        None
    } else {
        Some(format!("{HEADING_PREFIX}{heading}"))
    }
}

/// `text` without the heading lines that open it. Sentences that start a
/// section carry their heading because headings have no closing punctuation.
pub(crate) fn strip_heading_lines(mut text: &str) -> &str {
    while text.starts_with(HEADING_PREFIX) {
        match text.find('\n') {
            Some(end) => text = text[end..].trim_start(),
            None => return "",
        }
    }
    text
}

/// Position of `marker` at or after `from`, only where it fills a whole line.
pub(crate) fn find_heading(text: &str, from: usize, marker: &str) -> Option<usize> {
    let mut cursor = from;
    while let Some(offset) = text.get(cursor..)?.find(marker) {
        let pos = cursor + offset;
        let after = pos + marker.len();
        let line_start = pos == 0 || text[..pos].ends_with('\n');
        let line_end = after == text.len() || text[after..].starts_with('\n');
        if line_start && line_end {
            return Some(pos);
        }
        cursor = pos + marker.len();
    }
    None
}
