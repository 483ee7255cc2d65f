/// Prefix/suffix highlight of a single-sentence edit. Not a minimal diff:
/// everything between the common prefix and common suffix is one change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentenceDiff {
    pub prefix: String,
    pub removed: String,
    pub added: String,
    pub suffix: String,
}

impl SentenceDiff {
    pub fn is_unchanged(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }

    pub fn before_markup(&self) -> String {
        render(&self.prefix, &self.removed, "del", &self.suffix)
    }

    pub fn after_markup(&self) -> String {
        render(&self.prefix, &self.added, "ins", &self.suffix)
    }
}

pub fn diff(original: &str, proposed: &str) -> SentenceDiff {
    let before: Vec<char> = original.chars().collect();
    let after: Vec<char> = proposed.chars().collect();
    let shortest = before.len().min(after.len());

    let prefix = before
        .iter()
        .zip(after.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let suffix = before
        .iter()
        .rev()
        .zip(after.iter().rev())
        .take(shortest - prefix)
        .take_while(|(a, b)| a == b)
        .count();

    SentenceDiff {
        prefix: before[..prefix].iter().collect(),
        removed: before[prefix..before.len() - suffix].iter().collect(),
        added: after[prefix..after.len() - suffix].iter().collect(),
        suffix: before[before.len() - suffix..].iter().collect(),
    }
}

fn render(prefix: &str, changed: &str, tag: &str, suffix: &str) -> String {
    let mut markup = escape_html(prefix);
    if !changed.is_empty() {
        markup.push_str(&format!("<{tag}>{}</{tag}>", escape_html(changed)));
    }
    markup.push_str(&escape_html(suffix));
    markup
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
