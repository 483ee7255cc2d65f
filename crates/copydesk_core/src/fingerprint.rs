use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::OperationKind;

const FIELD_SEPARATOR: char = '\u{1f}';
const KEYWORD_SEPARATOR: char = '\u{1e}';

/// Hex SHA-256 digest identifying a normalized request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FingerprintKey(String);

impl FingerprintKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FingerprintKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalized request parameters used as a cache identity.
///
/// Keywords keep their first-seen order for display; equality and the key
/// only look at the sorted set.
#[derive(Debug, Clone, Eq)]
pub struct Fingerprint {
    scope: Option<OperationKind>,
    keywords: Vec<String>,
    industry: String,
    audience: String,
}

impl Fingerprint {
    pub fn new<I, S>(keywords: I, industry: &str, audience: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for keyword in keywords {
            let term = normalize_term(keyword.as_ref());
            if !term.is_empty() && !normalized.contains(&term) {
                normalized.push(term);
            }
        }
        Self {
            scope: None,
            keywords: normalized,
            industry: normalize_term(industry),
            audience: normalize_term(audience),
        }
    }

    /// Same as [`Fingerprint::new`], but keyed separately per operation kind.
    pub fn scoped<I, S>(kind: OperationKind, keywords: I, industry: &str, audience: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            scope: Some(kind),
            ..Self::new(keywords, industry, audience)
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn industry(&self) -> &str {
        &self.industry
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    pub fn key(&self) -> FingerprintKey {
        let mut canonical = String::new();
        if let Some(kind) = self.scope {
            canonical.push_str(kind.as_str());
        }
        canonical.push(FIELD_SEPARATOR);
        let sorted = self.sorted_keywords();
        for (i, keyword) in sorted.iter().enumerate() {
            if i > 0 {
                canonical.push(KEYWORD_SEPARATOR);
            }
            canonical.push_str(keyword);
        }
        canonical.push(FIELD_SEPARATOR);
        canonical.push_str(&self.industry);
        canonical.push(FIELD_SEPARATOR);
        canonical.push_str(&self.audience);
        FingerprintKey(hex_digest(&canonical))
    }

    fn sorted_keywords(&self) -> Vec<&str> {
        let mut sorted: Vec<&str> = self.keywords.iter().map(String::as_str).collect();
        sorted.sort_unstable();
        sorted
    }
}

impl PartialEq for Fingerprint {
    fn eq(&self, other: &Self) -> bool {
        self.scope == other.scope
            && self.industry == other.industry
            && self.audience == other.audience
            && self.sorted_keywords() == other.sorted_keywords()
    }
}

/// Cache key for a keyword set, industry and audience, insensitive to
/// keyword order, casing and whitespace.
pub fn compute_fingerprint<I, S>(keywords: I, industry: &str, audience: &str) -> FingerprintKey
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Fingerprint::new(keywords, industry, audience).key()
}

/// Lower-case, trim and collapse internal whitespace runs to one space.
pub fn normalize_term(input: &str) -> String {
    input
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn hex_digest(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest.iter() {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}

#[cfg(test)]
mod tests {
    use super::normalize_term;

    #[test]
    fn normalize_collapses_inner_whitespace() {
        assert_eq!(normalize_term("  Search\t Engine\nOptimisation "), "search engine optimisation");
        assert_eq!(normalize_term("   "), "");
    }
}
