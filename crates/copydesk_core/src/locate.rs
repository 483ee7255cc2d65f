use std::collections::HashSet;

use crate::segment::{segment, Segmentation};

/// Which fallback tier produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    Substring,
    TokenOverlap,
    BigramDice,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClaimMatch {
    pub sentence: String,
    pub index: usize,
    pub sentences: Vec<String>,
    pub tier: MatchTier,
    /// 1.0 for substring hits, otherwise the winning tier's score.
    pub score: f64,
    pub segmentation: Segmentation,
}

/// Score floors for the fuzzy tiers. A tier only matches when its best
/// score is strictly greater than the floor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocatorConfig {
    pub min_overlap: f64,
    pub min_dice: f64,
    /// Shortest word counted by the token overlap tier. The default of 1
    /// counts every word.
    pub min_token_len: usize,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            min_overlap: 0.0,
            min_dice: 0.0,
            min_token_len: 1,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClaimLocator {
    config: LocatorConfig,
}

impl ClaimLocator {
    pub fn new(config: LocatorConfig) -> Self {
        Self { config }
    }

    /// Find the sentence of `document` that best supports `claim`, trying
    /// substring containment, then token overlap, then bigram Dice.
    pub fn locate(&self, document: &str, claim: &str) -> Option<ClaimMatch> {
        let segmentation = segment(document);
        let (index, tier, score) = self.best_match(&segmentation, claim)?;
        copydesk_logging::desk_debug!(
            "claim located at sentence {} via {:?} (score {:.3})",
            index,
            tier,
            score
        );
        let sentences = segmentation.texts();
        Some(ClaimMatch {
            sentence: sentences[index].clone(),
            index,
            sentences,
            tier,
            score,
            segmentation,
        })
    }

    fn best_match(&self, segmentation: &Segmentation, claim: &str) -> Option<(usize, MatchTier, f64)> {
        let needle = collapse(claim);
        if needle.is_empty() {
            return None;
        }
        let normalized: Vec<String> = segmentation
            .sentences()
            .iter()
            .map(|s| collapse(&s.text))
            .collect();

        if let Some(index) = normalized.iter().position(|s| s.contains(&needle)) {
            return Some((index, MatchTier::Substring, 1.0));
        }

        let claim_tokens = word_set(claim, self.config.min_token_len);
        if !claim_tokens.is_empty() {
            let scores = normalized.iter().map(|sentence| {
                let sentence_tokens = word_set(sentence, self.config.min_token_len);
                let shared = claim_tokens.intersection(&sentence_tokens).count();
                shared as f64 / claim_tokens.len() as f64
            });
            if let Some((index, score)) = first_best(scores, self.config.min_overlap) {
                return Some((index, MatchTier::TokenOverlap, score));
            }
        }

        let claim_bigrams = word_bigrams(claim);
        let scores = normalized
            .iter()
            .map(|sentence| dice_coefficient(&claim_bigrams, &word_bigrams(sentence)));
        first_best(scores, self.config.min_dice).map(|(index, score)| (index, MatchTier::BigramDice, score))
    }
}

/// [`ClaimLocator::locate`] with the default floors.
pub fn locate_claim(document: &str, claim: &str) -> Option<ClaimMatch> {
    ClaimLocator::default().locate(document, claim)
}

/// Dice's coefficient `2|A∩B| / (|A|+|B|)`; zero when both sets are empty.
pub fn dice_coefficient(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 0.0;
    }
    let shared = a.intersection(b).count();
    2.0 * shared as f64 / total as f64
}

/// Set of adjacent word pairs of the case-folded text, joined by a space.
pub fn word_bigrams(text: &str) -> HashSet<String> {
    let words = words(text);
    words.windows(2).map(|pair| format!("{} {}", pair[0], pair[1])).collect()
}

fn first_best(scores: impl Iterator<Item = f64>, floor: f64) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (index, score) in scores.enumerate() {
        // Strictly greater keeps the first occurrence on ties.
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((index, score));
        }
    }
    best.filter(|&(_, score)| score > floor && score > 0.0)
}

fn collapse(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn word_set(text: &str, min_len: usize) -> HashSet<String> {
    words(text)
        .into_iter()
        .filter(|word| word.chars().count() >= min_len)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{first_best, words};

    #[test]
    fn ties_keep_first_occurrence() {
        let best = first_best([0.5, 0.7, 0.7, 0.1].into_iter(), 0.0);
        assert_eq!(best, Some((1, 0.7)));
    }

    #[test]
    fn zero_scores_do_not_match() {
        assert_eq!(first_best([0.0, 0.0].into_iter(), 0.0), None);
    }

    #[test]
    fn words_split_on_punctuation() {
        assert_eq!(words("France's capital, Paris!"), vec!["france", "s", "capital", "paris"]);
    }
}
