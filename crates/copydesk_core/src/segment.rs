/// One sentence of a segmented document, with its byte span in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// Ordered sentences of a document. The whitespace between sentences is kept
/// in the source so the text can be rebuilt byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segmentation {
    source: String,
    sentences: Vec<Sentence>,
}

impl Segmentation {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn sentences(&self) -> &[Sentence] {
        &self.sentences
    }

    pub fn get(&self, index: usize) -> Option<&Sentence> {
        self.sentences.get(index)
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sentences.iter().map(|s| s.text.clone()).collect()
    }

    pub fn join(&self, separator: &str) -> String {
        self.sentences
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(separator)
    }

    /// Source text with the sentence at `index` swapped for `replacement`.
    /// Everything outside that sentence's span is left untouched.
    pub fn replace(&self, index: usize, replacement: &str) -> Option<String> {
        let sentence = self.sentences.get(index)?;
        let mut rebuilt =
            String::with_capacity(self.source.len() - (sentence.end - sentence.start) + replacement.len());
        rebuilt.push_str(&self.source[..sentence.start]);
        rebuilt.push_str(replacement);
        rebuilt.push_str(&self.source[sentence.end..]);
        Some(rebuilt)
    }
}

/// Split `text` after every run of `.`, `!` or `?` that is followed by
/// whitespace. Text without such a boundary is one sentence; blank text is a
/// single empty sentence.
pub fn segment(text: &str) -> Segmentation {
    let mut sentences = Vec::new();
    let mut start: Option<usize> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        let begin = match start {
            Some(begin) => begin,
            None if c.is_whitespace() => continue,
            None => {
                start = Some(i);
                i
            }
        };

        if !is_sentence_final(c) {
            continue;
        }
        let mut end = i + c.len_utf8();
        while let Some(&(j, next)) = chars.peek() {
            if !is_sentence_final(next) {
                break;
            }
            end = j + next.len_utf8();
            chars.next();
        }
        if matches!(chars.peek(), Some(&(_, next)) if next.is_whitespace()) {
            sentences.push(span(text, begin, end));
            start = None;
        }
    }

    if let Some(begin) = start {
        let end = begin + text[begin..].trim_end().len();
        sentences.push(span(text, begin, end));
    }
    if sentences.is_empty() {
        sentences.push(span(text, 0, 0));
    }

    Segmentation {
        source: text.to_string(),
        sentences,
    }
}

fn is_sentence_final(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

fn span(text: &str, start: usize, end: usize) -> Sentence {
    Sentence {
        text: text[start..end].to_string(),
        start,
        end,
    }
}

#[cfg(test)]
mod tests {
    use super::segment;

    #[test]
    fn punctuation_runs_stay_with_their_sentence() {
        let seg = segment("Really?! Yes. ");
        assert_eq!(seg.texts(), vec!["Really?!", "Yes."]);
    }

    #[test]
    fn spans_point_into_source() {
        let seg = segment("  One.  Two");
        for sentence in seg.sentences() {
            assert_eq!(&seg.source()[sentence.start..sentence.end], sentence.text);
        }
        assert_eq!(seg.sentences()[0].start, 2);
    }
}
