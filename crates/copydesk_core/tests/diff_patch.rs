use copydesk_core::{
    apply_patch, cite, diff, locate_claim, Document, PatchError, Section, SentenceDiff,
};
use pretty_assertions::assert_eq;

fn three_sections() -> Document {
    Document::new(vec![
        Section::new("s1", "Intro", "Coffee is popular. It is brewed daily."),
        Section::new(
            "s2",
            "History",
            "Coffee spread from Ethiopia. Traders carried it to Yemen.",
        ),
        Section::new("s3", "Today", "Cafes are everywhere.\n\nSome roast their own beans."),
    ])
}

#[test]
fn diff_marks_appended_citation_only() {
    let original = "Dogs are mammals too.";
    let proposed = cite(original, "http://example.com");
    let result = diff(original, &proposed);

    assert_eq!(
        result,
        SentenceDiff {
            prefix: "Dogs are mammals too.".to_string(),
            removed: String::new(),
            added: " [source](http://example.com)".to_string(),
            suffix: String::new(),
        }
    );
    assert_eq!(result.before_markup(), "Dogs are mammals too.");
    assert_eq!(
        result.after_markup(),
        "Dogs are mammals too.<ins> [source](http://example.com)</ins>"
    );
}

#[test]
fn diff_marks_middle_replacement() {
    let result = diff("The cat sat on the mat.", "The dog sat on the mat.");
    assert_eq!(result.prefix, "The ");
    assert_eq!(result.removed, "cat");
    assert_eq!(result.added, "dog");
    assert_eq!(result.suffix, " sat on the mat.");
    assert_eq!(result.before_markup(), "The <del>cat</del> sat on the mat.");
    assert_eq!(result.after_markup(), "The <ins>dog</ins> sat on the mat.");
}

#[test]
fn diff_prefix_and_suffix_never_overlap() {
    // "aaa" -> "aaaa": prefix takes all of the shorter string, suffix gets nothing left.
    let result = diff("aaa", "aaaa");
    assert_eq!(result.prefix.chars().count() + result.suffix.chars().count(), 3);
    assert_eq!(result.removed, "");
    assert_eq!(result.added, "a");
    assert_eq!(format!("{}{}{}", result.prefix, result.added, result.suffix), "aaaa");

    let same = diff("unchanged", "unchanged");
    assert!(same.is_unchanged());
}

#[test]
fn diff_handles_multibyte_text_and_escapes_markup() {
    let result = diff("Café <b> ok", "Café <i> ok");
    assert_eq!(result.removed, "b");
    assert_eq!(result.added, "i");
    assert_eq!(result.before_markup(), "Café &lt;<del>b</del>&gt; ok");
}

#[test]
fn flatten_and_parse_are_inverse() {
    let doc = three_sections();
    let flat = doc.flatten();
    assert!(flat.starts_with("## Intro\n\nCoffee is popular."));
    assert!(flat.contains("It is brewed daily.\n\n## History\n\n"));

    let parsed = Document::from_markdown(&flat);
    let headings: Vec<_> = parsed.sections.iter().map(|s| s.heading.as_str()).collect();
    assert_eq!(headings, vec!["Intro", "History", "Today"]);
    for (parsed, original) in parsed.sections.iter().zip(&doc.sections) {
        assert_eq!(parsed.content, original.content);
    }
}

#[test]
fn leading_text_becomes_untitled_section() {
    let doc = Document::from_markdown("Preamble text.\n\n## Body\n\nMain text.");
    assert_eq!(doc.len(), 2);
    assert_eq!(doc.sections[0].heading, "");
    assert_eq!(doc.sections[0].content, "Preamble text.");
    assert_eq!(doc.sections[1].id, "section-2");
}

#[test]
fn patch_changes_only_the_owning_section() {
    let doc = three_sections();
    let found = locate_claim(&doc.flatten(), "Traders carried it to Yemen").unwrap();
    let replacement = cite(&found.sentence, "https://history.example/yemen");

    let outcome = apply_patch(&doc, found.index, &replacement).unwrap();

    assert_eq!(outcome.document.len(), 3);
    assert_eq!(outcome.document.sections[0], doc.sections[0]);
    assert_eq!(outcome.document.sections[2], doc.sections[2]);
    assert_eq!(
        outcome.document.sections[1].content,
        "Coffee spread from Ethiopia. Traders carried it to Yemen. [source](https://history.example/yemen)"
    );
    assert_eq!(outcome.changed_sections, vec!["s2".to_string()]);
    assert!(outcome.missing_headings.is_empty());
}

#[test]
fn untouched_sections_keep_their_exact_bytes() {
    let mut doc = three_sections();
    doc.sections[0].content = "  Spaced content.  \n".to_string();
    let found = locate_claim(&doc.flatten(), "Some roast their own beans").unwrap();

    let outcome = apply_patch(&doc, found.index, "Some roast their own beans daily.").unwrap();
    assert_eq!(outcome.document.sections[0].content, "  Spaced content.  \n");
    assert_eq!(
        outcome.document.sections[2].content,
        "Cafes are everywhere.\n\nSome roast their own beans daily."
    );
}

#[test]
fn out_of_range_sentence_is_rejected() {
    let doc = three_sections();
    let err = apply_patch(&doc, 99, "x").unwrap_err();
    assert!(matches!(err, PatchError::SentenceOutOfRange { index: 99, .. }));
}

#[test]
fn removed_heading_keeps_original_section() {
    let doc = three_sections();
    // Sentence 2 starts with the "## History" heading line.
    let flat = doc.flatten();
    let found = locate_claim(&flat, "Coffee spread from Ethiopia").unwrap();
    assert!(found.sentence.starts_with("## History"));

    let outcome = apply_patch(&doc, found.index, "Coffee spread widely.").unwrap();
    assert_eq!(outcome.document.len(), 3);
    assert_eq!(outcome.missing_headings, vec!["History".to_string()]);
    assert_eq!(outcome.document, doc);
    assert!(outcome.changed_sections.is_empty());
}

#[test]
fn end_to_end_claim_fix() {
    let markdown =
        "## Intro\n\nCats are mammals. Dogs are mammals too.\n\n## Body\n\nFish are not mammals.";
    let doc = Document::from_markdown(markdown);
    assert_eq!(doc.flatten(), markdown);

    let found = locate_claim(&doc.flatten(), "Dogs are mammals").unwrap();
    assert_eq!(found.sentence, "Dogs are mammals too.");

    let proposed = cite(&found.sentence, "http://example.com");
    let outcome = apply_patch(&doc, found.index, &proposed).unwrap();

    assert_eq!(
        outcome.document.sections[0].content,
        "Cats are mammals. Dogs are mammals too. [source](http://example.com)"
    );
    assert_eq!(outcome.document.sections[1], doc.sections[1]);
}
