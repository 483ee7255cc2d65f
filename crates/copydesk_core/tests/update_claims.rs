use std::sync::Once;

use copydesk_core::{
    update, AppState, Claim, ClaimPreview, ClaimReport, Document, Effect, Msg, PreviewView,
    SupportingSource,
};
use pretty_assertions::assert_eq;

const DOCUMENT: &str =
    "## Intro\n\nCats are mammals. Dogs are mammals too.\n\n## Body\n\nFish are not mammals.";

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(copydesk_logging::initialize_for_tests);
}

fn claim(text: &str, urls: &[&str]) -> Claim {
    Claim {
        text: text.to_string(),
        assessment: "supported".to_string(),
        confidence: 0.9,
        supporting_sources: urls
            .iter()
            .map(|url| SupportingSource {
                url: url.to_string(),
                title: None,
            })
            .collect(),
    }
}

/// Loads the document, runs a fact-check and feeds back `claims`.
fn checked_state(claims: Vec<Claim>) -> AppState {
    let (state, _) = update(
        AppState::new(),
        Msg::DocumentLoaded(Document::from_markdown(DOCUMENT)),
    );
    let (state, effects) = update(state, Msg::FactCheckRequested);
    let request_id = match effects.as_slice() {
        [Effect::CheckClaims { request_id, text }] => {
            assert_eq!(text, DOCUMENT);
            *request_id
        }
        other => panic!("unexpected effects {other:?}"),
    };
    let (state, _) = update(
        state,
        Msg::ClaimsReceived {
            request_id,
            report: ClaimReport {
                total_claims: claims.len(),
                claims,
            },
        },
    );
    state
}

#[test]
fn approved_fix_appends_citation_to_owning_section() {
    init_logging();
    let state = checked_state(vec![claim("Dogs are mammals", &["http://example.com"])]);
    let (state, _) = update(state, Msg::ClaimPreviewRequested { claim_index: 0 });

    match state.view().preview {
        Some(PreviewView::Diff {
            claim_index,
            before_markup,
            after_markup,
        }) => {
            assert_eq!(claim_index, 0);
            assert_eq!(before_markup, "Dogs are mammals too.");
            assert_eq!(
                after_markup,
                "Dogs are mammals too.<ins> [source](http://example.com)</ins>"
            );
        }
        other => panic!("unexpected preview {other:?}"),
    }

    let (state, effects) = update(state, Msg::ClaimFixApproved);
    assert_eq!(
        effects,
        vec![Effect::DocumentChanged {
            section_ids: vec!["section-1".to_string()]
        }]
    );
    let document = state.document();
    assert_eq!(document.len(), 2);
    assert_eq!(
        document.sections[0].content,
        "Cats are mammals. Dogs are mammals too. [source](http://example.com)"
    );
    assert_eq!(document.sections[1].content, "Fish are not mammals.");
    assert!(state.claims()[0].resolved);
    assert!(state.preview().is_none());
}

#[test]
fn unmatched_claim_offers_no_diff() {
    init_logging();
    let state = checked_state(vec![claim("Quantum chromodynamics", &["http://example.com"])]);
    let (state, effects) = update(state, Msg::ClaimPreviewRequested { claim_index: 0 });

    assert!(effects.is_empty());
    assert_eq!(
        state.preview(),
        Some(&ClaimPreview::NoMatch { claim_index: 0 })
    );
    assert!(state.last_error().is_none());

    // Approving a no-match preview does nothing.
    let before = state.document().clone();
    let (state, effects) = update(state, Msg::ClaimFixApproved);
    assert!(effects.is_empty());
    assert_eq!(state.document(), &before);
}

#[test]
fn claim_without_source_cannot_be_cited() {
    init_logging();
    let state = checked_state(vec![claim("Fish are not mammals", &[])]);
    let (state, _) = update(state, Msg::ClaimPreviewRequested { claim_index: 0 });
    assert_eq!(
        state.preview(),
        Some(&ClaimPreview::NoSource { claim_index: 0 })
    );
}

#[test]
fn section_opening_sentence_previews_without_its_heading() {
    init_logging();
    let state = checked_state(vec![claim("Fish are not mammals", &["https://fish.example"])]);
    let (state, _) = update(state, Msg::ClaimPreviewRequested { claim_index: 0 });

    match state.preview() {
        Some(ClaimPreview::Ready(fix)) => {
            assert_eq!(fix.original, "Fish are not mammals.");
            assert_eq!(fix.replacement, "## Body\n\nFish are not mammals. [source](https://fish.example)");
            assert_eq!(fix.diff.before_markup(), "Fish are not mammals.");
            assert_eq!(
                fix.diff.after_markup(),
                "Fish are not mammals.<ins> [source](https://fish.example)</ins>"
            );
        }
        other => panic!("unexpected preview {other:?}"),
    }

    let (state, effects) = update(state, Msg::ClaimFixApproved);
    assert_eq!(
        effects,
        vec![Effect::DocumentChanged {
            section_ids: vec!["section-2".to_string()]
        }]
    );
    assert_eq!(
        state.document().sections[1].content,
        "Fish are not mammals. [source](https://fish.example)"
    );
    assert_eq!(
        state.document().sections[0].content,
        "Cats are mammals. Dogs are mammals too."
    );
}

#[test]
fn edit_after_preview_discards_the_fix() {
    init_logging();
    let state = checked_state(vec![claim("Fish are not mammals", &["https://fish.example"])]);
    let (state, _) = update(state, Msg::ClaimPreviewRequested { claim_index: 0 });
    assert!(matches!(state.preview(), Some(ClaimPreview::Ready(_))));

    let (state, _) = update(
        state,
        Msg::SectionEdited {
            section_id: "section-2".to_string(),
            content: "Fish are not mammals. Whales are.".to_string(),
        },
    );
    assert!(state.preview().is_none());

    let (state, effects) = update(state, Msg::ClaimFixApproved);
    assert!(effects.is_empty());
    assert_eq!(
        state.document().sections[1].content,
        "Fish are not mammals. Whales are."
    );
}

#[test]
fn stale_fact_check_results_are_ignored() {
    init_logging();
    let (state, _) = update(
        AppState::new(),
        Msg::DocumentLoaded(Document::from_markdown(DOCUMENT)),
    );
    let (state, first) = update(state, Msg::FactCheckRequested);
    let (state, second) = update(state, Msg::FactCheckRequested);
    let id_of = |effects: &[Effect]| match effects {
        [Effect::CheckClaims { request_id, .. }] => *request_id,
        other => panic!("unexpected effects {other:?}"),
    };

    let (state, _) = update(
        state,
        Msg::ClaimsReceived {
            request_id: id_of(&first),
            report: ClaimReport {
                total_claims: 1,
                claims: vec![claim("stale", &[])],
            },
        },
    );
    assert!(state.claims().is_empty());
    assert!(state.fact_check_pending());

    let (state, _) = update(
        state,
        Msg::FactCheckFailed {
            request_id: id_of(&second),
            message: "service unavailable".to_string(),
        },
    );
    assert!(!state.fact_check_pending());
    assert_eq!(
        state.last_error(),
        Some("fact-check failed: service unavailable")
    );
}

#[test]
fn fact_check_on_empty_document_is_an_error() {
    init_logging();
    let (state, effects) = update(AppState::new(), Msg::FactCheckRequested);
    assert!(effects.is_empty());
    assert!(state.last_error().is_some());
}

#[test]
fn claim_report_accepts_wire_names() {
    let wire = serde_json::json!({
        "totalClaims": 1,
        "claims": [{
            "claim": "Dogs are mammals",
            "assessment": "supported",
            "confidence": 87,
            "supportingSources": [{"url": "http://example.com", "title": "Example"}]
        }]
    });
    let report: ClaimReport = serde_json::from_value(wire).unwrap();
    assert_eq!(report.total_claims, 1);
    assert_eq!(report.claims[0].text, "Dogs are mammals");
    assert_eq!(report.claims[0].confidence, 87.0);
    assert_eq!(
        report.claims[0].citation_source().map(|s| s.url.as_str()),
        Some("http://example.com")
    );
}
