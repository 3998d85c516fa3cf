use cppcomplete_lsp::completion::classifier::{build_request, classify, triggers_completion};
use cppcomplete_lsp::completion::ranking::{filter, matches, texts};
use cppcomplete_lsp::config::CaseSensitivity;
use cppcomplete_lsp::{Candidate, CandidateKind, CompletionSettings, TriggerKind};

fn symbols(names: &[&str]) -> Vec<Candidate> {
    names
        .iter()
        .map(|n| Candidate::new(*n, CandidateKind::Symbol))
        .collect()
}

// ─── Filtering ──────────────────────────────────────────────────────────────

#[test]
fn test_prefix_matches_come_before_abbreviations() {
    let candidates = symbols(&["a_b_c", "a_c", "a_c_a"]);
    let out = filter(&candidates, "a_c", CaseSensitivity::FirstLetter);
    assert_eq!(texts(&out), vec!["a_c", "a_c_a", "a_b_c"]);
}

#[test]
fn test_camel_case_humps() {
    assert!(matches("gFN", "getFileName", CaseSensitivity::FirstLetter));
    assert!(matches("gfn", "get_file_name", CaseSensitivity::FirstLetter));
    assert!(!matches("gfx", "getFileName", CaseSensitivity::FirstLetter));
}

#[test]
fn test_case_sensitivity_modes() {
    assert!(!matches("Get", "getValue", CaseSensitivity::FirstLetter));
    assert!(matches("gETV", "getValue", CaseSensitivity::FirstLetter));
    assert!(matches("Get", "getValue", CaseSensitivity::Insensitive));
    assert!(!matches("getvalue", "getValue", CaseSensitivity::Full));
    assert!(matches("getV", "getValue", CaseSensitivity::Full));
}

#[test]
fn test_higher_order_wins_among_equal_prefixes() {
    let candidates = vec![
        Candidate::new("count", CandidateKind::Symbol).with_order(0),
        Candidate::new("counter", CandidateKind::Symbol).with_order(2),
        Candidate::new("countdown", CandidateKind::Keyword).with_order(-2),
    ];
    let out = filter(&candidates, "cou", CaseSensitivity::FirstLetter);
    assert_eq!(texts(&out), vec!["counter", "count", "countdown"]);
}

#[test]
fn test_lone_exact_match_is_dropped() {
    let candidates = symbols(&["value", "other"]);
    assert!(filter(&candidates, "value", CaseSensitivity::FirstLetter).is_empty());

    let candidates = symbols(&["value", "values"]);
    assert_eq!(
        texts(&filter(&candidates, "value", CaseSensitivity::FirstLetter)),
        vec!["value", "values"]
    );
}

#[test]
fn test_empty_prefix_keeps_everything_in_order() {
    let candidates = symbols(&["zeta", "alpha"]);
    assert_eq!(
        texts(&filter(&candidates, "", CaseSensitivity::FirstLetter)),
        vec!["zeta", "alpha"]
    );
}

// ─── Classification ─────────────────────────────────────────────────────────

#[test]
fn test_operators_are_classified() {
    let cases = [
        ("a.", TriggerKind::Dot),
        ("a->", TriggerKind::Arrow),
        ("a::", TriggerKind::ColonColon),
        ("a.*", TriggerKind::DotStar),
        ("a->*", TriggerKind::ArrowStar),
        ("f(", TriggerKind::LParen),
        ("#", TriggerKind::Pound),
        ("#include <", TriggerKind::AngleStringLiteral),
        ("#include \"", TriggerKind::StringLiteral),
    ];
    for (text, expected) in cases {
        let (kind, _) = classify(text, text.len(), true, true);
        assert_eq!(kind, expected, "classifying {:?}", text);
    }
}

#[test]
fn test_rejected_operators() {
    for text in ["a:::", "// a.", "\"a.", "a < ", "1 / ", "if ("] {
        let (kind, start) = classify(text, text.len(), true, true);
        assert_eq!(kind, TriggerKind::None, "classifying {:?}", text);
        assert_eq!(start, text.len());
    }
}

#[test]
fn test_automatic_trigger_threshold() {
    let settings = CompletionSettings {
        character_threshold: 3,
        ..CompletionSettings::default()
    };
    assert!(!triggers_completion("ab", 2, &settings));
    assert!(triggers_completion("abc", 3, &settings));
    assert!(triggers_completion("x.", 2, &settings));
    assert!(!triggers_completion("abcd", 2, &settings), "not inside a name");
    assert!(!triggers_completion("// abc", 6, &settings));
}

#[test]
fn test_member_request_spans_the_expression() {
    let settings = CompletionSettings::default();
    let text = "void f() { obj.child->na";
    let req = build_request(text, text.len(), &settings).expect("request");
    assert_eq!(req.trigger, TriggerKind::Arrow);
    assert_eq!(req.expression, "obj.child");
    assert_eq!(req.typed_prefix(text), "na");
}
