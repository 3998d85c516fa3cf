use std::path::Path;

use cppcomplete_lsp::{CompletionSession, CompletionSettings, SessionState, Snapshot};

const SOURCE: &str = concat!(
    "struct Node {\n",
    "    void reset();\n",
    "    void resize(int n);\n",
    "    Node *next;\n",
    "    int value;\n",
    "};\n",
    "void f(Node n) {\n",
);

const TAIL: &str = "\n}\n";

/// The source with `line` as the body of `f`, and the cursor at the end of
/// `line`.
fn body(line: &str) -> (String, usize) {
    let text = format!("{SOURCE}    {line}{TAIL}");
    let cursor = text.len() - TAIL.len();
    (text, cursor)
}

fn path() -> &'static Path {
    Path::new("/t/session.cpp")
}

fn texts(session: &CompletionSession) -> Vec<&str> {
    session.visible().iter().map(|c| c.text.as_str()).collect()
}

#[test]
fn test_full_cycle_returns_to_idle() {
    let snapshot = Snapshot::new();
    let mut session = CompletionSession::new(CompletionSettings::default());
    assert_eq!(session.state(), SessionState::Idle);

    let (text, cursor) = body("n.");
    assert!(session.on_keystroke(&snapshot, path(), &text, cursor));
    assert_eq!(session.state(), SessionState::Listing);
    assert_eq!(texts(&session), vec!["next", "reset", "resize", "value"]);

    let (text, cursor) = body("n.res");
    let narrowed: Vec<String> = session
        .filter(&text, cursor)
        .iter()
        .map(|c| c.text.clone())
        .collect();
    assert_eq!(narrowed, vec!["reset", "resize"]);
    assert_eq!(session.state(), SessionState::Filtering);

    let edit = session
        .commit(0, None, &text, cursor)
        .expect("commit should produce an edit");
    assert_eq!(session.state(), SessionState::Committed);
    let applied = edit.apply(&text);
    assert!(applied.ends_with("    n.reset();\n}\n"), "got: {applied}");

    assert!(!session.finish(&edit, &snapshot, path(), &applied, edit.cursor_after()));
    assert_eq!(session.state(), SessionState::Idle);
}

#[test]
fn test_typed_dot_restarts_the_cycle() {
    let snapshot = Snapshot::new();
    let mut session = CompletionSession::new(CompletionSettings::default());
    let (text, cursor) = body("n.ne");
    assert!(session.start(&snapshot, path(), &text, cursor));
    assert_eq!(texts(&session), vec!["next"]);

    let edit = session
        .commit(0, Some('.'), &text, cursor)
        .expect("commit should produce an edit");
    assert!(edit.restart_completion);
    let applied = edit.apply(&text);
    assert!(applied.ends_with("n.next.\n}\n"), "got: {applied}");

    assert!(session.finish(&edit, &snapshot, path(), &applied, edit.cursor_after()));
    assert_eq!(session.state(), SessionState::Listing);
    let proposal = session.proposal().expect("a new proposal");
    assert!(
        proposal.replace_dot_at.is_some(),
        "`next` is a pointer, so the dot should become an arrow"
    );

    let cursor = edit.cursor_after();
    let index = session
        .visible()
        .iter()
        .position(|c| c.text == "value")
        .expect("`value` should be listed");
    let second = session
        .commit(index, None, &applied, cursor)
        .expect("commit should produce an edit");
    let rewritten = second.apply(&applied);
    assert!(rewritten.ends_with("    n.next->value\n}\n"), "got: {rewritten}");
    assert_eq!(second.cursor_after(), rewritten.len() - TAIL.len());
}

#[test]
fn test_filtering_to_nothing_cancels() {
    let snapshot = Snapshot::new();
    let mut session = CompletionSession::new(CompletionSettings::default());
    let (text, cursor) = body("n.");
    assert!(session.start(&snapshot, path(), &text, cursor));

    let (text, cursor) = body("n.zzz");
    assert!(session.filter(&text, cursor).is_empty());
    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.proposal().is_none());
}

#[test]
fn test_moving_before_the_name_cancels() {
    let snapshot = Snapshot::new();
    let mut session = CompletionSession::new(CompletionSettings::default());
    let (text, cursor) = body("n.");
    assert!(session.start(&snapshot, path(), &text, cursor));

    assert!(session.filter(&text, cursor - 2).is_empty());
    assert_eq!(session.state(), SessionState::Idle);
}

#[test]
fn test_identifier_threshold_triggers_automatically() {
    let snapshot = Snapshot::new();
    let settings = CompletionSettings {
        character_threshold: 3,
        ..CompletionSettings::default()
    };
    let mut session = CompletionSession::new(settings);
    let base = "int counter;\nvoid f() {\n    ";

    let short = format!("{base}co{TAIL}");
    let at = short.len() - TAIL.len();
    assert!(!session.on_keystroke(&snapshot, path(), &short, at));
    assert_eq!(session.state(), SessionState::Idle);

    let long = format!("{base}cou{TAIL}");
    let at = long.len() - TAIL.len();
    assert!(session.on_keystroke(&snapshot, path(), &long, at));
    assert!(texts(&session).contains(&"counter"), "got: {:?}", texts(&session));
}

#[test]
fn test_no_trigger_inside_comment() {
    let snapshot = Snapshot::new();
    let mut session = CompletionSession::new(CompletionSettings::default());
    let text = "struct P { int v; };\nvoid f(P p) {\n    // p.\n}\n";
    let at = text.len() - TAIL.len();
    assert!(!session.on_keystroke(&snapshot, path(), text, at));
    assert_eq!(session.state(), SessionState::Idle);
}

#[test]
fn test_cancel_clears_the_list() {
    let snapshot = Snapshot::new();
    let mut session = CompletionSession::new(CompletionSettings::default());
    let (text, cursor) = body("n.");
    assert!(session.start(&snapshot, path(), &text, cursor));
    session.cancel();
    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.visible().is_empty());
    assert!(session.commit(0, None, &text, cursor).is_none());
}
