mod common;

use std::path::Path;

use common::{
    candidate_texts, complete_at_marker, complete_source, complete_source_with,
    create_test_backend, labels,
};
use cppcomplete_lsp::config::Snippet;
use cppcomplete_lsp::{CandidateKind, CompletionSettings, Snapshot};
use tower_lsp::lsp_types::*;

fn contains(names: &[String], name: &str) -> bool {
    names.iter().any(|n| n == name)
}

// ─── Scope operator ─────────────────────────────────────────────────────────

#[test]
fn test_namespace_scope_lists_its_members() {
    let names = candidate_texts(
        "namespace net {\n    int port;\n    void connect();\n    class Socket {};\n}\nint unrelated;\nvoid f() {\n    net::|\n}\n",
    );
    assert_eq!(names, vec!["connect", "port", "Socket"]);
}

#[test]
fn test_reopened_namespaces_are_merged() {
    let names = candidate_texts(
        "namespace gfx { int width; }\nnamespace gfx { int height; }\nvoid f() {\n    gfx::|\n}\n",
    );
    assert_eq!(names, vec!["height", "width"]);
}

#[test]
fn test_class_scope_offers_injected_class_name_last() {
    let names = candidate_texts(
        "struct Config {\n    static int count;\n    enum Level { Low, High };\n    static void reset();\n};\nvoid f() {\n    Config::|\n}\n",
    );
    for expected in ["count", "Level", "reset", "Low", "High"] {
        assert!(
            contains(&names, expected),
            "Should contain '{}', got: {:?}",
            expected,
            names
        );
    }
    assert_eq!(
        names.last().map(String::as_str),
        Some("Config"),
        "The class's own name ranks last, got: {:?}",
        names
    );
}

#[test]
fn test_enum_scope_lists_enumerators() {
    let names = candidate_texts(
        "enum class Color { Red, Green, Blue };\nvoid f() {\n    Color::|\n}\n",
    );
    assert_eq!(names, vec!["Blue", "Green", "Red"]);
}

#[test]
fn test_leading_scope_operator_lists_global_namespace_only() {
    let names = candidate_texts(
        "int global_x;\nnamespace inner { int hidden; }\nvoid f() {\n    int local;\n    ::|\n}\n",
    );
    assert!(contains(&names, "global_x"), "got: {:?}", names);
    assert!(contains(&names, "inner"), "got: {:?}", names);
    assert!(!contains(&names, "hidden"), "got: {:?}", names);
    assert!(!contains(&names, "local"), "got: {:?}", names);
    assert!(!contains(&names, "while"), "keywords are not scoped, got: {:?}", names);
}

// ─── Global completion ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_inner_declaration_shadows_outer_one() {
    let backend = create_test_backend();
    let uri = Url::parse("file:///scopes/shadow.cpp").unwrap();
    let src = "int value;\nvoid f() {\n    double value;\n    val|\n}\n";

    let items = complete_at_marker(&backend, &uri, src).await;
    let values: Vec<&CompletionItem> = items.iter().filter(|i| i.label == "value").collect();
    assert_eq!(values.len(), 1, "got: {:?}", labels(&items));
    let detail = values[0].detail.clone().unwrap_or_default();
    assert!(
        detail.contains("double"),
        "The local declaration should win, got: {detail}"
    );
}

fn details_of(src: &str, name: &str) -> Vec<String> {
    complete_source(src)
        .map(|p| {
            p.candidates
                .iter()
                .filter(|c| c.text == name)
                .map(|c| c.detail.clone().unwrap_or_default())
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn test_local_then_member_then_global() {
    let class = "class Gauge {\n    float level;\n    void read();\n};\nlong level;\n";

    let with_local = format!("{class}void Gauge::read() {{\n    char level;\n    |\n}}\n");
    let details = details_of(&with_local, "level");
    assert_eq!(details.len(), 1, "got: {:?}", details);
    assert!(details[0].contains("char"), "the local should win, got: {:?}", details);

    let without_local = format!("{class}void Gauge::read() {{\n    |\n}}\n");
    let details = details_of(&without_local, "level");
    assert_eq!(details.len(), 1, "got: {:?}", details);
    assert!(details[0].contains("float"), "the member should win, got: {:?}", details);

    let free_function = format!("{class}void other() {{\n    |\n}}\n");
    let details = details_of(&free_function, "level");
    assert_eq!(details.len(), 1, "got: {:?}", details);
    assert!(details[0].contains("long"), "got: {:?}", details);
}

#[test]
fn test_repeated_completion_on_one_snapshot_agrees() {
    let backend = create_test_backend();
    backend.publish_document(
        Path::new("/t/shape.h"),
        "namespace geo {\nstruct Shape {\n    double area() const;\n    int sides;\n};\n}\n",
    );
    let snapshot = backend.snapshot();
    let settings = CompletionSettings::default();
    let sources = [
        "#include \"shape.h\"\nvoid f(geo::Shape s) {\n    s.|\n}\n",
        "#include \"shape.h\"\nusing namespace geo;\nvoid f() {\n    |\n}\n",
        "#include \"shape.h\"\nvoid f() {\n    geo::|\n}\n",
    ];

    for src in sources {
        let run = || {
            let mut texts: Vec<String> = complete_source_with(src, &settings, &snapshot)
                .map(|p| p.candidates.iter().map(|c| c.text.clone()).collect())
                .unwrap_or_default();
            texts.sort();
            texts
        };
        let first = run();
        assert!(!first.is_empty(), "no candidates for {:?}", src);
        assert_eq!(first, run(), "completing {:?} twice", src);
    }
}

#[test]
fn test_using_directive_at_file_scope() {
    let names = candidate_texts(
        "namespace util { int helper; }\nusing namespace util;\nvoid f() {\n    |\n}\n",
    );
    assert!(contains(&names, "helper"), "got: {:?}", names);
}

#[test]
fn test_using_directive_in_block() {
    let names = candidate_texts(
        "namespace util { int helper; }\nvoid f() {\n    using namespace util;\n    |\n}\n",
    );
    assert!(contains(&names, "helper"), "got: {:?}", names);
}

#[test]
fn test_template_parameters_of_enclosing_function() {
    let names = candidate_texts("template <typename Element>\nvoid push(Element e) {\n    |\n}\n");
    assert!(contains(&names, "Element"), "got: {:?}", names);
    assert!(contains(&names, "e"), "got: {:?}", names);
}

#[test]
fn test_unscoped_enumerators_are_visible() {
    let names = candidate_texts("enum Flag { FlagA, FlagB };\nvoid f() {\n    |\n}\n");
    assert!(contains(&names, "FlagA"), "got: {:?}", names);
    assert!(contains(&names, "FlagB"), "got: {:?}", names);
}

#[test]
fn test_members_visible_inside_member_function() {
    let names = candidate_texts(
        "class Counter {\n    int ticks;\n    void tick();\n};\nvoid Counter::tick() {\n    |\n}\n",
    );
    assert!(contains(&names, "ticks"), "got: {:?}", names);
}

#[test]
fn test_keywords_and_macros() {
    let proposal = complete_source("#define MAX_SIZE 10\nvoid f() {\n    |\n}\n").expect("proposal");
    let max = proposal
        .candidates
        .iter()
        .find(|c| c.text == "MAX_SIZE")
        .expect("document macro");
    assert_eq!(max.kind, CandidateKind::Macro);
    let ret = proposal
        .candidates
        .iter()
        .find(|c| c.text == "return")
        .expect("keyword");
    assert_eq!(ret.kind, CandidateKind::Keyword);
}

#[test]
fn test_configured_macros_and_snippets() {
    let settings = CompletionSettings {
        predefined_macros: vec!["PLATFORM_LINUX=1".to_string()],
        snippets: vec![Snippet {
            trigger: "fori".to_string(),
            body: "for (int ${1:i} = 0; $1 < ${2:n}; ++$1) {\n\t$0\n}".to_string(),
            description: Some("counted loop".to_string()),
        }],
        ..CompletionSettings::default()
    };
    let proposal =
        complete_source_with("void f() {\n    |\n}\n", &settings, &Snapshot::new()).expect("proposal");
    assert!(
        proposal.candidates.iter().any(|c| c.text == "PLATFORM_LINUX"),
        "predefined macro should be offered"
    );
    let snippet = proposal
        .candidates
        .iter()
        .find(|c| c.kind == CandidateKind::Snippet)
        .expect("snippet");
    assert_eq!(snippet.text, "fori");
    assert_eq!(snippet.detail.as_deref(), Some("counted loop"));
}

#[test]
fn test_qt_keywords_follow_settings() {
    let src = "void f() {\n    |\n}\n";
    let with_qt = candidate_texts(src);
    assert!(with_qt.iter().any(|n| n == "Q_EMIT"), "got: {:?}", with_qt.len());

    let settings = CompletionSettings {
        qt_keywords: false,
        ..CompletionSettings::default()
    };
    let proposal = complete_source_with(src, &settings, &Snapshot::new()).expect("proposal");
    assert!(!proposal.candidates.iter().any(|c| c.text == "Q_EMIT"));
}
