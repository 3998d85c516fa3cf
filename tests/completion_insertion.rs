mod common;

use common::{complete_at_marker, create_test_backend, labels};
use cppcomplete_lsp::config::Snippet;
use cppcomplete_lsp::{Backend, CompletionSettings};
use tower_lsp::lsp_types::*;

const CLASS: &str = concat!(
    "struct S {\n",
    "    void reset();\n",
    "    int size() const;\n",
    "    void resize(int n);\n",
    "    S *next;\n",
    "};\n",
);

fn in_body(line: &str) -> String {
    format!("{CLASS}void f(S s) {{\n    {line}\n}}\n")
}

fn item<'a>(items: &'a [CompletionItem], label: &str) -> &'a CompletionItem {
    items
        .iter()
        .find(|i| i.label == label)
        .unwrap_or_else(|| panic!("Should contain '{}', got: {:?}", label, labels(items)))
}

fn text_edit(item: &CompletionItem) -> &TextEdit {
    match &item.text_edit {
        Some(CompletionTextEdit::Edit(edit)) => edit,
        other => panic!("Expected a plain text edit, got: {:?}", other),
    }
}

fn range(line: u32, start: u32, end: u32) -> Range {
    Range {
        start: Position {
            line,
            character: start,
        },
        end: Position {
            line,
            character: end,
        },
    }
}

#[tokio::test]
async fn test_void_call_without_arguments_is_inserted_whole() {
    let backend = create_test_backend();
    let uri = Url::parse("file:///insert/reset.cpp").unwrap();
    let items = complete_at_marker(&backend, &uri, &in_body("s.res|")).await;

    let reset = item(&items, "reset");
    let edit = text_edit(reset);
    assert_eq!(edit.new_text, "reset();");
    assert_eq!(edit.range, range(7, 6, 9));
    assert_eq!(reset.insert_text_format, Some(InsertTextFormat::PLAIN_TEXT));
}

#[tokio::test]
async fn test_call_with_arguments_places_cursor_in_brackets() {
    let backend = create_test_backend();
    let uri = Url::parse("file:///insert/resize.cpp").unwrap();
    let items = complete_at_marker(&backend, &uri, &in_body("s.res|")).await;

    let resize = item(&items, "resize");
    assert_eq!(text_edit(resize).new_text, "resize($0);");
    assert_eq!(resize.insert_text_format, Some(InsertTextFormat::SNIPPET));
}

#[tokio::test]
async fn test_value_returning_call_gets_no_semicolon() {
    let backend = create_test_backend();
    let uri = Url::parse("file:///insert/size.cpp").unwrap();
    let items = complete_at_marker(&backend, &uri, &in_body("int n = s.si|")).await;

    assert_eq!(text_edit(item(&items, "size")).new_text, "size()");
}

#[tokio::test]
async fn test_text_after_cursor_is_overwritten_not_doubled() {
    let backend = create_test_backend();
    let uri = Url::parse("file:///insert/preserve.cpp").unwrap();
    let items = complete_at_marker(&backend, &uri, &in_body("s.re|set();")).await;

    let edit = text_edit(item(&items, "reset"));
    assert_eq!(edit.new_text, "reset();");
    assert_eq!(
        edit.range,
        range(7, 6, 14),
        "the range should swallow `set();` already in the buffer"
    );
}

#[tokio::test]
async fn test_field_gets_no_brackets() {
    let backend = create_test_backend();
    let uri = Url::parse("file:///insert/field.cpp").unwrap();
    let items = complete_at_marker(&backend, &uri, &in_body("s.ne|")).await;

    let next = item(&items, "next");
    assert_eq!(text_edit(next).new_text, "next");
    assert_eq!(
        next.commit_characters,
        Some(
            [":", ";", ".", ",", "("]
                .iter()
                .map(|c| c.to_string())
                .collect()
        )
    );
}

#[tokio::test]
async fn test_space_after_function_name_setting() {
    let backend = Backend::new_test_with_settings(CompletionSettings {
        space_after_function_name: true,
        ..CompletionSettings::default()
    });
    let uri = Url::parse("file:///insert/space.cpp").unwrap();
    let items = complete_at_marker(&backend, &uri, &in_body("s.res|")).await;

    assert_eq!(text_edit(item(&items, "reset")).new_text, "reset ();");
}

#[tokio::test]
async fn test_brackets_can_be_turned_off() {
    let backend = Backend::new_test_with_settings(CompletionSettings {
        auto_insert_brackets: false,
        ..CompletionSettings::default()
    });
    let uri = Url::parse("file:///insert/plain.cpp").unwrap();
    let items = complete_at_marker(&backend, &uri, &in_body("s.res|")).await;

    let reset = item(&items, "reset");
    assert_eq!(text_edit(reset).new_text, "reset");
    let commit = reset.commit_characters.clone().unwrap_or_default();
    assert!(
        commit.iter().any(|c| c == "("),
        "a bare name can be committed with `(`, got: {:?}",
        commit
    );
}

#[tokio::test]
async fn test_constructor_is_inserted_as_a_name() {
    let backend = create_test_backend();
    let uri = Url::parse("file:///insert/ctor.cpp").unwrap();
    let src = "struct Point {\n    Point(int x, int y);\n    int x;\n};\nvoid f() {\n    Point p = Point::Poi|\n}\n";
    let items = complete_at_marker(&backend, &uri, src).await;

    assert_eq!(text_edit(item(&items, "Point")).new_text, "Point");
}

#[tokio::test]
async fn test_snippet_is_expanded_as_template() {
    let backend = Backend::new_test_with_settings(CompletionSettings {
        snippets: vec![Snippet {
            trigger: "fori".to_string(),
            body: "for (int ${1:i} = 0; $1 < ${2:n}; ++$1) {\n\t$0\n}".to_string(),
            description: None,
        }],
        ..CompletionSettings::default()
    });
    let uri = Url::parse("file:///insert/snippet.cpp").unwrap();
    let items = complete_at_marker(&backend, &uri, "void f() {\n    fo|\n}\n").await;

    let snippet = items
        .iter()
        .find(|i| i.kind == Some(CompletionItemKind::SNIPPET))
        .unwrap_or_else(|| panic!("Should contain the `fori` snippet, got: {:?}", labels(&items)));
    assert_eq!(snippet.label, "fori");
    assert_eq!(snippet.insert_text_format, Some(InsertTextFormat::SNIPPET));
    assert_eq!(
        text_edit(snippet).new_text,
        "for (int ${1:i} = 0; $1 < ${2:n}; ++$1) {\n\t$0\n}"
    );
    assert_eq!(text_edit(snippet).range, range(1, 4, 6));
}

#[tokio::test]
async fn test_template_functions_are_called_like_any_other() {
    let backend = create_test_backend();
    let uri = Url::parse("file:///insert/templates.cpp").unwrap();
    let src = concat!(
        "template<class T> void g(T t);\n",
        "template<class T> T make();\n",
        "void f() {\n",
        "    |\n",
        "}\n",
    );

    let items = complete_at_marker(&backend, &uri, &src.replace('|', "g|")).await;
    let g = item(&items, "g");
    assert_eq!(text_edit(g).new_text, "g($0);");
    assert_eq!(g.insert_text_format, Some(InsertTextFormat::SNIPPET));

    let items = complete_at_marker(&backend, &uri, &src.replace('|', "ma|")).await;
    let make = item(&items, "make");
    assert_eq!(text_edit(make).new_text, "make()");
    assert_eq!(make.insert_text_format, Some(InsertTextFormat::PLAIN_TEXT));
}
