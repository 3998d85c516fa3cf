mod common;

use common::{create_test_backend, cursor_position, open_document};
use tower_lsp::LanguageServer;
use tower_lsp::lsp_types::*;

async fn signature_help_at(src: &str) -> Option<SignatureHelp> {
    let backend = create_test_backend();
    let uri = Url::parse("file:///sig/main.cpp").unwrap();
    let (text, position) = cursor_position(src);
    open_document(&backend, &uri, &text).await;
    backend
        .signature_help(SignatureHelpParams {
            context: None,
            text_document_position_params: TextDocumentPositionParams {
                text_document: TextDocumentIdentifier { uri },
                position,
            },
            work_done_progress_params: WorkDoneProgressParams::default(),
        })
        .await
        .expect("signature help should not fail")
}

fn signature_labels(help: &SignatureHelp) -> Vec<&str> {
    help.signatures.iter().map(|s| s.label.as_str()).collect()
}

#[tokio::test]
async fn test_overloads_are_listed_after_open_paren() {
    let help = signature_help_at(
        "void draw(int x);\nvoid draw(int x, int y = 0);\nvoid f() {\n    draw(|);\n}\n",
    )
    .await
    .expect("signature help");
    assert_eq!(
        signature_labels(&help),
        vec!["void draw(int x)", "void draw(int x, int y = 0)"]
    );
    assert_eq!(help.active_parameter, Some(0));
    assert_eq!(help.active_signature, Some(0));

    let params = help.signatures[1]
        .parameters
        .as_ref()
        .expect("parameters");
    let names: Vec<String> = params
        .iter()
        .map(|p| match &p.label {
            ParameterLabel::Simple(s) => s.clone(),
            other => panic!("Expected simple labels, got: {:?}", other),
        })
        .collect();
    assert_eq!(names, vec!["int x", "int y = 0"]);
}

#[tokio::test]
async fn test_active_parameter_follows_commas() {
    let help = signature_help_at(
        "void draw(int x);\nvoid draw(int x, int y = 0);\nvoid f() {\n    draw(1, |);\n}\n",
    )
    .await
    .expect("signature help");
    assert_eq!(help.active_parameter, Some(1));
    assert_eq!(
        help.active_signature,
        Some(1),
        "the overload taking two arguments should be selected"
    );
}

#[tokio::test]
async fn test_nested_call_uses_the_innermost_function() {
    let help = signature_help_at(
        "int width();\nvoid move(int x, int y);\nvoid f() {\n    move(width(|), 2);\n}\n",
    )
    .await
    .expect("signature help");
    assert_eq!(signature_labels(&help), vec!["int width()"]);
}

#[tokio::test]
async fn test_member_function_signature() {
    let help = signature_help_at(
        "struct Path {\n    void lineTo(double x, double y);\n};\nvoid f(Path &p) {\n    p.lineTo(0.5, |\n}\n",
    )
    .await
    .expect("signature help");
    assert_eq!(
        signature_labels(&help),
        vec!["void lineTo(double x, double y)"]
    );
    assert_eq!(help.active_parameter, Some(1));
}

#[tokio::test]
async fn test_constructor_signature_for_declared_variable() {
    let help = signature_help_at(
        "struct Size {\n    Size(int w, int h);\n};\nvoid f() {\n    Size size(|\n}\n",
    )
    .await
    .expect("signature help");
    assert_eq!(signature_labels(&help), vec!["Size(int w, int h)"]);
}

#[tokio::test]
async fn test_outside_a_call_there_is_no_help() {
    assert!(
        signature_help_at("int value;\nvoid f() {\n    value = |;\n}\n")
            .await
            .is_none()
    );
}

#[tokio::test]
async fn test_unknown_function_has_no_help() {
    assert!(
        signature_help_at("void f() {\n    missing(|);\n}\n")
            .await
            .is_none()
    );
}
