mod common;

use std::path::Path;

use common::{complete_at_marker, completion_params, create_test_backend, labels, open_document};
use tower_lsp::LanguageServer;
use tower_lsp::lsp_types::*;

#[tokio::test]
async fn test_initialize_server_info() {
    let backend = create_test_backend();
    let params = InitializeParams::default();
    let result = backend.initialize(params).await.unwrap();

    let server_info = result.server_info.expect("server_info should be present");
    assert_eq!(server_info.name, "cppcomplete");
    assert_eq!(
        server_info.version,
        Some(env!("CARGO_PKG_VERSION").to_string())
    );
}

#[tokio::test]
async fn test_initialize_capabilities() {
    let backend = create_test_backend();
    let params = InitializeParams::default();
    let result = backend.initialize(params).await.unwrap();

    let caps = result.capabilities;
    let completion = caps
        .completion_provider
        .expect("Completion provider should be enabled");
    let triggers = completion.trigger_characters.unwrap_or_default();
    for expected in [".", ">", ":", "(", "<", "\"", "/", "#"] {
        assert!(
            triggers.iter().any(|t| t == expected),
            "Missing trigger character '{}', got: {:?}",
            expected,
            triggers
        );
    }

    let signature = caps
        .signature_help_provider
        .expect("Signature help should be enabled");
    assert_eq!(
        signature.trigger_characters,
        Some(vec!["(".to_string(), ",".to_string()])
    );

    match caps.code_action_provider {
        Some(CodeActionProviderCapability::Options(options)) => {
            assert_eq!(
                options.code_action_kinds,
                Some(vec![CodeActionKind::QUICKFIX])
            );
        }
        other => panic!("Expected code action options, got: {:?}", other),
    }
    assert_eq!(
        caps.text_document_sync,
        Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL))
    );
}

#[tokio::test]
async fn test_initialization_options_become_settings() {
    let backend = create_test_backend();
    let params = InitializeParams {
        initialization_options: Some(serde_json::json!({
            "auto_insert_brackets": false,
            "predefined_macros": ["FROM_CLIENT=1"],
        })),
        ..InitializeParams::default()
    };
    backend.initialize(params).await.unwrap();

    let settings = backend.settings();
    assert!(!settings.auto_insert_brackets);
    assert_eq!(settings.predefined_macros, vec!["FROM_CLIENT=1".to_string()]);
}

#[tokio::test]
async fn test_did_open_publishes_document() {
    let backend = create_test_backend();
    let before = backend.snapshot().revision();

    let uri = Url::parse("file:///proj/stored.cpp").unwrap();
    open_document(&backend, &uri, "struct Stored { void m(); };\n").await;

    let snapshot = backend.snapshot();
    assert!(snapshot.revision() > before);
    assert!(
        snapshot.document(Path::new("/proj/stored.cpp")).is_some(),
        "the opened file should be in the snapshot"
    );
}

#[tokio::test]
async fn test_completion_returns_none_when_nothing_applies() {
    let backend = create_test_backend();
    let uri = Url::parse("file:///proj/empty.cpp").unwrap();
    open_document(&backend, &uri, "int x = 1;\nvoid f() { missing. }\n").await;

    let result = backend
        .completion(completion_params(
            &uri,
            Position {
                line: 1,
                character: 19,
            },
        ))
        .await
        .unwrap();
    assert!(
        result.is_none(),
        "Completion should return None when nothing matches"
    );
}

#[tokio::test]
async fn test_completion_for_unknown_document_is_none() {
    let backend = create_test_backend();
    let uri = Url::parse("file:///proj/never_opened.cpp").unwrap();
    let result = backend
        .completion(completion_params(
            &uri,
            Position {
                line: 0,
                character: 0,
            },
        ))
        .await
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_shutdown() {
    let backend = create_test_backend();
    let result = backend.shutdown().await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_did_change_republishes_content() {
    let backend = create_test_backend();
    let uri = Url::parse("file:///proj/changing.cpp").unwrap();
    let src = "struct A {\n    void first();\n};\nvoid f(A a) {\n    a.|\n}\n";

    let items = complete_at_marker(&backend, &uri, src).await;
    assert_eq!(labels(&items), vec!["first"]);
    let revision = backend.snapshot().revision();

    let changed = "struct A {\n    void first();\n    void second();\n};\nvoid f(A a) {\n    a.\n}\n";
    backend
        .did_change(DidChangeTextDocumentParams {
            text_document: VersionedTextDocumentIdentifier {
                uri: uri.clone(),
                version: 2,
            },
            content_changes: vec![TextDocumentContentChangeEvent {
                range: None,
                range_length: None,
                text: changed.to_string(),
            }],
        })
        .await;
    assert!(backend.snapshot().revision() > revision);

    let result = backend
        .completion(completion_params(
            &uri,
            Position {
                line: 5,
                character: 6,
            },
        ))
        .await
        .unwrap();
    let items = match result {
        Some(CompletionResponse::List(list)) => list.items,
        Some(CompletionResponse::Array(items)) => items,
        None => panic!("Expected completions after the change"),
    };
    assert_eq!(labels(&items), vec!["first", "second"]);
}

#[tokio::test]
async fn test_did_close_keeps_the_document_for_includers() {
    let backend = create_test_backend();
    let uri = Url::parse("file:///proj/closing.h").unwrap();
    open_document(&backend, &uri, "struct Closed { int x; };\n").await;

    backend
        .did_close(DidCloseTextDocumentParams {
            text_document: TextDocumentIdentifier { uri: uri.clone() },
        })
        .await;

    assert!(
        backend
            .snapshot()
            .document(Path::new("/proj/closing.h"))
            .is_some(),
        "a closed header should stay visible to files including it"
    );
    let result = backend
        .completion(completion_params(
            &uri,
            Position {
                line: 0,
                character: 0,
            },
        ))
        .await
        .unwrap();
    assert!(result.is_none(), "the closed buffer is no longer served");
}

#[tokio::test]
async fn test_did_change_configuration_reloads_settings() {
    let backend = create_test_backend();
    assert!(backend.settings().auto_insert_brackets);

    backend
        .did_change_configuration(DidChangeConfigurationParams {
            settings: serde_json::json!({
                "cppcomplete": { "auto_insert_brackets": false, "character_threshold": 2 }
            }),
        })
        .await;

    let settings = backend.settings();
    assert!(!settings.auto_insert_brackets);
    assert_eq!(settings.character_threshold, 2);
}
