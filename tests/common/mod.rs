#![allow(dead_code)]

use std::fs;
use std::path::Path;

use cppcomplete_lsp::{Backend, CompletionProposal, CompletionSettings, Snapshot};
use tower_lsp::LanguageServer;
use tower_lsp::lsp_types::*;

pub fn create_test_backend() -> Backend {
    Backend::new_test()
}

/// Split `src` at its `|` cursor marker: the text without the marker and
/// the marker's byte offset.
pub fn split_cursor(src: &str) -> (String, usize) {
    let cursor = src.find('|').expect("source should contain a `|` cursor marker");
    (src.replacen('|', "", 1), cursor)
}

/// LSP position of the `|` marker in `src`.
pub fn cursor_position(src: &str) -> (String, Position) {
    let (text, cursor) = split_cursor(src);
    let position = cppcomplete_lsp::util::byte_offset_to_position(&text, cursor);
    (text, position)
}

/// Run the engine directly on `src` (with a `|` marker) as `/t/main.cpp`.
pub fn complete_source(src: &str) -> Option<CompletionProposal> {
    complete_source_with(src, &CompletionSettings::default(), &Snapshot::new())
}

pub fn complete_source_with(
    src: &str,
    settings: &CompletionSettings,
    snapshot: &Snapshot,
) -> Option<CompletionProposal> {
    let (text, cursor) = split_cursor(src);
    cppcomplete_lsp::start_completion(snapshot, settings, Path::new("/t/main.cpp"), &text, cursor)
}

/// Candidate texts of the engine's answer, in order; empty when there is
/// no proposal.
pub fn candidate_texts(src: &str) -> Vec<String> {
    complete_source(src)
        .map(|p| p.candidates.iter().map(|c| c.text.clone()).collect())
        .unwrap_or_default()
}

pub async fn open_document(backend: &Backend, uri: &Url, text: &str) {
    backend
        .did_open(DidOpenTextDocumentParams {
            text_document: TextDocumentItem {
                uri: uri.clone(),
                language_id: "cpp".to_string(),
                version: 1,
                text: text.to_string(),
            },
        })
        .await;
}

pub fn completion_params(uri: &Url, position: Position) -> CompletionParams {
    CompletionParams {
        text_document_position: TextDocumentPositionParams {
            text_document: TextDocumentIdentifier { uri: uri.clone() },
            position,
        },
        work_done_progress_params: WorkDoneProgressParams::default(),
        partial_result_params: PartialResultParams::default(),
        context: None,
    }
}

/// Open `src` (with a `|` marker) at `uri` and request completion at the
/// marker.
pub async fn complete_at_marker(backend: &Backend, uri: &Url, src: &str) -> Vec<CompletionItem> {
    let (text, position) = cursor_position(src);
    open_document(backend, uri, &text).await;
    let result = backend
        .completion(completion_params(uri, position))
        .await
        .expect("completion should not fail");
    match result {
        Some(CompletionResponse::List(list)) => list.items,
        Some(CompletionResponse::Array(items)) => items,
        None => Vec::new(),
    }
}

pub fn labels(items: &[CompletionItem]) -> Vec<&str> {
    items.iter().map(|i| i.label.as_str()).collect()
}

/// Create a temp workspace holding `files`, initialize a backend on it and
/// index it.
pub async fn create_workspace(files: &[(&str, &str)]) -> (Backend, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    for (rel_path, content) in files {
        let full = dir.path().join(rel_path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).expect("failed to create dirs");
        }
        fs::write(&full, content).expect("failed to write source file");
    }

    let backend = create_test_backend();
    let root = Url::from_file_path(dir.path()).expect("temp dir should be absolute");
    backend
        .initialize(InitializeParams {
            root_uri: Some(root),
            ..InitializeParams::default()
        })
        .await
        .expect("initialize should succeed");
    backend.index_workspace();
    (backend, dir)
}

pub fn file_uri(dir: &Path, rel_path: &str) -> Url {
    Url::from_file_path(dir.join(rel_path)).expect("path should be absolute")
}
