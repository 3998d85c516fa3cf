/// LSP server trait implementation.
///
/// This module contains the `impl LanguageServer for Backend` block,
/// which handles all LSP protocol messages (initialize, didOpen, didChange,
/// didClose, completion, signature help, code actions).  The request
/// handlers themselves live in [`crate::completion::handler`].
use std::sync::Arc;

use tower_lsp::LanguageServer;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;

use crate::config;
use crate::{Backend, index_directory, publish_indexed};

/// Characters after which the client should ask for completion.  `>` and
/// `:` only matter as the second half of `->` and `::`; the classifier
/// sorts out lone ones.
const TRIGGER_CHARACTERS: &[&str] = &[".", ">", ":", "(", "<", "\"", "/", "#", ",", "&", "@", "\\"];

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        // Extract and store the workspace root path
        let workspace_root = params
            .root_uri
            .as_ref()
            .and_then(|uri| uri.to_file_path().ok());

        let mut settings = config::load(
            workspace_root.as_deref(),
            params.initialization_options.as_ref(),
        );
        settings.header_paths = settings.resolved_header_paths(workspace_root.as_deref());
        *self.settings.write() = settings;
        *self.workspace_root.write() = workspace_root;

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                completion_provider: Some(CompletionOptions {
                    resolve_provider: Some(false),
                    trigger_characters: Some(
                        TRIGGER_CHARACTERS.iter().map(|c| c.to_string()).collect(),
                    ),
                    all_commit_characters: None,
                    work_done_progress_options: WorkDoneProgressOptions {
                        work_done_progress: None,
                    },
                    ..CompletionOptions::default()
                }),
                signature_help_provider: Some(SignatureHelpOptions {
                    trigger_characters: Some(vec!["(".to_string(), ",".to_string()]),
                    retrigger_characters: None,
                    work_done_progress_options: WorkDoneProgressOptions {
                        work_done_progress: None,
                    },
                }),
                code_action_provider: Some(CodeActionProviderCapability::Options(
                    CodeActionOptions {
                        code_action_kinds: Some(vec![CodeActionKind::QUICKFIX]),
                        ..CodeActionOptions::default()
                    },
                )),
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                ..ServerCapabilities::default()
            },
            server_info: Some(ServerInfo {
                name: self.name.clone(),
                version: Some(self.version.clone()),
            }),
            offset_encoding: None,
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        let workspace_root = self.workspace_root.read().clone();
        let Some(root) = workspace_root else {
            self.log(MessageType::INFO, "cppcomplete initialized".to_string())
                .await;
            return;
        };

        // Indexing runs in the background; completion works on the open
        // buffers meanwhile.
        let settings = self.settings();
        let snapshot = Arc::clone(&self.snapshot);
        let open_files = Arc::clone(&self.open_files);
        let client = self.client.clone();
        tokio::spawn(async move {
            let walk_root = root.clone();
            let docs =
                match tokio::task::spawn_blocking(move || index_directory(&walk_root, &settings))
                    .await
                {
                    Ok(docs) => docs,
                    Err(e) => {
                        tracing::error!("cppcomplete: workspace indexing failed: {e}");
                        return;
                    }
                };
            let count = publish_indexed(&snapshot, &open_files, docs);
            tracing::info!("cppcomplete: indexed {count} file(s) under {}", root.display());
            if let Some(client) = client {
                client
                    .log_message(
                        MessageType::INFO,
                        format!("cppcomplete initialized! Indexed {count} file(s)"),
                    )
                    .await;
            }
        });
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let doc = params.text_document;
        let uri = doc.uri.to_string();
        let text = doc.text;

        // Store file content
        self.open_files.write().insert(uri.clone(), text.clone());

        let revision = self.publish_document(&crate::uri_to_path(&doc.uri), &text);
        tracing::debug!("cppcomplete: opened {uri} (revision {revision})");

        self.log(MessageType::INFO, format!("Opened file: {}", uri))
            .await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;

        if let Some(change) = params.content_changes.first() {
            let text = &change.text;

            // Update stored content
            self.open_files
                .write()
                .insert(uri.to_string(), text.clone());

            self.publish_document(&crate::uri_to_path(&uri), text);
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri.to_string();

        // The document stays in the snapshot; other files may include it.
        self.open_files.write().remove(&uri);

        self.log(MessageType::INFO, format!("Closed file: {}", uri))
            .await;
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        let root = self.workspace_root.read().clone();
        // Accept both `{ "cppcomplete": { ... } }` and the bare table.
        let options = params.settings.get("cppcomplete").unwrap_or(&params.settings);
        let mut settings = config::load(root.as_deref(), Some(options));
        settings.header_paths = settings.resolved_header_paths(root.as_deref());
        *self.settings.write() = settings;
        tracing::debug!("cppcomplete: settings reloaded");
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        self.handle_completion(params).await
    }

    async fn signature_help(&self, params: SignatureHelpParams) -> Result<Option<SignatureHelp>> {
        self.handle_signature_help(params).await
    }

    async fn code_action(&self, params: CodeActionParams) -> Result<Option<CodeActionResponse>> {
        self.handle_code_action(params).await
    }
}
