use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ignore::WalkBuilder;
use parking_lot::RwLock;
use tower_lsp::Client;
use tower_lsp::lsp_types::{MessageType, Url};

// ─── Module declarations ────────────────────────────────────────────────────

pub mod completion;
pub mod config;
pub mod frontend;
pub mod lexer;
mod server;
pub mod types;
pub mod util;

// ─── Re-exports ─────────────────────────────────────────────────────────────

pub use completion::engine::start_completion;
pub use completion::insertion::commit;
pub use completion::session::{CompletionSession, SessionState};
pub use config::CompletionSettings;
pub use frontend::document::Document;
pub use frontend::snapshot::Snapshot;
pub use types::{
    BufferEdit, Candidate, CandidateKind, CompletionProposal, CompletionRequest, FunctionHint,
    TriggerKind,
};

use frontend::parser::{ParseOptions, parse_document};

/// Extensions of C-family sources picked up by workspace indexing, on top
/// of the configured header suffixes.
const SOURCE_EXTENSIONS: &[&str] = &["c", "cc", "cpp", "cxx", "c++", "C", "m", "mm"];

pub struct Backend {
    name: String,
    version: String,
    /// Live buffer contents keyed by document URI.
    open_files: Arc<RwLock<HashMap<String, String>>>,
    /// The published snapshot; replaced wholesale on every change.
    snapshot: Arc<RwLock<Arc<Snapshot>>>,
    settings: Arc<RwLock<CompletionSettings>>,
    workspace_root: Arc<RwLock<Option<PathBuf>>>,
    client: Option<Client>,
}

impl Backend {
    pub fn new(client: Client) -> Self {
        Self {
            client: Some(client),
            ..Self::new_test()
        }
    }

    /// A backend without a client, for driving the server from tests.
    pub fn new_test() -> Self {
        Self::new_test_with_settings(CompletionSettings::default())
    }

    pub fn new_test_with_settings(settings: CompletionSettings) -> Self {
        Self {
            name: "cppcomplete".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            open_files: Arc::new(RwLock::new(HashMap::new())),
            snapshot: Arc::new(RwLock::new(Arc::new(Snapshot::new()))),
            settings: Arc::new(RwLock::new(settings)),
            workspace_root: Arc::new(RwLock::new(None)),
            client: None,
        }
    }

    /// The currently published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot.read())
    }

    pub fn settings(&self) -> CompletionSettings {
        self.settings.read().clone()
    }

    pub(crate) fn document_text(&self, uri: &Url) -> Option<String> {
        self.open_files.read().get(uri.as_str()).cloned()
    }

    /// Parse `text` as the document at `path` and publish it as a new
    /// snapshot revision.
    pub fn publish_document(&self, path: &Path, text: &str) -> u64 {
        let options = ParseOptions {
            qt_keywords: self.settings.read().qt_keywords,
        };
        let doc = parse_document(path, text, options);
        let mut snapshot = self.snapshot.write();
        let next = snapshot.with_document(doc);
        *snapshot = Arc::new(next);
        snapshot.revision()
    }

    /// Parse every C-family file under the workspace root and publish
    /// them in one revision.  Returns the number of documents indexed.
    pub fn index_workspace(&self) -> usize {
        let Some(root) = self.workspace_root.read().clone() else {
            return 0;
        };
        let settings = self.settings();
        let docs = index_directory(&root, &settings);
        publish_indexed(&self.snapshot, &self.open_files, docs)
    }

    async fn log(&self, typ: MessageType, message: String) {
        if let Some(client) = &self.client {
            client.log_message(typ, message).await;
        }
    }
}

/// Parse the C-family files below `root`, honouring `.gitignore`.
pub fn index_directory(root: &Path, settings: &CompletionSettings) -> Vec<Document> {
    let options = ParseOptions {
        qt_keywords: settings.qt_keywords,
    };
    WalkBuilder::new(root)
        .build()
        .filter_map(|entry| {
            let entry = entry.ok()?;
            let path = entry.path();
            if !path.is_file() || !is_source_path(path, settings) {
                return None;
            }
            let text = match std::fs::read_to_string(path) {
                Ok(text) => text,
                Err(e) => {
                    tracing::debug!("cppcomplete: skipping {}: {e}", path.display());
                    return None;
                }
            };
            Some(parse_document(path, &text, options))
        })
        .collect()
}

/// Publish indexed documents in one revision.  Documents open in the
/// editor keep the version built from their live buffer.
fn publish_indexed(
    snapshot: &RwLock<Arc<Snapshot>>,
    open_files: &RwLock<HashMap<String, String>>,
    docs: Vec<Document>,
) -> usize {
    let open: Vec<PathBuf> = open_files
        .read()
        .keys()
        .filter_map(|uri| Url::parse(uri).ok())
        .map(|uri| uri_to_path(&uri))
        .collect();
    let docs: Vec<Document> = docs
        .into_iter()
        .filter(|doc| !open.iter().any(|p| p == doc.path()))
        .collect();
    let count = docs.len();
    if count > 0 {
        let mut snapshot = snapshot.write();
        let next = snapshot.with_documents(docs);
        *snapshot = Arc::new(next);
    }
    count
}

fn is_source_path(path: &Path, settings: &CompletionSettings) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    SOURCE_EXTENSIONS.contains(&ext) || settings.header_suffixes.iter().any(|s| s == ext)
}

/// File system path of a document URI; non-file URIs keep their path
/// component so they still get a language from the extension.
pub(crate) fn uri_to_path(uri: &Url) -> PathBuf {
    uri.to_file_path()
        .unwrap_or_else(|_| PathBuf::from(uri.path()))
}
