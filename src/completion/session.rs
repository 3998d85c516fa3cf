/// One completion cycle as an editor drives it.
///
/// ```text
/// Idle → Triggered → Resolving → Listing ⇄ Filtering → Committed → Idle
///                                                        ↘ Triggered (restart)
/// ```
///
/// Listing and Filtering fall back to Idle on cancel, or when filtering
/// leaves nothing to show.  The session owns the proposal between
/// keystrokes, so filtering never re-resolves.
use std::path::Path;

use crate::config::CompletionSettings;
use crate::frontend::snapshot::Snapshot;
use crate::types::{BufferEdit, Candidate, CompletionProposal};

use super::{classifier, engine, insertion, ranking};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Triggered,
    Resolving,
    Listing,
    Filtering,
    Committed,
}

#[derive(Debug, Default)]
pub struct CompletionSession {
    settings: CompletionSettings,
    state: SessionState,
    proposal: Option<CompletionProposal>,
    visible: Vec<Candidate>,
}

impl CompletionSession {
    pub fn new(settings: CompletionSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn proposal(&self) -> Option<&CompletionProposal> {
        self.proposal.as_ref()
    }

    /// The candidates currently shown.
    pub fn visible(&self) -> &[Candidate] {
        &self.visible
    }

    /// Called after every keystroke while idle: starts a cycle when the
    /// text before the cursor asks for one.
    pub fn on_keystroke(
        &mut self,
        snapshot: &Snapshot,
        path: &Path,
        text: &str,
        cursor: usize,
    ) -> bool {
        if self.state != SessionState::Idle {
            return false;
        }
        if !classifier::triggers_completion(text, cursor, &self.settings) {
            return false;
        }
        self.state = SessionState::Triggered;
        self.start(snapshot, path, text, cursor)
    }

    /// Run a cycle at `cursor`, replacing any cycle in progress.
    ///
    /// Returns whether there is something to show.
    pub fn start(&mut self, snapshot: &Snapshot, path: &Path, text: &str, cursor: usize) -> bool {
        self.state = SessionState::Resolving;
        match engine::start_completion(snapshot, &self.settings, path, text, cursor) {
            Some(proposal) => {
                let typed = proposal.request.typed_prefix(text);
                self.visible =
                    ranking::filter(&proposal.candidates, typed, self.settings.case_sensitivity);
                if self.visible.is_empty() && proposal.hints.is_empty() {
                    self.cancel();
                    return false;
                }
                self.proposal = Some(proposal);
                self.state = SessionState::Listing;
                true
            }
            None => {
                self.cancel();
                false
            }
        }
    }

    /// Narrow the list to what is typed between the name start and
    /// `cursor`.  Moving the cursor before the name start, or narrowing
    /// to nothing, ends the cycle.
    pub fn filter(&mut self, text: &str, cursor: usize) -> &[Candidate] {
        if !matches!(self.state, SessionState::Listing | SessionState::Filtering) {
            return &[];
        }
        let Some(name_start) = self.proposal.as_ref().map(|p| p.request.name_start) else {
            return &[];
        };
        if cursor < name_start {
            self.cancel();
            return &[];
        }
        let typed = text.get(name_start..cursor).unwrap_or("");
        let (narrowed, has_hints) = match &self.proposal {
            Some(p) => (
                ranking::filter(&p.candidates, typed, self.settings.case_sensitivity),
                !p.hints.is_empty(),
            ),
            None => return &[],
        };
        if narrowed.is_empty() && !has_hints {
            self.cancel();
            return &[];
        }
        self.visible = narrowed;
        self.state = SessionState::Filtering;
        &self.visible
    }

    /// Accept the visible candidate at `index`.
    pub fn commit(
        &mut self,
        index: usize,
        typed_char: Option<char>,
        text: &str,
        cursor: usize,
    ) -> Option<BufferEdit> {
        let proposal = self.proposal.as_ref()?;
        let candidate = self.visible.get(index)?;
        let edit = insertion::commit(proposal, candidate, typed_char, text, cursor, &self.settings);
        tracing::debug!("cppcomplete: committed `{}`", candidate.text);
        self.proposal = None;
        self.visible.clear();
        self.state = SessionState::Committed;
        Some(edit)
    }

    /// After a commit that asked for it, start the next cycle on the
    /// edited buffer; otherwise go idle.
    pub fn finish(
        &mut self,
        edit: &BufferEdit,
        snapshot: &Snapshot,
        path: &Path,
        text: &str,
        cursor: usize,
    ) -> bool {
        if self.state != SessionState::Committed {
            return false;
        }
        if edit.restart_completion {
            self.state = SessionState::Triggered;
            return self.start(snapshot, path, text, cursor);
        }
        self.state = SessionState::Idle;
        false
    }

    pub fn cancel(&mut self) {
        self.proposal = None;
        self.visible.clear();
        self.state = SessionState::Idle;
    }
}
