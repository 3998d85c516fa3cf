//! Data types shared by the completion engine and the server.
//!
//! A completion cycle starts from a [`CompletionRequest`] (what triggered
//! it and where), produces a [`CompletionProposal`] (the candidate list
//! plus any call-tip hints) and ends with a [`BufferEdit`] when the user
//! commits a [`Candidate`].

use crate::frontend::lookup::LookupContext;
use crate::frontend::symbols::SymbolRef;

/// The operator or context that started a completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerKind {
    /// Plain identifier completion.
    #[default]
    None,
    Dot,
    Arrow,
    ColonColon,
    /// `,` inside a call; resolved into [`TriggerKind::LParen`] against the
    /// enclosing call.
    Comma,
    LParen,
    DotStar,
    ArrowStar,
    /// `\` or `@` inside a documentation comment.
    DoxyComment,
    /// `<` of an `#include <...>`.
    AngleStringLiteral,
    /// `"` of an `#include "..."`.
    StringLiteral,
    /// `/` inside an include path.
    Slash,
    /// `#` at the start of a line.
    Pound,
    /// `SIGNAL(` in a Qt4-style `connect`.
    Signal,
    /// `SLOT(` in a Qt4-style `connect`.
    Slot,
    /// `&` inside a call, the start of a Qt5-style member pointer.
    Ampersand,
    /// `connect(sender, &` or `connect(a, &A::s, receiver, &`.
    Qt5SignalOrSlotClassName,
    /// `connect(sender, &Class::`.
    Qt5Signal,
    /// `connect(a, &A::s, receiver, &Class::`.
    Qt5Slot,
}

impl TriggerKind {
    pub fn is_include(self) -> bool {
        matches!(
            self,
            TriggerKind::StringLiteral | TriggerKind::AngleStringLiteral | TriggerKind::Slash
        )
    }

    pub fn is_qt_method(self) -> bool {
        matches!(
            self,
            TriggerKind::Signal | TriggerKind::Slot | TriggerKind::Qt5Signal | TriggerKind::Qt5Slot
        )
    }
}

/// What a candidate stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    Symbol,
    Keyword,
    Macro,
    Snippet,
    IncludePath,
    PreprocessorDirective,
    /// The remainder of a function declaration, `int a) const`.
    FunctionSignature,
}

/// One entry of the completion list.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub text: String,
    pub kind: CandidateKind,
    /// Presentation priority; higher sorts first.
    pub order: i32,
    pub detail: Option<String>,
    /// The declaration this candidate was made from.
    pub symbol: Option<SymbolRef>,
    /// How many same-named candidates were folded into this one.
    pub duplicate_count: u32,
    /// Snippet body for [`CandidateKind::Snippet`].
    pub template: Option<String>,
}

impl Candidate {
    pub fn new(text: impl Into<String>, kind: CandidateKind) -> Self {
        Self {
            text: text.into(),
            kind,
            order: 0,
            detail: None,
            symbol: None,
            duplicate_count: 0,
            template: None,
        }
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_symbol(mut self, symbol: SymbolRef) -> Self {
        self.symbol = Some(symbol);
        self
    }

    pub fn is_overloaded(&self) -> bool {
        self.duplicate_count > 0
    }
}

/// A classified completion request.
///
/// Offsets are byte offsets into the buffer the request was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub trigger: TriggerKind,
    /// Where the name being completed starts; the commit replaces
    /// `[name_start, cursor)`.
    pub name_start: usize,
    /// The expression left of the operator, e.g. `a.b` in `a.b->`.
    pub expression: String,
    /// Where `expression` starts; also the position whose scope is used.
    pub expression_start: usize,
    /// Where `expression` ends (the operator's start).
    pub expression_end: usize,
    pub cursor: usize,
}

impl CompletionRequest {
    /// The text typed since the name start.
    pub fn typed_prefix<'a>(&self, text: &'a str) -> &'a str {
        text.get(self.name_start..self.cursor).unwrap_or("")
    }
}

/// A call tip for one overload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionHint {
    /// `void draw(int x, int y = 0) const`
    pub label: String,
    pub parameters: Vec<String>,
    pub active_parameter: u32,
}

/// Everything one completion cycle produced.
///
/// The proposal owns the [`LookupContext`] the candidates were resolved
/// against, so a candidate's declaration stays readable until commit.
pub struct CompletionProposal {
    pub request: CompletionRequest,
    pub candidates: Vec<Candidate>,
    pub hints: Vec<FunctionHint>,
    /// Offset of a `.` that must become `->` because the expression is a
    /// pointer.
    pub replace_dot_at: Option<usize>,
    pub context: LookupContext,
}

impl std::fmt::Debug for CompletionProposal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionProposal")
            .field("request", &self.request)
            .field("candidates", &self.candidates)
            .field("hints", &self.hints)
            .field("replace_dot_at", &self.replace_dot_at)
            .finish_non_exhaustive()
    }
}

/// The text change produced by committing a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferEdit {
    /// Replace `[start, end)` of the buffer with `text`.
    pub start: usize,
    pub end: usize,
    pub text: String,
    /// Cursor movement relative to the end of the inserted text (zero or
    /// negative).
    pub cursor_delta: i32,
    /// Ask the editor to start a new completion at the new cursor.
    pub restart_completion: bool,
    /// Offset of a `.` before `start` that becomes `->`.
    pub arrow_at: Option<usize>,
}

impl BufferEdit {
    /// Cursor offset in the buffer after applying the edit.
    pub fn cursor_after(&self) -> usize {
        let end = self.start + self.text.len() + usize::from(self.arrow_at.is_some());
        end.saturating_add_signed(self.cursor_delta as isize)
    }

    /// Apply the edit to `buffer`.
    pub fn apply(&self, buffer: &str) -> String {
        let mut out = String::with_capacity(buffer.len() + self.text.len() + 1);
        match self.arrow_at {
            Some(at) => {
                out.push_str(&buffer[..at]);
                out.push_str("->");
                out.push_str(&buffer[at + 1..self.start]);
            }
            None => out.push_str(&buffer[..self.start]),
        }
        out.push_str(&self.text);
        out.push_str(&buffer[self.end..]);
        out
    }
}
