/// Completion item building.
///
/// This module turns the engine's [`Candidate`]s into LSP
/// `CompletionItem`s.  The text written on accept is precomputed with
/// [`insertion::commit`] and shipped as a `TextEdit`, so the editor
/// inserts exactly what the insertion policy decided: brackets, the
/// semicolon, overwritten text after the cursor.  When the policy leaves
/// the cursor inside the inserted text the edit becomes a snippet with a
/// `$0` tab stop.
use tower_lsp::lsp_types::*;

use crate::Backend;
use crate::config::CompletionSettings;
use crate::frontend::lookup::LookupContext;
use crate::frontend::symbols::{ClassKey, ScopeKind, SymbolKind};
use crate::types::{BufferEdit, Candidate, CandidateKind, CompletionProposal, TriggerKind};
use crate::util;

use super::insertion;

/// Command the editor runs to open the next completion list.
const TRIGGER_SUGGEST: &str = "editor.action.triggerSuggest";

impl Backend {
    /// Build completion items for the candidates of `proposal` that are
    /// visible at `cursor`, in presentation order.
    pub(crate) fn build_completion_items(
        proposal: &CompletionProposal,
        candidates: &[Candidate],
        text: &str,
        cursor: usize,
        settings: &CompletionSettings,
    ) -> Vec<CompletionItem> {
        candidates
            .iter()
            .enumerate()
            .map(|(index, candidate)| {
                let edit = insertion::commit(proposal, candidate, None, text, cursor, settings);
                let mut item = Self::build_completion_item(proposal, candidate, &edit, text);
                item.sort_text = Some(format!("{index:05}"));
                if let Some(at) = edit.arrow_at {
                    item.additional_text_edits = Some(vec![TextEdit {
                        range: Range {
                            start: util::byte_offset_to_position(text, at),
                            end: util::byte_offset_to_position(text, at + 1),
                        },
                        new_text: "->".to_string(),
                    }]);
                }
                item
            })
            .collect()
    }

    fn build_completion_item(
        proposal: &CompletionProposal,
        candidate: &Candidate,
        edit: &BufferEdit,
        text: &str,
    ) -> CompletionItem {
        let range = Range {
            start: util::byte_offset_to_position(text, edit.start),
            end: util::byte_offset_to_position(text, edit.end),
        };

        let (new_text, format) = if candidate.kind == CandidateKind::Snippet {
            (edit.text.clone(), InsertTextFormat::SNIPPET)
        } else if edit.cursor_delta != 0 {
            (
                snippet_with_cursor(&edit.text, edit.cursor_delta),
                InsertTextFormat::SNIPPET,
            )
        } else {
            (edit.text.clone(), InsertTextFormat::PLAIN_TEXT)
        };

        let mut detail = candidate.detail.clone();
        if candidate.is_overloaded() {
            let overloads = format!(
                "(+{} overload{})",
                candidate.duplicate_count,
                if candidate.duplicate_count == 1 { "" } else { "s" }
            );
            detail = Some(match detail {
                Some(d) => format!("{d} {overloads}"),
                None => overloads,
            });
        }

        let adds_brackets = edit.text.len() > candidate.text.len()
            && candidate.kind == CandidateKind::Symbol
            && !proposal.request.trigger.is_qt_method();

        CompletionItem {
            label: candidate.text.clone(),
            kind: Some(Self::item_kind(&proposal.context, candidate)),
            detail,
            filter_text: Some(candidate.text.clone()),
            insert_text_format: Some(format),
            text_edit: Some(CompletionTextEdit::Edit(TextEdit { range, new_text })),
            commit_characters: commit_characters(proposal.request.trigger, candidate, adds_brackets),
            command: edit.restart_completion.then(|| Command {
                title: "Trigger completion".to_string(),
                command: TRIGGER_SUGGEST.to_string(),
                arguments: None,
            }),
            ..CompletionItem::default()
        }
    }

    /// Map a candidate to the closest LSP item kind.
    pub(crate) fn item_kind(ctx: &LookupContext, candidate: &Candidate) -> CompletionItemKind {
        match candidate.kind {
            CandidateKind::Keyword | CandidateKind::PreprocessorDirective => {
                CompletionItemKind::KEYWORD
            }
            CandidateKind::Macro => CompletionItemKind::CONSTANT,
            CandidateKind::Snippet => CompletionItemKind::SNIPPET,
            CandidateKind::IncludePath if candidate.text.ends_with('/') => {
                CompletionItemKind::FOLDER
            }
            CandidateKind::IncludePath => CompletionItemKind::FILE,
            CandidateKind::FunctionSignature => CompletionItemKind::FUNCTION,
            CandidateKind::Symbol => {
                let Some(r) = candidate.symbol else {
                    return CompletionItemKind::TEXT;
                };
                let in_class = ctx.scope(ctx.scope_of(r)).kind == ScopeKind::Class;
                match &ctx.symbol(r).kind {
                    SymbolKind::Namespace { .. } | SymbolKind::NamespaceAlias { .. } => {
                        CompletionItemKind::MODULE
                    }
                    SymbolKind::Class(info) if info.key == ClassKey::Class => {
                        CompletionItemKind::CLASS
                    }
                    SymbolKind::Class(_) => CompletionItemKind::STRUCT,
                    SymbolKind::Function(f) if f.return_type.is_none() && !f.is_destructor => {
                        CompletionItemKind::CONSTRUCTOR
                    }
                    SymbolKind::Function(_) if in_class => CompletionItemKind::METHOD,
                    SymbolKind::Function(_) => CompletionItemKind::FUNCTION,
                    SymbolKind::Variable { .. } if in_class => CompletionItemKind::FIELD,
                    SymbolKind::Variable { .. } | SymbolKind::Parameter { .. } => {
                        CompletionItemKind::VARIABLE
                    }
                    SymbolKind::Typedef { .. } => CompletionItemKind::CLASS,
                    SymbolKind::Enum { .. } => CompletionItemKind::ENUM,
                    SymbolKind::Enumerator => CompletionItemKind::ENUM_MEMBER,
                    SymbolKind::TemplateParameter => CompletionItemKind::TYPE_PARAMETER,
                    SymbolKind::QtProperty => CompletionItemKind::PROPERTY,
                    _ => CompletionItemKind::TEXT,
                }
            }
        }
    }
}

/// Characters that accept the candidate and are then typed as usual.
///
/// A function whose edit already writes the call brackets does not take
/// `(` or `;`, which would otherwise be doubled.
fn commit_characters(
    trigger: TriggerKind,
    candidate: &Candidate,
    adds_brackets: bool,
) -> Option<Vec<String>> {
    let chars: &[&str] = match candidate.kind {
        _ if matches!(trigger, TriggerKind::Signal | TriggerKind::Slot) => &["(", ","],
        CandidateKind::IncludePath if candidate.text.ends_with('/') => &["/"],
        CandidateKind::FunctionSignature => &["("],
        CandidateKind::Symbol if adds_brackets => &[":", ".", ","],
        CandidateKind::Symbol => &[":", ";", ".", ",", "("],
        _ => return None,
    };
    Some(chars.iter().map(|c| c.to_string()).collect())
}

/// `text` in snippet syntax with the final tab stop `cursor_delta`
/// characters before its end.
fn snippet_with_cursor(text: &str, cursor_delta: i32) -> String {
    let count = text.chars().count() as i32;
    let split = (count + cursor_delta).clamp(0, count) as usize;
    let at = text.char_indices().nth(split).map_or(text.len(), |(i, _)| i);
    format!(
        "{}$0{}",
        escape_snippet(&text[..at]),
        escape_snippet(&text[at..])
    )
}

fn escape_snippet(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '$' | '}' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_tab_stop_inside_brackets() {
        assert_eq!(snippet_with_cursor("resize();", -2), "resize($0);");
        assert_eq!(snippet_with_cursor("f()", -1), "f($0)");
        assert_eq!(snippet_with_cursor("x", -5), "$0x");
    }

    #[test]
    fn test_snippet_escaping() {
        assert_eq!(escape_snippet("a$b}c\\"), "a\\$b\\}c\\\\");
    }

    #[test]
    fn test_commit_characters_per_kind() {
        let symbol = Candidate::new("size", CandidateKind::Symbol);
        assert_eq!(
            commit_characters(TriggerKind::Dot, &symbol, false),
            Some(vec![":", ";", ".", ",", "("].into_iter().map(String::from).collect())
        );
        assert_eq!(
            commit_characters(TriggerKind::Dot, &symbol, true),
            Some(vec![":", ".", ","].into_iter().map(String::from).collect())
        );
        let signal = Candidate::new("changed(int)", CandidateKind::Symbol);
        assert_eq!(
            commit_characters(TriggerKind::Signal, &signal, false),
            Some(vec!["(".to_string(), ",".to_string()])
        );
        let dir = Candidate::new("sys/", CandidateKind::IncludePath);
        assert_eq!(
            commit_characters(TriggerKind::AngleStringLiteral, &dir, false),
            Some(vec!["/".to_string()])
        );
        let keyword = Candidate::new("while", CandidateKind::Keyword);
        assert_eq!(commit_characters(TriggerKind::None, &keyword, false), None);
    }
}
