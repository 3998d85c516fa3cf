/// Completion request orchestration.
///
/// This module contains the `impl Backend` halves of the LSP requests the
/// engine answers: `textDocument/completion`, `textDocument/signatureHelp`
/// and the qualify-name quick fix of `textDocument/codeAction`.  Each
/// handler reads the live buffer and the published snapshot, runs one
/// engine cycle and converts the result.  Engine failures never surface as
/// LSP errors; they produce an empty answer.
use std::collections::HashMap;
use std::sync::Arc;

use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;

use crate::Backend;
use crate::frontend::lookup::LookupContext;
use crate::frontend::parser::{ParseOptions, parse_document};
use crate::lexer;
use crate::util;

use super::expression_under_cursor::{argument_index, start_of_function_call};
use super::{engine, qualify, ranking};

impl Backend {
    /// Main completion handler, called by `LanguageServer::completion`.
    pub(crate) async fn handle_completion(
        &self,
        params: CompletionParams,
    ) -> Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;

        let Some(content) = self.document_text(&uri) else {
            return Ok(None);
        };
        let path = crate::uri_to_path(&uri);
        let cursor = util::position_to_byte_offset(&content, position);
        let snapshot = self.snapshot();
        let settings = self.settings();

        let Some(proposal) =
            engine::start_completion(&snapshot, &settings, &path, &content, cursor)
        else {
            return Ok(None);
        };
        if proposal.candidates.is_empty() {
            // Hints alone are answered through signature help.
            return Ok(None);
        }

        let typed = proposal.request.typed_prefix(&content);
        let visible = ranking::filter(&proposal.candidates, typed, settings.case_sensitivity);
        let items =
            Self::build_completion_items(&proposal, &visible, &content, cursor, &settings);
        tracing::debug!(
            "cppcomplete: {} of {} candidates for `{}`",
            items.len(),
            proposal.candidates.len(),
            typed
        );

        Ok(Some(CompletionResponse::List(CompletionList {
            // Narrowed server side; a shorter prefix needs a new request.
            is_incomplete: !typed.is_empty(),
            items,
        })))
    }

    /// Overload hints for the innermost call around the cursor.
    pub(crate) async fn handle_signature_help(
        &self,
        params: SignatureHelpParams,
    ) -> Result<Option<SignatureHelp>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        let Some(content) = self.document_text(&uri) else {
            return Ok(None);
        };
        let cursor = util::position_to_byte_offset(&content, position);
        let Some(open) = start_of_function_call(&content, cursor) else {
            return Ok(None);
        };

        let path = crate::uri_to_path(&uri);
        let snapshot = self.snapshot();
        let settings = self.settings();
        let Some(proposal) =
            engine::start_completion(&snapshot, &settings, &path, &content, open + 1)
        else {
            return Ok(None);
        };
        if proposal.hints.is_empty() {
            return Ok(None);
        }

        let active = argument_index(&content, open + 1, cursor);
        let signatures: Vec<SignatureInformation> = proposal
            .hints
            .iter()
            .map(|hint| SignatureInformation {
                label: hint.label.clone(),
                documentation: None,
                parameters: Some(
                    hint.parameters
                        .iter()
                        .map(|p| ParameterInformation {
                            label: ParameterLabel::Simple(p.clone()),
                            documentation: None,
                        })
                        .collect(),
                ),
                active_parameter: None,
            })
            .collect();

        // Prefer the first overload that takes enough arguments.
        let active_signature = proposal
            .hints
            .iter()
            .position(|h| (active as usize) < h.parameters.len())
            .unwrap_or(0);

        Ok(Some(SignatureHelp {
            signatures,
            active_signature: Some(active_signature as u32),
            active_parameter: Some(active),
        }))
    }

    /// Quick fixes that qualify an unresolvable class name.
    pub(crate) async fn handle_code_action(
        &self,
        params: CodeActionParams,
    ) -> Result<Option<CodeActionResponse>> {
        let uri = params.text_document.uri;
        let Some(content) = self.document_text(&uri) else {
            return Ok(None);
        };
        let offset = util::position_to_byte_offset(&content, params.range.start);
        let Some((start, end)) = identifier_at(&content, offset) else {
            return Ok(None);
        };
        let word = &content[start..end];
        if lexer::is_keyword(word) || is_already_qualified(&content, start) {
            return Ok(None);
        }

        let path = crate::uri_to_path(&uri);
        let snapshot = self.snapshot();
        let settings = self.settings();
        let doc = parse_document(
            &path,
            &content,
            ParseOptions {
                qt_keywords: settings.qt_keywords,
            },
        );
        let ctx = LookupContext::new(Arc::new(doc), &snapshot, &settings.header_paths);
        let (line, column) = util::line_and_column(&content, start);
        let scope = ctx.scope_at(line, column);
        if !ctx.lookup_value(word, scope).is_empty() {
            return Ok(None);
        }

        let caller: Vec<String> = ctx
            .scope_path(scope)
            .iter()
            .map(|s| s.to_string())
            .collect();
        let range = Range {
            start: util::byte_offset_to_position(&content, start),
            end: util::byte_offset_to_position(&content, end),
        };
        let actions: Vec<CodeActionOrCommand> =
            qualify::class_proposals(&snapshot, word, &caller, &settings.namespace_aliases)
                .into_iter()
                .filter(|p| p.text != word)
                .map(|p| {
                    let mut changes = HashMap::new();
                    changes.insert(
                        uri.clone(),
                        vec![TextEdit {
                            range,
                            new_text: p.text.clone(),
                        }],
                    );
                    CodeActionOrCommand::CodeAction(CodeAction {
                        title: format!("Qualify as `{}`", p.text),
                        kind: Some(CodeActionKind::QUICKFIX),
                        edit: Some(WorkspaceEdit {
                            changes: Some(changes),
                            ..WorkspaceEdit::default()
                        }),
                        ..CodeAction::default()
                    })
                })
                .collect();

        if actions.is_empty() {
            Ok(None)
        } else {
            Ok(Some(actions))
        }
    }
}

/// Byte range of the identifier touching `offset`.
fn identifier_at(content: &str, offset: usize) -> Option<(usize, usize)> {
    let offset = offset.min(content.len());
    let start = util::find_start_of_name(content, offset);
    let end = content[offset..]
        .char_indices()
        .find(|(_, c)| !util::is_identifier_char(*c))
        .map_or(content.len(), |(i, _)| offset + i);
    let first = content[start..end].chars().next()?;
    util::is_identifier_start(first).then_some((start, end))
}

/// Whether the name at `start` follows `::`, `.` or `->`.
fn is_already_qualified(content: &str, start: usize) -> bool {
    let before = content[..start].trim_end();
    before.ends_with("::") || before.ends_with('.') || before.ends_with("->")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_at_cursor() {
        let text = "QWidget *w;";
        assert_eq!(identifier_at(text, 3), Some((0, 7)));
        assert_eq!(identifier_at(text, 7), Some((0, 7)));
        assert_eq!(identifier_at(text, 10), Some((9, 10)));
        assert_eq!(identifier_at(text, 8), None);
        assert_eq!(identifier_at("1abc", 2), None);
    }

    #[test]
    fn test_qualified_names_are_left_alone() {
        assert!(is_already_qualified("ui::Widget", 4));
        assert!(is_already_qualified("p->Widget", 3));
        assert!(!is_already_qualified("Widget", 0));
    }
}
