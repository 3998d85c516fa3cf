/// What committing a candidate writes into the buffer.
///
/// The inserted text is the candidate text plus "extra" characters: the
/// brackets and semicolon of a call, the closing quote of an include, the
/// `)` of a Qt signature.  Text already sitting after the cursor that the
/// insertion would duplicate is overwritten rather than doubled, so
/// committing twice, or committing in front of an existing `)`, leaves the
/// buffer as if once.
use crate::config::CompletionSettings;
use crate::lexer::TokenKind;
use crate::types::{BufferEdit, Candidate, CandidateKind, CompletionProposal, TriggerKind};
use crate::util;

use super::expression_under_cursor::BackwardsScanner;

/// Compute the edit for committing `candidate` at byte offset `cursor`.
///
/// `typed_char` is the keystroke that committed the candidate, if it was
/// not a plain accept (`(`, `;`, `.`, ...).
pub fn commit(
    proposal: &CompletionProposal,
    candidate: &Candidate,
    typed_char: Option<char>,
    text: &str,
    cursor: usize,
    settings: &CompletionSettings,
) -> BufferEdit {
    let cursor = cursor.min(text.len());
    let request = &proposal.request;
    let base = request.name_start.min(cursor);

    if candidate.kind == CandidateKind::Snippet {
        return BufferEdit {
            start: base,
            end: cursor,
            text: candidate
                .template
                .clone()
                .unwrap_or_else(|| candidate.text.clone()),
            cursor_delta: 0,
            restart_completion: false,
            arrow_at: None,
        };
    }

    let trigger = request.trigger;
    let mut typed = typed_char;
    let mut to_insert = candidate.text.clone();
    let mut extra = String::new();
    let mut cursor_delta: i32 = 0;
    let mut restart = false;

    match trigger {
        TriggerKind::Signal | TriggerKind::Slot => {
            extra.push(')');
            if typed == Some('(') {
                typed = None;
            }
        }
        TriggerKind::StringLiteral | TriggerKind::AngleStringLiteral => {
            if !to_insert.ends_with('/') {
                extra.push(if trigger == TriggerKind::AngleStringLiteral {
                    '>'
                } else {
                    '"'
                });
            } else {
                restart = true;
                if typed == Some('/') {
                    typed = None;
                }
            }
        }
        TriggerKind::Qt5SignalOrSlotClassName => restart = true,
        _ => {
            let function = candidate
                .symbol
                .filter(|_| candidate.kind == CandidateKind::Symbol)
                .and_then(|r| proposal.context.symbol(r).as_function());
            if settings.auto_insert_brackets
                && let Some(f) = function
            {
                if f.return_type.is_none() && !f.is_destructor {
                    // A constructor: the user is more likely picking the class.
                } else if !f.is_ambiguous && !is_address_taken(text, base) {
                    let skip_closing = typed != Some('(');
                    if settings.space_after_function_name {
                        extra.push(' ');
                    }
                    extra.push('(');
                    if typed == Some('(') {
                        typed = None;
                    }

                    let at_cursor = util::char_at(text, cursor);
                    let mut end_with_semicolon = typed == Some(';')
                        || (f.is_void_return() && trigger != TriggerKind::ColonColon);
                    let semicolon = typed.unwrap_or(';');
                    if end_with_semicolon && at_cursor == Some(semicolon) {
                        end_with_semicolon = false;
                        typed = None;
                    }

                    if !candidate.is_overloaded() && !f.has_arguments() && skip_closing {
                        extra.push(')');
                        if end_with_semicolon {
                            extra.push(semicolon);
                            typed = None;
                        }
                    } else if settings.auto_insert_matching_characters
                        && should_insert_matching_text(at_cursor)
                    {
                        extra.push(')');
                        cursor_delta -= 1;
                        if end_with_semicolon {
                            extra.push(semicolon);
                            cursor_delta -= 1;
                            typed = None;
                        }
                    }
                }
            }

            if settings.auto_insert_brackets && candidate.kind == CandidateKind::FunctionSignature {
                if typed == Some('(') {
                    typed = None;
                }
                // `) const` stays extra so an existing `)` is reused.
                if let Some(close) = to_insert.rfind(')') {
                    extra = to_insert[close..].to_string();
                    to_insert.truncate(close);
                }
            }
        }
    }

    if let Some(c) = typed {
        extra.push(c);
        if cursor_delta != 0 {
            cursor_delta -= 1;
        }
    }

    let preserve = preserve_length(text, cursor, base, &to_insert);
    let after = text.get(cursor + preserve..).unwrap_or("");
    let extra_len: usize = extra
        .chars()
        .zip(after.chars())
        .take_while(|(a, b)| a == b)
        .map(|(a, _)| a.len_utf8())
        .sum();

    if extra.ends_with('.') || extra.ends_with('(') {
        restart = true;
    }
    to_insert.push_str(&extra);
    BufferEdit {
        start: base,
        end: cursor + preserve + extra_len,
        text: to_insert,
        cursor_delta,
        restart_completion: restart,
        arrow_at: arrow_at(proposal, text, base),
    }
}

/// The `.` the engine asked to turn into `->`, if it is still there.
fn arrow_at(proposal: &CompletionProposal, text: &str, base: usize) -> Option<usize> {
    proposal
        .replace_dot_at
        .filter(|&at| at < base && text.as_bytes().get(at) == Some(&b'.'))
}

/// How much of the text after the cursor already spells the end of
/// `to_insert`.  A match that runs into a longer identifier does not
/// count.
fn preserve_length(text: &str, cursor: usize, base: usize, to_insert: &str) -> usize {
    let line_end = util::line_end(text, cursor);
    let in_editor = text.get(cursor..line_end).unwrap_or("");
    if in_editor.is_empty() {
        return 0;
    }
    let mut preserve = to_insert.len().saturating_sub(cursor - base);
    while preserve > 0 {
        if let Some(suffix) = to_insert.get(to_insert.len() - preserve..)
            && in_editor.starts_with(suffix)
            && in_editor
                .get(preserve..)
                .and_then(|rest| rest.chars().next())
                .is_none_or(|c| !util::is_identifier_char(c))
        {
            break;
        }
        preserve -= 1;
    }
    preserve
}

/// Whether a closing bracket may be added in front of `next`.
fn should_insert_matching_text(next: Option<char>) -> bool {
    match next {
        None => true,
        Some(c) => c.is_whitespace() || matches!(c, '{' | '}' | ']' | ')' | ';' | ','),
    }
}

/// `&name` or `&Class::name`: a pointer to the function is wanted, not a
/// call.
fn is_address_taken(text: &str, base: usize) -> bool {
    let scanner = BackwardsScanner::new(text, base);
    let mut index = scanner.start_token();
    while index > 0 {
        index -= 1;
        match scanner.token(index).map(|tk| tk.kind) {
            Some(TokenKind::ColonColon | TokenKind::Identifier) => {}
            Some(TokenKind::Amper) => return true,
            _ => return false,
        }
    }
    false
}
