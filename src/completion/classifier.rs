/// Completion operator classification.
///
/// Decides from the characters left of the cursor whether a completion
/// should start and what kind it is, then turns the position into a
/// [`CompletionRequest`]: the trigger, where the completed name starts and
/// the expression the operator applies to.
use crate::config::CompletionSettings;
use crate::lexer::{self, Token, TokenKind};
use crate::types::{CompletionRequest, TriggerKind};
use crate::util;

use super::expression_under_cursor::{
    ExpressionUnderCursor, connect_argument, start_of_function_call,
};

/// Match the (up to) three characters before a position against the
/// activation sequences.  Returns the trigger and the sequence length.
pub fn activation_sequence(
    ch: Option<u8>,
    ch2: Option<u8>,
    ch3: Option<u8>,
    want_function_call: bool,
    want_signal_slot: bool,
) -> (TriggerKind, usize) {
    match ch {
        Some(b'.') if ch2 != Some(b'.') => (TriggerKind::Dot, 1),
        Some(b',') => (TriggerKind::Comma, 1),
        Some(b'(') if want_function_call => (TriggerKind::LParen, 1),
        Some(b':') if ch2 == Some(b':') && ch3 != Some(b':') => (TriggerKind::ColonColon, 2),
        Some(b'>') if ch2 == Some(b'-') => (TriggerKind::Arrow, 2),
        Some(b'*') if ch2 == Some(b'.') => (TriggerKind::DotStar, 2),
        Some(b'*') if ch2 == Some(b'>') && ch3 == Some(b'-') => (TriggerKind::ArrowStar, 3),
        Some(b'\\' | b'@') if ch2.is_none_or(|c| c.is_ascii_whitespace()) => {
            (TriggerKind::DoxyComment, 1)
        }
        Some(b'<') => (TriggerKind::AngleStringLiteral, 1),
        Some(b'"') => (TriggerKind::StringLiteral, 1),
        Some(b'/') => (TriggerKind::Slash, 1),
        Some(b'#') => (TriggerKind::Pound, 1),
        Some(b'&') if want_signal_slot => (TriggerKind::Ampersand, 1),
        _ => (TriggerKind::None, 0),
    }
}

fn byte_before(text: &str, pos: usize, n: usize) -> Option<u8> {
    pos.checked_sub(n).map(|i| text.as_bytes()[i])
}

/// Tokens of the line containing `pos`, offsets relative to the line.
fn line_tokens(text: &str, pos: usize) -> (usize, Vec<Token>) {
    let begin = util::line_start(text, pos);
    let end = util::line_end(text, pos);
    let state = lexer::state_at(text, begin);
    (begin, lexer::tokenize_text(&text[begin..end], state))
}

/// Classify the operator ending at `pos`.
///
/// Returns the trigger and the offset where the operator starts; a
/// rejected or absent operator yields `(TriggerKind::None, pos)`.
pub fn classify(
    text: &str,
    pos: usize,
    want_function_call: bool,
    want_signal_slot: bool,
) -> (TriggerKind, usize) {
    let pos = pos.min(text.len());
    let (mut kind, len) = activation_sequence(
        byte_before(text, pos, 1),
        byte_before(text, pos, 2),
        byte_before(text, pos, 3),
        want_function_call,
        want_signal_slot,
    );
    if kind == TriggerKind::None {
        return (kind, pos);
    }
    let mut start = pos - len;
    let rejected = (TriggerKind::None, pos);

    let (line_begin, tokens) = line_tokens(text, pos);
    let before_cursor = &text[line_begin..pos];

    // The quote must be the first one on the line.
    if kind == TriggerKind::StringLiteral
        && before_cursor.find('"').is_some_and(|i| i + 1 < before_cursor.len())
    {
        return rejected;
    }
    if kind == TriggerKind::Comma && start_of_function_call(text, pos).is_none() {
        return rejected;
    }

    let token_index = lexer::token_before(&tokens, (pos - line_begin).saturating_sub(1));
    let tk = token_index.map(|i| tokens[i]);
    let tk_kind = tk.map(|t| t.kind);
    let in_header_name = matches!(
        tk_kind,
        Some(TokenKind::StringLiteral | TokenKind::AngleStringLiteral)
    );

    if kind == TriggerKind::DoxyComment {
        if !matches!(
            tk_kind,
            Some(TokenKind::DoxyComment | TokenKind::CppDoxyComment)
        ) {
            return rejected;
        }
    } else if tk.is_some_and(|t| t.is_comment())
        || (tk.is_some_and(|t| t.is_literal())
            && !matches!(
                kind,
                TriggerKind::StringLiteral
                    | TriggerKind::AngleStringLiteral
                    | TriggerKind::Slash
                    | TriggerKind::Dot
            ))
    {
        return rejected;
    } else if kind == TriggerKind::Slash && !in_header_name {
        return rejected;
    } else if kind == TriggerKind::LParen {
        if let Some(i) = token_index
            && i > 0
            && !matches!(
                tokens[i - 1].kind,
                TokenKind::Identifier | TokenKind::Greater | TokenKind::Signal | TokenKind::Slot
            )
        {
            return rejected;
        }
    } else if kind.is_include() || (kind == TriggerKind::Dot && in_header_name) {
        let include = tokens.len() >= 3
            && tokens[0].kind == TokenKind::Pound
            && tokens[1].kind == TokenKind::Identifier
            && matches!(
                tokens[1].text(&text[line_begin..]),
                "include" | "include_next" | "import"
            )
            && matches!(
                tokens[2].kind,
                TokenKind::StringLiteral | TokenKind::AngleStringLiteral
            );
        if !include {
            return rejected;
        }
        if kind == TriggerKind::Dot {
            // `#include "foo.`: classify from the start of the file name.
            let name_start = util::find_start_of_name(text, start);
            let (k, len) = activation_sequence(
                byte_before(text, name_start, 1),
                byte_before(text, name_start, 2),
                byte_before(text, name_start, 3),
                want_function_call,
                false,
            );
            kind = k;
            start = name_start - len;
        }
    } else if kind == TriggerKind::Pound {
        if !text[line_begin..start].trim().is_empty() {
            return rejected;
        }
    } else if kind == TriggerKind::Ampersand {
        // Only `&` opening an argument: `f(a, &`.
        let previous = token_index
            .and_then(|i| i.checked_sub(1))
            .map(|i| tokens[i].kind);
        if !matches!(previous, Some(TokenKind::Comma)) {
            return rejected;
        }
    }
    (kind, start)
}

/// Whether `pos` is inside a comment or a literal.
pub fn is_in_comment_or_string(text: &str, pos: usize) -> bool {
    let (line_begin, tokens) = line_tokens(text, pos);
    let rel = pos.saturating_sub(line_begin);
    if rel == 0 {
        return lexer::state_at(text, line_begin) != lexer::LexState::Normal;
    }
    match lexer::token_before(&tokens, rel - 1).map(|i| tokens[i]) {
        Some(tk) => (tk.is_comment() || tk.is_literal()) && rel <= tk.end,
        None => false,
    }
}

/// Whether typing has reached a point where completion should pop up on
/// its own: after an operator, or once the identifier being typed is long
/// enough.
pub fn triggers_completion(text: &str, cursor: usize, settings: &CompletionSettings) -> bool {
    let cursor = cursor.min(text.len());
    let (kind, start) = classify(text, cursor, true, settings.qt_signal_slot_completion);
    if start != cursor {
        return kind != TriggerKind::None;
    }
    // Not while editing inside an existing name.
    if util::char_at(text, cursor).is_some_and(util::is_identifier_char) {
        return false;
    }
    let name_start = util::find_start_of_name(text, cursor);
    let typed = &text[name_start..cursor];
    typed.chars().count() >= settings.character_threshold.max(1)
        && typed.chars().next().is_some_and(util::is_identifier_start)
        && !is_in_comment_or_string(text, cursor)
}

/// Build the request for a completion at `cursor`.
///
/// `None` means nothing can be completed here (a comma outside any call,
/// a name inside a comment or literal).
pub fn build_request(
    text: &str,
    cursor: usize,
    settings: &CompletionSettings,
) -> Option<CompletionRequest> {
    let cursor = cursor.min(text.len());
    let start_of_name = util::find_start_of_name(text, cursor);
    let mut end_of_operator = start_of_name;
    while let Some(c) = util::char_before(text, end_of_operator)
        && c.is_whitespace()
    {
        end_of_operator -= c.len_utf8();
    }
    let want_qt = settings.qt_signal_slot_completion;
    let (mut trigger, mut end_of_expression) = classify(text, end_of_operator, true, want_qt);
    let mut name_start = start_of_name;

    let plain = |trigger, name_start, end: usize| CompletionRequest {
        trigger,
        name_start,
        expression: String::new(),
        expression_start: cursor,
        expression_end: end,
        cursor,
    };

    match trigger {
        TriggerKind::None => {
            if is_in_comment_or_string(text, cursor) {
                return None;
            }
            return Some(plain(TriggerKind::None, start_of_name, cursor));
        }
        TriggerKind::DoxyComment | TriggerKind::Pound => {
            return Some(plain(trigger, start_of_name, end_of_expression));
        }
        TriggerKind::StringLiteral | TriggerKind::AngleStringLiteral | TriggerKind::Slash => {
            let line_begin = util::line_start(text, end_of_expression);
            let line = &text[line_begin..end_of_expression];
            let mut directory = String::new();
            if trigger == TriggerKind::Slash {
                let quote = line.find('"').map(|i| (i, TriggerKind::StringLiteral)).or_else(|| {
                    line.find('<')
                        .map(|i| (i, TriggerKind::AngleStringLiteral))
                });
                if let Some((i, kind)) = quote {
                    directory = line[i + 1..].to_string();
                    trigger = kind;
                }
            }
            return Some(CompletionRequest {
                trigger,
                name_start: end_of_expression + 1,
                expression: directory,
                expression_start: end_of_expression,
                expression_end: end_of_expression,
                cursor,
            });
        }
        TriggerKind::Comma => {
            let paren = start_of_function_call(text, end_of_expression)?;
            end_of_expression = paren;
            name_start = paren + 1;
            trigger = TriggerKind::LParen;
        }
        _ => {}
    }

    let (mut expression_start, mut expression) =
        ExpressionUnderCursor::new().expression(text, end_of_expression);

    match trigger {
        TriggerKind::Ampersand => {
            match connect_argument(text, end_of_expression) {
                Some(arg) if arg.index == 1 || arg.index == 3 => {
                    trigger = TriggerKind::Qt5SignalOrSlotClassName;
                    expression = arg.previous[arg.index as usize - 1].clone();
                }
                _ => return Some(plain(TriggerKind::None, start_of_name, cursor)),
            }
        }
        TriggerKind::ColonColon if !expression.is_empty() && want_qt => {
            let before = text[..expression_start].trim_end();
            if before.ends_with('&') {
                let amp = before.len() - 1;
                match connect_argument(text, amp) {
                    Some(arg) if arg.index == 1 => trigger = TriggerKind::Qt5Signal,
                    Some(arg) if arg.index == 3 => trigger = TriggerKind::Qt5Slot,
                    _ => {}
                }
            }
        }
        TriggerKind::LParen => {
            if expression.ends_with("SIGNAL") {
                trigger = TriggerKind::Signal;
            } else if expression.ends_with("SLOT") {
                trigger = TriggerKind::Slot;
            } else if cursor != end_of_operator && name_start == start_of_name {
                // Not at the opening parenthesis: complete the argument.
                return Some(plain(TriggerKind::None, start_of_name, cursor));
            }
            if trigger.is_qt_method() && !want_qt {
                return None;
            }
        }
        _ => {}
    }
    if expression.is_empty() {
        expression_start = cursor;
    }
    Some(CompletionRequest {
        trigger,
        name_start,
        expression,
        expression_start,
        expression_end: end_of_expression,
        cursor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(text: &str) -> TriggerKind {
        classify(text, text.len(), true, true).0
    }

    #[test]
    fn test_operators() {
        assert_eq!(kind("a."), TriggerKind::Dot);
        assert_eq!(kind("a.."), TriggerKind::None);
        assert_eq!(kind("p->"), TriggerKind::Arrow);
        assert_eq!(kind("ns::"), TriggerKind::ColonColon);
        assert_eq!(kind("a:::"), TriggerKind::None);
        assert_eq!(kind("a.*"), TriggerKind::DotStar);
        assert_eq!(kind("a->*"), TriggerKind::ArrowStar);
        assert_eq!(kind("x > "), TriggerKind::None);
    }

    #[test]
    fn test_rejections() {
        assert_eq!(kind("// a."), TriggerKind::None);
        assert_eq!(kind("/* a."), TriggerKind::None);
        assert_eq!(kind("s = \"a."), TriggerKind::None);
        assert_eq!(kind("int a, "), TriggerKind::None);
        assert_eq!(kind("int a,"), TriggerKind::None);
        assert_eq!(kind("f(a,"), TriggerKind::Comma);
        assert_eq!(kind("if ("), TriggerKind::None);
        assert_eq!(kind("foo("), TriggerKind::LParen);
        assert_eq!(kind("f<int>("), TriggerKind::LParen);
        assert_eq!(kind("a / "), TriggerKind::None);
        assert_eq!(kind("x = a & "), TriggerKind::None);
    }

    #[test]
    fn test_preprocessor_and_includes() {
        assert_eq!(kind("  #"), TriggerKind::Pound);
        assert_eq!(kind("x #"), TriggerKind::None);
        assert_eq!(kind("#include <"), TriggerKind::AngleStringLiteral);
        assert_eq!(kind("#include \""), TriggerKind::StringLiteral);
        assert_eq!(kind("#include <QtCore/"), TriggerKind::Slash);
        assert_eq!(kind("#include \"sub/"), TriggerKind::Slash);
        assert_eq!(kind("#include \"foo."), TriggerKind::StringLiteral);
        assert_eq!(kind("#define X \""), TriggerKind::None);
    }

    #[test]
    fn test_doxygen() {
        assert_eq!(kind("/** @"), TriggerKind::DoxyComment);
        assert_eq!(kind("/// \\"), TriggerKind::DoxyComment);
        assert_eq!(kind("// @"), TriggerKind::None);
        assert_eq!(kind("a @"), TriggerKind::None);
    }

    #[test]
    fn test_threshold() {
        let settings = CompletionSettings::default();
        assert!(triggers_completion("int value = abc", 15, &settings));
        assert!(!triggers_completion("int value = ab", 14, &settings));
        assert!(!triggers_completion("// abcdef", 9, &settings));
        assert!(!triggers_completion("x = 123", 7, &settings));
        assert!(!triggers_completion("abcd", 2, &settings));
        assert!(triggers_completion("obj.", 4, &settings));
    }

    #[test]
    fn test_requests() {
        let settings = CompletionSettings::default();
        let text = "x = a.b->ma";
        let req = build_request(text, text.len(), &settings).unwrap();
        assert_eq!(req.trigger, TriggerKind::Arrow);
        assert_eq!(req.expression, "a.b");
        assert_eq!(req.typed_prefix(text), "ma");

        let text = "f(a, ";
        let req = build_request(text, text.len(), &settings).unwrap();
        assert_eq!(req.trigger, TriggerKind::None, "space after comma completes the argument");
        let text = "f(a,";
        let req = build_request(text, text.len(), &settings).unwrap();
        assert_eq!(req.trigger, TriggerKind::LParen);
        assert_eq!(req.expression, "f");
        assert_eq!(req.name_start, 2);

        let text = "connect(obj, SIGNAL(";
        let req = build_request(text, text.len(), &settings).unwrap();
        assert_eq!(req.trigger, TriggerKind::Signal);
        assert_eq!(req.expression, "obj, SIGNAL");

        let text = "#include <QtCore/qst";
        let req = build_request(text, text.len(), &settings).unwrap();
        assert_eq!(req.trigger, TriggerKind::AngleStringLiteral);
        assert_eq!(req.expression, "QtCore");
        assert_eq!(req.typed_prefix(text), "qst");
    }

    #[test]
    fn test_qt5_connect_requests() {
        let settings = CompletionSettings::default();
        let text = "connect(sender, &";
        let req = build_request(text, text.len(), &settings).unwrap();
        assert_eq!(req.trigger, TriggerKind::Qt5SignalOrSlotClassName);
        assert_eq!(req.expression, "sender");

        let text = "connect(sender, &Sender::";
        let req = build_request(text, text.len(), &settings).unwrap();
        assert_eq!(req.trigger, TriggerKind::Qt5Signal);
        assert_eq!(req.expression, "Sender");

        let text = "connect(sender, &Sender::changed, receiver, &Receiver::";
        let req = build_request(text, text.len(), &settings).unwrap();
        assert_eq!(req.trigger, TriggerKind::Qt5Slot);

        let text = "foo(a, &";
        let req = build_request(text, text.len(), &settings).unwrap();
        assert_eq!(req.trigger, TriggerKind::None);
    }
}
