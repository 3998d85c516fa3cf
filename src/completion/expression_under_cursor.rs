/// Backward scanning over the tokens left of the cursor.
///
/// The text around the cursor is usually incomplete, so instead of parsing
/// it we lex a window of lines ending at the cursor and walk the tokens
/// backwards, matching brackets as we go.  This recovers:
///
/// - the expression an operator applies to (`a.b()[2]` in `a.b()[2].`),
/// - the `(` of the call the cursor is inside (`foo(a, ` → the `(`),
/// - the start of the statement the cursor is in.
use crate::lexer::{self, Token, TokenKind};
use crate::util;

/// Lines scanned backwards from the cursor.
const MAX_BLOCK_COUNT: usize = 10;

/// Tokens (comments dropped) from the start of the scan window to an
/// offset.
pub struct BackwardsScanner<'a> {
    text: &'a str,
    tokens: Vec<Token>,
    window_start: usize,
    end: usize,
}

impl<'a> BackwardsScanner<'a> {
    pub fn new(text: &'a str, offset: usize) -> Self {
        let end = offset.min(text.len());
        let mut window_start = util::line_start(text, end);
        for _ in 1..MAX_BLOCK_COUNT {
            if window_start == 0 {
                break;
            }
            window_start = util::line_start(text, window_start - 1);
        }
        let state = lexer::state_at(text, window_start);
        let tokens = lexer::tokenize_text(&text[window_start..end], state)
            .into_iter()
            .filter(|tk| !tk.is_comment())
            .map(|tk| Token {
                kind: tk.kind,
                begin: tk.begin + window_start,
                end: tk.end + window_start,
            })
            .collect();
        Self {
            text,
            tokens,
            window_start,
            end,
        }
    }

    /// Number of tokens; also the index "just past the last token".
    pub fn start_token(&self) -> usize {
        self.tokens.len()
    }

    pub fn token(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    /// Kind of the token at `index`, `None` before the window.
    fn kind(&self, index: Option<usize>) -> Option<TokenKind> {
        index.and_then(|i| self.tokens.get(i)).map(|tk| tk.kind)
    }

    /// Kind of `tokens[index - n]`.
    fn before(&self, index: usize, n: usize) -> Option<TokenKind> {
        self.kind(index.checked_sub(n))
    }

    pub fn text_of(&self, index: usize) -> &'a str {
        self.tokens[index].text(self.text)
    }

    /// Text from the start of token `index` to the scan end.
    pub fn mid(&self, index: usize) -> &'a str {
        match self.tokens.get(index) {
            Some(tk) => &self.text[tk.begin..self.end],
            None => "",
        }
    }

    pub fn window_start(&self) -> usize {
        self.window_start
    }

    /// Given that `tokens[index - 1]` is a closing bracket, the index of
    /// its opening bracket.  Returns `index` when there is no match.
    pub fn start_of_matching_brace(&self, index: usize) -> usize {
        let Some(close) = self.before(index, 1) else {
            return index;
        };
        let open = match close {
            TokenKind::RParen => TokenKind::LParen,
            TokenKind::RBracket => TokenKind::LBracket,
            TokenKind::RBrace => TokenKind::LBrace,
            TokenKind::Greater => TokenKind::Less,
            _ => return index,
        };
        let mut depth = 0i32;
        let mut i = index;
        while i > 0 {
            i -= 1;
            let kind = self.tokens[i].kind;
            if kind == close {
                depth += 1;
            } else if kind == open {
                depth -= 1;
                if depth == 0 {
                    return i;
                }
            }
        }
        index
    }
}

/// Finds where the expression ending at a position starts.
#[derive(Default)]
pub struct ExpressionUnderCursor {
    jumped_comma: bool,
}

impl ExpressionUnderCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// The expression ending at `offset` and its start offset.  The
    /// expression is empty when nothing expression-like precedes `offset`.
    pub fn expression(&mut self, text: &str, offset: usize) -> (usize, String) {
        let scanner = BackwardsScanner::new(text, offset);
        self.jumped_comma = false;
        let initial = scanner.start_token();
        let start = self.start_of_expression(&scanner, initial);
        if start == initial {
            return (offset.min(text.len()), String::new());
        }
        let begin = scanner.tokens[start].begin;
        (begin, scanner.mid(start).to_string())
    }

    fn start_of_expression(&mut self, tk: &BackwardsScanner, index: usize) -> usize {
        let start = self.start_of_expression_helper(tk, index);
        if self.jumped_comma && start > 0 {
            // `a + b, SIGNAL` only reaches back to `b`.
            let prev = tk.tokens[start - 1];
            match prev.kind {
                TokenKind::Comma
                | TokenKind::LParen
                | TokenKind::LBracket
                | TokenKind::LBrace
                | TokenKind::Semicolon
                | TokenKind::Colon
                | TokenKind::Question => {}
                _ if prev.is_operator() => return start,
                _ => {}
            }
        }
        start
    }

    fn start_of_expression_helper(&mut self, tk: &BackwardsScanner, index: usize) -> usize {
        let Some(last) = tk.before(index, 1) else {
            return index;
        };
        let prev = tk.before(index, 2);
        match last {
            _ if tk.tokens[index - 1].is_literal() => index - 1,
            TokenKind::Keyword if tk.text_of(index - 1) == "this" => index - 1,
            TokenKind::Keyword if tk.text_of(index - 1) == "typeid" => index - 1,
            TokenKind::Signal | TokenKind::Slot => {
                if prev == Some(TokenKind::Comma) && !self.jumped_comma {
                    self.jumped_comma = true;
                    return self.start_of_expression(tk, index - 2);
                }
                index - 1
            }
            TokenKind::Identifier => match prev {
                Some(TokenKind::Tilde) => match tk.before(index, 3) {
                    Some(TokenKind::ColonColon | TokenKind::Dot | TokenKind::Arrow) => {
                        self.start_of_expression(tk, index - 3)
                    }
                    _ => index - 2,
                },
                Some(TokenKind::ColonColon) => self.start_of_expression(tk, index - 1),
                Some(
                    TokenKind::Dot | TokenKind::Arrow | TokenKind::DotStar | TokenKind::ArrowStar,
                ) => self.start_of_expression(tk, index - 2),
                _ => index - 1,
            },
            TokenKind::RParen => {
                let open = tk.start_of_matching_brace(index);
                if open == index {
                    return index;
                }
                // `static_cast<T>(e)`, `qobject_cast<T *>(e)`, `f<T>(e)`
                if tk.before(open + 1, 2) == Some(TokenKind::Greater) {
                    let less = tk.start_of_matching_brace(open);
                    if less != open
                        && let Some(kind) = tk.before(less + 1, 2)
                    {
                        let word = tk.text_of(less - 1);
                        if kind == TokenKind::Keyword && word.ends_with("_cast") {
                            return less - 1;
                        }
                        if matches!(
                            kind,
                            TokenKind::Identifier | TokenKind::Signal | TokenKind::Slot
                        ) {
                            return self.start_of_expression(tk, less);
                        }
                    }
                }
                self.start_of_expression(tk, open)
            }
            TokenKind::RBracket => {
                let open = tk.start_of_matching_brace(index);
                if open == index {
                    return index;
                }
                self.start_of_expression(tk, open)
            }
            TokenKind::ColonColon => match prev {
                Some(TokenKind::Greater) => {
                    let less = tk.start_of_matching_brace(index - 1);
                    if less != index - 1 {
                        return self.start_of_expression(tk, less);
                    }
                    index - 1
                }
                Some(TokenKind::Identifier) => self.start_of_expression(tk, index - 1),
                _ => index - 1,
            },
            TokenKind::Dot | TokenKind::Arrow | TokenKind::DotStar | TokenKind::ArrowStar => {
                self.start_of_expression(tk, index - 1)
            }
            _ => index,
        }
    }
}

/// Offset of the `(` of the innermost call still open at `offset`.
///
/// The scan stops at statement boundaries, so a comma in a declarator list
/// (`int a, b`) is not mistaken for an argument separator.
pub fn start_of_function_call(text: &str, offset: usize) -> Option<usize> {
    let scanner = BackwardsScanner::new(text, offset);
    let mut index = scanner.start_token();
    while index > 0 {
        let tk = scanner.tokens[index - 1];
        match tk.kind {
            TokenKind::LParen => return Some(tk.begin),
            TokenKind::RParen | TokenKind::RBracket => {
                let open = scanner.start_of_matching_brace(index);
                if open == index {
                    return None;
                }
                index = open;
            }
            TokenKind::Semicolon | TokenKind::LBrace | TokenKind::RBrace => return None,
            _ => index -= 1,
        }
    }
    None
}

/// Offset just past the `;`, `{` or `}` that ends the previous statement;
/// the start of the line when none is in reach.
pub fn start_of_statement(text: &str, offset: usize) -> usize {
    let scanner = BackwardsScanner::new(text, offset);
    let mut index = scanner.start_token();
    while index > 0 {
        let tk = scanner.tokens[index - 1];
        match tk.kind {
            TokenKind::Semicolon | TokenKind::LBrace | TokenKind::RBrace => return tk.end,
            TokenKind::RParen | TokenKind::RBracket => {
                let open = scanner.start_of_matching_brace(index);
                index = if open == index { index - 1 } else { open };
            }
            _ => index -= 1,
        }
    }
    util::line_start(text, offset)
}

/// Number of top-level commas in `text[from..to]`, the index of the
/// argument being typed.
pub fn argument_index(text: &str, from: usize, to: usize) -> u32 {
    argument_spans(text, from, to).len().saturating_sub(1) as u32
}

/// Byte ranges of the top-level arguments in `text[from..to]`.
pub fn argument_spans(text: &str, from: usize, to: usize) -> Vec<(usize, usize)> {
    let to = to.min(text.len());
    let from = from.min(to);
    let state = lexer::state_at(text, util::line_start(text, from));
    // Lexing from `from` directly keeps offsets simple; the comment state
    // only matters at line starts.
    let tokens = lexer::tokenize_text(&text[from..to], state);
    let mut spans = Vec::new();
    let mut depth = 0i32;
    let mut start = from;
    for tk in tokens {
        match tk.kind {
            TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => depth += 1,
            TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => depth -= 1,
            TokenKind::Comma if depth == 0 => {
                spans.push((start, from + tk.begin));
                start = from + tk.end;
            }
            _ => {}
        }
    }
    spans.push((start, to));
    spans
}

/// Where a Qt 5 style `connect(...)` argument starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectArgument {
    /// Zero-based argument position.
    pub index: u32,
    /// Text of every argument before this one, trimmed.
    pub previous: Vec<String>,
}

/// If `offset` begins an argument of a `connect(` (or `QObject::connect(`,
/// `disconnect(`) call, describe it.
pub fn connect_argument(text: &str, offset: usize) -> Option<ConnectArgument> {
    let paren = start_of_function_call(text, offset)?;
    let scanner = BackwardsScanner::new(text, paren);
    let callee = scanner.start_token().checked_sub(1)?;
    if scanner.tokens[callee].kind != TokenKind::Identifier
        || !matches!(scanner.text_of(callee), "connect" | "disconnect")
    {
        return None;
    }
    let spans = argument_spans(text, paren + 1, offset);
    let (current_start, current_end) = *spans.last()?;
    if !text[current_start..current_end].trim().is_empty() {
        return None;
    }
    Some(ConnectArgument {
        index: (spans.len() - 1) as u32,
        previous: spans[..spans.len() - 1]
            .iter()
            .map(|&(s, e)| text[s..e].trim().to_string())
            .collect(),
    })
}
