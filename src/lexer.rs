//! Line-oriented C++ token scanner.
//!
//! The completion classifier, the expression scanner and the Qt dialect
//! masking all need a cheap tokenization of the text *around* the cursor,
//! which is typically incomplete and would confuse a full parser.  This
//! lexer works one line at a time and carries only the state that can
//! cross a line boundary: whether we are inside a block comment.
//!
//! Tokens record byte offsets relative to the text that was scanned.

/// Kind of a scanned token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Keyword,
    /// The Qt `SIGNAL` macro.
    Signal,
    /// The Qt `SLOT` macro.
    Slot,
    NumericLiteral,
    CharLiteral,
    StringLiteral,
    /// `<...>` after `#include`, `#include_next` or `#import`.
    AngleStringLiteral,
    Comment,
    CppComment,
    /// `/** ... */` or `/*! ... */`.
    DoxyComment,
    /// `/// ...` or `//! ...`.
    CppDoxyComment,
    Pound,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Less,
    Greater,
    Dot,
    DotStar,
    Arrow,
    ArrowStar,
    ColonColon,
    Colon,
    Semicolon,
    Question,
    Star,
    Amper,
    Slash,
    Tilde,
    /// Any other operator or punctuator.
    Operator,
}

/// A single token with its byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub begin: usize,
    pub end: usize,
}

impl Token {
    pub fn is_literal(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::NumericLiteral
                | TokenKind::CharLiteral
                | TokenKind::StringLiteral
                | TokenKind::AngleStringLiteral
        )
    }

    pub fn is_comment(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Comment
                | TokenKind::CppComment
                | TokenKind::DoxyComment
                | TokenKind::CppDoxyComment
        )
    }

    /// Operators and punctuators other than the grouping brackets.
    pub fn is_operator(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Less
                | TokenKind::Greater
                | TokenKind::Dot
                | TokenKind::DotStar
                | TokenKind::Arrow
                | TokenKind::ArrowStar
                | TokenKind::Star
                | TokenKind::Amper
                | TokenKind::Slash
                | TokenKind::Tilde
                | TokenKind::Operator
        )
    }

    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.begin..self.end]
    }
}

/// State carried from one line to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LexState {
    #[default]
    Normal,
    InComment,
    InDoxyComment,
}

/// C++ keywords, plus the handful of alternative tokens the lexer treats
/// as reserved.
pub const CPP_KEYWORDS: &[&str] = &[
    "alignas",
    "alignof",
    "asm",
    "auto",
    "bool",
    "break",
    "case",
    "catch",
    "char",
    "char16_t",
    "char32_t",
    "char8_t",
    "class",
    "const",
    "const_cast",
    "consteval",
    "constexpr",
    "constinit",
    "continue",
    "decltype",
    "default",
    "delete",
    "do",
    "double",
    "dynamic_cast",
    "else",
    "enum",
    "explicit",
    "export",
    "extern",
    "false",
    "float",
    "for",
    "friend",
    "goto",
    "if",
    "inline",
    "int",
    "long",
    "mutable",
    "namespace",
    "new",
    "noexcept",
    "nullptr",
    "operator",
    "private",
    "protected",
    "public",
    "register",
    "reinterpret_cast",
    "return",
    "short",
    "signed",
    "sizeof",
    "static",
    "static_assert",
    "static_cast",
    "struct",
    "switch",
    "template",
    "this",
    "thread_local",
    "throw",
    "true",
    "try",
    "typedef",
    "typeid",
    "typename",
    "union",
    "unsigned",
    "using",
    "virtual",
    "void",
    "volatile",
    "wchar_t",
    "while",
];

pub fn is_keyword(word: &str) -> bool {
    CPP_KEYWORDS.binary_search(&word).is_ok()
}

/// Scan a single line.  `state` is updated to the state at the end of the
/// line so it can be fed into the next call.
pub fn tokenize_line(line: &str, state: &mut LexState) -> Vec<Token> {
    Scanner::new(line, 0).run(state)
}

/// Scan a multi-line text, carrying the comment state across lines.
/// Offsets in the returned tokens are relative to `text`.
pub fn tokenize_text(text: &str, initial: LexState) -> Vec<Token> {
    let mut state = initial;
    let mut tokens = Vec::new();
    let mut line_begin = 0usize;
    for line in text.split('\n') {
        tokens.extend(Scanner::new(line, line_begin).run(&mut state));
        line_begin += line.len() + 1;
    }
    tokens
}

/// Compute the comment state at the start of the line beginning at
/// `line_begin` by scanning everything before it.
pub fn state_at(text: &str, line_begin: usize) -> LexState {
    let mut state = LexState::Normal;
    let prefix = &text[..line_begin.min(text.len())];
    for line in prefix.split_inclusive('\n') {
        let line = line.strip_suffix('\n').unwrap_or(line);
        Scanner::new(line, 0).run(&mut state);
    }
    state
}

/// Index of the last token beginning at or before `offset`.
pub fn token_before(tokens: &[Token], offset: usize) -> Option<usize> {
    tokens.iter().rposition(|tk| tk.begin <= offset)
}

struct Scanner<'a> {
    bytes: &'a [u8],
    base: usize,
    pos: usize,
    tokens: Vec<Token>,
    /// Set after `#` `include`/`include_next`/`import`, enabling `<...>`
    /// header names.
    expect_header_name: bool,
}

impl<'a> Scanner<'a> {
    fn new(line: &'a str, base: usize) -> Self {
        Self {
            bytes: line.as_bytes(),
            base,
            pos: 0,
            tokens: Vec::new(),
            expect_header_name: false,
        }
    }

    fn peek(&self, ahead: usize) -> u8 {
        self.bytes.get(self.pos + ahead).copied().unwrap_or(0)
    }

    fn push(&mut self, kind: TokenKind, begin: usize) {
        self.tokens.push(Token {
            kind,
            begin: self.base + begin,
            end: self.base + self.pos,
        });
    }

    fn run(mut self, state: &mut LexState) -> Vec<Token> {
        if *state != LexState::Normal {
            let kind = if *state == LexState::InDoxyComment {
                TokenKind::DoxyComment
            } else {
                TokenKind::Comment
            };
            if self.scan_block_comment_body() {
                *state = LexState::Normal;
            }
            self.push(kind, 0);
        }

        while self.pos < self.bytes.len() {
            let c = self.bytes[self.pos];
            if c.is_ascii_whitespace() {
                self.pos += 1;
                continue;
            }
            let begin = self.pos;

            if c == b'/' && self.peek(1) == b'*' {
                let doxy = matches!(self.peek(2), b'*' | b'!') && self.peek(3) != b'/';
                self.pos += 2;
                let closed = self.scan_block_comment_body();
                let kind = if doxy {
                    TokenKind::DoxyComment
                } else {
                    TokenKind::Comment
                };
                self.push(kind, begin);
                if !closed {
                    *state = if doxy {
                        LexState::InDoxyComment
                    } else {
                        LexState::InComment
                    };
                }
                continue;
            }
            if c == b'/' && self.peek(1) == b'/' {
                let doxy = matches!(self.peek(2), b'/' | b'!') && self.peek(3) != b'/';
                self.pos = self.bytes.len();
                let kind = if doxy {
                    TokenKind::CppDoxyComment
                } else {
                    TokenKind::CppComment
                };
                self.push(kind, begin);
                continue;
            }

            if c.is_ascii_alphabetic() || c == b'_' || c >= 0x80 {
                self.scan_identifier(begin);
                continue;
            }
            if c.is_ascii_digit() || (c == b'.' && self.peek(1).is_ascii_digit()) {
                self.scan_number();
                self.push(TokenKind::NumericLiteral, begin);
                continue;
            }
            if c == b'"' {
                self.pos += 1;
                self.scan_quoted(b'"');
                self.push(TokenKind::StringLiteral, begin);
                continue;
            }
            if c == b'\'' {
                self.pos += 1;
                self.scan_quoted(b'\'');
                self.push(TokenKind::CharLiteral, begin);
                continue;
            }
            if c == b'<' && self.expect_header_name {
                self.pos += 1;
                while self.pos < self.bytes.len() && self.bytes[self.pos] != b'>' {
                    self.pos += 1;
                }
                if self.pos < self.bytes.len() {
                    self.pos += 1;
                }
                self.push(TokenKind::AngleStringLiteral, begin);
                continue;
            }

            let kind = self.scan_punctuator();
            self.push(kind, begin);
        }
        self.tokens
    }

    /// Consume up to and including `*/`.  Returns whether the comment was
    /// closed on this line.
    fn scan_block_comment_body(&mut self) -> bool {
        while self.pos < self.bytes.len() {
            if self.bytes[self.pos] == b'*' && self.peek(1) == b'/' {
                self.pos += 2;
                return true;
            }
            self.pos += 1;
        }
        false
    }

    fn scan_identifier(&mut self, begin: usize) {
        while self.pos < self.bytes.len() {
            let c = self.bytes[self.pos];
            if c.is_ascii_alphanumeric() || c == b'_' || c >= 0x80 {
                self.pos += 1;
            } else {
                break;
            }
        }
        let word = std::str::from_utf8(&self.bytes[begin..self.pos]).unwrap_or("");

        // String literal prefixes: u8"..", L'..', R"(..)".
        if matches!(word, "L" | "u" | "U" | "u8" | "R" | "LR" | "uR" | "UR" | "u8R")
            && matches!(self.peek(0), b'"' | b'\'')
        {
            let quote = self.peek(0);
            self.pos += 1;
            self.scan_quoted(quote);
            let kind = if quote == b'"' {
                TokenKind::StringLiteral
            } else {
                TokenKind::CharLiteral
            };
            self.push(kind, begin);
            return;
        }

        let after_pound = self
            .tokens
            .last()
            .is_some_and(|tk| tk.kind == TokenKind::Pound)
            && self.tokens.len() == 1;
        if after_pound && matches!(word, "include" | "include_next" | "import") {
            self.expect_header_name = true;
        }

        let kind = match word {
            "SIGNAL" => TokenKind::Signal,
            "SLOT" => TokenKind::Slot,
            w if is_keyword(w) => TokenKind::Keyword,
            _ => TokenKind::Identifier,
        };
        self.push(kind, begin);
    }

    fn scan_number(&mut self) {
        while self.pos < self.bytes.len() {
            let c = self.bytes[self.pos];
            let exponent_sign = (c == b'+' || c == b'-')
                && self.pos > 0
                && matches!(self.bytes[self.pos - 1], b'e' | b'E' | b'p' | b'P');
            if c.is_ascii_alphanumeric() || c == b'.' || c == b'\'' || exponent_sign {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    /// Scan to the closing `quote`, honouring escapes.  Unterminated
    /// literals extend to the end of the line.
    fn scan_quoted(&mut self, quote: u8) {
        while self.pos < self.bytes.len() {
            let c = self.bytes[self.pos];
            self.pos += 1;
            if c == b'\\' {
                self.pos = (self.pos + 1).min(self.bytes.len());
            } else if c == quote {
                return;
            }
        }
    }

    fn scan_punctuator(&mut self) -> TokenKind {
        let c = self.bytes[self.pos];
        let n1 = self.peek(1);
        let n2 = self.peek(2);
        let (kind, len) = match c {
            b'#' => (TokenKind::Pound, if n1 == b'#' { 2 } else { 1 }),
            b',' => (TokenKind::Comma, 1),
            b'(' => (TokenKind::LParen, 1),
            b')' => (TokenKind::RParen, 1),
            b'[' => (TokenKind::LBracket, 1),
            b']' => (TokenKind::RBracket, 1),
            b'{' => (TokenKind::LBrace, 1),
            b'}' => (TokenKind::RBrace, 1),
            b';' => (TokenKind::Semicolon, 1),
            b'?' => (TokenKind::Question, 1),
            b'~' => (TokenKind::Tilde, 1),
            b':' if n1 == b':' => (TokenKind::ColonColon, 2),
            b':' => (TokenKind::Colon, 1),
            b'.' if n1 == b'.' && n2 == b'.' => (TokenKind::Operator, 3),
            b'.' if n1 == b'*' => (TokenKind::DotStar, 2),
            b'.' => (TokenKind::Dot, 1),
            b'-' if n1 == b'>' && n2 == b'*' => (TokenKind::ArrowStar, 3),
            b'-' if n1 == b'>' => (TokenKind::Arrow, 2),
            b'-' if matches!(n1, b'-' | b'=') => (TokenKind::Operator, 2),
            b'<' if n1 == b'<' && n2 == b'=' => (TokenKind::Operator, 3),
            b'<' if matches!(n1, b'<' | b'=') => (TokenKind::Operator, 2),
            b'<' => (TokenKind::Less, 1),
            b'>' if n1 == b'>' && n2 == b'=' => (TokenKind::Operator, 3),
            b'>' if n1 == b'=' => (TokenKind::Operator, 2),
            b'>' => (TokenKind::Greater, 1),
            b'*' if n1 == b'=' => (TokenKind::Operator, 2),
            b'*' => (TokenKind::Star, 1),
            b'&' if matches!(n1, b'&' | b'=') => (TokenKind::Operator, 2),
            b'&' => (TokenKind::Amper, 1),
            b'/' if n1 == b'=' => (TokenKind::Operator, 2),
            b'/' => (TokenKind::Slash, 1),
            b'+' | b'|' if n1 == c || n1 == b'=' => (TokenKind::Operator, 2),
            b'=' | b'!' | b'%' | b'^' if n1 == b'=' => (TokenKind::Operator, 2),
            _ => (TokenKind::Operator, 1),
        };
        self.pos += len;
        kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(line: &str) -> Vec<TokenKind> {
        let mut state = LexState::Normal;
        tokenize_line(line, &mut state)
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_keywords_are_sorted() {
        let mut sorted = CPP_KEYWORDS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, CPP_KEYWORDS);
    }

    #[test]
    fn test_member_access_operators() {
        use TokenKind::*;
        assert_eq!(
            kinds("a->b.c::d->*e.*f"),
            vec![
                Identifier, Arrow, Identifier, Dot, Identifier, ColonColon, Identifier,
                ArrowStar, Identifier, DotStar, Identifier
            ]
        );
    }

    #[test]
    fn test_include_header_names() {
        use TokenKind::*;
        assert_eq!(kinds("#include <vector>"), vec![Pound, Identifier, AngleStringLiteral]);
        assert_eq!(kinds("#include \"foo/"), vec![Pound, Identifier, StringLiteral]);
        assert_eq!(kinds("a < b"), vec![Identifier, Less, Identifier]);
    }

    #[test]
    fn test_block_comment_spans_lines() {
        let mut state = LexState::Normal;
        let first = tokenize_line("int a; /** doc", &mut state);
        assert_eq!(first.last().map(|t| t.kind), Some(TokenKind::DoxyComment));
        assert_eq!(state, LexState::InDoxyComment);
        let second = tokenize_line(" still \\brief */ x", &mut state);
        assert_eq!(second[0].kind, TokenKind::DoxyComment);
        assert_eq!(second[1].kind, TokenKind::Identifier);
        assert_eq!(state, LexState::Normal);
    }

    #[test]
    fn test_qt_macros_and_numbers() {
        use TokenKind::*;
        assert_eq!(
            kinds("connect(a, SIGNAL(x()), this, SLOT("),
            vec![
                Identifier, LParen, Identifier, Comma, Signal, LParen, Identifier, LParen,
                RParen, RParen, Comma, Keyword, Comma, Slot, LParen
            ]
        );
        assert_eq!(kinds("1."), vec![NumericLiteral]);
        assert_eq!(kinds("1e+5"), vec![NumericLiteral]);
    }

    #[test]
    fn test_state_at_finds_open_comment() {
        let text = "/* open\nstill\n";
        assert_eq!(state_at(text, 8), LexState::InComment);
        assert_eq!(state_at(text, 0), LexState::Normal);
    }
}
