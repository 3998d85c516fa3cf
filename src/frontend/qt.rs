//! Qt dialect masking.
//!
//! Qt classes use moc-specific keywords (`signals:`, `public slots:`,
//! `Q_OBJECT`, `Q_PROPERTY(...)`, `emit`) that a plain C++ grammar does not
//! understand.  Before parsing we rewrite them in place, always preserving
//! byte offsets and line structure so that positions in the masked text
//! equal positions in the original buffer:
//!
//! - `signals:` / `Q_SIGNALS:` become `public :` and remember that the
//!   following members are signals.
//! - `<access> slots:` becomes `<access>       :` and remembers the slot
//!   section.
//! - Marker macros are blanked; `Q_PROPERTY`/`Q_ENUM(S)` invocations are
//!   blanked and recorded as pseudo declarations.

use crate::frontend::symbols::QtMethodKind;
use crate::lexer::{self, Token, TokenKind};

/// Kind of a recorded pseudo declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PseudoKind {
    Property,
    Enum,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PseudoDecl {
    pub kind: PseudoKind,
    pub name: String,
    /// Byte offset of the macro invocation.
    pub offset: usize,
}

/// What the masking pass learnt about the original text.
#[derive(Debug, Clone, Default)]
pub struct QtAnnotations {
    /// Byte offsets of rewritten access specifiers and the method kind of
    /// the section they open.
    pub sections: Vec<(usize, QtMethodKind)>,
    pub pseudo_decls: Vec<PseudoDecl>,
}

impl QtAnnotations {
    /// The Qt section opened by an access specifier starting at `offset`.
    pub fn section_at(&self, offset: usize) -> QtMethodKind {
        self.sections
            .iter()
            .find(|(o, _)| *o == offset)
            .map(|(_, k)| *k)
            .unwrap_or_default()
    }
}

const BLANKED_MARKERS: &[&str] = &[
    "Q_OBJECT",
    "Q_GADGET",
    "Q_INVOKABLE",
    "Q_SIGNAL",
    "Q_SLOT",
    "Q_EMIT",
    "Q_SCRIPTABLE",
];

const BLANKED_INVOCATIONS: &[&str] = &[
    "Q_CLASSINFO",
    "Q_INTERFACES",
    "Q_DECLARE_PRIVATE",
    "Q_DECLARE_PUBLIC",
    "Q_DISABLE_COPY",
    "Q_PRIVATE_SLOT",
];

/// Rewrite Qt dialect constructs in `source`.  `qt_keywords` enables the
/// lowercase spellings (`signals`, `slots`, `emit`).
pub fn mask_qt_dialect(source: &str, qt_keywords: bool) -> (String, QtAnnotations) {
    let tokens: Vec<Token> = lexer::tokenize_text(source, lexer::LexState::Normal)
        .into_iter()
        .filter(|t| !t.is_comment())
        .collect();
    let mut bytes = source.as_bytes().to_vec();
    let mut notes = QtAnnotations::default();

    let mut i = 0;
    while i < tokens.len() {
        let tk = tokens[i];
        if tk.kind != TokenKind::Identifier && tk.kind != TokenKind::Keyword {
            i += 1;
            continue;
        }
        let word = tk.text(source);
        let next_is = |n: usize, kind: TokenKind| tokens.get(i + n).is_some_and(|t| t.kind == kind);

        let is_signals = word == "Q_SIGNALS" || (qt_keywords && word == "signals");
        let is_slots = word == "Q_SLOTS" || (qt_keywords && word == "slots");

        if is_signals && next_is(1, TokenKind::Colon) {
            overwrite(&mut bytes, tk.begin, tk.end, "public");
            notes.sections.push((tk.begin, QtMethodKind::Signal));
            i += 2;
        } else if matches!(word, "public" | "protected" | "private")
            && tokens
                .get(i + 1)
                .is_some_and(|t| matches!(t.text(source), "slots" | "Q_SLOTS"))
            && next_is(2, TokenKind::Colon)
        {
            let slots = tokens[i + 1];
            if slots.text(source) == "Q_SLOTS" || qt_keywords {
                blank(&mut bytes, slots.begin, slots.end);
                notes.sections.push((tk.begin, QtMethodKind::Slot));
            }
            i += 3;
        } else if is_slots && word == "Q_SLOTS" && next_is(1, TokenKind::Colon) {
            overwrite(&mut bytes, tk.begin, tk.end, "public");
            notes.sections.push((tk.begin, QtMethodKind::Slot));
            i += 2;
        } else if BLANKED_MARKERS.contains(&word) || (qt_keywords && word == "emit") {
            blank(&mut bytes, tk.begin, tk.end);
            i += 1;
        } else if matches!(
            word,
            "Q_PROPERTY" | "Q_ENUMS" | "Q_ENUM" | "Q_FLAGS" | "Q_FLAG"
        ) || BLANKED_INVOCATIONS.contains(&word)
        {
            let Some(close) = matching_paren(&tokens, i + 1) else {
                i += 1;
                continue;
            };
            let args = &tokens[i + 2..close];
            match word {
                "Q_PROPERTY" => {
                    // Q_PROPERTY(type name READ ...): the name is the last
                    // identifier before the first upper-case attribute.
                    let mut name = None;
                    for t in args {
                        let text = t.text(source);
                        if t.kind == TokenKind::Identifier
                            && name.is_some()
                            && text.chars().all(|c| c.is_ascii_uppercase() || c == '_')
                        {
                            break;
                        }
                        if t.kind == TokenKind::Identifier {
                            name = Some(text);
                        }
                    }
                    if let Some(name) = name {
                        notes.pseudo_decls.push(PseudoDecl {
                            kind: PseudoKind::Property,
                            name: name.to_string(),
                            offset: tk.begin,
                        });
                    }
                }
                "Q_ENUMS" | "Q_ENUM" | "Q_FLAGS" | "Q_FLAG" => {
                    for t in args.iter().filter(|t| t.kind == TokenKind::Identifier) {
                        notes.pseudo_decls.push(PseudoDecl {
                            kind: PseudoKind::Enum,
                            name: t.text(source).to_string(),
                            offset: tk.begin,
                        });
                    }
                }
                _ => {}
            }
            blank(&mut bytes, tk.begin, tokens[close].end);
            i = close + 1;
        } else {
            i += 1;
        }
    }

    let masked = String::from_utf8(bytes).unwrap_or_else(|_| source.to_string());
    (masked, notes)
}

/// Index of the `)` matching the `(` at `open`.
fn matching_paren(tokens: &[Token], open: usize) -> Option<usize> {
    if tokens.get(open)?.kind != TokenKind::LParen {
        return None;
    }
    let mut depth = 0usize;
    for (idx, t) in tokens.iter().enumerate().skip(open) {
        match t.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// Replace `[begin, end)` with `word` padded by spaces.
fn overwrite(bytes: &mut [u8], begin: usize, end: usize, word: &str) {
    blank(bytes, begin, end);
    let len = word.len().min(end - begin);
    bytes[begin..begin + len].copy_from_slice(&word.as_bytes()[..len]);
}

/// Replace every non-newline byte in `[begin, end)` with a space.
pub fn blank(bytes: &mut [u8], begin: usize, end: usize) {
    for b in &mut bytes[begin..end] {
        if *b != b'\n' {
            *b = b' ';
        }
    }
}
