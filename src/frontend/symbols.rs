/// Symbol and type model for parsed C++ documents.
///
/// Every document owns a flat arena of [`Symbol`]s and [`Scope`]s indexed
/// by [`SymbolId`] / [`ScopeId`].  Scopes record their members in
/// declaration order and their source range, which is what scope-at-cursor
/// lookup and scope-ordered completion listings are built from.
///
/// Types are kept in a small structural form ([`Ty`]) that references
/// other types *by name*; names are resolved lazily against a lookup
/// scope by [`crate::frontend::lookup::LookupContext`].
use ustr::Ustr;

use crate::lexer::{self, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

impl ScopeId {
    /// The translation unit scope is always the first scope created.
    pub const GLOBAL: ScopeId = ScopeId(0);
}

/// A symbol in a document, identified by the document's position in a
/// lookup context plus its id inside that document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolRef {
    pub doc: u32,
    pub id: SymbolId,
}

/// A scope in a document, see [`SymbolRef`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeRef {
    pub doc: u32,
    pub id: ScopeId,
}

// ─── Names ──────────────────────────────────────────────────────────────────

/// A possibly `::`-qualified name such as `std::vector` or `::Foo`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct QualifiedName {
    /// Leading `::` (lookup starts at the global namespace).
    pub global: bool,
    pub segments: Vec<Ustr>,
}

impl QualifiedName {
    pub fn simple(name: &str) -> Self {
        Self {
            global: false,
            segments: vec![Ustr::from(name)],
        }
    }

    /// Parse `a::b<int>::c`, dropping any template arguments.
    pub fn parse(text: &str) -> Self {
        let compact: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let trimmed = compact.trim();
        let (global, rest) = match trimmed.strip_prefix("::") {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let segments = split_top_level(rest, "::")
            .into_iter()
            .map(|seg| Ustr::from(strip_template_args(seg).trim()))
            .filter(|seg| !seg.is_empty())
            .collect();
        Self { global, segments }
    }

    pub fn last(&self) -> Option<Ustr> {
        self.segments.last().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn is_qualified(&self) -> bool {
        self.global || self.segments.len() > 1
    }

    /// Everything but the last segment.
    pub fn qualifier(&self) -> QualifiedName {
        let mut segments = self.segments.clone();
        segments.pop();
        QualifiedName {
            global: self.global,
            segments,
        }
    }
}

impl std::fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.global {
            f.write_str("::")?;
        }
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("::")?;
            }
            f.write_str(seg)?;
        }
        Ok(())
    }
}

// ─── Types ──────────────────────────────────────────────────────────────────

/// A type reference by name, with template arguments on the last segment.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedType {
    pub name: QualifiedName,
    pub args: Vec<FullySpecifiedType>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Ty {
    Unknown,
    /// `int`, `unsigned long`, `void`, ...
    Builtin(Ustr),
    Named(NamedType),
    Pointer(Box<FullySpecifiedType>),
    /// Lvalue or rvalue reference.
    Reference(Box<FullySpecifiedType>),
    Array(Box<FullySpecifiedType>),
    /// `auto`, deduced from the declaration's initializer.
    Auto,
    /// The type (or namespace, or function) denoted by a symbol.  Only
    /// produced during expression resolution, never stored in documents.
    Symbol(SymbolRef),
}

/// A type together with its cv-qualifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct FullySpecifiedType {
    pub ty: Ty,
    pub is_const: bool,
    pub is_volatile: bool,
}

impl From<Ty> for FullySpecifiedType {
    fn from(ty: Ty) -> Self {
        Self {
            ty,
            is_const: false,
            is_volatile: false,
        }
    }
}

impl FullySpecifiedType {
    pub fn unknown() -> Self {
        Ty::Unknown.into()
    }

    pub fn builtin(name: &str) -> Self {
        Ty::Builtin(Ustr::from(name)).into()
    }

    pub fn pointer_to(self) -> Self {
        Ty::Pointer(Box::new(self)).into()
    }

    pub fn is_void(&self) -> bool {
        matches!(&self.ty, Ty::Builtin(b) if b.as_str() == "void")
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self.ty, Ty::Unknown)
    }

    /// Strip references; `T&` behaves like `T` for member access.
    pub fn without_reference(&self) -> &FullySpecifiedType {
        match &self.ty {
            Ty::Reference(inner) => inner.without_reference(),
            _ => self,
        }
    }

    /// Parse a written type such as `const std::vector<Foo *> &`.
    pub fn parse(text: &str) -> Self {
        let tokens = lexer::tokenize_text(text, lexer::LexState::Normal);
        let mut parser = TypeParser {
            text,
            tokens: &tokens,
            pos: 0,
        };
        parser.parse_type()
    }

    /// Render the type the way it would be written in source.
    pub fn pretty(&self) -> String {
        self.pretty_with_name("")
    }

    /// Render a declaration of `name` with this type, e.g. `Foo *name`.
    pub fn pretty_with_name(&self, name: &str) -> String {
        let mut out = String::new();
        self.write_pretty(&mut out);
        if !name.is_empty() {
            if !out.ends_with('*') && !out.ends_with('&') {
                out.push(' ');
            }
            out.push_str(name);
        }
        out
    }

    fn write_pretty(&self, out: &mut String) {
        let leading_const = !matches!(self.ty, Ty::Pointer(_));
        if self.is_const && leading_const {
            out.push_str("const ");
        }
        if self.is_volatile && leading_const {
            out.push_str("volatile ");
        }
        match &self.ty {
            Ty::Unknown => out.push('?'),
            Ty::Builtin(name) => out.push_str(name),
            Ty::Auto => out.push_str("auto"),
            Ty::Named(named) => {
                out.push_str(&named.name.to_string());
                if !named.args.is_empty() {
                    out.push('<');
                    for (i, arg) in named.args.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        arg.write_pretty(out);
                    }
                    if out.ends_with('>') {
                        out.push(' ');
                    }
                    out.push('>');
                }
            }
            Ty::Pointer(inner) => {
                inner.write_pretty(out);
                push_declarator_punct(out, '*');
                if self.is_const {
                    out.push_str(" const");
                }
            }
            Ty::Reference(inner) => {
                inner.write_pretty(out);
                push_declarator_punct(out, '&');
            }
            Ty::Array(inner) => {
                inner.write_pretty(out);
                out.push_str("[]");
            }
            Ty::Symbol(_) => out.push('?'),
        }
    }
}

fn push_declarator_punct(out: &mut String, punct: char) {
    if !out.ends_with('*') && !out.ends_with('&') {
        out.push(' ');
    }
    out.push(punct);
}

const BUILTIN_WORDS: &[&str] = &[
    "bool", "char", "char16_t", "char32_t", "char8_t", "double", "float", "int", "long", "short",
    "signed", "unsigned", "void", "wchar_t",
];

const IGNORED_TYPE_WORDS: &[&str] = &[
    "class",
    "constexpr",
    "enum",
    "explicit",
    "extern",
    "inline",
    "mutable",
    "register",
    "static",
    "struct",
    "typename",
    "union",
    "virtual",
];

struct TypeParser<'a> {
    text: &'a str,
    tokens: &'a [lexer::Token],
    pos: usize,
}

impl TypeParser<'_> {
    fn peek(&self) -> Option<lexer::Token> {
        self.tokens.get(self.pos).copied()
    }

    fn peek_text(&self) -> &str {
        self.peek().map(|t| t.text(self.text)).unwrap_or("")
    }

    fn parse_type(&mut self) -> FullySpecifiedType {
        let mut is_const = false;
        let mut is_volatile = false;
        let mut builtin: Vec<&str> = Vec::new();
        let mut named: Option<NamedType> = None;
        let mut auto = false;

        while let Some(tk) = self.peek() {
            let word = tk.text(self.text);
            match tk.kind {
                TokenKind::Keyword | TokenKind::Identifier
                    if word == "const" || word == "volatile" =>
                {
                    if word == "const" {
                        is_const = true;
                    } else {
                        is_volatile = true;
                    }
                    self.pos += 1;
                }
                TokenKind::Keyword if IGNORED_TYPE_WORDS.contains(&word) => self.pos += 1,
                TokenKind::Keyword if word == "auto" => {
                    auto = true;
                    self.pos += 1;
                }
                TokenKind::Keyword if BUILTIN_WORDS.contains(&word) && named.is_none() => {
                    builtin.push(word);
                    self.pos += 1;
                }
                TokenKind::Identifier | TokenKind::ColonColon
                    if named.is_none() && builtin.is_empty() && !auto =>
                {
                    named = Some(self.parse_named());
                }
                _ => break,
            }
        }

        let base = if auto {
            Ty::Auto
        } else if let Some(named) = named {
            Ty::Named(named)
        } else if !builtin.is_empty() {
            Ty::Builtin(Ustr::from(&builtin.join(" ")))
        } else {
            Ty::Unknown
        };
        let mut fst = FullySpecifiedType {
            ty: base,
            is_const,
            is_volatile,
        };

        // Declarator punctuation and trailing cv-qualifiers.
        while let Some(tk) = self.peek() {
            match tk.kind {
                TokenKind::Star => {
                    fst = fst.pointer_to();
                    self.pos += 1;
                }
                TokenKind::Amper => {
                    fst = Ty::Reference(Box::new(fst)).into();
                    self.pos += 1;
                }
                TokenKind::Operator if self.peek_text() == "&&" => {
                    fst = Ty::Reference(Box::new(fst)).into();
                    self.pos += 1;
                }
                TokenKind::LBracket => {
                    while let Some(t) = self.peek() {
                        self.pos += 1;
                        if t.kind == TokenKind::RBracket {
                            break;
                        }
                    }
                    fst = Ty::Array(Box::new(fst)).into();
                }
                TokenKind::Keyword if self.peek_text() == "const" => {
                    fst.is_const = true;
                    self.pos += 1;
                }
                TokenKind::Keyword if self.peek_text() == "volatile" => {
                    fst.is_volatile = true;
                    self.pos += 1;
                }
                _ => break,
            }
        }
        fst
    }

    fn parse_named(&mut self) -> NamedType {
        let mut name = QualifiedName::default();
        let mut args = Vec::new();
        if self.peek().is_some_and(|t| t.kind == TokenKind::ColonColon) {
            name.global = true;
            self.pos += 1;
        }
        while let Some(tk) = self.peek() {
            if tk.kind != TokenKind::Identifier {
                break;
            }
            name.segments.push(Ustr::from(tk.text(self.text)));
            self.pos += 1;
            args = if self.peek().is_some_and(|t| t.kind == TokenKind::Less) {
                self.pos += 1;
                self.parse_template_args()
            } else {
                Vec::new()
            };
            if self.peek().is_some_and(|t| t.kind == TokenKind::ColonColon) {
                self.pos += 1;
            } else {
                break;
            }
        }
        NamedType { name, args }
    }

    /// Parse comma-separated template arguments up to the closing `>`.
    fn parse_template_args(&mut self) -> Vec<FullySpecifiedType> {
        let mut args = Vec::new();
        loop {
            let start = self.pos;
            let arg = self.parse_type();
            // Skip anything the type grammar did not consume (non-type
            // arguments such as `3`).
            let mut depth = 0usize;
            while let Some(tk) = self.peek() {
                match tk.kind {
                    TokenKind::Less => depth += 1,
                    TokenKind::Greater if depth > 0 => depth -= 1,
                    TokenKind::Greater | TokenKind::Comma if depth == 0 => break,
                    TokenKind::Operator if depth == 0 && self.peek_text() == ">>" => break,
                    _ => {}
                }
                self.pos += 1;
            }
            if self.pos > start {
                args.push(arg);
            }
            match self.peek() {
                Some(tk) if tk.kind == TokenKind::Comma => self.pos += 1,
                Some(tk) if tk.kind == TokenKind::Greater => {
                    self.pos += 1;
                    break;
                }
                // `>>` closes this list and the enclosing one.
                Some(tk) if tk.kind == TokenKind::Operator && self.peek_text() == ">>" => {
                    self.pos += 1;
                    break;
                }
                _ => break,
            }
        }
        args
    }
}

/// Split `text` on `sep` at template-angle depth zero.
pub fn split_top_level<'a>(text: &'a str, sep: &str) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut last = 0;
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'<' | b'(' | b'[' => depth += 1,
            b'>' | b')' | b']' => depth -= 1,
            _ => {}
        }
        if depth == 0 && text[i..].starts_with(sep) {
            parts.push(&text[last..i]);
            i += sep.len();
            last = i;
            continue;
        }
        i += 1;
    }
    parts.push(&text[last..]);
    parts
}

fn strip_template_args(segment: &str) -> &str {
    match segment.find('<') {
        Some(idx) if !segment.starts_with("operator") => &segment[..idx],
        _ => segment,
    }
}

// ─── Symbols ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKey {
    Class,
    Struct,
    Union,
}

/// Qt meta-object role of a member function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QtMethodKind {
    #[default]
    None,
    Signal,
    Slot,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Option<Ustr>,
    pub ty: FullySpecifiedType,
    pub default_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassInfo {
    pub key: ClassKey,
    /// `None` for a forward declaration.
    pub body: Option<ScopeId>,
    pub bases: Vec<NamedType>,
    pub template_params: Vec<Ustr>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FunctionInfo {
    /// `None` for constructors, destructors and conversion operators.
    pub return_type: Option<FullySpecifiedType>,
    pub params: Vec<Param>,
    pub is_variadic: bool,
    pub is_const: bool,
    pub is_volatile: bool,
    pub is_virtual: bool,
    pub is_pure: bool,
    pub is_destructor: bool,
    /// The declaration only parsed with syntax errors around it.
    pub is_ambiguous: bool,
    pub qt: QtMethodKind,
    /// Qualifier of an out-of-line definition, e.g. `Foo` in `Foo::bar`.
    pub qualifier: Option<QualifiedName>,
    /// Scope holding the parameters; only present for definitions.
    pub scope: Option<ScopeId>,
    pub template_params: Vec<Ustr>,
}

impl FunctionInfo {
    pub fn has_arguments(&self) -> bool {
        !self.params.is_empty() || self.is_variadic
    }

    pub fn is_void_return(&self) -> bool {
        self.return_type.as_ref().is_some_and(|t| t.is_void())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SymbolKind {
    Namespace {
        body: ScopeId,
    },
    Class(ClassInfo),
    Function(FunctionInfo),
    Variable {
        ty: FullySpecifiedType,
        initializer: Option<String>,
    },
    Parameter {
        ty: FullySpecifiedType,
        default_value: Option<String>,
    },
    Typedef {
        ty: FullySpecifiedType,
    },
    Enum {
        body: ScopeId,
        scoped: bool,
    },
    Enumerator,
    UsingDirective {
        target: QualifiedName,
    },
    UsingDeclaration {
        target: QualifiedName,
    },
    NamespaceAlias {
        target: QualifiedName,
    },
    TemplateParameter,
    Friend,
    /// `Q_PROPERTY(type name ...)` pseudo declaration.
    QtProperty,
    /// `Q_ENUM(name)` / `Q_ENUMS(...)` pseudo declaration.
    QtEnum,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    /// `None` for anonymous aggregates and using directives.
    pub name: Option<Ustr>,
    pub kind: SymbolKind,
    /// The scope this symbol is declared in.
    pub scope: ScopeId,
    pub line: u32,
    pub column: u32,
    pub visibility: Visibility,
    pub is_static: bool,
}

impl Symbol {
    pub fn name_str(&self) -> &str {
        self.name.as_ref().map(|n| n.as_str()).unwrap_or("")
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.name.is_some_and(|n| n.as_str() == name)
    }

    pub fn as_function(&self) -> Option<&FunctionInfo> {
        match &self.kind {
            SymbolKind::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&ClassInfo> {
        match &self.kind {
            SymbolKind::Class(c) => Some(c),
            _ => None,
        }
    }

    /// Symbols that name a type (and may appear before `::`).
    pub fn is_type_like(&self) -> bool {
        matches!(
            self.kind,
            SymbolKind::Class(_)
                | SymbolKind::Typedef { .. }
                | SymbolKind::Enum { .. }
                | SymbolKind::Namespace { .. }
                | SymbolKind::NamespaceAlias { .. }
                | SymbolKind::TemplateParameter
        )
    }

    /// Whether this is an out-of-line definition such as `Foo::bar`.
    pub fn has_qualified_name(&self) -> bool {
        self.as_function()
            .is_some_and(|f| f.qualifier.as_ref().is_some_and(|q| !q.is_empty()))
    }

    /// The value type of a variable or parameter.
    pub fn value_type(&self) -> Option<&FullySpecifiedType> {
        match &self.kind {
            SymbolKind::Variable { ty, .. } | SymbolKind::Parameter { ty, .. } => Some(ty),
            _ => None,
        }
    }
}

// ─── Scopes ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Namespace,
    Class,
    Enum,
    Function,
    Block,
}

/// A (line, byte column) source coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Point {
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    /// The class, namespace, enum or function symbol owning this scope.
    pub owner: Option<SymbolId>,
    pub members: Vec<SymbolId>,
    pub start: Point,
    pub end: Point,
    pub start_byte: usize,
    pub end_byte: usize,
}

impl Scope {
    /// Strict containment: a cursor sitting exactly on the opening or
    /// closing brace is outside.
    pub fn contains(&self, point: Point) -> bool {
        self.start < point && point < self.end
    }
}
