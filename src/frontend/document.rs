/// A parsed translation unit: symbol arena, scope tree, macros and
/// include directives.
use std::path::{Path, PathBuf};

use ustr::Ustr;

use super::symbols::{Point, Scope, ScopeId, ScopeKind, Symbol, SymbolId};

/// Source language, derived from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    C,
    Cpp,
    ObjC,
    ObjCpp,
}

impl Language {
    pub fn from_path(path: &Path) -> Self {
        // `.C` is a C++ extension, so no case folding.
        match path.extension().and_then(|e| e.to_str()) {
            Some("c") => Language::C,
            Some("m") => Language::ObjC,
            Some("mm") => Language::ObjCpp,
            _ => Language::Cpp,
        }
    }

    pub fn is_objc(self) -> bool {
        matches!(self, Language::ObjC | Language::ObjCpp)
    }
}

/// A `#define`.
#[derive(Debug, Clone, PartialEq)]
pub struct Macro {
    pub name: Ustr,
    /// Parameter names for function-like macros.
    pub params: Option<Vec<String>>,
    pub line: u32,
}

/// Whether an include names a header with quotes or angle brackets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeKind {
    Local,
    System,
}

/// An `#include` (or `#include_next` / `#import`) directive.
#[derive(Debug, Clone, PartialEq)]
pub struct Include {
    pub path: String,
    pub kind: IncludeKind,
    pub line: u32,
}

#[derive(Debug, Clone)]
pub struct Document {
    path: PathBuf,
    language: Language,
    pub(crate) symbols: Vec<Symbol>,
    pub(crate) scopes: Vec<Scope>,
    pub(crate) macros: Vec<Macro>,
    pub(crate) includes: Vec<Include>,
}

impl Document {
    /// An empty document whose global scope spans `end`.
    pub(crate) fn new(path: PathBuf, end: Point, end_byte: usize) -> Self {
        let language = Language::from_path(&path);
        Self {
            path,
            language,
            symbols: Vec::new(),
            scopes: vec![Scope {
                kind: ScopeKind::Global,
                parent: None,
                owner: None,
                members: Vec::new(),
                start: Point::default(),
                end,
                start_byte: 0,
                end_byte,
            }],
            macros: Vec::new(),
            includes: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    pub fn macros(&self) -> &[Macro] {
        &self.macros
    }

    pub fn includes(&self) -> &[Include] {
        &self.includes
    }

    /// Members of `scope` in declaration order.
    pub fn members(&self, scope: ScopeId) -> impl Iterator<Item = (SymbolId, &Symbol)> + '_ {
        self.scope(scope)
            .members
            .iter()
            .map(move |&id| (id, self.symbol(id)))
    }

    /// The innermost scope containing `(line, column)`.
    ///
    /// Scopes are created parent-first, so among all containing scopes the
    /// one created last is the innermost.
    pub fn scope_at(&self, line: u32, column: u32) -> ScopeId {
        let point = Point { line, column };
        let mut best = ScopeId::GLOBAL;
        for (idx, scope) in self.scopes.iter().enumerate().skip(1) {
            if scope.contains(point) {
                best = ScopeId(idx as u32);
            }
        }
        best
    }

    /// Iterate the scope chain from `scope` outward to the global scope.
    pub fn scope_chain(&self, scope: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(scope), move |&id| self.scope(id).parent)
    }

    // ─── Builder operations ─────────────────────────────────────────────

    pub(crate) fn add_scope(&mut self, scope: Scope) -> ScopeId {
        self.scopes.push(scope);
        ScopeId(self.scopes.len() as u32 - 1)
    }

    pub(crate) fn add_symbol(&mut self, symbol: Symbol) -> SymbolId {
        let scope = symbol.scope;
        self.symbols.push(symbol);
        let id = SymbolId(self.symbols.len() as u32 - 1);
        self.scopes[scope.0 as usize].members.push(id);
        id
    }

    pub(crate) fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.0 as usize]
    }

    pub(crate) fn set_scope_owner(&mut self, scope: ScopeId, owner: SymbolId) {
        self.scopes[scope.0 as usize].owner = Some(owner);
    }
}
