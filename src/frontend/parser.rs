/// C++ document extraction.
///
/// This module turns source text into a [`Document`] using tree-sitter's
/// C++ grammar.  The syntax tree is walked once; every class, namespace,
/// function, enum and block becomes a [`Scope`] with its source range,
/// and every declaration becomes a [`Symbol`] in its enclosing scope.
///
/// Qt dialect constructs are masked before parsing (see
/// [`super::qt`]) so that byte offsets in the tree equal byte offsets in
/// the editor buffer.
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use tree_sitter::{Node, Parser};
use ustr::Ustr;

use super::document::{Document, Include, IncludeKind, Macro};
use super::qt::{self, PseudoKind, QtAnnotations};
use super::symbols::{
    ClassInfo, ClassKey, FullySpecifiedType, FunctionInfo, NamedType, Param, Point,
    QtMethodKind, QualifiedName, Scope, ScopeId, ScopeKind, Symbol, SymbolId, SymbolKind, Ty,
    Visibility,
};

/// Options affecting how a document is read.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    /// Treat `signals`, `slots` and `emit` as Qt keywords.
    pub qt_keywords: bool,
}

/// Parse `source` into a document.
///
/// The tree-sitter grammar is error tolerant, so incomplete code still
/// produces a useful symbol table.  A panic inside extraction is caught and
/// logged, yielding an empty document rather than taking the server down.
pub fn parse_document(path: &Path, source: &str, options: ParseOptions) -> Document {
    let (masked, notes) = qt::mask_qt_dialect(source, options.qt_keywords);
    let result = panic::catch_unwind(AssertUnwindSafe(|| extract(path, &masked, &notes)));
    match result {
        Ok(Some(doc)) => doc,
        Ok(None) => {
            tracing::warn!("cppcomplete: tree-sitter produced no tree for {}", path.display());
            empty_document(path, source)
        }
        Err(_) => {
            tracing::error!(
                "cppcomplete: parser panicked while extracting {}",
                path.display()
            );
            empty_document(path, source)
        }
    }
}

fn empty_document(path: &Path, source: &str) -> Document {
    let (line, column) = crate::util::line_and_column(source, source.len());
    Document::new(path.to_path_buf(), Point { line, column }, source.len())
}

/// Whether `text` parses cleanly as one declaration of a function that is
/// not a destructor, e.g. `void draw(int x);`.
pub fn is_function_declaration(text: &str) -> bool {
    let mut parser = Parser::new();
    let language: tree_sitter::Language = tree_sitter_cpp::LANGUAGE.into();
    if parser.set_language(&language).is_err() {
        return false;
    }
    let Some(tree) = parser.parse(text, None) else {
        return false;
    };
    let root = tree.root_node();
    if root.has_error() || root.named_child_count() != 1 {
        return false;
    }
    let Some(decl) = root.named_child(0) else {
        return false;
    };
    if !matches!(decl.kind(), "declaration" | "field_declaration") {
        return false;
    }
    let mut declarator = decl.child_by_field_name("declarator");
    while let Some(d) = declarator {
        match d.kind() {
            "pointer_declarator" => declarator = d.child_by_field_name("declarator"),
            "reference_declarator" => {
                declarator = d.named_child(d.named_child_count().saturating_sub(1) as u32);
            }
            _ => break,
        }
    }
    let Some(function) = declarator.filter(|d| d.kind() == "function_declarator") else {
        return false;
    };
    match function.child_by_field_name("declarator") {
        Some(name) if name.kind() == "destructor_name" => false,
        Some(name) if name.kind() == "qualified_identifier" => !name
            .child_by_field_name("name")
            .is_some_and(|n| n.kind() == "destructor_name"),
        Some(_) => true,
        None => false,
    }
}

fn extract(path: &Path, source: &str, notes: &QtAnnotations) -> Option<Document> {
    let mut parser = Parser::new();
    let language: tree_sitter::Language = tree_sitter_cpp::LANGUAGE.into();
    parser.set_language(&language).ok()?;
    let tree = parser.parse(source, None)?;
    let root = tree.root_node();

    // The global scope extends one column past the end so a cursor at the
    // very end of the buffer is still inside it.
    let mut end = point_of(root.end_position());
    end.column += 1;
    let doc = Document::new(path.to_path_buf(), end, source.len());

    let mut extractor = Extractor {
        src: source,
        doc,
        notes,
    };
    let mut ctx = MemberContext::new(Visibility::Public);
    extractor.declarations(root, ScopeId::GLOBAL, &mut ctx);
    extractor.attach_pseudo_decls();
    Some(extractor.doc)
}

fn point_of(p: tree_sitter::Point) -> Point {
    Point {
        line: p.row as u32,
        column: p.column as u32,
    }
}

/// Per-scope state while walking a declaration list.
#[derive(Debug, Clone)]
struct MemberContext {
    visibility: Visibility,
    qt: QtMethodKind,
    /// Parameters of an enclosing `template<...>`, consumed by the next
    /// class or function.
    template_params: Vec<Ustr>,
}

impl MemberContext {
    fn new(visibility: Visibility) -> Self {
        Self {
            visibility,
            qt: QtMethodKind::None,
            template_params: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wrapper {
    Pointer,
    Reference,
    Array,
}

/// A declarator with its wrapping peeled off.
#[derive(Default)]
struct Declarator<'t> {
    name: Option<Node<'t>>,
    /// Outermost first.
    wrappers: Vec<Wrapper>,
    /// The function declarator (or abstract one for conversion operators).
    function: Option<Node<'t>>,
    initializer: Option<Node<'t>>,
}

struct Extractor<'a> {
    src: &'a str,
    doc: Document,
    notes: &'a QtAnnotations,
}

impl<'a> Extractor<'a> {
    fn text(&self, node: Node) -> &'a str {
        node.utf8_text(self.src.as_bytes()).unwrap_or("")
    }

    fn new_scope(&mut self, kind: ScopeKind, parent: ScopeId, range: Node) -> ScopeId {
        let (end, end_byte) = scope_end(range);
        self.doc.add_scope(Scope {
            kind,
            parent: Some(parent),
            owner: None,
            members: Vec::new(),
            start: point_of(range.start_position()),
            end,
            start_byte: range.start_byte(),
            end_byte,
        })
    }

    fn add(
        &mut self,
        scope: ScopeId,
        name: Option<Ustr>,
        kind: SymbolKind,
        at: Node,
        ctx: &MemberContext,
    ) -> SymbolId {
        let pos = at.start_position();
        self.doc.add_symbol(Symbol {
            name,
            kind,
            scope,
            line: pos.row as u32,
            column: pos.column as u32,
            visibility: ctx.visibility,
            is_static: false,
        })
    }

    // ─── Declaration lists ──────────────────────────────────────────────

    fn declarations(&mut self, node: Node, scope: ScopeId, ctx: &mut MemberContext) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.declaration(child, scope, ctx);
        }
    }

    fn declaration(&mut self, node: Node, scope: ScopeId, ctx: &mut MemberContext) {
        match node.kind() {
            "namespace_definition" => self.namespace(node, scope),
            "class_specifier" | "struct_specifier" | "union_specifier" => {
                self.class(node, scope, ctx);
            }
            "enum_specifier" => {
                self.enumeration(node, scope, ctx);
            }
            "function_definition" => self.function_definition(node, scope, ctx),
            "declaration" | "field_declaration" => self.simple_declaration(node, scope, ctx),
            "template_declaration" => self.template(node, scope, ctx),
            "type_definition" => self.typedef(node, scope, ctx),
            "alias_declaration" => self.alias(node, scope, ctx),
            "using_declaration" => self.using(node, scope, ctx),
            "namespace_alias_definition" => self.namespace_alias(node, scope, ctx),
            "friend_declaration" => self.friend(node, scope, ctx),
            "access_specifier" => {
                ctx.visibility = match self.text(node).trim() {
                    "public" => Visibility::Public,
                    "protected" => Visibility::Protected,
                    _ => Visibility::Private,
                };
                ctx.qt = self.notes.section_at(node.start_byte());
            }
            "preproc_def" | "preproc_function_def" => self.define(node),
            "preproc_include" => self.include(node),
            "preproc_call" => self.preproc_call(node),
            "preproc_if" | "preproc_ifdef" | "preproc_else" | "preproc_elif"
            | "preproc_elifdef" | "declaration_list" | "ERROR" => {
                self.declarations(node, scope, ctx);
            }
            "linkage_specification" => {
                if let Some(body) = node.child_by_field_name("body") {
                    if body.kind() == "declaration_list" {
                        self.declarations(body, scope, ctx);
                    } else {
                        self.declaration(body, scope, ctx);
                    }
                }
            }
            _ => {}
        }
    }

    fn namespace(&mut self, node: Node, scope: ScopeId) {
        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        let names: Vec<Ustr> = match node.child_by_field_name("name") {
            Some(name) => QualifiedName::parse(self.text(name)).segments,
            None => Vec::new(),
        };
        let ctx = MemberContext::new(Visibility::Public);

        // `namespace a::b { }` opens one scope per segment, all spanning
        // the body.
        let mut parent = scope;
        let segments: Vec<Option<Ustr>> = if names.is_empty() {
            vec![None]
        } else {
            names.into_iter().map(Some).collect()
        };
        for name in segments {
            let ns_scope = self.new_scope(ScopeKind::Namespace, parent, body);
            let anchor = node.child_by_field_name("name").unwrap_or(node);
            let sym = self.add(
                parent,
                name,
                SymbolKind::Namespace { body: ns_scope },
                anchor,
                &ctx,
            );
            self.doc.set_scope_owner(ns_scope, sym);
            parent = ns_scope;
        }
        let mut inner = MemberContext::new(Visibility::Public);
        self.declarations(body, parent, &mut inner);
    }

    /// Declare a class.  Returns the class symbol.
    fn class(&mut self, node: Node, scope: ScopeId, ctx: &mut MemberContext) -> SymbolId {
        let key = match node.kind() {
            "struct_specifier" => ClassKey::Struct,
            "union_specifier" => ClassKey::Union,
            _ => ClassKey::Class,
        };
        let name_node = node.child_by_field_name("name");
        let name = name_node.and_then(|n| {
            let n = if n.kind() == "template_type" {
                n.child_by_field_name("name").unwrap_or(n)
            } else {
                n
            };
            QualifiedName::parse(self.text(n)).last()
        });
        let template_params = std::mem::take(&mut ctx.template_params);
        let bases = self.base_classes(node);
        let anchor = name_node.unwrap_or(node);

        let Some(body) = node.child_by_field_name("body") else {
            let info = ClassInfo {
                key,
                body: None,
                bases,
                template_params,
            };
            return self.add(scope, name, SymbolKind::Class(info), anchor, ctx);
        };

        let class_scope = self.new_scope(ScopeKind::Class, scope, body);
        let info = ClassInfo {
            key,
            body: Some(class_scope),
            bases,
            template_params,
        };
        let sym = self.add(scope, name, SymbolKind::Class(info), anchor, ctx);
        self.doc.set_scope_owner(class_scope, sym);

        let default_visibility = if key == ClassKey::Class {
            Visibility::Private
        } else {
            Visibility::Public
        };
        let mut members = MemberContext::new(default_visibility);
        self.declarations(body, class_scope, &mut members);
        sym
    }

    fn base_classes(&self, class: Node) -> Vec<NamedType> {
        let mut bases = Vec::new();
        let mut cursor = class.walk();
        for child in class.children(&mut cursor) {
            if child.kind() != "base_class_clause" {
                continue;
            }
            let mut inner = child.walk();
            for base in child.named_children(&mut inner) {
                let type_node = if base.kind() == "base_class_specifier" {
                    let mut c = base.walk();
                    base.named_children(&mut c).find(|n| is_type_name_node(n.kind()))
                } else if is_type_name_node(base.kind()) {
                    Some(base)
                } else {
                    None
                };
                if let Some(type_node) = type_node
                    && let Ty::Named(named) = FullySpecifiedType::parse(self.text(type_node)).ty
                {
                    bases.push(named);
                }
            }
        }
        bases
    }

    fn enumeration(&mut self, node: Node, scope: ScopeId, ctx: &MemberContext) -> SymbolId {
        let name_node = node.child_by_field_name("name");
        let name = name_node.and_then(|n| QualifiedName::parse(self.text(n)).last());
        let mut cursor = node.walk();
        let scoped = node
            .children(&mut cursor)
            .any(|c| matches!(c.kind(), "class" | "struct"));
        let anchor = name_node.unwrap_or(node);

        let body_node = node.child_by_field_name("body");
        let range = body_node.unwrap_or(node);
        let enum_scope = self.new_scope(ScopeKind::Enum, scope, range);
        let sym = self.add(
            scope,
            name,
            SymbolKind::Enum {
                body: enum_scope,
                scoped,
            },
            anchor,
            ctx,
        );
        self.doc.set_scope_owner(enum_scope, sym);

        if let Some(body) = body_node {
            let public = MemberContext::new(Visibility::Public);
            let mut c = body.walk();
            for enumerator in body.named_children(&mut c) {
                if enumerator.kind() != "enumerator" {
                    continue;
                }
                if let Some(n) = enumerator.child_by_field_name("name") {
                    let name = Ustr::from(self.text(n));
                    self.add(enum_scope, Some(name), SymbolKind::Enumerator, n, &public);
                }
            }
        }
        sym
    }

    fn template(&mut self, node: Node, scope: ScopeId, ctx: &mut MemberContext) {
        let mut params = Vec::new();
        if let Some(list) = node.child_by_field_name("parameters") {
            let mut cursor = list.walk();
            for param in list.named_children(&mut cursor) {
                let name = match param.kind() {
                    "optional_type_parameter_declaration" => param.child_by_field_name("name"),
                    "type_parameter_declaration" | "variadic_type_parameter_declaration" => {
                        let mut c = param.walk();
                        param
                            .named_children(&mut c)
                            .find(|n| n.kind() == "type_identifier")
                    }
                    "parameter_declaration" | "optional_parameter_declaration" => param
                        .child_by_field_name("declarator")
                        .and_then(|d| unwrap_declarator(d).name),
                    _ => None,
                };
                if let Some(name) = name {
                    params.push(Ustr::from(self.text(name)));
                }
            }
        }

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() == "template_parameter_list" {
                continue;
            }
            ctx.template_params = params.clone();
            self.declaration(child, scope, ctx);
        }
        ctx.template_params.clear();
    }

    // ─── Simple declarations ────────────────────────────────────────────

    /// The declared base type of a declaration node: its `type` field plus
    /// any leading cv-qualifiers.
    fn base_type(&self, node: Node) -> FullySpecifiedType {
        let mut fst = match node.child_by_field_name("type") {
            Some(t) => FullySpecifiedType::parse(self.text(t)),
            None => FullySpecifiedType::unknown(),
        };
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "type_qualifier" {
                match self.text(child).trim() {
                    "const" => fst.is_const = true,
                    "volatile" => fst.is_volatile = true,
                    _ => {}
                }
            }
        }
        fst
    }

    fn has_modifier(&self, node: Node, word: &str) -> bool {
        let mut cursor = node.walk();
        node.children(&mut cursor).any(|c| {
            (c.kind() == word)
                || (matches!(c.kind(), "storage_class_specifier" | "virtual_function_specifier")
                    && self.text(c).trim() == word)
        })
    }

    fn simple_declaration(&mut self, node: Node, scope: ScopeId, ctx: &mut MemberContext) {
        let mut base = self.base_type(node);

        // An inline class or enum definition: `struct P { int x; } p;`
        if let Some(type_node) = node.child_by_field_name("type") {
            let defines = type_node.child_by_field_name("body").is_some();
            match type_node.kind() {
                "class_specifier" | "struct_specifier" | "union_specifier" if defines => {
                    let sym = self.class(type_node, scope, ctx);
                    base = self.type_of_definition(sym, base);
                }
                "enum_specifier" if defines => {
                    let sym = self.enumeration(type_node, scope, ctx);
                    base = self.type_of_definition(sym, base);
                }
                _ => {}
            }
        }

        let is_static = self.has_modifier(node, "static");
        let is_virtual = self.has_modifier(node, "virtual");
        let is_pure = node
            .child_by_field_name("default_value")
            .is_some_and(|v| self.text(v).trim() == "0")
            || {
                let mut c = node.walk();
                node.children(&mut c).any(|c| c.kind() == "pure_virtual_clause")
            };
        let default_value = node
            .child_by_field_name("default_value")
            .map(|v| self.text(v).to_string());

        let mut cursor = node.walk();
        let declarators: Vec<Node> = node
            .children_by_field_name("declarator", &mut cursor)
            .collect();
        for decl in declarators {
            let d = unwrap_declarator(decl);
            let Some(name_node) = d.name else {
                continue;
            };
            let (qualifier, name) = self.declarator_name(name_node);
            let ty = apply_wrappers(base.clone(), &d.wrappers);

            let sym = if let Some(function) = d.function {
                let mut info = self.function_info(node, &d, function, name, ty);
                info.is_virtual = is_virtual;
                info.is_pure = is_pure;
                info.qualifier = qualifier;
                info.qt = ctx.qt;
                info.template_params = ctx.template_params.clone();
                self.add(
                    scope,
                    Some(name),
                    SymbolKind::Function(info),
                    name_node,
                    ctx,
                )
            } else {
                let initializer = d
                    .initializer
                    .or_else(|| node.child_by_field_name("value"))
                    .map(|v| self.text(v).to_string())
                    .or_else(|| default_value.clone());
                self.add(
                    scope,
                    Some(name),
                    SymbolKind::Variable { ty, initializer },
                    name_node,
                    ctx,
                )
            };
            self.doc.symbol_mut(sym).is_static = is_static;
        }
        ctx.template_params.clear();
    }

    /// The type a declarator gets when its declaration defines a class or
    /// enum inline.  Anonymous definitions cannot be named, so variables of
    /// such a type stay unresolved.
    fn type_of_definition(&self, sym: SymbolId, base: FullySpecifiedType) -> FullySpecifiedType {
        match self.doc.symbol(sym).name {
            Some(name) => FullySpecifiedType {
                ty: Ty::Named(NamedType {
                    name: QualifiedName::simple(&name),
                    args: Vec::new(),
                }),
                ..base
            },
            None => FullySpecifiedType::unknown(),
        }
    }

    fn function_info(
        &self,
        decl: Node,
        d: &Declarator,
        function: Node,
        name: Ustr,
        return_type: FullySpecifiedType,
    ) -> FunctionInfo {
        let (params, is_variadic) = match function.child_by_field_name("parameters") {
            Some(list) => self.parameters(list),
            None => (Vec::new(), false),
        };
        let mut is_const = false;
        let mut is_volatile = false;
        let mut cursor = function.walk();
        for child in function.children(&mut cursor) {
            if child.kind() == "type_qualifier" {
                match self.text(child).trim() {
                    "const" => is_const = true,
                    "volatile" => is_volatile = true,
                    _ => {}
                }
            }
        }
        let is_destructor = name.starts_with('~');
        let is_conversion = d.name.is_some_and(|n| n.kind() == "operator_cast");
        let return_type = if decl.child_by_field_name("type").is_none()
            || is_destructor
            || is_conversion
        {
            None
        } else {
            Some(return_type)
        };
        FunctionInfo {
            return_type,
            params,
            is_variadic,
            is_const,
            is_volatile,
            is_destructor,
            is_ambiguous: decl.has_error(),
            ..FunctionInfo::default()
        }
    }

    fn parameters(&self, list: Node) -> (Vec<Param>, bool) {
        let mut params = Vec::new();
        let mut variadic = false;
        let mut cursor = list.walk();
        for child in list.children(&mut cursor) {
            match child.kind() {
                "..." => variadic = true,
                "parameter_declaration"
                | "optional_parameter_declaration"
                | "variadic_parameter_declaration" => {
                    let base = self.base_type(child);
                    let d = child
                        .child_by_field_name("declarator")
                        .map(unwrap_declarator)
                        .unwrap_or_default();
                    let name = d.name.map(|n| Ustr::from(self.text(n)));
                    if name.is_none() && d.wrappers.is_empty() && base.is_void() {
                        continue;
                    }
                    params.push(Param {
                        name,
                        ty: apply_wrappers(base, &d.wrappers),
                        default_value: child
                            .child_by_field_name("default_value")
                            .map(|v| self.text(v).to_string()),
                    });
                }
                _ => {}
            }
        }
        (params, variadic)
    }

    /// Split a declarator name into its qualifier and unqualified name.
    fn declarator_name(&self, node: Node) -> (Option<QualifiedName>, Ustr) {
        match node.kind() {
            "qualified_identifier" => {
                let mut qn = QualifiedName::parse(self.text(node));
                let name = qn.segments.pop().unwrap_or_default();
                (Some(qn), Ustr::from(&normalize_operator_name(&name)))
            }
            "destructor_name" => {
                let compact: String = self.text(node).split_whitespace().collect();
                (None, Ustr::from(&compact))
            }
            "operator_name" => (None, Ustr::from(&normalize_operator_name(self.text(node)))),
            "operator_cast" => {
                let ty = node
                    .child_by_field_name("type")
                    .map(|t| self.text(t))
                    .unwrap_or("");
                (None, Ustr::from(&format!("operator {}", ty.trim())))
            }
            "template_function" | "template_type" => {
                let name = node.child_by_field_name("name").unwrap_or(node);
                (None, Ustr::from(self.text(name)))
            }
            _ => (None, Ustr::from(self.text(node).trim())),
        }
    }

    fn function_definition(&mut self, node: Node, scope: ScopeId, ctx: &mut MemberContext) {
        let Some(declarator) = node.child_by_field_name("declarator") else {
            return;
        };
        let d = unwrap_declarator(declarator);
        let (Some(name_node), Some(function)) = (d.name, d.function) else {
            return;
        };
        let (qualifier, name) = self.declarator_name(name_node);
        let base = self.base_type(node);
        let ret = apply_wrappers(base, &d.wrappers);
        let template_params = std::mem::take(&mut ctx.template_params);

        let mut info = self.function_info(node, &d, function, name, ret);
        info.is_virtual = self.has_modifier(node, "virtual");
        info.qualifier = qualifier;
        info.qt = ctx.qt;
        info.template_params = template_params.clone();

        // The function scope starts at the parameter list so that default
        // arguments and the body see the parameters.
        let params_node = function.child_by_field_name("parameters").unwrap_or(function);
        let (end, end_byte) = scope_end(node);
        let fn_scope = self.doc.add_scope(Scope {
            kind: ScopeKind::Function,
            parent: Some(scope),
            owner: None,
            members: Vec::new(),
            start: point_of(params_node.start_position()),
            end,
            start_byte: params_node.start_byte(),
            end_byte,
        });
        info.scope = Some(fn_scope);
        let params = info.params.clone();
        let is_static = self.has_modifier(node, "static");
        let sym = self.add(scope, Some(name), SymbolKind::Function(info), name_node, ctx);
        self.doc.symbol_mut(sym).is_static = is_static;
        self.doc.set_scope_owner(fn_scope, sym);

        let local = MemberContext::new(Visibility::Public);
        for param in params {
            if let Some(param_name) = param.name {
                self.add(
                    fn_scope,
                    Some(param_name),
                    SymbolKind::Parameter {
                        ty: param.ty,
                        default_value: param.default_value,
                    },
                    params_node,
                    &local,
                );
            }
        }
        for t in template_params {
            self.add(fn_scope, Some(t), SymbolKind::TemplateParameter, node, &local);
        }

        if let Some(body) = node.child_by_field_name("body")
            && body.kind() == "compound_statement"
        {
            self.block(body, fn_scope);
        }
    }

    fn typedef(&mut self, node: Node, scope: ScopeId, ctx: &mut MemberContext) {
        let mut base = self.base_type(node);
        let mut cursor = node.walk();
        let declarators: Vec<Node> = node
            .children_by_field_name("declarator", &mut cursor)
            .collect();

        if let Some(type_node) = node.child_by_field_name("type")
            && type_node.child_by_field_name("body").is_some()
        {
            let sym = match type_node.kind() {
                "class_specifier" | "struct_specifier" | "union_specifier" => {
                    Some(self.class(type_node, scope, ctx))
                }
                "enum_specifier" => Some(self.enumeration(type_node, scope, ctx)),
                _ => None,
            };
            if let Some(sym) = sym {
                // `typedef struct { ... } Name;` names the anonymous struct.
                if self.doc.symbol(sym).name.is_none()
                    && let [only] = declarators.as_slice()
                    && only.kind() == "type_identifier"
                {
                    let name = Ustr::from(self.text(*only));
                    self.doc.symbol_mut(sym).name = Some(name);
                    return;
                }
                base = self.type_of_definition(sym, base);
            }
        }

        for decl in declarators {
            let d = unwrap_declarator(decl);
            if let Some(name_node) = d.name {
                let (_, name) = self.declarator_name(name_node);
                let ty = apply_wrappers(base.clone(), &d.wrappers);
                self.add(scope, Some(name), SymbolKind::Typedef { ty }, name_node, ctx);
            }
        }
    }

    fn alias(&mut self, node: Node, scope: ScopeId, ctx: &mut MemberContext) {
        let (Some(name), Some(ty)) = (
            node.child_by_field_name("name"),
            node.child_by_field_name("type"),
        ) else {
            return;
        };
        let ty = FullySpecifiedType::parse(self.text(ty));
        let name_str = Ustr::from(self.text(name));
        self.add(scope, Some(name_str), SymbolKind::Typedef { ty }, name, ctx);
        ctx.template_params.clear();
    }

    fn using(&mut self, node: Node, scope: ScopeId, ctx: &MemberContext) {
        let text = self.text(node).trim().trim_end_matches(';');
        let Some(rest) = text.strip_prefix("using") else {
            return;
        };
        let rest = rest.trim();
        if let Some(target) = rest.strip_prefix("namespace") {
            let target = QualifiedName::parse(target);
            self.add(scope, None, SymbolKind::UsingDirective { target }, node, ctx);
        } else {
            let target = QualifiedName::parse(rest.trim_start_matches("typename"));
            let name = target.last();
            self.add(scope, name, SymbolKind::UsingDeclaration { target }, node, ctx);
        }
    }

    fn namespace_alias(&mut self, node: Node, scope: ScopeId, ctx: &MemberContext) {
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };
        let mut cursor = node.walk();
        let target = node
            .named_children(&mut cursor)
            .filter(|c| c.id() != name.id())
            .last();
        if let Some(target) = target {
            let target = QualifiedName::parse(self.text(target));
            let alias = Ustr::from(self.text(name));
            self.add(
                scope,
                Some(alias),
                SymbolKind::NamespaceAlias { target },
                name,
                ctx,
            );
        }
    }

    fn friend(&mut self, node: Node, scope: ScopeId, ctx: &MemberContext) {
        let mut cursor = node.walk();
        let name = node.named_children(&mut cursor).find_map(|child| {
            if child.kind() == "declaration" || child.kind() == "function_definition" {
                let decl = child.child_by_field_name("declarator")?;
                let d = unwrap_declarator(decl);
                Some(self.declarator_name(d.name?).1)
            } else if is_type_name_node(child.kind()) {
                QualifiedName::parse(self.text(child)).last()
            } else {
                None
            }
        });
        self.add(scope, name, SymbolKind::Friend, node, ctx);
    }

    // ─── Preprocessor ───────────────────────────────────────────────────

    fn define(&mut self, node: Node) {
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };
        let params = node.child_by_field_name("parameters").map(|p| {
            let mut cursor = p.walk();
            p.named_children(&mut cursor)
                .map(|n| self.text(n).to_string())
                .collect()
        });
        self.doc.macros.push(Macro {
            name: Ustr::from(self.text(name)),
            params,
            line: name.start_position().row as u32,
        });
    }

    fn include(&mut self, node: Node) {
        let Some(path) = node.child_by_field_name("path") else {
            return;
        };
        let line = node.start_position().row as u32;
        let raw = self.text(path).trim();
        if let Some(include) = parse_header_name(raw, line) {
            self.doc.includes.push(include);
        }
    }

    /// `#import` and `#include_next` are not part of the grammar and come
    /// through as generic directives.
    fn preproc_call(&mut self, node: Node) {
        let directive = node
            .child_by_field_name("directive")
            .map(|d| self.text(d).trim())
            .unwrap_or("");
        if !matches!(directive, "#import" | "#include_next") {
            return;
        }
        let Some(argument) = node.child_by_field_name("argument") else {
            return;
        };
        let line = node.start_position().row as u32;
        if let Some(include) = parse_header_name(self.text(argument).trim(), line) {
            self.doc.includes.push(include);
        }
    }

    // ─── Function bodies ────────────────────────────────────────────────

    fn block(&mut self, body: Node, parent: ScopeId) {
        let scope = self.new_scope(ScopeKind::Block, parent, body);
        self.statements(body, scope);
    }

    fn statements(&mut self, node: Node, scope: ScopeId) {
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        for child in children {
            self.statement(child, scope);
        }
    }

    fn statement(&mut self, node: Node, scope: ScopeId) {
        let mut local = MemberContext::new(Visibility::Public);
        match node.kind() {
            "declaration" => {
                self.simple_declaration(node, scope, &mut local);
                self.lambdas(node, scope);
            }
            "type_definition" => self.typedef(node, scope, &mut local),
            "alias_declaration" => self.alias(node, scope, &mut local),
            "using_declaration" => self.using(node, scope, &local),
            "namespace_alias_definition" => self.namespace_alias(node, scope, &local),
            "class_specifier" | "struct_specifier" | "union_specifier" => {
                self.class(node, scope, &mut local);
            }
            "enum_specifier" => {
                self.enumeration(node, scope, &local);
            }
            "compound_statement" => self.block(node, scope),
            "for_statement" | "for_range_loop" | "if_statement" | "while_statement"
            | "switch_statement" | "catch_clause" => self.control(node, scope),
            "do_statement" => {
                if let Some(body) = node.child_by_field_name("body") {
                    self.statement(body, scope);
                }
            }
            "else_clause" | "case_statement" | "labeled_statement" | "try_statement"
            | "preproc_if" | "preproc_ifdef" | "preproc_else" | "preproc_elif" | "ERROR" => {
                self.statements(node, scope);
            }
            _ => self.lambdas(node, scope),
        }
    }

    /// A statement that opens its own scope for declarations in its head.
    fn control(&mut self, node: Node, scope: ScopeId) {
        let inner = self.new_scope(ScopeKind::Block, scope, node);
        let mut local = MemberContext::new(Visibility::Public);

        if node.kind() == "for_range_loop" {
            let base = self.base_type(node);
            if let Some(decl) = node.child_by_field_name("declarator") {
                let d = unwrap_declarator(decl);
                if let Some(name_node) = d.name {
                    let ty = apply_wrappers(base, &d.wrappers);
                    // Element type of the range, resolved through
                    // subscripting (arrays and containers with operator[]).
                    let initializer = node
                        .child_by_field_name("right")
                        .map(|r| format!("({})[0]", self.text(r)));
                    let name = Ustr::from(self.text(name_node));
                    self.add(
                        inner,
                        Some(name),
                        SymbolKind::Variable { ty, initializer },
                        name_node,
                        &local,
                    );
                }
            }
        }

        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        for child in children {
            match child.kind() {
                "declaration" => self.simple_declaration(child, inner, &mut local),
                "condition_clause" => {
                    let mut c = child.walk();
                    let parts: Vec<Node> = child.named_children(&mut c).collect();
                    for part in parts {
                        match part.kind() {
                            "declaration" => self.simple_declaration(part, inner, &mut local),
                            "init_statement" => {
                                let mut ic = part.walk();
                                let decls: Vec<Node> = part
                                    .named_children(&mut ic)
                                    .filter(|n| n.kind() == "declaration")
                                    .collect();
                                for decl in decls {
                                    self.simple_declaration(decl, inner, &mut local);
                                }
                            }
                            _ => self.lambdas(part, inner),
                        }
                    }
                }
                "parameter_list" => {
                    let (params, _) = self.parameters(child);
                    for param in params {
                        if let Some(name) = param.name {
                            self.add(
                                inner,
                                Some(name),
                                SymbolKind::Variable {
                                    ty: param.ty,
                                    initializer: None,
                                },
                                child,
                                &local,
                            );
                        }
                    }
                }
                _ if child.kind().ends_with("_type")
                    || child.kind().ends_with("_identifier")
                    || child.kind().ends_with("_declarator") => {}
                _ => self.statement(child, inner),
            }
        }
    }

    /// Find lambda expressions below `node` and give each one a scope with
    /// its parameters and body.
    fn lambdas(&mut self, node: Node, scope: ScopeId) {
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if current.kind() == "lambda_expression" {
                self.lambda(current, scope);
                continue;
            }
            let mut cursor = current.walk();
            let children: Vec<Node> = current.named_children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
    }

    fn lambda(&mut self, node: Node, scope: ScopeId) {
        let lambda_scope = self.new_scope(ScopeKind::Function, scope, node);
        let local = MemberContext::new(Visibility::Public);
        if let Some(declarator) = node.child_by_field_name("declarator")
            && let Some(list) = declarator.child_by_field_name("parameters")
        {
            let (params, _) = self.parameters(list);
            for param in params {
                if let Some(name) = param.name {
                    self.add(
                        lambda_scope,
                        Some(name),
                        SymbolKind::Parameter {
                            ty: param.ty,
                            default_value: param.default_value,
                        },
                        list,
                        &local,
                    );
                }
            }
        }
        if let Some(body) = node.child_by_field_name("body") {
            self.block(body, lambda_scope);
        }
    }

    // ─── Qt pseudo declarations ─────────────────────────────────────────

    fn attach_pseudo_decls(&mut self) {
        let notes = self.notes;
        for decl in &notes.pseudo_decls {
            let class_scope = (0..self.doc.scope_count())
                .map(|i| ScopeId(i as u32))
                .filter(|&id| {
                    let s = self.doc.scope(id);
                    s.kind == ScopeKind::Class
                        && s.start_byte <= decl.offset
                        && decl.offset < s.end_byte
                })
                .last();
            let Some(class_scope) = class_scope else {
                continue;
            };
            let (line, column) = crate::util::line_and_column(self.src, decl.offset);
            let kind = match decl.kind {
                PseudoKind::Property => SymbolKind::QtProperty,
                PseudoKind::Enum => SymbolKind::QtEnum,
            };
            self.doc.add_symbol(Symbol {
                name: Some(Ustr::from(&decl.name)),
                kind,
                scope: class_scope,
                line,
                column,
                visibility: Visibility::Public,
                is_static: false,
            });
        }
    }
}

/// End of a scope-forming node.  A body whose closing brace is missing
/// (the user is still typing at the end of the buffer) is extended by one
/// column so that a cursor sitting at its end is inside.
fn scope_end(node: Node) -> (Point, usize) {
    let mut end = point_of(node.end_position());
    let mut end_byte = node.end_byte();
    if is_unterminated(node) {
        end.column += 1;
        end_byte += 1;
    }
    (end, end_byte)
}

fn is_unterminated(node: Node) -> bool {
    let mut cursor = node.walk();
    let Some(last) = node.children(&mut cursor).last() else {
        return false;
    };
    last.is_missing()
        || (matches!(
            last.kind(),
            "compound_statement" | "declaration_list" | "field_declaration_list"
        ) && is_unterminated(last))
}

fn is_type_name_node(kind: &str) -> bool {
    matches!(
        kind,
        "type_identifier" | "qualified_identifier" | "template_type"
    )
}

/// Peel pointer, reference, array, init and function declarators off
/// `node`, recording the wrappers outermost first.
fn unwrap_declarator(node: Node) -> Declarator {
    let mut d = Declarator::default();
    let mut current = Some(node);
    while let Some(cur) = current {
        current = match cur.kind() {
            "init_declarator" => {
                d.initializer = cur.child_by_field_name("value");
                cur.child_by_field_name("declarator")
            }
            "pointer_declarator" | "abstract_pointer_declarator" => {
                d.wrappers.push(Wrapper::Pointer);
                cur.child_by_field_name("declarator")
            }
            "reference_declarator" | "abstract_reference_declarator" => {
                d.wrappers.push(Wrapper::Reference);
                let mut cursor = cur.walk();
                cur.named_children(&mut cursor).last()
            }
            "array_declarator" | "abstract_array_declarator" => {
                d.wrappers.push(Wrapper::Array);
                cur.child_by_field_name("declarator")
            }
            "parenthesized_declarator" | "attributed_declarator" => {
                let mut cursor = cur.walk();
                cur.named_children(&mut cursor).next()
            }
            "function_declarator" => {
                if d.function.is_none() {
                    d.function = Some(cur);
                }
                cur.child_by_field_name("declarator")
            }
            "abstract_function_declarator" => None,
            "operator_cast" => {
                d.function = cur.child_by_field_name("declarator");
                d.name = Some(cur);
                None
            }
            _ => {
                d.name = Some(cur);
                None
            }
        };
    }
    d
}

fn apply_wrappers(mut fst: FullySpecifiedType, wrappers: &[Wrapper]) -> FullySpecifiedType {
    for w in wrappers {
        fst = match w {
            Wrapper::Pointer => fst.pointer_to(),
            Wrapper::Reference => Ty::Reference(Box::new(fst)).into(),
            Wrapper::Array => Ty::Array(Box::new(fst)).into(),
        };
    }
    fst
}

/// `operator ()` → `operator()`, `operator  new` → `operator new`.
fn normalize_operator_name(text: &str) -> String {
    let Some(rest) = text.trim().strip_prefix("operator") else {
        return text.trim().to_string();
    };
    let rest = rest.trim();
    if rest.starts_with(|c: char| c.is_alphabetic() || c == '_') {
        format!(
            "operator {}",
            rest.split_whitespace().collect::<Vec<_>>().join(" ")
        )
    } else {
        let compact: String = rest.split_whitespace().collect();
        format!("operator{}", compact)
    }
}

fn parse_header_name(raw: &str, line: u32) -> Option<Include> {
    if let Some(inner) = raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
        return Some(Include {
            path: inner.to_string(),
            kind: IncludeKind::Local,
            line,
        });
    }
    if let Some(inner) = raw.strip_prefix('<').and_then(|r| r.strip_suffix('>')) {
        return Some(Include {
            path: inner.to_string(),
            kind: IncludeKind::System,
            line,
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Document {
        parse_document(
            Path::new("/test/unit.cpp"),
            src,
            ParseOptions { qt_keywords: true },
        )
    }

    fn names_in(doc: &Document, scope: ScopeId) -> Vec<String> {
        doc.members(scope)
            .map(|(_, s)| s.name_str().to_string())
            .collect()
    }

    #[test]
    fn test_normalize_operator_name() {
        assert_eq!(normalize_operator_name("operator ()"), "operator()");
        assert_eq!(normalize_operator_name("operator ->"), "operator->");
        assert_eq!(normalize_operator_name("operator  new"), "operator new");
    }

    #[test]
    fn test_class_members_and_visibility() {
        let doc = parse(
            "class Foo {\npublic:\n    int a;\n    void f(int x, int y = 0) const;\nprivate:\n    static int s;\n};\n",
        );
        let (_, foo) = doc.members(ScopeId::GLOBAL).next().unwrap();
        let info = foo.as_class().unwrap();
        let body = info.body.unwrap();
        assert_eq!(names_in(&doc, body), vec!["a", "f", "s"]);
        let (_, f) = doc.members(body).nth(1).unwrap();
        let func = f.as_function().unwrap();
        assert_eq!(func.params.len(), 2);
        assert!(func.is_const);
        assert_eq!(func.params[1].default_value.as_deref(), Some("0"));
        let (_, s) = doc.members(body).nth(2).unwrap();
        assert_eq!(s.visibility, Visibility::Private);
        assert!(s.is_static);
    }

    #[test]
    fn test_function_scope_contains_params_and_block() {
        let src = "void run(int count) {\n    int local = 1;\n    \n}\n";
        let doc = parse(src);
        let scope = doc.scope_at(2, 4);
        assert_eq!(doc.scope(scope).kind, ScopeKind::Block);
        assert_eq!(names_in(&doc, scope), vec!["local"]);
        let parent = doc.scope(scope).parent.unwrap();
        assert_eq!(doc.scope(parent).kind, ScopeKind::Function);
        assert_eq!(names_in(&doc, parent), vec!["count"]);
    }

    #[test]
    fn test_out_of_line_definition_has_qualifier() {
        let doc = parse("void Foo::bar(int a) { }\n");
        let (_, bar) = doc.members(ScopeId::GLOBAL).next().unwrap();
        assert!(bar.has_qualified_name());
        assert_eq!(bar.name_str(), "bar");
    }

    #[test]
    fn test_signals_and_slots_are_tagged() {
        let doc = parse(
            "class W : public QObject {\n    Q_OBJECT\nsignals:\n    void changed(int v);\npublic slots:\n    void apply();\npublic:\n    void plain();\n};\n",
        );
        let (_, w) = doc.members(ScopeId::GLOBAL).next().unwrap();
        let info = w.as_class().unwrap();
        assert_eq!(info.bases.len(), 1);
        let kinds: Vec<QtMethodKind> = doc
            .members(info.body.unwrap())
            .filter_map(|(_, s)| s.as_function().map(|f| f.qt))
            .collect();
        assert_eq!(
            kinds,
            vec![QtMethodKind::Signal, QtMethodKind::Slot, QtMethodKind::None]
        );
    }

    #[test]
    fn test_macros_and_includes() {
        let doc = parse("#include \"foo.h\"\n#include <vector>\n#define MAX(a, b) a\n#define FLAG\n");
        assert_eq!(doc.includes().len(), 2);
        assert_eq!(doc.includes()[0].kind, IncludeKind::Local);
        assert_eq!(doc.includes()[1].path, "vector");
        let names: Vec<&str> = doc.macros().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["MAX", "FLAG"]);
        assert_eq!(doc.macros()[0].params.as_ref().map(|p| p.len()), Some(2));
    }

    #[test]
    fn test_pointer_declarator_types() {
        let doc = parse("Foo *p;\nconst Bar &r = b;\n");
        let tys: Vec<String> = doc
            .members(ScopeId::GLOBAL)
            .filter_map(|(_, s)| s.value_type().map(|t| t.pretty()))
            .collect();
        assert_eq!(tys, vec!["Foo *", "const Bar &"]);
    }

    #[test]
    fn test_trial_function_declarations() {
        assert!(is_function_declaration("void draw(int x);"));
        assert!(is_function_declaration("QString *make();"));
        assert!(is_function_declaration("const Item &at(int i) const;"));
        assert!(!is_function_declaration("int x = compute();"));
        assert!(!is_function_declaration("Foo::~Foo();"));
        assert!(!is_function_declaration("void broken(;"));
    }
}
