/// Name lookup over a document and its include chain.
///
/// A [`LookupContext`] is built once per completion cycle from the current
/// document plus every document it (transitively) includes.  It answers
/// the questions the completion engine asks:
///
/// - which [`Binding`] (class, namespace or enum, with inheritance and
///   using-directives) corresponds to a scope or a type name,
/// - which symbols an unqualified or qualified name refers to from a given
///   scope, honouring shadowing (block, then function parameters, then
///   class members and bases, then enclosing namespaces),
/// - which class an expression's type denotes for member access.
///
/// Namespaces are merged across documents by their qualified path, which
/// also makes members of anonymous namespaces visible in the enclosing
/// namespace.
use std::cell::Cell;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use ustr::Ustr;

use super::document::Document;
use super::snapshot::Snapshot;
use super::symbols::{
    FullySpecifiedType, QualifiedName, Scope, ScopeId, ScopeKind, ScopeRef, Symbol, SymbolKind,
    SymbolRef, Ty,
};

/// Upper bound on nested resolution steps (typedef chains, `auto`
/// deduction, base class walks), guarding against cyclic declarations.
const MAX_DEPTH: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Global,
    Namespace,
    Class,
    Enum,
}

/// A template parameter bound to an argument at an instantiation site.
#[derive(Debug, Clone, PartialEq)]
pub struct Substitution {
    pub name: Ustr,
    pub ty: FullySpecifiedType,
    /// Scope the argument was written in.
    pub scope: ScopeRef,
}

/// A class, namespace or enum as seen by lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub kind: BindingKind,
    /// Qualified path from the global namespace; empty for the global
    /// namespace itself.
    pub path: Vec<Ustr>,
    /// All scopes contributing members (one per namespace block, the body
    /// of a class or enum).
    pub scopes: Vec<ScopeRef>,
    /// The class, namespace or enum symbol.
    pub symbol: Option<SymbolRef>,
    pub substitutions: Vec<Substitution>,
}

impl Binding {
    pub fn qualified_name(&self) -> String {
        self.path
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join("::")
    }

    fn substitution(&self, name: &str) -> Option<&Substitution> {
        self.substitutions.iter().find(|s| s.name.as_str() == name)
    }
}

/// One possible meaning of a name or expression.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupItem {
    pub ty: FullySpecifiedType,
    /// Scope in which names inside `ty` are resolved.
    pub scope: ScopeRef,
    pub declaration: Option<SymbolRef>,
    /// The binding the declaration was found in; carries template
    /// substitutions for member types.
    pub binding: Option<Binding>,
}

/// Member access operator used to reach a class from an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessOp {
    Dot,
    Arrow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MemberFilter {
    Any,
    Types,
}

pub struct LookupContext {
    docs: Vec<Arc<Document>>,
    /// Namespace path → every global/namespace scope with that path.
    namespaces: HashMap<Vec<Ustr>, Vec<ScopeRef>>,
    /// Qualified class path → classes with a body.
    class_definitions: HashMap<Vec<Ustr>, Vec<SymbolRef>>,
    depth: Cell<u32>,
}

impl LookupContext {
    /// Build a context for `this` document and its include chain.
    pub fn new(this: Arc<Document>, snapshot: &Snapshot, header_paths: &[PathBuf]) -> Self {
        let mut docs = vec![Arc::clone(&this)];
        docs.extend(snapshot.include_chain(&this, header_paths));
        Self::from_documents(docs)
    }

    /// Build a context over an explicit document list; the first document
    /// is the one completion runs in.
    pub fn from_documents(docs: Vec<Arc<Document>>) -> Self {
        let mut ctx = Self {
            docs,
            namespaces: HashMap::new(),
            class_definitions: HashMap::new(),
            depth: Cell::new(0),
        };
        for (d, doc) in ctx.docs.iter().enumerate() {
            for i in 0..doc.scope_count() {
                let id = ScopeId(i as u32);
                let scope = doc.scope(id);
                if matches!(scope.kind, ScopeKind::Global | ScopeKind::Namespace) {
                    ctx.namespaces
                        .entry(scope_path(doc, id))
                        .or_default()
                        .push(ScopeRef { doc: d as u32, id });
                }
            }
            for (i, sym) in doc.symbols.iter().enumerate() {
                if let SymbolKind::Class(info) = &sym.kind
                    && info.body.is_some()
                    && let Some(name) = sym.name
                {
                    let mut path = scope_path(doc, sym.scope);
                    path.push(name);
                    ctx.class_definitions
                        .entry(path)
                        .or_default()
                        .push(SymbolRef {
                            doc: d as u32,
                            id: super::symbols::SymbolId(i as u32),
                        });
                }
            }
        }
        ctx
    }

    // ─── Accessors ──────────────────────────────────────────────────────

    pub fn this_document(&self) -> &Arc<Document> {
        &self.docs[0]
    }

    pub fn documents(&self) -> &[Arc<Document>] {
        &self.docs
    }

    pub fn document(&self, doc: u32) -> &Document {
        &self.docs[doc as usize]
    }

    pub fn symbol(&self, r: SymbolRef) -> &Symbol {
        self.docs[r.doc as usize].symbol(r.id)
    }

    pub fn scope(&self, r: ScopeRef) -> &Scope {
        self.docs[r.doc as usize].scope(r.id)
    }

    /// The scope a symbol is declared in.
    pub fn scope_of(&self, r: SymbolRef) -> ScopeRef {
        ScopeRef {
            doc: r.doc,
            id: self.symbol(r).scope,
        }
    }

    /// Innermost scope of the current document at a position.
    pub fn scope_at(&self, line: u32, column: u32) -> ScopeRef {
        ScopeRef {
            doc: 0,
            id: self.docs[0].scope_at(line, column),
        }
    }

    pub fn parent_scope(&self, scope: ScopeRef) -> Option<ScopeRef> {
        self.scope(scope).parent.map(|id| ScopeRef { doc: scope.doc, id })
    }

    pub fn owner(&self, scope: ScopeRef) -> Option<SymbolRef> {
        self.scope(scope).owner.map(|id| SymbolRef { doc: scope.doc, id })
    }

    /// Members of a scope in declaration order.
    pub fn members(&self, scope: ScopeRef) -> impl Iterator<Item = (SymbolRef, &Symbol)> + '_ {
        self.docs[scope.doc as usize]
            .members(scope.id)
            .map(move |(id, sym)| (SymbolRef { doc: scope.doc, id }, sym))
    }

    /// Fully qualified `a::b::name` of a symbol.
    pub fn qualified_name(&self, r: SymbolRef) -> String {
        let doc = self.document(r.doc);
        let sym = self.symbol(r);
        let mut path: Vec<String> = scope_path(doc, sym.scope)
            .iter()
            .map(|s| s.to_string())
            .collect();
        if let Some(f) = sym.as_function()
            && let Some(q) = &f.qualifier
        {
            path.extend(q.segments.iter().map(|s| s.to_string()));
        }
        path.push(sym.name_str().to_string());
        path.join("::")
    }

    /// Qualified path of the namespaces and classes enclosing `scope`.
    pub fn scope_path(&self, scope: ScopeRef) -> Vec<Ustr> {
        scope_path(self.document(scope.doc), scope.id)
    }

    fn enter(&self) -> bool {
        let depth = self.depth.get();
        if depth >= MAX_DEPTH {
            return false;
        }
        self.depth.set(depth + 1);
        true
    }

    fn leave(&self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }

    // ─── Bindings ───────────────────────────────────────────────────────

    pub fn global_namespace(&self) -> Binding {
        self.namespace_binding(&[])
    }

    fn namespace_binding(&self, path: &[Ustr]) -> Binding {
        let scopes = self.namespaces.get(path).cloned().unwrap_or_default();
        let symbol = scopes.iter().find_map(|&s| {
            let owner = self.owner(s)?;
            self.symbol(owner).name.map(|_| owner)
        });
        Binding {
            kind: if path.is_empty() {
                BindingKind::Global
            } else {
                BindingKind::Namespace
            },
            path: path.to_vec(),
            scopes,
            symbol,
            substitutions: Vec::new(),
        }
    }

    /// The binding a scope belongs to: its class, its namespace, or for
    /// function and block scopes the binding of the enclosing declaration
    /// (the qualifier's class for out-of-line member definitions).
    pub fn binding_for_scope(&self, scope: ScopeRef) -> Option<Binding> {
        match self.scope(scope).kind {
            ScopeKind::Global | ScopeKind::Namespace => {
                Some(self.namespace_binding(&self.scope_path(scope)))
            }
            ScopeKind::Class | ScopeKind::Enum => {
                let owner = self.owner(scope)?;
                self.binding_for_symbol(owner, &[], scope)
            }
            ScopeKind::Function => {
                let parent = self.parent_scope(scope)?;
                if let Some(qualifier) = self.function_qualifier(scope) {
                    return self.lookup_type(&qualifier, parent);
                }
                self.binding_for_scope(parent)
            }
            ScopeKind::Block => self.binding_for_scope(self.parent_scope(scope)?),
        }
    }

    /// The qualifier of the out-of-line member function owning a function
    /// scope.
    pub fn function_qualifier(&self, scope: ScopeRef) -> Option<QualifiedName> {
        let owner = self.owner(scope)?;
        let qualifier = self.symbol(owner).as_function()?.qualifier.clone()?;
        (!qualifier.is_empty()).then_some(qualifier)
    }

    /// Binding denoted by a type-like symbol.  `args` instantiate a class
    /// template; they were written in `arg_scope`.
    pub fn binding_for_symbol(
        &self,
        r: SymbolRef,
        args: &[FullySpecifiedType],
        arg_scope: ScopeRef,
    ) -> Option<Binding> {
        if !self.enter() {
            return None;
        }
        let result = self.binding_for_symbol_inner(r, args, arg_scope);
        self.leave();
        result
    }

    fn binding_for_symbol_inner(
        &self,
        r: SymbolRef,
        args: &[FullySpecifiedType],
        arg_scope: ScopeRef,
    ) -> Option<Binding> {
        let sym = self.symbol(r);
        let decl_scope = self.scope_of(r);
        match &sym.kind {
            SymbolKind::Class(info) => {
                let mut path = self.scope_path(decl_scope);
                path.push(sym.name?);
                let (class_ref, body) = match info.body {
                    Some(body) => (r, body),
                    None => {
                        // Forward declaration; find the definition.
                        let def = *self.class_definitions.get(&path)?.first()?;
                        (def, self.symbol(def).as_class()?.body?)
                    }
                };
                let params = &self.symbol(class_ref).as_class()?.template_params;
                let substitutions = params
                    .iter()
                    .zip(args)
                    .map(|(name, ty)| Substitution {
                        name: *name,
                        ty: ty.clone(),
                        scope: arg_scope,
                    })
                    .collect();
                Some(Binding {
                    kind: BindingKind::Class,
                    path,
                    scopes: vec![ScopeRef {
                        doc: class_ref.doc,
                        id: body,
                    }],
                    symbol: Some(class_ref),
                    substitutions,
                })
            }
            SymbolKind::Namespace { body } => {
                let path = self.scope_path(ScopeRef {
                    doc: r.doc,
                    id: *body,
                });
                Some(self.namespace_binding(&path))
            }
            SymbolKind::Enum { body, .. } => {
                let mut path = self.scope_path(decl_scope);
                path.extend(sym.name);
                Some(Binding {
                    kind: BindingKind::Enum,
                    path,
                    scopes: vec![ScopeRef {
                        doc: r.doc,
                        id: *body,
                    }],
                    symbol: Some(r),
                    substitutions: Vec::new(),
                })
            }
            SymbolKind::Typedef { ty } => self.class_binding(ty, decl_scope, None),
            SymbolKind::NamespaceAlias { target } | SymbolKind::UsingDeclaration { target } => {
                self.lookup_type(target, decl_scope)
            }
            _ => None,
        }
    }

    /// Bindings reachable through inheritance (classes) or using
    /// directives (namespaces).
    pub fn usings(&self, binding: &Binding) -> Vec<Binding> {
        let mut out = Vec::new();
        match binding.kind {
            BindingKind::Class => {
                let Some(class_ref) = binding.symbol else {
                    return out;
                };
                let Some(info) = self.symbol(class_ref).as_class() else {
                    return out;
                };
                let class_scope = self.scope_of(class_ref);
                for base in &info.bases {
                    let args: Vec<FullySpecifiedType> = base
                        .args
                        .iter()
                        .map(|arg| substitute(arg, binding))
                        .collect();
                    if let Some(sym) = self.lookup_type_symbol(&base.name, class_scope)
                        && let Some(b) = self.binding_for_symbol(sym, &args, class_scope)
                        && b.kind == BindingKind::Class
                    {
                        out.push(b);
                    }
                }
            }
            BindingKind::Global | BindingKind::Namespace => {
                for &scope in &binding.scopes {
                    for (_, sym) in self.members(scope) {
                        if let SymbolKind::UsingDirective { target } = &sym.kind
                            && let Some(b) = self.resolve_namespace(target, scope)
                            && b.scopes != binding.scopes
                        {
                            out.push(b);
                        }
                    }
                }
            }
            BindingKind::Enum => {}
        }
        out
    }

    /// Resolve a namespace name without following using-directives, which
    /// keeps using-directive resolution free of recursion.
    fn resolve_namespace(&self, target: &QualifiedName, from: ScopeRef) -> Option<Binding> {
        let target_path: Vec<Ustr> = target.segments.clone();
        if target.global {
            return self
                .namespaces
                .contains_key(&target_path)
                .then(|| self.namespace_binding(&target_path));
        }
        let mut prefix = self.scope_path(from);
        loop {
            let mut candidate = prefix.clone();
            candidate.extend(target_path.iter().copied());
            if self.namespaces.contains_key(&candidate) {
                return Some(self.namespace_binding(&candidate));
            }
            // A namespace alias in an enclosing namespace.
            if let [single] = target_path.as_slice() {
                let holder = self.namespace_binding(&prefix);
                for &scope in &holder.scopes {
                    for (r, sym) in self.members(scope) {
                        if sym.is_named(single)
                            && matches!(sym.kind, SymbolKind::NamespaceAlias { .. })
                        {
                            return self.binding_for_symbol(r, &[], scope);
                        }
                    }
                }
            }
            if prefix.pop().is_none() {
                return None;
            }
        }
    }

    /// Enum bodies of unscoped enums declared directly in the binding;
    /// their enumerators are visible in the binding itself.
    pub fn unscoped_enums(&self, binding: &Binding) -> Vec<ScopeRef> {
        let mut out = Vec::new();
        for &scope in &binding.scopes {
            for (_, sym) in self.members(scope) {
                if let SymbolKind::Enum {
                    body,
                    scoped: false,
                } = sym.kind
                {
                    out.push(ScopeRef { doc: scope.doc, id: body });
                }
            }
        }
        out
    }

    /// The binding enclosing `binding` (the namespace around a class, the
    /// parent namespace of a namespace).
    pub fn parent(&self, binding: &Binding) -> Option<Binding> {
        if binding.kind == BindingKind::Global {
            return None;
        }
        let scope = *binding.scopes.first()?;
        let parent = self.parent_scope(scope)?;
        self.binding_for_scope(parent)
    }

    // ─── Member search ──────────────────────────────────────────────────

    /// Members named `name` in `binding`, its unscoped enums, anonymous
    /// aggregates and (if none are found directly) its usings.
    pub fn find_members(&self, binding: &Binding, name: &str) -> Vec<LookupItem> {
        self.find_in_binding(binding, name, MemberFilter::Any)
            .into_iter()
            .flat_map(|(r, b)| self.expand_using_declaration(r, b))
            .collect()
    }

    fn find_in_binding(
        &self,
        binding: &Binding,
        name: &str,
        filter: MemberFilter,
    ) -> Vec<(SymbolRef, Binding)> {
        let mut visited: Vec<Vec<ScopeRef>> = Vec::new();
        self.find_recursive(binding, name, filter, &mut visited)
    }

    fn find_recursive(
        &self,
        binding: &Binding,
        name: &str,
        filter: MemberFilter,
        visited: &mut Vec<Vec<ScopeRef>>,
    ) -> Vec<(SymbolRef, Binding)> {
        if visited.contains(&binding.scopes) || visited.len() > 64 {
            return Vec::new();
        }
        visited.push(binding.scopes.clone());

        let mut hits = Vec::new();
        for &scope in &binding.scopes {
            self.collect_named(scope, name, filter, &mut hits);
        }
        for scope in self.unscoped_enums(binding) {
            self.collect_named(scope, name, filter, &mut hits);
        }
        if !hits.is_empty() {
            return hits.into_iter().map(|r| (r, binding.clone())).collect();
        }
        let mut out = Vec::new();
        for using in self.usings(binding) {
            out.extend(self.find_recursive(&using, name, filter, visited));
        }
        out
    }

    fn collect_named(
        &self,
        scope: ScopeRef,
        name: &str,
        filter: MemberFilter,
        hits: &mut Vec<SymbolRef>,
    ) {
        for (r, sym) in self.members(scope) {
            // Anonymous nested aggregates contribute their members.
            if sym.name.is_none()
                && let SymbolKind::Class(info) = &sym.kind
                && let Some(body) = info.body
            {
                self.collect_named(ScopeRef { doc: r.doc, id: body }, name, filter, hits);
                continue;
            }
            if !sym.is_named(name) || sym.has_qualified_name() {
                continue;
            }
            let wanted = match filter {
                MemberFilter::Any => !matches!(
                    sym.kind,
                    SymbolKind::UsingDirective { .. } | SymbolKind::Friend
                ),
                MemberFilter::Types => {
                    sym.is_type_like() || matches!(sym.kind, SymbolKind::UsingDeclaration { .. })
                }
            };
            if wanted {
                hits.push(r);
            }
        }
    }

    /// `using Base::name;` brings `Base::name` into scope.
    fn expand_using_declaration(&self, r: SymbolRef, binding: Binding) -> Vec<LookupItem> {
        if let SymbolKind::UsingDeclaration { target } = &self.symbol(r).kind
            && target.is_qualified()
            && self.enter()
        {
            let items = self.lookup_qualified(target, self.scope_of(r));
            self.leave();
            if !items.is_empty() {
                return items;
            }
        }
        vec![self.item_for_symbol(r, Some(binding))]
    }

    // ─── Scope-chain lookup ─────────────────────────────────────────────

    /// Resolve an unqualified name from `scope` outward.
    pub fn lookup_value(&self, name: &str, scope: ScopeRef) -> Vec<LookupItem> {
        let mut current = Some(scope);
        while let Some(s) = current {
            let kind = self.scope(s).kind;
            match kind {
                ScopeKind::Block | ScopeKind::Function | ScopeKind::Enum => {
                    let mut hits = Vec::new();
                    self.collect_named(s, name, MemberFilter::Any, &mut hits);
                    // Unscoped enums declared in a block.
                    for (_, sym) in self.members(s) {
                        if let SymbolKind::Enum {
                            body,
                            scoped: false,
                        } = sym.kind
                        {
                            let body = ScopeRef { doc: s.doc, id: body };
                            self.collect_named(body, name, MemberFilter::Any, &mut hits);
                        }
                    }
                    if !hits.is_empty() {
                        return hits
                            .into_iter()
                            .map(|r| self.item_for_symbol(r, None))
                            .collect();
                    }
                    if kind == ScopeKind::Function
                        && let Some(qualifier) = self.function_qualifier(s)
                        && let Some(parent) = self.parent_scope(s)
                        && let Some(class) = self.lookup_type(&qualifier, parent)
                    {
                        let items = self.find_members(&class, name);
                        if !items.is_empty() {
                            return items;
                        }
                    }
                }
                ScopeKind::Class | ScopeKind::Namespace | ScopeKind::Global => {
                    if let Some(binding) = self.binding_for_scope(s) {
                        // The injected class name.
                        if binding.kind == BindingKind::Class
                            && let Some(class_ref) = binding.symbol
                            && self.symbol(class_ref).is_named(name)
                        {
                            return vec![self.item_for_symbol(class_ref, Some(binding))];
                        }
                        let items = self.find_members(&binding, name);
                        if !items.is_empty() {
                            return items;
                        }
                    }
                }
            }
            current = self.parent_scope(s);
        }
        Vec::new()
    }

    /// Resolve a possibly qualified name.
    pub fn lookup_qualified(&self, name: &QualifiedName, scope: ScopeRef) -> Vec<LookupItem> {
        let Some(last) = name.last() else {
            return Vec::new();
        };
        if !name.is_qualified() {
            return self.lookup_value(&last, scope);
        }
        let qualifier = name.qualifier();
        let binding = if qualifier.is_empty() {
            Some(self.global_namespace())
        } else {
            self.lookup_type(&qualifier, scope)
        };
        match binding {
            Some(b) => self.find_members(&b, &last),
            None => Vec::new(),
        }
    }

    /// Resolve a type name to the symbol it denotes.
    pub fn lookup_type_symbol(&self, name: &QualifiedName, scope: ScopeRef) -> Option<SymbolRef> {
        let (first, rest) = name.segments.split_first()?;
        if !self.enter() {
            return None;
        }
        let mut current = if name.global {
            let global = self.global_namespace();
            self.find_in_binding(&global, first, MemberFilter::Types)
                .first()
                .map(|(r, _)| *r)
        } else {
            self.find_type_in_chain(first, scope)
        };
        for segment in rest {
            let Some(sym) = current else {
                break;
            };
            current = self
                .binding_for_symbol(sym, &[], scope)
                .and_then(|b| {
                    self.find_in_binding(&b, segment, MemberFilter::Types)
                        .first()
                        .map(|(r, _)| *r)
                        .or_else(|| {
                            // `Foo::Foo` names the class itself.
                            b.symbol.filter(|&s| self.symbol(s).is_named(segment))
                        })
                });
        }
        self.leave();
        current
    }

    /// Resolve a type name to its binding.
    pub fn lookup_type(&self, name: &QualifiedName, scope: ScopeRef) -> Option<Binding> {
        let sym = self.lookup_type_symbol(name, scope)?;
        self.binding_for_symbol(sym, &[], scope)
    }

    fn find_type_in_chain(&self, name: &str, scope: ScopeRef) -> Option<SymbolRef> {
        let mut current = Some(scope);
        while let Some(s) = current {
            let kind = self.scope(s).kind;
            match kind {
                ScopeKind::Block | ScopeKind::Function | ScopeKind::Enum => {
                    let mut hits = Vec::new();
                    self.collect_named(s, name, MemberFilter::Types, &mut hits);
                    if let Some(&hit) = hits.first() {
                        return Some(hit);
                    }
                    if kind == ScopeKind::Function
                        && let Some(qualifier) = self.function_qualifier(s)
                        && let Some(parent) = self.parent_scope(s)
                        && let Some(class) = self.lookup_type(&qualifier, parent)
                    {
                        if class.symbol.is_some_and(|c| self.symbol(c).is_named(name)) {
                            return class.symbol;
                        }
                        if let Some((r, _)) =
                            self.find_in_binding(&class, name, MemberFilter::Types).first()
                        {
                            return Some(*r);
                        }
                    }
                }
                ScopeKind::Class | ScopeKind::Namespace | ScopeKind::Global => {
                    if let Some(binding) = self.binding_for_scope(s) {
                        if binding.kind == BindingKind::Class
                            && binding.symbol.is_some_and(|c| self.symbol(c).is_named(name))
                        {
                            return binding.symbol;
                        }
                        if let Some((r, _)) =
                            self.find_in_binding(&binding, name, MemberFilter::Types).first()
                        {
                            return Some(*r);
                        }
                    }
                }
            }
            current = self.parent_scope(s);
        }
        None
    }

    // ─── Types ──────────────────────────────────────────────────────────

    /// A lookup item describing what a symbol denotes when named in an
    /// expression.
    pub fn item_for_symbol(&self, r: SymbolRef, binding: Option<Binding>) -> LookupItem {
        let sym = self.symbol(r);
        let scope = self.scope_of(r);
        let ty = match &sym.kind {
            SymbolKind::Variable { ty, initializer } if ty.ty == Ty::Auto => {
                if let Some(mut item) = self.deduce_auto(initializer.as_deref(), scope) {
                    item.ty.is_const |= ty.is_const;
                    item.declaration = Some(r);
                    return item;
                }
                FullySpecifiedType::unknown()
            }
            SymbolKind::Variable { ty, .. } | SymbolKind::Parameter { ty, .. } => ty.clone(),
            SymbolKind::Enumerator => FullySpecifiedType::builtin("int"),
            SymbolKind::QtProperty | SymbolKind::QtEnum | SymbolKind::Friend => {
                FullySpecifiedType::unknown()
            }
            _ => Ty::Symbol(r).into(),
        };
        LookupItem {
            ty,
            scope,
            declaration: Some(r),
            binding,
        }
    }

    /// The first meaning of an `auto` variable's initializer.
    fn deduce_auto(&self, initializer: Option<&str>, scope: ScopeRef) -> Option<LookupItem> {
        let init = initializer?.trim().trim_start_matches('=');
        if !self.enter() {
            return None;
        }
        let items = self.resolve_expression(init, scope);
        self.leave();
        let item = items.into_iter().next()?;
        let (ty, ty_scope) = self.resolve_typedefs(&item.ty, item.scope, item.binding.as_ref());
        Some(LookupItem {
            ty,
            scope: ty_scope,
            ..item
        })
    }

    /// Expand template parameters and typedefs, strip references.
    pub fn resolve_typedefs(
        &self,
        ty: &FullySpecifiedType,
        scope: ScopeRef,
        binding: Option<&Binding>,
    ) -> (FullySpecifiedType, ScopeRef) {
        let mut ty = ty.without_reference().clone();
        let mut scope = scope;
        for _ in 0..MAX_DEPTH {
            let next = match &ty.ty {
                Ty::Named(named) if !named.name.is_qualified() => {
                    let name = named.name.segments[0];
                    if let Some(sub) = binding.and_then(|b| b.substitution(&name)) {
                        Some((sub.ty.clone(), sub.scope))
                    } else {
                        self.typedef_target(&named.name, scope)
                    }
                }
                Ty::Named(named) => self.typedef_target(&named.name, scope),
                Ty::Symbol(r) => match &self.symbol(*r).kind {
                    SymbolKind::Typedef { ty } => Some((ty.clone(), self.scope_of(*r))),
                    _ => None,
                },
                _ => None,
            };
            match next {
                Some((next_ty, next_scope)) => {
                    let is_const = ty.is_const;
                    ty = next_ty.without_reference().clone();
                    ty.is_const |= is_const;
                    scope = next_scope;
                }
                None => break,
            }
        }
        (ty, scope)
    }

    fn typedef_target(
        &self,
        name: &QualifiedName,
        scope: ScopeRef,
    ) -> Option<(FullySpecifiedType, ScopeRef)> {
        let r = self.lookup_type_symbol(name, scope)?;
        match &self.symbol(r).kind {
            SymbolKind::Typedef { ty } => Some((ty.clone(), self.scope_of(r))),
            _ => None,
        }
    }

    /// The class (or namespace, or enum) binding a type denotes.
    pub fn class_binding(
        &self,
        ty: &FullySpecifiedType,
        scope: ScopeRef,
        enclosing: Option<&Binding>,
    ) -> Option<Binding> {
        let (ty, scope) = self.resolve_typedefs(ty, scope, enclosing);
        match &ty.ty {
            Ty::Named(named) => {
                let sym = self.lookup_type_symbol(&named.name, scope)?;
                let args: Vec<FullySpecifiedType> = match enclosing {
                    Some(b) => named.args.iter().map(|a| substitute(a, b)).collect(),
                    None => named.args.clone(),
                };
                self.binding_for_symbol(sym, &args, scope)
            }
            Ty::Symbol(r) => self.binding_for_symbol(*r, &[], scope),
            _ => None,
        }
    }

    /// The class reached by applying `access` to any of `items`.
    ///
    /// `->` on a pointer reaches the pointee; `->` on a class uses its
    /// `operator->`.  When `replaced_dot` is given, `.` on a pointer (or
    /// array) reaches the element type and sets the flag so the caller can
    /// rewrite the operator.
    pub fn base_binding(
        &self,
        items: &[LookupItem],
        access: AccessOp,
        mut replaced_dot: Option<&mut bool>,
    ) -> Option<Binding> {
        for item in items {
            let (ty, scope) = self.resolve_typedefs(&item.ty, item.scope, item.binding.as_ref());
            let binding = item.binding.as_ref();
            match access {
                AccessOp::Arrow => {
                    if let Ty::Pointer(inner) | Ty::Array(inner) = &ty.ty {
                        if let Some(b) = self.class_binding(inner, scope, binding) {
                            return Some(b);
                        }
                        continue;
                    }
                    let Some(class) = self.class_binding(&ty, scope, binding) else {
                        continue;
                    };
                    for op in self.find_members(&class, "operator->") {
                        let Some(decl) = op.declaration else {
                            continue;
                        };
                        let Some(ret) = self
                            .symbol(decl)
                            .as_function()
                            .and_then(|f| f.return_type.clone())
                        else {
                            continue;
                        };
                        let (ret, ret_scope) =
                            self.resolve_typedefs(&ret, op.scope, op.binding.as_ref());
                        if let Ty::Pointer(inner) = &ret.ty
                            && let Some(b) =
                                self.class_binding(inner, ret_scope, op.binding.as_ref())
                        {
                            return Some(b);
                        }
                    }
                }
                AccessOp::Dot => {
                    if let Ty::Pointer(inner) | Ty::Array(inner) = &ty.ty {
                        if let Some(flag) = replaced_dot.as_deref_mut()
                            && let Some(b) = self.class_binding(inner, scope, binding)
                        {
                            *flag = true;
                            return Some(b);
                        }
                        continue;
                    }
                    if let Some(b) = self.class_binding(&ty, scope, binding) {
                        return Some(b);
                    }
                }
            }
        }
        None
    }
}

/// Replace a bare template parameter name with its bound argument.
fn substitute(ty: &FullySpecifiedType, binding: &Binding) -> FullySpecifiedType {
    if let Ty::Named(named) = &ty.ty
        && !named.name.is_qualified()
        && named.args.is_empty()
        && let Some(sub) = binding.substitution(&named.name.segments[0])
    {
        return FullySpecifiedType {
            is_const: ty.is_const || sub.ty.is_const,
            ..sub.ty.clone()
        };
    }
    ty.clone()
}

/// Names of the namespaces, classes and enums enclosing `scope`, outermost
/// first.  Anonymous namespaces do not contribute.
fn scope_path(doc: &Document, scope: ScopeId) -> Vec<Ustr> {
    let mut path = Vec::new();
    for id in doc.scope_chain(scope) {
        let s = doc.scope(id);
        if matches!(
            s.kind,
            ScopeKind::Namespace | ScopeKind::Class | ScopeKind::Enum
        ) && let Some(owner) = s.owner
            && let Some(name) = doc.symbol(owner).name
        {
            path.push(name);
        }
    }
    path.reverse();
    path
}
