/// The completion engine.
///
/// [`start_completion`] classifies the text before the cursor, re-parses
/// the document with the expression under completion blanked out, and
/// dispatches on the trigger:
///
/// - **member access** (`.`, `->`): members of the class the expression
///   reaches, including inherited ones,
/// - **scope** (`::`): members of the named class, namespace or enum,
/// - **call** (`(`, `,`): overload hints, or signature completion when
///   the line is a function declaration (see [`super::call`]),
/// - **Qt** (`SIGNAL(`, `SLOT(`, `&Class::`): see [`super::qt_methods`],
/// - **global**: everything visible from the cursor, innermost first,
///   plus keywords, macros and snippets.
///
/// The raw list is sorted and de-duplicated by [`ranking::finalize`].
use std::collections::{BTreeSet, VecDeque};
use std::path::Path;
use std::sync::Arc;

use crate::config::CompletionSettings;
use crate::frontend::lookup::{AccessOp, Binding, BindingKind, LookupContext, LookupItem};
use crate::frontend::overview::symbol_detail;
use crate::frontend::parser::{ParseOptions, parse_document};
use crate::frontend::qt;
use crate::frontend::snapshot::Snapshot;
use crate::frontend::symbols::{ScopeKind, ScopeRef, SymbolKind, SymbolRef, Visibility};
use crate::lexer;
use crate::types::{
    Candidate, CandidateKind, CompletionProposal, CompletionRequest, FunctionHint, TriggerKind,
};
use crate::util;

use super::expression_under_cursor::{ExpressionUnderCursor, start_of_statement};
use super::{classifier, include, ranking, static_lists};

// ─── Presentation order ─────────────────────────────────────────────────────

pub const FUNCTION_ARGUMENTS_ORDER: i32 = 2;
pub const FUNCTION_LOCALS_ORDER: i32 = 2;
pub const PUBLIC_CLASS_MEMBER_ORDER: i32 = 1;
pub const INJECTED_CLASS_NAME_ORDER: i32 = -1;
pub const MACROS_ORDER: i32 = -2;
pub const KEYWORDS_ORDER: i32 = -2;

/// Run one completion cycle at byte offset `cursor` of `text`.
///
/// `path` names the document (its language and directory matter);
/// `snapshot` supplies every other parsed document.  `settings` must
/// carry header paths already resolved against the workspace root.
///
/// Returns `None` when nothing can be proposed at the cursor.
pub fn start_completion(
    snapshot: &Snapshot,
    settings: &CompletionSettings,
    path: &Path,
    text: &str,
    cursor: usize,
) -> Option<CompletionProposal> {
    let request = classifier::build_request(text, cursor, settings)?;
    tracing::debug!(
        "cppcomplete: {:?} completion on `{}` at {}",
        request.trigger,
        request.expression,
        request.cursor
    );

    let blanked = blank_expression(text, &request);
    let doc = parse_document(
        path,
        &blanked,
        ParseOptions {
            qt_keywords: settings.qt_keywords,
        },
    );
    let ctx = LookupContext::new(Arc::new(doc), snapshot, &settings.header_paths);

    let mut completer = Completer {
        ctx,
        settings,
        text,
        request,
        candidates: Vec::new(),
        hints: Vec::new(),
        replace_dot_at: None,
    };
    completer.run();

    let Completer {
        ctx,
        request,
        candidates,
        hints,
        replace_dot_at,
        ..
    } = completer;
    if candidates.is_empty() && hints.is_empty() {
        return None;
    }
    let candidates = ranking::finalize(candidates, request.trigger, &ctx);
    Some(CompletionProposal {
        request,
        candidates,
        hints,
        replace_dot_at,
        context: ctx,
    })
}

/// The buffer with the text being completed replaced by spaces, so the
/// half-typed statement does not disturb the symbol table.
fn blank_expression(text: &str, request: &CompletionRequest) -> String {
    let blank_start = match request.trigger {
        TriggerKind::Signal
        | TriggerKind::Slot
        | TriggerKind::LParen
        | TriggerKind::Qt5SignalOrSlotClassName
        | TriggerKind::Qt5Signal
        | TriggerKind::Qt5Slot => start_of_statement(text, request.expression_start),
        _ => request.expression_start.min(request.name_start),
    };
    let end = request.cursor.min(text.len());
    let begin = blank_start.min(end);
    let mut bytes = text.as_bytes().to_vec();
    qt::blank(&mut bytes, begin, end);
    String::from_utf8(bytes).unwrap_or_else(|_| text.to_string())
}

/// State of one completion cycle.  The implementation is split over this
/// module, [`super::call`] and [`super::qt_methods`].
pub(super) struct Completer<'a> {
    pub(super) ctx: LookupContext,
    pub(super) settings: &'a CompletionSettings,
    pub(super) text: &'a str,
    pub(super) request: CompletionRequest,
    pub(super) candidates: Vec<Candidate>,
    pub(super) hints: Vec<FunctionHint>,
    pub(super) replace_dot_at: Option<usize>,
}

/// What class completion does with one member.
#[derive(Clone, Copy)]
enum MemberAction {
    Skip,
    /// Members of an anonymous struct or union are members of the
    /// enclosing class.
    Flatten(ScopeRef),
    Add(i32),
}

impl Completer<'_> {
    fn run(&mut self) {
        let trigger = self.request.trigger;
        match trigger {
            TriggerKind::DoxyComment => {
                self.candidates = static_lists::doxygen_candidates();
                return;
            }
            TriggerKind::Pound => {
                let objc = self.objc();
                self.candidates = static_lists::preprocessor_candidates(objc);
                return;
            }
            TriggerKind::StringLiteral | TriggerKind::AngleStringLiteral => {
                let dirs = include::search_dirs(
                    &self.settings.header_paths,
                    self.ctx.this_document().path(),
                );
                self.candidates = include::include_candidates(
                    &dirs,
                    &self.request.expression,
                    &self.settings.header_suffixes,
                );
                return;
            }
            _ => {}
        }

        let (line, column) = util::line_and_column(self.text, self.request.expression_start);
        let scope = self.ctx.scope_at(line, column);

        let mut expression = self.request.expression.clone();
        if expression.is_empty() {
            match trigger {
                TriggerKind::None | TriggerKind::ColonColon => {
                    self.global_completion(scope);
                    return;
                }
                TriggerKind::Signal | TriggerKind::Slot => expression = "this".to_string(),
                _ => return,
            }
        }

        if trigger == TriggerKind::Qt5SignalOrSlotClassName {
            self.complete_qt5_class_name(&expression, scope);
            return;
        }

        let mut results = self.ctx.resolve_expression(&expression, scope);
        if results.is_empty() {
            match trigger {
                TriggerKind::Signal | TriggerKind::Slot => {
                    results.extend(self.ctx.this_item(scope));
                }
                TriggerKind::LParen => {
                    self.complete_constructor_of_declared_name(scope);
                    return;
                }
                _ => {}
            }
        }
        if results.is_empty() {
            return;
        }

        match trigger {
            TriggerKind::LParen => {
                self.complete_constructor_or_function(&results, false);
            }
            TriggerKind::Dot | TriggerKind::Arrow => self.complete_member(&results),
            TriggerKind::ColonColon => self.complete_scope(&results),
            TriggerKind::Signal
            | TriggerKind::Slot
            | TriggerKind::Qt5Signal
            | TriggerKind::Qt5Slot => self.complete_qt_method(&results),
            // Pointer-to-member access; any visible name may follow.
            TriggerKind::DotStar | TriggerKind::ArrowStar => self.global_completion(scope),
            _ => {}
        }
    }

    pub(super) fn objc(&self) -> bool {
        self.settings.objc_enabled && self.ctx.this_document().language().is_objc()
    }

    /// `Foo foo(`: the name before `(` is being declared, so offer the
    /// constructors of the type written before it.
    fn complete_constructor_of_declared_name(&mut self, scope: ScopeRef) {
        let text = self.text;
        let mut index = self.request.expression_end;
        while let Some(c) = util::char_before(text, index)
            && c.is_whitespace()
        {
            index -= c.len_utf8();
        }
        let index = util::find_start_of_name(text, index);
        let (_, base) = ExpressionUnderCursor::new().expression(text, index);
        if base.is_empty() {
            return;
        }
        let results = self.ctx.resolve_expression(&base, scope);
        let names_class = results.iter().any(|item| {
            item.declaration
                .is_some_and(|d| self.ctx.symbol(d).is_type_like())
                && self
                    .ctx
                    .class_binding(&item.ty, item.scope, item.binding.as_ref())
                    .is_some_and(|b| b.kind == BindingKind::Class)
        });
        if names_class {
            self.complete_constructor_or_function(&results, true);
        }
    }

    // ─── Member and scope completion ────────────────────────────────────

    fn complete_member(&mut self, results: &[LookupItem]) {
        let access = if self.request.trigger == TriggerKind::Arrow {
            AccessOp::Arrow
        } else {
            AccessOp::Dot
        };
        let mut replaced = false;
        let binding = if self.objc() {
            self.ctx.base_binding(results, access, None)
        } else {
            self.ctx.base_binding(results, access, Some(&mut replaced))
        };
        let Some(binding) = binding else {
            return;
        };
        if replaced {
            self.replace_dot_at = Some(self.request.expression_end);
        }
        self.complete_class(&binding, false);
    }

    fn complete_scope(&mut self, results: &[LookupItem]) {
        for item in results {
            let Some(binding) =
                self.ctx
                    .class_binding(&item.ty, item.scope, item.binding.as_ref())
            else {
                continue;
            };
            match binding.kind {
                BindingKind::Class => self.complete_class(&binding, true),
                BindingKind::Namespace | BindingKind::Global => self.complete_namespace(&binding),
                BindingKind::Enum => {
                    for &scope in &binding.scopes {
                        self.add_scope_members(scope, 0);
                    }
                }
            }
            break;
        }
    }

    /// Members of a namespace and of every namespace it pulls in with a
    /// using-directive.
    fn complete_namespace(&mut self, binding: &Binding) {
        let mut queue = VecDeque::from([binding.clone()]);
        let mut visited: Vec<Vec<ScopeRef>> = Vec::new();
        while let Some(b) = queue.pop_front() {
            if visited.contains(&b.scopes) {
                continue;
            }
            visited.push(b.scopes.clone());
            queue.extend(self.ctx.usings(&b));

            let mut scopes = b.scopes.clone();
            scopes.extend(self.ctx.unscoped_enums(&b));
            for scope in scopes {
                self.add_scope_members(scope, 0);
            }
        }
    }

    /// Members of a class and its bases.
    ///
    /// A static lookup (`Class::`) also offers the class's own name and
    /// its nested types; member access does not.
    fn complete_class(&mut self, binding: &Binding, static_lookup: bool) {
        let mut queue = VecDeque::from([binding.clone()]);
        let mut visited: Vec<Vec<ScopeRef>> = Vec::new();
        while let Some(b) = queue.pop_front() {
            if visited.contains(&b.scopes) {
                continue;
            }
            visited.push(b.scopes.clone());
            queue.extend(self.ctx.usings(&b));

            if static_lookup
                && b.kind == BindingKind::Class
                && let Some(class) = b.symbol
            {
                self.add_symbol(class, INJECTED_CLASS_NAME_ORDER);
            }
            let mut scopes = b.scopes.clone();
            scopes.extend(self.ctx.unscoped_enums(&b));
            for scope in scopes {
                self.add_class_members(scope, static_lookup);
            }
        }
    }

    fn add_class_members(&mut self, scope: ScopeRef, static_lookup: bool) {
        let members: Vec<SymbolRef> = self.ctx.members(scope).map(|(r, _)| r).collect();
        for r in members {
            match self.member_action(r, static_lookup) {
                MemberAction::Skip => {}
                MemberAction::Flatten(body) => self.add_class_members(body, static_lookup),
                MemberAction::Add(order) => self.add_symbol(r, order),
            }
        }
    }

    fn member_action(&self, r: SymbolRef, static_lookup: bool) -> MemberAction {
        let sym = self.ctx.symbol(r);
        match &sym.kind {
            SymbolKind::Friend | SymbolKind::QtProperty | SymbolKind::QtEnum => {
                return MemberAction::Skip;
            }
            SymbolKind::Class(info) if sym.name.is_none() => {
                return match info.body {
                    Some(body) => MemberAction::Flatten(ScopeRef { doc: r.doc, id: body }),
                    None => MemberAction::Skip,
                };
            }
            SymbolKind::Typedef { .. } | SymbolKind::Enum { .. } | SymbolKind::Class(_)
                if !static_lookup =>
            {
                return MemberAction::Skip;
            }
            _ => {}
        }
        if sym.visibility == Visibility::Public {
            MemberAction::Add(PUBLIC_CLASS_MEMBER_ORDER)
        } else {
            MemberAction::Add(0)
        }
    }

    // ─── Global completion ──────────────────────────────────────────────

    /// Everything visible from `scope`: locals, parameters, members of the
    /// enclosing classes and namespaces (with their using-directives),
    /// then keywords, macros and snippets.
    fn global_completion(&mut self, scope: ScopeRef) {
        if self.request.trigger == TriggerKind::ColonColon {
            let global = self.ctx.global_namespace();
            self.complete_namespace(&global);
            return;
        }

        let mut using_bindings: Vec<Binding> = Vec::new();
        let mut current_binding: Option<Binding> = None;

        // Enumerators, using-directives and anonymous aggregates of the
        // enclosing blocks; stop at the first named context.
        let mut current = Some(scope);
        while let Some(s) = current {
            match self.ctx.scope(s).kind {
                ScopeKind::Block => {
                    let members: Vec<SymbolRef> = self.ctx.members(s).map(|(r, _)| r).collect();
                    for r in members {
                        self.add_block_extras(r, s, &mut using_bindings);
                    }
                }
                ScopeKind::Function
                | ScopeKind::Class
                | ScopeKind::Enum
                | ScopeKind::Namespace
                | ScopeKind::Global => {
                    current_binding = self.ctx.binding_for_scope(s);
                    break;
                }
            }
            current = self.ctx.parent_scope(s);
        }

        // Locals, then parameters.
        let mut current = Some(scope);
        while let Some(s) = current {
            match self.ctx.scope(s).kind {
                ScopeKind::Block => self.add_scope_members(s, FUNCTION_LOCALS_ORDER),
                ScopeKind::Function => self.add_scope_members(s, FUNCTION_ARGUMENTS_ORDER),
                _ => break,
            }
            current = self.ctx.parent_scope(s);
        }

        let mut processed: Vec<Vec<ScopeRef>> = Vec::new();
        while let Some(b) = current_binding {
            if processed.contains(&b.scopes) {
                break;
            }
            processed.push(b.scopes.clone());
            if b.kind == BindingKind::Class {
                self.complete_class(&b, true);
            } else {
                using_bindings.extend(self.ctx.usings(&b));
                self.complete_namespace(&b);
            }
            current_binding = self.ctx.parent(&b);
        }

        for b in &using_bindings {
            self.complete_namespace(b);
        }

        self.add_keywords();
        self.add_macros();
        self.add_snippets();
    }

    fn add_block_extras(&mut self, r: SymbolRef, block: ScopeRef, using_bindings: &mut Vec<Binding>) {
        let sym = self.ctx.symbol(r);
        match &sym.kind {
            SymbolKind::Enum { body, scoped } if !*scoped || sym.name.is_none() => {
                let body = ScopeRef {
                    doc: r.doc,
                    id: *body,
                };
                self.add_scope_members(body, 0);
            }
            SymbolKind::UsingDirective { target } => {
                if let Some(b) = self.ctx.lookup_type(target, block) {
                    using_bindings.push(b);
                }
            }
            SymbolKind::Class(info) if sym.name.is_none() => {
                if let Some(body) = info.body {
                    let body = ScopeRef { doc: r.doc, id: body };
                    self.add_class_members(body, true);
                }
            }
            _ => {}
        }
    }

    fn add_keywords(&mut self) {
        let mut words: Vec<&str> = lexer::CPP_KEYWORDS.to_vec();
        words.extend_from_slice(static_lists::CONTEXTUAL_KEYWORDS);
        if self.settings.qt_keywords {
            words.extend_from_slice(static_lists::QT_KEYWORDS);
        }
        if self.objc() {
            words.extend_from_slice(static_lists::OBJC_KEYWORDS);
        }
        self.candidates.extend(
            words
                .into_iter()
                .map(|w| Candidate::new(w, CandidateKind::Keyword).with_order(KEYWORDS_ORDER)),
        );
    }

    fn add_macros(&mut self) {
        let mut names: BTreeSet<String> = self
            .settings
            .predefined_macro_names()
            .map(str::to_string)
            .collect();
        for doc in self.ctx.documents() {
            names.extend(doc.macros().iter().map(|m| m.name.to_string()));
        }
        self.candidates.extend(
            names
                .into_iter()
                .map(|n| Candidate::new(n, CandidateKind::Macro).with_order(MACROS_ORDER)),
        );
    }

    fn add_snippets(&mut self) {
        let settings = self.settings;
        for snippet in &settings.snippets {
            let mut candidate = Candidate::new(snippet.trigger.as_str(), CandidateKind::Snippet);
            candidate.template = Some(snippet.body.clone());
            candidate.detail = snippet.description.clone();
            self.candidates.push(candidate);
        }
    }

    // ─── Candidates ─────────────────────────────────────────────────────

    pub(super) fn add_scope_members(&mut self, scope: ScopeRef, order: i32) {
        let members: Vec<SymbolRef> = self.ctx.members(scope).map(|(r, _)| r).collect();
        for r in members {
            self.add_symbol(r, order);
        }
    }

    /// Add a named declaration.  Out-of-line definitions (`Foo::bar`) are
    /// reached through their class instead.
    pub(super) fn add_symbol(&mut self, r: SymbolRef, order: i32) {
        let sym = self.ctx.symbol(r);
        let Some(name) = sym.name else {
            return;
        };
        if sym.has_qualified_name() || matches!(sym.kind, SymbolKind::Friend) {
            return;
        }
        let candidate = Candidate::new(name.as_str(), CandidateKind::Symbol)
            .with_symbol(r)
            .with_order(order)
            .with_detail(symbol_detail(sym));
        self.candidates.push(candidate);
    }
}
