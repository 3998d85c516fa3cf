/// Completion after `(` and `,`.
///
/// A call gets one hint per overload, with the argument under the cursor
/// highlighted.  When the line up to the parenthesis parses as a function
/// declaration at namespace or class scope (`void Widget::resize(`), the
/// user is writing a definition instead, and the remaining signature of
/// each overload is offered as a candidate (`int w, int h)`).
use std::collections::HashSet;

use crate::frontend::lookup::{BindingKind, LookupItem};
use crate::frontend::overview::{Overview, symbol_detail};
use crate::frontend::parser::is_function_declaration;
use crate::frontend::symbols::{FunctionInfo, ScopeKind, SymbolRef, Ty};
use crate::types::{Candidate, CandidateKind, FunctionHint};
use crate::util;

use super::engine::Completer;
use super::expression_under_cursor::argument_index;

impl Completer<'_> {
    /// Offer hints or signature candidates for the functions `results`
    /// name.  With `tooltip_only`, never offer signatures.
    ///
    /// Returns whether any function was found.
    pub(super) fn complete_constructor_or_function(
        &mut self,
        results: &[LookupItem],
        tooltip_only: bool,
    ) -> bool {
        let functions = self.callable_functions(results);
        if functions.is_empty() {
            return false;
        }

        if !tooltip_only && self.writing_declaration() {
            let overview = Overview {
                show_return_type: false,
                show_argument_names: true,
                show_default_values: false,
            };
            for &r in &functions {
                let sym = self.ctx.symbol(r);
                let Some(f) = sym.as_function() else {
                    continue;
                };
                let list = overview.parameter_list(f);
                let rest = &list[1..];
                if rest == ")" {
                    continue;
                }
                let candidate = Candidate::new(rest, CandidateKind::FunctionSignature)
                    .with_symbol(r)
                    .with_detail(symbol_detail(sym));
                self.candidates.push(candidate);
            }
            return true;
        }

        let active_parameter = argument_index(
            self.text,
            self.request.expression_end + 1,
            self.request.cursor,
        );
        let overview = Overview::full();
        for &r in &functions {
            let sym = self.ctx.symbol(r);
            let Some(f) = sym.as_function() else {
                continue;
            };
            self.hints.push(FunctionHint {
                label: overview.function(sym.name_str(), f),
                parameters: f.params.iter().map(|p| overview.parameter(p)).collect(),
                active_parameter,
            });
        }
        true
    }

    /// Constructors of a named class, else the overloads of the named
    /// function, else the `operator()` of the object's class.
    fn callable_functions(&self, results: &[LookupItem]) -> Vec<SymbolRef> {
        let constructors = self.constructors(results);
        if !constructors.is_empty() {
            return constructors;
        }

        let mut functions: Vec<SymbolRef> = Vec::new();
        let mut signatures: HashSet<String> = HashSet::new();
        let mut first_path = None;
        for item in results {
            let Ty::Symbol(r) = &item.ty.ty else {
                continue;
            };
            let r = *r;
            let sym = self.ctx.symbol(r);
            let Some(f) = sym.as_function() else {
                continue;
            };
            if sym.name.is_none() {
                continue;
            }
            // A declaration hidden by one in an inner scope.
            let path = self.ctx.scope_path(self.ctx.scope_of(r));
            match &first_path {
                None => first_path = Some(path),
                Some(first) if *first != path => continue,
                Some(_) => {}
            }
            if signatures.insert(signature_key(f)) {
                functions.push(r);
            }
        }
        if !functions.is_empty() {
            return functions;
        }

        for item in results {
            let Some(class) = self
                .ctx
                .class_binding(&item.ty, item.scope, item.binding.as_ref())
            else {
                continue;
            };
            for op in self.ctx.find_members(&class, "operator()") {
                if let Some(decl) = op.declaration
                    && self.ctx.symbol(decl).as_function().is_some()
                {
                    functions.push(decl);
                }
            }
        }
        functions
    }

    fn constructors(&self, results: &[LookupItem]) -> Vec<SymbolRef> {
        let mut out = Vec::new();
        for item in results {
            let Some(decl) = item.declaration else {
                continue;
            };
            if !self.ctx.symbol(decl).is_type_like() {
                continue;
            }
            let Some(class) = self
                .ctx
                .class_binding(&item.ty, item.scope, item.binding.as_ref())
                .filter(|b| b.kind == BindingKind::Class)
            else {
                continue;
            };
            let Some(name) = class.path.last() else {
                continue;
            };
            for &scope in &class.scopes {
                for (r, sym) in self.ctx.members(scope) {
                    if sym.as_function().is_some()
                        && sym.is_named(name)
                        && !sym.has_qualified_name()
                    {
                        out.push(r);
                    }
                }
            }
            break;
        }
        out
    }

    /// Whether the line up to the `(` is a function declaration written at
    /// namespace or class scope.
    fn writing_declaration(&self) -> bool {
        let (line, column) = util::line_and_column(self.text, self.request.cursor);
        let cursor_scope = self.ctx.scope_at(line, column);
        if !matches!(
            self.ctx.scope(cursor_scope).kind,
            ScopeKind::Global | ScopeKind::Namespace | ScopeKind::Class
        ) {
            return false;
        }
        let end = self.request.expression_end;
        let start = util::line_start(self.text, end);
        let head = self.text[start..end].trim();
        !head.is_empty() && is_function_declaration(&format!("{head}();"))
    }
}

/// Parameter types and qualifiers; two declarations with equal keys are
/// the same overload.
fn signature_key(f: &FunctionInfo) -> String {
    let types: Vec<String> = f.params.iter().map(|p| p.ty.pretty()).collect();
    format!("{}|{}|{}", types.join(","), f.is_const, f.is_variadic)
}
