/// Qt signal and slot completion.
///
/// Qt 4 connections name methods inside `SIGNAL(...)` / `SLOT(...)` by
/// their normalized signature, so each signal or slot is offered as
/// `name(type,type)`; a method with default arguments is offered once per
/// callable arity.  Qt 5 connections use member pointers
/// (`&Sender::valueChanged`): after `&` the sender's class name is
/// offered, after `&Class::` the bare method names.
use std::collections::HashSet;

use crate::frontend::lookup::{Binding, BindingKind, LookupItem};
use crate::frontend::overview::{qt_normalized_signature, symbol_detail};
use crate::frontend::symbols::{QtMethodKind, ScopeRef, SymbolRef, Ty};
use crate::types::{Candidate, CandidateKind, TriggerKind};

use super::engine::{Completer, PUBLIC_CLASS_MEMBER_ORDER};

impl Completer<'_> {
    pub(super) fn complete_qt_method(&mut self, results: &[LookupItem]) {
        let trigger = self.request.trigger;
        let qt5 = matches!(trigger, TriggerKind::Qt5Signal | TriggerKind::Qt5Slot);
        let Some(class) = self.qt_class(results, qt5) else {
            return;
        };

        let mut stack = vec![class];
        let mut processed: Vec<Vec<ScopeRef>> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut found: Vec<Candidate> = Vec::new();
        while let Some(b) = stack.pop() {
            if processed.contains(&b.scopes) {
                continue;
            }
            processed.push(b.scopes.clone());
            stack.extend(self.ctx.usings(&b));

            for &scope in &b.scopes {
                let members: Vec<SymbolRef> = self.ctx.members(scope).map(|(r, _)| r).collect();
                for r in members {
                    let sym = self.ctx.symbol(r);
                    let (Some(name), Some(f)) = (sym.name, sym.as_function()) else {
                        continue;
                    };
                    let wanted = match trigger {
                        TriggerKind::Signal | TriggerKind::Qt5Signal => f.qt == QtMethodKind::Signal,
                        TriggerKind::Slot => f.qt == QtMethodKind::Slot,
                        // Any member function can be connected to in Qt 5.
                        TriggerKind::Qt5Slot => !f.is_destructor,
                        _ => false,
                    };
                    if !wanted {
                        continue;
                    }
                    let order = if trigger == TriggerKind::Qt5Slot && f.qt == QtMethodKind::Slot {
                        PUBLIC_CLASS_MEMBER_ORDER
                    } else {
                        0
                    };

                    let mut texts = Vec::new();
                    if qt5 {
                        texts.push(name.to_string());
                    } else {
                        let mut count = f.params.len();
                        loop {
                            texts.push(qt_normalized_signature(&name, &f.params[..count]));
                            if count == 0 || f.params[count - 1].default_value.is_none() {
                                break;
                            }
                            count -= 1;
                        }
                    }
                    for text in texts {
                        if seen.insert(text.clone()) {
                            found.push(
                                Candidate::new(text, CandidateKind::Symbol)
                                    .with_symbol(r)
                                    .with_order(order)
                                    .with_detail(symbol_detail(sym)),
                            );
                        }
                    }
                }
            }
        }
        self.candidates.extend(found);
    }

    /// `connect(sender, &`: the class of `sender`, qualified as needed
    /// from the cursor's namespace, followed by `::`.
    pub(super) fn complete_qt5_class_name(&mut self, expression: &str, scope: ScopeRef) {
        let results = self.ctx.resolve_expression(expression, scope);
        let Some(class) = self.qt_class(&results, true) else {
            return;
        };
        let caller = self.ctx.scope_path(scope);
        let common = class
            .path
            .iter()
            .zip(&caller)
            .take_while(|(a, b)| a == b)
            .count()
            .min(class.path.len().saturating_sub(1));
        let segments: Vec<&str> = class.path[common..].iter().map(|s| s.as_str()).collect();
        if segments.is_empty() {
            return;
        }
        let mut candidate = Candidate::new(format!("{}::", segments.join("::")), CandidateKind::Symbol);
        if let Some(symbol) = class.symbol {
            candidate = candidate.with_symbol(symbol);
        }
        self.candidates.push(candidate);
    }

    /// The class a connection argument refers to.  Qt 4 needs a pointer to
    /// a class; Qt 5 member pointers also name the class directly.
    fn qt_class(&self, results: &[LookupItem], accept_class: bool) -> Option<Binding> {
        for item in results {
            let binding = item.binding.as_ref();
            let (ty, scope) = self.ctx.resolve_typedefs(&item.ty, item.scope, binding);
            let target = match &ty.ty {
                Ty::Pointer(inner) => inner.as_ref().clone(),
                _ if accept_class => ty.clone(),
                _ => continue,
            };
            if let Some(b) = self.ctx.class_binding(&target, scope, binding)
                && b.kind == BindingKind::Class
            {
                return Some(b);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use crate::completion::engine::start_completion;
    use crate::completion::ranking::texts;
    use crate::config::CompletionSettings;
    use crate::frontend::snapshot::Snapshot;
    use crate::types::TriggerKind;

    const OBJECT: &str = "class Base {\nQ_SIGNALS:\n    void baseSignal1();\npublic Q_SLOTS:\n    void f(int a, int b = 0);\n};\nclass Derived : public Base {\nQ_SIGNALS:\n    void derivedSignal1();\n    void valueChanged(int v);\n};\n";

    fn complete(body: &str) -> (TriggerKind, Vec<String>) {
        let src = format!("{OBJECT}void run(Derived *obj) {{\n    {body}\n}}\n");
        let cursor = src.find('|').expect("cursor marker");
        let text = src.replacen('|', "", 1);
        let proposal = start_completion(
            &Snapshot::new(),
            &CompletionSettings::default(),
            Path::new("/t/qt.cpp"),
            &text,
            cursor,
        )
        .expect("proposal");
        let names = texts(&proposal.candidates)
            .into_iter()
            .map(str::to_string)
            .collect();
        (proposal.request.trigger, names)
    }

    #[test]
    fn test_signals_include_inherited_ones() {
        let (trigger, names) = complete("connect(obj, SIGNAL(|");
        assert_eq!(trigger, TriggerKind::Signal);
        assert_eq!(
            names,
            vec!["baseSignal1()", "derivedSignal1()", "valueChanged(int)"]
        );
    }

    #[test]
    fn test_slot_with_default_argument_yields_two_signatures() {
        let (trigger, names) = complete("connect(obj, SIGNAL(valueChanged(int)), obj, SLOT(|");
        assert_eq!(trigger, TriggerKind::Slot);
        assert_eq!(names, vec!["f(int)", "f(int,int)"]);
    }

    #[test]
    fn test_qt5_class_name_then_members() {
        let (trigger, names) = complete("connect(obj, &|");
        assert_eq!(trigger, TriggerKind::Qt5SignalOrSlotClassName);
        assert_eq!(names, vec!["Derived::"]);

        let (trigger, names) = complete("connect(obj, &Derived::|");
        assert_eq!(trigger, TriggerKind::Qt5Signal);
        assert_eq!(names, vec!["baseSignal1", "derivedSignal1", "valueChanged"]);
    }
}
