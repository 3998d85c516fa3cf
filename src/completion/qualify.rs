/// Ordering of qualified-name proposals.
///
/// When a name is not visible from the cursor, the classes carrying that
/// name elsewhere in the snapshot are proposed with the qualification
/// needed to reach them.  Proposals are grouped by namespace distance
/// (how many segments have to be written), exact name matches first.
use std::collections::{BTreeMap, BTreeSet};

use crate::frontend::document::Document;
use crate::frontend::snapshot::Snapshot;
use crate::frontend::symbols::{ScopeId, ScopeKind, SymbolId, SymbolKind};

/// One qualified-name proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedProposal {
    /// Fully qualified name, `a::b::Name`.
    pub qualified: String,
    /// What to write at the cursor, relative to the caller's namespace.
    pub text: String,
    pub distance: usize,
}

/// Segments of `candidate` (its enclosing namespaces and classes) that are
/// not shared with `caller`.
///
/// A configured alias for exactly the candidate's namespace replaces those
/// segments with one.
pub fn namespace_distance(
    candidate: &[String],
    caller: &[String],
    aliases: &BTreeMap<String, String>,
) -> (usize, Vec<String>) {
    let joined = candidate.join("::");
    if let Some(alias) = aliases.get(&joined) {
        return (1, vec![alias.clone()]);
    }
    let common = candidate
        .iter()
        .zip(caller)
        .take_while(|(a, b)| a == b)
        .count();
    let rest = candidate[common..].to_vec();
    (rest.len(), rest)
}

/// Build a proposal for `name` declared in `path`, seen from `caller`.
pub fn proposal(
    path: &[String],
    name: &str,
    caller: &[String],
    aliases: &BTreeMap<String, String>,
) -> QualifiedProposal {
    let (distance, prefix) = namespace_distance(path, caller, aliases);
    let mut qualified = path.to_vec();
    qualified.push(name.to_string());
    let mut text = prefix;
    text.push(name.to_string());
    QualifiedProposal {
        qualified: qualified.join("::"),
        text: text.join("::"),
        distance,
    }
}

/// Order proposals: every distance tier's exact matches (text ending in
/// the typed symbol), nearest tier first, then every tier's other matches.
/// Each partition is alphabetical.
pub fn order_proposals(proposals: Vec<QualifiedProposal>, typed: &str) -> Vec<QualifiedProposal> {
    let mut tiers: BTreeMap<usize, (Vec<QualifiedProposal>, Vec<QualifiedProposal>)> =
        BTreeMap::new();
    for p in proposals {
        let exact = p.text.ends_with(typed);
        let tier = tiers.entry(p.distance).or_default();
        if exact {
            tier.0.push(p);
        } else {
            tier.1.push(p);
        }
    }
    let mut exact_all = Vec::new();
    let mut other_all = Vec::new();
    for (_, (mut exact, mut other)) in tiers {
        exact.sort_by(|a, b| a.text.cmp(&b.text));
        other.sort_by(|a, b| a.text.cmp(&b.text));
        exact_all.extend(exact);
        other_all.extend(other);
    }
    exact_all.extend(other_all);
    exact_all
}

/// Classes across the snapshot whose name starts with `typed` (ignoring
/// case), as ordered proposals relative to the caller's namespace path.
pub fn class_proposals(
    snapshot: &Snapshot,
    typed: &str,
    caller: &[String],
    aliases: &BTreeMap<String, String>,
) -> Vec<QualifiedProposal> {
    let lower = typed.to_lowercase();
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut proposals = Vec::new();
    for doc in snapshot.documents() {
        for i in 0..doc.symbol_count() {
            let sym = doc.symbol(SymbolId(i as u32));
            let SymbolKind::Class(info) = &sym.kind else {
                continue;
            };
            let Some(name) = sym.name else {
                continue;
            };
            if info.body.is_none() || !name.to_lowercase().starts_with(&lower) {
                continue;
            }
            let Some(path) = named_path(doc, sym.scope) else {
                continue;
            };
            let p = proposal(&path, &name, caller, aliases);
            if seen.insert(p.qualified.clone()) {
                proposals.push(p);
            }
        }
    }
    order_proposals(proposals, typed)
}

/// Enclosing namespace and class names; `None` inside functions and
/// anonymous scopes, whose classes cannot be named from outside.
fn named_path(doc: &Document, scope: ScopeId) -> Option<Vec<String>> {
    let mut path = Vec::new();
    for id in doc.scope_chain(scope) {
        let s = doc.scope(id);
        match s.kind {
            ScopeKind::Global => {}
            ScopeKind::Namespace | ScopeKind::Class => {
                let owner = s.owner?;
                match doc.symbol(owner).name {
                    Some(name) => path.push(name.to_string()),
                    // Anonymous namespaces are transparent.
                    None if s.kind == ScopeKind::Namespace => {}
                    None => return None,
                }
            }
            ScopeKind::Function | ScopeKind::Block | ScopeKind::Enum => return None,
        }
    }
    path.reverse();
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segs(path: &str) -> Vec<String> {
        path.split("::")
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_distance_counts_unshared_segments() {
        let aliases = BTreeMap::new();
        assert_eq!(namespace_distance(&segs("a::b"), &segs("a"), &aliases).0, 1);
        assert_eq!(namespace_distance(&segs("a::b"), &segs("c"), &aliases).0, 2);
        assert_eq!(namespace_distance(&segs(""), &segs("c"), &aliases).0, 0);
    }

    #[test]
    fn test_alias_collapses_distance() {
        let mut aliases = BTreeMap::new();
        aliases.insert("very::long::ns".to_string(), "vln".to_string());
        let p = proposal(&segs("very::long::ns"), "Widget", &[], &aliases);
        assert_eq!(p.distance, 1);
        assert_eq!(p.text, "vln::Widget");
        assert_eq!(p.qualified, "very::long::ns::Widget");
    }

    #[test]
    fn test_exact_matches_of_every_tier_come_first() {
        let aliases = BTreeMap::new();
        let caller = segs("app");
        let proposals = vec![
            proposal(&segs("x::y"), "Widget", &caller, &aliases),
            proposal(&segs("app"), "WidgetBase", &caller, &aliases),
            proposal(&segs("gui"), "Widget", &caller, &aliases),
            proposal(&segs("app"), "Widget", &caller, &aliases),
            proposal(&segs("core"), "WidgetList", &caller, &aliases),
        ];
        let ordered = order_proposals(proposals, "Widget");
        let texts: Vec<&str> = ordered.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "Widget",
                "gui::Widget",
                "x::y::Widget",
                "WidgetBase",
                "core::WidgetList"
            ]
        );
    }

    #[test]
    fn test_exact_match_is_a_plain_suffix() {
        let aliases = BTreeMap::new();
        let proposals = vec![
            proposal(&segs("ui"), "ListView", &[], &aliases),
            proposal(&segs("ui"), "ViewModel", &[], &aliases),
            proposal(&segs("ui"), "View", &[], &aliases),
        ];
        let ordered = order_proposals(proposals, "View");
        let texts: Vec<&str> = ordered.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["ui::ListView", "ui::View", "ui::ViewModel"]);
    }
}
