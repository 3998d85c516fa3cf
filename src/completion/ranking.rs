/// Ordering, de-duplication and incremental filtering of candidates.
///
/// The engine emits candidates in scope-walk order.  When an operator
/// triggered the cycle the list is sorted by presentation order and name;
/// plain identifier completion keeps the scope-walk order so that, after
/// de-duplication, the innermost declaration of a name is the one kept.
use std::collections::{HashMap, HashSet};

use crate::config::CaseSensitivity;
use crate::frontend::lookup::LookupContext;
use crate::types::{Candidate, CandidateKind, TriggerKind};

/// Sort (if an operator is active) and de-duplicate a raw list.
pub fn finalize(
    mut candidates: Vec<Candidate>,
    trigger: TriggerKind,
    ctx: &LookupContext,
) -> Vec<Candidate> {
    if trigger != TriggerKind::None {
        sort_candidates(&mut candidates);
    }
    dedup(candidates, ctx)
}

/// Stable sort by descending order, then case-insensitive text.
pub fn sort_candidates(candidates: &mut [Candidate]) {
    candidates.sort_by_cached_key(|c| (std::cmp::Reverse(c.order), c.text.to_lowercase()));
}

/// Drop later candidates whose text equals an earlier one.
///
/// Snippets are never dropped and never shadow anything.  Dropping a
/// function that takes arguments marks the kept candidate as overloaded.
pub fn dedup(candidates: Vec<Candidate>, ctx: &LookupContext) -> Vec<Candidate> {
    let mut kept: Vec<Candidate> = Vec::with_capacity(candidates.len());
    let mut index_of: HashMap<String, usize> = HashMap::new();
    for candidate in candidates {
        if candidate.kind == CandidateKind::Snippet {
            kept.push(candidate);
            continue;
        }
        match index_of.get(&candidate.text) {
            Some(&i) => {
                let takes_arguments = candidate
                    .symbol
                    .and_then(|r| ctx.symbol(r).as_function().map(|f| f.has_arguments()))
                    .unwrap_or(false);
                if takes_arguments {
                    kept[i].duplicate_count += 1;
                }
            }
            None => {
                index_of.insert(candidate.text.clone(), kept.len());
                kept.push(candidate);
            }
        }
    }
    kept
}

/// Whether `text` matches the typed `prefix`, allowing camel-case and
/// underscore abbreviations (`gFN` and `g_f_n` both match
/// `getFileName`/`get_file_name`).
pub fn matches(prefix: &str, text: &str, case: CaseSensitivity) -> bool {
    let pattern: Vec<char> = prefix.chars().collect();
    let text: Vec<char> = text.chars().collect();
    match_from(&pattern, &text, 0, 0, case)
}

#[derive(Clone, Copy)]
enum Continuation {
    /// `[a-z0-9_]*` before an upper-case letter.
    Upper,
    /// An optional `[A-Za-z0-9]*_` before a lower-case letter.
    Lower,
}

fn match_from(p: &[char], t: &[char], pi: usize, ti: usize, case: CaseSensitivity) -> bool {
    let Some(&c) = p.get(pi) else {
        return true;
    };
    let first = pi == 0;
    let insensitive = match case {
        CaseSensitivity::Insensitive => true,
        CaseSensitivity::FirstLetter => !first,
        CaseSensitivity::Full => false,
    };
    let mut alternatives: Vec<(Continuation, char)> = Vec::with_capacity(2);
    if insensitive {
        alternatives.extend(c.to_uppercase().next().map(|u| (Continuation::Upper, u)));
        alternatives.extend(c.to_lowercase().next().map(|l| (Continuation::Lower, l)));
    } else if c.is_uppercase() {
        alternatives.push((Continuation::Upper, c));
    } else {
        alternatives.push((Continuation::Lower, c));
    }

    for (continuation, target) in alternatives {
        if first {
            if t.get(ti) == Some(&target) && match_from(p, t, pi + 1, ti + 1, case) {
                return true;
            }
            continue;
        }
        match continuation {
            Continuation::Upper => {
                let mut k = ti;
                while let Some(&ch) = t.get(k) {
                    if ch == target && match_from(p, t, pi + 1, k + 1, case) {
                        return true;
                    }
                    if !(ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_') {
                        break;
                    }
                    k += 1;
                }
            }
            Continuation::Lower => {
                if t.get(ti) == Some(&target) && match_from(p, t, pi + 1, ti + 1, case) {
                    return true;
                }
                let mut j = ti;
                while t.get(j).is_some_and(|ch| ch.is_ascii_alphanumeric()) {
                    j += 1;
                }
                if t.get(j) == Some(&'_')
                    && t.get(j + 1) == Some(&target)
                    && match_from(p, t, pi + 1, j + 2, case)
                {
                    return true;
                }
            }
        }
    }
    false
}

/// Narrow `candidates` to those matching `typed`, best matches first.
///
/// Candidates starting with the typed text (ignoring case, then exactly)
/// come first, then higher presentation order, then name.  A lone
/// candidate equal to the typed text leaves nothing to offer.
pub fn filter(candidates: &[Candidate], typed: &str, case: CaseSensitivity) -> Vec<Candidate> {
    if typed.is_empty() {
        return candidates.to_vec();
    }
    let lower_typed = typed.to_lowercase();
    let mut out: Vec<Candidate> = candidates
        .iter()
        .filter(|c| matches(typed, &c.text, case))
        .cloned()
        .collect();
    out.sort_by_cached_key(|c| {
        let lower = c.text.to_lowercase();
        (
            !lower.starts_with(&lower_typed),
            !c.text.starts_with(typed),
            std::cmp::Reverse(c.order),
            lower,
            c.text.clone(),
        )
    });
    if out.len() == 1 && out[0].text == typed {
        out.clear();
    }
    out
}

/// Names of candidates, in order; handy in assertions and logs.
pub fn texts(candidates: &[Candidate]) -> Vec<&str> {
    candidates.iter().map(|c| c.text.as_str()).collect()
}

/// Whether the list contains the same non-snippet text twice.
pub fn has_duplicates(candidates: &[Candidate]) -> bool {
    let mut seen = HashSet::new();
    candidates
        .iter()
        .filter(|c| c.kind != CandidateKind::Snippet)
        .any(|c| !seen.insert(c.text.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn ctx() -> LookupContext {
        let doc = crate::frontend::parser::parse_document(
            std::path::Path::new("/t/empty.cpp"),
            "",
            Default::default(),
        );
        LookupContext::from_documents(vec![Arc::new(doc)])
    }

    fn keyword(text: &str) -> Candidate {
        Candidate::new(text, CandidateKind::Keyword)
    }

    #[test]
    fn test_camel_and_underscore_humps() {
        let case = CaseSensitivity::FirstLetter;
        assert!(matches("gFN", "getFileName", case));
        assert!(matches("gfn", "getFileName", case));
        assert!(matches("g_f_n", "get_file_name", case));
        assert!(matches("gfn", "get_file_name", case));
        assert!(!matches("Gfn", "getFileName", case));
        assert!(matches("Gfn", "getFileName", CaseSensitivity::Insensitive));
        assert!(!matches("getfile", "getFileName", CaseSensitivity::Full));
        assert!(matches("getF", "getFileName", CaseSensitivity::Full));
        assert!(!matches("xyz", "getFileName", case));
    }

    #[test]
    fn test_exact_prefix_ranks_first() {
        let list = vec![keyword("a_b_c"), keyword("a_c_a"), keyword("a_c")];
        let out = filter(&list, "a_c", CaseSensitivity::FirstLetter);
        assert_eq!(texts(&out), vec!["a_c", "a_c_a", "a_b_c"]);
    }

    #[test]
    fn test_single_exact_match_is_suppressed() {
        let list = vec![keyword("value"), keyword("other")];
        assert!(filter(&list, "value", CaseSensitivity::FirstLetter).is_empty());
        assert_eq!(filter(&list, "val", CaseSensitivity::FirstLetter).len(), 1);
    }

    #[test]
    fn test_dedup_keeps_first_and_all_snippets() {
        let snippet = |t: &str| Candidate::new(t, CandidateKind::Snippet);
        let list = vec![
            keyword("x").with_order(2),
            snippet("for"),
            keyword("x"),
            keyword("for"),
            snippet("for"),
        ];
        let out = dedup(list, &ctx());
        assert_eq!(texts(&out), vec!["x", "for", "for", "for"]);
        assert_eq!(out[0].order, 2);
        assert!(!has_duplicates(&out));
    }

    #[test]
    fn test_sort_is_stable_by_order_then_name() {
        let mut list = vec![
            keyword("beta"),
            keyword("Alpha").with_order(-2),
            keyword("alpha"),
            keyword("gamma").with_order(1),
        ];
        sort_candidates(&mut list);
        assert_eq!(texts(&list), vec!["gamma", "alpha", "beta", "Alpha"]);
    }
}
