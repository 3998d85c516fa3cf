/// Fixed candidate lists: preprocessor directives, Doxygen commands and
/// the keyword sets offered by global completion.
use crate::types::{Candidate, CandidateKind};

/// Directives offered after `#`.
pub const PREPROCESSOR_DIRECTIVES: &[&str] = &[
    "define",
    "error",
    "include",
    "line",
    "pragma",
    "pragma once",
    "pragma omp atomic",
    "pragma omp parallel",
    "pragma omp for",
    "pragma omp ordered",
    "pragma omp parallel for",
    "pragma omp section",
    "pragma omp sections",
    "pragma omp parallel sections",
    "pragma omp single",
    "pragma omp master",
    "pragma omp critical",
    "pragma omp barrier",
    "pragma omp flush",
    "pragma omp threadprivate",
    "undef",
    "if",
    "ifdef",
    "ifndef",
    "elif",
    "else",
    "endif",
];

/// Commands offered after `\` or `@` in a documentation comment.
pub const DOXYGEN_TAGS: &[&str] = &[
    "a", "abstract", "addindex", "addtogroup", "anchor", "arg", "attention", "author", "b",
    "badcode", "brief", "bug", "c", "callgraph", "callergraph", "category", "class", "code",
    "cond", "copybrief", "copydetails", "copydoc", "copyright", "date", "def", "defgroup",
    "deprecated", "details", "dir", "dontinclude", "dot", "dotfile", "e", "else", "elseif", "em",
    "endcode", "endcond", "enddot", "endhtmlonly", "endif", "endinternal", "endlatexonly",
    "endlink", "endmanonly", "endmsc", "endrtfonly", "endverbatim", "endxmlonly", "enum",
    "example", "exception", "extends", "file", "fn", "headerfile", "hideinitializer",
    "htmlinclude", "htmlonly", "if", "ifnot", "image", "implements", "include", "includelineno",
    "ingroup", "interface", "internal", "invariant", "latexonly", "li", "line", "link",
    "mainpage", "manonly", "memberof", "msc", "n", "name", "namespace", "nosubgrouping", "note",
    "overload", "p", "package", "page", "par", "paragraph", "param", "post", "pre", "private",
    "privatesection", "property", "protected", "protectedsection", "protocol", "public",
    "publicsection", "ref", "related", "relatedalso", "relates", "relatesalso", "remark",
    "remarks", "result", "return", "returns", "retval", "rtfonly", "sa", "section", "see",
    "short", "showinitializer", "since", "skip", "skipline", "snippet", "struct", "subpage",
    "subsection", "subsubsection", "test", "throw", "throws", "todo", "tparam", "typedef",
    "union", "until", "var", "verbatim", "verbinclude", "version", "warning", "weakgroup",
    "xmlonly", "xrefitem",
];

/// Qt's keyword-like macros, offered when Qt keywords are enabled.
pub const QT_KEYWORDS: &[&str] = &[
    "Q_D",
    "Q_EMIT",
    "Q_ENUMS",
    "Q_FLAGS",
    "Q_FOREACH",
    "Q_GADGET",
    "Q_INVOKABLE",
    "Q_OBJECT",
    "Q_PROPERTY",
    "Q_Q",
    "Q_SIGNAL",
    "Q_SIGNALS",
    "Q_SLOT",
    "Q_SLOTS",
    "emit",
    "foreach",
    "signals",
    "slots",
];

/// Contextual identifiers completed like keywords.
pub const CONTEXTUAL_KEYWORDS: &[&str] = &["final", "override"];

/// Objective-C `@` keywords and common identifiers.
pub const OBJC_KEYWORDS: &[&str] = &[
    "@catch",
    "@class",
    "@compatibility_alias",
    "@defs",
    "@dynamic",
    "@encode",
    "@end",
    "@finally",
    "@implementation",
    "@interface",
    "@optional",
    "@package",
    "@private",
    "@property",
    "@protected",
    "@protocol",
    "@public",
    "@required",
    "@selector",
    "@synchronized",
    "@synthesize",
    "@throw",
    "@try",
    "BOOL",
    "NO",
    "YES",
    "id",
    "nil",
];

pub fn preprocessor_candidates(objc: bool) -> Vec<Candidate> {
    let mut out: Vec<Candidate> = PREPROCESSOR_DIRECTIVES
        .iter()
        .map(|d| Candidate::new(*d, CandidateKind::PreprocessorDirective))
        .collect();
    if objc {
        out.push(Candidate::new("import", CandidateKind::PreprocessorDirective));
    }
    out
}

pub fn doxygen_candidates() -> Vec<Candidate> {
    DOXYGEN_TAGS
        .iter()
        .map(|t| Candidate::new(*t, CandidateKind::Keyword))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_only_for_objc() {
        let plain = preprocessor_candidates(false);
        assert!(plain.iter().all(|c| c.text != "import"));
        assert!(plain.iter().any(|c| c.text == "pragma once"));
        let objc = preprocessor_candidates(true);
        assert_eq!(objc.len(), plain.len() + 1);
    }

    #[test]
    fn test_doxygen_list_has_common_commands() {
        let tags = doxygen_candidates();
        for wanted in ["brief", "param", "return", "todo"] {
            assert!(tags.iter().any(|c| c.text == wanted), "missing {wanted}");
        }
    }
}
