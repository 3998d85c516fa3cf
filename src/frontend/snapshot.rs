/// Immutable set of parsed documents published for completion.
///
/// A completion cycle reads one snapshot for its whole duration; edits and
/// background indexing publish a *new* snapshot (copy-on-write over the
/// `Arc<Document>` map), so readers never observe a partially updated
/// symbol table.
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::document::{Document, Include, IncludeKind};

#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    revision: u64,
    documents: HashMap<PathBuf, Arc<Document>>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn document(&self, path: &Path) -> Option<&Arc<Document>> {
        self.documents.get(path)
    }

    pub fn documents(&self) -> impl Iterator<Item = &Arc<Document>> {
        self.documents.values()
    }

    /// A new snapshot with `doc` inserted (or replaced).
    pub fn with_document(&self, doc: Document) -> Snapshot {
        let mut documents = self.documents.clone();
        documents.insert(doc.path().to_path_buf(), Arc::new(doc));
        Snapshot {
            revision: self.revision + 1,
            documents,
        }
    }

    /// A new snapshot with all of `docs` inserted.
    pub fn with_documents(&self, docs: impl IntoIterator<Item = Document>) -> Snapshot {
        let mut documents = self.documents.clone();
        for doc in docs {
            documents.insert(doc.path().to_path_buf(), Arc::new(doc));
        }
        Snapshot {
            revision: self.revision + 1,
            documents,
        }
    }

    pub fn without_document(&self, path: &Path) -> Snapshot {
        let mut documents = self.documents.clone();
        documents.remove(path);
        Snapshot {
            revision: self.revision + 1,
            documents,
        }
    }

    /// Find the document an include directive in `from` refers to.
    ///
    /// Quoted includes are tried relative to the including file first;
    /// both forms then search `header_paths` in order.  Only documents
    /// present in the snapshot can be found.
    pub fn resolve_include(
        &self,
        from: &Path,
        include: &Include,
        header_paths: &[PathBuf],
    ) -> Option<&Arc<Document>> {
        let mut candidates = Vec::new();
        if include.kind == IncludeKind::Local
            && let Some(dir) = from.parent()
        {
            candidates.push(dir.join(&include.path));
        }
        candidates.extend(header_paths.iter().map(|h| h.join(&include.path)));
        if let Some(found) = candidates
            .iter()
            .find_map(|c| self.documents.get(&normalize(c)))
        {
            return Some(found);
        }
        // Fall back to any known document whose path ends with the
        // included name; the shortest path wins.
        let wanted = normalize(Path::new(&include.path));
        self.documents
            .iter()
            .filter(|(path, _)| path.ends_with(&wanted) && path.as_path() != from)
            .min_by(|(a, _), (b, _)| {
                a.as_os_str()
                    .len()
                    .cmp(&b.as_os_str().len())
                    .then_with(|| a.cmp(b))
            })
            .map(|(_, doc)| doc)
    }

    /// All documents transitively included by `doc`, in discovery order,
    /// excluding `doc` itself.
    pub fn include_chain(&self, doc: &Document, header_paths: &[PathBuf]) -> Vec<Arc<Document>> {
        let mut seen: HashSet<PathBuf> = HashSet::new();
        seen.insert(doc.path().to_path_buf());
        let mut chain = Vec::new();
        let mut queue: Vec<(PathBuf, Include)> = doc
            .includes()
            .iter()
            .map(|i| (doc.path().to_path_buf(), i.clone()))
            .collect();
        let mut next = 0;
        while next < queue.len() {
            let (from, include) = queue[next].clone();
            next += 1;
            let Some(found) = self.resolve_include(&from, &include, header_paths) else {
                continue;
            };
            if !seen.insert(found.path().to_path_buf()) {
                continue;
            }
            queue.extend(
                found
                    .includes()
                    .iter()
                    .map(|i| (found.path().to_path_buf(), i.clone())),
            );
            chain.push(Arc::clone(found));
        }
        chain
    }
}

/// Lexically normalize `a/./b/../c` to `a/c` without touching the file
/// system.
fn normalize(path: &Path) -> PathBuf {
    use std::path::Component;
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parser::{ParseOptions, parse_document};

    fn doc(path: &str, src: &str) -> Document {
        parse_document(Path::new(path), src, ParseOptions::default())
    }

    #[test]
    fn test_include_chain_is_transitive_and_cycle_safe() {
        let snapshot = Snapshot::new().with_documents([
            doc("/p/a.h", "#include \"b.h\"\nstruct A {};\n"),
            doc("/p/b.h", "#include \"a.h\"\n#include \"sub/../c.h\"\nstruct B {};\n"),
            doc("/p/c.h", "struct C {};\n"),
        ]);
        let main = doc("/p/main.cpp", "#include \"a.h\"\n");
        let chain: Vec<PathBuf> = snapshot
            .include_chain(&main, &[])
            .iter()
            .map(|d| d.path().to_path_buf())
            .collect();
        assert_eq!(
            chain,
            vec![
                PathBuf::from("/p/a.h"),
                PathBuf::from("/p/b.h"),
                PathBuf::from("/p/c.h")
            ]
        );
    }

    #[test]
    fn test_system_includes_use_header_paths() {
        let snapshot = Snapshot::new().with_documents([
            doc("/usr/inc/lib.h", "int lib;\n"),
            doc("/opt/other/lib.h", "int other;\n"),
        ]);
        let main = doc("/p/main.cpp", "#include <lib.h>\n");
        let chain = snapshot.include_chain(&main, &[PathBuf::from("/opt/other")]);
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].path(), Path::new("/opt/other/lib.h"));
    }

    #[test]
    fn test_unresolved_includes_fall_back_to_path_suffix() {
        let snapshot = Snapshot::new().with_documents([
            doc("/work/src/net/socket.h", "struct Socket {};\n"),
            doc("/work/src/other.h", "struct Other {};\n"),
        ]);
        let main = doc("/work/app/main.cpp", "#include <net/socket.h>\n#include \"missing.h\"\n");
        let chain = snapshot.include_chain(&main, &[]);
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].path(), Path::new("/work/src/net/socket.h"));
    }

    #[test]
    fn test_publishing_bumps_revision() {
        let a = Snapshot::new();
        let b = a.with_document(doc("/x.cpp", ""));
        assert_eq!(b.revision(), a.revision() + 1);
        assert!(a.is_empty());
        assert_eq!(b.len(), 1);
        assert!(b.without_document(Path::new("/x.cpp")).is_empty());
    }
}
