/// Include-path completion.
///
/// Lists the entries of every header search directory (plus the current
/// file's directory), each joined with the directory part already typed
/// (`QtCore` in `#include <QtCore/`).  Sub-directories are proposed with a
/// trailing `/` so committing one restarts completion inside it.
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use crate::types::{Candidate, CandidateKind};

/// Candidates for the directory `prefix` under each of `search_dirs`.
///
/// Files are offered when they have no extension or one of `suffixes`.
pub fn include_candidates(
    search_dirs: &[PathBuf],
    prefix: &str,
    suffixes: &[String],
) -> Vec<Candidate> {
    let mut names: BTreeSet<String> = BTreeSet::new();
    for dir in search_dirs {
        let real = if prefix.is_empty() {
            dir.clone()
        } else {
            dir.join(prefix)
        };
        collect_entries(&real, suffixes, &mut names);
    }
    names
        .into_iter()
        .map(|name| Candidate::new(name, CandidateKind::IncludePath))
        .collect()
}

fn collect_entries(dir: &Path, suffixes: &[String], names: &mut BTreeSet<String>) {
    if !dir.is_dir() {
        return;
    }
    let walker = WalkBuilder::new(dir)
        .max_depth(Some(1))
        .standard_filters(false)
        .hidden(true)
        .follow_links(true)
        .build();
    for entry in walker.flatten() {
        if entry.depth() == 0 {
            continue;
        }
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let wanted = match path.extension().and_then(|e| e.to_str()) {
            None => true,
            Some(ext) => suffixes.iter().any(|s| s == ext),
        };
        if !wanted {
            continue;
        }
        if entry.file_type().is_some_and(|t| t.is_dir()) {
            names.insert(format!("{name}/"));
        } else {
            names.insert(name.to_string());
        }
    }
}

/// Header search directories plus the directory of `current_file`, without
/// repeats.
pub fn search_dirs(header_paths: &[PathBuf], current_file: &Path) -> Vec<PathBuf> {
    let mut dirs = header_paths.to_vec();
    if let Some(parent) = current_file.parent()
        && !dirs.iter().any(|d| d == parent)
    {
        dirs.push(parent.to_path_buf());
    }
    dirs
}
