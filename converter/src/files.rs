use anyhow::{bail, Result};
use glob_match::glob_match;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Where converted text goes.
#[derive(Debug, Clone)]
pub enum OutputMode {
    /// `<stem><suffix><ext>` next to the input.
    Suffix(String),
    InPlace,
    /// Only valid for a single input.
    Explicit(PathBuf),
}

impl OutputMode {
    pub fn output_for(&self, input: &Path) -> PathBuf {
        match self {
            OutputMode::Suffix(suffix) => with_stem_suffix(input, suffix),
            OutputMode::InPlace => input.to_path_buf(),
            OutputMode::Explicit(path) => path.clone(),
        }
    }
}

/// `notes/list.md` + `_arxiv` -> `notes/list_arxiv.md`
pub fn with_stem_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}{suffix}.{}", ext.to_string_lossy()),
        None => format!("{stem}{suffix}"),
    };
    path.with_file_name(name)
}

/// `out/list_arxiv.md` -> `out/list_arxiv_not_found.txt`
pub fn not_found_path(output: &Path) -> PathBuf {
    let stem = output.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    output.with_file_name(format!("{stem}_not_found.txt"))
}

/// Files matching `pattern` (by file name) under `dir`, sorted by path. Files whose stem
/// already ends with `skip_stem_suffix` are outputs of an earlier run and are left out.
pub fn find_in_directory(dir: &Path, pattern: &str, recursive: bool, skip_stem_suffix: Option<&str>) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("directory '{}' not found", dir.display());
    }
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).max_depth(max_depth).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else { continue };
        if !glob_match(pattern, name) {
            continue;
        }
        if let Some(suffix) = skip_stem_suffix.filter(|s| !s.is_empty()) {
            let stem = entry.path().file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            if stem.ends_with(suffix) {
                tracing::debug!(path = %entry.path().display(), "skipping earlier output");
                continue;
            }
        }
        files.push(entry.into_path());
    }
    Ok(files)
}

fn has_wildcard(s: &str) -> bool {
    s.contains(['*', '?', '['])
}

/// Explicit inputs, with wildcard arguments expanded for shells that pass them through
/// unexpanded. Plain paths must all exist; nothing is converted otherwise. A pattern that
/// matches nothing contributes nothing.
pub fn expand_explicit(files: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();
    let mut missing = Vec::new();
    for file in files {
        let raw = file.to_string_lossy();
        if has_wildcard(&raw) {
            let matched = expand_pattern(file);
            if matched.is_empty() {
                tracing::warn!(pattern = %raw, "pattern matched no files");
            }
            inputs.extend(matched);
        } else if file.is_file() {
            inputs.push(file.clone());
        } else {
            missing.push(format!("  - {}", file.display()));
        }
    }
    if !missing.is_empty() {
        bail!("the following files were not found:\n{}", missing.join("\n"));
    }
    Ok(inputs)
}

/// `docs/*/notes-?.md`: walk `docs` exactly two levels down and glob-match the relative path.
fn expand_pattern(pattern: &Path) -> Vec<PathBuf> {
    let mut base = PathBuf::new();
    let mut rest: Vec<String> = Vec::new();
    for comp in pattern.components() {
        let part = comp.as_os_str().to_string_lossy();
        if rest.is_empty() && !has_wildcard(&part) {
            base.push(comp);
        } else {
            rest.push(part.into_owned());
        }
    }
    let root = if base.as_os_str().is_empty() { PathBuf::from(".") } else { base.clone() };
    let glob = rest.join("/");
    let depth = rest.len();

    let mut matched = Vec::new();
    for entry in WalkDir::new(&root).min_depth(depth).max_depth(depth).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(&root) else { continue };
        let rel_str = rel.components().map(|c| c.as_os_str().to_string_lossy()).collect::<Vec<_>>().join("/");
        if glob_match(&glob, &rel_str) {
            matched.push(base.join(rel));
        }
    }
    matched
}
