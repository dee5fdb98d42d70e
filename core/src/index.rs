use crate::dataset::{self, split_version, BackupRecord};
use crate::error::MappingError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::io::Read;
use std::str::FromStr;
use unicode_normalization::UnicodeNormalization;

pub const ARXIV_ABS_PREFIX: &str = "https://arxiv.org/abs/";

/// Key policy shared by the index and the rewriter: trimmed, NFKC, lowercase.
pub fn normalize_slug(slug: &str) -> String {
    slug.trim().nfkc().collect::<String>().to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub arxiv_id: String,
    /// `https://arxiv.org/abs/<arxiv_id>`
    pub url: String,
}

impl Entry {
    pub fn new(arxiv_id: impl Into<String>) -> Self {
        let arxiv_id = arxiv_id.into();
        let url = format!("{ARXIV_ABS_PREFIX}{arxiv_id}");
        Self { arxiv_id, url }
    }
}

/// How to pick one arXiv id when a record lists several.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TargetSelection {
    /// First id in source order. For backup records that is the versioned `paper_url_abs`.
    #[default]
    First,
    /// Highest explicit `vN`; unversioned ids rank as 0 and ties keep source order.
    LatestVersion,
    /// First id with its version suffix removed.
    Unversioned,
    /// Skip records whose ids name more than one paper.
    RejectAmbiguous,
}

impl TargetSelection {
    pub fn select(&self, targets: &[String]) -> Option<String> {
        let first = targets.first()?;
        match self {
            TargetSelection::First | TargetSelection::RejectAmbiguous => Some(first.clone()),
            TargetSelection::Unversioned => Some(split_version(first).0.to_string()),
            TargetSelection::LatestVersion => {
                let mut best = first;
                let mut best_version = split_version(first).1.unwrap_or(0);
                for t in &targets[1..] {
                    let v = split_version(t).1.unwrap_or(0);
                    if v > best_version {
                        best = t;
                        best_version = v;
                    }
                }
                Some(best.clone())
            }
        }
    }
}

/// What to do when two records normalize to the same slug but resolve to different ids.
/// Repeats that resolve to the same id are always accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    #[default]
    LastWins,
    FirstWins,
    Reject,
}

impl FromStr for TargetSelection {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" => Ok(TargetSelection::First),
            "latest-version" => Ok(TargetSelection::LatestVersion),
            "unversioned" => Ok(TargetSelection::Unversioned),
            "reject-ambiguous" => Ok(TargetSelection::RejectAmbiguous),
            other => Err(format!(
                "unknown selection '{other}' (expected first, latest-version, unversioned, reject-ambiguous)"
            )),
        }
    }
}

impl fmt::Display for TargetSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TargetSelection::First => "first",
            TargetSelection::LatestVersion => "latest-version",
            TargetSelection::Unversioned => "unversioned",
            TargetSelection::RejectAmbiguous => "reject-ambiguous",
        })
    }
}

impl FromStr for DuplicatePolicy {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "last-wins" => Ok(DuplicatePolicy::LastWins),
            "first-wins" => Ok(DuplicatePolicy::FirstWins),
            "reject" => Ok(DuplicatePolicy::Reject),
            other => Err(format!("unknown duplicate policy '{other}' (expected last-wins, first-wins, reject)")),
        }
    }
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DuplicatePolicy::LastWins => "last-wins",
            DuplicatePolicy::FirstWins => "first-wins",
            DuplicatePolicy::Reject => "reject",
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    pub selection: TargetSelection,
    pub duplicates: DuplicatePolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    pub slug: String,
    pub kept: String,
    pub discarded: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    pub records: usize,
    pub indexed: usize,
    /// Entries with no recognizable source slug.
    pub skipped: usize,
    pub without_target: usize,
    /// Same slug, same resolved id.
    pub repeated: usize,
    pub conflicts: Vec<Conflict>,
    pub ambiguous: BTreeSet<String>,
}

/// Immutable slug → arXiv lookup. Built once per run and shared by reference.
#[derive(Debug, Clone, Default)]
pub struct MappingIndex {
    entries: HashMap<String, Entry>,
}

impl MappingIndex {
    pub fn build<I>(records: I, options: &BuildOptions) -> Result<(Self, BuildReport), MappingError>
    where
        I: IntoIterator<Item = BackupRecord>,
    {
        let mut entries: HashMap<String, Entry> = HashMap::new();
        let mut report = BuildReport::default();

        for record in records {
            report.records += 1;
            let slug = normalize_slug(&record.slug);
            if slug.is_empty() {
                report.skipped += 1;
                continue;
            }
            if record.is_ambiguous() {
                report.ambiguous.insert(slug.clone());
                if options.selection == TargetSelection::RejectAmbiguous {
                    continue;
                }
            }
            let Some(arxiv_id) = options.selection.select(&record.targets) else {
                report.without_target += 1;
                continue;
            };

            let existing = entries.get(&slug).map(|e| e.arxiv_id.clone());
            match existing {
                None => {
                    entries.insert(slug, Entry::new(arxiv_id));
                }
                Some(kept) if kept == arxiv_id => report.repeated += 1,
                Some(kept) => match options.duplicates {
                    DuplicatePolicy::Reject => {
                        return Err(MappingError::DuplicateSourceIdentifier { slug, kept, rejected: arxiv_id });
                    }
                    DuplicatePolicy::FirstWins => {
                        tracing::warn!(%slug, %kept, discarded = %arxiv_id, "conflicting duplicate slug");
                        report.conflicts.push(Conflict { slug, kept, discarded: arxiv_id });
                    }
                    DuplicatePolicy::LastWins => {
                        tracing::warn!(%slug, kept = %arxiv_id, discarded = %kept, "conflicting duplicate slug");
                        entries.insert(slug.clone(), Entry::new(arxiv_id.clone()));
                        report.conflicts.push(Conflict { slug, kept: arxiv_id, discarded: kept });
                    }
                },
            }
        }

        report.indexed = entries.len();
        tracing::info!(
            records = report.records,
            indexed = report.indexed,
            skipped = report.skipped,
            conflicts = report.conflicts.len(),
            ambiguous = report.ambiguous.len(),
            "mapping index built"
        );
        Ok((Self { entries }, report))
    }

    /// Build from an already-parsed JSON dataset of either supported shape.
    pub fn from_json(value: &serde_json::Value, options: &BuildOptions) -> Result<(Self, BuildReport), MappingError> {
        let decoded = dataset::decode(value)?;
        let (index, mut report) = Self::build(decoded.records, options)?;
        report.records += decoded.unrecognized;
        report.skipped += decoded.unrecognized;
        Ok((index, report))
    }

    pub fn from_reader<R: Read>(reader: R, options: &BuildOptions) -> Result<(Self, BuildReport), MappingError> {
        let value: serde_json::Value =
            serde_json::from_reader(reader).map_err(|e| MappingError::malformed("input", e))?;
        Self::from_json(&value, options)
    }

    /// Rebuild from already-resolved pairs, e.g. a compiled snapshot.
    pub fn from_resolved<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let entries = pairs
            .into_iter()
            .map(|(slug, id)| (normalize_slug(slug.as_ref()), Entry::new(id)))
            .collect();
        Self { entries }
    }

    pub fn lookup(&self, slug: &str) -> Option<&Entry> {
        self.entries.get(&normalize_slug(slug))
    }

    pub fn resolve(&self, slug: &str) -> Result<&Entry, MappingError> {
        self.lookup(slug).ok_or_else(|| MappingError::NotFound { slug: slug.to_string() })
    }

    /// Lookup for a slug that is already normalized.
    pub(crate) fn get_normalized(&self, slug: &str) -> Option<&Entry> {
        self.entries.get(slug)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by slug.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Entry)> {
        let mut all: Vec<(&str, &Entry)> = self.entries.iter().map(|(k, v)| (k.as_str(), v)).collect();
        all.sort_by(|a, b| a.0.cmp(b.0));
        all.into_iter()
    }
}
