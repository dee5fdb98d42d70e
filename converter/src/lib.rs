pub mod files;
pub mod report;

use anyhow::{anyhow, bail, Context, Result};
use files::{not_found_path, OutputMode};
use pwc_core::persist::{load_snapshot, SnapshotPaths};
use pwc_core::{convert, BuildOptions, MappingIndex};
use report::{write_not_found, BatchReport, FileReport};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

pub const DEFAULT_BACKUP: &str = "links-between-papers-and-code.json";
const BACKUP_SOURCE: &str = "https://github.com/paperswithcode/paperswithcode-data";

/// Where the mapping comes from.
#[derive(Debug, Clone)]
pub enum IndexSource {
    Json(PathBuf),
    Snapshot(PathBuf),
}

/// Build or load the index. Failing here stops the run before any document is read.
pub fn load_index(source: &IndexSource, options: &BuildOptions) -> Result<MappingIndex> {
    match source {
        IndexSource::Json(path) => {
            if !path.is_file() {
                bail!(
                    "backup file '{}' not found; download it from {BACKUP_SOURCE}",
                    path.display()
                );
            }
            tracing::info!(path = %path.display(), "loading backup dataset");
            let reader = BufReader::new(File::open(path)?);
            let (index, report) = MappingIndex::from_reader(reader, options)
                .with_context(|| format!("building mapping from {}", path.display()))?;
            if !report.conflicts.is_empty() {
                tracing::warn!(conflicts = report.conflicts.len(), policy = %options.duplicates, "slugs mapped to more than one paper");
            }
            if !report.ambiguous.is_empty() {
                tracing::warn!(ambiguous = report.ambiguous.len(), selection = %options.selection, "records list several papers");
            }
            Ok(index)
        }
        IndexSource::Snapshot(dir) => {
            let (index, meta) = load_snapshot(&SnapshotPaths::new(dir))
                .with_context(|| format!("loading snapshot {}", dir.display()))?;
            tracing::info!(entries = meta.entries, created_at = %meta.created_at, "snapshot loaded");
            Ok(index)
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConvertSettings {
    pub output: OutputMode,
    pub dry_run: bool,
}

/// Convert one file. Errors are per-file I/O problems; unresolved links are data in the report.
pub fn convert_file(input: &Path, index: &MappingIndex, settings: &ConvertSettings) -> Result<FileReport> {
    let bytes = fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let text = String::from_utf8(bytes).map_err(|_| anyhow!("{} is not valid UTF-8", input.display()))?;
    let conversion = convert(&text, index);

    let mut report = FileReport {
        input: input.to_path_buf(),
        found: conversion.found(),
        resolved: conversion.resolved(),
        unresolved: conversion.unresolved.iter().map(|u| u.url.clone()).collect(),
        ..Default::default()
    };
    tracing::info!(file = %input.display(), found = report.found, resolved = report.resolved, "converted");

    if settings.dry_run {
        return Ok(report);
    }

    let output = settings.output.output_for(input);
    let unchanged_in_place = matches!(settings.output, OutputMode::InPlace) && !conversion.changed();
    if !unchanged_in_place {
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&output, &conversion.text).with_context(|| format!("writing {}", output.display()))?;
    }
    report.output = Some(output.clone());

    if !conversion.unresolved.is_empty() {
        let list = not_found_path(&output);
        write_not_found(&list, &conversion.unresolved)?;
        report.not_found_list = Some(list);
    }
    Ok(report)
}

/// Convert each input in order. A failure ends the batch unless `continue_on_error`.
pub fn run_batch(inputs: &[PathBuf], index: &MappingIndex, settings: &ConvertSettings, continue_on_error: bool) -> BatchReport {
    let mut batch = BatchReport::default();
    for (i, input) in inputs.iter().enumerate() {
        match convert_file(input, index, settings) {
            Ok(report) => batch.files.push(report),
            Err(err) => {
                tracing::error!(file = %input.display(), error = %format!("{err:#}"), "conversion failed");
                batch.files.push(FileReport {
                    input: input.clone(),
                    error: Some(format!("{err:#}")),
                    ..Default::default()
                });
                if !continue_on_error {
                    batch.stopped_early = i + 1 < inputs.len();
                    break;
                }
            }
        }
    }
    batch
}
