use anyhow::{Context, Result};
use pwc_core::Unresolved;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use url::form_urlencoded;

const ARXIV_SEARCH: &str = "https://arxiv.org/search/?query=";

#[derive(Debug, Clone, Default, Serialize)]
pub struct FileReport {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub not_found_list: Option<PathBuf>,
    pub found: usize,
    pub resolved: usize,
    pub unresolved: Vec<String>,
    pub error: Option<String>,
}

impl FileReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    pub fn conversion_rate(&self) -> Option<f64> {
        (self.found > 0).then(|| self.resolved as f64 / self.found as f64 * 100.0)
    }
}

#[derive(Debug, Default, Serialize)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
    /// Set when a failure ended the batch before every input was attempted.
    pub stopped_early: bool,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.files.iter().filter(|f| f.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.files.len() - self.succeeded()
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("writing report {}", path.display()))
    }
}

/// "attention-is-all-you-need" -> "Attention Is All You Need"
pub fn search_term(slug: &str) -> String {
    slug.split('-')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

pub fn arxiv_search_url(term: &str) -> String {
    let query: String = form_urlencoded::byte_serialize(term.as_bytes()).collect();
    format!("{ARXIV_SEARCH}{query}")
}

/// Body of the manual-lookup list. Each distinct URL appears once, in first-seen order.
pub fn render_not_found(unresolved: &[Unresolved]) -> String {
    let mut seen = BTreeSet::new();
    let mut out = String::from("URLs not found in backup data - manual lookup needed:\n\n");
    for u in unresolved {
        if !seen.insert(u.url.as_str()) {
            continue;
        }
        let term = search_term(&u.slug);
        let _ = writeln!(out, "{}", u.url);
        let _ = writeln!(out, "  Search term: {term}");
        let _ = writeln!(out, "  arXiv search: {}\n", arxiv_search_url(&term));
    }
    out
}

pub fn write_not_found(path: &Path, unresolved: &[Unresolved]) -> Result<()> {
    fs::write(path, render_not_found(unresolved)).with_context(|| format!("writing {}", path.display()))
}

pub fn print_file_summary(report: &FileReport) {
    println!("\n{}", report.input.display());
    if let Some(err) = &report.error {
        println!("- Failed: {err}");
        return;
    }
    println!("- Total URLs found: {}", report.found);
    println!("- Successfully converted: {}", report.resolved);
    match report.conversion_rate() {
        Some(rate) => println!("- Conversion rate: {rate:.1}%"),
        None => println!("- No URLs found"),
    }
    println!("- Manual lookup needed: {}", report.unresolved.len());
    if let Some(out) = &report.output {
        println!("- Output: {}", out.display());
    }
    if let Some(list) = &report.not_found_list {
        println!("- Manual lookup list: {}", list.display());
    }
}

pub fn print_batch_summary(batch: &BatchReport) {
    println!("\nBATCH CONVERSION SUMMARY");
    println!("Total files processed: {}", batch.files.len());
    println!("Successful conversions: {}", batch.succeeded());
    println!("Failed conversions: {}", batch.failed());
    if batch.stopped_early {
        println!("Stopped after the first failure. Use --continue-on-error to process remaining files.");
    }
}
