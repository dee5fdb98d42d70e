use crate::index::{normalize_slug, MappingIndex};
use crate::locator::{find_all, SourceHost};
use serde::Serialize;
use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Substitution {
    pub span: Range<usize>,
    pub original: String,
    pub replacement: String,
}

/// A located link with no arXiv mapping; the text at `span` is left as-is.
/// `slug` is the identifier as written in the document, before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Unresolved {
    pub slug: String,
    pub span: Range<usize>,
    pub url: String,
    #[serde(skip)]
    pub host: SourceHost,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Conversion {
    pub text: String,
    pub substitutions: Vec<Substitution>,
    pub unresolved: Vec<Unresolved>,
}

impl Conversion {
    pub fn found(&self) -> usize {
        self.substitutions.len() + self.unresolved.len()
    }

    pub fn resolved(&self) -> usize {
        self.substitutions.len()
    }

    pub fn unresolved_count(&self) -> usize {
        self.unresolved.len()
    }

    /// Resolved / found, or `None` when the document had no source links.
    pub fn success_ratio(&self) -> Option<f64> {
        match self.found() {
            0 => None,
            n => Some(self.resolved() as f64 / n as f64),
        }
    }

    pub fn changed(&self) -> bool {
        !self.substitutions.is_empty()
    }
}

/// Rewrite every resolvable source link in `text`. Bytes outside replaced spans are copied unchanged.
pub fn convert(text: &str, index: &MappingIndex) -> Conversion {
    let mut substitutions = Vec::new();
    let mut unresolved = Vec::new();

    for m in find_all(text) {
        let slug = normalize_slug(m.slug);
        match index.get_normalized(&slug) {
            Some(entry) => {
                tracing::debug!(from = m.url, to = %entry.url, "resolved");
                substitutions.push(Substitution {
                    span: m.span(),
                    original: m.url.to_string(),
                    replacement: entry.url.clone(),
                });
            }
            None => {
                tracing::debug!(url = m.url, slug = m.slug, "not found");
                unresolved.push(Unresolved {
                    slug: m.slug.to_string(),
                    span: m.span(),
                    url: m.url.to_string(),
                    host: m.host,
                });
            }
        }
    }

    let text = apply(text, &substitutions);
    Conversion { text, substitutions, unresolved }
}

/// Spans must be ascending and non-overlapping, which the locator guarantees.
fn apply(text: &str, substitutions: &[Substitution]) -> String {
    let grown: usize = substitutions.iter().map(|s| s.replacement.len()).sum();
    let mut out = String::with_capacity(text.len() + grown);
    let mut cursor = 0;
    for s in substitutions {
        out.push_str(&text[cursor..s.span.start]);
        out.push_str(&s.replacement);
        cursor = s.span.end;
    }
    out.push_str(&text[cursor..]);
    out
}
