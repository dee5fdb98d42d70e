use crate::error::MappingError;
use crate::locator::parse_source_url;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

lazy_static! {
    static ref ARXIV_URL: Regex = Regex::new(
        r"(?i)^https?://(?:www\.|export\.)?arxiv\.org/(?:abs|pdf)/(?P<id>[^?#\s]+?)(?:\.pdf)?/?(?:[?#].*)?$"
    )
    .expect("valid regex");
    static ref VERSIONED: Regex = Regex::new(r"^(?P<base>.+?)v(?P<version>\d+)$").expect("valid regex");
}

/// One entry of the Papers with Code `links-between-papers-and-code.json` backup.
/// Only the fields used for mapping are kept; the rest of the object is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PwcRecord {
    #[serde(default)]
    pub paper_url: Option<String>,
    #[serde(default)]
    pub paper_title: Option<String>,
    #[serde(default)]
    pub paper_arxiv_id: Option<String>,
    #[serde(default)]
    pub paper_url_abs: Option<String>,
}

/// A source paper and the arXiv identifiers it points at, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRecord {
    pub slug: String,
    pub targets: Vec<String>,
    pub title: Option<String>,
}

impl BackupRecord {
    /// Targets are cleaned with [`target_id`]; unusable and repeated ones are dropped.
    pub fn new<I, S>(slug: impl Into<String>, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cleaned: Vec<String> = Vec::new();
        for raw in targets {
            if let Some(id) = target_id(raw.as_ref()) {
                if !cleaned.contains(&id) {
                    cleaned.push(id);
                }
            }
        }
        Self { slug: slug.into(), targets: cleaned, title: None }
    }

    /// `None` when `paper_url` is missing or is not a Papers with Code paper link.
    /// `paper_url_abs` is listed before `paper_arxiv_id`.
    pub fn from_pwc(record: &PwcRecord) -> Option<Self> {
        let url = record.paper_url.as_deref()?;
        let slug = parse_source_url(url)?.slug;
        let targets = [record.paper_url_abs.as_deref(), record.paper_arxiv_id.as_deref()];
        let mut out = Self::new(slug, targets.into_iter().flatten());
        out.title = record.paper_title.clone();
        Some(out)
    }

    /// True when the targets name more than one paper. Versions of one paper do not count.
    pub fn is_ambiguous(&self) -> bool {
        let mut bases = self.targets.iter().map(|t| split_version(t).0);
        match bases.next() {
            Some(first) => bases.any(|b| b != first),
            None => false,
        }
    }
}

/// Records decoded from a dataset, plus the count of entries that carried no usable source link.
#[derive(Debug, Default)]
pub struct Decoded {
    pub records: Vec<BackupRecord>,
    pub unrecognized: usize,
}

/// Decode either dataset shape:
/// an array of backup objects, or an object mapping slug (or full source URL) to an
/// arXiv id, an array of ids, or null.
pub fn decode(value: &Value) -> Result<Decoded, MappingError> {
    let mut decoded = Decoded::default();
    match value {
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                if !item.is_object() {
                    return Err(MappingError::malformed(format!("record {i}"), "expected an object"));
                }
                let pwc: PwcRecord = serde_json::from_value(item.clone())
                    .map_err(|e| MappingError::malformed(format!("record {i}"), e))?;
                match BackupRecord::from_pwc(&pwc) {
                    Some(record) => decoded.records.push(record),
                    None => decoded.unrecognized += 1,
                }
            }
        }
        Value::Object(table) => {
            for (key, target) in table {
                let ids: Vec<&str> = match target {
                    Value::String(id) => vec![id.as_str()],
                    Value::Null => Vec::new(),
                    Value::Array(ids) => ids
                        .iter()
                        .map(|v| {
                            v.as_str().ok_or_else(|| {
                                MappingError::malformed(format!("key '{key}'"), "array entries must be strings")
                            })
                        })
                        .collect::<Result<_, _>>()?,
                    other => {
                        return Err(MappingError::malformed(
                            format!("key '{key}'"),
                            format!("expected string, array or null, found {}", kind(other)),
                        ))
                    }
                };
                let slug = parse_source_url(key).map(|m| m.slug).unwrap_or(key.as_str());
                decoded.records.push(BackupRecord::new(slug, ids));
            }
        }
        other => {
            return Err(MappingError::malformed(
                "top level",
                format!("expected an array or object, found {}", kind(other)),
            ))
        }
    }
    Ok(decoded)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Reduce an arXiv id or arXiv abs/pdf URL to a bare id. Other URLs yield `None`.
pub fn target_id(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Some(caps) = ARXIV_URL.captures(raw) {
        return caps.name("id").map(|m| m.as_str().to_string());
    }
    if raw.contains("://") {
        return None;
    }
    Some(raw.to_string())
}

/// Split `1706.03762v5` into (`1706.03762`, Some(5)).
pub fn split_version(id: &str) -> (&str, Option<u32>) {
    match VERSIONED.captures(id) {
        Some(caps) => {
            let base = caps.name("base").map_or(id, |m| m.as_str());
            let version = caps.name("version").and_then(|m| m.as_str().parse().ok());
            (base, version)
        }
        None => (id, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pwc_record_prefers_abs_url() {
        let pwc = PwcRecord {
            paper_url: Some("https://paperswithcode.com/paper/attention-is-all-you-need".into()),
            paper_title: Some("Attention Is All You Need".into()),
            paper_arxiv_id: Some("1706.03762".into()),
            paper_url_abs: Some("https://arxiv.org/abs/1706.03762v5".into()),
        };
        let rec = BackupRecord::from_pwc(&pwc).unwrap();
        assert_eq!(rec.slug, "attention-is-all-you-need");
        assert_eq!(rec.targets, vec!["1706.03762v5", "1706.03762"]);
        assert!(!rec.is_ambiguous());
    }

    #[test]
    fn non_arxiv_abs_url_is_ignored() {
        let pwc = PwcRecord {
            paper_url: Some("https://paperswithcode.com/paper/some-openreview-paper".into()),
            paper_url_abs: Some("https://openreview.net/forum?id=abc".into()),
            ..Default::default()
        };
        let rec = BackupRecord::from_pwc(&pwc).unwrap();
        assert!(rec.targets.is_empty());
    }

    #[test]
    fn target_id_handles_urls() {
        assert_eq!(target_id("https://arxiv.org/pdf/1810.04805v2.pdf").as_deref(), Some("1810.04805v2"));
        assert_eq!(target_id(" http://arxiv.org/abs/hep-th/9901001 ").as_deref(), Some("hep-th/9901001"));
        assert_eq!(target_id("1706.03762").as_deref(), Some("1706.03762"));
        assert_eq!(target_id("   "), None);
    }

    #[test]
    fn split_version_parses_suffix() {
        assert_eq!(split_version("1706.03762v5"), ("1706.03762", Some(5)));
        assert_eq!(split_version("1706.03762"), ("1706.03762", None));
    }

    #[test]
    fn decodes_table_shape() {
        let value = json!({
            "attention-is-all-you-need": "1706.03762",
            "https://paperswithcode.com/paper/bert-pre-training-of-deep-bidirectional": ["1810.04805v2", "1810.04805"],
            "no-target": null
        });
        let decoded = decode(&value).unwrap();
        assert_eq!(decoded.records.len(), 3);
        let bert = decoded.records.iter().find(|r| r.slug.starts_with("bert")).unwrap();
        assert_eq!(bert.slug, "bert-pre-training-of-deep-bidirectional");
    }

    #[test]
    fn rejects_wrong_shapes() {
        assert!(matches!(decode(&json!(42)), Err(MappingError::MalformedDataset { .. })));
        assert!(matches!(decode(&json!(["x"])), Err(MappingError::MalformedDataset { .. })));
        assert!(matches!(decode(&json!([{"paper_url": 3}])), Err(MappingError::MalformedDataset { .. })));
        assert!(matches!(decode(&json!({"a": {"id": "1"}})), Err(MappingError::MalformedDataset { .. })));
        assert!(matches!(decode(&json!({"a": [1]})), Err(MappingError::MalformedDataset { .. })));
    }

    #[test]
    fn counts_unrecognized_records() {
        let value = json!([{ "paper_url": "https://example.com/x" }, { "paper_title": "no url" }]);
        let decoded = decode(&value).unwrap();
        assert!(decoded.records.is_empty());
        assert_eq!(decoded.unrecognized, 2);
    }
}
