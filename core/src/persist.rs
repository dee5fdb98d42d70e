use crate::MappingIndex;
use anyhow::{bail, Context, Result};
use bincode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub entries: usize,
    pub created_at: String,
    pub version: u32,
    /// Dataset the snapshot was compiled from.
    pub source: Option<String>,
    pub selection: String,
    pub duplicates: String,
}

pub struct SnapshotPaths {
    pub root: PathBuf,
}

impl SnapshotPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn table(&self) -> PathBuf { self.root.join("mapping.bin") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

/// Write the resolved slug → arXiv id table and its metadata.
pub fn save_snapshot(paths: &SnapshotPaths, index: &MappingIndex, meta: &SnapshotMeta) -> Result<()> {
    create_dir_all(&paths.root).with_context(|| format!("creating {}", paths.root.display()))?;
    let table: BTreeMap<&str, &str> = index.iter().map(|(slug, e)| (slug, e.arxiv_id.as_str())).collect();
    let mut f = File::create(paths.table())?;
    let bytes = bincode::serialize(&table)?;
    f.write_all(&bytes)?;
    save_meta(paths, meta)
}

pub fn save_meta(paths: &SnapshotPaths, meta: &SnapshotMeta) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &SnapshotPaths) -> Result<SnapshotMeta> {
    let mut f = File::open(paths.meta()).with_context(|| format!("opening {}", paths.meta().display()))?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: SnapshotMeta = serde_json::from_str(&buf)?;
    Ok(meta)
}

pub fn load_snapshot(paths: &SnapshotPaths) -> Result<(MappingIndex, SnapshotMeta)> {
    let meta = load_meta(paths)?;
    if meta.version != SNAPSHOT_VERSION {
        bail!("unsupported snapshot version {} (expected {})", meta.version, SNAPSHOT_VERSION);
    }
    let mut f = File::open(paths.table()).with_context(|| format!("opening {}", paths.table().display()))?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let table: BTreeMap<String, String> = bincode::deserialize(&buf).context("decoding mapping table")?;
    if table.len() != meta.entries {
        bail!("snapshot table has {} entries, meta.json says {}", table.len(), meta.entries);
    }
    Ok((MappingIndex::from_resolved(table), meta))
}
