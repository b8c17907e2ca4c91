//! Batch submissions and batch log files
//!
//! Provides [`BatchSubmission`], which collects built entities and renders
//! them as `{"group": [...], "indicator": [...]}`, and [`BatchData`], the
//! parsed form of a `batch-*.json` log.

use crate::builder::{EntityBuilder, GroupBuilder, IndicatorBuilder};
use crate::error::{BatchError, BatchResult};
use crate::model::BatchEntity;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Section holding groups
pub const GROUP_SECTION: &str = "group";
/// Section holding indicators
pub const INDICATOR_SECTION: &str = "indicator";

/// Parsed batch document: section name to entities
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchData {
    sections: IndexMap<String, Vec<BatchEntity>>,
}

impl BatchData {
    /// Create new empty document
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entity to a section
    pub fn push(&mut self, section: &str, entity: BatchEntity) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .push(entity);
    }

    /// Entities of a section
    #[must_use]
    pub fn section(&self, section: &str) -> &[BatchEntity] {
        self.sections.get(section).map_or(&[], Vec::as_slice)
    }

    /// Group entities
    #[inline]
    #[must_use]
    pub fn groups(&self) -> &[BatchEntity] {
        self.section(GROUP_SECTION)
    }

    /// Indicator entities
    #[inline]
    #[must_use]
    pub fn indicators(&self) -> &[BatchEntity] {
        self.section(INDICATOR_SECTION)
    }

    /// Iterate sections in document order
    pub fn sections(&self) -> impl Iterator<Item = (&str, &[BatchEntity])> {
        self.sections
            .iter()
            .map(|(name, entities)| (name.as_str(), entities.as_slice()))
    }

    /// Total number of entities
    #[must_use]
    pub fn total(&self) -> usize {
        self.sections.values().map(Vec::len).sum()
    }

    /// Check if no section holds an entity
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Read a batch log file
    ///
    /// # Errors
    /// Returns [`BatchError`] when the file cannot be read or parsed.
    pub fn read(path: &Path) -> BatchResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| BatchError::io(path, e))?;
        serde_json::from_str(&text).map_err(|source| BatchError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// List `batch-*.json` files in a directory, sorted by name
///
/// A missing directory yields no files.
///
/// # Errors
/// Returns [`BatchError::Io`] when the directory cannot be listed.
pub fn log_files(dir: &Path) -> BatchResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| BatchError::io(dir, e))? {
        let path = entry.map_err(|e| BatchError::io(dir, e))?.path();
        let is_log = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("batch-") && n.ends_with(".json"));
        if is_log && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn indicator_key(kind: &str, summary: &str) -> String {
    format!("{kind}\u{1f}{summary}")
}

/// Collected entities awaiting submission
///
/// Groups are keyed by xid and indicators by type and summary; adding the
/// same key twice keeps the latest.
#[derive(Debug, Clone, Default)]
pub struct BatchSubmission {
    groups: IndexMap<String, BatchEntity>,
    indicators: IndexMap<String, BatchEntity>,
    files: IndexMap<String, Vec<u8>>,
}

impl BatchSubmission {
    /// Create new empty submission
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a group, returning its xid
    pub fn add_group(&mut self, builder: GroupBuilder) -> String {
        let (entity, file) = builder.build_with_file();
        let xid = entity.xid.clone();
        if let Some(content) = file {
            self.files.insert(xid.clone(), content);
        }
        self.groups.insert(xid.clone(), entity);
        xid
    }

    /// Add an indicator, returning its xid
    pub fn add_indicator(&mut self, builder: IndicatorBuilder) -> String {
        let entity = builder.build();
        let xid = entity.xid.clone();
        self.indicators
            .insert(indicator_key(&entity.kind, entity.label()), entity);
        xid
    }

    /// Group by xid
    #[inline]
    #[must_use]
    pub fn group(&self, xid: &str) -> Option<&BatchEntity> {
        self.groups.get(xid)
    }

    /// Indicator by type and summary
    #[inline]
    #[must_use]
    pub fn indicator(&self, kind: &str, summary: &str) -> Option<&BatchEntity> {
        self.indicators.get(&indicator_key(kind, summary))
    }

    /// File content attached to a group
    #[inline]
    #[must_use]
    pub fn file(&self, xid: &str) -> Option<&[u8]> {
        self.files.get(xid).map(Vec::as_slice)
    }

    /// Number of groups
    #[inline]
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Number of indicators
    #[inline]
    #[must_use]
    pub fn indicator_count(&self) -> usize {
        self.indicators.len()
    }

    /// Check if nothing was added
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.indicators.is_empty()
    }

    /// Render as a batch document; empty sections are omitted
    #[must_use]
    pub fn data(&self) -> BatchData {
        let mut data = BatchData::new();
        for entity in self.groups.values() {
            data.push(GROUP_SECTION, entity.clone());
        }
        for entity in self.indicators.values() {
            data.push(INDICATOR_SECTION, entity.clone());
        }
        data
    }

    /// Write the document as `batch-<n>.json`, using the first free `n`
    ///
    /// # Errors
    /// Returns [`BatchError`] when the directory or file cannot be written.
    pub fn write_log(&self, dir: &Path) -> BatchResult<PathBuf> {
        fs::create_dir_all(dir).map_err(|e| BatchError::io(dir, e))?;
        let mut index = log_files(dir)?.len();
        let path = loop {
            let candidate = dir.join(format!("batch-{index:04}.json"));
            if !candidate.exists() {
                break candidate;
            }
            index += 1;
        };
        let text = serde_json::to_string_pretty(&self.data()).map_err(|source| BatchError::Json {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, text).map_err(|e| BatchError::io(&path, e))?;
        debug!(path = %path.display(), groups = self.group_count(), indicators = self.indicator_count(), "wrote batch log");
        Ok(path)
    }
}
