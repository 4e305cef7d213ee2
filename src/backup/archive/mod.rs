pub mod path;
pub mod walkdir_globset;

use crate::backup::archive::path::PathSource;
use crate::backup::archive::walkdir_globset::WalkdirAndGlobsetSource;
use crate::backup::result_error::result::{convert_error_vec, Result};
use crate::backup::result_error::AddMsg;
use derive_more::From;
use dyn_iter::DynIter;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::result;
use std::sync::Arc;
use validator::{Validate, ValidationErrors};

/// Configuration for the different kinds of backup sources
///
/// - Path: a single file or directory, archived recursively under one name
/// - Glob: a directory walked recursively, keeping files matching glob patterns
#[derive(Clone, From, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
#[serde(deny_unknown_fields)]
pub enum SourceConfig {
    Path(PathSource),
    Glob(WalkdirAndGlobsetSource),
}

impl Validate for SourceConfig {
    fn validate(&self) -> result::Result<(), ValidationErrors> {
        match self {
            SourceConfig::Path(inner) => inner.validate(),
            SourceConfig::Glob(inner) => inner.validate(),
        }
    }
}

/// A single file or directory to be appended to the archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Location on disk
    pub src: Arc<Path>,
    /// Name inside the archive
    pub dst: Arc<Path>,
}

impl ArchiveEntry {
    pub fn new<A: Into<Arc<Path>>, B: Into<Arc<Path>>>(src: A, dst: B) -> ArchiveEntry {
        Self {
            src: src.into(),
            dst: dst.into(),
        }
    }
}

pub trait ArchiveEntryIterable {
    /// Returns the entries this source contributes, in a stable order.
    ///
    /// The outer `Result` fails when the source cannot be read at all (for
    /// example the configured path is missing); inner items fail per entry.
    fn archive_entry_iterator<'a>(&self) -> Result<DynIter<'a, Result<ArchiveEntry>>>;
}

impl ArchiveEntryIterable for SourceConfig {
    fn archive_entry_iterator<'a>(&self) -> Result<DynIter<'a, Result<ArchiveEntry>>> {
        match self {
            SourceConfig::Path(c) => c.archive_entry_iterator(),
            SourceConfig::Glob(c) => c.archive_entry_iterator(),
        }
        .add_msg(format!("Collecting entries from {:?} failed", self))
    }
}

/// Expands every source, in configuration order, into one ordered entry list.
///
/// All per-entry errors are gathered so the log shows every unreadable file at
/// once instead of only the first one.
pub fn collect_entries(sources: &[SourceConfig]) -> Result<Vec<ArchiveEntry>> {
    let mut entries = Vec::new();
    let mut errors = Vec::new();
    for source in sources {
        for entry in source.archive_entry_iterator()? {
            match entry {
                Ok(entry) => entries.push(entry),
                Err(e) => errors.push(e),
            }
        }
    }
    convert_error_vec(errors)?;
    tracing::info!("Collected {} archive entries", entries.len());
    Ok(entries)
}
