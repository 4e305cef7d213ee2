use crate::backup::archive::{ArchiveEntry, ArchiveEntryIterable};
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use bon::Builder;
use dyn_iter::{DynIter, IntoDynIterator};
use getset::Getters;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::path::PathBuf;
use validator::Validate;

/// Archive name used when the source path has no final component (e.g. `/`)
static ROOT_ENTRY_NAME: &str = "root";

/// A single file or directory added to the archive as-is.
///
/// Directories are added recursively. `name` sets the entry name inside the
/// archive and defaults to the last component of `path`.
#[skip_serializing_none]
#[derive(Clone, Debug, Serialize, Deserialize, Validate, Builder, PartialEq, Eq, Getters)]
#[serde(deny_unknown_fields)]
#[getset(get = "pub")]
pub struct PathSource {
    #[builder(into)]
    path: PathBuf,
    #[builder(into)]
    name: Option<PathBuf>,
}

impl PathSource {
    pub fn entry_name(&self) -> PathBuf {
        self.name.clone().unwrap_or_else(|| {
            self.path
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(ROOT_ENTRY_NAME))
        })
    }
}

impl ArchiveEntryIterable for PathSource {
    fn archive_entry_iterator<'a>(&self) -> Result<DynIter<'a, Result<ArchiveEntry>>> {
        if !self.path.exists() {
            tracing::error!("Source path does not exist: {:?}", self.path);
            return Err(Error::source_missing(self.path.clone()));
        }

        let entry = ArchiveEntry::new(self.path.clone(), self.entry_name());
        tracing::debug!("Including path: {:?} -> {:?}", entry.src, entry.dst);
        Ok(std::iter::once(Ok(entry)).into_dyn_iter())
    }
}
