use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::{convert_error_vec, Result};
use crate::backup::result_error::AddMsg;
use chrono::{DateTime, TimeDelta, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fs::read_dir;
use std::path::{Path, PathBuf};
use validator::Validate;

static DEFAULT_RETENTION_DAYS: u32 = 14;

fn default_days() -> u32 {
    DEFAULT_RETENTION_DAYS
}

#[derive(Clone, Validate, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RetentionConfig {
    #[serde(default = "default_days")]
    #[validate(range(min = 1, max = 36500))]
    pub days: u32,
    /// Only log what would be removed
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            days: DEFAULT_RETENTION_DAYS,
            dry_run: false,
        }
    }
}

#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct ItemWithDateTime<R> {
    pub item: R,
    pub date_time: DateTime<Utc>,
}

impl<R> From<(R, DateTime<Utc>)> for ItemWithDateTime<R> {
    fn from(value: (R, DateTime<Utc>)) -> Self {
        Self {
            item: value.0,
            date_time: value.1,
        }
    }
}

impl RetentionConfig {
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - TimeDelta::days(i64::from(self.days))
    }

    /// Items strictly older than the cutoff, oldest first.
    pub fn get_delete<R, I>(&self, iter: I, now: DateTime<Utc>) -> impl Iterator<Item = ItemWithDateTime<R>>
    where
        I: IntoIterator<Item = ItemWithDateTime<R>>,
    {
        let cutoff = self.cutoff(now);
        iter.into_iter()
            .filter(move |i| i.date_time < cutoff)
            .sorted_by_key(|i| i.date_time)
    }

    /// Deletes files in `dir` whose name ends with `.{suffix}` and whose
    /// modification time is strictly before `now - days`.
    ///
    /// Returns the deleted paths (or, on a dry run, the paths that would have
    /// been deleted). Every eligible file is attempted; individual failures are
    /// reported together afterwards.
    pub fn prune<P: AsRef<Path>>(&self, dir: P, suffix: &str, now: DateTime<Utc>) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(Error::retention_target_missing(dir));
        }

        let retention_set = list_retention_set(dir, suffix)?;
        tracing::info!(
            "Found {} published artifacts in {:?}, cutoff {}",
            retention_set.len(),
            dir,
            self.cutoff(now)
        );

        self.remove_all(self.get_delete(retention_set, now))
    }

    /// Removes every item, or only logs it on a dry run. A failure does not
    /// stop the remaining removals; all failures are returned together.
    fn remove_all<I>(&self, to_delete: I) -> Result<Vec<PathBuf>>
    where
        I: IntoIterator<Item = ItemWithDateTime<PathBuf>>,
    {
        let mut deleted = Vec::new();
        let mut errors = Vec::new();
        for to_delete in to_delete {
            if self.dry_run {
                tracing::info!(
                    "Dry run, would remove out of retention file {:?} (modified {})",
                    to_delete.item,
                    to_delete.date_time
                );
                deleted.push(to_delete.item);
                continue;
            }

            tracing::info!(
                "Removing out of retention file {:?} (modified {})",
                to_delete.item,
                to_delete.date_time
            );
            match std::fs::remove_file(&to_delete.item) {
                Ok(()) => deleted.push(to_delete.item),
                Err(e) => errors.push(
                    Error::from(e).add_msg(format!("Removing {:?} failed", to_delete.item)),
                ),
            }
        }
        convert_error_vec(errors)?;

        Ok(deleted)
    }
}

/// Regular files in `dir` carrying the suffix, with their modification time
fn list_retention_set(dir: &Path, suffix: &str) -> Result<Vec<ItemWithDateTime<PathBuf>>> {
    let dotted = format!(".{suffix}");
    let mut set = Vec::new();
    for entry in read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let matches_suffix = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(dotted.as_str()));
        if !matches_suffix {
            tracing::trace!("Skipping {:?}, suffix not match", path);
            continue;
        }
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        let modified = DateTime::<Utc>::from(metadata.modified()?);
        set.push(ItemWithDateTime::from((path, modified)));
    }
    Ok(set)
}
