use crate::backup::archive::{ArchiveEntry, ArchiveEntryIterable};
use crate::backup::function_path;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::{AddFunctionName, AddMsg};

use bon::Builder;
use derive_more::{Display, From};
use dyn_iter::{DynIter, IntoDynIterator};
use function_name::named;
use getset::Getters;
use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use serde::de::Visitor;
use serde::{Deserialize, Deserializer, Serialize};
use serde_with::skip_serializing_none;
use validator::Validate;
use walkdir::{DirEntry, WalkDir};

use std::fmt::Formatter;
use std::path::{Path, PathBuf};
use std::result;

/// Files under `src_dir` whose relative path matches any glob in `globset`.
///
/// Matching files keep their relative layout under `dst_dir` inside the
/// archive. `dst_dir` defaults to the last component of `src_dir`. Files are
/// visited in file-name order so archives built from the same tree list their
/// entries identically.
#[skip_serializing_none]
#[derive(Clone, Debug, Serialize, Deserialize, Validate, Builder, PartialEq, Eq, Getters)]
#[serde(deny_unknown_fields)]
#[getset(get = "pub")]
pub struct WalkdirAndGlobsetSource {
    #[builder(into)]
    src_dir: PathBuf,
    #[builder(into)]
    dst_dir: Option<PathBuf>,
    #[serde(default = "default_globset")]
    #[builder(default = default_globset(), into)]
    globset: Vec<CustomDeserializedGlob>,
}

fn default_globset() -> Vec<CustomDeserializedGlob> {
    vec![CustomDeserializedGlob::default()]
}

/// `globset::Glob` deserialized from a plain string with `literal_separator`
/// enabled, so `*` never crosses a `/`.
#[derive(Clone, Debug, From, Display, Serialize, Builder, PartialEq, Eq, Getters)]
#[serde(transparent)]
#[getset(get = "pub")]
pub struct CustomDeserializedGlob {
    #[builder(into)]
    glob: Glob,
}

impl Default for CustomDeserializedGlob {
    fn default() -> Self {
        GlobBuilder::new("**/*")
            .literal_separator(true)
            .build()
            .map(CustomDeserializedGlob::from)
            .unwrap_or_else(|e| unreachable!("default glob is valid: {e}"))
    }
}

struct CustomGlobVisitor;

impl Visitor<'_> for CustomGlobVisitor {
    type Value = CustomDeserializedGlob;

    fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
        formatter.write_str("a glob pattern")
    }

    fn visit_str<E>(self, v: &str) -> result::Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        GlobBuilder::new(v)
            .literal_separator(true)
            .build()
            .map(CustomDeserializedGlob::from)
            .map_err(serde::de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for CustomDeserializedGlob {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> result::Result<Self, D::Error> {
        deserializer.deserialize_str(CustomGlobVisitor)
    }
}

impl WalkdirAndGlobsetSource {
    fn archive_dst_dir(&self) -> PathBuf {
        self.dst_dir.clone().unwrap_or_else(|| {
            self.src_dir
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_default()
        })
    }

    fn build_globset(&self) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        if self.globset.is_empty() {
            builder.add(CustomDeserializedGlob::default().glob);
        } else {
            self.globset.iter().for_each(|g| {
                builder.add(g.glob.clone());
            });
        }
        Ok(builder.build()?)
    }
}

impl ArchiveEntryIterable for WalkdirAndGlobsetSource {
    #[named]
    fn archive_entry_iterator<'a>(&self) -> Result<DynIter<'a, Result<ArchiveEntry>>> {
        if !self.src_dir.is_dir() {
            tracing::error!(
                "Source directory does not exist or is not a directory: {:?}",
                self.src_dir
            );
            return Err(Error::source_missing(self.src_dir.clone()));
        }

        tracing::info!(
            "Starting directory scan: {:?} with {} glob patterns",
            self.src_dir,
            self.globset.len()
        );

        let globset = self.build_globset().add_fn_name(function_path!())?;
        let src_dir = self.src_dir.clone();
        let dst_dir = self.archive_dst_dir();

        let entries = WalkDir::new(&self.src_dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(move |res| match res {
                Ok(de) => process_dir_entry(de, &src_dir, &dst_dir, &globset),
                Err(e) => Some(Err(e.into())),
            })
            .map(move |res| res.add_fn_name(function_path!()));

        Ok(entries.into_dyn_iter())
    }
}

fn process_dir_entry<P1: AsRef<Path>, P2: AsRef<Path>>(
    de: DirEntry,
    base_src_dir: P1,
    base_dst_dir: P2,
    globset: &GlobSet,
) -> Option<Result<ArchiveEntry>> {
    let p = de.into_path();
    if !p.is_file() {
        tracing::trace!("Skipping {:?} not a file", p);
        return None;
    }

    let res = match p.strip_prefix(base_src_dir.as_ref()) {
        Ok(stripped_path) if globset.is_match(stripped_path) => {
            Ok(base_dst_dir.as_ref().join(stripped_path))
        }
        Ok(_) => {
            tracing::trace!("Skipping {:?}, glob not match", p);
            return None;
        }
        Err(e) => Err(Error::from(e).add_msg(format!(
            "Stripping {:?} from {:?} failed",
            base_src_dir.as_ref(),
            p
        ))),
    };

    Some(res.map(|dst| {
        let entry = ArchiveEntry::new(p, dst);
        tracing::trace!("Including file: {:?} -> {:?}", entry.src, entry.dst);
        entry
    }))
}
