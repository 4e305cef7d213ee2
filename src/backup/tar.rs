use crate::backup::archive::ArchiveEntry;
use crate::backup::compress::{CompressorBuilder, CompressorConfig};
use crate::backup::finish::Finish;
use crate::backup::function_path;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::AddFunctionName;
use function_name::named;
use std::fs::File;
use std::io::{BufWriter, IntoInnerError};
use std::path::Path;

/// Writes every entry, in order, into one tar archive at `archive_path`.
///
/// Directories are appended recursively. The file is created with
/// `create_new`, so an existing archive of the same name is never overwritten.
/// On any failure the partially written file is removed. Success is decided
/// by the archive being present on disk afterwards.
#[named]
pub fn create_tar_archive<P: AsRef<Path>>(
    entries: &[ArchiveEntry],
    archive_path: P,
    compressor: &CompressorConfig,
) -> Result<()> {
    let archive_path = archive_path.as_ref();
    if entries.is_empty() {
        return Err(Error::archive_creation(
            archive_path,
            "no entries to archive",
        ));
    }

    let file = File::create_new(archive_path)
        .map_err(|e| Error::archive_creation(archive_path, e.to_string()))?;

    if let Err(e) = write_entries(file, entries, compressor) {
        if let Err(rm_err) = std::fs::remove_file(archive_path) {
            tracing::warn!(
                "Removing partial archive {:?} failed: {}",
                archive_path,
                rm_err
            );
        }
        return Err(
            Error::archive_creation(archive_path, e.to_string()).add_fn_name(function_path!())
        );
    }

    if !archive_path.is_file() {
        return Err(Error::archive_creation(
            archive_path,
            "archive not found after write",
        ));
    }

    tracing::info!(
        "Created archive {:?} with {} entries",
        archive_path,
        entries.len()
    );
    Ok(())
}

fn write_entries(file: File, entries: &[ArchiveEntry], compressor: &CompressorConfig) -> Result<()> {
    let mut builder = compressor
        .build_compressor(BufWriter::new(file))
        .map(BufWriter::new)
        .map(tar::Builder::new)?;
    builder.follow_symlinks(true);

    for entry in entries {
        if entry.src.is_dir() {
            tracing::debug!("Appending directory {:?} as {:?}", entry.src, entry.dst);
            builder.append_dir_all(entry.dst.as_ref(), entry.src.as_ref())?;
        } else {
            tracing::debug!("Appending file {:?} as {:?}", entry.src, entry.dst);
            builder.append_path_with_name(entry.src.as_ref(), entry.dst.as_ref())?;
        }
    }

    builder
        .into_inner()?
        .into_inner()
        .map_err(IntoInnerError::into_error)?
        .finish()?
        .into_inner()
        .map_err(IntoInnerError::into_error)?
        .sync_all()?;

    Ok(())
}
