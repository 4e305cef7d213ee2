use crate::backup::function_path;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::{AddFunctionName, AddMsg};
use function_name::named;
use std::path::{Path, PathBuf};

/// Moves `artifact` into `destination` and returns its new path.
///
/// A file of the same name already in `destination` is never replaced. A
/// plain rename is tried first; when that fails (typically because the work
/// directory and the destination are on different filesystems) the file is
/// copied and the original removed. If that fallback fails, whatever was
/// written to the destination is removed again and the artifact stays where it
/// was. The move counts as done only once the file is found at the destination.
#[named]
pub fn publish<P1: AsRef<Path>, P2: AsRef<Path>>(artifact: P1, destination: P2) -> Result<PathBuf> {
    let artifact = artifact.as_ref();
    let destination = destination.as_ref();
    if !destination.is_dir() {
        return Err(Error::destination_missing(destination));
    }
    let file_name = artifact
        .file_name()
        .ok_or_else(|| Error::publish(artifact, "artifact has no file name"))?;
    let target = destination.join(file_name);
    if target.exists() {
        return Err(Error::publish(
            &target,
            "a file with the same name is already at the destination",
        ));
    }

    if let Err(rename_err) = std::fs::rename(artifact, &target) {
        tracing::debug!(
            "Renaming {:?} to {:?} failed ({}), copying instead",
            artifact,
            target,
            rename_err
        );
        if let Err(e) = copy_then_remove(artifact, &target) {
            if target.exists() {
                if let Err(rm_err) = std::fs::remove_file(&target) {
                    tracing::warn!("Removing partial {:?} failed: {}", target, rm_err);
                }
            }
            return Err(Error::publish(&target, e.to_string()).add_fn_name(function_path!()));
        }
    }

    if !target.is_file() {
        return Err(Error::publish(&target, "not found at destination after move"));
    }

    tracing::info!("Published {:?}", target);
    Ok(target)
}

fn copy_then_remove(artifact: &Path, target: &Path) -> Result<()> {
    std::fs::copy(artifact, target)
        .map_err(Error::from)
        .add_msg(format!("Copying {:?} to {:?} failed", artifact, target))?;
    std::fs::remove_file(artifact)
        .map_err(Error::from)
        .add_msg(format!("Removing {:?} after copy failed", artifact))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dir_is_empty(dir: &Path) -> bool {
        std::fs::read_dir(dir).unwrap().next().is_none()
    }

    #[test]
    fn test_publish_moves_artifact() {
        let work = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let artifact = work.path().join("vault.tar.age");
        std::fs::write(&artifact, "encrypted").unwrap();

        let published = publish(&artifact, dest.path()).unwrap();

        assert_eq!(published, dest.path().join("vault.tar.age"));
        assert_eq!(std::fs::read_to_string(&published).unwrap(), "encrypted");
        assert!(!artifact.exists());
    }

    #[test]
    fn test_publish_missing_destination() {
        let work = TempDir::new().unwrap();
        let artifact = work.path().join("vault.tar.age");
        std::fs::write(&artifact, "encrypted").unwrap();

        let err = publish(&artifact, work.path().join("missing")).unwrap_err();

        assert!(matches!(err, Error::DestinationMissing { .. }));
        assert!(artifact.is_file());
    }

    #[test]
    fn test_publish_missing_artifact() {
        let work = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();

        let err = publish(work.path().join("vault.tar.age"), dest.path()).unwrap_err();

        assert!(matches!(err.root_cause(), Error::Publish { .. }));
        assert!(dir_is_empty(dest.path()));
    }

    #[test]
    fn test_existing_file_at_destination_is_not_replaced() {
        let work = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let artifact = work.path().join("vault.tar.age");
        std::fs::write(&artifact, "new").unwrap();
        let existing = dest.path().join("vault.tar.age");
        std::fs::write(&existing, "earlier run").unwrap();

        let err = publish(&artifact, dest.path()).unwrap_err();

        assert!(matches!(err.root_cause(), Error::Publish { .. }));
        assert_eq!(std::fs::read_to_string(&existing).unwrap(), "earlier run");
        assert_eq!(std::fs::read_to_string(&artifact).unwrap(), "new");
    }
}
