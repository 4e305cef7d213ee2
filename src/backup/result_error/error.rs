use crate::backup::result_error::{AddFunctionName, AddMsg};
use itertools::Itertools;
use std::fmt::Debug;
use std::path::PathBuf;
use thiserror::Error;
use thiserror_ext::Construct;

#[derive(Error, Debug, Construct)]
pub enum Error {
    #[error("Source path {path:?} does not exist")]
    SourceMissing { path: PathBuf },
    #[error("Failed to create archive {path:?}: {reason}")]
    ArchiveCreation { path: PathBuf, reason: String },
    #[error("Passphrase from {origin} is unusable: {reason}")]
    PassphraseMissing { origin: String, reason: String },
    #[error("Encryption of {path:?} could not be verified: {reason}")]
    EncryptionVerification { path: PathBuf, reason: String },
    #[error("Plaintext artifact {path:?} is still on disk after deletion")]
    PlaintextDeletion { path: PathBuf },
    #[error("Publishing artifact to {path:?} failed: {reason}")]
    Publish { path: PathBuf, reason: String },
    #[error("Retention directory {dir:?} does not exist")]
    RetentionTargetMissing { dir: PathBuf },
    #[error("Destination directory {dir:?} does not exist or is not a directory")]
    DestinationMissing { dir: PathBuf },
    #[construct(skip)]
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[construct(skip)]
    #[error(transparent)]
    ValidationError(#[from] validator::ValidationErrors),
    #[construct(skip)]
    #[error(transparent)]
    SerdeYml(#[from] serde_yml::Error),
    #[construct(skip)]
    #[error(transparent)]
    WalkDir(#[from] walkdir::Error),
    #[construct(skip)]
    #[error(transparent)]
    GlobSet(#[from] globset::Error),
    #[construct(skip)]
    #[error(transparent)]
    StripPrefix(#[from] std::path::StripPrefixError),
    #[construct(skip)]
    #[error(transparent)]
    LiblzmaStream(#[from] liblzma::stream::Error),
    #[construct(skip)]
    #[error(transparent)]
    LettreEmail(#[from] lettre::error::Error),
    #[construct(skip)]
    #[error(transparent)]
    LettreSmtp(#[from] lettre::transport::smtp::Error),
    #[error("Smtp server rejected message: {0}")]
    SmtpSendError(String),
    #[construct(skip)]
    #[error("{}:\n{}", msg, indent::indent_all_with("  ", error.to_string()))]
    WithMsg { msg: String, error: Box<Error> },
    #[construct(skip)]
    #[error("{} failed:\n{}", fn_name, indent::indent_all_with("  ", error.to_string()))]
    WithFunctionName { fn_name: String, error: Box<Error> },
    #[error("{}", itertools::join(.0, "\n\n"))]
    LotsOfError(Vec<Error>),
}

impl<S: Into<String>> AddFunctionName<S> for Error {
    fn add_fn_name(self, fn_name: S) -> Self {
        Error::WithFunctionName {
            fn_name: fn_name.into(),
            error: Box::new(self),
        }
    }
}

impl<S: Into<String>> AddMsg<S> for Error {
    fn add_msg(self, msg: S) -> Self {
        Self::WithMsg {
            msg: msg.into(),
            error: Box::new(self),
        }
    }
}

impl From<Vec<Error>> for Error {
    fn from(errors: Vec<Error>) -> Self {
        if errors.is_empty() {
            panic!("Should not create lots of errors when error is empty")
        }
        Self::LotsOfError(errors.into_iter().flat_map(|e| e.into_iter()).collect_vec())
    }
}

impl Error {
    pub fn into_iter(self) -> Box<dyn Iterator<Item = Error>> {
        match self {
            Error::LotsOfError(v) => Box::new(v.into_iter().flat_map(|e| e.into_iter())),
            e => Box::new(std::iter::once(e)),
        }
    }

    pub fn chain(self, other: Error) -> Error {
        Error::LotsOfError(self.into_iter().chain(other.into_iter()).collect_vec())
    }

    /// Strips context wrappers, returning the error that was first raised.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::WithMsg { error, .. } | Error::WithFunctionName { error, .. } => {
                error.root_cause()
            }
            e => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error = Error::from(io_error);

        match error {
            Error::Io(_) => (),
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_error_add_msg() {
        let error = Error::publish("/backups/a.tar.age", "not found at destination");
        let error_with_msg = error.add_msg("Custom message");

        match error_with_msg {
            Error::WithMsg { msg, .. } => assert_eq!(msg, "Custom message"),
            _ => panic!("Expected WithMsg error"),
        }
    }

    #[test]
    fn test_error_add_fn_name() {
        let error = Error::destination_missing("/mnt/backups");
        let error = error.add_fn_name("test_function");

        match error {
            Error::WithFunctionName { fn_name, .. } => assert_eq!(fn_name, "test_function"),
            _ => panic!("Expected WithFunctionName error"),
        }
    }

    #[test]
    fn test_root_cause_unwraps_nested_context() {
        let error = Error::passphrase_missing("file \"/root/pass\"", "file is empty")
            .add_msg("inner")
            .add_fn_name("outer");

        assert!(matches!(
            error.root_cause(),
            Error::PassphraseMissing { .. }
        ));
    }

    #[test]
    fn test_error_from_vec() {
        let errors = vec![
            Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "error1")),
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "error2",
            )),
        ];

        let combined_error = Error::from(errors);
        match combined_error {
            Error::LotsOfError(error_vec) => assert_eq!(error_vec.len(), 2),
            _ => panic!("Expected LotsOfError"),
        }
    }

    #[test]
    #[should_panic(expected = "Should not create lots of errors when error is empty")]
    fn test_error_from_empty_vec_panics() {
        let errors: Vec<Error> = vec![];
        let _error = Error::from(errors);
    }

    #[test]
    fn test_error_from_vec_flattens_nested_lists() {
        let nested = Error::LotsOfError(vec![
            Error::publish("/a", "not found at destination"),
            Error::publish("/b", "not found at destination"),
        ]);
        let combined = Error::from(vec![nested, Error::publish("/c", "not found at destination")]);

        assert_eq!(combined.into_iter().count(), 3);
    }

    #[test]
    fn test_error_chain() {
        let error1 = Error::plaintext_deletion("/tmp/a.tar");
        let error2 = Error::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "error2",
        ));

        let chained = error1.chain(error2);
        match chained {
            Error::LotsOfError(errors) => assert_eq!(errors.len(), 2),
            _ => panic!("Expected LotsOfError"),
        }
    }

    #[test]
    fn test_error_with_msg_display() {
        let error = Error::archive_creation("/tmp/a.tar", "no entries to archive");
        let error_str = error.add_msg("Operation failed").to_string();

        assert!(error_str.contains("Operation failed"));
        assert!(error_str.contains("no entries to archive"));
        assert!(error_str.contains("\n  "));
    }
}
