use crate::backup::redacted::RedactedString;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::result;
use validator::{Validate, ValidationError, ValidationErrors};

/// Where the archive passphrase comes from.
///
/// ```yaml
/// passphrase:
///   source_type: file
///   path: /root/.vault-backup-passphrase
/// ```
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(tag = "source_type")]
#[serde(rename_all = "snake_case")]
#[serde(deny_unknown_fields)]
pub enum PassphraseSource {
    /// First line of a file; a trailing `\n` or `\r\n` is dropped
    File { path: PathBuf },
    /// Value of an environment variable
    Env { var: String },
    /// Inline in the job file
    Inline { passphrase: RedactedString },
}

impl Display for PassphraseSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PassphraseSource::File { path } => write!(f, "file {:?}", path),
            PassphraseSource::Env { var } => write!(f, "environment variable {:?}", var),
            PassphraseSource::Inline { .. } => write!(f, "inline passphrase"),
        }
    }
}

impl Validate for PassphraseSource {
    fn validate(&self) -> result::Result<(), ValidationErrors> {
        match self {
            PassphraseSource::Env { var } if var.is_empty() => {
                let mut errors = ValidationErrors::new();
                errors.add(
                    "var",
                    ValidationError::new("EmptyEnvVar")
                        .with_message("environment variable name must not be empty".into()),
                );
                Err(errors)
            }
            _ => Ok(()),
        }
    }
}

impl PassphraseSource {
    /// Reads the passphrase. Unreadable or empty sources are
    /// `PassphraseMissing`.
    pub fn resolve(&self) -> Result<RedactedString> {
        let missing = |reason: String| Error::passphrase_missing(self.to_string(), reason);
        let passphrase = match self {
            PassphraseSource::File { path } => {
                let mut content = std::fs::read_to_string(path)
                    .map(RedactedString::from)
                    .map_err(|e| missing(e.to_string()))?;
                strip_line_break(&mut content);
                content
            }
            PassphraseSource::Env { var } => std::env::var(var)
                .map(RedactedString::from)
                .map_err(|e| missing(e.to_string()))?,
            PassphraseSource::Inline { passphrase } => passphrase.clone(),
        };

        if passphrase.is_empty() {
            return Err(missing("passphrase is empty".into()));
        }
        tracing::debug!("Resolved passphrase from {}", self);
        Ok(passphrase)
    }
}

fn strip_line_break(passphrase: &mut RedactedString) {
    let trimmed = passphrase
        .inner()
        .strip_suffix('\n')
        .map(|s| s.strip_suffix('\r').unwrap_or(s))
        .map(RedactedString::from);
    if let Some(trimmed) = trimmed {
        *passphrase = trimmed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_source_strips_trailing_line_break() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("pass");
        std::fs::write(&path, "secret\r\n").unwrap();

        let passphrase = PassphraseSource::File { path }.resolve().unwrap();
        assert_eq!(passphrase.inner(), "secret");
    }

    #[test]
    fn test_file_source_keeps_inner_whitespace() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("pass");
        std::fs::write(&path, " two words \n").unwrap();

        let passphrase = PassphraseSource::File { path }.resolve().unwrap();
        assert_eq!(passphrase.inner(), " two words ");
    }

    #[test]
    fn test_empty_file_is_passphrase_missing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("pass");
        std::fs::write(&path, "\n").unwrap();

        let err = PassphraseSource::File { path }.resolve().unwrap_err();
        assert!(matches!(err, Error::PassphraseMissing { .. }));
    }

    #[test]
    fn test_unreadable_file_is_passphrase_missing() {
        let temp_dir = TempDir::new().unwrap();
        let err = PassphraseSource::File {
            path: temp_dir.path().join("absent"),
        }
        .resolve()
        .unwrap_err();

        match err {
            Error::PassphraseMissing { origin, .. } => assert!(origin.starts_with("file")),
            e => panic!("Expected PassphraseMissing, got {e}"),
        }
    }

    #[test]
    fn test_unset_env_is_passphrase_missing() {
        let err = PassphraseSource::Env {
            var: "K_VAULT_BACKUP_TEST_UNSET_PASSPHRASE".into(),
        }
        .resolve()
        .unwrap_err();
        assert!(matches!(err, Error::PassphraseMissing { .. }));
    }

    #[test]
    fn test_inline_source() {
        let source = PassphraseSource::Inline {
            passphrase: "secret".into(),
        };
        assert_eq!(source.resolve().unwrap().inner(), "secret");
        assert!(!format!("{:?}", source).contains("secret"));
    }

    #[test]
    fn test_empty_env_var_name_fails_validation() {
        assert!(PassphraseSource::Env { var: "".into() }.validate().is_err());
        assert!(PassphraseSource::Env { var: "PASS".into() }.validate().is_ok());
    }

    #[test]
    fn test_deserialization() {
        let source: PassphraseSource =
            serde_yml::from_str("source_type: file\npath: /root/pass\n").unwrap();
        assert_eq!(
            source,
            PassphraseSource::File {
                path: "/root/pass".into()
            }
        );
    }
}
