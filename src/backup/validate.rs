//! Validation functions for configuration values.

use sanitize_filename::{is_sanitized, sanitize};
use validator::ValidationError;

static MAX_ARCHIVE_BASE_NAME_LEN: usize = 100;

pub fn validate_valid_archive_base_name<S: AsRef<str>>(name: S) -> Result<(), ValidationError> {
    let name = name.as_ref();
    if name.is_empty() {
        return Err(ValidationError::new("InvalidArchiveBaseName")
            .with_message("archive_base_name must not be empty".into()));
    }

    if name.len() > MAX_ARCHIVE_BASE_NAME_LEN {
        return Err(ValidationError::new("InvalidArchiveBaseName").with_message(
            format!(
                "archive_base_name is longer than {} bytes",
                MAX_ARCHIVE_BASE_NAME_LEN
            )
            .into(),
        ));
    }

    if !is_sanitized(name) {
        return Err(ValidationError::new("InvalidArchiveBaseName").with_message(
            format!(
                "Invalid file name, try sanitizing like {:?}",
                sanitize(name)
            )
            .into(),
        ));
    }

    Ok(())
}
