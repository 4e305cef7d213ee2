//! # k-vault-backup
//!
//! A single-run backup tool for a password-vault host: collect, archive,
//! encrypt, publish, prune.
//!
//! ## Features
//!
//! - **Sources**: files and directories, or glob-filtered directory walks
//! - **Compression**: optional XZ (LZMA) over the tar stream
//! - **Encryption**: age passphrase encryption, plaintext removed afterwards
//! - **Retention**: published artifacts older than the window are deleted
//! - **Change gate**: skip the run when a reference file has not changed
//! - **Notifications**: one SMTP mail per finished run
//!
//! ## Quick Start
//!
//! ```no_run
//! use chrono::Utc;
//! use k_vault_backup::backup::backup_config::BackupJob;
//! use k_vault_backup::backup::pipeline::Pipeline;
//!
//! let job = BackupJob::from_yaml_file("job.yml")?;
//! let outcome = Pipeline::new(&job).run(Utc::now());
//! assert!(!outcome.is_failed());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod backup;
