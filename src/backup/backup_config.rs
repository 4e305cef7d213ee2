use crate::backup::archive::SourceConfig;
use crate::backup::change_gate::ChangeGateConfig;
use crate::backup::compress::CompressorConfig;
use crate::backup::encrypt::passphrase::PassphraseSource;
use crate::backup::file_ext::FileExtProvider;
use crate::backup::notifications::NotificationConfig;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::AddMsg;
use crate::backup::retention::RetentionConfig;
use crate::backup::validate::validate_valid_archive_base_name;
use bon::Builder;
use getset::Getters;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::fs::File;
use std::path::{Path, PathBuf};
use validator::Validate;

static TAR_FILE_EXT: &str = "tar";

fn default_work_dir() -> PathBuf {
    std::env::temp_dir()
}

/// One backup job, loaded from YAML.
///
/// ```yaml
/// archive_base_name: vaultwarden
/// sources:
///   - type: path
///     path: /opt/vaultwarden/data
/// passphrase:
///   source_type: file
///   path: /root/.vault-backup-passphrase
/// destination: /mnt/backups/vaultwarden
/// retention:
///   days: 14
/// ```
///
/// Never mutated once a run starts; CLI overrides are applied through
/// [`BackupJob::with_overrides`] before that.
#[skip_serializing_none]
#[derive(Clone, Serialize, Deserialize, Debug, Validate, Builder, Getters)]
#[serde(deny_unknown_fields)]
#[getset(get = "pub")]
pub struct BackupJob {
    #[validate(custom(function = validate_valid_archive_base_name))]
    #[builder(into)]
    archive_base_name: String,
    #[validate(length(min = 1), nested)]
    #[builder(into)]
    sources: Vec<SourceConfig>,
    #[validate(nested)]
    passphrase: PassphraseSource,
    #[builder(into)]
    destination: PathBuf,
    /// Where the archive is built and encrypted before being published
    #[serde(default = "default_work_dir")]
    #[builder(default = default_work_dir(), into)]
    work_dir: PathBuf,
    #[serde(default)]
    #[validate(nested)]
    #[builder(default)]
    retention: RetentionConfig,
    #[serde(default)]
    #[validate(nested)]
    #[builder(default)]
    compressor: CompressorConfig,
    #[validate(nested)]
    change_gate: Option<ChangeGateConfig>,
    #[validate(nested)]
    notification: Option<NotificationConfig>,
    #[builder(into)]
    log_file: Option<PathBuf>,
}

/// Command line values that take precedence over the job file
#[derive(Clone, Debug, Default)]
pub struct JobOverrides {
    pub retention_days: Option<u32>,
    pub log_file: Option<PathBuf>,
    pub ignore_change_gate: bool,
}

impl BackupJob {
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let job = File::open(path)
            .map_err(Error::from)
            .and_then(|f| serde_yml::from_reader::<_, BackupJob>(f).map_err(Error::from))
            .add_msg(format!("Parse YAML config failed: {:?}", path))?;
        job.validate()
            .map_err(Error::from)
            .add_msg(format!("Config validation failed: {:?}", path))?;
        Ok(job)
    }

    pub fn with_overrides(mut self, overrides: JobOverrides) -> Result<Self> {
        if let Some(days) = overrides.retention_days {
            self.retention.days = days;
        }
        if let Some(log_file) = overrides.log_file {
            self.log_file = Some(log_file);
        }
        if overrides.ignore_change_gate {
            if let Some(gate) = self.change_gate.take() {
                tracing::info!(
                    "Change gate on {:?} disabled from command line",
                    gate.reference()
                );
            }
        }
        self.validate()
            .map_err(Error::from)
            .add_msg("Command line overrides are invalid")?;
        Ok(self)
    }

    /// `tar`, or `tar.<compression>` when a compressor is configured
    pub fn archive_file_ext(&self) -> String {
        std::iter::once(TAR_FILE_EXT)
            .chain(self.compressor.file_ext())
            .join(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::archive::path::PathSource;
    use crate::backup::compress::xz::XzConfig;
    use tempfile::TempDir;

    static FULL_CONFIG: &str = r#"
archive_base_name: vaultwarden
sources:
  - type: path
    path: /opt/vaultwarden/data
  - type: glob
    src_dir: /etc/vaultwarden
    globset: ["*.env"]
passphrase:
  source_type: file
  path: /root/.vault-backup-passphrase
destination: /mnt/backups/vaultwarden
work_dir: /var/tmp
retention:
  days: 31
compressor:
  compressor_type: xz
  level: 6
change_gate:
  reference: /opt/vaultwarden/data/db.sqlite3
  lookback: 1day
notification:
  type: smtp
  host: smtp.example.com
  smtp_mode: StartTls
  from: backup@example.com
  to: [ops@example.com, admin@example.com]
  username: backup
  password: hunter22
log_file: /var/log/vault-backup.log
"#;

    fn minimal_job() -> BackupJob {
        BackupJob::builder()
            .archive_base_name("vault")
            .sources(vec![SourceConfig::from(
                PathSource::builder().path("/data").build(),
            )])
            .passphrase(PassphraseSource::Env { var: "PASS".into() })
            .destination("/backups")
            .build()
    }

    #[test]
    fn test_full_config_parses_and_validates() {
        let job: BackupJob = serde_yml::from_str(FULL_CONFIG).unwrap();
        assert!(job.validate().is_ok());
        assert_eq!(job.sources().len(), 2);
        assert_eq!(job.retention().days, 31);
        assert_eq!(job.work_dir(), Path::new("/var/tmp"));
        assert!(job.change_gate().is_some());
        assert!(job.notification().is_some());
        assert_eq!(job.archive_file_ext(), "tar.xz");
    }

    #[test]
    fn test_defaults() {
        let job = minimal_job();
        assert_eq!(job.retention(), &RetentionConfig::default());
        assert_eq!(job.compressor(), &CompressorConfig::None);
        assert_eq!(job.work_dir(), &std::env::temp_dir());
        assert_eq!(job.archive_file_ext(), "tar");
        assert!(job.validate().is_ok());
    }

    #[test]
    fn test_empty_sources_fail_validation() {
        let job = BackupJob::builder()
            .archive_base_name("vault")
            .sources(vec![])
            .passphrase(PassphraseSource::Env { var: "PASS".into() })
            .destination("/backups")
            .build();
        assert!(job.validate().is_err());
    }

    #[test]
    fn test_invalid_nested_config_fails_validation() {
        let job = BackupJob::builder()
            .archive_base_name("vault")
            .sources(vec![SourceConfig::from(
                PathSource::builder().path("/data").build(),
            )])
            .passphrase(PassphraseSource::Env { var: "PASS".into() })
            .destination("/backups")
            .compressor(CompressorConfig::Xz(XzConfig { level: Some(42) }))
            .build();
        assert!(job.validate().is_err());
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let yaml = FULL_CONFIG.replace("work_dir:", "workdir:");
        assert!(serde_yml::from_str::<BackupJob>(&yaml).is_err());
    }

    #[test]
    fn test_overrides_take_precedence() {
        let mut job: BackupJob = serde_yml::from_str(FULL_CONFIG).unwrap();
        job = job
            .with_overrides(JobOverrides {
                retention_days: Some(1),
                log_file: Some("/tmp/run.log".into()),
                ignore_change_gate: true,
            })
            .unwrap();

        assert_eq!(job.retention().days, 1);
        assert_eq!(job.log_file().as_deref(), Some(Path::new("/tmp/run.log")));
        assert!(job.change_gate().is_none());
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let result = minimal_job().with_overrides(JobOverrides {
            retention_days: Some(0),
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_from_yaml_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("job.yml");
        std::fs::write(&path, FULL_CONFIG).unwrap();

        let job = BackupJob::from_yaml_file(&path).unwrap();
        assert_eq!(job.archive_base_name(), "vaultwarden");

        std::fs::write(&path, FULL_CONFIG.replace("days: 31", "days: 0")).unwrap();
        let err = BackupJob::from_yaml_file(&path).unwrap_err();
        assert!(matches!(err.root_cause(), Error::ValidationError(_)));
    }
}
