use crate::backup::archive::collect_entries;
use crate::backup::artifact::Artifact;
use crate::backup::backup_config::BackupJob;
use crate::backup::encrypt::{encrypt_file, ENCRYPTED_FILE_EXT};
use crate::backup::notifications::{Notification, NotificationConfig, NotificationEvent};
use crate::backup::publish::publish;
use crate::backup::redacted::RedactedString;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::AddMsg;
use crate::backup::tar::create_tar_archive;
use chrono::{DateTime, Utc};
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Position of a run in the backup pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Pre-flight checks, nothing written yet
    Idle,
    Collecting,
    Archiving,
    Encrypting,
    DeletingPlaintext,
    Publishing,
    Pruning,
    Done,
    Failed,
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }

    /// Stages only move forward one step at a time; `Failed` is reachable
    /// from any stage that is not already terminal.
    pub fn can_transition_to(&self, next: Stage) -> bool {
        match (self, next) {
            (Stage::Idle, Stage::Collecting)
            | (Stage::Collecting, Stage::Archiving)
            | (Stage::Archiving, Stage::Encrypting)
            | (Stage::Encrypting, Stage::DeletingPlaintext)
            | (Stage::DeletingPlaintext, Stage::Publishing)
            | (Stage::Publishing, Stage::Pruning)
            | (Stage::Pruning, Stage::Done) => true,
            (current, Stage::Failed) => !current.is_terminal(),
            _ => false,
        }
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Idle => "pre-flight",
            Stage::Collecting => "collecting",
            Stage::Archiving => "archiving",
            Stage::Encrypting => "encrypting",
            Stage::DeletingPlaintext => "deleting plaintext",
            Stage::Publishing => "publishing",
            Stage::Pruning => "pruning",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
pub enum PipelineOutcome {
    /// The change gate found nothing new; no file was touched
    Skipped,
    Done {
        published: PathBuf,
        pruned: Vec<PathBuf>,
    },
    Failed {
        stage: Stage,
        error: Error,
    },
}

impl PipelineOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, PipelineOutcome::Failed { .. })
    }
}

/// Drives one run of a [`BackupJob`] from pre-flight to `Done` or `Failed`.
///
/// Each stage starts only after the previous one succeeded and its output was
/// found on disk. The first error ends the run: no retries, no rollback.
/// Exactly one notification is sent per finished run; a skipped run sends none.
pub struct Pipeline<'a, N: Notification = NotificationConfig> {
    job: &'a BackupJob,
    notifier: Option<&'a N>,
    stage: Stage,
    artifact: Option<Artifact>,
}

impl<'a> Pipeline<'a, NotificationConfig> {
    pub fn new(job: &'a BackupJob) -> Self {
        Self::with_notifier(job, job.notification().as_ref())
    }
}

impl<'a, N: Notification> Pipeline<'a, N> {
    pub fn with_notifier(job: &'a BackupJob, notifier: Option<&'a N>) -> Self {
        Self {
            job,
            notifier,
            stage: Stage::Idle,
            artifact: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        self.artifact.as_ref()
    }

    pub fn run(&mut self, now: DateTime<Utc>) -> PipelineOutcome {
        tracing::info!("Starting backup {}", self.job.archive_base_name());
        let result = self.run_stages(now);
        self.conclude(result)
    }

    /// Moves to the terminal stage matching `result` and sends the one
    /// notification of the run.
    fn conclude(&mut self, result: Result<Option<(PathBuf, Vec<PathBuf>)>>) -> PipelineOutcome {
        let job = self.job;
        let job_name = job.archive_base_name().as_str();
        match result {
            Ok(None) => {
                tracing::info!("Backup {} skipped, nothing changed", job_name);
                PipelineOutcome::Skipped
            }
            Ok(Some((published, pruned))) => {
                self.advance(Stage::Done);
                tracing::info!("Backup {} done: {:?}", job_name, published);
                self.notify(NotificationEvent::success(
                    job_name,
                    published.display(),
                ));
                PipelineOutcome::Done { published, pruned }
            }
            Err(error) => {
                let stage = self.stage;
                if let Some(artifact) = self.artifact.as_mut() {
                    artifact.mark_failed();
                }
                self.advance(Stage::Failed);
                tracing::error!("Backup {} failed during {}: {}", job_name, stage, error);
                self.notify(NotificationEvent::failure(job_name, stage, &error));
                PipelineOutcome::Failed { stage, error }
            }
        }
    }

    /// `Ok(None)` when the change gate skips the run
    fn run_stages(&mut self, now: DateTime<Utc>) -> Result<Option<(PathBuf, Vec<PathBuf>)>> {
        let job = self.job;

        if let Some(gate) = job.change_gate() {
            if !gate.is_changed(now)? {
                return Ok(None);
            }
        }
        let passphrase = self.preflight()?;

        self.advance(Stage::Collecting);
        let entries = collect_entries(job.sources())?;

        self.advance(Stage::Archiving);
        let artifact = self.artifact.insert(Artifact::unbuilt(
            job.work_dir(),
            job.archive_base_name(),
            now,
            &job.archive_file_ext(),
        ));
        create_tar_archive(&entries, artifact.path(), job.compressor())?;
        artifact.mark_built();
        let plaintext = artifact.path().clone();

        self.advance(Stage::Encrypting);
        let encrypted = encrypt_file(&plaintext, &passphrase)?;
        self.mark_artifact(|a| a.mark_encrypted(encrypted.clone()));

        self.deliver(&plaintext, &encrypted, now).map(Some)
    }

    /// Everything after encryption: drop the plaintext, publish, prune
    fn deliver(
        &mut self,
        plaintext: &Path,
        encrypted: &Path,
        now: DateTime<Utc>,
    ) -> Result<(PathBuf, Vec<PathBuf>)> {
        let job = self.job;

        self.advance(Stage::DeletingPlaintext);
        delete_plaintext(plaintext)?;

        self.advance(Stage::Publishing);
        let published = publish(encrypted, job.destination())?;
        self.mark_artifact(|a| a.mark_published(published.clone()));

        self.advance(Stage::Pruning);
        let pruned = job
            .retention()
            .prune(job.destination(), ENCRYPTED_FILE_EXT, now)?;

        Ok((published, pruned))
    }

    /// Everything that can be known to fail before any file is written
    fn preflight(&self) -> Result<RedactedString> {
        let destination = self.job.destination();
        if !destination.is_dir() {
            return Err(Error::destination_missing(destination));
        }
        let passphrase_source = self.job.passphrase();
        passphrase_source
            .resolve()
            .add_msg(format!("Resolving passphrase from {} failed", passphrase_source))
    }

    fn advance(&mut self, next: Stage) {
        debug_assert!(
            self.stage.can_transition_to(next),
            "invalid stage transition {} -> {}",
            self.stage,
            next
        );
        tracing::info!("Stage {} -> {}", self.stage, next);
        self.stage = next;
    }

    fn mark_artifact<F: FnOnce(&mut Artifact)>(&mut self, f: F) {
        if let Some(artifact) = self.artifact.as_mut() {
            f(artifact)
        }
    }

    fn notify(&self, event: NotificationEvent) {
        match self.notifier {
            Some(notifier) => {
                event.dispatch(notifier);
            }
            None => tracing::debug!("No notification configured, dropping {:?}", event.outcome),
        }
    }
}

fn delete_plaintext(plaintext: &Path) -> Result<()> {
    if let Err(e) = std::fs::remove_file(plaintext) {
        return Err(Error::plaintext_deletion(plaintext).add_msg(e.to_string()));
    }
    if plaintext.exists() {
        return Err(Error::plaintext_deletion(plaintext));
    }
    tracing::info!("Deleted plaintext {:?}", plaintext);
    Ok(())
}
