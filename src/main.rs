use chrono::Utc;
use clap::Parser;
use k_vault_backup::backup::backup_config::{BackupJob, JobOverrides};
use k_vault_backup::backup::pipeline::{Pipeline, PipelineOutcome};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::exit;
use std::sync::Mutex;
use tracing::{error, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Back up a vault host: archive, encrypt, publish and prune old backups
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Location of the job file
    #[arg(short, long)]
    config: PathBuf,
    /// Delete published backups older than this many days
    #[arg(long)]
    retention_days: Option<u32>,
    /// Also append log output to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// Run even if the change gate reference has not changed
    #[arg(long)]
    ignore_change_gate: bool,
}

impl Args {
    fn overrides(&self) -> JobOverrides {
        JobOverrides {
            retention_days: self.retention_days,
            log_file: self.log_file.clone(),
            ignore_change_gate: self.ignore_change_gate,
        }
    }
}

/// Console logging always; the log file is best effort.
fn init_logging(log_file: Option<&Path>) {
    let opened = log_file.map(|path| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| (path, e))
    });
    let (file, open_error) = match opened {
        Some(Ok(file)) => (Some(file), None),
        Some(Err(e)) => (None, Some(e)),
        None => (None, None),
    };

    let file_layer = file.map(|file| {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(Mutex::new(file))
    });
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .with(LevelFilter::INFO)
        .init();

    if let Some((path, e)) = open_error {
        warn!("Opening log file {:?} failed, logging to console only: {}", path, e);
    }
}

fn main() {
    let args = Args::parse();

    let loaded = BackupJob::from_yaml_file(&args.config);
    let log_file = args
        .log_file
        .clone()
        .or_else(|| loaded.as_ref().ok().and_then(|job| job.log_file().clone()));
    init_logging(log_file.as_deref());

    let job = match loaded.and_then(|job| job.with_overrides(args.overrides())) {
        Ok(job) => job,
        Err(e) => {
            error!("{e}");
            exit(1);
        }
    };

    match Pipeline::new(&job).run(Utc::now()) {
        PipelineOutcome::Failed { .. } => exit(1),
        PipelineOutcome::Skipped | PipelineOutcome::Done { .. } => {}
    }
}
