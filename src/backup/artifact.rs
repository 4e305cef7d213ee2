use chrono::{DateTime, Utc};
use getset::{CopyGetters, Getters};
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

static TIME_FORMAT: &str = "%Y-%m-%dT%Hh%Mm%Ss%z";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactState {
    Unbuilt,
    Built,
    Encrypted,
    Published,
    Failed,
}

impl Display for ArtifactState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ArtifactState::Unbuilt => "unbuilt",
            ArtifactState::Built => "built",
            ArtifactState::Encrypted => "encrypted",
            ArtifactState::Published => "published",
            ArtifactState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// The backup file as it moves through the pipeline.
///
/// The name is derived from the run's UTC timestamp at second resolution, so
/// two runs started within the same second produce the same name. The archiver
/// refuses to overwrite, which turns such a collision into a failed run.
#[derive(Debug, Clone, Getters, CopyGetters)]
pub struct Artifact {
    #[getset(get = "pub")]
    path: PathBuf,
    #[getset(get_copy = "pub")]
    created_at: DateTime<Utc>,
    #[getset(get_copy = "pub")]
    state: ArtifactState,
}

impl Artifact {
    pub fn file_name(base_name: &str, created_at: DateTime<Utc>, ext: &str) -> String {
        format!(
            "{}.{}.{}",
            base_name,
            created_at.format(TIME_FORMAT).to_string().replace('+', "_"),
            ext
        )
    }

    pub fn unbuilt<P: AsRef<Path>>(
        dir: P,
        base_name: &str,
        created_at: DateTime<Utc>,
        ext: &str,
    ) -> Self {
        Self {
            path: dir
                .as_ref()
                .join(Self::file_name(base_name, created_at, ext)),
            created_at,
            state: ArtifactState::Unbuilt,
        }
    }

    pub fn mark_built(&mut self) {
        self.transition(ArtifactState::Built, None);
    }

    pub fn mark_encrypted(&mut self, encrypted_path: PathBuf) {
        self.transition(ArtifactState::Encrypted, Some(encrypted_path));
    }

    pub fn mark_published(&mut self, published_path: PathBuf) {
        self.transition(ArtifactState::Published, Some(published_path));
    }

    pub fn mark_failed(&mut self) {
        self.transition(ArtifactState::Failed, None);
    }

    fn transition(&mut self, state: ArtifactState, path: Option<PathBuf>) {
        tracing::debug!("Artifact {:?}: {} -> {}", self.path, self.state, state);
        if let Some(path) = path {
            self.path = path;
        }
        self.state = state;
    }
}
