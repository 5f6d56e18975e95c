use std::fmt;
use std::path::{Path, PathBuf};

/// Filesystem step that failed while handling a snapshot artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactOp {
    Read,
    Decode,
    Encode,
    Write,
    CreateDir,
}

impl fmt::Display for ArtifactOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            ArtifactOp::Read => "read",
            ArtifactOp::Decode => "decode",
            ArtifactOp::Encode => "encode",
            ArtifactOp::Write => "write",
            ArtifactOp::CreateDir => "create directory",
        };
        f.write_str(verb)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error(
        "Couldn't load reference screenshot {}: {reason}\nRun in record mode to create it.",
        path.display()
    )]
    MissingReference { path: PathBuf, reason: String },

    #[error(
        "Record enabled. Saved new reference screenshot:\n{}",
        file_url(path)
    )]
    RecordCompleted { path: PathBuf },

    #[error(
        "Screenshot is different from the reference!\n{description}\nExpected: {}\nActual: {}\nDiff: {}",
        file_url(reference),
        file_url(actual),
        file_url(diff)
    )]
    VisualRegression {
        description: String,
        reference: PathBuf,
        actual: PathBuf,
        diff: PathBuf,
    },

    #[error("couldn't {operation} {}: {source}", path.display())]
    ArtifactIo {
        operation: ArtifactOp,
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("invalid pixel buffer: {0}")]
    InvalidBuffer(String),

    #[error("capture failed: {0}")]
    Capture(String),

    #[error("invalid snapshot config: {0}")]
    Config(String),
}

impl SnapshotError {
    pub(crate) fn io(operation: ArtifactOp, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SnapshotError::ArtifactIo {
            operation,
            path: path.into(),
            source: image::ImageError::IoError(source),
        }
    }

    pub(crate) fn image(
        operation: ArtifactOp,
        path: impl Into<PathBuf>,
        source: image::ImageError,
    ) -> Self {
        SnapshotError::ArtifactIo {
            operation,
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, SnapshotError>;

/// Relative artifact dirs are resolved against the working directory so the
/// link stays clickable.
fn file_url(path: &Path) -> String {
    let path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    format!("file://{}", path.display())
}
