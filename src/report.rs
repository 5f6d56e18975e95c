//! Attachments handed to whatever reports on a snapshot run.
//!
//! Reporting is best effort: the store never changes its verdict because an
//! attachment could not be produced or stored.

use crate::error::{ArtifactOp, Result, SnapshotError};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub trait Reporter {
    fn attach_text(&mut self, name: &str, text: &str);
    fn attach_png(&mut self, name: &str, png: &[u8]);

    /// Lets callers skip encoding images nobody will look at.
    fn wants_attachments(&self) -> bool {
        true
    }
}

/// Discards every attachment.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoReport;

impl Reporter for NoReport {
    fn attach_text(&mut self, _name: &str, _text: &str) {}
    fn attach_png(&mut self, _name: &str, _png: &[u8]) {}

    fn wants_attachments(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentBody {
    Text(String),
    Png(Vec<u8>),
}

/// Keeps attachments in memory, in the order they were made.
#[derive(Debug, Default, Clone)]
pub struct MemoryReport {
    pub attachments: Vec<(String, AttachmentBody)>,
}

impl MemoryReport {
    pub fn names(&self) -> Vec<&str> {
        self.attachments.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&AttachmentBody> {
        self.attachments
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, body)| body)
    }
}

impl Reporter for MemoryReport {
    fn attach_text(&mut self, name: &str, text: &str) {
        self.attachments
            .push((name.to_string(), AttachmentBody::Text(text.to_string())));
    }

    fn attach_png(&mut self, name: &str, png: &[u8]) {
        self.attachments
            .push((name.to_string(), AttachmentBody::Png(png.to_vec())));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Passed,
    Failed,
    Broken,
}

impl ReportStatus {
    /// Snapshot failures are test failures; anything else means the run
    /// itself broke.
    pub fn of<T>(outcome: &Result<T>) -> Self {
        match outcome {
            Ok(_) => ReportStatus::Passed,
            Err(
                SnapshotError::MissingReference { .. }
                | SnapshotError::RecordCompleted { .. }
                | SnapshotError::VisualRegression { .. },
            ) => ReportStatus::Failed,
            Err(_) => ReportStatus::Broken,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub mime: String,
    pub source: String,
}

#[derive(Serialize)]
struct ResultRecord<'a> {
    uuid: String,
    name: &'a str,
    status: ReportStatus,
    attachments: &'a [AttachmentRecord],
}

/// Writes attachments as `<uuid>-attachment.<ext>` files and one
/// `<uuid>-result.json` per test into a results directory.
#[derive(Debug)]
pub struct ResultsDir {
    dir: PathBuf,
    attachments: Vec<AttachmentRecord>,
}

impl ResultsDir {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| SnapshotError::io(ArtifactOp::CreateDir, &dir, e))?;
        Ok(Self {
            dir,
            attachments: Vec::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn attachments(&self) -> &[AttachmentRecord] {
        &self.attachments
    }

    fn store(&mut self, name: &str, mime: &str, extension: &str, bytes: &[u8]) {
        let source = format!("{}-attachment.{extension}", Uuid::new_v4());
        let path = self.dir.join(&source);
        if let Err(e) = fs::write(&path, bytes) {
            log::warn!("couldn't store attachment {name:?} at {}: {e}", path.display());
            return;
        }
        self.attachments.push(AttachmentRecord {
            name: name.to_string(),
            mime: mime.to_string(),
            source,
        });
    }

    /// Writes the result manifest and returns its path.
    pub fn finish(self, test_name: &str, status: ReportStatus) -> Result<PathBuf> {
        let uuid = Uuid::new_v4().to_string();
        let path = self.dir.join(format!("{uuid}-result.json"));
        let record = ResultRecord {
            uuid,
            name: test_name,
            status,
            attachments: &self.attachments,
        };
        let json = serde_json::to_vec_pretty(&record).map_err(|e| {
            SnapshotError::io(ArtifactOp::Encode, &path, std::io::Error::other(e))
        })?;
        fs::write(&path, json).map_err(|e| SnapshotError::io(ArtifactOp::Write, &path, e))?;
        Ok(path)
    }
}

impl Reporter for ResultsDir {
    fn attach_text(&mut self, name: &str, text: &str) {
        self.store(name, "text/plain", "txt", text.as_bytes());
    }

    fn attach_png(&mut self, name: &str, png: &[u8]) {
        self.store(name, "image/png", "png", png);
    }
}
