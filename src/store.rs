//! Record/compare lifecycle of a single snapshot.
//!
//! A store holds no state between calls. Invocations for different
//! identities may run concurrently; invocations for the *same* identity race
//! on its files and must be serialised by the caller.

use crate::artifact::{self, remove_stale};
use crate::capture::Capture;
use crate::config::{SnapshotConfig, SnapshotMode};
use crate::differ::{BitmapDiffer, DiffStats, DiffVerdict, IgnoreAntialiasing};
use crate::error::{Result, SnapshotError};
use crate::identity::{ScreenshotArtifacts, SnapshotIdentity};
use crate::pixels::PixelBuffer;
use crate::report::{NoReport, Reporter};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct SnapshotStore<D = IgnoreAntialiasing> {
    config: SnapshotConfig,
    differ: D,
}

impl SnapshotStore<IgnoreAntialiasing> {
    pub fn new(config: SnapshotConfig) -> Self {
        Self {
            config,
            differ: IgnoreAntialiasing::default(),
        }
    }
}

impl<D: BitmapDiffer> SnapshotStore<D> {
    pub fn with_differ<E: BitmapDiffer>(self, differ: E) -> SnapshotStore<E> {
        SnapshotStore {
            config: self.config,
            differ,
        }
    }

    pub fn config(&self) -> &SnapshotConfig {
        &self.config
    }

    pub fn mode(&self) -> SnapshotMode {
        self.config.mode
    }

    pub fn artifacts(&self, identity: &SnapshotIdentity) -> ScreenshotArtifacts {
        ScreenshotArtifacts::new(&self.config, identity)
    }

    /// Runs the configured mode for `captured`.
    ///
    /// Record mode never returns `Ok`: a fresh reference always ends in
    /// [`SnapshotError::RecordCompleted`] so it gets reviewed before it is
    /// trusted.
    pub fn snapshot(&self, identity: &SnapshotIdentity, captured: PixelBuffer) -> Result<DiffStats> {
        self.snapshot_with_report(identity, captured, &mut NoReport)
    }

    pub fn snapshot_with_report(
        &self,
        identity: &SnapshotIdentity,
        captured: PixelBuffer,
        reporter: &mut dyn Reporter,
    ) -> Result<DiffStats> {
        match self.config.mode {
            SnapshotMode::Record => self.record(identity, captured, reporter),
            SnapshotMode::Compare => self.compare(identity, captured, reporter),
        }
    }

    /// Captures from `source`, then behaves like [`SnapshotStore::snapshot`].
    pub fn snapshot_from(&self, identity: &SnapshotIdentity, source: &dyn Capture) -> Result<DiffStats> {
        self.snapshot(identity, source.capture()?)
    }

    pub fn record(
        &self,
        identity: &SnapshotIdentity,
        captured: PixelBuffer,
        reporter: &mut dyn Reporter,
    ) -> Result<DiffStats> {
        let files = self.artifacts(identity);
        artifact::write_png(&files.reference, &captured)?;
        remove_stale(&files.diff);
        log::info!("Stored screenshot to: {}", files.reference.display());
        attach_buffer(reporter, "Recorded", &captured);

        Err(SnapshotError::RecordCompleted {
            path: files.reference,
        })
    }

    pub fn compare(
        &self,
        identity: &SnapshotIdentity,
        captured: PixelBuffer,
        reporter: &mut dyn Reporter,
    ) -> Result<DiffStats> {
        let files = self.artifacts(identity);
        let reference = load_reference(&files.reference)?;
        let verdict = self.differ.diff(&reference, &captured);

        if let Some(name) = files.reference.file_name() {
            reporter.attach_text("Name", &name.to_string_lossy());
        }
        reporter.attach_text("Result", verdict.description());

        match verdict {
            DiffVerdict::Similar {
                stats, highlight, ..
            } => {
                remove_stale(&files.diff);
                remove_stale(&files.actual);
                match &highlight {
                    Some(highlight) => attach_buffer(reporter, "Diff", highlight),
                    None => attach_buffer(reporter, "Actual", &captured),
                }
                log::debug!("{identity}: {}", stats.describe());
                Ok(stats)
            }
            DiffVerdict::Different {
                description,
                highlight,
                ..
            } => {
                let mut pending = PendingArtifacts::default();
                pending.write(&files.diff, &highlight)?;
                pending.write(&files.actual, &captured)?;
                pending.keep();

                attach_buffer(reporter, "Expected", &reference);
                attach_buffer(reporter, "Actual", &captured);
                attach_buffer(reporter, "Diff", &highlight);
                log::info!("{identity}: {description}");

                Err(SnapshotError::VisualRegression {
                    description,
                    reference: files.reference,
                    actual: files.actual,
                    diff: files.diff,
                })
            }
        }
    }
}

fn load_reference(path: &Path) -> Result<PixelBuffer> {
    artifact::read_png(path).map_err(|e| {
        let reason = match e {
            SnapshotError::ArtifactIo { source, .. } => source.to_string(),
            other => other.to_string(),
        };
        SnapshotError::MissingReference {
            path: path.to_path_buf(),
            reason,
        }
    })
}

fn attach_buffer(reporter: &mut dyn Reporter, name: &str, buffer: &PixelBuffer) {
    if !reporter.wants_attachments() {
        return;
    }
    match buffer.encode_png() {
        Ok(png) => reporter.attach_png(name, &png),
        Err(e) => log::warn!("couldn't encode {name} attachment: {e}"),
    }
}

/// Files written for one failed comparison. Unless [`keep`] is called, the
/// files written so far are removed again when this goes out of scope, so a
/// failure halfway never leaves an actual without its diff.
///
/// [`keep`]: PendingArtifacts::keep
#[derive(Default)]
struct PendingArtifacts<'a> {
    written: Vec<&'a Path>,
    kept: bool,
}

impl<'a> PendingArtifacts<'a> {
    fn write(&mut self, path: &'a Path, buffer: &PixelBuffer) -> Result<()> {
        artifact::write_png(path, buffer)?;
        self.written.push(path);
        Ok(())
    }

    fn keep(mut self) {
        self.kept = true;
    }
}

impl Drop for PendingArtifacts<'_> {
    fn drop(&mut self) {
        if self.kept {
            return;
        }
        for path in self.written.drain(..) {
            remove_stale(path);
        }
    }
}
