use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use plutonium_snapshot::artifact::{read_png, write_png};
use plutonium_snapshot::{
    BitmapDiffer, Capture, DiffStats, DiffVerdict, IgnoreAntialiasing, PixelBuffer, PixelExact,
    PngCapture, ReportStatus, ResultsDir, SnapshotConfig, SnapshotIdentity, SnapshotMode,
    SnapshotStore,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "snapshots", about = "Record and compare screenshot snapshots")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compare two PNG files and report how many pixels differ.
    Diff {
        expected: PathBuf,
        actual: PathBuf,
        /// Write the highlight overlay here.
        #[arg(long)]
        highlight: Option<PathBuf>,
        /// Fail on any changed pixel instead of tolerating anti-aliasing.
        #[arg(long)]
        strict: bool,
    },
    /// Record or compare a capture (PNG or SVG) against its reference.
    Check {
        capture: PathBuf,
        /// Artifact file prefix, usually package_class_method.
        #[arg(long)]
        identity: String,
        /// Write a new reference instead of comparing.
        #[arg(long)]
        record: bool,
        /// TOML file with mode and directories.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Directory for report attachments and the result manifest.
        #[arg(long)]
        results: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Command::Diff {
            expected,
            actual,
            highlight,
            strict,
        } => diff(&expected, &actual, highlight.as_deref(), strict),
        Command::Check {
            capture,
            identity,
            record,
            config,
            results,
        } => check(&capture, &identity, record, config.as_deref(), results.as_deref()),
    }
}

fn diff(expected: &Path, actual: &Path, highlight: Option<&Path>, strict: bool) -> anyhow::Result<()> {
    let expected_buf = read_png(expected)
        .with_context(|| format!("Failed to open expected image: {}", expected.display()))?;
    let actual_buf = read_png(actual)
        .with_context(|| format!("Failed to open actual image: {}", actual.display()))?;

    let verdict = if strict {
        PixelExact.diff(&expected_buf, &actual_buf)
    } else {
        IgnoreAntialiasing::default().diff(&expected_buf, &actual_buf)
    };
    println!("{}", verdict.description());

    if let Some(path) = highlight {
        save_highlight(path, &verdict)?;
    }
    if verdict.is_different() {
        bail!("{} differs from {}", actual.display(), expected.display());
    }
    Ok(())
}

/// Returns whether an overlay was written. Identical inputs have none.
fn save_highlight(path: &Path, verdict: &DiffVerdict) -> anyhow::Result<bool> {
    match verdict.highlight() {
        Some(overlay) => {
            write_png(path, overlay)?;
            println!("Diff image saved to: {}", path.display());
            Ok(true)
        }
        None => {
            log::info!(
                "inputs are identical, no diff image written to {}",
                path.display()
            );
            Ok(false)
        }
    }
}

fn open_capture(path: &Path) -> anyhow::Result<Box<dyn Capture>> {
    let is_svg = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));
    if !is_svg {
        return Ok(Box::new(PngCapture::new(path)));
    }
    #[cfg(feature = "svg")]
    return Ok(Box::new(plutonium_snapshot::SvgCapture::from_file(path)));
    #[cfg(not(feature = "svg"))]
    bail!("SVG captures need the `svg` feature");
}

fn check(
    capture: &Path,
    identity: &str,
    record: bool,
    config: Option<&Path>,
    results: Option<&Path>,
) -> anyhow::Result<()> {
    let mut config = match config {
        Some(path) => SnapshotConfig::load(path)?,
        None => SnapshotConfig::default(),
    }
    .apply_env()?;
    if record {
        config = config.with_mode(SnapshotMode::Record);
    }

    let store = SnapshotStore::new(config);
    let identity = SnapshotIdentity::from_prefix(identity);
    let captured = open_capture(capture)?
        .capture()
        .with_context(|| format!("Failed to capture {}", capture.display()))?;

    let outcome = match results {
        Some(dir) => snapshot_with_results(&store, &identity, captured, ResultsDir::new(dir)?),
        None => store.snapshot(&identity, captured),
    };

    let stats = outcome?;
    println!("snapshot OK for {identity}: {}", stats.describe());
    Ok(())
}

/// The manifest is best effort: failing to write it is logged and the
/// snapshot outcome is returned as is.
fn snapshot_with_results(
    store: &SnapshotStore,
    identity: &SnapshotIdentity,
    captured: PixelBuffer,
    mut report: ResultsDir,
) -> plutonium_snapshot::error::Result<DiffStats> {
    let outcome = store.snapshot_with_report(identity, captured, &mut report);
    if let Err(e) = report.finish(identity.prefix(), ReportStatus::of(&outcome)) {
        log::warn!("couldn't write result manifest for {identity}: {e}");
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use plutonium_snapshot::{Rgba, SnapshotError};
    use std::fs;

    fn white() -> PixelBuffer {
        PixelBuffer::filled(4, 4, Rgba([255, 255, 255, 255])).unwrap()
    }

    #[test]
    fn identical_inputs_write_no_highlight() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("diff.png");
        let verdict = IgnoreAntialiasing::default().diff(&white(), &white());
        assert!(!save_highlight(&out, &verdict).unwrap());
        assert!(!out.exists());

        let dotted = PixelBuffer::from_fn(4, 4, |x, y| {
            if (x, y) == (1, 2) {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        })
        .unwrap();
        let verdict = IgnoreAntialiasing::default().diff(&white(), &dotted);
        assert!(save_highlight(&out, &verdict).unwrap());
        assert!(out.is_file());
    }

    #[test]
    fn manifest_failure_keeps_the_snapshot_outcome() {
        let tmp = tempfile::tempdir().unwrap();
        let config = SnapshotConfig::default().rooted_at(tmp.path());
        let identity = SnapshotIdentity::from_prefix("blank");
        let recorder = SnapshotStore::new(config.clone().with_mode(SnapshotMode::Record));
        let _ = recorder.snapshot(&identity, white());

        let results = tmp.path().join("results");
        let report = ResultsDir::new(&results).unwrap();
        // a regular file where the results directory was
        fs::remove_dir_all(&results).unwrap();
        fs::write(&results, b"not a directory").unwrap();

        let store = SnapshotStore::new(config.with_mode(SnapshotMode::Compare));
        let striped = PixelBuffer::from_fn(4, 4, |_, y| {
            if y < 2 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        })
        .unwrap();
        let outcome = snapshot_with_results(&store, &identity, striped, report);
        assert!(matches!(outcome, Err(SnapshotError::VisualRegression { .. })));
    }
}
