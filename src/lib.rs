//! Screenshot testing: record reference PNGs, compare fresh captures against
//! them with an anti-aliasing tolerant differ, and leave actual/diff images
//! behind for review when something really changed.
//!
//! ```no_run
//! use plutonium_snapshot::{snapshot_identity, PngCapture, SnapshotConfig, SnapshotStore};
//!
//! let config = SnapshotConfig::default().apply_env()?;
//! let store = SnapshotStore::new(config);
//! store.snapshot_from(&snapshot_identity!("welcome"), &PngCapture::new("scene.png"))?;
//! # Ok::<(), plutonium_snapshot::SnapshotError>(())
//! ```

pub mod antialias;
pub mod artifact;
pub mod capture;
pub mod config;
pub mod differ;
pub mod error;
pub mod identity;
pub mod pixels;
pub mod report;
pub mod store;

pub use capture::{Capture, PngCapture};
#[cfg(feature = "svg")]
pub use capture::SvgCapture;
pub use config::{SnapshotConfig, SnapshotMode};
pub use differ::{BitmapDiffer, DiffStats, DiffVerdict, IgnoreAntialiasing, PixelClass, PixelExact};
pub use error::{ArtifactOp, SnapshotError};
pub use identity::{ScreenshotArtifacts, SnapshotIdentity};
pub use pixels::PixelBuffer;
pub use report::{MemoryReport, NoReport, Reporter, ReportStatus, ResultsDir};
pub use store::SnapshotStore;

// re-exported so callers can build pixels without naming the image crate
pub use image::Rgba;
