//! PNG artifacts on disk.

use crate::error::{ArtifactOp, Result, SnapshotError};
use crate::pixels::PixelBuffer;
use image::ImageReader;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

pub fn read_png(path: &Path) -> Result<PixelBuffer> {
    let image = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| SnapshotError::io(ArtifactOp::Read, path, e))?
        .decode()
        .map_err(|e| SnapshotError::image(ArtifactOp::Decode, path, e))?
        .to_rgba8();
    PixelBuffer::from_image(image)
}

/// Encodes `buffer` as PNG and replaces `path` with it.
///
/// The bytes go to a temporary file next to the target which is renamed
/// over it once fully written; if anything fails first, the temporary file
/// is removed and the target keeps its previous content.
pub fn write_png(path: &Path, buffer: &PixelBuffer) -> Result<()> {
    let bytes = buffer
        .encode_png()
        .map_err(|e| SnapshotError::image(ArtifactOp::Encode, path, e))?;
    write_atomically(path, &bytes)
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| SnapshotError::io(ArtifactOp::CreateDir, dir, e))?;

    let write_err = |e: io::Error| SnapshotError::io(ArtifactOp::Write, path, e);
    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

/// Deletes a leftover artifact. Returns whether something was removed.
///
/// Housekeeping only: failures other than "not found" are logged and
/// otherwise ignored.
pub fn remove_stale(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => {
            log::debug!("removed stale artifact {}", path.display());
            true
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            log::warn!("couldn't remove stale artifact {}: {e}", path.display());
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn write_creates_missing_directories_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/shot.png");
        let red = PixelBuffer::filled(4, 3, Rgba([255, 0, 0, 255])).unwrap();
        let blue = PixelBuffer::filled(2, 2, Rgba([0, 0, 255, 255])).unwrap();

        write_png(&path, &red).unwrap();
        assert!(read_png(&path).unwrap().same_as(&red));

        write_png(&path, &blue).unwrap();
        assert!(read_png(&path).unwrap().same_as(&blue));

        // only the target is left behind, no temporary files
        let entries = fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn reading_garbage_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        fs::write(&path, b"definitely not a png").unwrap();
        match read_png(&path) {
            Err(SnapshotError::ArtifactIo { operation, .. }) => {
                assert_eq!(operation, ArtifactOp::Decode)
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn removing_a_missing_file_is_quiet() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!remove_stale(&dir.path().join("nothing.png")));
    }
}
