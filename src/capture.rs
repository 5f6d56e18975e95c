use crate::artifact;
use crate::error::Result;
use crate::pixels::PixelBuffer;
use std::path::PathBuf;

/// Produces the pixels of the surface under test.
pub trait Capture {
    fn capture(&self) -> Result<PixelBuffer>;
}

impl Capture for PixelBuffer {
    fn capture(&self) -> Result<PixelBuffer> {
        Ok(self.clone())
    }
}

/// A surface that was already rendered to a PNG file.
#[derive(Debug, Clone)]
pub struct PngCapture {
    path: PathBuf,
}

impl PngCapture {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Capture for PngCapture {
    fn capture(&self) -> Result<PixelBuffer> {
        artifact::read_png(&self.path)
    }
}

#[cfg(feature = "svg")]
pub use svg::SvgCapture;

#[cfg(feature = "svg")]
mod svg {
    use super::Capture;
    use crate::error::{Result, SnapshotError};
    use crate::pixels::PixelBuffer;
    use image::Rgba;
    use resvg::usvg::{Options, Tree};
    use std::borrow::Cow;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tiny_skia::{Color, Pixmap, Transform};

    #[derive(Debug, Clone)]
    enum Source {
        File(PathBuf),
        Inline(String),
    }

    /// Rasterises an SVG scene with resvg.
    #[derive(Debug, Clone)]
    pub struct SvgCapture {
        source: Source,
        background: Option<Rgba<u8>>,
        scale: f32,
    }

    impl SvgCapture {
        pub fn from_file(path: impl Into<PathBuf>) -> Self {
            Self::with_source(Source::File(path.into()))
        }

        pub fn from_svg(svg: impl Into<String>) -> Self {
            Self::with_source(Source::Inline(svg.into()))
        }

        fn with_source(source: Source) -> Self {
            Self {
                source,
                background: None,
                scale: 1.0,
            }
        }

        /// Fill behind the scene; transparent when unset.
        pub fn with_background(mut self, color: Rgba<u8>) -> Self {
            self.background = Some(color);
            self
        }

        /// Device pixels per SVG user unit.
        pub fn with_scale(mut self, scale: f32) -> Self {
            self.scale = scale;
            self
        }

        fn data(&self) -> Result<Cow<'_, [u8]>> {
            match &self.source {
                Source::Inline(svg) => Ok(Cow::Borrowed(svg.as_bytes())),
                Source::File(path) => std::fs::read(path).map(Cow::Owned).map_err(|e| {
                    SnapshotError::Capture(format!("failed to read {}: {e}", path.display()))
                }),
            }
        }
    }

    impl Capture for SvgCapture {
        fn capture(&self) -> Result<PixelBuffer> {
            if !(self.scale.is_finite() && self.scale > 0.0) {
                return Err(SnapshotError::Capture(format!(
                    "scale must be positive, got {}",
                    self.scale
                )));
            }
            let data = self.data()?;

            let mut options = Options::default();
            Arc::make_mut(&mut options.fontdb).load_system_fonts();
            let tree = Tree::from_data(&data, &options)
                .map_err(|e| SnapshotError::Capture(format!("failed to parse SVG: {e}")))?;

            let size = tree.size();
            let width = (size.width() * self.scale).ceil().max(1.0) as u32;
            let height = (size.height() * self.scale).ceil().max(1.0) as u32;
            let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
                SnapshotError::Capture(format!("failed to create {width}x{height} pixmap"))
            })?;
            let fill = match self.background {
                Some(Rgba([r, g, b, a])) => Color::from_rgba8(r, g, b, a),
                None => Color::TRANSPARENT,
            };
            pixmap.fill(fill);
            resvg::render(
                &tree,
                Transform::from_scale(self.scale, self.scale),
                &mut pixmap.as_mut(),
            );

            // tiny-skia stores premultiplied alpha
            let rgba = pixmap
                .pixels()
                .iter()
                .flat_map(|pixel| {
                    let c = pixel.demultiply();
                    [c.red(), c.green(), c.blue(), c.alpha()]
                })
                .collect();
            PixelBuffer::new(width, height, rgba)
        }
    }

}
