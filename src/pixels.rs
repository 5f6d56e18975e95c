use crate::error::{Result, SnapshotError};
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageFormat, Rgba, RgbaImage};

/// An immutable RGBA8 raster, row-major.
///
/// Buffers are handed around by value wherever a step finishes with them,
/// so a buffer is dropped as soon as its last consumer returns, on the error
/// path as well.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    image: RgbaImage,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(SnapshotError::InvalidBuffer(format!(
                "dimensions must be positive, got {width}x{height}"
            )));
        }
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(SnapshotError::InvalidBuffer(format!(
                "{width}x{height} needs {expected} bytes, got {}",
                rgba.len()
            )));
        }
        let image = RgbaImage::from_raw(width, height, rgba)
            .ok_or_else(|| SnapshotError::InvalidBuffer("raw buffer too small".to_string()))?;
        Ok(Self { image })
    }

    pub fn from_image(image: RgbaImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(SnapshotError::InvalidBuffer(format!(
                "dimensions must be positive, got {width}x{height}"
            )));
        }
        Ok(Self { image })
    }

    /// Callers guarantee non-zero dimensions.
    pub(crate) fn wrap(image: RgbaImage) -> Self {
        debug_assert!(image.width() > 0 && image.height() > 0);
        Self { image }
    }

    /// Builds a buffer by evaluating `f` for every coordinate.
    pub fn from_fn<F>(width: u32, height: u32, f: F) -> Result<Self>
    where
        F: FnMut(u32, u32) -> Rgba<u8>,
    {
        Self::from_image(RgbaImage::from_fn(width, height, f))
    }

    pub fn filled(width: u32, height: u32, color: Rgba<u8>) -> Result<Self> {
        Self::from_fn(width, height, |_, _| color)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn pixel_count(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// Panics if `(x, y)` is outside the buffer.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        *self.image.get_pixel(x, y)
    }

    #[inline]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width() && y < self.height()
    }

    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Same dimensions and bit-identical pixels.
    pub fn same_as(&self, other: &PixelBuffer) -> bool {
        self.dimensions() == other.dimensions() && self.as_raw() == other.as_raw()
    }

    pub fn encode_png(&self) -> image::ImageResult<Vec<u8>> {
        let mut out = Vec::new();
        PngEncoder::new(&mut out).write_image(
            self.image.as_raw(),
            self.width(),
            self.height(),
            ExtendedColorType::Rgba8,
        )?;
        Ok(out)
    }

    pub fn decode_png(bytes: &[u8]) -> image::ImageResult<Self> {
        let image = image::load_from_memory_with_format(bytes, ImageFormat::Png)?.to_rgba8();
        Ok(Self { image })
    }
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish_non_exhaustive()
    }
}

/// Perceived lightness on a 0..=255 scale. Translucent pixels are composited
/// over white first.
pub fn brightness(pixel: Rgba<u8>) -> f32 {
    let [r, g, b, a] = pixel.0;
    if a < 255 {
        let alpha = a as f32 / 255.0;
        rgb_to_y(blend(r, alpha), blend(g, alpha), blend(b, alpha))
    } else {
        rgb_to_y(r, g, b)
    }
}

#[inline]
fn rgb_to_y(red: u8, green: u8, blue: u8) -> f32 {
    red as f32 * 0.298_895_3 + green as f32 * 0.586_622_5 + blue as f32 * 0.114_482_23
}

#[inline]
fn blend(channel: u8, alpha: f32) -> u8 {
    (255.0 + (channel as f32 - 255.0) * alpha).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_short_buffers() {
        assert!(PixelBuffer::new(0, 4, Vec::new()).is_err());
        assert!(PixelBuffer::new(2, 2, vec![0; 15]).is_err());
        assert!(PixelBuffer::new(2, 2, vec![0; 16]).is_ok());
    }

    #[test]
    fn brightness_of_primaries() {
        assert!((brightness(Rgba([255, 255, 255, 255])) - 255.0).abs() < 1e-2);
        assert!(brightness(Rgba([0, 0, 0, 255])).abs() < 1e-6);
        assert!((brightness(Rgba([255, 0, 0, 255])) - 76.2183).abs() < 1e-2);
    }

    #[test]
    fn transparent_pixels_read_as_white() {
        let clear_black = brightness(Rgba([0, 0, 0, 0]));
        assert!((clear_black - 255.0).abs() < 1e-2);
        let half_black = brightness(Rgba([0, 0, 0, 128]));
        assert!(half_black > 120.0 && half_black < 130.0);
    }

    #[test]
    fn png_is_lossless() {
        let buf = PixelBuffer::from_fn(3, 2, |x, y| Rgba([x as u8 * 40, y as u8 * 90, 7, 200]))
            .unwrap();
        let bytes = buf.encode_png().unwrap();
        let back = PixelBuffer::decode_png(&bytes).unwrap();
        assert!(buf.same_as(&back));
    }
}
