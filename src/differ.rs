use crate::antialias::is_antialiased;
use crate::pixels::{brightness, PixelBuffer};
use image::{Rgba, RgbaImage};

pub const TOLERATED_COLOR: Rgba<u8> = Rgba([255, 255, 0, 255]);
pub const DIFFERENCE_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// Something that can compare two rasters and decide whether they match.
pub trait BitmapDiffer {
    fn diff(&self, expected: &PixelBuffer, actual: &PixelBuffer) -> DiffVerdict;
}

/// Outcome for one coordinate of the comparison's bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelClass {
    Match,
    ToleratedAntialiasing,
    Difference,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStats {
    pub different: u64,
    pub tolerated: u64,
    pub total: u64,
}

impl DiffStats {
    fn identical(total: u64) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    #[inline]
    fn count(mut self, class: PixelClass) -> Self {
        self.total += 1;
        match class {
            PixelClass::Match => {}
            PixelClass::ToleratedAntialiasing => self.tolerated += 1,
            PixelClass::Difference => self.different += 1,
        }
        self
    }

    fn merge(self, other: Self) -> Self {
        Self {
            different: self.different + other.different,
            tolerated: self.tolerated + other.tolerated,
            total: self.total + other.total,
        }
    }

    pub fn describe(&self) -> String {
        let mut out = format!("{} of {} pixels different", self.different, self.total);
        if self.tolerated > 0 {
            out.push_str(&format!(
                " ({} ignored because look like some anti-aliasing)",
                self.tolerated
            ));
        }
        out
    }
}

/// Result of a comparison. A `Different` verdict always carries its
/// highlight overlay; dropping the verdict releases it.
#[derive(Debug, Clone)]
pub enum DiffVerdict {
    Similar {
        description: String,
        stats: DiffStats,
        highlight: Option<PixelBuffer>,
    },
    Different {
        description: String,
        stats: DiffStats,
        highlight: PixelBuffer,
    },
}

impl DiffVerdict {
    fn from_scan(stats: DiffStats, highlight: PixelBuffer, different: bool) -> Self {
        let description = stats.describe();
        if different {
            DiffVerdict::Different {
                description,
                stats,
                highlight,
            }
        } else {
            DiffVerdict::Similar {
                description,
                stats,
                highlight: Some(highlight),
            }
        }
    }

    pub fn description(&self) -> &str {
        match self {
            DiffVerdict::Similar { description, .. } | DiffVerdict::Different { description, .. } => {
                description
            }
        }
    }

    pub fn stats(&self) -> DiffStats {
        match self {
            DiffVerdict::Similar { stats, .. } | DiffVerdict::Different { stats, .. } => *stats,
        }
    }

    pub fn highlight(&self) -> Option<&PixelBuffer> {
        match self {
            DiffVerdict::Similar { highlight, .. } => highlight.as_ref(),
            DiffVerdict::Different { highlight, .. } => Some(highlight),
        }
    }

    pub fn into_highlight(self) -> Option<PixelBuffer> {
        match self {
            DiffVerdict::Similar { highlight, .. } => highlight,
            DiffVerdict::Different { highlight, .. } => Some(highlight),
        }
    }

    pub fn is_different(&self) -> bool {
        matches!(self, DiffVerdict::Different { .. })
    }
}

/// The comparison's bounding box and the per-buffer range limits.
#[derive(Debug, Clone, Copy)]
struct Bounds {
    width: u32,
    height: u32,
    expected: (u32, u32),
    actual: (u32, u32),
    same_size: bool,
}

impl Bounds {
    /// Each side is range-checked against the *other* buffer's size. A pixel
    /// is only read when both checks pass, so neither buffer is indexed out
    /// of range.
    fn of(expected: &PixelBuffer, actual: &PixelBuffer) -> Self {
        let expected_limit = actual.dimensions();
        let actual_limit = expected.dimensions();
        Self {
            width: expected_limit.0.max(actual_limit.0),
            height: expected_limit.1.max(actual_limit.1),
            expected: expected_limit,
            actual: actual_limit,
            same_size: expected_limit == actual_limit,
        }
    }

    #[inline]
    fn in_expected(&self, x: u32, y: u32) -> bool {
        x < self.expected.0 && y < self.expected.1
    }

    #[inline]
    fn in_actual(&self, x: u32, y: u32) -> bool {
        x < self.actual.0 && y < self.actual.1
    }
}

/// Classifies every coordinate of `bounds`, painting the highlight as it
/// goes, and folds the classes into [`DiffStats`].
fn scan<F>(bounds: Bounds, classify: F) -> (DiffStats, PixelBuffer)
where
    F: Fn(u32, u32) -> (PixelClass, Rgba<u8>) + Sync,
{
    let mut highlight = RgbaImage::new(bounds.width, bounds.height);
    let row_len = bounds.width as usize * 4;

    let paint_row = |(y, row): (usize, &mut [u8])| {
        row.chunks_exact_mut(4)
            .enumerate()
            .fold(DiffStats::default(), |stats, (x, out)| {
                let (class, color) = classify(x as u32, y as u32);
                out.copy_from_slice(&color.0);
                stats.count(class)
            })
    };

    #[cfg(feature = "parallel")]
    let stats = {
        use rayon::prelude::*;
        highlight
            .par_chunks_mut(row_len)
            .enumerate()
            .map(paint_row)
            .reduce(DiffStats::default, DiffStats::merge)
    };
    #[cfg(not(feature = "parallel"))]
    let stats = highlight
        .chunks_mut(row_len)
        .enumerate()
        .map(paint_row)
        .fold(DiffStats::default(), DiffStats::merge);

    (stats, PixelBuffer::wrap(highlight))
}

fn dimmed(pixel: Rgba<u8>) -> Rgba<u8> {
    let [r, g, b, a] = pixel.0;
    Rgba([r, g, b, a / 2])
}

/// Tolerates small brightness shifts and anti-aliased edges; fails only when
/// more than `max_different_pixels` pixels really changed.
#[derive(Debug, Clone, Copy)]
pub struct IgnoreAntialiasing {
    /// Largest brightness delta (0..=255 luma) still treated as noise.
    pub brightness_threshold: f32,
    pub max_different_pixels: u64,
}

impl Default for IgnoreAntialiasing {
    fn default() -> Self {
        Self {
            brightness_threshold: 2.0,
            max_different_pixels: 5,
        }
    }
}

impl IgnoreAntialiasing {
    pub fn classify(
        &self,
        expected: &PixelBuffer,
        actual: &PixelBuffer,
        x: u32,
        y: u32,
    ) -> PixelClass {
        self.paint(&Bounds::of(expected, actual), expected, actual, x, y).0
    }

    fn paint(
        &self,
        bounds: &Bounds,
        expected: &PixelBuffer,
        actual: &PixelBuffer,
        x: u32,
        y: u32,
    ) -> (PixelClass, Rgba<u8>) {
        if !(bounds.in_expected(x, y) && bounds.in_actual(x, y)) {
            return (PixelClass::Difference, DIFFERENCE_COLOR);
        }
        let expected_pixel = expected.pixel(x, y);
        let actual_pixel = actual.pixel(x, y);
        if expected_pixel == actual_pixel {
            return (PixelClass::Match, dimmed(expected_pixel));
        }

        let close = (brightness(expected_pixel) - brightness(actual_pixel)).abs()
            <= self.brightness_threshold;
        let antialiased = || {
            is_antialiased(actual, expected, x, y) || is_antialiased(expected, actual, x, y)
        };
        if close || (bounds.same_size && antialiased()) {
            (PixelClass::ToleratedAntialiasing, TOLERATED_COLOR)
        } else {
            (PixelClass::Difference, DIFFERENCE_COLOR)
        }
    }
}

impl BitmapDiffer for IgnoreAntialiasing {
    fn diff(&self, expected: &PixelBuffer, actual: &PixelBuffer) -> DiffVerdict {
        if expected.same_as(actual) {
            let stats = DiffStats::identical(actual.pixel_count());
            return DiffVerdict::Similar {
                description: stats.describe(),
                stats,
                highlight: None,
            };
        }

        let bounds = Bounds::of(expected, actual);
        let (stats, highlight) = scan(bounds, |x, y| self.paint(&bounds, expected, actual, x, y));
        log::debug!(
            "diffed {}x{} against {}x{}: {}",
            expected.width(),
            expected.height(),
            actual.width(),
            actual.height(),
            stats.describe()
        );
        DiffVerdict::from_scan(stats, highlight, stats.different > self.max_different_pixels)
    }
}

/// Fails on any pixel that is not bit-identical.
#[derive(Debug, Clone, Copy, Default)]
pub struct PixelExact;

impl BitmapDiffer for PixelExact {
    fn diff(&self, expected: &PixelBuffer, actual: &PixelBuffer) -> DiffVerdict {
        if expected.same_as(actual) {
            let stats = DiffStats::identical(actual.pixel_count());
            return DiffVerdict::Similar {
                description: stats.describe(),
                stats,
                highlight: None,
            };
        }

        let bounds = Bounds::of(expected, actual);
        let (stats, highlight) = scan(bounds, |x, y| {
            if !(bounds.in_expected(x, y) && bounds.in_actual(x, y)) {
                return (PixelClass::Difference, DIFFERENCE_COLOR);
            }
            let pixel = expected.pixel(x, y);
            if pixel == actual.pixel(x, y) {
                (PixelClass::Match, dimmed(pixel))
            } else {
                (PixelClass::Difference, DIFFERENCE_COLOR)
            }
        });
        DiffVerdict::from_scan(stats, highlight, stats.different > 0)
    }
}
