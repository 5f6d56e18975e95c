//! Heuristic for telling anti-aliased edge pixels apart from real content
//! changes.
//!
//! An anti-aliased pixel sits on a brightness ramp: among its eight
//! neighbours there is something darker and something brighter, and at least
//! one of those extremes lies inside a flat region in *both* images.

use crate::pixels::{brightness, PixelBuffer};

/// A pixel with this many identical neighbours is part of a flat region.
pub const ENOUGH_SIBLINGS: u32 = 3;

/// The 3x3 window around a pixel, clamped to the buffer.
#[derive(Debug, Clone, Copy)]
struct Window {
    cx: u32,
    cy: u32,
    x0: u32,
    y0: u32,
    x2: u32,
    y2: u32,
}

impl Window {
    fn around(buffer: &PixelBuffer, cx: u32, cy: u32) -> Self {
        Self {
            cx,
            cy,
            x0: cx.saturating_sub(1),
            y0: cy.saturating_sub(1),
            x2: (cx + 1).min(buffer.width() - 1),
            y2: (cy + 1).min(buffer.height() - 1),
        }
    }

    /// Border pixels start out with one matching sibling so that the missing
    /// side of the window does not count against them.
    fn seed(&self) -> u32 {
        let clamped =
            self.cx == self.x0 || self.cx == self.x2 || self.cy == self.y0 || self.cy == self.y2;
        u32::from(clamped)
    }

    /// Neighbours in column-major order, centre excluded.
    fn neighbours(self) -> impl Iterator<Item = (u32, u32)> {
        (self.x0..=self.x2)
            .flat_map(move |x| (self.y0..=self.y2).map(move |y| (x, y)))
            .filter(move |&(x, y)| x != self.cx || y != self.cy)
    }
}

/// True when `(x, y)` in `a` looks like part of an anti-aliased edge that is
/// also supported by `b`.
///
/// `a` and `b` are expected to share dimensions.
pub fn is_antialiased(a: &PixelBuffer, b: &PixelBuffer, x: u32, y: u32) -> bool {
    let window = Window::around(a, x, y);
    let centre = brightness(a.pixel(x, y));

    let mut zeroes = window.seed();
    let mut min = 0.0f32;
    let mut max = 0.0f32;
    let mut darkest = None;
    let mut brightest = None;

    for (nx, ny) in window.neighbours() {
        let delta = brightness(a.pixel(nx, ny)) - centre;
        if delta == 0.0 {
            zeroes += 1;
            if zeroes >= ENOUGH_SIBLINGS {
                return false;
            }
        } else if delta < min {
            min = delta;
            darkest = Some((nx, ny));
        } else if delta > max {
            max = delta;
            brightest = Some((nx, ny));
        }
    }

    // a ramp needs both a darker and a brighter neighbour
    let (Some(darkest), Some(brightest)) = (darkest, brightest) else {
        return false;
    };

    let flat_in_both =
        |(px, py): (u32, u32)| has_many_siblings(a, px, py) && has_many_siblings(b, px, py);
    flat_in_both(darkest) || flat_in_both(brightest)
}

/// True when `(x, y)` has at least [`ENOUGH_SIBLINGS`] neighbours with the
/// exact same RGBA value. Out-of-range coordinates have no siblings.
pub fn has_many_siblings(buffer: &PixelBuffer, x: u32, y: u32) -> bool {
    if !buffer.contains(x, y) {
        return false;
    }
    let window = Window::around(buffer, x, y);
    let centre = buffer.pixel(x, y);
    let same = window
        .neighbours()
        .filter(|&(nx, ny)| buffer.pixel(nx, ny) == centre)
        .count() as u32;
    window.seed() + same >= ENOUGH_SIBLINGS
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
    const GREY: Rgba<u8> = Rgba([128, 128, 128, 255]);

    /// Left half white, right half black, a grey column at x == 2.
    fn edge() -> PixelBuffer {
        PixelBuffer::from_fn(5, 5, |x, _| match x {
            0 | 1 => WHITE,
            2 => GREY,
            _ => BLACK,
        })
        .unwrap()
    }

    #[test]
    fn corner_pixel_gets_a_free_sibling() {
        let buf = PixelBuffer::from_fn(3, 3, |x, y| if (x, y) == (1, 0) { WHITE } else { BLACK })
            .unwrap();
        // (0,0) has neighbours (0,1) and (1,1) black, (1,0) white: 2 + seed
        assert!(has_many_siblings(&buf, 0, 0));
        // centre has 7 identical neighbours and no seed
        assert!(has_many_siblings(&buf, 1, 1));
        // the odd white pixel matches nothing, seed alone is not enough
        assert!(!has_many_siblings(&buf, 1, 0));
    }

    #[test]
    fn ramp_pixel_between_flat_regions_is_antialiased() {
        let buf = edge();
        // grey neighbours above and below count as zero deltas: 2 < 3
        assert!(is_antialiased(&buf, &buf, 2, 2));
    }

    #[test]
    fn solid_pixel_is_not_antialiased() {
        let buf = edge();
        assert!(!is_antialiased(&buf, &buf, 0, 2));
        assert!(!is_antialiased(&buf, &buf, 4, 2));
    }

    #[test]
    fn isolated_dot_is_not_antialiased() {
        // only brighter neighbours, no ramp
        let buf = PixelBuffer::from_fn(5, 5, |x, y| if (x, y) == (2, 2) { BLACK } else { WHITE })
            .unwrap();
        assert!(!is_antialiased(&buf, &buf, 2, 2));
    }

    #[test]
    fn extremes_must_be_flat_in_the_other_image_too() {
        let a = edge();
        // horizontal stripes: every pixel has only two identical neighbours
        let b = PixelBuffer::from_fn(5, 5, |_, y| if y % 2 == 0 { WHITE } else { BLACK }).unwrap();
        assert!(!is_antialiased(&a, &b, 2, 2));
    }
}
