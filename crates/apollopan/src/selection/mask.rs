//! Pixel-level helpers on binary selection masks.

use image::GrayImage;

use crate::conic::Ellipse;

/// Value written for selected pixels by the selection routines.
pub const SELECTED: u8 = 255;

#[inline]
pub(crate) fn is_selected(mask: &GrayImage, x: u32, y: u32) -> bool {
    mask.get_pixel(x, y)[0] != 0
}

/// Selected pixels with at least one unselected 8-neighbor inside the chip.
///
/// Neighbors that would fall outside the chip are not considered, so a
/// selection touching the chip border is not an edge there.
pub fn edge_pixels(mask: &GrayImage) -> Vec<[f64; 2]> {
    let (w, h) = mask.dimensions();
    let mut out = Vec::new();
    for y in 0..h {
        for x in 0..w {
            if !is_selected(mask, x, y) {
                continue;
            }
            let mut edge = false;
            'scan: for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let nx = i64::from(x) + dx;
                    let ny = i64::from(y) + dy;
                    if nx < 0 || ny < 0 || nx >= i64::from(w) || ny >= i64::from(h) {
                        continue;
                    }
                    if !is_selected(mask, nx as u32, ny as u32) {
                        edge = true;
                        break 'scan;
                    }
                }
            }
            if edge {
                out.push([f64::from(x), f64::from(y)]);
            }
        }
    }
    out
}

/// Number of selected pixels in the mask.
pub fn selected_count(mask: &GrayImage) -> usize {
    mask.pixels().filter(|p| p[0] != 0).count()
}

/// Pixel tallies of a mask against an ellipse interior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteriorCounts {
    /// Pixels whose center lies inside the ellipse.
    pub inside: usize,
    /// Selected pixels among `inside`.
    pub inside_selected: usize,
}

impl InteriorCounts {
    /// Fraction of the interior that is selected; 0 for an empty interior.
    pub fn ratio(&self) -> f64 {
        if self.inside == 0 {
            0.0
        } else {
            self.inside_selected as f64 / self.inside as f64
        }
    }
}

/// Integer pixel window covering the ellipse, clamped to the chip.
fn pixel_window(ellipse: &Ellipse, w: u32, h: u32) -> Option<(u32, u32, u32, u32)> {
    if w == 0 || h == 0 {
        return None;
    }
    let [hx, hy] = ellipse.half_extents();
    let [cx, cy] = ellipse.center;
    let x0 = (cx - hx).floor().max(0.0);
    let y0 = (cy - hy).floor().max(0.0);
    let x1 = (cx + hx).ceil().min(f64::from(w - 1));
    let y1 = (cy + hy).ceil().min(f64::from(h - 1));
    if !(x0 <= x1 && y0 <= y1) {
        return None;
    }
    Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
}

/// Count interior pixels (`(p − c)ᵀ A (p − c) <= 1`) and how many are selected.
pub fn interior_counts(mask: &GrayImage, ellipse: &Ellipse) -> InteriorCounts {
    let mut counts = InteriorCounts {
        inside: 0,
        inside_selected: 0,
    };
    let (w, h) = mask.dimensions();
    let Some((x0, y0, x1, y1)) = pixel_window(ellipse, w, h) else {
        return counts;
    };
    for y in y0..=y1 {
        for x in x0..=x1 {
            if ellipse.quadratic_form([f64::from(x), f64::from(y)]) <= 1.0 {
                counts.inside += 1;
                if is_selected(mask, x, y) {
                    counts.inside_selected += 1;
                }
            }
        }
    }
    counts
}

/// Clear every selected pixel lying more than `play` units outside the
/// ellipse. Returns the number of cleared pixels.
pub fn clear_outside(mask: &mut GrayImage, ellipse: &Ellipse, play: f64) -> usize {
    let (w, h) = mask.dimensions();
    let mut cleared = 0;
    for y in 0..h {
        for x in 0..w {
            if is_selected(mask, x, y) && !ellipse.contains([f64::from(x), f64::from(y)], play) {
                mask.get_pixel_mut(x, y)[0] = 0;
                cleared += 1;
            }
        }
    }
    cleared
}

#[cfg(test)]
pub(crate) fn disk_mask(w: u32, h: u32, center: [f64; 2], radius: f64) -> GrayImage {
    GrayImage::from_fn(w, h, |x, y| {
        let dx = f64::from(x) - center[0];
        let dy = f64::from(y) - center[1];
        let v = if dx * dx + dy * dy <= radius * radius {
            SELECTED
        } else {
            0
        };
        image::Luma([v])
    })
}
