//! Sub-pixel centroids of a selection mask.

use image::GrayImage;

use super::mask::is_selected;
use super::{DnChip, SelectionError};

/// Mean pixel coordinate of the selected pixels.
pub fn centroid(mask: &GrayImage) -> Result<[f64; 2], SelectionError> {
    let (w, h) = mask.dimensions();
    let (mut sx, mut sy, mut n) = (0.0, 0.0, 0usize);
    for y in 0..h {
        for x in 0..w {
            if is_selected(mask, x, y) {
                sx += f64::from(x);
                sy += f64::from(y);
                n += 1;
            }
        }
    }
    if n == 0 {
        return Err(SelectionError::EmptySelection);
    }
    Ok([sx / n as f64, sy / n as f64])
}

/// Selected pixel coordinates averaged with the DN of `chip` as weight.
///
/// `mask` and `chip` must have the same dimensions.
pub fn weighted_centroid(mask: &GrayImage, chip: &DnChip) -> Result<[f64; 2], SelectionError> {
    if mask.dimensions() != chip.dimensions() {
        return Err(SelectionError::DimensionMismatch {
            mask: mask.dimensions(),
            chip: chip.dimensions(),
        });
    }
    let (w, h) = mask.dimensions();
    let (mut sx, mut sy, mut sw) = (0.0, 0.0, 0.0);
    let mut any = false;
    for y in 0..h {
        for x in 0..w {
            if !is_selected(mask, x, y) {
                continue;
            }
            any = true;
            let dn = f64::from(chip.get_pixel(x, y)[0]);
            if !dn.is_finite() {
                continue;
            }
            sx += dn * f64::from(x);
            sy += dn * f64::from(y);
            sw += dn;
        }
    }
    if !any {
        return Err(SelectionError::EmptySelection);
    }
    if sw == 0.0 || !sw.is_finite() {
        return Err(SelectionError::ZeroWeight);
    }
    Ok([sx / sw, sy / sw])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::mask::{disk_mask, SELECTED};
    use approx::assert_abs_diff_eq;
    use image::{ImageBuffer, Luma};

    #[test]
    fn unweighted_disk_centroid() {
        let mask = disk_mask(50, 40, [21.0, 17.0], 6.0);
        let c = centroid(&mask).unwrap();
        assert_abs_diff_eq!(c[0], 21.0, epsilon = 1e-12);
        assert_abs_diff_eq!(c[1], 17.0, epsilon = 1e-12);
    }

    #[test]
    fn empty_mask_fails() {
        let mask = GrayImage::new(8, 8);
        assert_eq!(centroid(&mask), Err(SelectionError::EmptySelection));
        let chip: DnChip = ImageBuffer::from_pixel(8, 8, Luma([1.0]));
        assert_eq!(
            weighted_centroid(&mask, &chip),
            Err(SelectionError::EmptySelection)
        );
    }

    #[test]
    fn weights_pull_toward_bright_pixels() {
        let mut mask = GrayImage::new(5, 1);
        mask.put_pixel(1, 0, Luma([SELECTED]));
        mask.put_pixel(3, 0, Luma([SELECTED]));
        let chip: DnChip = ImageBuffer::from_fn(5, 1, |x, _| Luma([if x == 3 { 3.0 } else { 1.0 }]));
        let c = weighted_centroid(&mask, &chip).unwrap();
        assert_abs_diff_eq!(c[0], 2.5, epsilon = 1e-12);
        assert_abs_diff_eq!(c[1], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(centroid(&mask).unwrap()[0], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn mismatched_dimensions() {
        let mask = disk_mask(10, 10, [5.0, 5.0], 2.0);
        let chip: DnChip = ImageBuffer::new(10, 11);
        assert_eq!(
            weighted_centroid(&mask, &chip),
            Err(SelectionError::DimensionMismatch {
                mask: (10, 10),
                chip: (10, 11)
            })
        );
    }

    #[test]
    fn zero_dn_everywhere() {
        let mask = disk_mask(10, 10, [5.0, 5.0], 2.0);
        let chip: DnChip = ImageBuffer::new(10, 10);
        assert_eq!(weighted_centroid(&mask, &chip), Err(SelectionError::ZeroWeight));
    }
}
