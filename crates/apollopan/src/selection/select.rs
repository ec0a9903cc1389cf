//! Seed selection from DN chips and the fiducial centroiding pipeline.

use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};

use super::centroid::{centroid, weighted_centroid};
use super::mask::{selected_count, SELECTED};
use super::reduce::{elliptical_reduction, ReductionConfig};
use super::{DnChip, SelectionError};
use crate::conic::Ellipse;

/// Select the 8-connected region around the chip center whose DN lies in
/// `[min_dn, max_dn]`.
///
/// The mask is empty when the center pixel itself is outside the window.
/// NaN DNs are never selected.
pub fn select_dn_range(chip: &DnChip, min_dn: f32, max_dn: f32) -> GrayImage {
    let (w, h) = chip.dimensions();
    let mut mask = GrayImage::new(w, h);
    if w == 0 || h == 0 {
        return mask;
    }
    let in_window = |x: u32, y: u32| {
        let v = chip.get_pixel(x, y)[0];
        v >= min_dn && v <= max_dn
    };

    let seed = (w / 2, h / 2);
    if !in_window(seed.0, seed.1) {
        return mask;
    }
    mask.put_pixel(seed.0, seed.1, Luma([SELECTED]));
    let mut stack = vec![seed];
    while let Some((x, y)) = stack.pop() {
        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                let nx = i64::from(x) + dx;
                let ny = i64::from(y) + dy;
                if nx < 0 || ny < 0 || nx >= i64::from(w) || ny >= i64::from(h) {
                    continue;
                }
                let (nx, ny) = (nx as u32, ny as u32);
                if mask.get_pixel(nx, ny)[0] == 0 && in_window(nx, ny) {
                    mask.put_pixel(nx, ny, Luma([SELECTED]));
                    stack.push((nx, ny));
                }
            }
        }
    }
    mask
}

/// How the final centroid weighs the surviving pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CentroidWeighting {
    /// Plain mean of the pixel positions.
    #[default]
    Unweighted,
    /// Positions weighted by DN.
    DnWeighted,
}

/// Configuration of [`FiducialCentroider`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CentroidConfig {
    /// Lower end of the inclusive DN window of the mark.
    pub min_dn: f32,
    /// Upper end of the DN window.
    pub max_dn: f32,
    /// Elliptical reduction applied to the selection.
    pub reduction: ReductionConfig,
    pub weighting: CentroidWeighting,
}

impl Default for CentroidConfig {
    fn default() -> Self {
        Self {
            min_dn: 0.0,
            max_dn: f32::MAX,
            reduction: ReductionConfig::default(),
            weighting: CentroidWeighting::Unweighted,
        }
    }
}

/// A located fiducial mark.
#[derive(Debug, Clone)]
pub struct FiducialCenter {
    /// Sub-pixel center in chip coordinates.
    pub center: [f64; 2],
    /// Ellipse retained by the reduction.
    pub ellipse: Ellipse,
    /// Pixels selected by the DN window.
    pub selected: usize,
    /// Pixels trimmed by the reduction.
    pub cleared: usize,
}

/// DN selection, elliptical reduction and centroiding of one fiducial chip.
#[derive(Debug, Clone, Default)]
pub struct FiducialCentroider {
    config: CentroidConfig,
}

impl FiducialCentroider {
    /// Centroider with the given configuration.
    pub fn new(config: CentroidConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    pub fn config(&self) -> &CentroidConfig {
        &self.config
    }

    /// Locate the mark at the center of `chip`.
    pub fn locate(&self, chip: &DnChip) -> Result<FiducialCenter, SelectionError> {
        let mut mask = select_dn_range(chip, self.config.min_dn, self.config.max_dn);
        let selected = selected_count(&mask);
        if selected == 0 {
            return Err(SelectionError::EmptySelection);
        }

        let outcome =
            elliptical_reduction(&mut mask, &self.config.reduction).ok_or(SelectionError::NoEllipse)?;
        let center = match self.config.weighting {
            CentroidWeighting::Unweighted => centroid(&mask)?,
            CentroidWeighting::DnWeighted => weighted_centroid(&mask, chip)?,
        };
        tracing::debug!(
            selected,
            cleared = outcome.cleared,
            x = center[0],
            y = center[1],
            "fiducial located"
        );
        Ok(FiducialCenter {
            center,
            ellipse: outcome.ellipse,
            selected,
            cleared: outcome.cleared,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageBuffer;

    /// Bright disk on a dark background with a bright hair attached on the right.
    fn mark_chip(center: [f64; 2], radius: f64, hair: bool) -> DnChip {
        ImageBuffer::from_fn(64, 64, |x, y| {
            let dx = f64::from(x) - center[0];
            let dy = f64::from(y) - center[1];
            let on_disk = dx * dx + dy * dy <= radius * radius;
            let on_hair = hair && y == 32 && (45..59).contains(&x);
            Luma([if on_disk || on_hair { 200.0 } else { 20.0 }])
        })
    }

    #[test]
    fn flood_fill_is_connected_only() {
        let mut chip = mark_chip([32.0, 32.0], 5.0, false);
        chip.put_pixel(2, 2, Luma([200.0]));
        let mask = select_dn_range(&chip, 100.0, 255.0);
        assert_eq!(mask.get_pixel(2, 2)[0], 0);
        assert_eq!(mask.get_pixel(32, 32)[0], SELECTED);
        assert_eq!(mask.get_pixel(37, 32)[0], SELECTED);
        assert_eq!(mask.get_pixel(38, 32)[0], 0);
    }

    #[test]
    fn diagonal_neighbors_connect() {
        let mut chip: DnChip = ImageBuffer::new(5, 5);
        for i in 0..5 {
            chip.put_pixel(i, i, Luma([1.0]));
        }
        let mask = select_dn_range(&chip, 0.5, 1.5);
        assert_eq!(selected_count(&mask), 5);
    }

    #[test]
    fn seed_outside_window_gives_empty_mask() {
        let chip = mark_chip([10.0, 10.0], 4.0, false);
        let mask = select_dn_range(&chip, 100.0, 255.0);
        assert_eq!(selected_count(&mask), 0);

        let locator = FiducialCentroider::new(CentroidConfig {
            min_dn: 100.0,
            max_dn: 255.0,
            ..Default::default()
        });
        assert!(matches!(
            locator.locate(&chip),
            Err(SelectionError::EmptySelection)
        ));
    }

    #[test]
    fn hair_is_trimmed_before_centroiding() {
        let chip = mark_chip([32.0, 32.0], 12.0, true);
        for weighting in [CentroidWeighting::Unweighted, CentroidWeighting::DnWeighted] {
            let locator = FiducialCentroider::new(CentroidConfig {
                min_dn: 100.0,
                max_dn: 255.0,
                weighting,
                ..Default::default()
            });
            let found = locator.locate(&chip).expect("mark");
            assert!(found.cleared >= 10, "cleared {}", found.cleared);
            assert!((found.center[0] - 32.0).abs() < 0.1, "{:?}", found.center);
            assert!((found.center[1] - 32.0).abs() < 0.1, "{:?}", found.center);
        }
    }

    #[test]
    fn config_defaults_from_json() {
        let cfg: CentroidConfig =
            serde_json::from_str(r#"{"min_dn": 50.0, "weighting": "dn_weighted"}"#).unwrap();
        assert_eq!(cfg.min_dn, 50.0);
        assert_eq!(cfg.max_dn, f32::MAX);
        assert_eq!(cfg.weighting, CentroidWeighting::DnWeighted);
        assert_eq!(cfg.reduction, ReductionConfig::default());
    }
}
