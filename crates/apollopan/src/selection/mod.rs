//! Selection/trimming engine.
//!
//! Works on binary selection masks (`GrayImage`, nonzero = selected) cut
//! around one fiducial mark:
//! - edge extraction and interior tallies against an ellipse,
//! - RANSAC elliptical reduction with Gauss–Helmert refinement,
//! - unweighted and DN-weighted sub-pixel centroids,
//! - DN-window seed selection and the end-to-end [`FiducialCentroider`].

use image::{ImageBuffer, Luma};

mod centroid;
mod mask;
mod reduce;
mod refine;
mod select;

pub use centroid::{centroid, weighted_centroid};
pub use mask::{
    clear_outside, edge_pixels, interior_counts, selected_count, InteriorCounts, SELECTED,
};
pub use reduce::{elliptical_reduction, ReductionConfig, ReductionOutcome};
pub use refine::{refine_ellipse, RefineError};
pub use select::{
    select_dn_range, CentroidConfig, CentroidWeighting, FiducialCenter, FiducialCentroider,
};

/// Single-band DN chip.
pub type DnChip = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Errors from centroiding and the fiducial pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("selection is empty")]
    EmptySelection,
    #[error("no ellipse satisfied the reduction constraints")]
    NoEllipse,
    #[error("mask is {mask:?} but DN chip is {chip:?}")]
    DimensionMismatch { mask: (u32, u32), chip: (u32, u32) },
    #[error("selected pixels carry zero total weight")]
    ZeroWeight,
}
