//! Ellipse / conic primitives.
//!
//! Implements:
//! - Five-point conic fit via the SVD null vector of the design matrix.
//! - Conic classification and reduction to the dual ellipse form
//!   (matrix + center, canonical axes + semi-axes + area).
//! - Ellipse-in-chip and point-in-ellipse tests.
//! - Minimum bounding ellipse by weighted fixed-point iteration.

mod bounding;
mod chip;
mod fit;
mod types;

pub use bounding::{minimum_bounding_ellipse, BoundingEllipse, BoundingEllipseConfig};
pub use chip::{ellipse_in_chip, point_in_ellipse};
pub use fit::fit_conic_svd;
pub use types::{ConicCoeffs, Ellipse, EllipseParams};
