//! apollopan: interior orientation kernel for Apollo Panoramic camera images.
//!
//! Two subsystems:
//!
//! 1. **Interior orientation** – chained strip affines between stitched-image
//!    (machine) coordinates and nominal film coordinates, fitted to the 90
//!    fiducial marks and tied together by Lagrange continuity constraints.
//! 2. **Selection/trimming** – locating a fiducial mark in a DN chip: DN
//!    window selection, RANSAC elliptical reduction with Gauss–Helmert
//!    refinement, sub-pixel centroiding.
//!
//! Both sit on a small numeric layer: packed symmetric matrices with a packed
//! Cholesky solver, and general conic / ellipse geometry.
//!
//! # Public API
//! - [`PanInteriorOrientation`] with [`OrientationConfig`]
//! - [`FiducialCentroider`] with [`CentroidConfig`], and
//!   [`elliptical_reduction`] for callers with their own masks
//! - the [`linalg`] and [`conic`] building blocks
//!
//! The kernel is single threaded, performs no I/O and never installs a
//! `tracing` subscriber.

pub mod conic;
pub mod interior;
pub mod linalg;
pub mod selection;

pub use conic::{Ellipse, EllipseParams};
pub use interior::{
    Affine2, Fiducial, FiducialSpacing, OrientationConfig, OrientationError,
    PanInteriorOrientation, ResidualStats, SolveReport, Strip,
};
pub use linalg::{CholeskyPolicy, PackedSymmetric, SolveMode, SolveStatus};
pub use selection::{
    elliptical_reduction, CentroidConfig, CentroidWeighting, DnChip, FiducialCenter,
    FiducialCentroider, ReductionConfig, ReductionOutcome, SelectionError,
};
