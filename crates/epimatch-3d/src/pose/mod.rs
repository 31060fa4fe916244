//! # Pose estimation
//!
//! Two-view geometry from 2D pixel correspondences.
//!
//! - [`fundamental_8point`]: normalized 8-point fundamental matrix solver
//! - [`epipolar_distance`]: symmetric point-to-epipolar-line distance
//! - [`ransac_fundamental`]: adaptive RANSAC fit with inlier refit

mod fundamental;
pub use fundamental::*;

mod ransac;
pub use ransac::*;
