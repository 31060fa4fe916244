#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Small fixed-size linear algebra helpers.
pub mod linalg;

/// Pose estimation algorithms.
pub mod pose;
