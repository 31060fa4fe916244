//! Filter operations
//!
//! Linear smoothing used to build the scale pyramid and to denoise patches
//! before binary descriptors are sampled.

/// Filter kernels
pub mod kernels;

/// Filter operations
mod ops;
pub use ops::*;

/// Separable filter operations
mod separable_filter;
pub use separable_filter::*;
