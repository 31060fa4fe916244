#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// feature detection, description and matching module.
pub mod features;

/// image filtering module.
pub mod filter;

/// Pyramid operations
pub mod pyramid;

/// utility functions for resizing images.
pub mod resize;
