//! Feature detection, description and matching.
//!
//! The pieces compose into the correspondence front end of the pipeline:
//!
//! - **FAST**: segment-test corner candidates on every pyramid level
//! - **Harris**: corner strength used to rank FAST candidates
//! - **ORB**: oriented keypoints with 256-bit rotated BRIEF descriptors
//! - **Matching**: brute-force k-nearest-neighbour search under Hamming
//!   distance and Lowe's ratio test

use epimatch_image::ImageError;

mod fast;
pub use fast::*;

mod harris;
pub use harris::*;

mod matching;
pub use matching::*;

mod orb;
pub use orb::*;

/// An error type for the features module.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum FeaturesError {
    /// The FAST arc length is outside the supported range.
    #[error("FAST arc length must be within 9..=12, got {0}")]
    InvalidArcLength(usize),

    /// The pyramid scale factor does not shrink the image.
    #[error("Pyramid scale factor must be greater than 1, got {0}")]
    InvalidScaleFactor(f32),

    /// A keypoint refers to a pyramid level that does not exist.
    #[error("Keypoint octave {0} is not available in a pyramid of {1} levels")]
    InvalidOctave(usize, usize),

    /// An underlying image operation failed.
    #[error(transparent)]
    Image(#[from] ImageError),
}
