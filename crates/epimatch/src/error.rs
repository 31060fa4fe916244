use epimatch_3d::pose::RansacError;
use epimatch_image::ImageError;
use epimatch_imgproc::features::FeaturesError;

/// Errors that prevent the pipeline from producing a report.
///
/// Conditions that depend on image content, like too few matches or a failed
/// geometric fit, are not errors; they are reported inside
/// [`crate::MatchReport`].
#[derive(thiserror::Error, Debug)]
pub enum MatchError {
    /// A parameter is outside its valid range.
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Name of the offending field of [`crate::MatchParams`].
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// An image operation failed.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// Feature detection or description failed.
    #[error(transparent)]
    Features(#[from] FeaturesError),

    /// The estimator rejected its input.
    #[error(transparent)]
    Estimation(#[from] RansacError),
}
