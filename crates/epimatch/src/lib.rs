#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

#[doc(inline)]
pub use epimatch_image as image;

#[doc(inline)]
pub use epimatch_imgproc as imgproc;

#[doc(inline)]
pub use epimatch_3d as k3d;

mod error;
pub use error::MatchError;

mod params;
pub use params::MatchParams;

mod pipeline;
pub use pipeline::{match_images, match_images_with_rng};

mod report;
pub use report::{Correspondence, EstimationFailure, ImageSlot, MatchReport, MatchWarning};
