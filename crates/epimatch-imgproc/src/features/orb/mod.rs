//! Oriented FAST and rotated BRIEF.

mod detector;
pub use detector::*;

mod pattern;
