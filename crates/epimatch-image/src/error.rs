/// An error type for the image module.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ImageError {
    /// Error when the data length does not match the image size.
    #[error("Data length ({0}) does not match the image size ({1})")]
    InvalidChannelShape(usize, usize),

    /// Error when two images are expected to share a size.
    #[error("Image size mismatch: ({0}, {1}) vs ({2}, {3})")]
    InvalidImageSize(usize, usize, usize, usize),

    /// Error when a pixel is requested outside the image.
    #[error("Pixel index out of bounds: (x: {0}, y: {1}, ch: {2}) for image of size ({3}, {4})")]
    PixelIndexOutOfBounds(usize, usize, usize, usize, usize),

    /// Error when a value cannot be represented in the destination type.
    #[error("Failed to cast image data to {0}")]
    CastError(String),
}
