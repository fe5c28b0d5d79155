use thiserror::Error;

/// Errors raised while transferring keypoints between images.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransferError {
    /// The keypoint has no ground truth in one of the two images.
    ///
    /// Recovered by skipping the keypoint for that pair.
    #[error("keypoint {keypoint} has no annotation in the {image} image")]
    MissingAnnotation { keypoint: usize, image: &'static str },
    #[error("{what} is {actual_width}x{actual_height}, expected {width}x{height}")]
    SizeMismatch {
        what: &'static str,
        width: usize,
        height: usize,
        actual_width: usize,
        actual_height: usize,
    },
    #[error("keypoint {keypoint} at ({x}, {y}) lies outside the {width}x{height} image")]
    KeypointOutOfBounds {
        keypoint: usize,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },
    #[error("image has an empty UV map")]
    EmptyImage,
}
