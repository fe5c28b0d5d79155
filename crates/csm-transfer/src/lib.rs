//! Keypoint transfer through canonical surface maps, and its evaluation.
//!
//! Two images of the same category are related through their predicted UV
//! maps: a keypoint in one image lands on the template surface and is matched
//! back to the closest object pixel of the other image
//! ([`UvCorrespondenceMapper`]). The resulting [`TransferRecord`]s are
//! accumulated by a [`TransferEvaluator`], which reports the PCK curve per
//! keypoint and overall.

mod error;
mod evaluator;
mod mapper;

pub use error::TransferError;
pub use evaluator::*;
pub use mapper::*;
