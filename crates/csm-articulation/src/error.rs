use csm_core::{Real, TemplateError};
use thiserror::Error;

/// Errors raised by pose prediction and kinematic composition.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ArticulationError {
    #[error("invalid articulated template: {0}")]
    Template(#[from] TemplateError),
    /// A local rotation drifted away from SO(3).
    #[error("sample {sample}, part {part}: rotation is not orthonormal (deviation {deviation:.3e})")]
    InvalidRotation {
        sample: usize,
        part: usize,
        deviation: Real,
    },
    #[error("expected {expected} features per sample, got {actual}")]
    FeatureDimension { expected: usize, actual: usize },
    #[error("expected poses for {expected} parts, got {actual}")]
    PartCount { expected: usize, actual: usize },
    /// A single-axis rotation axis collapsed to zero length.
    #[error("rotation axis of part {part} has zero length")]
    DegenerateAxis { part: usize },
    #[error("invalid parameter: {name} ({reason})")]
    InvalidParameter {
        name: &'static str,
        reason: &'static str,
    },
    #[error("multi-hypothesis articulation needs at least one hypothesis")]
    NoHypotheses,
}
