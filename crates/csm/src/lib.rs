//! High-level entry crate for canonical surface mapping (CSM).
//!
//! The workspace is split along the two halves of the CSM core:
//!
//! - **Articulation**: an articulated category template (mesh, per-vertex
//!   parts, pivots, part hierarchy) is deformed by per-part poses regressed
//!   from encoder features, optionally under several independent hypotheses.
//! - **Keypoint transfer**: predicted UV maps relate pixels of two images
//!   through the template surface; transferring annotated keypoints and
//!   scoring them gives the PCK curve.
//!
//! ## Imperative API
//!
//! ```
//! use csm::prelude::*;
//! use std::sync::Arc;
//!
//! # fn main() -> anyhow::Result<()> {
//! let template = Arc::new(csm::core::synthetic::chain_template(3, 4, 1.0)?);
//! let multi = MultiArticulationBuilder::new(template, PredictorConfig::new(3, 16))
//!     .num_hypotheses(2)
//!     .build()?;
//! let feats = nalgebra::DMatrix::from_element(4, 16, 0.1);
//! let out = multi.forward(&feats)?;
//! assert_eq!(out.num_samples(), 4);
//! assert_eq!(out.num_hypotheses(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## Pipeline API
//!
//! [`pipeline::run_articulation`] and [`pipeline::run_transfer_evaluation`]
//! take serializable inputs and configs and return serializable reports; the
//! `csm` command line tool is a thin wrapper around them.
//!
//! ## Module Organization
//!
//! - [`core`]: math aliases, template mesh, part hierarchy, UV maps and surfaces
//! - [`articulation`]: pose predictors, kinematic composer, multi-hypothesis runner
//! - [`transfer`]: UV correspondence mapper and PCK evaluator
//! - [`pipeline`]: JSON-driven one-call runners

/// Core geometry: math aliases, template mesh, part hierarchy, UV maps and surfaces.
pub mod core {
    pub use csm_core::*;
}

/// Pose prediction and kinematic composition of articulated templates.
pub mod articulation {
    pub use csm_articulation::*;
}

/// Keypoint transfer through UV maps and PCK evaluation.
pub mod transfer {
    pub use csm_transfer::*;
}

/// All-in-one convenience functions over serializable inputs.
pub mod pipeline {
    pub use csm_pipeline::*;
}

/// Convenient re-exports for common use cases.
///
/// Import with `use csm::prelude::*;` to get started quickly.
pub mod prelude {
    // Common types
    pub use crate::core::{
        ArticulatedTemplate, ArticulatedTemplateConfig, Keypoint, KeypointAnnotation,
        ObjectMask, ParentMap, PartHierarchy, Pt3, Real, SurfaceConfig, UvMap, UvSurface, Vec2,
        Vec3,
    };

    // Articulation
    pub use crate::articulation::{
        Articulation, ArticulationOptions, MultiArticulation, MultiArticulationBuilder,
        PartPoses, PosePredictor, PredictorConfig, SingleAxisPredictor,
    };

    // Keypoint transfer
    pub use crate::transfer::{
        ImageObservation, PckOptions, PckReport, TransferEvaluator, TransferOptions,
        UvCorrespondenceMapper,
    };

    // Pipelines
    pub use crate::pipeline::{
        run_articulation, run_transfer_evaluation, ArticulationConfig, ArticulationInput,
        TransferEvalConfig, TransferEvalInput,
    };
}
