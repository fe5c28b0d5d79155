//! Articulated deformation of a canonical template mesh.
//!
//! A learned [`PosePredictor`] regresses, from per-sample encoder features,
//! a local rotation and translation for every rigid part of an
//! [`ArticulatedTemplate`](csm_core::ArticulatedTemplate). The composer then
//! resolves those local poses down the part hierarchy and moves each vertex
//! with its part's global transform. [`MultiArticulation`] runs `H`
//! independent hypotheses side by side.
//!
//! # Example
//!
//! ```
//! use csm_articulation::{Articulation, ArticulationOptions, PartPoses, StaticPosePredictor};
//! use csm_core::{synthetic::chain_template, Vec3};
//! use std::sync::Arc;
//!
//! let template = Arc::new(chain_template(2, 3, 1.0).unwrap());
//! let mut poses = PartPoses::identity(2);
//! poses.translations[0] = Vec3::new(1.0, 0.0, 0.0);
//! poses.translations[1] = Vec3::new(0.0, 1.0, 0.0);
//!
//! let art = Articulation::new(
//!     template.clone(),
//!     StaticPosePredictor::new(poses.clone(), 1),
//!     ArticulationOptions::default(),
//! )
//! .unwrap();
//! let out = art.articulate(&[poses]).unwrap();
//! assert_eq!(out[0].transforms[1].translation, Vec3::new(1.0, 1.0, 0.0));
//! ```

mod composer;
mod error;
mod multi;
mod predictor;

pub use composer::*;
pub use error::ArticulationError;
pub use multi::*;
pub use predictor::*;
