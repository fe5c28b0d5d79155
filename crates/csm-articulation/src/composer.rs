//! Kinematic composition of per-part local poses into global transforms.
//!
//! Each part moves rigidly. Its local rotation is applied about the part's
//! fixed rotation center and is expressed relative to its parent, so the
//! global transform of a part is obtained by walking the precomputed traversal
//! order and composing with the (already resolved) parent transform:
//!
//! ```text
//! t_local[k]  <- t_local[k] - R_local[k] * c[k] + c[k]
//! R_global[k]  = R_global[p] * R_local[k]
//! t_global[k]  = R_global[p] * t_local[k] + t_global[p]
//! ```
//!
//! Samples are independent and processed in parallel; the part loop of one
//! sample is strictly sequential.

use crate::{ArticulationError, PartPoses, PosePredictor, SingleAxisPredictor};
use csm_core::{rotation_deviation, ArticulatedTemplate, Iso3, Mat3, Pt3, Real, Vec3};
use log::debug;
use nalgebra::{DMatrix, Rotation3, Translation3, UnitQuaternion};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Affine rigid map `x -> R x + t` of one part.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PartTransform {
    pub rotation: Mat3,
    pub translation: Vec3,
}

impl PartTransform {
    pub fn new(rotation: Mat3, translation: Vec3) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    pub fn identity() -> Self {
        Self::new(Mat3::identity(), Vec3::zeros())
    }

    /// Rotation about `center` followed by a free `translation`, rewritten as
    /// a single map about the origin.
    pub fn about_pivot(rotation: Mat3, translation: Vec3, center: &Pt3) -> Self {
        let c = center.coords;
        Self::new(rotation, translation - rotation * c + c)
    }

    #[inline]
    pub fn apply(&self, p: &Pt3) -> Pt3 {
        Pt3::from(self.rotation * p.coords + self.translation)
    }

    /// `self ∘ child`: apply `child` first, then `self`.
    pub fn compose(&self, child: &PartTransform) -> Self {
        Self::new(
            self.rotation * child.rotation,
            self.rotation * child.translation + self.translation,
        )
    }

    /// Convert to an isometry. Only meaningful for proper rotations.
    pub fn to_isometry(&self) -> Iso3 {
        let rot = Rotation3::from_matrix_unchecked(self.rotation);
        Iso3::from_parts(
            Translation3::from(self.translation),
            UnitQuaternion::from_rotation_matrix(&rot),
        )
    }
}

impl Default for PartTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Resolve the global transform of every part of one sample.
///
/// `sample` only labels errors. Rotations whose orthonormality deviation
/// exceeds `rotation_tolerance` are rejected rather than re-orthonormalized.
pub fn compose_part_transforms(
    template: &ArticulatedTemplate,
    local: &PartPoses,
    sample: usize,
    rotation_tolerance: Real,
) -> Result<Vec<PartTransform>, ArticulationError> {
    let num_parts = template.num_parts();
    if local.rotations.len() != num_parts || local.translations.len() != num_parts {
        return Err(ArticulationError::PartCount {
            expected: num_parts,
            actual: local.rotations.len().min(local.translations.len()),
        });
    }

    let centers = template.rotation_centers();
    let mut pivoted = Vec::with_capacity(num_parts);
    for (part, (r, t)) in local.rotations.iter().zip(&local.translations).enumerate() {
        let deviation = rotation_deviation(r);
        if deviation > rotation_tolerance {
            return Err(ArticulationError::InvalidRotation {
                sample,
                part,
                deviation,
            });
        }
        pivoted.push(PartTransform::about_pivot(*r, *t, &centers[part]));
    }

    let hierarchy = template.hierarchy();
    let mut global = vec![PartTransform::identity(); num_parts];
    for &k in hierarchy.order() {
        global[k] = match hierarchy.parent(k) {
            Some(p) => global[p].compose(&pivoted[k]),
            None => pivoted[k],
        };
    }
    Ok(global)
}

/// Move every template vertex with the global transform of its part.
pub fn deform_vertices(template: &ArticulatedTemplate, global: &[PartTransform]) -> Vec<Pt3> {
    let parts = template.parts();
    template
        .mesh()
        .vertices()
        .iter()
        .enumerate()
        .map(|(i, v)| global[parts.part_of(i)].apply(v))
        .collect()
}

/// Mean squared norm of the predicted local translations.
///
/// Uses the translations as predicted, before the pivot correction.
pub fn translation_regularizer(local: &PartPoses) -> Real {
    if local.translations.is_empty() {
        return 0.0;
    }
    let sum: Real = local.translations.iter().map(Vec3::norm_squared).sum();
    sum / local.translations.len() as Real
}

/// Options shared by every articulation forward pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArticulationOptions {
    /// Maximum `max |RᵀR - I|` accepted for a local rotation.
    pub rotation_tolerance: Real,
    /// Process samples with rayon.
    pub parallel: bool,
}

impl Default for ArticulationOptions {
    fn default() -> Self {
        Self {
            rotation_tolerance: 1e-6,
            parallel: true,
        }
    }
}

/// Deformed template of one sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticulatedSample {
    pub vertices: Vec<Pt3>,
    /// Translation regularization loss.
    pub loss: Real,
    /// Global transform per part.
    pub transforms: Vec<PartTransform>,
}

/// Pose predictor bound to a shared articulated template.
#[derive(Debug, Clone)]
pub struct Articulation<P = SingleAxisPredictor> {
    template: Arc<ArticulatedTemplate>,
    predictor: P,
    options: ArticulationOptions,
}

impl<P: PosePredictor> Articulation<P> {
    pub fn new(
        template: Arc<ArticulatedTemplate>,
        predictor: P,
        options: ArticulationOptions,
    ) -> Result<Self, ArticulationError> {
        check_parts(&template, predictor.num_parts())?;
        Ok(Self {
            template,
            predictor,
            options,
        })
    }

    #[inline]
    pub fn template(&self) -> &Arc<ArticulatedTemplate> {
        &self.template
    }

    #[inline]
    pub fn predictor(&self) -> &P {
        &self.predictor
    }

    pub fn predictor_mut(&mut self) -> &mut P {
        &mut self.predictor
    }

    #[inline]
    pub fn options(&self) -> &ArticulationOptions {
        &self.options
    }

    /// Swap in a new template (and with it a new traversal order).
    ///
    /// The part count must not change, since the predictor's output size is
    /// tied to it. On error the current template is kept.
    pub fn replace_template(
        &mut self,
        template: Arc<ArticulatedTemplate>,
    ) -> Result<(), ArticulationError> {
        check_parts(&template, self.predictor.num_parts())?;
        self.template = template;
        Ok(())
    }

    /// Predict poses for every feature row and deform the template.
    pub fn forward(&self, feats: &DMatrix<Real>) -> Result<Vec<ArticulatedSample>, ArticulationError> {
        let poses = self.predictor.predict(feats)?;
        self.articulate(&poses)
    }

    /// Deform the template with externally supplied local poses.
    pub fn articulate(&self, poses: &[PartPoses]) -> Result<Vec<ArticulatedSample>, ArticulationError> {
        debug!(
            "articulating {} samples over {} parts",
            poses.len(),
            self.template.num_parts()
        );
        let run = |(sample, local): (usize, &PartPoses)| self.articulate_one(sample, local);
        if self.options.parallel {
            poses.par_iter().enumerate().map(run).collect()
        } else {
            poses.iter().enumerate().map(run).collect()
        }
    }

    fn articulate_one(
        &self,
        sample: usize,
        local: &PartPoses,
    ) -> Result<ArticulatedSample, ArticulationError> {
        let transforms =
            compose_part_transforms(&self.template, local, sample, self.options.rotation_tolerance)?;
        Ok(ArticulatedSample {
            vertices: deform_vertices(&self.template, &transforms),
            loss: translation_regularizer(local),
            transforms,
        })
    }
}

fn check_parts(template: &ArticulatedTemplate, predicted: usize) -> Result<(), ArticulationError> {
    if template.num_parts() != predicted {
        return Err(ArticulationError::PartCount {
            expected: template.num_parts(),
            actual: predicted,
        });
    }
    Ok(())
}
