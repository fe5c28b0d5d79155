//! Per-part pose regressors.
//!
//! A [`PosePredictor`] maps a batch of encoder features (one row per sample)
//! to a local rotation and translation for every part. The composer only relies
//! on the output being proper rotation matrices plus free translations, so any
//! regressor can be plugged in.
//!
//! [`SingleAxisPredictor`] is the learned variant: a three-layer MLP emits, per
//! part, two rotation parameters (an angle encoded as a 2-vector) and three
//! translation parameters; the rotation is taken about a per-part axis.

use crate::ArticulationError;
use csm_core::{rotation_about_axis, Mat3, Real, Vec3};
use nalgebra::{DMatrix, DVector};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Number of network outputs that encode the rotation angle of one part.
pub const ROTATION_PARAMS: usize = 2;
/// Number of network outputs that encode the translation of one part.
pub const TRANSLATION_PARAMS: usize = 3;

/// Local (parent-relative) rotation and translation for every part of one sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartPoses {
    pub rotations: Vec<Mat3>,
    pub translations: Vec<Vec3>,
}

impl PartPoses {
    /// Rest pose: identity rotation, zero translation for every part.
    pub fn identity(num_parts: usize) -> Self {
        Self {
            rotations: vec![Mat3::identity(); num_parts],
            translations: vec![Vec3::zeros(); num_parts],
        }
    }

    #[inline]
    pub fn num_parts(&self) -> usize {
        self.rotations.len()
    }
}

/// Regressor from per-sample features to per-part local poses.
pub trait PosePredictor: Send + Sync {
    fn num_parts(&self) -> usize;

    fn num_feats(&self) -> usize;

    /// Predict poses for every row of `feats` (`samples × num_feats`).
    fn predict(&self, feats: &DMatrix<Real>) -> Result<Vec<PartPoses>, ArticulationError>;
}

fn check_feats(feats: &DMatrix<Real>, expected: usize) -> Result<(), ArticulationError> {
    if feats.ncols() != expected {
        return Err(ArticulationError::FeatureDimension {
            expected,
            actual: feats.ncols(),
        });
    }
    Ok(())
}

/// Fully connected layer `y = W x + b`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dense {
    /// `out × in` weight matrix.
    pub weight: DMatrix<Real>,
    pub bias: DVector<Real>,
}

impl Dense {
    /// Uniform initialization in `±1/sqrt(fan_in)` for weights and biases.
    fn init(fan_in: usize, fan_out: usize, rng: &mut StdRng) -> Self {
        let bound = 1.0 / (fan_in.max(1) as Real).sqrt();
        let weight = DMatrix::from_fn(fan_out, fan_in, |_, _| rng.random_range(-bound..bound));
        let bias = DVector::from_fn(fan_out, |_, _| rng.random_range(-bound..bound));
        Self { weight, bias }
    }

    #[inline]
    pub fn forward(&self, x: &DVector<Real>) -> DVector<Real> {
        &self.weight * x + &self.bias
    }
}

/// `Linear → LeakyReLU → Linear → LeakyReLU → Linear` regressor.
#[derive(Debug, Clone, PartialEq)]
pub struct Mlp {
    pub layers: Vec<Dense>,
    pub negative_slope: Real,
}

impl Mlp {
    /// Seeded MLP with the given layer widths (`dims[0]` is the input size).
    pub fn new(dims: &[usize], negative_slope: Real, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let layers = dims
            .windows(2)
            .map(|w| Dense::init(w[0], w[1], &mut rng))
            .collect();
        Self {
            layers,
            negative_slope,
        }
    }

    pub fn forward(&self, x: &DVector<Real>) -> DVector<Real> {
        let last = self.layers.len().saturating_sub(1);
        let mut h = x.clone();
        for (i, layer) in self.layers.iter().enumerate() {
            h = layer.forward(&h);
            if i < last {
                let slope = self.negative_slope;
                h.apply(|v| {
                    if *v < 0.0 {
                        *v *= slope;
                    }
                });
            }
        }
        h
    }
}

/// Construction parameters for a [`SingleAxisPredictor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictorConfig {
    pub num_parts: usize,
    #[serde(default = "default_num_feats")]
    pub num_feats: usize,
    /// Hidden layer width; defaults to `num_feats`.
    #[serde(default)]
    pub hidden_dim: Option<usize>,
    /// Initial rotation axis shared by every part.
    #[serde(default = "default_axis")]
    pub axis: [Real; 3],
    /// Whether the axes are trainable parameters.
    #[serde(default)]
    pub axis_move: bool,
    #[serde(default = "default_negative_slope")]
    pub negative_slope: Real,
    #[serde(default)]
    pub seed: u64,
}

fn default_num_feats() -> usize {
    512
}

fn default_axis() -> [Real; 3] {
    [1.0, 0.0, 0.0]
}

fn default_negative_slope() -> Real {
    0.01
}

impl PredictorConfig {
    pub fn new(num_parts: usize, num_feats: usize) -> Self {
        Self {
            num_parts,
            num_feats,
            hidden_dim: None,
            axis: default_axis(),
            axis_move: false,
            negative_slope: default_negative_slope(),
            seed: 0,
        }
    }

    pub fn build(&self) -> Result<SingleAxisPredictor, ArticulationError> {
        SingleAxisPredictor::new(self)
    }
}

/// Learned predictor restricting each part to rotate about a single axis.
///
/// The axes are owned parameters. The forward pass only reads them (using a
/// normalized copy); after an optimizer step the caller restores unit length
/// explicitly with [`SingleAxisPredictor::normalize_axes`].
#[derive(Debug, Clone, PartialEq)]
pub struct SingleAxisPredictor {
    mlp: Mlp,
    axes: Vec<Vec3>,
    num_feats: usize,
    axis_move: bool,
}

impl SingleAxisPredictor {
    pub fn new(config: &PredictorConfig) -> Result<Self, ArticulationError> {
        if config.num_parts == 0 {
            return Err(ArticulationError::InvalidParameter {
                name: "num_parts",
                reason: "must be positive",
            });
        }
        if config.num_feats == 0 {
            return Err(ArticulationError::InvalidParameter {
                name: "num_feats",
                reason: "must be positive",
            });
        }
        let axis = Vec3::from(config.axis);
        if axis.norm() < 1e-12 {
            return Err(ArticulationError::DegenerateAxis { part: 0 });
        }
        let hidden = config.hidden_dim.unwrap_or(config.num_feats);
        let out = config.num_parts * (ROTATION_PARAMS + TRANSLATION_PARAMS);
        let mlp = Mlp::new(
            &[config.num_feats, hidden, hidden, out],
            config.negative_slope,
            config.seed,
        );
        Ok(Self {
            mlp,
            axes: vec![axis.normalize(); config.num_parts],
            num_feats: config.num_feats,
            axis_move: config.axis_move,
        })
    }

    #[inline]
    pub fn axes(&self) -> &[Vec3] {
        &self.axes
    }

    /// Mutable access to the axes for an external optimizer.
    ///
    /// Returns `None` when the axes are fixed.
    pub fn axes_mut(&mut self) -> Option<&mut [Vec3]> {
        if self.axis_move {
            Some(&mut self.axes)
        } else {
            None
        }
    }

    #[inline]
    pub fn axis_move(&self) -> bool {
        self.axis_move
    }

    #[inline]
    pub fn mlp(&self) -> &Mlp {
        &self.mlp
    }

    pub fn mlp_mut(&mut self) -> &mut Mlp {
        &mut self.mlp
    }

    /// Rescale every axis to unit length in place.
    pub fn normalize_axes(&mut self) -> Result<(), ArticulationError> {
        for (part, axis) in self.axes.iter_mut().enumerate() {
            let n = axis.norm();
            if n < 1e-12 {
                return Err(ArticulationError::DegenerateAxis { part });
            }
            *axis /= n;
        }
        Ok(())
    }

    /// Decode the raw network output of one sample.
    fn decode(&self, out: &DVector<Real>) -> Result<PartPoses, ArticulationError> {
        let stride = ROTATION_PARAMS + TRANSLATION_PARAMS;
        let mut poses = PartPoses::identity(self.axes.len());
        for (part, axis) in self.axes.iter().enumerate() {
            let o = part * stride;
            // atan2 is invariant to the 2-vector's scale, so no normalization is needed.
            let angle = out[o + 1].atan2(out[o]);
            poses.rotations[part] = rotation_about_axis(axis, angle)
                .ok_or(ArticulationError::DegenerateAxis { part })?;
            poses.translations[part] = Vec3::new(out[o + 2], out[o + 3], out[o + 4]);
        }
        Ok(poses)
    }
}

impl PosePredictor for SingleAxisPredictor {
    fn num_parts(&self) -> usize {
        self.axes.len()
    }

    fn num_feats(&self) -> usize {
        self.num_feats
    }

    fn predict(&self, feats: &DMatrix<Real>) -> Result<Vec<PartPoses>, ArticulationError> {
        check_feats(feats, self.num_feats)?;
        feats
            .row_iter()
            .map(|row| self.decode(&self.mlp.forward(&row.transpose())))
            .collect()
    }
}

/// Predictor returning the same fixed poses for every sample.
///
/// Useful for rest-pose rendering and for driving the composer with poses
/// produced elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticPosePredictor {
    pub poses: PartPoses,
    pub num_feats: usize,
}

impl StaticPosePredictor {
    pub fn new(poses: PartPoses, num_feats: usize) -> Self {
        Self { poses, num_feats }
    }
}

impl PosePredictor for StaticPosePredictor {
    fn num_parts(&self) -> usize {
        self.poses.num_parts()
    }

    fn num_feats(&self) -> usize {
        self.num_feats
    }

    fn predict(&self, feats: &DMatrix<Real>) -> Result<Vec<PartPoses>, ArticulationError> {
        check_feats(feats, self.num_feats)?;
        Ok(vec![self.poses.clone(); feats.nrows()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use csm_core::is_rotation;

    fn config() -> PredictorConfig {
        PredictorConfig {
            hidden_dim: Some(16),
            seed: 3,
            ..PredictorConfig::new(4, 8)
        }
    }

    fn features(rows: usize, cols: usize) -> DMatrix<Real> {
        DMatrix::from_fn(rows, cols, |i, j| ((i * cols + j) as Real * 0.37).sin())
    }

    #[test]
    fn outputs_proper_rotations_about_the_axis() {
        let predictor = config().build().unwrap();
        let poses = predictor.predict(&features(3, 8)).unwrap();
        assert_eq!(poses.len(), 3);
        for sample in &poses {
            assert_eq!(sample.num_parts(), 4);
            for r in &sample.rotations {
                assert!(is_rotation(r, 1e-9));
                // Rotation about +X leaves +X fixed.
                assert!((r * Vec3::x() - Vec3::x()).norm() < 1e-9);
            }
        }
    }

    #[test]
    fn seeded_construction_is_reproducible() {
        let a = config().build().unwrap();
        let b = config().build().unwrap();
        assert_eq!(a, b);
        let c = PredictorConfig { seed: 4, ..config() }.build().unwrap();
        assert_ne!(a.mlp(), c.mlp());
    }

    #[test]
    fn wrong_feature_width_is_rejected() {
        let predictor = config().build().unwrap();
        let err = predictor.predict(&features(2, 5)).unwrap_err();
        assert_eq!(
            err,
            ArticulationError::FeatureDimension {
                expected: 8,
                actual: 5
            }
        );
    }

    #[test]
    fn decode_uses_angle_and_translation_slots() {
        let predictor = PredictorConfig {
            axis: [0.0, 0.0, 3.0],
            ..PredictorConfig::new(1, 2)
        }
        .build()
        .unwrap();
        let out = DVector::from_vec(vec![0.0, 2.0, 1.0, -2.0, 0.5]);
        let poses = predictor.decode(&out).unwrap();
        // angle = atan2(2, 0) = 90 degrees about +Z
        assert!((poses.rotations[0] * Vec3::x() - Vec3::y()).norm() < 1e-12);
        assert_eq!(poses.translations[0], Vec3::new(1.0, -2.0, 0.5));
    }

    #[test]
    fn axes_are_only_mutable_when_trainable() {
        let mut fixed = config().build().unwrap();
        assert!(fixed.axes_mut().is_none());

        let mut moving = PredictorConfig {
            axis_move: true,
            ..config()
        }
        .build()
        .unwrap();
        let axes = moving.axes_mut().unwrap();
        axes[1] = Vec3::new(0.0, 2.0, 0.0);
        moving.normalize_axes().unwrap();
        assert!((moving.axes()[1] - Vec3::y()).norm() < 1e-12);

        moving.axes_mut().unwrap()[2] = Vec3::zeros();
        assert_eq!(
            moving.normalize_axes().unwrap_err(),
            ArticulationError::DegenerateAxis { part: 2 }
        );
    }

    #[test]
    fn leaky_relu_between_layers_only() {
        let mlp = Mlp {
            layers: vec![
                Dense {
                    weight: DMatrix::from_row_slice(1, 1, &[1.0]),
                    bias: DVector::from_vec(vec![0.0]),
                },
                Dense {
                    weight: DMatrix::from_row_slice(1, 1, &[1.0]),
                    bias: DVector::from_vec(vec![-10.0]),
                },
            ],
            negative_slope: 0.1,
        };
        let y = mlp.forward(&DVector::from_vec(vec![-5.0]));
        // hidden: -5 * 0.1 = -0.5; output is linear: -0.5 - 10
        assert!((y[0] + 10.5).abs() < 1e-12);
    }

    #[test]
    fn static_predictor_repeats_poses() {
        let poses = PartPoses::identity(2);
        let p = StaticPosePredictor::new(poses.clone(), 3);
        let out = p.predict(&DMatrix::zeros(4, 3)).unwrap();
        assert_eq!(out, vec![poses; 4]);
    }
}
