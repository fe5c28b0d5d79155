use anyhow::{bail, ensure, Context, Result};
use csm_articulation::{
    ArticulatedSample, Articulation, ArticulationOptions, MultiArticulationBuilder, PartPoses,
    PredictorConfig, StaticPosePredictor, DEFAULT_NUM_HYPOTHESES,
};
use csm_core::{ArticulatedTemplateConfig, Real};
use log::info;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Template plus either encoder features or explicit local poses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticulationInput {
    pub template: ArticulatedTemplateConfig,
    /// One feature vector per sample, run through freshly initialized predictors.
    #[serde(default)]
    pub features: Vec<Vec<Real>>,
    /// Local poses per sample, applied directly as a single hypothesis.
    #[serde(default)]
    pub poses: Vec<PartPoses>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArticulationConfig {
    pub num_hypotheses: usize,
    pub hidden_dim: Option<usize>,
    pub axis: [Real; 3],
    pub negative_slope: Real,
    pub seed: u64,
    pub options: ArticulationOptions,
}

impl Default for ArticulationConfig {
    fn default() -> Self {
        let base = PredictorConfig::new(0, 0);
        Self {
            num_hypotheses: DEFAULT_NUM_HYPOTHESES,
            hidden_dim: base.hidden_dim,
            axis: base.axis,
            negative_slope: base.negative_slope,
            seed: base.seed,
            options: ArticulationOptions::default(),
        }
    }
}

impl ArticulationConfig {
    fn predictor_config(&self, num_parts: usize, num_feats: usize) -> PredictorConfig {
        PredictorConfig {
            num_parts,
            num_feats,
            hidden_dim: self.hidden_dim,
            axis: self.axis,
            axis_move: false,
            negative_slope: self.negative_slope,
            seed: self.seed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticulationReport {
    pub traversal_order: Vec<usize>,
    pub num_samples: usize,
    pub num_hypotheses: usize,
    /// `[sample][hypothesis]`.
    pub samples: Vec<Vec<ArticulatedSample>>,
}

impl ArticulationReport {
    /// Regularization loss per sample and hypothesis.
    pub fn losses(&self) -> Vec<Vec<Real>> {
        self.samples
            .iter()
            .map(|hyps| hyps.iter().map(|h| h.loss).collect())
            .collect()
    }
}

fn feature_matrix(features: &[Vec<Real>]) -> Result<DMatrix<Real>> {
    let cols = features.first().map_or(0, Vec::len);
    ensure!(cols > 0, "feature vectors must not be empty");
    for (i, row) in features.iter().enumerate() {
        ensure!(
            row.len() == cols,
            "sample {i} has {} features, expected {cols}",
            row.len()
        );
    }
    Ok(DMatrix::from_row_iterator(
        features.len(),
        cols,
        features.iter().flatten().copied(),
    ))
}

/// Deform the template for every sample of `input`.
pub fn run_articulation(
    input: &ArticulationInput,
    config: &ArticulationConfig,
) -> Result<ArticulationReport> {
    let template = Arc::new(
        input
            .template
            .clone()
            .build()
            .context("invalid articulated template")?,
    );
    let traversal_order = template.hierarchy().order().to_vec();

    let samples = match (input.features.is_empty(), input.poses.is_empty()) {
        (true, true) => bail!("input has neither features nor poses"),
        (false, false) => bail!("input must provide features or poses, not both"),
        (true, false) => {
            let predictor = StaticPosePredictor::new(PartPoses::identity(template.num_parts()), 1);
            let art = Articulation::new(template.clone(), predictor, config.options)?;
            art.articulate(&input.poses)?
                .into_iter()
                .map(|s| vec![s])
                .collect()
        }
        (false, true) => {
            let feats = feature_matrix(&input.features)?;
            let predictor = config.predictor_config(template.num_parts(), feats.ncols());
            let multi = MultiArticulationBuilder::new(template.clone(), predictor)
                .num_hypotheses(config.num_hypotheses)
                .options(config.options)
                .build()?;
            multi.forward(&feats)?.samples
        }
    };

    let num_hypotheses = samples.first().map_or(0, Vec::len);
    info!(
        "articulated {} samples x {} hypotheses over {} parts",
        samples.len(),
        num_hypotheses,
        template.num_parts()
    );
    Ok(ArticulationReport {
        traversal_order,
        num_samples: samples.len(),
        num_hypotheses,
        samples,
    })
}
