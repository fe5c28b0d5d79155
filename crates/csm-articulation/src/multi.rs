//! Independent articulation hypotheses over a shared template.

use crate::{
    ArticulatedSample, Articulation, ArticulationError, ArticulationOptions, PosePredictor,
    PredictorConfig, SingleAxisPredictor,
};
use csm_core::{ArticulatedTemplate, Real};
use log::debug;
use nalgebra::DMatrix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Default number of hypotheses assembled by [`MultiArticulationBuilder`].
pub const DEFAULT_NUM_HYPOTHESES: usize = 8;

/// `H` independently parameterized articulations run on the same features.
///
/// Hypotheses share no state besides the read-only template. Choosing or
/// combining hypotheses is left to the caller.
#[derive(Debug, Clone)]
pub struct MultiArticulation<P = SingleAxisPredictor> {
    hypotheses: Vec<Articulation<P>>,
}

/// Per-sample, per-hypothesis outputs, indexed `[sample][hypothesis]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiArticulationOutput {
    pub samples: Vec<Vec<ArticulatedSample>>,
}

impl MultiArticulationOutput {
    #[inline]
    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn num_hypotheses(&self) -> usize {
        self.samples.first().map_or(0, Vec::len)
    }

    #[inline]
    pub fn get(&self, sample: usize, hypothesis: usize) -> Option<&ArticulatedSample> {
        self.samples.get(sample)?.get(hypothesis)
    }

    /// Regularization loss per sample and hypothesis.
    pub fn losses(&self) -> Vec<Vec<Real>> {
        self.samples
            .iter()
            .map(|hyps| hyps.iter().map(|h| h.loss).collect())
            .collect()
    }
}

impl<P: PosePredictor> MultiArticulation<P> {
    pub fn from_hypotheses(hypotheses: Vec<Articulation<P>>) -> Result<Self, ArticulationError> {
        if hypotheses.is_empty() {
            return Err(ArticulationError::NoHypotheses);
        }
        Ok(Self { hypotheses })
    }

    /// One hypothesis per predictor, all bound to `template`.
    pub fn new(
        template: Arc<ArticulatedTemplate>,
        predictors: Vec<P>,
        options: ArticulationOptions,
    ) -> Result<Self, ArticulationError> {
        let hypotheses = predictors
            .into_iter()
            .map(|p| Articulation::new(template.clone(), p, options))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_hypotheses(hypotheses)
    }

    #[inline]
    pub fn num_hypotheses(&self) -> usize {
        self.hypotheses.len()
    }

    #[inline]
    pub fn hypotheses(&self) -> &[Articulation<P>] {
        &self.hypotheses
    }

    pub fn hypotheses_mut(&mut self) -> &mut [Articulation<P>] {
        &mut self.hypotheses
    }

    /// Replace the template of every hypothesis.
    ///
    /// All part counts are checked first, so either every hypothesis switches
    /// or none does.
    pub fn replace_template(
        &mut self,
        template: Arc<ArticulatedTemplate>,
    ) -> Result<(), ArticulationError> {
        for h in &self.hypotheses {
            if h.predictor().num_parts() != template.num_parts() {
                return Err(ArticulationError::PartCount {
                    expected: template.num_parts(),
                    actual: h.predictor().num_parts(),
                });
            }
        }
        for h in &mut self.hypotheses {
            h.replace_template(template.clone())?;
        }
        Ok(())
    }

    /// Run every hypothesis on `feats` and stack the results per sample.
    pub fn forward(&self, feats: &DMatrix<Real>) -> Result<MultiArticulationOutput, ArticulationError> {
        debug!(
            "running {} hypotheses on {} samples",
            self.hypotheses.len(),
            feats.nrows()
        );
        let per_hypothesis = self
            .hypotheses
            .par_iter()
            .map(|h| h.forward(feats))
            .collect::<Result<Vec<_>, _>>()?;

        let num_samples = feats.nrows();
        let mut columns: Vec<_> = per_hypothesis.into_iter().map(Vec::into_iter).collect();
        let samples = (0..num_samples)
            .map(|_| columns.iter_mut().filter_map(Iterator::next).collect())
            .collect();
        Ok(MultiArticulationOutput { samples })
    }
}

/// Assembles `H` single-axis predictor configurations up front.
///
/// Every hypothesis gets the base configuration with its own seed
/// (`seed + h`) and the template's part count.
#[derive(Debug, Clone)]
pub struct MultiArticulationBuilder {
    template: Arc<ArticulatedTemplate>,
    predictor: PredictorConfig,
    num_hypotheses: usize,
    options: ArticulationOptions,
}

impl MultiArticulationBuilder {
    pub fn new(template: Arc<ArticulatedTemplate>, predictor: PredictorConfig) -> Self {
        Self {
            template,
            predictor,
            num_hypotheses: DEFAULT_NUM_HYPOTHESES,
            options: ArticulationOptions::default(),
        }
    }

    pub fn num_hypotheses(mut self, num_hypotheses: usize) -> Self {
        self.num_hypotheses = num_hypotheses;
        self
    }

    pub fn options(mut self, options: ArticulationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn hypothesis_configs(&self) -> Vec<PredictorConfig> {
        (0..self.num_hypotheses)
            .map(|h| PredictorConfig {
                num_parts: self.template.num_parts(),
                seed: self.predictor.seed.wrapping_add(h as u64),
                ..self.predictor.clone()
            })
            .collect()
    }

    pub fn build(self) -> Result<MultiArticulation<SingleAxisPredictor>, ArticulationError> {
        let predictors = self
            .hypothesis_configs()
            .iter()
            .map(SingleAxisPredictor::new)
            .collect::<Result<Vec<_>, _>>()?;
        MultiArticulation::new(self.template, predictors, self.options)
    }
}
