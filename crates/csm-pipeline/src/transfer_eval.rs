use anyhow::{ensure, Context, Result};
use csm_core::SurfaceConfig;
use csm_transfer::{
    ImageObservation, PckOptions, PckReport, TransferEvaluator, TransferOptions, TransferRecord,
    UvCorrespondenceMapper,
};
use log::info;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// File name of the PCK table inside an output directory.
pub const PCK_FILE: &str = "pck.json";
/// File name of the raw transfer records inside an output directory.
pub const TRANSFERS_FILE: &str = "transfers.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferEvalInput {
    /// Names of the annotated keypoints, in annotation order.
    #[serde(default)]
    pub keypoint_names: Vec<String>,
    pub images: Vec<ImageObservation>,
    /// Image index pairs `[a, b]`; each is evaluated in both directions.
    pub pairs: Vec<[usize; 2]>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferEvalConfig {
    pub surface: SurfaceConfig,
    pub transfer: TransferOptions,
    pub pck: PckOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferEvalReport {
    pub num_pairs: usize,
    pub pck: PckReport,
    pub records: Vec<TransferRecord>,
}

impl TransferEvalReport {
    /// Write `pck.json` and `transfers.json` into `dir`, creating it if needed.
    pub fn write_artifacts(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        let pck = dir.join(PCK_FILE);
        fs::write(&pck, serde_json::to_string_pretty(&self.pck)?)
            .with_context(|| format!("failed to write {}", pck.display()))?;
        let transfers = dir.join(TRANSFERS_FILE);
        fs::write(&transfers, serde_json::to_string_pretty(&self.records)?)
            .with_context(|| format!("failed to write {}", transfers.display()))?;
        Ok(())
    }
}

/// Transfer keypoints across every listed pair and compute the PCK table.
pub fn run_transfer_evaluation(
    input: &TransferEvalInput,
    config: &TransferEvalConfig,
) -> Result<TransferEvalReport> {
    ensure!(!input.images.is_empty(), "need at least one image");
    for (i, image) in input.images.iter().enumerate() {
        image
            .validate()
            .with_context(|| format!("image {i} is malformed"))?;
    }
    for (p, &[a, b]) in input.pairs.iter().enumerate() {
        ensure!(
            a < input.images.len() && b < input.images.len(),
            "pair {p} references image ({a}, {b}), but only {} images exist",
            input.images.len()
        );
    }

    let surface = config
        .surface
        .build()
        .context("failed to build the UV surface")?;
    let mapper = UvCorrespondenceMapper::new(surface, config.transfer);
    let mut evaluator = TransferEvaluator::new(config.pck.clone(), input.keypoint_names.clone());

    for (p, &[a, b]) in input.pairs.iter().enumerate() {
        let records = mapper
            .transfer_pair(&input.images[a], &input.images[b], p)
            .with_context(|| format!("transfer failed for pair {p} ({a}, {b})"))?;
        evaluator.extend(records);
    }

    let pck = evaluator.report();
    info!(
        "evaluated {} pairs: {} transfers, {} visible",
        input.pairs.len(),
        pck.num_records,
        pck.num_visible
    );
    Ok(TransferEvalReport {
        num_pairs: input.pairs.len(),
        pck,
        records: evaluator.into_records(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use csm_core::{synthetic, Keypoint, KeypointAnnotation, ObjectMask};

    fn image(keypoints: &[(usize, usize)]) -> ImageObservation {
        ImageObservation::new(
            synthetic::linear_uv_map(6, 6, 0.5),
            ObjectMask::filled(6, 6, true),
            KeypointAnnotation::new(
                keypoints
                    .iter()
                    .map(|&(x, y)| Some(Keypoint::new(x, y, true)))
                    .collect(),
            ),
        )
        .unwrap()
    }

    #[test]
    fn pair_indices_are_checked() {
        let input = TransferEvalInput {
            keypoint_names: Vec::new(),
            images: vec![image(&[(0, 0)])],
            pairs: vec![[0, 1]],
        };
        let err = run_transfer_evaluation(&input, &TransferEvalConfig::default()).unwrap_err();
        assert!(err.to_string().contains("pair 0"));
    }

    #[test]
    fn config_defaults_from_empty_json() {
        let config: TransferEvalConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.pck, PckOptions::default());
        assert_eq!(config.transfer, TransferOptions::default());
        assert!(matches!(config.surface, SurfaceConfig::UnitSphere { .. }));
    }

    #[test]
    fn records_cover_both_directions() {
        let input = TransferEvalInput {
            keypoint_names: vec!["a".into(), "b".into()],
            images: vec![image(&[(1, 1), (4, 2)]), image(&[(1, 1), (4, 2)])],
            pairs: vec![[0, 1], [1, 0]],
        };
        let report = run_transfer_evaluation(&input, &TransferEvalConfig::default()).unwrap();
        assert_eq!(report.num_pairs, 2);
        assert_eq!(report.records.len(), 8);
        assert!(report.records.iter().all(|r| r.pixel_error == 0.0));
        assert_eq!(report.pck.overall[0], Some(1.0));
    }

    #[test]
    fn invisible_out_of_range_keypoint_does_not_abort_the_run() {
        let mut first = image(&[(1, 1)]);
        first.keypoints = KeypointAnnotation::new(vec![
            Some(Keypoint::new(1, 1, true)),
            Some(Keypoint::new(99, 99, false)),
        ]);
        let input = TransferEvalInput {
            keypoint_names: vec!["a".into(), "b".into()],
            images: vec![first, image(&[(1, 1), (3, 3)])],
            pairs: vec![[0, 1]],
        };
        let report = run_transfer_evaluation(&input, &TransferEvalConfig::default()).unwrap();
        assert_eq!(report.records.len(), 3);
        assert_eq!(report.pck.visible_counts, vec![2, 0]);
        assert_eq!(report.pck.per_keypoint[0][0], Some(1.0));
    }
}
