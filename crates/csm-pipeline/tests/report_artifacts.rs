use anyhow::Result;
use csm_core::{
    synthetic::{linear_uv_map, rect_mask},
    Keypoint, KeypointAnnotation,
};
use csm_pipeline::{
    run_transfer_evaluation, TransferEvalConfig, TransferEvalInput, PCK_FILE, TRANSFERS_FILE,
};
use csm_transfer::{ImageObservation, PckReport, TransferRecord};
use std::fs;

fn image(keypoints: Vec<Option<Keypoint>>) -> Result<ImageObservation> {
    Ok(ImageObservation::new(
        linear_uv_map(12, 12, 0.6),
        rect_mask(12, 12, 1, 1, 11, 11),
        KeypointAnnotation::new(keypoints),
    )?)
}

#[test]
fn evaluation_writes_pck_and_transfers() -> Result<()> {
    let input = TransferEvalInput {
        keypoint_names: vec!["head".into(), "left_wing".into(), "tail".into()],
        images: vec![
            image(vec![
                Some(Keypoint::new(3, 3, true)),
                Some(Keypoint::new(8, 2, true)),
                None,
            ])?,
            image(vec![
                Some(Keypoint::new(3, 3, true)),
                Some(Keypoint::new(8, 2, false)),
                Some(Keypoint::new(5, 9, true)),
            ])?,
        ],
        pairs: vec![[0, 1]],
    };
    let config: TransferEvalConfig =
        serde_json::from_str(r#"{ "pck": { "thresholds": [0.01, 0.5] } }"#)?;

    let report = run_transfer_evaluation(&input, &config)?;
    // "tail" is missing in image 0, so only two keypoints per direction.
    assert_eq!(report.records.len(), 4);
    assert_eq!(report.pck.visible_counts, vec![2, 0, 0]);
    assert_eq!(report.pck.per_keypoint[0], vec![Some(1.0), Some(1.0)]);
    assert_eq!(report.pck.per_keypoint[2], vec![None, None]);

    let dir = tempfile::tempdir()?;
    let out = dir.path().join("eval");
    report.write_artifacts(&out)?;

    let pck: PckReport = serde_json::from_str(&fs::read_to_string(out.join(PCK_FILE))?)?;
    assert_eq!(pck, report.pck);
    let records: Vec<TransferRecord> =
        serde_json::from_str(&fs::read_to_string(out.join(TRANSFERS_FILE))?)?;
    assert_eq!(records, report.records);

    let table = report.pck.to_string();
    assert!(table.contains("left_wing"));
    assert!(table.lines().any(|l| l.starts_with("overall")));
    Ok(())
}
