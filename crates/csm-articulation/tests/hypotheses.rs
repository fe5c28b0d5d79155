use anyhow::Result;
use csm_articulation::{MultiArticulationBuilder, PredictorConfig};
use csm_core::{is_rotation, synthetic::chain_template, Real, Vec3};
use nalgebra::DMatrix;
use std::sync::Arc;

#[test]
fn learned_hypotheses_produce_rigid_part_motion() -> Result<()> {
    let template = Arc::new(chain_template(3, 4, 1.0)?);
    let config: PredictorConfig = serde_json::from_str(
        r#"{ "num_parts": 3, "num_feats": 6, "hidden_dim": 12, "axis": [0, 0, 2], "seed": 5 }"#,
    )?;
    assert!(!config.axis_move);
    assert_eq!(config.negative_slope, 0.01);

    let multi = MultiArticulationBuilder::new(template.clone(), config)
        .num_hypotheses(4)
        .build()?;
    let feats = DMatrix::from_fn(3, 6, |i, j| ((i * 6 + j) as Real).cos());
    let out = multi.forward(&feats)?;
    assert_eq!(out.num_samples(), 3);
    assert_eq!(out.num_hypotheses(), 4);

    for hyps in &out.samples {
        for sample in hyps {
            assert_eq!(sample.vertices.len(), template.num_vertices());
            assert!(sample.loss.is_finite() && sample.loss >= 0.0);
            for t in &sample.transforms {
                assert!(is_rotation(&t.rotation, 1e-9));
                // Every part rotates about +Z, and so does their composition.
                assert!((t.rotation * Vec3::z() - Vec3::z()).norm() < 1e-9);
            }
            // Rigid per part: distances between vertices of one part are preserved.
            let rest = template.mesh().vertices();
            for part in 0..template.num_parts() {
                let idx = template.parts().vertices_of(part);
                let (a, b) = (idx[0], idx[idx.len() - 1]);
                let before = (rest[a] - rest[b]).norm();
                let after = (sample.vertices[a] - sample.vertices[b]).norm();
                assert!((before - after).abs() < 1e-9, "part {part} was not moved rigidly");
            }
        }
    }

    let losses = out.losses();
    assert_eq!(losses.len(), 3);
    assert!(losses.iter().all(|row| row.len() == 4));
    Ok(())
}

#[test]
fn optimizer_step_then_renormalize() -> Result<()> {
    let template = Arc::new(chain_template(2, 2, 1.0)?);
    let config = PredictorConfig {
        axis_move: true,
        ..PredictorConfig::new(2, 3)
    };
    let mut multi = MultiArticulationBuilder::new(template, config)
        .num_hypotheses(2)
        .build()?;

    for h in multi.hypotheses_mut() {
        let predictor = h.predictor_mut();
        if let Some(axes) = predictor.axes_mut() {
            for axis in axes.iter_mut() {
                *axis += Vec3::new(0.0, 0.5, 0.0);
            }
        }
        predictor.normalize_axes()?;
        for axis in predictor.axes() {
            assert!((axis.norm() - 1.0).abs() < 1e-12);
        }
    }

    let feats = DMatrix::from_element(1, 3, 0.5);
    let out = multi.forward(&feats)?;
    for sample in &out.samples[0] {
        for t in &sample.transforms {
            assert!(is_rotation(&t.rotation, 1e-9));
        }
    }
    Ok(())
}
