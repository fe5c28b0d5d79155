use anyhow::Result;
use csm::articulation::StaticPosePredictor;
use csm::core::TemplateMesh;
use csm::prelude::*;
use std::sync::Arc;

#[test]
fn two_part_chain_moves_child_by_composed_translation() -> Result<()> {
    let vertices = vec![
        Pt3::new(0.0, 0.0, 0.0),
        Pt3::new(1.0, 0.0, 0.0),
        Pt3::new(2.0, 0.5, -1.0),
    ];
    let template = ArticulatedTemplate::new(
        TemplateMesh::new(vertices.clone(), Vec::new())?,
        vec![0, 1, 1],
        vec![Pt3::origin(), Pt3::origin()],
        ParentMap::from_sentinel(&[-1, 0])?,
    )?;

    let mut poses = PartPoses::identity(2);
    poses.translations[0] = Vec3::new(1.0, 0.0, 0.0);
    poses.translations[1] = Vec3::new(0.0, 1.0, 0.0);

    let art = Articulation::new(
        Arc::new(template),
        StaticPosePredictor::new(poses, 4),
        ArticulationOptions::default(),
    )?;
    let out = art.forward(&nalgebra::DMatrix::zeros(1, 4))?;
    let moved = &out[0].vertices;

    assert_eq!(moved[0], vertices[0] + Vec3::new(1.0, 0.0, 0.0));
    for v in 1..3 {
        assert_eq!(moved[v], vertices[v] + Vec3::new(1.0, 1.0, 0.0));
    }
    Ok(())
}
