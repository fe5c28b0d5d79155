//! Category-level template mesh.

use crate::{Pt3, Real};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while validating a [`TemplateMesh`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MeshError {
    /// The mesh has no vertices.
    #[error("mesh has no vertices")]
    NoVertices,
    /// A face references a vertex that does not exist.
    #[error("face {face} references invalid vertex index {vertex} (mesh has {num_vertices})")]
    InvalidVertexIndex {
        face: usize,
        vertex: usize,
        num_vertices: usize,
    },
    /// A face repeats one of its vertices.
    #[error("face {face} is degenerate (has duplicate vertices)")]
    DegenerateFace { face: usize },
}

/// Immutable template: vertex positions plus triangle faces.
///
/// Shared read-only by every articulation hypothesis; deformed copies are
/// produced per forward pass and never written back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMesh", into = "RawMesh")]
pub struct TemplateMesh {
    vertices: Vec<Pt3>,
    faces: Vec<[usize; 3]>,
}

#[derive(Serialize, Deserialize)]
struct RawMesh {
    vertices: Vec<Pt3>,
    #[serde(default)]
    faces: Vec<[usize; 3]>,
}

impl TryFrom<RawMesh> for TemplateMesh {
    type Error = MeshError;

    fn try_from(raw: RawMesh) -> Result<Self, Self::Error> {
        TemplateMesh::new(raw.vertices, raw.faces)
    }
}

impl From<TemplateMesh> for RawMesh {
    fn from(mesh: TemplateMesh) -> Self {
        RawMesh {
            vertices: mesh.vertices,
            faces: mesh.faces,
        }
    }
}

impl TemplateMesh {
    /// Build a template after checking face indices.
    pub fn new(vertices: Vec<Pt3>, faces: Vec<[usize; 3]>) -> Result<Self, MeshError> {
        if vertices.is_empty() {
            return Err(MeshError::NoVertices);
        }
        for (fi, face) in faces.iter().enumerate() {
            for &vi in face {
                if vi >= vertices.len() {
                    return Err(MeshError::InvalidVertexIndex {
                        face: fi,
                        vertex: vi,
                        num_vertices: vertices.len(),
                    });
                }
            }
            if face[0] == face[1] || face[1] == face[2] || face[0] == face[2] {
                return Err(MeshError::DegenerateFace { face: fi });
            }
        }
        Ok(Self { vertices, faces })
    }

    #[inline]
    pub fn vertices(&self) -> &[Pt3] {
        &self.vertices
    }

    #[inline]
    pub fn faces(&self) -> &[[usize; 3]] {
        &self.faces
    }

    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Corner positions of face `f`.
    pub fn triangle(&self, f: usize) -> [Pt3; 3] {
        let [a, b, c] = self.faces[f];
        [self.vertices[a], self.vertices[b], self.vertices[c]]
    }

    /// Arithmetic mean of all vertex positions.
    pub fn centroid(&self) -> Pt3 {
        let sum = self
            .vertices
            .iter()
            .fold(nalgebra::Vector3::<Real>::zeros(), |acc, p| acc + p.coords);
        Pt3::from(sum / self.vertices.len() as Real)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tetra() -> (Vec<Pt3>, Vec<[usize; 3]>) {
        let vertices = vec![
            Pt3::new(0.0, 0.0, 0.0),
            Pt3::new(1.0, 0.0, 0.0),
            Pt3::new(0.0, 1.0, 0.0),
            Pt3::new(0.0, 0.0, 1.0),
        ];
        let faces = vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]];
        (vertices, faces)
    }

    #[test]
    fn valid_tetrahedron() {
        let (v, f) = tetra();
        let mesh = TemplateMesh::new(v, f).unwrap();
        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_faces(), 4);
        let c = mesh.centroid();
        assert!((c - Pt3::new(0.25, 0.25, 0.25)).norm() < 1e-12);
    }

    #[test]
    fn rejects_out_of_range_face() {
        let (v, _) = tetra();
        let err = TemplateMesh::new(v, vec![[0, 1, 7]]).unwrap_err();
        assert_eq!(
            err,
            MeshError::InvalidVertexIndex {
                face: 0,
                vertex: 7,
                num_vertices: 4
            }
        );
    }

    #[test]
    fn rejects_degenerate_face() {
        let (v, _) = tetra();
        let err = TemplateMesh::new(v, vec![[0, 1, 1]]).unwrap_err();
        assert_eq!(err, MeshError::DegenerateFace { face: 0 });
    }

    #[test]
    fn deserialization_validates() {
        let bad = r#"{"vertices": [[0.0, 0.0, 0.0]], "faces": [[0, 1, 2]]}"#;
        assert!(serde_json::from_str::<TemplateMesh>(bad).is_err());

        let ok = r#"{"vertices": [[0.0, 0.0, 0.0]]}"#;
        let mesh: TemplateMesh = serde_json::from_str(ok).unwrap();
        assert_eq!(mesh.num_faces(), 0);
    }
}
