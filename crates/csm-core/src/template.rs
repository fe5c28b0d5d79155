//! Articulated template: mesh, per-vertex part labels, pivots and hierarchy.
//!
//! An [`ArticulatedTemplate`] is the static input of the kinematic composer.
//! It is validated once at construction and then shared read-only (typically
//! behind an `Arc`) by every articulation hypothesis.

use crate::{HierarchyError, MeshError, ParentMap, PartHierarchy, Pt3, TemplateMesh};
use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while assembling an [`ArticulatedTemplate`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("malformed part hierarchy: {0}")]
    Hierarchy(#[from] HierarchyError),
    #[error("invalid template mesh: {0}")]
    Mesh(#[from] MeshError),
    /// A vertex is labelled with a part id that does not exist.
    #[error("vertex {vertex} is assigned to part {part}, but only {num_parts} parts exist")]
    UnassignedVertex {
        vertex: usize,
        part: usize,
        num_parts: usize,
    },
    #[error("part assignment covers {actual} vertices, mesh has {expected}")]
    VertexCountMismatch { expected: usize, actual: usize },
    #[error("got {actual} rotation centers for {expected} parts")]
    CenterCountMismatch { expected: usize, actual: usize },
}

/// Vertex → part labelling plus the inverse part → vertices index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartAssignment {
    vertex_part: Vec<usize>,
    part_vertices: Vec<Vec<usize>>,
}

impl PartAssignment {
    /// Build from one part id per vertex.
    ///
    /// Every id must be below `num_parts`. A part without vertices is legal
    /// (the composer does nothing for it) but is reported with a warning.
    pub fn new(vertex_part: Vec<usize>, num_parts: usize) -> Result<Self, TemplateError> {
        let mut part_vertices = vec![Vec::new(); num_parts];
        for (vertex, &part) in vertex_part.iter().enumerate() {
            if part >= num_parts {
                return Err(TemplateError::UnassignedVertex {
                    vertex,
                    part,
                    num_parts,
                });
            }
            part_vertices[part].push(vertex);
        }
        let out = Self {
            vertex_part,
            part_vertices,
        };
        for part in out.empty_parts() {
            warn!("part {} has no assigned vertices", part);
        }
        Ok(out)
    }

    #[inline]
    pub fn num_parts(&self) -> usize {
        self.part_vertices.len()
    }

    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertex_part.len()
    }

    /// Part label of `vertex`.
    #[inline]
    pub fn part_of(&self, vertex: usize) -> usize {
        self.vertex_part[vertex]
    }

    /// Vertex indices (ascending) belonging to `part`.
    #[inline]
    pub fn vertices_of(&self, part: usize) -> &[usize] {
        &self.part_vertices[part]
    }

    /// Number of vertices per part.
    pub fn counts(&self) -> Vec<usize> {
        self.part_vertices.iter().map(Vec::len).collect()
    }

    /// Parts with no vertex assigned.
    pub fn empty_parts(&self) -> Vec<usize> {
        self.part_vertices
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_empty())
            .map(|(k, _)| k)
            .collect()
    }

    #[inline]
    pub fn labels(&self) -> &[usize] {
        &self.vertex_part
    }
}

/// Serializable description of an articulated template, as found in a
/// category's mean-shape configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticulatedTemplateConfig {
    pub mesh: TemplateMesh,
    /// Part id per vertex.
    pub vertex_parts: Vec<usize>,
    /// Fixed pivot per part.
    pub rotation_centers: Vec<Pt3>,
    /// Parent per part, `-1` for roots.
    pub parents: ParentMap,
}

impl ArticulatedTemplateConfig {
    pub fn build(self) -> Result<ArticulatedTemplate, TemplateError> {
        ArticulatedTemplate::new(
            self.mesh,
            self.vertex_parts,
            self.rotation_centers,
            self.parents,
        )
    }
}

/// Validated static description of an articulated category template.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticulatedTemplate {
    mesh: TemplateMesh,
    parts: PartAssignment,
    rotation_centers: Vec<Pt3>,
    hierarchy: PartHierarchy,
}

impl ArticulatedTemplate {
    /// Assemble and validate a template.
    ///
    /// The number of parts is taken from the parent map.
    pub fn new(
        mesh: TemplateMesh,
        vertex_parts: Vec<usize>,
        rotation_centers: Vec<Pt3>,
        parents: ParentMap,
    ) -> Result<Self, TemplateError> {
        let hierarchy = PartHierarchy::new(parents)?;
        let num_parts = hierarchy.num_parts();
        if vertex_parts.len() != mesh.num_vertices() {
            return Err(TemplateError::VertexCountMismatch {
                expected: mesh.num_vertices(),
                actual: vertex_parts.len(),
            });
        }
        if rotation_centers.len() != num_parts {
            return Err(TemplateError::CenterCountMismatch {
                expected: num_parts,
                actual: rotation_centers.len(),
            });
        }
        let parts = PartAssignment::new(vertex_parts, num_parts)?;
        Ok(Self {
            mesh,
            parts,
            rotation_centers,
            hierarchy,
        })
    }

    #[inline]
    pub fn mesh(&self) -> &TemplateMesh {
        &self.mesh
    }

    #[inline]
    pub fn parts(&self) -> &PartAssignment {
        &self.parts
    }

    #[inline]
    pub fn hierarchy(&self) -> &PartHierarchy {
        &self.hierarchy
    }

    #[inline]
    pub fn rotation_centers(&self) -> &[Pt3] {
        &self.rotation_centers
    }

    #[inline]
    pub fn num_parts(&self) -> usize {
        self.hierarchy.num_parts()
    }

    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.mesh.num_vertices()
    }

    /// Serializable form of this template.
    pub fn to_config(&self) -> ArticulatedTemplateConfig {
        ArticulatedTemplateConfig {
            mesh: self.mesh.clone(),
            vertex_parts: self.parts.labels().to_vec(),
            rotation_centers: self.rotation_centers.clone(),
            parents: self.hierarchy.parents().clone(),
        }
    }
}
