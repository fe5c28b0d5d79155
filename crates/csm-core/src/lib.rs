//! Core geometry primitives for canonical surface mapping (CSM).
//!
//! This crate holds the static, read-only inputs shared by the articulation
//! and keypoint-transfer crates:
//!
//! - linear algebra type aliases (`Real`, `Vec3`, `Pt3`, ...) and rotation checks,
//! - the category [`TemplateMesh`] and its per-vertex [`PartAssignment`],
//! - the rigid-part [`PartHierarchy`] with its precomputed traversal order
//!   ([`build_order`]),
//! - dense [`UvMap`]s, [`ObjectMask`]s and the UV → 3D [`UvSurface`] parametrization,
//! - ground-truth [`Keypoint`] annotations.
//!
//! # Example
//!
//! ```
//! use csm_core::{ParentMap, PartHierarchy};
//!
//! // part 1 and 2 hang off part 0, part 3 hangs off part 2
//! let parents = ParentMap::from_sentinel(&[-1, 0, 0, 2]).unwrap();
//! let hierarchy = PartHierarchy::new(parents).unwrap();
//! assert_eq!(hierarchy.order(), &[0, 1, 2, 3]);
//! assert_eq!(hierarchy.ancestors(3), vec![0, 2, 3]);
//! ```

/// Part hierarchy and traversal order.
mod hierarchy;
/// Ground-truth keypoints.
mod keypoint;
/// Linear algebra type aliases and rotation helpers.
mod math;
/// Template mesh container.
mod mesh;
/// Deterministic synthetic data for tests and examples.
pub mod synthetic;
/// Articulated template assembly.
mod template;
/// UV maps, masks and UV → 3D surfaces.
mod uv;

pub use hierarchy::*;
pub use keypoint::*;
pub use math::*;
pub use mesh::*;
pub use template::*;
pub use uv::*;
