//! Dense UV maps and the UV → 3D template parametrization.
//!
//! UV coordinates live in `[-1, 1] × [-1, 1]`. They are defined through the
//! unit sphere: `u` encodes the azimuth around +Z and `v` the inclination from
//! +Z. A [`UvSurface`] lifts a UV coordinate onto a 3D surface; the
//! [`MeanShapeSurface`] does so for a category mean shape that shares its
//! topology with a sphere mesh.

use crate::{Pt3, Real, TemplateMesh, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use thiserror::Error;

/// Errors raised by UV map containers and surfaces.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UvError {
    #[error("{what} has {actual} entries, expected {width}x{height}")]
    SizeMismatch {
        what: &'static str,
        width: usize,
        height: usize,
        actual: usize,
    },
    #[error("mean shape has no faces")]
    NoFaces,
    #[error("got {actual} sphere vertices for {expected} mesh vertices")]
    SphereCountMismatch { expected: usize, actual: usize },
    #[error("vertex {vertex} has no usable direction on the sphere")]
    DegenerateSphereVertex { vertex: usize },
}

const EPS: Real = 1e-6;

/// Map a 3D direction to UV coordinates (the radius is ignored).
pub fn sphere_to_uv(p: &Vec3) -> Vec2 {
    let rad = p.norm().max(1e-4);
    let theta = (p.z / rad).clamp(-1.0 + EPS, 1.0 - EPS).acos();
    let phi = p.y.atan2(p.x);
    Vec2::new(phi / PI, theta / PI * 2.0 - 1.0)
}

/// Map UV coordinates to a point on the unit sphere.
pub fn uv_to_sphere(uv: &Vec2) -> Vec3 {
    let phi = uv.x * PI;
    let theta = (uv.y + 1.0) * 0.5 * PI;
    Vec3::new(theta.sin() * phi.cos(), theta.sin() * phi.sin(), theta.cos())
}

/// Row-major `height × width` grid of predicted UV coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGrid<Vec2>", into = "RawGrid<Vec2>")]
pub struct UvMap {
    width: usize,
    height: usize,
    data: Vec<Vec2>,
}

/// Row-major `height × width` object silhouette.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawGrid<bool>", into = "RawGrid<bool>")]
pub struct ObjectMask {
    width: usize,
    height: usize,
    data: Vec<bool>,
}

#[derive(Serialize, Deserialize)]
struct RawGrid<T> {
    width: usize,
    height: usize,
    data: Vec<T>,
}

fn check_grid(what: &'static str, width: usize, height: usize, len: usize) -> Result<(), UvError> {
    if width.checked_mul(height) != Some(len) {
        return Err(UvError::SizeMismatch {
            what,
            width,
            height,
            actual: len,
        });
    }
    Ok(())
}

impl UvMap {
    pub fn new(width: usize, height: usize, data: Vec<Vec2>) -> Result<Self, UvError> {
        check_grid("uv map", width, height, data.len())?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Build a map by evaluating `f(x, y)` at every pixel.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> Vec2) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// UV value at pixel `(x, y)`.
    #[inline]
    pub fn at(&self, x: usize, y: usize) -> Vec2 {
        self.data[y * self.width + x]
    }

    /// All values in row-major order (`index = y * width + x`).
    #[inline]
    pub fn as_slice(&self) -> &[Vec2] {
        &self.data
    }
}

impl TryFrom<RawGrid<Vec2>> for UvMap {
    type Error = UvError;

    fn try_from(raw: RawGrid<Vec2>) -> Result<Self, Self::Error> {
        UvMap::new(raw.width, raw.height, raw.data)
    }
}

impl From<UvMap> for RawGrid<Vec2> {
    fn from(map: UvMap) -> Self {
        RawGrid {
            width: map.width,
            height: map.height,
            data: map.data,
        }
    }
}

impl ObjectMask {
    pub fn new(width: usize, height: usize, data: Vec<bool>) -> Result<Self, UvError> {
        check_grid("mask", width, height, data.len())?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Mask with every pixel set to `value`.
    pub fn filled(width: usize, height: usize, value: bool) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn contains(&self, x: usize, y: usize) -> bool {
        self.data[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, value: bool) {
        self.data[y * self.width + x] = value;
    }

    #[inline]
    pub fn as_slice(&self) -> &[bool] {
        &self.data
    }

    /// Number of pixels inside the object.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&m| m).count()
    }
}

impl TryFrom<RawGrid<bool>> for ObjectMask {
    type Error = UvError;

    fn try_from(raw: RawGrid<bool>) -> Result<Self, Self::Error> {
        ObjectMask::new(raw.width, raw.height, raw.data)
    }
}

impl From<ObjectMask> for RawGrid<bool> {
    fn from(mask: ObjectMask) -> Self {
        RawGrid {
            width: mask.width,
            height: mask.height,
            data: mask.data,
        }
    }
}

/// Colorize a UV map for visualization (one RGB triple per pixel).
///
/// Values are scaled by `max_value`, or by the largest absolute UV component
/// when `None`.
pub fn uv_to_rgb(map: &UvMap, max_value: Option<Real>) -> Vec<[u8; 3]> {
    let scale = max_value.unwrap_or_else(|| {
        map.as_slice()
            .iter()
            .map(|uv| uv.x.abs().max(uv.y.abs()))
            .fold(0.0, Real::max)
    });
    let scale = if scale > 0.0 { scale } else { 1.0 };
    let to_byte = |c: Real| (c.clamp(0.0, 1.0) * 255.0) as u8;
    map.as_slice()
        .iter()
        .map(|uv| {
            let (u, v) = (uv.x / scale, uv.y / scale);
            [
                to_byte(1.0 + u),
                to_byte(1.0 - 0.5 * (u + v)),
                to_byte(1.0 + v),
            ]
        })
        .collect()
}

/// Fixed UV → 3D parametrization of a template surface.
pub trait UvSurface: Send + Sync {
    /// Lift one UV coordinate onto the surface.
    fn uv_to_point(&self, uv: &Vec2) -> Pt3;

    /// Lift a batch of UV coordinates (same order as the input).
    fn uv_to_points(&self, uvs: &[Vec2]) -> Vec<Pt3> {
        uvs.iter().map(|uv| self.uv_to_point(uv)).collect()
    }
}

/// Sphere of a given radius centred at the origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitSphereSurface {
    pub radius: Real,
}

impl Default for UnitSphereSurface {
    fn default() -> Self {
        Self { radius: 1.0 }
    }
}

impl UvSurface for UnitSphereSurface {
    fn uv_to_point(&self, uv: &Vec2) -> Pt3 {
        Pt3::from(uv_to_sphere(uv) * self.radius)
    }
}

/// Mean-shape surface parametrized through a topologically identical sphere mesh.
///
/// A UV coordinate is turned into a sphere direction, the sphere triangle hit
/// by that direction is located, and its barycentric coordinates are applied
/// to the matching mean-shape triangle.
#[derive(Debug, Clone)]
pub struct MeanShapeSurface {
    mesh: TemplateMesh,
    sphere: Vec<Vec3>,
}

impl MeanShapeSurface {
    /// Build from a mean shape and the sphere position of each of its vertices.
    ///
    /// Without explicit sphere positions, each vertex is projected radially
    /// from the mesh centroid.
    pub fn new(mesh: TemplateMesh, sphere_vertices: Option<Vec<Pt3>>) -> Result<Self, UvError> {
        if mesh.num_faces() == 0 {
            return Err(UvError::NoFaces);
        }
        let raw: Vec<Vec3> = match sphere_vertices {
            Some(s) => {
                if s.len() != mesh.num_vertices() {
                    return Err(UvError::SphereCountMismatch {
                        expected: mesh.num_vertices(),
                        actual: s.len(),
                    });
                }
                s.into_iter().map(|p| p.coords).collect()
            }
            None => {
                let c = mesh.centroid();
                mesh.vertices().iter().map(|p| p - c).collect()
            }
        };
        let mut sphere = Vec::with_capacity(raw.len());
        for (vertex, d) in raw.into_iter().enumerate() {
            let n = d.norm();
            if n < 1e-12 {
                return Err(UvError::DegenerateSphereVertex { vertex });
            }
            sphere.push(d / n);
        }
        Ok(Self { mesh, sphere })
    }

    #[inline]
    pub fn mesh(&self) -> &TemplateMesh {
        &self.mesh
    }

    /// Barycentric hit of the ray from the origin along `dir` with face `f`.
    ///
    /// Returns `(w0, w1, w2)` for hits in front of the origin; the weights may be
    /// slightly negative for rays grazing an edge.
    fn ray_hit(&self, f: usize, dir: &Vec3) -> Option<[Real; 3]> {
        let [a, b, c] = self.mesh.faces()[f];
        let (s0, s1, s2) = (self.sphere[a], self.sphere[b], self.sphere[c]);
        let e1 = s1 - s0;
        let e2 = s2 - s0;
        let p = dir.cross(&e2);
        let det = e1.dot(&p);
        if det.abs() < 1e-14 {
            return None;
        }
        let inv = 1.0 / det;
        let tvec = -s0;
        let w1 = tvec.dot(&p) * inv;
        let q = tvec.cross(&e1);
        let w2 = dir.dot(&q) * inv;
        let t = e2.dot(&q) * inv;
        if t <= 0.0 {
            return None;
        }
        Some([1.0 - w1 - w2, w1, w2])
    }
}

impl UvSurface for MeanShapeSurface {
    fn uv_to_point(&self, uv: &Vec2) -> Pt3 {
        let dir = uv_to_sphere(uv);
        let mut best: Option<(usize, [Real; 3], Real)> = None;
        for f in 0..self.mesh.num_faces() {
            let Some(w) = self.ray_hit(f, &dir) else {
                continue;
            };
            let score = w[0].min(w[1]).min(w[2]);
            if best.map_or(true, |(_, _, s)| score > s) {
                best = Some((f, w, score));
                if score >= 0.0 {
                    break;
                }
            }
        }

        match best {
            Some((f, w, _)) => {
                let [p0, p1, p2] = self.mesh.triangle(f);
                Pt3::from(p0.coords * w[0] + p1.coords * w[1] + p2.coords * w[2])
            }
            None => {
                // No triangle in front of the ray: fall back to the closest vertex.
                let (closest, _) = self
                    .sphere
                    .iter()
                    .enumerate()
                    .map(|(i, s)| (i, (s - dir).norm_squared()))
                    .fold((0, Real::INFINITY), |acc, cur| if cur.1 < acc.1 { cur } else { acc });
                self.mesh.vertices()[closest]
            }
        }
    }
}

/// Serializable choice of UV parametrization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SurfaceConfig {
    UnitSphere {
        #[serde(default = "default_radius")]
        radius: Real,
    },
    MeanShape {
        mesh: TemplateMesh,
        #[serde(default)]
        sphere_vertices: Option<Vec<Pt3>>,
    },
}

fn default_radius() -> Real {
    1.0
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        SurfaceConfig::UnitSphere { radius: 1.0 }
    }
}

impl SurfaceConfig {
    pub fn build(&self) -> Result<Box<dyn UvSurface>, UvError> {
        Ok(match self {
            SurfaceConfig::UnitSphere { radius } => Box::new(UnitSphereSurface { radius: *radius }),
            SurfaceConfig::MeanShape {
                mesh,
                sphere_vertices,
            } => Box::new(MeanShapeSurface::new(mesh.clone(), sphere_vertices.clone())?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic;

    #[test]
    fn uv_sphere_round_trip() {
        for &(u, v) in &[(0.0, 0.0), (0.5, -0.3), (-0.9, 0.7), (0.25, 0.95)] {
            let uv = Vec2::new(u, v);
            let back = sphere_to_uv(&uv_to_sphere(&uv));
            assert!((back - uv).norm() < 1e-9, "uv {:?} -> {:?}", uv, back);
        }
    }

    #[test]
    fn sphere_to_uv_ignores_radius() {
        let p = Vec3::new(0.3, -0.2, 0.5);
        assert!((sphere_to_uv(&p) - sphere_to_uv(&(p * 7.0))).norm() < 1e-12);
    }

    #[test]
    fn grid_size_is_validated() {
        assert!(UvMap::new(2, 2, vec![Vec2::zeros(); 3]).is_err());
        assert!(ObjectMask::new(3, 1, vec![true; 3]).is_ok());
        let bad = r#"{"width": 2, "height": 1, "data": [true]}"#;
        assert!(serde_json::from_str::<ObjectMask>(bad).is_err());
    }

    #[test]
    fn uv_to_rgb_is_white_shifted() {
        let map = UvMap::new(2, 1, vec![Vec2::new(0.0, 0.0), Vec2::new(-1.0, 1.0)]).unwrap();
        let rgb = uv_to_rgb(&map, None);
        assert_eq!(rgb[0], [255, 255, 255]);
        assert_eq!(rgb[1], [0, 255, 255]);
    }

    #[test]
    fn mean_shape_of_a_sphere_is_the_sphere() {
        let mesh = synthetic::uv_sphere_mesh(24, 12, 2.0).unwrap();
        let surface = MeanShapeSurface::new(mesh, None).unwrap();
        for &(u, v) in &[(0.1, 0.2), (-0.7, -0.4), (0.95, 0.05)] {
            let p = surface.uv_to_point(&Vec2::new(u, v));
            // Chords of a fine tessellation stay close to the radius.
            assert!((p.coords.norm() - 2.0).abs() < 0.05, "radius {}", p.coords.norm());
            let back = sphere_to_uv(&p.coords);
            assert!((back - Vec2::new(u, v)).norm() < 1e-6, "uv {:?}", back);
        }
    }

    #[test]
    fn mean_shape_hits_vertices_exactly() {
        let sphere = synthetic::uv_sphere_mesh(8, 6, 1.0).unwrap();
        // Stretch the "mean shape" along x; the sphere keeps the parametrization.
        let stretched: Vec<Pt3> = sphere
            .vertices()
            .iter()
            .map(|p| Pt3::new(3.0 * p.x, p.y, p.z))
            .collect();
        let mean = TemplateMesh::new(stretched.clone(), sphere.faces().to_vec()).unwrap();
        let surface =
            MeanShapeSurface::new(mean, Some(sphere.vertices().to_vec())).unwrap();

        let vi = 10;
        let uv = sphere_to_uv(&sphere.vertices()[vi].coords);
        let p = surface.uv_to_point(&uv);
        assert!((p - stretched[vi]).norm() < 1e-6, "{:?} vs {:?}", p, stretched[vi]);
    }

    #[test]
    fn surface_config_defaults_to_unit_sphere() {
        let cfg: SurfaceConfig = serde_json::from_str(r#"{"type": "unit_sphere"}"#).unwrap();
        let surface = cfg.build().unwrap();
        let p = surface.uv_to_point(&Vec2::new(0.0, 0.0));
        assert!((p.coords.norm() - 1.0).abs() < 1e-12);
    }
}
