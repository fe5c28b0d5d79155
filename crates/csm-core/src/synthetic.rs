//! Deterministic synthetic templates, UV maps and masks.
//!
//! Used by tests and examples across the workspace; nothing here is random.

use crate::{
    ArticulatedTemplate, ObjectMask, ParentMap, Pt3, Real, TemplateMesh, UvMap, Vec2,
};
use anyhow::{ensure, Result};
use std::f64::consts::PI;

/// Latitude/longitude tessellation of a sphere of `radius` centred at the origin.
///
/// Vertex 0 is the north pole, followed by `n_lat - 1` rings of `n_lon`
/// vertices each, and the south pole last.
pub fn uv_sphere_mesh(n_lon: usize, n_lat: usize, radius: Real) -> Result<TemplateMesh> {
    let n_lon = n_lon.max(3);
    let n_lat = n_lat.max(2);
    let mut vertices = vec![Pt3::new(0.0, 0.0, radius)];
    for j in 1..n_lat {
        let theta = j as Real * PI / n_lat as Real;
        for i in 0..n_lon {
            let phi = -PI + (i as Real + 0.5) * 2.0 * PI / n_lon as Real;
            vertices.push(Pt3::new(
                radius * theta.sin() * phi.cos(),
                radius * theta.sin() * phi.sin(),
                radius * theta.cos(),
            ));
        }
    }
    let south = vertices.len();
    vertices.push(Pt3::new(0.0, 0.0, -radius));

    let ring = |j: usize, i: usize| 1 + (j - 1) * n_lon + (i % n_lon);
    let mut faces = Vec::new();
    for i in 0..n_lon {
        faces.push([0, ring(1, i), ring(1, i + 1)]);
    }
    for j in 1..(n_lat - 1) {
        for i in 0..n_lon {
            let (a, b) = (ring(j, i), ring(j, i + 1));
            let (c, d) = (ring(j + 1, i), ring(j + 1, i + 1));
            faces.push([a, c, d]);
            faces.push([a, d, b]);
        }
    }
    for i in 0..n_lon {
        faces.push([south, ring(n_lat - 1, i + 1), ring(n_lat - 1, i)]);
    }

    Ok(TemplateMesh::new(vertices, faces)?)
}

/// Serial chain of `num_parts` parts laid out along +X.
///
/// Part `k` owns `verts_per_part` vertices spread over `[k, k + 1) * length`
/// and pivots at `(k * length, 0, 0)`; its parent is part `k - 1`.
pub fn chain_template(
    num_parts: usize,
    verts_per_part: usize,
    length: Real,
) -> Result<ArticulatedTemplate> {
    ensure!(num_parts > 0, "chain needs at least one part");
    ensure!(verts_per_part > 0, "each part needs at least one vertex");

    let mut vertices = Vec::with_capacity(num_parts * verts_per_part);
    let mut labels = Vec::with_capacity(num_parts * verts_per_part);
    for k in 0..num_parts {
        for i in 0..verts_per_part {
            let s = (i as Real + 0.5) / verts_per_part as Real;
            let x = (k as Real + s) * length;
            let y = 0.1 * length * ((i % 2) as Real - 0.5);
            vertices.push(Pt3::new(x, y, 0.0));
            labels.push(k);
        }
    }
    let centers = (0..num_parts)
        .map(|k| Pt3::new(k as Real * length, 0.0, 0.0))
        .collect();
    let parents: Vec<i64> = (0..num_parts as i64).map(|k| k - 1).collect();

    let mesh = TemplateMesh::new(vertices, Vec::new())?;
    Ok(ArticulatedTemplate::new(
        mesh,
        labels,
        centers,
        ParentMap::from_sentinel(&parents)?,
    )?)
}

/// UV map whose values sweep a patch of `[-span, span]²` linearly across the image.
///
/// Distinct pixels receive distinct UV values, so every pixel is its own best
/// match when the same map is used on both sides of a transfer.
pub fn linear_uv_map(width: usize, height: usize, span: Real) -> UvMap {
    let lerp = |i: usize, n: usize| {
        if n <= 1 {
            0.0
        } else {
            span * (2.0 * i as Real / (n - 1) as Real - 1.0)
        }
    };
    UvMap::from_fn(width, height, |x, y| Vec2::new(lerp(x, width), lerp(y, height)))
}

/// Axis-aligned rectangular mask covering `x0..x1` × `y0..y1`.
pub fn rect_mask(width: usize, height: usize, x0: usize, y0: usize, x1: usize, y1: usize) -> ObjectMask {
    let mut mask = ObjectMask::filled(width, height, false);
    for y in y0.min(height)..y1.min(height) {
        for x in x0.min(width)..x1.min(width) {
            mask.set(x, y, true);
        }
    }
    mask
}
