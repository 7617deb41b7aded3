//! Elastic influence of a triangular dislocation element.
//!
//! This module is the numerical atom of the engine: every influence
//! matrix entry and every post-processed field value is a sum of the
//! kernels here. The closed-form angular-dislocation formulation of
//! Nikkhoo & Walter is used, with the artefact-free configuration rules
//! and principal-value handling of singular points. The half-space
//! variant superposes the real source, an image source across z = 0 and
//! a harmonic free-surface correction.
//!
//! The public surface operates on a [`Triangle`] plus a Burgers vector
//! in the triangle's local (normal, strike, dip) frame and returns
//! fields in global coordinates.

mod angular;
mod fullspace;
mod halfspace;

use crate::geometry::Triangle;
use crate::material::Material;
use crate::types::{Point3, StrainTensor, StressTensor, Vec3};

/// Kernel evaluation settings.
#[derive(Debug, Clone, Copy)]
pub struct KernelConfig {
    /// Offset for two-sided centroid evaluation, relative to model size.
    pub offset_ratio: f64,
    /// Relative tolerance for edge-proximity warnings.
    pub edge_tolerance: f64,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            offset_ratio: 1e-8,
            edge_tolerance: 1e-9,
        }
    }
}

/// Displacement at `obs` induced by Burgers `b_local` on `tri`.
///
/// `b_local` is expressed in the triangle's (normal, strike, dip) frame;
/// the returned displacement is in global coordinates.
pub fn displacement(
    tri: &Triangle,
    obs: &Point3,
    b_local: &Vec3,
    nu: f64,
    half_space: bool,
) -> Vec3 {
    if half_space {
        halfspace::displacement(tri, obs, b_local, nu)
    } else {
        fullspace::displacement(tri, obs, b_local, nu)
    }
}

/// Strain at `obs` induced by Burgers `b_local` on `tri`, global frame.
pub fn strain(
    tri: &Triangle,
    obs: &Point3,
    b_local: &Vec3,
    nu: f64,
    half_space: bool,
) -> StrainTensor {
    if half_space {
        halfspace::strain(tri, obs, b_local, nu)
    } else {
        fullspace::strain(tri, obs, b_local, nu)
    }
}

/// Stress at `obs` induced by Burgers `b_local` on `tri`, global frame.
pub fn stress(
    tri: &Triangle,
    obs: &Point3,
    b_local: &Vec3,
    material: &Material,
    half_space: bool,
) -> StressTensor {
    let e = strain(tri, obs, b_local, material.poisson, half_space);
    material.stress_from_strain(&e)
}

/// Strain at the centroid of a target triangle, principal value.
///
/// Used by the assembler: the strain field is discontinuous across a
/// source element, but the traction it induces on its own plane is
/// continuous, so the two-sided average at `c ± δ·n̂` equals the
/// closed-form centroid limit for the traction rows.
pub fn centroid_strain(
    source: &Triangle,
    target: &Triangle,
    b_local: &Vec3,
    nu: f64,
    half_space: bool,
    delta: f64,
) -> StrainTensor {
    let c = target.centroid();
    let n = target.normal();
    let ep = strain(source, &(c + n * delta), b_local, nu, half_space);
    let em = strain(source, &(c - n * delta), b_local, nu, half_space);
    StrainTensor((ep.0 + em.0) / 2.0)
}
