//! Core data types for elastic field evaluation.
//!
//! This module defines fundamental types used throughout TDDM:
//! - Geometric primitives (points, vectors)
//! - Symmetric stress and strain tensors
//! - Flat-array serialization helpers
//!
//! # Conventions
//!
//! Symmetric tensors are stored in the component order
//! `[xx, xy, xz, yy, yz, zz]`. The engineer sign convention is used
//! throughout: tension positive, compression negative. Shear components
//! are true tensor components (ε_xy, not the engineering shear γ_xy).

use crate::error::{Error, Result};
use nalgebra::{Matrix3, Vector3, Vector6};

/// A point in 3D space.
pub type Point3 = Vector3<f64>;

/// A 3D vector (displacement, traction, Burgers vector).
pub type Vec3 = Vector3<f64>;

/// Symmetric stress tensor.
///
/// Components are ordered as: `[σ_xx, σ_xy, σ_xz, σ_yy, σ_yz, σ_zz]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StressTensor(pub Vector6<f64>);

impl StressTensor {
    /// Create a new stress tensor from `[xx, xy, xz, yy, yz, zz]` components.
    pub fn new(components: [f64; 6]) -> Self {
        Self(Vector6::from_row_slice(&components))
    }

    /// Zero stress state.
    pub fn zero() -> Self {
        Self(Vector6::zeros())
    }

    /// Build from a full 3x3 matrix, symmetrizing off-diagonal terms.
    pub fn from_matrix(m: &Matrix3<f64>) -> Self {
        Self::new([
            m[(0, 0)],
            0.5 * (m[(0, 1)] + m[(1, 0)]),
            0.5 * (m[(0, 2)] + m[(2, 0)]),
            m[(1, 1)],
            0.5 * (m[(1, 2)] + m[(2, 1)]),
            m[(2, 2)],
        ])
    }

    /// Extract the full 3x3 symmetric stress matrix.
    pub fn to_matrix(&self) -> Matrix3<f64> {
        let s = &self.0;
        Matrix3::new(s[0], s[1], s[2], s[1], s[3], s[4], s[2], s[4], s[5])
    }

    /// Traction vector on a plane with unit normal `n`: t = σ·n.
    pub fn traction(&self, n: &Vec3) -> Vec3 {
        self.to_matrix() * n
    }

    /// Hydrostatic (mean) stress.
    pub fn mean(&self) -> f64 {
        (self.0[0] + self.0[3] + self.0[5]) / 3.0
    }

    /// Von Mises equivalent stress.
    pub fn von_mises(&self) -> f64 {
        let s = &self.0;
        let (s_xx, s_xy, s_xz, s_yy, s_yz, s_zz) = (s[0], s[1], s[2], s[3], s[4], s[5]);
        let term1 = (s_xx - s_yy).powi(2) + (s_yy - s_zz).powi(2) + (s_zz - s_xx).powi(2);
        let term2 = 6.0 * (s_xy.powi(2) + s_yz.powi(2) + s_xz.powi(2));
        ((term1 + term2) / 2.0).sqrt()
    }

    /// Principal stresses in descending order (σ₁ ≥ σ₂ ≥ σ₃).
    pub fn principal(&self) -> (f64, f64, f64) {
        let eigen = self.to_matrix().symmetric_eigen();
        let mut v: Vec<f64> = eigen.eigenvalues.iter().cloned().collect();
        v.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        (v[0], v[1], v[2])
    }
}

impl std::ops::Add for StressTensor {
    type Output = StressTensor;

    fn add(self, rhs: StressTensor) -> StressTensor {
        StressTensor(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign for StressTensor {
    fn add_assign(&mut self, rhs: StressTensor) {
        self.0 += rhs.0;
    }
}

impl std::ops::Mul<f64> for StressTensor {
    type Output = StressTensor;

    fn mul(self, rhs: f64) -> StressTensor {
        StressTensor(self.0 * rhs)
    }
}

/// Symmetric strain tensor.
///
/// Components are ordered as: `[ε_xx, ε_xy, ε_xz, ε_yy, ε_yz, ε_zz]`,
/// with tensor (not engineering) shear components.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrainTensor(pub Vector6<f64>);

impl StrainTensor {
    /// Create a new strain tensor from `[xx, xy, xz, yy, yz, zz]` components.
    pub fn new(components: [f64; 6]) -> Self {
        Self(Vector6::from_row_slice(&components))
    }

    /// Zero strain state.
    pub fn zero() -> Self {
        Self(Vector6::zeros())
    }

    /// Symmetric part of a displacement gradient: ε = (∇u + ∇uᵀ) / 2.
    pub fn from_gradient(grad: &Matrix3<f64>) -> Self {
        Self::new([
            grad[(0, 0)],
            0.5 * (grad[(0, 1)] + grad[(1, 0)]),
            0.5 * (grad[(0, 2)] + grad[(2, 0)]),
            grad[(1, 1)],
            0.5 * (grad[(1, 2)] + grad[(2, 1)]),
            grad[(2, 2)],
        ])
    }

    /// Extract the full 3x3 symmetric strain matrix.
    pub fn to_matrix(&self) -> Matrix3<f64> {
        let e = &self.0;
        Matrix3::new(e[0], e[1], e[2], e[1], e[3], e[4], e[2], e[4], e[5])
    }

    /// Volumetric strain tr(ε).
    pub fn trace(&self) -> f64 {
        self.0[0] + self.0[3] + self.0[5]
    }
}

impl std::ops::Add for StrainTensor {
    type Output = StrainTensor;

    fn add(self, rhs: StrainTensor) -> StrainTensor {
        StrainTensor(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign for StrainTensor {
    fn add_assign(&mut self, rhs: StrainTensor) {
        self.0 += rhs.0;
    }
}

impl std::ops::Mul<f64> for StrainTensor {
    type Output = StrainTensor;

    fn mul(self, rhs: f64) -> StrainTensor {
        StrainTensor(self.0 * rhs)
    }
}

/// Parse a flat `[x, y, z, ...]` array into points.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if the length is not divisible by 3.
pub fn points_from_flat(flat: &[f64]) -> Result<Vec<Point3>> {
    if flat.len() % 3 != 0 {
        return Err(Error::InvalidInput(format!(
            "flat point array length {} is not divisible by 3",
            flat.len()
        )));
    }
    Ok(flat
        .chunks_exact(3)
        .map(|c| Point3::new(c[0], c[1], c[2]))
        .collect())
}

/// Flatten vectors into `[x, y, z, ...]` order.
pub fn flatten_vectors(vectors: &[Vec3]) -> Vec<f64> {
    let mut out = Vec::with_capacity(vectors.len() * 3);
    for v in vectors {
        out.extend_from_slice(&[v.x, v.y, v.z]);
    }
    out
}
