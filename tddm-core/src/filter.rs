//! Burgers-vector convention transforms.
//!
//! Different modeling traditions order the local axes differently. The
//! engine stores Burgers vectors in the Okada convention (normal,
//! strike, dip with dip positive up); [`BurgerFilter`] remaps reported
//! vectors into another convention by composing an axis permutation
//! with per-axis sign flips. The contract is method-based: configure
//! with [`BurgerFilter::set_axis_order`] and
//! [`BurgerFilter::set_axis_revert`] or one of the presets.

use crate::bc::Axis;
use crate::error::Result;
use crate::types::Vec3;

/// Axis permutation plus sign flips over (normal, strike, dip).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurgerFilter {
    /// `order[k]` is the source axis written to output slot `k`.
    order: [Axis; 3],
    /// `revert[k]` negates output slot `k`.
    revert: [bool; 3],
}

impl Default for BurgerFilter {
    fn default() -> Self {
        Self::okada()
    }
}

impl BurgerFilter {
    /// Identity transform: the Okada convention itself.
    pub fn okada() -> Self {
        Self {
            order: Axis::ALL,
            revert: [false; 3],
        }
    }

    /// The Poly3D convention: axes (dip, strike, normal) with the dip
    /// sign inverted relative to Okada.
    pub fn poly3d() -> Self {
        Self {
            order: [Axis::Dip, Axis::Strike, Axis::Normal],
            revert: [true, false, false],
        }
    }

    /// Reset to the Okada preset.
    pub fn setup_okada(&mut self) {
        *self = Self::okada();
    }

    /// Switch to the Poly3D preset.
    pub fn setup_poly3d(&mut self) {
        *self = Self::poly3d();
    }

    /// Set the axis permutation from axis names
    /// (`"normal" | "strike" | "dip"`, or any [`Axis::parse`] spelling).
    ///
    /// # Errors
    ///
    /// Returns a configuration error for unknown axis names.
    pub fn set_axis_order(&mut self, order: [&str; 3]) -> Result<()> {
        self.order = [
            Axis::parse(order[0])?,
            Axis::parse(order[1])?,
            Axis::parse(order[2])?,
        ];
        Ok(())
    }

    /// Set the per-axis sign flips.
    pub fn set_axis_revert(&mut self, revert: [bool; 3]) {
        self.revert = revert;
    }

    /// Transform one vector from the Okada convention into the
    /// configured convention.
    pub fn apply(&self, v: &Vec3) -> Vec3 {
        let mut out = Vec3::zeros();
        for k in 0..3 {
            let value = v[self.order[k].index()];
            out[k] = if self.revert[k] { -value } else { value };
        }
        out
    }

    /// Inverse transform, back into the Okada convention.
    pub fn apply_inverse(&self, v: &Vec3) -> Vec3 {
        let mut out = Vec3::zeros();
        for k in 0..3 {
            let value = if self.revert[k] { -v[k] } else { v[k] };
            out[self.order[k].index()] = value;
        }
        out
    }

    /// In-place transform of a flat `[x, y, z, ...]` array.
    pub fn apply_flat(&self, flat: &mut [f64]) {
        for chunk in flat.chunks_exact_mut(3) {
            let v = Vec3::new(chunk[0], chunk[1], chunk[2]);
            let out = self.apply(&v);
            chunk.copy_from_slice(&[out.x, out.y, out.z]);
        }
    }
}
