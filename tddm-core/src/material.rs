//! Material property definitions.
//!
//! Supports homogeneous isotropic linear elastic media. Heterogeneous and
//! anisotropic materials are out of scope for the displacement
//! discontinuity formulation used here.

use crate::error::{Error, Result};
use crate::types::{StrainTensor, StressTensor};

/// Homogeneous isotropic linear elastic material.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// Young's modulus E (Pa).
    pub young: f64,
    /// Poisson's ratio ν (dimensionless, -1 < ν < 0.5).
    pub poisson: f64,
    /// Mass density ρ (kg/m³); only used by gravity-driven remotes.
    pub density: f64,
}

impl Material {
    /// Create a new isotropic linear elastic material with zero density.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMaterial`] if E ≤ 0 or ν ∉ (-1, 0.5).
    pub fn new(young: f64, poisson: f64) -> Result<Self> {
        if !(young > 0.0) {
            return Err(Error::InvalidMaterial(format!(
                "Young's modulus must be positive, got {young}"
            )));
        }
        if !(poisson > -1.0 && poisson < 0.5) {
            return Err(Error::InvalidMaterial(format!(
                "Poisson's ratio must be in (-1, 0.5), got {poisson}"
            )));
        }
        Ok(Self {
            young,
            poisson,
            density: 0.0,
        })
    }

    /// Set the mass density (builder style).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMaterial`] if ρ < 0.
    pub fn with_density(mut self, density: f64) -> Result<Self> {
        if density < 0.0 {
            return Err(Error::InvalidMaterial(format!(
                "density must be non-negative, got {density}"
            )));
        }
        self.density = density;
        Ok(self)
    }

    /// Shear modulus μ = E / (2(1 + ν)).
    pub fn shear_modulus(&self) -> f64 {
        self.young / (2.0 * (1.0 + self.poisson))
    }

    /// Bulk modulus K = E / (3(1 - 2ν)).
    pub fn bulk_modulus(&self) -> f64 {
        self.young / (3.0 * (1.0 - 2.0 * self.poisson))
    }

    /// Lamé's first parameter λ = Eν / ((1+ν)(1-2ν)).
    pub fn lame_lambda(&self) -> f64 {
        let e = self.young;
        let nu = self.poisson;
        e * nu / ((1.0 + nu) * (1.0 - 2.0 * nu))
    }

    /// Lamé's second parameter μ (alias of the shear modulus).
    pub fn lame_mu(&self) -> f64 {
        self.shear_modulus()
    }

    /// Hooke's law for an isotropic medium: σ = λ tr(ε) I + 2μ ε.
    pub fn stress_from_strain(&self, strain: &StrainTensor) -> StressTensor {
        let lambda = self.lame_lambda();
        let mu = self.shear_modulus();
        let tr = strain.trace();
        let e = &strain.0;
        StressTensor::new([
            lambda * tr + 2.0 * mu * e[0],
            2.0 * mu * e[1],
            2.0 * mu * e[2],
            lambda * tr + 2.0 * mu * e[3],
            2.0 * mu * e[4],
            lambda * tr + 2.0 * mu * e[5],
        ])
    }
}

/// Common rock presets.
impl Material {
    /// Granite (E = 50 GPa, ν = 0.25, ρ = 2700 kg/m³).
    pub fn granite() -> Self {
        Self {
            young: 50e9,
            poisson: 0.25,
            density: 2700.0,
        }
    }

    /// Sandstone (E = 20 GPa, ν = 0.2, ρ = 2300 kg/m³).
    pub fn sandstone() -> Self {
        Self {
            young: 20e9,
            poisson: 0.2,
            density: 2300.0,
        }
    }

    /// Shale (E = 10 GPa, ν = 0.3, ρ = 2400 kg/m³).
    pub fn shale() -> Self {
        Self {
            young: 10e9,
            poisson: 0.3,
            density: 2400.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_material_creation() {
        let mat = Material::new(50e9, 0.25).unwrap();
        assert_relative_eq!(mat.young, 50e9);
        assert_relative_eq!(mat.poisson, 0.25);
        assert_relative_eq!(mat.density, 0.0);
    }

    #[test]
    fn test_invalid_young() {
        assert!(Material::new(-1.0, 0.25).is_err());
        assert!(Material::new(0.0, 0.25).is_err());
        assert!(Material::new(f64::NAN, 0.25).is_err());
    }

    #[test]
    fn test_invalid_poisson() {
        assert!(Material::new(1.0, 0.5).is_err());
        assert!(Material::new(1.0, -1.0).is_err());
        assert!(Material::new(1.0, 0.7).is_err());
    }

    #[test]
    fn test_negative_density_rejected() {
        assert!(Material::new(1.0, 0.25).unwrap().with_density(-1.0).is_err());
    }

    #[test]
    fn test_moduli() {
        let mat = Material::granite();
        assert_relative_eq!(mat.shear_modulus(), 50e9 / 2.5, epsilon = 1e-3);
        assert_relative_eq!(mat.bulk_modulus(), 50e9 / 1.5, epsilon = 1e-3);
        // λ = Eν / ((1+ν)(1-2ν)) = 50e9 * 0.25 / (1.25 * 0.5)
        assert_relative_eq!(mat.lame_lambda(), 20e9, epsilon = 1e-3);
    }

    #[test]
    fn test_hooke_uniaxial_strain() {
        let mat = Material::new(1.0, 0.25).unwrap();
        let lambda = mat.lame_lambda();
        let mu = mat.shear_modulus();
        let e = StrainTensor::new([1e-3, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let s = mat.stress_from_strain(&e);
        assert_relative_eq!(s.0[0], (lambda + 2.0 * mu) * 1e-3, epsilon = 1e-15);
        assert_relative_eq!(s.0[3], lambda * 1e-3, epsilon = 1e-15);
        assert_relative_eq!(s.0[5], lambda * 1e-3, epsilon = 1e-15);
        assert_relative_eq!(s.0[1], 0.0, epsilon = 1e-15);
    }

    #[test]
    fn test_hooke_pure_shear() {
        let mat = Material::new(1.0, 0.25).unwrap();
        let mu = mat.shear_modulus();
        let e = StrainTensor::new([0.0, 1e-3, 0.0, 0.0, 0.0, 0.0]);
        let s = mat.stress_from_strain(&e);
        assert_relative_eq!(s.0[1], 2.0 * mu * 1e-3, epsilon = 1e-15);
        assert_relative_eq!(s.0[0], 0.0, epsilon = 1e-15);
    }
}
