//! Per-axis mixed boundary conditions.
//!
//! Every triangle carries one boundary condition per local axis
//! (normal, strike, dip). A condition is either a prescribed traction
//! component (the Burgers component is unknown) or a prescribed
//! displacement-discontinuity component (the Burgers component is
//! imposed). Values are scalars or callables evaluated once per triangle
//! center at assembly time, never inside solver hot loops.

use crate::error::{Error, Result};
use std::fmt;
use std::sync::Arc;

/// Local axis of a triangle in the Okada convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Outward normal (local x).
    Normal = 0,
    /// Strike direction (local y).
    Strike = 1,
    /// Dip direction (local z).
    Dip = 2,
}

impl Axis {
    /// All axes in canonical order.
    pub const ALL: [Axis; 3] = [Axis::Normal, Axis::Strike, Axis::Dip];

    /// Parse an axis from its name or index.
    ///
    /// Accepted spellings: `0|"x"|"normal"`, `1|"y"|"strike"`, `2|"z"|"dip"`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BoundaryCondition`] for unknown strings.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0" | "x" | "normal" => Ok(Axis::Normal),
            "1" | "y" | "strike" => Ok(Axis::Strike),
            "2" | "z" | "dip" => Ok(Axis::Dip),
            other => Err(Error::BoundaryCondition(format!(
                "unknown axis '{other}' (expected 0|x|normal, 1|y|strike, 2|z|dip)"
            ))),
        }
    }

    /// Axis from a numeric index.
    pub fn from_index(i: usize) -> Result<Self> {
        match i {
            0 => Ok(Axis::Normal),
            1 => Ok(Axis::Strike),
            2 => Ok(Axis::Dip),
            other => Err(Error::BoundaryCondition(format!(
                "axis index {other} out of range 0..3"
            ))),
        }
    }

    /// Index of the axis in the local frame (0, 1 or 2).
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Boundary condition type for one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BcType {
    /// Traction component prescribed; Burgers component unknown.
    Traction,
    /// Burgers (displacement-discontinuity) component prescribed.
    Displacement,
}

impl BcType {
    /// Parse a boundary condition type from any of its synonyms.
    ///
    /// Traction: `t`, `0`, `free`, `traction`, `neumann`, `unknown`.
    /// Displacement: `b`, `1`, `displ`, `displacement`, `fixed`,
    /// `dirichlet`, `locked`, `imposed`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BoundaryCondition`] for unknown strings.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "t" | "0" | "free" | "traction" | "neumann" | "unknown" => Ok(BcType::Traction),
            "b" | "1" | "displ" | "displacement" | "fixed" | "dirichlet" | "locked"
            | "imposed" => Ok(BcType::Displacement),
            other => Err(Error::BoundaryCondition(format!(
                "unknown boundary condition type '{other}'"
            ))),
        }
    }

    /// All accepted spellings, for diagnostics.
    pub fn valid_types() -> &'static [&'static str] {
        &[
            "t",
            "0",
            "free",
            "traction",
            "neumann",
            "unknown",
            "b",
            "1",
            "displ",
            "displacement",
            "fixed",
            "dirichlet",
            "locked",
            "imposed",
        ]
    }
}

/// Prescribed value: a constant or a callable evaluated at the triangle
/// center.
#[derive(Clone)]
pub enum BcValue {
    /// Spatially constant value.
    Constant(f64),
    /// Callable `(x, y, z) -> value`, evaluated once per center.
    Function(Arc<dyn Fn(f64, f64, f64) -> f64 + Send + Sync>),
}

impl BcValue {
    /// Evaluate the value at a point.
    pub fn at(&self, x: f64, y: f64, z: f64) -> f64 {
        match self {
            BcValue::Constant(v) => *v,
            BcValue::Function(f) => f(x, y, z),
        }
    }
}

impl fmt::Debug for BcValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BcValue::Constant(v) => write!(f, "Constant({v})"),
            BcValue::Function(_) => write!(f, "Function(..)"),
        }
    }
}

impl From<f64> for BcValue {
    fn from(v: f64) -> Self {
        BcValue::Constant(v)
    }
}

/// Boundary condition for a single axis.
#[derive(Debug, Clone)]
pub struct BoundaryCondition {
    pub bc_type: BcType,
    pub value: BcValue,
}

impl BoundaryCondition {
    /// Traction condition with the given value.
    pub fn traction(value: impl Into<BcValue>) -> Self {
        Self {
            bc_type: BcType::Traction,
            value: value.into(),
        }
    }

    /// Displacement condition with the given value.
    pub fn displacement(value: impl Into<BcValue>) -> Self {
        Self {
            bc_type: BcType::Displacement,
            value: value.into(),
        }
    }
}

/// The three per-axis conditions of one triangle, in (normal, strike,
/// dip) order.
#[derive(Debug, Clone)]
pub struct AxisConditions(pub [BoundaryCondition; 3]);

impl AxisConditions {
    /// Condition on one axis.
    pub fn on(&self, axis: Axis) -> &BoundaryCondition {
        &self.0[axis.index()]
    }

    /// Mutable condition on one axis.
    pub fn on_mut(&mut self, axis: Axis) -> &mut BoundaryCondition {
        &mut self.0[axis.index()]
    }

    /// BC types in axis order, used for dirty detection.
    pub fn types(&self) -> [BcType; 3] {
        [
            self.0[0].bc_type,
            self.0[1].bc_type,
            self.0[2].bc_type,
        ]
    }
}

impl Default for AxisConditions {
    /// Default conditions: normal locked at 0, strike and dip free at 0.
    fn default() -> Self {
        Self([
            BoundaryCondition::displacement(0.0),
            BoundaryCondition::traction(0.0),
            BoundaryCondition::traction(0.0),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_parsing() {
        assert_eq!(Axis::parse("normal").unwrap(), Axis::Normal);
        assert_eq!(Axis::parse("x").unwrap(), Axis::Normal);
        assert_eq!(Axis::parse("0").unwrap(), Axis::Normal);
        assert_eq!(Axis::parse("STRIKE").unwrap(), Axis::Strike);
        assert_eq!(Axis::parse("y").unwrap(), Axis::Strike);
        assert_eq!(Axis::parse("dip").unwrap(), Axis::Dip);
        assert_eq!(Axis::parse("2").unwrap(), Axis::Dip);
        assert!(Axis::parse("w").is_err());
    }

    #[test]
    fn test_type_parsing() {
        for s in ["t", "0", "free", "traction", "neumann", "unknown"] {
            assert_eq!(BcType::parse(s).unwrap(), BcType::Traction, "{s}");
        }
        for s in [
            "b",
            "1",
            "displ",
            "displacement",
            "fixed",
            "dirichlet",
            "locked",
            "imposed",
        ] {
            assert_eq!(BcType::parse(s).unwrap(), BcType::Displacement, "{s}");
        }
        assert!(BcType::parse("sliding").is_err());
    }

    #[test]
    fn test_default_conditions() {
        let c = AxisConditions::default();
        assert_eq!(c.on(Axis::Normal).bc_type, BcType::Displacement);
        assert_eq!(c.on(Axis::Strike).bc_type, BcType::Traction);
        assert_eq!(c.on(Axis::Dip).bc_type, BcType::Traction);
        for axis in Axis::ALL {
            assert_eq!(c.on(axis).value.at(1.0, 2.0, 3.0), 0.0);
        }
    }

    #[test]
    fn test_callable_value() {
        let bc = BoundaryCondition::traction(BcValue::Function(Arc::new(|x, _, z| x + z)));
        assert_eq!(bc.value.at(1.0, 0.0, 2.0), 3.0);
    }
}
