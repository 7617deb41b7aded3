//! Triangulated discontinuity surfaces.
//!
//! A surface owns an ordered list of triangles built from flat vertex
//! and index arrays, the per-triangle boundary conditions, and the
//! constraints registered against it. Triangle order never changes
//! after construction; replacing the geometry bumps an internal
//! generation counter so that dependent operators know to rebuild.

use crate::bc::{Axis, AxisConditions, BcType, BcValue};
use crate::constraint::Constraint;
use crate::error::{Error, Result};
use crate::geometry::Triangle;
use crate::types::{Point3, Vec3};

/// A constraint registration: either surface-wide or bound to one
/// triangle.
pub(crate) struct ConstraintEntry {
    /// Local triangle index, or `None` for the whole surface.
    pub scope: Option<usize>,
    pub constraint: Box<dyn Constraint>,
}

/// A triangulated surface with per-axis boundary conditions.
pub struct Surface {
    vertices: Vec<Point3>,
    indices: Vec<[usize; 3]>,
    triangles: Vec<Triangle>,
    conditions: Vec<AxisConditions>,
    constraints: Vec<ConstraintEntry>,
    generation: u64,
}

impl Surface {
    /// Build a surface from flat `[x, y, z, ...]` vertices and a flat
    /// triangle index list.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the offending triangle for
    /// malformed array lengths, out-of-range indices or degenerate
    /// triangles.
    pub fn from_flat(vertices: &[f64], indices: &[usize]) -> Result<Self> {
        let points = crate::types::points_from_flat(vertices)?;
        if indices.len() % 3 != 0 {
            return Err(Error::InvalidInput(format!(
                "triangle index array length {} is not divisible by 3",
                indices.len()
            )));
        }
        let index_triples: Vec<[usize; 3]> = indices
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();
        let triangles = build_triangles(&points, &index_triples)?;
        let conditions = vec![AxisConditions::default(); triangles.len()];
        Ok(Self {
            vertices: points,
            indices: index_triples,
            triangles,
            conditions,
            constraints: Vec::new(),
            generation: 0,
        })
    }

    /// Number of triangles.
    pub fn n_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// Number of vertices.
    pub fn n_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// All triangles in canonical order.
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Vertex positions.
    pub fn vertices(&self) -> &[Point3] {
        &self.vertices
    }

    /// Triangle index triples.
    pub fn indices(&self) -> &[[usize; 3]] {
        &self.indices
    }

    /// Per-triangle boundary conditions in canonical order.
    pub fn conditions(&self) -> &[AxisConditions] {
        &self.conditions
    }

    /// Total surface area.
    pub fn area(&self) -> f64 {
        self.triangles.iter().map(Triangle::area).sum()
    }

    /// Set one axis condition on every triangle of the surface.
    ///
    /// Axis and type accept all spellings documented in [`Axis::parse`]
    /// and [`BcType::parse`].
    pub fn set_bc(&mut self, axis: &str, bc_type: &str, value: impl Into<BcValue>) -> Result<()> {
        let axis = Axis::parse(axis)?;
        let bc_type = BcType::parse(bc_type)?;
        let value = value.into();
        for cond in &mut self.conditions {
            let slot = cond.on_mut(axis);
            slot.bc_type = bc_type;
            slot.value = value.clone();
        }
        Ok(())
    }

    /// Set one axis condition on a single triangle.
    pub fn set_triangle_bc(
        &mut self,
        triangle: usize,
        axis: &str,
        bc_type: &str,
        value: impl Into<BcValue>,
    ) -> Result<()> {
        let axis = Axis::parse(axis)?;
        let bc_type = BcType::parse(bc_type)?;
        let cond = self.conditions.get_mut(triangle).ok_or_else(|| {
            Error::Model(format!("triangle index {triangle} out of range"))
        })?;
        let slot = cond.on_mut(axis);
        slot.bc_type = bc_type;
        slot.value = value.into();
        Ok(())
    }

    /// Register a constraint applying to every triangle of the surface.
    ///
    /// Constraints are applied in registration order.
    pub fn add_constraint(&mut self, constraint: Box<dyn Constraint>) {
        self.constraints.push(ConstraintEntry {
            scope: None,
            constraint,
        });
    }

    /// Register a constraint bound to a single triangle.
    pub fn add_triangle_constraint(
        &mut self,
        triangle: usize,
        constraint: Box<dyn Constraint>,
    ) -> Result<()> {
        if triangle >= self.triangles.len() {
            return Err(Error::Model(format!(
                "triangle index {triangle} out of range"
            )));
        }
        self.constraints.push(ConstraintEntry {
            scope: Some(triangle),
            constraint,
        });
        Ok(())
    }

    /// True if any constraint is registered.
    pub fn has_constraints(&self) -> bool {
        !self.constraints.is_empty()
    }

    /// Constraints applying to one triangle, in registration order.
    pub(crate) fn constraints_for(&self, triangle: usize) -> impl Iterator<Item = &dyn Constraint> {
        self.constraints
            .iter()
            .filter(move |e| e.scope.is_none() || e.scope == Some(triangle))
            .map(|e| e.constraint.as_ref())
    }

    /// Replace the surface geometry, invalidating dependent operators.
    ///
    /// Boundary conditions are preserved when the triangle count is
    /// unchanged and reset to defaults otherwise; constraints are kept.
    pub fn replace_geometry(&mut self, vertices: &[f64], indices: &[usize]) -> Result<()> {
        let replacement = Surface::from_flat(vertices, indices)?;
        let n_new = replacement.n_triangles();
        if n_new != self.triangles.len() {
            self.conditions = vec![AxisConditions::default(); n_new];
        }
        self.vertices = replacement.vertices;
        self.indices = replacement.indices;
        self.triangles = replacement.triangles;
        self.generation += 1;
        Ok(())
    }

    /// Geometry generation counter, part of the model signature.
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Interpolate per-triangle center values to the surface vertices by
    /// area-weighted averaging of the adjacent triangles.
    pub fn interpolate_to_vertices(&self, center_values: &[Vec3]) -> Vec<Vec3> {
        let mut sums = vec![Vec3::zeros(); self.vertices.len()];
        let mut weights = vec![0.0_f64; self.vertices.len()];
        for (tri, (idx, value)) in self
            .triangles
            .iter()
            .zip(self.indices.iter().zip(center_values.iter()))
        {
            let w = tri.area();
            for &v in idx {
                sums[v] += value * w;
                weights[v] += w;
            }
        }
        sums.iter()
            .zip(&weights)
            .map(|(s, &w)| if w > 0.0 { s / w } else { Vec3::zeros() })
            .collect()
    }
}

fn build_triangles(points: &[Point3], indices: &[[usize; 3]]) -> Result<Vec<Triangle>> {
    let mut triangles = Vec::with_capacity(indices.len());
    for (t, idx) in indices.iter().enumerate() {
        for &v in idx {
            if v >= points.len() {
                return Err(Error::Model(format!(
                    "triangle {t}: vertex index {v} out of range ({} vertices)",
                    points.len()
                )));
            }
        }
        let tri = Triangle::new(points[idx[0]], points[idx[1]], points[idx[2]])
            .map_err(|_| Error::Geometry(format!("triangle {t} is degenerate")))?;
        triangles.push(tri);
    }
    Ok(triangles)
}
