//! Model container and canonical degree-of-freedom ordering.
//!
//! A model aggregates the material, the half-space flag, the ordered
//! discontinuity surfaces and the remote stress sources. It defines the
//! canonical triangle numbering used everywhere else: surfaces in
//! insertion order, triangles in intra-surface order, three degrees of
//! freedom (one Burgers component per local axis) per triangle.
//!
//! Solvers hold non-owning references to the model and rebuild their
//! operators when the model signature changes (triangle count, BC
//! types, Poisson ratio, geometry generation) or when the explicit
//! dirty flag was raised for mutations the signature cannot see.

use crate::bc::{AxisConditions, BcType};
use crate::error::{Error, Result};
use crate::geometry::Triangle;
use crate::material::Material;
use crate::remote::Remote;
use crate::surface::Surface;
use crate::types::{Point3, StressTensor};
use std::sync::atomic::{AtomicBool, Ordering};

/// Compact description of everything that forces an operator rebuild.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ModelSignature {
    n_triangles: usize,
    poisson: f64,
    half_space: bool,
    bc_types: Vec<[BcType; 3]>,
    generations: Vec<u64>,
}

/// Reference to one triangle in canonical order.
#[derive(Clone, Copy)]
pub struct TriangleRef<'a> {
    /// Index of the owning surface.
    pub surface: usize,
    /// Triangle index within the surface.
    pub local: usize,
    /// Global triangle index.
    pub global: usize,
    /// Geometry.
    pub triangle: &'a Triangle,
    /// Per-axis boundary conditions.
    pub conditions: &'a AxisConditions,
}

/// Aggregate of surfaces, remotes and material.
pub struct Model {
    material: Material,
    half_space: bool,
    surfaces: Vec<Surface>,
    remotes: Vec<Box<dyn Remote>>,
    dirty: AtomicBool,
}

impl Model {
    /// New model over the given material.
    ///
    /// With `half_space = true` the free surface is the plane z = 0 and
    /// all geometry must satisfy z ≤ 0.
    pub fn new(material: Material, half_space: bool) -> Self {
        Self {
            material,
            half_space,
            surfaces: Vec::new(),
            remotes: Vec::new(),
            dirty: AtomicBool::new(false),
        }
    }

    /// The model material.
    pub fn material(&self) -> &Material {
        &self.material
    }

    /// Replace the material. A Poisson-ratio change invalidates the
    /// influence operator through the model signature.
    pub fn set_material(&mut self, material: Material) {
        self.material = material;
    }

    /// Half-space flag.
    pub fn half_space(&self) -> bool {
        self.half_space
    }

    /// Append a surface, returning its index.
    pub fn add_surface(&mut self, surface: Surface) -> usize {
        self.surfaces.push(surface);
        self.surfaces.len() - 1
    }

    /// Surfaces in insertion order.
    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }

    /// Mutable access to one surface.
    ///
    /// BC-type changes, geometry replacement and triangle-count changes
    /// are detected automatically; for any other mutation the caller
    /// must follow up with [`Model::mark_dirty`].
    pub fn surface_mut(&mut self, index: usize) -> Result<&mut Surface> {
        let n = self.surfaces.len();
        self.surfaces
            .get_mut(index)
            .ok_or_else(|| Error::Model(format!("surface index {index} out of range ({n})")))
    }

    /// Append a remote stress source. Remotes only affect the right-hand
    /// side, never the operator.
    pub fn add_remote(&mut self, remote: Box<dyn Remote>) {
        self.remotes.push(remote);
    }

    /// Remove all remote stress sources.
    pub fn clear_remotes(&mut self) {
        self.remotes.clear();
    }

    /// Summed remote stress at a point.
    pub fn remote_stress_at(&self, p: &Point3) -> StressTensor {
        let mut s = StressTensor::zero();
        for r in &self.remotes {
            s += r.stress_at(p.x, p.y, p.z);
        }
        s
    }

    /// Total number of triangles across all surfaces.
    pub fn n_triangles(&self) -> usize {
        self.surfaces.iter().map(Surface::n_triangles).sum()
    }

    /// Total number of degrees of freedom (3 per triangle).
    pub fn n_dofs(&self) -> usize {
        3 * self.n_triangles()
    }

    /// Triangles in canonical order with their surface context.
    pub fn triangle_refs(&self) -> Vec<TriangleRef<'_>> {
        let mut refs = Vec::with_capacity(self.n_triangles());
        let mut global = 0;
        for (s, surface) in self.surfaces.iter().enumerate() {
            for (l, (triangle, conditions)) in surface
                .triangles()
                .iter()
                .zip(surface.conditions().iter())
                .enumerate()
            {
                refs.push(TriangleRef {
                    surface: s,
                    local: l,
                    global,
                    triangle,
                    conditions,
                });
                global += 1;
            }
        }
        refs
    }

    /// True if any surface carries constraints.
    pub fn has_constraints(&self) -> bool {
        self.surfaces.iter().any(Surface::has_constraints)
    }

    /// Characteristic model size: the bounding-box diagonal of all
    /// vertices. Used to scale the kernel evaluation offset.
    pub fn extent(&self) -> f64 {
        let mut min = Point3::from_element(f64::INFINITY);
        let mut max = Point3::from_element(f64::NEG_INFINITY);
        for surface in &self.surfaces {
            for v in surface.vertices() {
                min = min.inf(v);
                max = max.sup(v);
            }
        }
        let d = max - min;
        if d.iter().all(|c| c.is_finite()) {
            d.norm().max(f64::MIN_POSITIVE)
        } else {
            1.0
        }
    }

    /// Raise the explicit invalidation flag.
    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    /// Consume the explicit dirty flag.
    pub(crate) fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }

    /// Signature used for automatic operator invalidation.
    pub(crate) fn signature(&self) -> ModelSignature {
        ModelSignature {
            n_triangles: self.n_triangles(),
            poisson: self.material.poisson,
            half_space: self.half_space,
            bc_types: self
                .surfaces
                .iter()
                .flat_map(|s| s.conditions().iter().map(AxisConditions::types))
                .collect(),
            generations: self.surfaces.iter().map(Surface::generation).collect(),
        }
    }

    /// Validate the model before a solve.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Model`] for an empty model or, in half-space
    /// mode, for geometry above the free surface; the offending surface
    /// is named by index.
    pub fn validate(&self) -> Result<()> {
        if self.n_triangles() == 0 {
            return Err(Error::Model("model contains no triangles".to_string()));
        }
        if self.half_space {
            for (i, surface) in self.surfaces.iter().enumerate() {
                if let Some(v) = surface.vertices().iter().find(|v| v.z > 0.0) {
                    return Err(Error::Model(format!(
                        "surface {i}: vertex at z = {} lies above the free surface z = 0",
                        v.z
                    )));
                }
            }
        }
        Ok(())
    }

    /// Pair of edge-sharing triangles with the smallest dihedral angle,
    /// used in divergence diagnostics.
    pub(crate) fn smallest_dihedral_pair(&self) -> Option<(usize, usize, f64)> {
        let refs = self.triangle_refs();
        let mut best: Option<(usize, usize, f64)> = None;
        for i in 0..refs.len() {
            for j in (i + 1)..refs.len() {
                if refs[i].triangle.shares_edge(refs[j].triangle) {
                    let angle = std::f64::consts::PI
                        - refs[i].triangle.dihedral_angle(refs[j].triangle);
                    if best.map_or(true, |(_, _, a)| angle < a) {
                        best = Some((i, j, angle));
                    }
                }
            }
        }
        best
    }
}
