//! Post-processing of a converged Burgers field.
//!
//! Given the Burgers vector on every triangle, elastic fields at
//! arbitrary observation points follow by superposition of the element
//! kernels. Displacement carries no remote contribution (the remote is
//! a stress, not a displacement field); stress sums the remotes and the
//! induced field. Query points are embarrassingly parallel and are
//! partitioned across the worker pool.

use crate::error::{Error, Result};
use crate::kernel::{self, KernelConfig};
use crate::model::{Model, TriangleRef};
use crate::observer::Observer;
use crate::solver::Solver;
use crate::types::{points_from_flat, Point3, StrainTensor, StressTensor, Vec3};
use nalgebra::DVector;
use rayon::prelude::*;

/// Read-only view over a model and a Burgers field.
pub struct Solution<'a> {
    model: &'a Model,
    refs: Vec<TriangleRef<'a>>,
    burgers: DVector<f64>,
    cores: usize,
    /// Absolute offset for the ± face evaluations.
    delta: f64,
    /// Kernel settings; `edge_tolerance` scales the edge-warning test.
    kernel: KernelConfig,
    observer: Option<&'a dyn Observer>,
}

impl<'a> Solution<'a> {
    /// Wrap a user-supplied Burgers snapshot (canonical DOF order,
    /// local frames).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the vector length does not
    /// match the model's DOF count.
    pub fn new(model: &'a Model, burgers: DVector<f64>) -> Result<Self> {
        if burgers.len() != model.n_dofs() {
            return Err(Error::InvalidInput(format!(
                "burgers length {} does not match model DOF count {}",
                burgers.len(),
                model.n_dofs()
            )));
        }
        let kernel = KernelConfig::default();
        let delta = kernel.offset_ratio * model.extent();
        Ok(Self {
            model,
            refs: model.triangle_refs(),
            burgers,
            cores: 1,
            delta,
            kernel,
            observer: None,
        })
    }

    /// Wrap the state of a finished solver run.
    pub fn from_solver(model: &'a Model, solver: &Solver) -> Result<Self> {
        let burgers = solver
            .burgers()
            .ok_or_else(|| Error::Solver("no solution available; run the solver first".to_string()))?
            .clone();
        Self::new(model, burgers)
    }

    /// Set the worker count for array evaluations.
    pub fn with_cores(mut self, cores: usize) -> Self {
        self.cores = cores.max(1);
        self
    }

    /// Attach an observer; edge-singular query points are reported
    /// through `on_warning` (the returned value is the principal-value
    /// limit either way).
    pub fn with_observer(mut self, observer: &'a dyn Observer) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Warn when a query point sits on an element edge line.
    fn check_edges(&self, p: &Point3) {
        let Some(observer) = self.observer else {
            return;
        };
        for r in &self.refs {
            let tol = self.kernel.edge_tolerance * r.triangle.size();
            if r.triangle.near_edge(p, tol) {
                observer.on_warning(&format!(
                    "query point ({}, {}, {}) lies on an edge of triangle {}; \
                     returning the principal-value limit",
                    p.x, p.y, p.z, r.global
                ));
            }
        }
    }

    /// Burgers vector of one triangle in its local frame.
    fn b_local(&self, i: usize) -> Vec3 {
        Vec3::new(
            self.burgers[3 * i],
            self.burgers[3 * i + 1],
            self.burgers[3 * i + 2],
        )
    }

    /// Induced displacement at a point (global frame).
    pub fn displacement_at(&self, p: &Point3) -> Vec3 {
        self.check_edges(p);
        let nu = self.model.material().poisson;
        let hs = self.model.half_space();
        let mut u = Vec3::zeros();
        for (i, r) in self.refs.iter().enumerate() {
            let b = self.b_local(i);
            if b != Vec3::zeros() {
                u += kernel::displacement(r.triangle, p, &b, nu, hs);
            }
        }
        u
    }

    /// Induced strain at a point (global frame).
    pub fn strain_at(&self, p: &Point3) -> StrainTensor {
        self.check_edges(p);
        let nu = self.model.material().poisson;
        let hs = self.model.half_space();
        let mut e = StrainTensor::zero();
        for (i, r) in self.refs.iter().enumerate() {
            let b = self.b_local(i);
            if b != Vec3::zeros() {
                e += kernel::strain(r.triangle, p, &b, nu, hs);
            }
        }
        e
    }

    /// Total stress at a point: remotes plus the induced field.
    pub fn stress_at(&self, p: &Point3) -> StressTensor {
        let induced = self.model.material().stress_from_strain(&self.strain_at(p));
        self.model.remote_stress_at(p) + induced
    }

    /// Displacements at a flat point array, returned as `[x, y, z, ...]`.
    pub fn displacement(&self, flat_points: &[f64]) -> Result<Vec<f64>> {
        let points = points_from_flat(flat_points)?;
        Ok(self.map_points(&points, |s, p| {
            let u = s.displacement_at(p);
            [u.x, u.y, u.z]
        }))
    }

    /// Strains at a flat point array, six components per point in
    /// `[xx, xy, xz, yy, yz, zz]` order.
    pub fn strain(&self, flat_points: &[f64]) -> Result<Vec<f64>> {
        let points = points_from_flat(flat_points)?;
        Ok(self.map_points(&points, |s, p| {
            let e = s.strain_at(p);
            [e.0[0], e.0[1], e.0[2], e.0[3], e.0[4], e.0[5]]
        }))
    }

    /// Stresses at a flat point array, six components per point.
    pub fn stress(&self, flat_points: &[f64]) -> Result<Vec<f64>> {
        let points = points_from_flat(flat_points)?;
        Ok(self.map_points(&points, |s, p| {
            let t = s.stress_at(p);
            [t.0[0], t.0[1], t.0[2], t.0[3], t.0[4], t.0[5]]
        }))
    }

    fn map_points<const M: usize>(
        &self,
        points: &[Point3],
        f: impl Fn(&Self, &Point3) -> [f64; M] + Sync,
    ) -> Vec<f64> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.cores)
            .build();
        let eval = |pts: &[Point3]| -> Vec<f64> {
            pts.par_iter().flat_map_iter(|p| f(self, p)).collect()
        };
        match pool {
            Ok(pool) => pool.install(|| eval(points)),
            Err(_) => eval(points),
        }
    }

    /// Burgers vectors as per-surface flat arrays.
    ///
    /// With `local = false` the local vectors are rotated into the
    /// global frame. With `at_triangles = false` the per-center values
    /// are interpolated to the surface vertices by area-weighted
    /// averaging.
    pub fn burgers(&self, local: bool, at_triangles: bool) -> Vec<Vec<f64>> {
        let mut out = Vec::with_capacity(self.model.surfaces().len());
        let mut offset = 0;
        for surface in self.model.surfaces() {
            let n = surface.n_triangles();
            let centers: Vec<Vec3> = (0..n)
                .map(|l| {
                    let b = self.b_local(offset + l);
                    if local {
                        b
                    } else {
                        surface.triangles()[l].to_global(&b)
                    }
                })
                .collect();
            let values = if at_triangles {
                centers
            } else {
                surface.interpolate_to_vertices(&centers)
            };
            out.push(crate::types::flatten_vectors(&values));
            offset += n;
        }
        out
    }

    /// Displacement on the positive side of each triangle (at
    /// `c + δ·n̂`), per-surface flat arrays in the local frame when
    /// `local` is set.
    pub fn burgers_plus(&self, local: bool) -> Vec<Vec<f64>> {
        self.face_displacement(1.0, local)
    }

    /// Displacement on the negative side of each triangle.
    pub fn burgers_minus(&self, local: bool) -> Vec<Vec<f64>> {
        self.face_displacement(-1.0, local)
    }

    fn face_displacement(&self, side: f64, local: bool) -> Vec<Vec<f64>> {
        let mut out = Vec::with_capacity(self.model.surfaces().len());
        for surface in self.model.surfaces() {
            let values: Vec<Vec3> = surface
                .triangles()
                .iter()
                .map(|tri| {
                    let p = tri.centroid() + tri.normal() * (side * self.delta);
                    let u = self.displacement_at(&p);
                    if local {
                        tri.to_local(&u)
                    } else {
                        u
                    }
                })
                .collect();
            out.push(crate::types::flatten_vectors(&values));
        }
        out
    }

    /// Scalar seismic moment M₀ = μ·Σ A_t·|b_t| over all surfaces.
    pub fn seismic_moment(&self) -> f64 {
        let mu = self.model.material().shear_modulus();
        let mut m0 = 0.0;
        for (i, r) in self.refs.iter().enumerate() {
            m0 += r.triangle.area() * self.b_local(i).norm();
        }
        mu * m0
    }
}
