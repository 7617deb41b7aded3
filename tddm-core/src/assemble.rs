//! Influence operator assembly.
//!
//! The global operator maps the stacked per-triangle Burgers vectors to
//! the residuals of the prescribed boundary conditions at every
//! triangle center. Each 3×3 block couples a (destination, source)
//! triangle pair; for a destination axis with a traction condition the
//! row is the projected traction response, for a displacement condition
//! the row is an identity row on the diagonal block.
//!
//! Storage is dense, row-major over triangle indices with contiguous
//! 3×3 blocks: O(N²) memory and construction, built row-parallel. For
//! large models a matrix-free operator recomputes kernel entries per
//! application and is the natural partner of the Krylov methods.

use crate::bc::BcType;
use crate::error::{Error, Result};
use crate::kernel;
use crate::material::Material;
use crate::model::{Model, TriangleRef};
use crate::observer::{Observer, Phase};
use crate::types::Vec3;
use nalgebra::{DVector, Matrix3};
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Dense-path size guard: beyond this many triangles the dense operator
/// is refused in favor of the matrix-free path.
pub const DENSE_TRIANGLE_LIMIT: usize = 5_000;

/// An operator from stacked Burgers vectors to BC residuals.
pub trait InfluenceOp: Sync {
    /// Number of triangles N (the operator acts on ℝ^{3N}).
    fn n_triangles(&self) -> usize;

    /// y = A·x.
    fn apply(&self, x: &DVector<f64>) -> DVector<f64>;

    /// y = Aᵀ·x, used by the normal-equation solver.
    fn apply_transpose(&self, x: &DVector<f64>) -> DVector<f64>;
}

/// The 3×3 traction response block of a (destination, source) pair:
/// unit Burgers components on `src` to local traction components at the
/// centroid of `dst`.
fn traction_block(
    dst: &TriangleRef<'_>,
    src: &TriangleRef<'_>,
    material: &Material,
    half_space: bool,
    delta: f64,
) -> Matrix3<f64> {
    let nu = material.poisson;
    let mut block = Matrix3::zeros();
    for k in 0..3 {
        let mut b_unit = Vec3::zeros();
        b_unit[k] = 1.0;
        let strain = if std::ptr::eq(dst.triangle, src.triangle) {
            kernel::centroid_strain(src.triangle, dst.triangle, &b_unit, nu, half_space, delta)
        } else {
            kernel::strain(
                src.triangle,
                &dst.triangle.centroid(),
                &b_unit,
                nu,
                half_space,
            )
        };
        let traction = material.stress_from_strain(&strain).traction(&dst.triangle.normal());
        let local = dst.triangle.to_local(&traction);
        for a in 0..3 {
            block[(a, k)] = local[a];
        }
    }
    block
}

/// Mixed-BC block: traction rows where the destination axis prescribes
/// traction, identity rows (diagonal block only) where it prescribes
/// displacement.
fn mixed_block(
    dst: &TriangleRef<'_>,
    src: &TriangleRef<'_>,
    material: &Material,
    half_space: bool,
    delta: f64,
) -> Matrix3<f64> {
    let needs_traction = dst
        .conditions
        .0
        .iter()
        .any(|bc| bc.bc_type == BcType::Traction);
    let traction = if needs_traction {
        traction_block(dst, src, material, half_space, delta)
    } else {
        Matrix3::zeros()
    };
    let mut block = Matrix3::zeros();
    let diagonal = dst.global == src.global;
    for (a, bc) in dst.conditions.0.iter().enumerate() {
        match bc.bc_type {
            BcType::Traction => {
                for k in 0..3 {
                    block[(a, k)] = traction[(a, k)];
                }
            }
            BcType::Displacement => {
                if diagonal {
                    block[(a, a)] = 1.0;
                }
            }
        }
    }
    block
}

/// Dense block influence matrix.
pub struct InfluenceMatrix {
    n: usize,
    /// Mixed-BC blocks, row-major over (destination, source).
    blocks: Vec<Matrix3<f64>>,
    /// Inverses of the mixed diagonal blocks.
    diag_inv: Vec<Matrix3<f64>>,
    /// Pure traction self blocks, used by constraint projections.
    self_traction: Vec<Matrix3<f64>>,
    /// Inverses of the traction self blocks.
    self_traction_inv: Vec<Matrix3<f64>>,
}

impl InfluenceMatrix {
    /// Assemble the dense operator, rows in parallel.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Assembly`] when the model exceeds the dense
    /// size guard or a diagonal block is singular (degenerate BC
    /// combination).
    pub fn build(model: &Model, delta: f64, observer: &dyn Observer) -> Result<Self> {
        let refs = model.triangle_refs();
        let n = refs.len();
        if n > DENSE_TRIANGLE_LIMIT {
            return Err(Error::Assembly(format!(
                "{n} triangles exceed the dense-path limit {DENSE_TRIANGLE_LIMIT}; \
                 use the matrix-free path (gmres/cgns)"
            )));
        }
        let material = *model.material();
        let half_space = model.half_space();

        let progress_step = (n / 20).max(1);
        let rows_done = AtomicUsize::new(0);

        let rows: Vec<Vec<Matrix3<f64>>> = refs
            .par_iter()
            .map(|dst| {
                let row: Vec<Matrix3<f64>> = refs
                    .iter()
                    .map(|src| mixed_block(dst, src, &material, half_space, delta))
                    .collect();
                let done = rows_done.fetch_add(1, Ordering::Relaxed) + 1;
                if done % progress_step == 0 {
                    observer.on_progress(done, 0.0, Phase::Build);
                }
                row
            })
            .collect();

        let blocks: Vec<Matrix3<f64>> = rows.into_iter().flatten().collect();

        let mut diag_inv = Vec::with_capacity(n);
        for (i, r) in refs.iter().enumerate() {
            let inv = blocks[i * n + i].try_inverse().ok_or_else(|| {
                Error::Assembly(format!(
                    "singular diagonal block at triangle {} (surface {})",
                    r.global, r.surface
                ))
            })?;
            diag_inv.push(inv);
        }

        let mut self_traction = Vec::with_capacity(n);
        let mut self_traction_inv = Vec::with_capacity(n);
        for r in &refs {
            let block = traction_block(r, r, &material, half_space, delta);
            let inv = block.try_inverse().ok_or_else(|| {
                Error::Assembly(format!(
                    "singular traction self block at triangle {} (surface {})",
                    r.global, r.surface
                ))
            })?;
            self_traction.push(block);
            self_traction_inv.push(inv);
        }

        Ok(Self {
            n,
            blocks,
            diag_inv,
            self_traction,
            self_traction_inv,
        })
    }

    /// The 3×3 block coupling destination `i` to source `j`.
    pub fn block(&self, i: usize, j: usize) -> &Matrix3<f64> {
        &self.blocks[i * self.n + j]
    }

    /// Inverse of the mixed diagonal block of triangle `i`.
    pub(crate) fn diag_inv(&self, i: usize) -> &Matrix3<f64> {
        &self.diag_inv[i]
    }

    /// Pure traction self block of triangle `i`.
    pub(crate) fn self_traction(&self, i: usize) -> &Matrix3<f64> {
        &self.self_traction[i]
    }

    /// Inverse of the traction self block of triangle `i`.
    pub(crate) fn self_traction_inv(&self, i: usize) -> &Matrix3<f64> {
        &self.self_traction_inv[i]
    }

    /// Off-diagonal accumulation for one destination triangle:
    /// Σ_{j≠i} A_ij·x_j.
    pub(crate) fn off_diagonal_sum(&self, i: usize, x: &DVector<f64>) -> Vec3 {
        let mut s = Vec3::zeros();
        for j in 0..self.n {
            if j == i {
                continue;
            }
            let xj = Vec3::new(x[3 * j], x[3 * j + 1], x[3 * j + 2]);
            s += self.block(i, j) * xj;
        }
        s
    }
}

impl InfluenceOp for InfluenceMatrix {
    fn n_triangles(&self) -> usize {
        self.n
    }

    fn apply(&self, x: &DVector<f64>) -> DVector<f64> {
        let n = self.n;
        let rows: Vec<Vec3> = (0..n)
            .into_par_iter()
            .map(|i| {
                let mut acc = Vec3::zeros();
                for j in 0..n {
                    let xj = Vec3::new(x[3 * j], x[3 * j + 1], x[3 * j + 2]);
                    acc += self.block(i, j) * xj;
                }
                acc
            })
            .collect();
        stack_rows(&rows)
    }

    fn apply_transpose(&self, x: &DVector<f64>) -> DVector<f64> {
        let n = self.n;
        let rows: Vec<Vec3> = (0..n)
            .into_par_iter()
            .map(|j| {
                let mut acc = Vec3::zeros();
                for i in 0..n {
                    let xi = Vec3::new(x[3 * i], x[3 * i + 1], x[3 * i + 2]);
                    acc += self.block(i, j).transpose() * xi;
                }
                acc
            })
            .collect();
        stack_rows(&rows)
    }
}

/// Matrix-free influence operator: recomputes kernel blocks per
/// application instead of storing O(N²) entries.
pub struct MatrixFreeOperator<'a> {
    refs: Vec<TriangleRef<'a>>,
    material: Material,
    half_space: bool,
    delta: f64,
}

impl<'a> MatrixFreeOperator<'a> {
    /// Wrap a model without assembling anything.
    pub fn new(model: &'a Model, delta: f64) -> Self {
        Self {
            refs: model.triangle_refs(),
            material: *model.material(),
            half_space: model.half_space(),
            delta,
        }
    }
}

impl InfluenceOp for MatrixFreeOperator<'_> {
    fn n_triangles(&self) -> usize {
        self.refs.len()
    }

    fn apply(&self, x: &DVector<f64>) -> DVector<f64> {
        let rows: Vec<Vec3> = self
            .refs
            .par_iter()
            .map(|dst| {
                let mut acc = Vec3::zeros();
                for (j, src) in self.refs.iter().enumerate() {
                    let xj = Vec3::new(x[3 * j], x[3 * j + 1], x[3 * j + 2]);
                    acc += mixed_block(dst, src, &self.material, self.half_space, self.delta) * xj;
                }
                acc
            })
            .collect();
        stack_rows(&rows)
    }

    fn apply_transpose(&self, x: &DVector<f64>) -> DVector<f64> {
        let rows: Vec<Vec3> = self
            .refs
            .par_iter()
            .map(|src| {
                let mut acc = Vec3::zeros();
                for (i, dst) in self.refs.iter().enumerate() {
                    let xi = Vec3::new(x[3 * i], x[3 * i + 1], x[3 * i + 2]);
                    acc += mixed_block(dst, src, &self.material, self.half_space, self.delta)
                        .transpose()
                        * xi;
                }
                acc
            })
            .collect();
        stack_rows(&rows)
    }
}

fn stack_rows(rows: &[Vec3]) -> DVector<f64> {
    let mut y = DVector::zeros(3 * rows.len());
    for (i, r) in rows.iter().enumerate() {
        y[3 * i] = r.x;
        y[3 * i + 1] = r.y;
        y[3 * i + 2] = r.z;
    }
    y
}

/// Remote-induced traction at each triangle center, local components.
///
/// Evaluated once per right-hand-side build; remotes never enter the
/// solver hot loop.
pub(crate) fn remote_tractions(model: &Model) -> Vec<Vec3> {
    model
        .triangle_refs()
        .iter()
        .map(|r| {
            let c = r.triangle.centroid();
            let s = model.remote_stress_at(&c);
            r.triangle.to_local(&s.traction(&r.triangle.normal()))
        })
        .collect()
}

/// Prescribed BC values at each triangle center, local axis order.
pub(crate) fn prescribed_values(model: &Model) -> Vec<Vec3> {
    model
        .triangle_refs()
        .iter()
        .map(|r| {
            let c = r.triangle.centroid();
            Vec3::new(
                r.conditions.0[0].value.at(c.x, c.y, c.z),
                r.conditions.0[1].value.at(c.x, c.y, c.z),
                r.conditions.0[2].value.at(c.x, c.y, c.z),
            )
        })
        .collect()
}

/// Right-hand side of the residual system.
///
/// Per axis: prescribed traction minus the remote-induced traction for
/// traction conditions, the prescribed Burgers component for
/// displacement conditions.
pub fn right_hand_side(model: &Model) -> DVector<f64> {
    let refs = model.triangle_refs();
    let remote = remote_tractions(model);
    let values = prescribed_values(model);
    let mut rhs = DVector::zeros(3 * refs.len());
    for (i, r) in refs.iter().enumerate() {
        for (a, bc) in r.conditions.0.iter().enumerate() {
            rhs[3 * i + a] = match bc.bc_type {
                BcType::Traction => values[i][a] - remote[i][a],
                BcType::Displacement => values[i][a],
            };
        }
    }
    rhs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::NullObserver;
    use crate::remote::UniformRemote;
    use crate::surface::Surface;
    use approx::assert_relative_eq;

    fn single_triangle_model() -> Model {
        let mut model = Model::new(Material::new(1.0, 0.25).unwrap(), false);
        let mut s = Surface::from_flat(
            &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0],
            &[0, 1, 2],
        )
        .unwrap();
        s.set_bc("normal", "free", 0.0).unwrap();
        model.add_surface(s);
        model
    }

    #[test]
    fn test_build_single_triangle() {
        let model = single_triangle_model();
        let a = InfluenceMatrix::build(&model, 1e-8, &NullObserver).unwrap();
        assert_eq!(a.n_triangles(), 1);
        // All-traction BCs: the block equals the traction self block.
        let d = a.block(0, 0);
        let t = a.self_traction(0);
        assert_relative_eq!((d - t).norm(), 0.0, epsilon = 1e-12);
        // Opening relaxes the normal traction on the element itself:
        // negative self-compliance in the tension-positive convention.
        assert!(t[(0, 0)] < 0.0);
    }

    #[test]
    fn test_displacement_rows_are_identity() {
        let mut model = single_triangle_model();
        model
            .surface_mut(0)
            .unwrap()
            .set_bc("normal", "locked", 0.0)
            .unwrap();
        let a = InfluenceMatrix::build(&model, 1e-8, &NullObserver).unwrap();
        let d = a.block(0, 0);
        assert_relative_eq!(d[(0, 0)], 1.0, epsilon = 1e-14);
        assert_relative_eq!(d[(0, 1)], 0.0, epsilon = 1e-14);
        assert_relative_eq!(d[(0, 2)], 0.0, epsilon = 1e-14);
    }

    #[test]
    fn test_rhs_subtracts_remote() {
        let mut model = single_triangle_model();
        // Normal of the element is ±ẑ: remote σ_zz resolves onto it.
        model.add_remote(Box::new(UniformRemote::new([
            0.0, 0.0, 0.0, 0.0, 0.0, -1.0,
        ])));
        let rhs = right_hand_side(&model);
        // Traction row: 0 − (σ·n̂)·ê_n = ±1 depending on normal sense.
        assert_relative_eq!(rhs[0].abs(), 1.0, epsilon = 1e-12);
        // Locked axes keep their prescribed values.
        let mut locked = single_triangle_model();
        locked
            .surface_mut(0)
            .unwrap()
            .set_bc("normal", "locked", 0.25)
            .unwrap();
        locked.add_remote(Box::new(UniformRemote::new([
            0.0, 0.0, 0.0, 0.0, 0.0, -1.0,
        ])));
        let rhs = right_hand_side(&locked);
        assert_relative_eq!(rhs[0], 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_dense_apply_matches_matrix_free() {
        let mut model = Model::new(Material::new(1.0, 0.25).unwrap(), false);
        let mut s = Surface::from_flat(
            &[
                0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0, //
                2.0, 0.0, -0.5, 3.0, 0.0, -0.5, 3.0, 1.0, -0.5,
            ],
            &[0, 1, 2, 0, 2, 3, 4, 5, 6],
        )
        .unwrap();
        s.set_bc("normal", "free", 0.0).unwrap();
        model.add_surface(s);

        let dense = InfluenceMatrix::build(&model, 1e-8, &NullObserver).unwrap();
        let free = MatrixFreeOperator::new(&model, 1e-8);
        let x = DVector::from_fn(9, |i, _| (i as f64 + 1.0) * 0.1);
        let yd = dense.apply(&x);
        let yf = free.apply(&x);
        assert_relative_eq!((yd - yf).norm(), 0.0, epsilon = 1e-10);
        let td = dense.apply_transpose(&x);
        let tf = free.apply_transpose(&x);
        assert_relative_eq!((td - tf).norm(), 0.0, epsilon = 1e-10);
    }
}
