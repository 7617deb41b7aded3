//! Krylov methods on the assembled influence operator.
//!
//! GMRES and CGNS (conjugate gradients on the normal equations) operate
//! on any [`InfluenceOp`], dense or matrix-free. They handle purely
//! linear models only: per-step inequality projections are incompatible
//! with Krylov subspaces, so models with constraints use the relaxation
//! methods instead.

use crate::assemble::InfluenceOp;
use nalgebra::DVector;

/// Result of a Krylov solve.
pub(crate) struct KrylovResult {
    pub x: DVector<f64>,
    pub iterations: usize,
    /// Relative residual after each iteration.
    pub history: Vec<f64>,
    pub converged: bool,
}

/// Full GMRES with modified Gram–Schmidt and Givens rotations.
///
/// Iteration count is bounded by `max_iter`, which doubles as the
/// Krylov subspace size; the influence systems solved here converge in
/// far fewer iterations than the operator dimension.
pub(crate) fn gmres(
    op: &dyn InfluenceOp,
    rhs: &DVector<f64>,
    x0: DVector<f64>,
    tolerance: f64,
    max_iter: usize,
) -> KrylovResult {
    let mut x = x0;
    let r0 = rhs - op.apply(&x);
    let beta = r0.norm();
    if beta <= tolerance * rhs.norm() {
        // Zero loading or a warm start that already satisfies the BCs.
        return KrylovResult {
            x,
            iterations: 0,
            history: Vec::new(),
            converged: true,
        };
    }

    let mut basis: Vec<DVector<f64>> = vec![r0 / beta];
    // Hessenberg columns after Givens reduction (upper triangular).
    let mut h_cols: Vec<Vec<f64>> = Vec::new();
    let mut cs: Vec<f64> = Vec::new();
    let mut sn: Vec<f64> = Vec::new();
    let mut g = vec![beta];
    let mut history = Vec::new();
    let mut converged = false;
    let mut k_used = 0;

    for k in 0..max_iter {
        let mut w = op.apply(&basis[k]);
        let mut hk = Vec::with_capacity(k + 2);
        for vi in basis.iter().take(k + 1) {
            let hij = vi.dot(&w);
            w.axpy(-hij, vi, 1.0);
            hk.push(hij);
        }
        let h_next = w.norm();

        // Apply the accumulated rotations to the new column.
        for i in 0..k {
            let t = cs[i] * hk[i] + sn[i] * hk[i + 1];
            hk[i + 1] = -sn[i] * hk[i] + cs[i] * hk[i + 1];
            hk[i] = t;
        }
        // New rotation zeroing the subdiagonal entry.
        let denom = (hk[k] * hk[k] + h_next * h_next).sqrt();
        let (c, s) = if denom == 0.0 {
            (1.0, 0.0)
        } else {
            (hk[k] / denom, h_next / denom)
        };
        hk[k] = denom;
        cs.push(c);
        sn.push(s);
        g.push(-s * g[k]);
        g[k] *= c;

        h_cols.push(hk);
        k_used = k + 1;
        let residual = g[k + 1].abs() / beta;
        history.push(residual);

        if residual <= tolerance {
            converged = true;
            break;
        }
        if h_next == 0.0 {
            // Lucky breakdown: the subspace is invariant.
            converged = true;
            break;
        }
        basis.push(w / h_next);
    }

    // Back substitution on the triangular system.
    let mut y = vec![0.0; k_used];
    for i in (0..k_used).rev() {
        let mut sum = g[i];
        for j in (i + 1)..k_used {
            sum -= h_cols[j][i] * y[j];
        }
        y[i] = sum / h_cols[i][i];
    }
    for (i, yi) in y.iter().enumerate() {
        x.axpy(*yi, &basis[i], 1.0);
    }

    KrylovResult {
        x,
        iterations: k_used,
        history,
        converged,
    }
}

/// Conjugate gradients on the normal equations AᵀA·x = Aᵀ·b.
///
/// Squares the condition number but needs only two operator
/// applications per iteration and O(N) extra memory, which suits the
/// matrix-free path.
pub(crate) fn cgns(
    op: &dyn InfluenceOp,
    rhs: &DVector<f64>,
    x0: DVector<f64>,
    tolerance: f64,
    max_iter: usize,
) -> KrylovResult {
    let mut x = x0;
    let mut r = rhs - op.apply(&x);
    let r0_norm = r.norm();
    if r0_norm <= tolerance * rhs.norm() {
        return KrylovResult {
            x,
            iterations: 0,
            history: Vec::new(),
            converged: true,
        };
    }

    let mut z = op.apply_transpose(&r);
    let mut p = z.clone();
    let mut z_dot = z.dot(&z);
    let mut history = Vec::new();
    let mut converged = false;
    let mut iterations = 0;

    for k in 0..max_iter {
        let w = op.apply(&p);
        let w_dot = w.dot(&w);
        if w_dot == 0.0 {
            break;
        }
        let alpha = z_dot / w_dot;
        x.axpy(alpha, &p, 1.0);
        r.axpy(-alpha, &w, 1.0);

        iterations = k + 1;
        let residual = r.norm() / r0_norm;
        history.push(residual);
        if residual <= tolerance {
            converged = true;
            break;
        }

        z = op.apply_transpose(&r);
        let z_dot_new = z.dot(&z);
        let beta = z_dot_new / z_dot;
        z_dot = z_dot_new;
        p = &z + &p * beta;
    }

    KrylovResult {
        x,
        iterations,
        history,
        converged,
    }
}
