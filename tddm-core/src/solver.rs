//! Block iterative solution of the influence system.
//!
//! The solver drives the BC residuals to zero with block relaxation
//! (Gauss–Seidel by default), applying per-triangle constraint
//! projections after every block solve. Jacobi, colored parallel
//! Seidel, and the Krylov methods (GMRES and CGNS, linear models only)
//! are available through [`SolverConfig::method`].
//!
//! A solve moves through idle → assembling → iterating and finishes in
//! one of the terminal states of [`SolverStatus`]. The influence
//! operator is cached between solves and rebuilt only when the model
//! signature changes or the model was explicitly marked dirty; BC-value
//! and remote changes rebuild the right-hand side alone.

use crate::assemble::{
    remote_tractions, right_hand_side, InfluenceMatrix, InfluenceOp, MatrixFreeOperator,
    DENSE_TRIANGLE_LIMIT,
};
use crate::bc::BcType;
use crate::coloring::color_triangles;
use crate::constraint::ProjectionContext;
use crate::error::{Error, Result};
use crate::kernel::KernelConfig;
use crate::krylov::{cgns, gmres};
use crate::model::{Model, ModelSignature};
use crate::observer::{NullObserver, Observer, Phase};
use crate::types::Vec3;
use nalgebra::DVector;
use std::time::Instant;

/// Iterative method selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolverMethod {
    /// Block Gauss–Seidel with immediate updates (default).
    #[default]
    Seidel,
    /// Block Jacobi with previous-iterate updates.
    Jacobi,
    /// GMRES on the assembled operator (no inequality constraints).
    Gmres,
    /// Conjugate gradients on the normal equations (no constraints).
    Cgns,
    /// Colored parallel Gauss–Seidel.
    Parallel,
}

impl SolverMethod {
    /// Parse a method name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Solver`] for unknown names.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "seidel" | "gauss-seidel" => Ok(SolverMethod::Seidel),
            "jacobi" => Ok(SolverMethod::Jacobi),
            "gmres" => Ok(SolverMethod::Gmres),
            "cgns" => Ok(SolverMethod::Cgns),
            "parallel" => Ok(SolverMethod::Parallel),
            other => Err(Error::Solver(format!(
                "unknown solver method '{other}' (expected seidel, jacobi, gmres, cgns or parallel)"
            ))),
        }
    }

    fn supports_constraints(self) -> bool {
        matches!(
            self,
            SolverMethod::Seidel | SolverMethod::Jacobi | SolverMethod::Parallel
        )
    }
}

/// Terminal state of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverStatus {
    /// Relative residual dropped below the tolerance.
    Converged,
    /// Cooperative cancellation; current Burgers preserved.
    Stopped,
    /// Residual grew for `divergence_window` consecutive iterations;
    /// the best-so-far iterate is preserved.
    Diverged,
    /// Iteration budget exhausted; the best-so-far iterate is returned.
    MaxIterations,
}

/// Solver configuration.
#[derive(Debug, Clone, Copy)]
pub struct SolverConfig {
    /// Iterative method.
    pub method: SolverMethod,
    /// Relative residual tolerance ‖r_k‖/‖r_0‖.
    pub tolerance: f64,
    /// Iteration budget K_max.
    pub max_iterations: usize,
    /// Consecutive growing iterations before declaring divergence.
    pub divergence_window: usize,
    /// Worker threads for assembly, sweeps and residual evaluation.
    pub cores: usize,
    /// Drop the influence matrix after each run.
    pub auto_release_memory: bool,
    /// Start from the previous solution instead of zero.
    pub warm_start: bool,
    /// Kernel evaluation settings.
    pub kernel: KernelConfig,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            method: SolverMethod::Seidel,
            tolerance: 1e-9,
            max_iterations: 200,
            divergence_window: 10,
            cores: 1,
            auto_release_memory: true,
            warm_start: false,
            kernel: KernelConfig::default(),
        }
    }
}

/// Convergence statistics of one run.
#[derive(Debug, Clone)]
pub struct SolveStats {
    /// Terminal status.
    pub status: SolverStatus,
    /// Iterations performed.
    pub iterations: usize,
    /// Absolute initial residual norm.
    pub initial_residual: f64,
    /// Final relative residual.
    pub residual: f64,
    /// Relative residual after each iteration.
    pub history: Vec<f64>,
    /// Wall-clock seconds spent assembling.
    pub build_seconds: f64,
    /// Wall-clock seconds spent iterating.
    pub solve_seconds: f64,
}

/// The iterative solver, caching the operator and solution between runs.
pub struct Solver {
    config: SolverConfig,
    matrix: Option<InfluenceMatrix>,
    signature: Option<ModelSignature>,
    burgers: Option<DVector<f64>>,
}

impl Solver {
    /// New solver with the given configuration.
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            matrix: None,
            signature: None,
            burgers: None,
        }
    }

    /// Solver configuration.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// The Burgers vector of the last run, canonical DOF order, local
    /// frames.
    pub fn burgers(&self) -> Option<&DVector<f64>> {
        self.burgers.as_ref()
    }

    /// Run with the default (null) observer.
    pub fn run(&mut self, model: &Model) -> Result<SolveStats> {
        self.run_with_observer(model, &NullObserver)
    }

    /// Run to a terminal state, blocking until done.
    ///
    /// # Errors
    ///
    /// Configuration errors (invalid model, constraints with a Krylov
    /// method, oversize dense model) surface before any iteration.
    /// Numerical trouble is reported through the returned status and
    /// the observer, not as an `Err`.
    pub fn run_with_observer(
        &mut self,
        model: &Model,
        observer: &dyn Observer,
    ) -> Result<SolveStats> {
        model.validate()?;

        let n = model.n_triangles();
        let has_constraints = model.has_constraints();
        if has_constraints && !self.config.method.supports_constraints() {
            return Err(Error::Solver(
                "inequality constraints require the seidel, jacobi or parallel method".to_string(),
            ));
        }

        let use_dense = n <= DENSE_TRIANGLE_LIMIT;
        if !use_dense && self.config.method.supports_constraints() {
            return Err(Error::Solver(format!(
                "{n} triangles exceed the dense-path limit {DENSE_TRIANGLE_LIMIT}; \
                 use gmres or cgns on the matrix-free operator"
            )));
        }

        let delta = self.config.kernel.offset_ratio * model.extent();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.cores.max(1))
            .build()
            .map_err(|e| Error::Solver(format!("worker pool: {e}")))?;

        // Assemble or reuse the dense operator.
        let build_start = Instant::now();
        let signature = model.signature();
        let explicit_dirty = model.take_dirty();
        if use_dense {
            let stale = explicit_dirty
                || self.matrix.is_none()
                || self.signature.as_ref() != Some(&signature);
            if stale {
                let matrix =
                    pool.install(|| InfluenceMatrix::build(model, delta, observer))?;
                self.matrix = Some(matrix);
                self.signature = Some(signature);
            }
        } else {
            self.matrix = None;
            self.signature = None;
        }
        let build_seconds = build_start.elapsed().as_secs_f64();

        let rhs = right_hand_side(model);
        let x0 = match (&self.burgers, self.config.warm_start) {
            (Some(b), true) if b.len() == rhs.len() => b.clone(),
            _ => DVector::zeros(rhs.len()),
        };

        let solve_start = Instant::now();
        let outcome = pool.install(|| -> Result<RunOutcome> {
            match self.config.method {
                SolverMethod::Gmres | SolverMethod::Cgns => {
                    let dense = self.matrix.as_ref();
                    let matrix_free;
                    let op: &dyn InfluenceOp = match dense {
                        Some(m) => m,
                        None => {
                            matrix_free = MatrixFreeOperator::new(model, delta);
                            &matrix_free
                        }
                    };
                    Ok(run_krylov(self.config, op, &rhs, x0, observer))
                }
                _ => {
                    let matrix = self
                        .matrix
                        .as_ref()
                        .expect("dense operator present for relaxation methods");
                    relaxation(self.config, model, matrix, &rhs, x0, observer)
                }
            }
        })?;
        let solve_seconds = solve_start.elapsed().as_secs_f64();

        self.burgers = Some(outcome.x);
        if self.config.auto_release_memory {
            self.matrix = None;
            self.signature = None;
        }

        let stats = SolveStats {
            status: outcome.status,
            iterations: outcome.iterations,
            initial_residual: outcome.initial_residual,
            residual: outcome.residual,
            history: outcome.history,
            build_seconds,
            solve_seconds,
        };
        observer.on_end(stats.status);
        Ok(stats)
    }
}

struct RunOutcome {
    x: DVector<f64>,
    status: SolverStatus,
    iterations: usize,
    initial_residual: f64,
    residual: f64,
    history: Vec<f64>,
}

fn run_krylov(
    config: SolverConfig,
    op: &dyn InfluenceOp,
    rhs: &DVector<f64>,
    x0: DVector<f64>,
    observer: &dyn Observer,
) -> RunOutcome {
    let initial_residual = (rhs - op.apply(&x0)).norm();
    let result = match config.method {
        SolverMethod::Gmres => gmres(op, rhs, x0, config.tolerance, config.max_iterations),
        _ => cgns(op, rhs, x0, config.tolerance, config.max_iterations),
    };
    for (k, r) in result.history.iter().enumerate() {
        observer.on_progress(k + 1, *r, Phase::Solve);
    }
    let residual = result.history.last().copied().unwrap_or(0.0);
    RunOutcome {
        x: result.x,
        status: if result.converged {
            SolverStatus::Converged
        } else {
            SolverStatus::MaxIterations
        },
        iterations: result.iterations,
        initial_residual,
        residual,
        history: result.history,
    }
}

fn relaxation(
    config: SolverConfig,
    model: &Model,
    matrix: &InfluenceMatrix,
    rhs: &DVector<f64>,
    x0: DVector<f64>,
    observer: &dyn Observer,
) -> Result<RunOutcome> {
    let refs = model.triangle_refs();
    let n = refs.len();
    let mut x = x0;

    // Reference residual for the relative criterion: ‖r₀‖ on a cold
    // start (where it equals ‖rhs‖); a warm start keeps ‖rhs‖ so the
    // criterion is invariant under restarting from a converged state.
    let initial_residual = (rhs - matrix.apply(&x)).norm();
    let rhs_norm = rhs.norm();
    let reference = if rhs_norm > 0.0 {
        rhs_norm
    } else {
        initial_residual
    };
    if initial_residual <= config.tolerance * reference {
        return Ok(RunOutcome {
            x,
            status: SolverStatus::Converged,
            iterations: 0,
            initial_residual,
            residual: 0.0,
            history: Vec::new(),
        });
    }

    let remote_t = remote_tractions(model);
    let batches: Vec<Vec<usize>> = match config.method {
        SolverMethod::Parallel => color_triangles(model),
        _ => vec![(0..n).collect()],
    };

    let mut history = Vec::new();
    let mut status = None;
    let mut iterations = 0;
    let mut best_x = x.clone();
    let mut best_residual = f64::INFINITY;
    let mut growth_streak = 0_usize;

    for k in 0..config.max_iterations {
        if observer.stop_requested() {
            status = Some(SolverStatus::Stopped);
            break;
        }

        match config.method {
            SolverMethod::Jacobi => {
                use rayon::prelude::*;
                let snapshot = x.clone();
                let updates: Vec<Vec3> = (0..n)
                    .into_par_iter()
                    .map(|i| block_update(model, matrix, &refs, rhs, &remote_t, &snapshot, i))
                    .collect();
                for (i, u) in updates.iter().enumerate() {
                    write_block(&mut x, i, u);
                }
            }
            SolverMethod::Parallel => {
                use rayon::prelude::*;
                for batch in &batches {
                    let updates: Vec<(usize, Vec3)> = batch
                        .par_iter()
                        .map(|&i| (i, block_update(model, matrix, &refs, rhs, &remote_t, &x, i)))
                        .collect();
                    for (i, u) in updates {
                        write_block(&mut x, i, &u);
                    }
                }
            }
            _ => {
                // Sequential Seidel: immediate updates in canonical order.
                for i in 0..n {
                    let u = block_update(model, matrix, &refs, rhs, &remote_t, &x, i);
                    write_block(&mut x, i, &u);
                }
            }
        }

        iterations = k + 1;
        let residual = (rhs - matrix.apply(&x)).norm() / reference;
        observer.on_progress(iterations, residual, Phase::Solve);

        let grew = history.last().is_some_and(|&prev| residual > prev);
        history.push(residual);
        if residual < best_residual {
            best_residual = residual;
            best_x.copy_from(&x);
        }

        if residual <= config.tolerance {
            status = Some(SolverStatus::Converged);
            break;
        }
        growth_streak = if grew { growth_streak + 1 } else { 0 };
        if growth_streak >= config.divergence_window {
            status = Some(SolverStatus::Diverged);
            let mut message = format!(
                "solver diverged after {iterations} iterations (residual {residual:.3e})"
            );
            if let Some((i, j, angle)) = model.smallest_dihedral_pair() {
                message.push_str(&format!(
                    "; suspect triangles {i} and {j} folding at {:.1}°, or overlapping elements",
                    angle.to_degrees()
                ));
            }
            observer.on_warning(&message);
            break;
        }
    }

    let status = status.unwrap_or(SolverStatus::MaxIterations);
    match status {
        // Tie-break on a non-converged finish: return the best iterate.
        SolverStatus::Diverged | SolverStatus::MaxIterations => {
            x.copy_from(&best_x);
        }
        _ => {}
    }
    let residual = history.last().copied().unwrap_or(0.0);

    Ok(RunOutcome {
        x,
        status,
        iterations,
        initial_residual,
        residual: if matches!(status, SolverStatus::Converged | SolverStatus::Stopped) {
            residual
        } else {
            best_residual.min(residual)
        },
        history,
    })
}

/// One block solve with constraint projection, returning the new
/// Burgers candidate of triangle `i`.
#[allow(clippy::too_many_arguments)]
fn block_update(
    model: &Model,
    matrix: &InfluenceMatrix,
    refs: &[crate::model::TriangleRef<'_>],
    rhs: &DVector<f64>,
    remote_t: &[Vec3],
    x: &DVector<f64>,
    i: usize,
) -> Vec3 {
    let off = matrix.off_diagonal_sum(i, x);
    let rhs_i = Vec3::new(rhs[3 * i], rhs[3 * i + 1], rhs[3 * i + 2]);
    let prev = Vec3::new(x[3 * i], x[3 * i + 1], x[3 * i + 2]);
    let mut candidate = matrix.diag_inv(i) * (rhs_i - off);

    let r = &refs[i];
    let surface = &model.surfaces()[r.surface];
    if surface.has_constraints() {
        // Tentative traction with the pre-update Burgers vector. Axes
        // with traction conditions accumulate the exact off-diagonal
        // traction; displacement axes carry remote + self terms, which
        // is exact for a single planar surface.
        let self_block = matrix.self_traction(i);
        let mut traction = remote_t[i] + self_block * prev;
        for (a, bc) in r.conditions.0.iter().enumerate() {
            if bc.bc_type == BcType::Traction {
                traction[a] += off[a];
            }
        }

        let mut ctx = ProjectionContext {
            index: i,
            triangle: r.triangle,
            burgers: candidate,
            burgers_prev: prev,
            traction,
            self_block,
            self_block_inv: matrix.self_traction_inv(i),
        };
        for constraint in surface.constraints_for(r.local) {
            constraint.project(&mut ctx);
        }
        candidate = ctx.burgers;
    }
    candidate
}

fn write_block(x: &mut DVector<f64>, i: usize, v: &Vec3) {
    x[3 * i] = v.x;
    x[3 * i + 1] = v.y;
    x[3 * i + 2] = v.z;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::Coulomb;
    use crate::material::Material;
    use crate::remote::UniformRemote;
    use crate::surface::Surface;
    use approx::assert_relative_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn unit_triangle_model() -> Model {
        let mut model = Model::new(Material::new(1.0, 0.25).unwrap(), false);
        let mut s = Surface::from_flat(
            &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0],
            &[0, 1, 2],
        )
        .unwrap();
        // Unit pressure on the crack faces: compressive face traction in
        // the engineer (tension-positive) convention.
        s.set_bc("normal", "free", -1.0).unwrap();
        model.add_surface(s);
        model
    }

    fn quad_model() -> Model {
        let mut model = Model::new(Material::new(1.0, 0.25).unwrap(), false);
        let mut s = Surface::from_flat(
            &[
                0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0,
            ],
            &[0, 1, 2, 0, 2, 3],
        )
        .unwrap();
        s.set_bc("normal", "free", 0.0).unwrap();
        model.add_surface(s);
        model
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!(SolverMethod::parse("seidel").unwrap(), SolverMethod::Seidel);
        assert_eq!(
            SolverMethod::parse("Gauss-Seidel").unwrap(),
            SolverMethod::Seidel
        );
        assert_eq!(SolverMethod::parse("GMRES").unwrap(), SolverMethod::Gmres);
        assert_eq!(
            SolverMethod::parse("parallel").unwrap(),
            SolverMethod::Parallel
        );
        assert!(SolverMethod::parse("newton").is_err());
    }

    #[test]
    fn test_unit_pressure_opens_crack() {
        // Single triangle, whole space, unit normal traction: positive
        // opening, no tangential slip.
        let model = unit_triangle_model();
        let mut solver = Solver::new(SolverConfig::default());
        let stats = solver.run(&model).unwrap();
        assert_eq!(stats.status, SolverStatus::Converged);
        let b = solver.burgers().unwrap();
        assert!(b[0] > 0.0, "opening must be positive, got {}", b[0]);
        assert_relative_eq!(b[1], 0.0, epsilon = 1e-12);
        assert_relative_eq!(b[2], 0.0, epsilon = 1e-12);
        // Magnitude scale: ~(1-ν)/μ times the element size.
        let mu = model.material().shear_modulus();
        let scale = (1.0 - model.material().poisson) / mu;
        assert!(b[0] < 10.0 * scale && b[0] > 0.01 * scale);
    }

    #[test]
    fn test_zero_loading_zero_burgers() {
        let mut model = quad_model();
        model
            .surface_mut(0)
            .unwrap()
            .set_bc("normal", "free", 0.0)
            .unwrap();
        let mut solver = Solver::new(SolverConfig::default());
        let stats = solver.run(&model).unwrap();
        assert_eq!(stats.status, SolverStatus::Converged);
        assert_eq!(stats.iterations, 0);
        assert_relative_eq!(solver.burgers().unwrap().norm(), 0.0);
    }

    #[test]
    fn test_linearity_in_loading() {
        let mut model = quad_model();
        model.add_remote(Box::new(UniformRemote::new([
            0.0, 0.0, 0.0, 0.0, 0.0, -1.0,
        ])));
        let mut solver = Solver::new(SolverConfig::default());
        solver.run(&model).unwrap();
        let b1 = solver.burgers().unwrap().clone();

        let mut scaled = quad_model();
        scaled.add_remote(Box::new(UniformRemote::new([
            0.0, 0.0, 0.0, 0.0, 0.0, -3.0,
        ])));
        let mut solver2 = Solver::new(SolverConfig::default());
        solver2.run(&scaled).unwrap();
        let b3 = solver2.burgers().unwrap();
        assert_relative_eq!(((b1 * 3.0) - b3).norm(), 0.0, epsilon = 1e-6 * b3.norm());
    }

    #[test]
    fn test_methods_agree_on_linear_model() {
        let mut burgers = Vec::new();
        for method in [
            SolverMethod::Seidel,
            SolverMethod::Jacobi,
            SolverMethod::Gmres,
            SolverMethod::Cgns,
            SolverMethod::Parallel,
        ] {
            let mut model = quad_model();
            model.add_remote(Box::new(UniformRemote::new([
                0.0, 0.0, 0.0, 0.0, 0.0, -1.0,
            ])));
            let config = SolverConfig {
                method,
                cores: if method == SolverMethod::Parallel { 2 } else { 1 },
                max_iterations: 500,
                ..SolverConfig::default()
            };
            let mut solver = Solver::new(config);
            let stats = solver.run(&model).unwrap();
            assert_eq!(stats.status, SolverStatus::Converged, "{method:?}");
            burgers.push(solver.burgers().unwrap().clone());
        }
        let reference = &burgers[0];
        for b in &burgers[1..] {
            assert_relative_eq!((b - reference).norm(), 0.0, epsilon = 1e-6 * reference.norm());
        }
    }

    #[test]
    fn test_residual_decreases_geometrically() {
        let mut model = quad_model();
        model.add_remote(Box::new(UniformRemote::new([
            0.0, 0.0, 0.0, 0.0, 0.0, -1.0,
        ])));
        let mut solver = Solver::new(SolverConfig::default());
        let stats = solver.run(&model).unwrap();
        assert_eq!(stats.status, SolverStatus::Converged);
        // After the first iteration the residual must not increase.
        for w in stats.history.windows(2) {
            assert!(w[1] <= w[0] * (1.0 + 1e-12), "{:?}", stats.history);
        }
    }

    #[test]
    fn test_constraints_rejected_for_krylov() {
        let mut model = quad_model();
        model
            .surface_mut(0)
            .unwrap()
            .add_constraint(Box::new(Coulomb::new(0.6, 0.0)));
        let mut solver = Solver::new(SolverConfig {
            method: SolverMethod::Gmres,
            ..SolverConfig::default()
        });
        assert!(solver.run(&model).is_err());
    }

    #[test]
    fn test_empty_model_is_configuration_error() {
        let model = Model::new(Material::granite(), false);
        let mut solver = Solver::new(SolverConfig::default());
        assert!(solver.run(&model).is_err());
    }

    #[test]
    fn test_stop_request_preserves_state() {
        struct StopNow;
        impl Observer for StopNow {
            fn stop_requested(&self) -> bool {
                true
            }
        }
        let mut model = quad_model();
        model.add_remote(Box::new(UniformRemote::new([
            0.0, 0.0, 0.0, 0.0, 0.0, -1.0,
        ])));
        let mut solver = Solver::new(SolverConfig::default());
        let stats = solver.run_with_observer(&model, &StopNow).unwrap();
        assert_eq!(stats.status, SolverStatus::Stopped);
        assert_eq!(stats.iterations, 0);
        assert!(solver.burgers().is_some());
    }

    #[test]
    fn test_operator_reuse_and_rhs_update() {
        // With auto-release off, a second solve with changed loading
        // reuses the cached operator (observed through build progress).
        struct BuildCounter(AtomicUsize);
        impl Observer for BuildCounter {
            fn on_progress(&self, _i: usize, _r: f64, phase: Phase) {
                if phase == Phase::Build {
                    self.0.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        let mut model = quad_model();
        model.add_remote(Box::new(UniformRemote::new([
            0.0, 0.0, 0.0, 0.0, 0.0, -1.0,
        ])));
        let observer = BuildCounter(AtomicUsize::new(0));
        let mut solver = Solver::new(SolverConfig {
            auto_release_memory: false,
            ..SolverConfig::default()
        });
        solver.run_with_observer(&model, &observer).unwrap();
        let builds_first = observer.0.load(Ordering::Relaxed);
        assert!(builds_first > 0);

        model.clear_remotes();
        model.add_remote(Box::new(UniformRemote::new([
            0.0, 0.0, 0.0, 0.0, 0.0, -2.0,
        ])));
        solver.run_with_observer(&model, &observer).unwrap();
        assert_eq!(observer.0.load(Ordering::Relaxed), builds_first);

        // A BC-type change forces a rebuild.
        model
            .surface_mut(0)
            .unwrap()
            .set_bc("strike", "locked", 0.0)
            .unwrap();
        solver.run_with_observer(&model, &observer).unwrap();
        assert!(observer.0.load(Ordering::Relaxed) > builds_first);
    }

    #[test]
    fn test_warm_start_speeds_up_repeat_solve() {
        let mut model = quad_model();
        model.add_remote(Box::new(UniformRemote::new([
            0.0, 0.0, 0.0, 0.0, 0.0, -1.0,
        ])));
        let mut solver = Solver::new(SolverConfig {
            warm_start: true,
            auto_release_memory: false,
            ..SolverConfig::default()
        });
        let first = solver.run(&model).unwrap();
        let second = solver.run(&model).unwrap();
        assert!(second.iterations <= first.iterations);
    }

    /// Traction on one triangle from the converged Burgers field plus
    /// the remotes, in the triangle's local frame.
    fn total_traction_local(model: &Model, solver: &Solver, i: usize) -> Vec3 {
        let b = solver.burgers().unwrap();
        let refs = model.triangle_refs();
        let tri = refs[i].triangle;
        let nu = model.material().poisson;
        let hs = model.half_space();
        let mut induced = Vec3::zeros();
        for (j, r) in refs.iter().enumerate() {
            let bj = Vec3::new(b[3 * j], b[3 * j + 1], b[3 * j + 2]);
            let strain = crate::kernel::centroid_strain(r.triangle, tri, &bj, nu, hs, 1e-8);
            induced += model
                .material()
                .stress_from_strain(&strain)
                .traction(&tri.normal());
        }
        let remote = model
            .remote_stress_at(&tri.centroid())
            .traction(&tri.normal());
        tri.to_local(&(induced + remote))
    }

    #[test]
    fn test_coulomb_sliding_lands_on_cone() {
        // A 60°-dipping fault with a locked normal under compression
        // strong enough to overcome friction: the converged shear
        // traction must sit on the cone, collinear with the slip.
        let dip = 60.0_f64.to_radians();
        let (c, s) = (dip.cos(), dip.sin());
        let mut model = Model::new(Material::new(1.0, 0.25).unwrap(), false);
        let mut surface = Surface::from_flat(
            &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, c, -s],
            &[0, 1, 2],
        )
        .unwrap();
        surface.set_bc("normal", "locked", 0.0).unwrap();
        surface.set_bc("strike", "free", 0.0).unwrap();
        surface.set_bc("dip", "free", 0.0).unwrap();
        let friction = 0.6;
        surface.add_constraint(Box::new(Coulomb::new(friction, 0.0)));
        model.add_surface(surface);

        // Strong deviatoric compression: resolved shear exceeds the
        // cone for the locked state, forcing slide.
        model.add_remote(Box::new(UniformRemote::new([
            -0.2, 0.0, 0.0, -0.2, 0.0, -2.0,
        ])));
        let mut solver = Solver::new(SolverConfig {
            max_iterations: 500,
            ..SolverConfig::default()
        });
        let stats = solver.run(&model).unwrap();
        assert!(matches!(
            stats.status,
            SolverStatus::Converged | SolverStatus::MaxIterations
        ));

        let b = solver.burgers().unwrap().clone();
        let slip_t = Vec3::new(0.0, b[1], b[2]);
        assert!(slip_t.norm() > 0.0, "the element must slide");
        // Locked normal: no opening.
        assert_relative_eq!(b[0], 0.0, epsilon = 1e-12);

        let t_local = total_traction_local(&model, &solver, 0);
        let sigma_n = t_local.x;
        let tau_vec = Vec3::new(0.0, t_local.y, t_local.z);
        let tau = tau_vec.norm();
        let tau_max = (-sigma_n * friction).max(0.0);
        // On or inside the cone.
        assert!(
            tau <= tau_max * (1.0 + 1e-5) + 1e-6,
            "τ = {tau} exceeds cone limit {tau_max}"
        );
        // Slip collinear with the residual shear traction.
        let cosine = slip_t.dot(&tau_vec) / (slip_t.norm() * tau.max(1e-30));
        assert!(
            cosine.abs() > 1.0 - 1e-3,
            "slip and shear traction are not collinear (cos = {cosine})"
        );
    }
}
