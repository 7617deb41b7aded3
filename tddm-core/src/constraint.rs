//! Per-triangle inequality constraints.
//!
//! A constraint is an opaque projection applied after each block solve:
//! it receives the candidate Burgers vector and the tentative traction
//! of one triangle and maps them onto an admissible set. The solver
//! never switches on concrete constraint kinds; constraints attached to
//! a surface compose in registration order.
//!
//! All vectors here are in the triangle's local (normal, strike, dip)
//! frame, engineer sign convention (tension positive).

use crate::geometry::Triangle;
use crate::types::Vec3;
use nalgebra::Matrix3;

/// State handed to a constraint projection for one triangle.
///
/// `burgers` is the candidate from the current block solve; `traction`
/// is the tentative traction computed with the pre-update Burgers
/// vector. `self_block` maps a Burgers increment of this triangle to
/// the traction increment at its own centroid; its inverse converts
/// traction corrections back into slip corrections.
pub struct ProjectionContext<'a> {
    /// Global triangle index.
    pub index: usize,
    /// Triangle geometry.
    pub triangle: &'a Triangle,
    /// Candidate Burgers vector (local frame); mutated in place.
    pub burgers: Vec3,
    /// Burgers vector before this sweep's update.
    pub burgers_prev: Vec3,
    /// Tentative traction (local frame); mutated in place.
    pub traction: Vec3,
    /// Self-influence block b ↦ t (local frame).
    pub self_block: &'a Matrix3<f64>,
    /// Inverse of the self-influence block.
    pub self_block_inv: &'a Matrix3<f64>,
}

/// A projection onto an admissible (Burgers, traction) set.
pub trait Constraint: Send + Sync {
    /// Project the candidate state of one triangle.
    fn project(&self, ctx: &mut ProjectionContext<'_>);

    /// Short name for diagnostics.
    fn name(&self) -> &'static str;
}

/// Coulomb friction: ‖τ‖ ≤ max(0, −σ_n·μ_f + C).
///
/// With the tentative traction t, σ_n = t·ê_n (tension positive) and τ
/// its tangential part. Below the limit the element sticks: the
/// tangential Burgers components revert to their pre-step values. Above
/// it the element slides: the tangential traction is scaled onto the
/// cone and the Burgers vector adjusted through the self-block inverse.
/// The `linearized` flag replaces the cone by a four-facet pyramid
/// (independent per-axis clamping), which is cheaper but anisotropic.
#[derive(Debug, Clone, Copy)]
pub struct Coulomb {
    /// Friction coefficient μ_f.
    pub friction: f64,
    /// Cohesion C.
    pub cohesion: f64,
    /// Use the pyramid linearization instead of the cone.
    pub linearized: bool,
}

impl Coulomb {
    /// Nonlinear Coulomb cone with the given friction and cohesion.
    pub fn new(friction: f64, cohesion: f64) -> Self {
        Self {
            friction,
            cohesion,
            linearized: false,
        }
    }

    /// Switch to the four-facet pyramid linearization.
    pub fn linearized(mut self) -> Self {
        self.linearized = true;
        self
    }
}

impl Constraint for Coulomb {
    fn project(&self, ctx: &mut ProjectionContext<'_>) {
        let sigma_n = ctx.traction.x;
        let tau = Vec3::new(0.0, ctx.traction.y, ctx.traction.z);
        let tau_max = (-sigma_n * self.friction + self.cohesion).max(0.0);

        let tau_proj = if self.linearized {
            Vec3::new(
                0.0,
                tau.y.clamp(-tau_max, tau_max),
                tau.z.clamp(-tau_max, tau_max),
            )
        } else {
            let tau_norm = tau.norm();
            if tau_norm <= tau_max {
                // Stick: no additional slip this step.
                ctx.burgers.y = ctx.burgers_prev.y;
                ctx.burgers.z = ctx.burgers_prev.z;
                return;
            }
            tau * (tau_max / tau_norm)
        };

        if self.linearized && tau_proj == tau {
            ctx.burgers.y = ctx.burgers_prev.y;
            ctx.burgers.z = ctx.burgers_prev.z;
            return;
        }

        // Slide: leave the residual traction on the cone and convert the
        // traction change into a slip correction.
        let dt = tau_proj - tau;
        let db = ctx.self_block_inv * dt;
        ctx.burgers.y = ctx.burgers_prev.y + db.y;
        ctx.burgers.z = ctx.burgers_prev.z + db.z;
        ctx.traction.y = tau_proj.y;
        ctx.traction.z = tau_proj.z;
    }

    fn name(&self) -> &'static str {
        "coulomb"
    }
}

/// Lower bound on one Burgers component: b·ê_axis ≥ value.
#[derive(Debug, Clone, Copy)]
pub struct MinDispl {
    /// Constrained local axis (0 = normal, 1 = strike, 2 = dip).
    pub axis: usize,
    /// Lower bound.
    pub value: f64,
}

impl MinDispl {
    /// Clamp the given local axis from below.
    pub fn new(axis: usize, value: f64) -> Self {
        Self { axis, value }
    }
}

impl Constraint for MinDispl {
    fn project(&self, ctx: &mut ProjectionContext<'_>) {
        let b = ctx.burgers[self.axis];
        if b < self.value {
            let mut db = Vec3::zeros();
            db[self.axis] = self.value - b;
            ctx.burgers[self.axis] = self.value;
            ctx.traction += ctx.self_block * db;
        }
    }

    fn name(&self) -> &'static str {
        "min-displ"
    }
}

/// User-defined traction projection.
///
/// The callback receives the tentative traction, the global triangle
/// index and the triangle center, and returns the admissible traction.
pub struct UserTic {
    f: Box<dyn Fn(Vec3, usize, Vec3) -> Vec3 + Send + Sync>,
}

impl UserTic {
    /// Wrap a traction projection callback.
    pub fn new(f: impl Fn(Vec3, usize, Vec3) -> Vec3 + Send + Sync + 'static) -> Self {
        Self { f: Box::new(f) }
    }
}

impl Constraint for UserTic {
    fn project(&self, ctx: &mut ProjectionContext<'_>) {
        let t_new = (self.f)(ctx.traction, ctx.index, ctx.triangle.centroid());
        let dt = t_new - ctx.traction;
        ctx.burgers += ctx.self_block_inv * dt;
        ctx.traction = t_new;
    }

    fn name(&self) -> &'static str {
        "user-tic"
    }
}

/// User-defined displacement (Burgers) projection.
pub struct UserDic {
    f: Box<dyn Fn(Vec3, usize, Vec3) -> Vec3 + Send + Sync>,
}

impl UserDic {
    /// Wrap a Burgers projection callback.
    pub fn new(f: impl Fn(Vec3, usize, Vec3) -> Vec3 + Send + Sync + 'static) -> Self {
        Self { f: Box::new(f) }
    }
}

impl Constraint for UserDic {
    fn project(&self, ctx: &mut ProjectionContext<'_>) {
        let b_new = (self.f)(ctx.burgers, ctx.index, ctx.triangle.centroid());
        let db = b_new - ctx.burgers;
        ctx.traction += ctx.self_block * db;
        ctx.burgers = b_new;
    }

    fn name(&self) -> &'static str {
        "user-dic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point3;
    use approx::assert_relative_eq;

    fn test_triangle() -> Triangle {
        Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        )
        .unwrap()
    }

    fn ctx_with<'a>(
        tri: &'a Triangle,
        block: &'a Matrix3<f64>,
        inv: &'a Matrix3<f64>,
        burgers: Vec3,
        traction: Vec3,
    ) -> ProjectionContext<'a> {
        ProjectionContext {
            index: 0,
            triangle: tri,
            burgers,
            burgers_prev: Vec3::zeros(),
            traction,
            self_block: block,
            self_block_inv: inv,
        }
    }

    #[test]
    fn test_coulomb_stick_below_cone() {
        let tri = test_triangle();
        let id = Matrix3::identity();
        // Compressive normal stress allows tau up to 0.6.
        let mut ctx = ctx_with(
            &tri,
            &id,
            &id,
            Vec3::new(0.0, 0.5, 0.5),
            Vec3::new(-1.0, 0.3, 0.0),
        );
        Coulomb::new(0.6, 0.0).project(&mut ctx);
        // Stick: tangential burgers revert to prev (zero).
        assert_relative_eq!(ctx.burgers.y, 0.0);
        assert_relative_eq!(ctx.burgers.z, 0.0);
        assert_relative_eq!(ctx.traction.y, 0.3);
    }

    #[test]
    fn test_coulomb_slide_scales_to_cone() {
        let tri = test_triangle();
        let id = Matrix3::identity();
        let mut ctx = ctx_with(
            &tri,
            &id,
            &id,
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(-1.0, 0.8, 0.6),
        );
        Coulomb::new(0.6, 0.0).project(&mut ctx);
        let tau = (ctx.traction.y.powi(2) + ctx.traction.z.powi(2)).sqrt();
        assert_relative_eq!(tau, 0.6, epsilon = 1e-12);
        // Direction preserved.
        assert_relative_eq!(ctx.traction.y / ctx.traction.z, 0.8 / 0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_coulomb_tensile_normal_drops_cone_to_cohesion() {
        let tri = test_triangle();
        let id = Matrix3::identity();
        let mut ctx = ctx_with(
            &tri,
            &id,
            &id,
            Vec3::zeros(),
            Vec3::new(0.5, 1.0, 0.0),
        );
        // Tension with zero cohesion: no shear strength at all.
        Coulomb::new(0.6, 0.0).project(&mut ctx);
        assert_relative_eq!(ctx.traction.y, 0.0, epsilon = 1e-12);
        assert_relative_eq!(ctx.traction.z, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_min_displ_clamps() {
        let tri = test_triangle();
        let id = Matrix3::identity();
        let mut ctx = ctx_with(
            &tri,
            &id,
            &id,
            Vec3::new(-0.5, 0.0, 0.0),
            Vec3::zeros(),
        );
        MinDispl::new(0, 0.0).project(&mut ctx);
        assert_relative_eq!(ctx.burgers.x, 0.0);
        // Traction updated consistently through the (identity) block.
        assert_relative_eq!(ctx.traction.x, 0.5);
    }

    #[test]
    fn test_user_projections() {
        let tri = test_triangle();
        let id = Matrix3::identity();
        let mut ctx = ctx_with(
            &tri,
            &id,
            &id,
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::zeros(),
        );
        UserDic::new(|b, _, _| Vec3::new(b.x, 0.0, 0.0)).project(&mut ctx);
        assert_relative_eq!(ctx.burgers.y, 0.0);
        assert_relative_eq!(ctx.burgers.z, 0.0);

        let mut ctx = ctx_with(
            &tri,
            &id,
            &id,
            Vec3::zeros(),
            Vec3::new(2.0, 0.0, 0.0),
        );
        UserTic::new(|t, _, _| Vec3::new(t.x.min(1.0), t.y, t.z)).project(&mut ctx);
        assert_relative_eq!(ctx.traction.x, 1.0);
        assert_relative_eq!(ctx.burgers.x, -1.0);
    }
}
