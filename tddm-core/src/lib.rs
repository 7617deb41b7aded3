//! TDDM Core - Triangular Displacement Discontinuity Method
//!
//! Quasi-static linear-elastic boundary-value problems on fractured or
//! cavitated geological media, solved with the displacement
//! discontinuity variant of the boundary element method:
//! - Closed-form triangular dislocation kernels (whole space and
//!   half-space with a traction-free surface at z = 0)
//! - Dense block influence assembly, row-parallel with Rayon
//! - Block iterative solvers (Gauss-Seidel, Jacobi, colored parallel
//!   Seidel, GMRES, CGNS) with per-triangle constraint projections
//! - Post-processing of displacement, strain and stress at arbitrary
//!   points
//!
//! # Architecture
//!
//! The engine is designed around these core abstractions:
//!
//! - [`Model`]: surfaces, remotes, material and the canonical DOF order
//! - [`Surface`]: triangulated discontinuity with per-axis mixed
//!   boundary conditions
//! - [`Remote`] trait: far-field stress sources, summed linearly
//! - [`Constraint`] trait: per-triangle projections (Coulomb friction,
//!   bounded slip, user hooks)
//! - [`Solver`]: iterative driver with observer callbacks and
//!   cooperative cancellation
//! - [`Solution`]: field evaluation by superposition over the elements

pub mod assemble;
pub mod bc;
pub mod constraint;
pub mod error;
pub mod filter;
pub mod geometry;
pub mod kernel;
pub mod material;
pub mod model;
pub mod observer;
pub mod remote;
pub mod solution;
pub mod solver;
pub mod surface;
pub mod types;

mod coloring;
mod krylov;

pub use assemble::{right_hand_side, InfluenceMatrix, InfluenceOp, MatrixFreeOperator};
pub use bc::{Axis, AxisConditions, BcType, BcValue, BoundaryCondition};
pub use constraint::{Constraint, Coulomb, MinDispl, ProjectionContext, UserDic, UserTic};
pub use error::{Error, Result};
pub use filter::BurgerFilter;
pub use geometry::Triangle;
pub use kernel::KernelConfig;
pub use material::Material;
pub use model::{Model, TriangleRef};
pub use observer::{NullObserver, Observer, Phase};
pub use remote::{AndersonianRemote, FunctionRemote, Remote, UniformRemote};
pub use solution::Solution;
pub use solver::{SolveStats, Solver, SolverConfig, SolverMethod, SolverStatus};
pub use surface::Surface;
pub use types::{Point3, StrainTensor, StressTensor, Vec3};
