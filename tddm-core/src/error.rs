//! Error types for TDDM operations.

use thiserror::Error;

/// Result type alias using the TDDM [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during TDDM operations.
///
/// Configuration errors (`InvalidMaterial`, `Geometry`, `BoundaryCondition`,
/// `Model`, `InvalidInput`) surface synchronously from the call that
/// triggered them, before any iteration starts, and name the offending
/// entity by index. Numerical conditions during a solve are reported
/// through the solver status and observer callbacks instead.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid material properties.
    #[error("invalid material: {0}")]
    InvalidMaterial(String),

    /// Degenerate or inconsistent triangle geometry.
    #[error("geometry error: {0}")]
    Geometry(String),

    /// Unknown axis or boundary-condition type string.
    #[error("boundary condition error: {0}")]
    BoundaryCondition(String),

    /// Model-level inconsistencies (empty model, index out of range).
    #[error("model error: {0}")]
    Model(String),

    /// Influence operator assembly errors.
    #[error("assembly error: {0}")]
    Assembly(String),

    /// Solver configuration or setup errors.
    #[error("solver error: {0}")]
    Solver(String),

    /// Constraint configuration errors.
    #[error("constraint error: {0}")]
    Constraint(String),

    /// Malformed user input arrays (length not divisible by 3, etc.).
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
