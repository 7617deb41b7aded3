//! Solver observation and cooperative cancellation.
//!
//! All solver diagnostics flow through a single observer interface: no
//! global logger, no stdout chatter from the hot path. The default
//! observer ignores everything. Multi-threaded phases funnel their
//! events through one reporter, so implementations only need interior
//! mutability, not re-entrancy.

use crate::solver::SolverStatus;

/// Solve phase reported with progress events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Influence operator assembly.
    Build = 1,
    /// Iterative solution.
    Solve = 2,
}

/// Receiver for solver events.
///
/// All methods have no-op defaults; implement only what you need.
/// `stop_requested` is polled between Seidel sweeps and between
/// post-processing batches; returning `true` finalizes the solve with
/// [`SolverStatus::Stopped`] while preserving the current Burgers
/// vector.
pub trait Observer: Send + Sync {
    /// Progress: iteration counter and relative residual for
    /// [`Phase::Solve`], rows completed for [`Phase::Build`].
    fn on_progress(&self, _iteration: usize, _residual: f64, _phase: Phase) {}

    /// Informational message.
    fn on_message(&self, _message: &str) {}

    /// Non-fatal condition (edge-singular evaluation, constraint
    /// stagnation, divergence diagnostics).
    fn on_warning(&self, _message: &str) {}

    /// Fatal condition accompanying an error return.
    fn on_error(&self, _message: &str) {}

    /// Terminal status of a solve.
    fn on_end(&self, _status: SolverStatus) {}

    /// Cooperative cancellation predicate.
    fn stop_requested(&self) -> bool {
        false
    }
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl Observer for NullObserver {}
