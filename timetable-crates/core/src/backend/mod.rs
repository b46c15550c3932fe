//! The boundary between the declarative [`Model`] and whatever solves it.
//!
//! A backend receives a finished model together with the run options and answers with a
//! [`SolveResponse`]. The crate ships one backend, [`FlatZincBackend`], which hands the model to
//! an external FlatZinc solver.
mod flatzinc;

use std::fmt::Display;
use std::fmt::Formatter;
use std::time::Duration;

pub use flatzinc::parse_output;
pub use flatzinc::write_flatzinc;
pub use flatzinc::FlatZincBackend;
pub use flatzinc::DEFAULT_EXECUTABLE;

use crate::domain::DEFAULT_TIME_LIMIT;
use crate::model::Assignment;
use crate::model::Model;
use crate::BackendError;

/// The verdict of a solver run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SolveStatus {
    /// A solution was found and proven optimal (or the model has no objective).
    Optimal,
    /// A solution was found, but the search stopped before proving optimality.
    Feasible,
    /// The model has no solution.
    Infeasible,
    /// The search stopped without a verdict, typically because the time limit was hit.
    Unknown,
}

impl Display for SolveStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SolveStatus::Optimal => "optimal",
            SolveStatus::Feasible => "feasible",
            SolveStatus::Infeasible => "infeasible",
            SolveStatus::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SolverStatistics {
    pub wall_time: Duration,
    pub conflicts: Option<u64>,
    pub nodes: Option<u64>,
    /// The objective value of the reported solution, if any.
    pub objective: Option<i64>,
}

impl Display for SolverStatistics {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "wall time {:.3}s", self.wall_time.as_secs_f64())?;
        if let Some(conflicts) = self.conflicts {
            write!(f, ", {conflicts} conflicts")?;
        }
        if let Some(nodes) = self.nodes {
            write!(f, ", {nodes} nodes")?;
        }
        if let Some(objective) = self.objective {
            write!(f, ", objective {objective}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct SolveResponse {
    pub status: SolveStatus,
    /// The best assignment found. Present for [`SolveStatus::Optimal`] and
    /// [`SolveStatus::Feasible`], and for [`SolveStatus::Unknown`] when an incumbent exists.
    pub assignment: Option<Assignment>,
    pub statistics: SolverStatistics,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SolveOptions {
    pub time_limit: Duration,
}

impl Default for SolveOptions {
    fn default() -> Self {
        SolveOptions {
            time_limit: DEFAULT_TIME_LIMIT,
        }
    }
}

/// Anything that can solve a [`Model`].
pub trait SolverBackend {
    /// Solve `model`, maximising its objective if it has one, within `options.time_limit`.
    fn solve(
        &mut self,
        model: &Model,
        options: &SolveOptions,
    ) -> Result<SolveResponse, BackendError>;
}

impl<B: SolverBackend + ?Sized> SolverBackend for &mut B {
    fn solve(
        &mut self,
        model: &Model,
        options: &SolveOptions,
    ) -> Result<SolveResponse, BackendError> {
        (**self).solve(model, options)
    }
}

impl<B: SolverBackend + ?Sized> SolverBackend for Box<B> {
    fn solve(
        &mut self,
        model: &Model,
        options: &SolveOptions,
    ) -> Result<SolveResponse, BackendError> {
        (**self).solve(model, options)
    }
}
