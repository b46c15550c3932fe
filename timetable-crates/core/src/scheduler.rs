//! One scheduling run, from domain to validated timetable.
use std::fmt::Display;
use std::fmt::Formatter;

use log::info;

use crate::backend::SolveOptions;
use crate::backend::SolveStatus;
use crate::backend::SolverBackend;
use crate::backend::SolverStatistics;
use crate::builder::build_model;
use crate::builder::AssignmentVars;
use crate::decode::decode_and_validate;
use crate::decode::Timetable;
use crate::decode::ValidationReport;
use crate::domain::Domain;
use crate::model::Model;
use crate::model::ModelStatistics;
use crate::preferences::add_preferences;
use crate::preferences::ObjectiveExpression;
use crate::ScheduleError;

/// The stages a run passes through, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Building,
    Solving,
    Decoding,
    Validated,
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Building => "building",
            Stage::Solving => "solving",
            Stage::Decoding => "decoding",
            Stage::Validated => "validated",
        };
        f.write_str(name)
    }
}

/// A model ready to be handed to a backend, together with what is needed to read its solution.
#[derive(Clone, Debug)]
pub struct PreparedModel {
    pub model: Model,
    pub vars: AssignmentVars,
    pub objective: ObjectiveExpression,
}

#[derive(Clone, Copy, Debug)]
pub struct SolveMetadata {
    pub status: SolveStatus,
    pub statistics: SolverStatistics,
    /// The weighted adjacency score of the decoded timetable.
    pub adjacency_score: i64,
    /// The score of a timetable grouping every subject it can, an upper bound on the above.
    pub max_adjacency_score: i64,
    pub model: ModelStatistics,
}

#[derive(Clone, Debug)]
pub struct ScheduleOutcome {
    pub timetable: Timetable,
    pub report: ValidationReport,
    pub metadata: SolveMetadata,
}

/// Drives a single run: build the model, add the preferences, solve, decode and validate.
#[derive(Debug)]
pub struct Scheduler<'a, B> {
    domain: &'a Domain,
    backend: B,
    options: SolveOptions,
}

impl<'a, B: SolverBackend> Scheduler<'a, B> {
    /// A scheduler using the time limit of `domain`.
    pub fn new(domain: &'a Domain, backend: B) -> Self {
        Scheduler {
            domain,
            backend,
            options: SolveOptions {
                time_limit: domain.time_limit,
            },
        }
    }

    pub fn with_options(mut self, options: SolveOptions) -> Self {
        self.options = options;
        self
    }

    fn enter(&self, stage: Stage) {
        info!("Scheduler stage: {stage}");
    }

    /// Build the complete model, with hard constraints and objective, without solving it.
    pub fn prepare(&self) -> Result<PreparedModel, ScheduleError> {
        self.enter(Stage::Building);
        let (mut model, vars) = build_model(self.domain)?;
        let objective = add_preferences(&mut model, self.domain, &vars);
        Ok(PreparedModel {
            model,
            vars,
            objective,
        })
    }

    pub fn run(mut self) -> Result<ScheduleOutcome, ScheduleError> {
        let prepared = self.prepare()?;

        self.enter(Stage::Solving);
        let response = self.backend.solve(&prepared.model, &self.options)?;

        self.enter(Stage::Decoding);
        let (timetable, report) =
            decode_and_validate(self.domain, &prepared.vars, &response, &self.options)?;

        self.enter(Stage::Validated);
        let adjacency_score = timetable.adjacency_score(self.domain);
        let max_adjacency_score = prepared.objective.max_score();
        info!(
            "Timetable accepted with status {}, adjacency score {adjacency_score} of at most {max_adjacency_score}",
            response.status
        );

        Ok(ScheduleOutcome {
            timetable,
            report,
            metadata: SolveMetadata {
                status: response.status,
                statistics: response.statistics,
                adjacency_score,
                max_adjacency_score,
                model: prepared.model.statistics(),
            },
        })
    }
}
