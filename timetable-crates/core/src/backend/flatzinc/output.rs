use std::collections::BTreeMap;

use log::debug;
use log::trace;

use super::writer::OBJECTIVE;
use crate::backend::SolveResponse;
use crate::backend::SolveStatus;
use crate::backend::SolverStatistics;
use crate::model::Assignment;
use crate::model::BoolVar;
use crate::model::IntVar;
use crate::model::Model;
use crate::BackendError;

const SOLUTION_SEPARATOR: &str = "----------";
const SEARCH_COMPLETE: &str = "==========";
const UNSATISFIABLE: &str = "=====UNSATISFIABLE=====";
const UNKNOWN: &str = "=====UNKNOWN=====";
const ERROR: &str = "=====ERROR=====";
const STATISTIC_PREFIX: &str = "%%%mzn-stat:";

#[derive(Debug, Default)]
struct Block {
    values: BTreeMap<String, String>,
}

/// Interpret the standard output of a FlatZinc solver that was given the instance written by
/// [`super::write_flatzinc`] for `model`.
///
/// The last complete solution block is the reported assignment. Boolean variables are derived
/// from the integer values. The wall time in the returned statistics is left at zero.
pub fn parse_output(model: &Model, output: &str) -> Result<SolveResponse, BackendError> {
    let mut completed: Option<Block> = None;
    let mut current = Block::default();
    let mut search_complete = false;
    let mut unsatisfiable = false;
    let mut statistics: BTreeMap<String, String> = BTreeMap::new();

    for line in output.lines().map(str::trim) {
        trace!("{line}");
        match line {
            "" => {}
            SOLUTION_SEPARATOR => completed = Some(std::mem::take(&mut current)),
            SEARCH_COMPLETE => search_complete = true,
            UNSATISFIABLE => unsatisfiable = true,
            UNKNOWN => {}
            ERROR => return Err(BackendError::SolverError),
            _ if line.starts_with(STATISTIC_PREFIX) => {
                if let Some((name, value)) = line[STATISTIC_PREFIX.len()..].trim().split_once('=') {
                    let _ = statistics.insert(name.trim().to_owned(), value.trim().to_owned());
                }
            }
            _ if line.starts_with('%') => {}
            _ => {
                let (name, value) = line
                    .strip_suffix(';')
                    .and_then(|line| line.split_once('='))
                    .ok_or_else(|| BackendError::MalformedOutput {
                        line: line.to_owned(),
                    })?;
                let _ = current
                    .values
                    .insert(name.trim().to_owned(), value.trim().to_owned());
            }
        }
    }

    let assignment = completed
        .as_ref()
        .map(|block| to_assignment(model, block))
        .transpose()?;

    let status = match (unsatisfiable, search_complete, &assignment) {
        (true, _, _) => SolveStatus::Infeasible,
        (false, true, Some(_)) => SolveStatus::Optimal,
        (false, false, Some(_)) if model.objective().is_none() => SolveStatus::Optimal,
        (false, false, Some(_)) => SolveStatus::Feasible,
        (false, _, None) => SolveStatus::Unknown,
    };

    let objective = completed
        .as_ref()
        .and_then(|block| block.values.get(OBJECTIVE))
        .map(|value| parse_value::<i64>(OBJECTIVE, value))
        .transpose()?;

    debug!("Solver reported {status} with statistics {statistics:?}");

    Ok(SolveResponse {
        status,
        assignment: if status == SolveStatus::Infeasible {
            None
        } else {
            assignment
        },
        statistics: SolverStatistics {
            conflicts: ["conflicts", "failures", "nogoods"]
                .iter()
                .find_map(|name| statistics.get(*name))
                .and_then(|value| value.parse().ok()),
            nodes: ["nodes", "decisions"]
                .iter()
                .find_map(|name| statistics.get(*name))
                .and_then(|value| value.parse().ok()),
            objective,
            ..SolverStatistics::default()
        },
    })
}

fn parse_value<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, BackendError> {
    value.parse().map_err(|_| BackendError::MalformedOutput {
        line: format!("{name} = {value};"),
    })
}

fn to_assignment(model: &Model, block: &Block) -> Result<Assignment, BackendError> {
    let mut assignment = Assignment::empty(model);

    for (name, value) in &block.values {
        if let Some(index) = name.strip_prefix("x_").and_then(|index| index.parse().ok()) {
            if index < model.num_int_vars() {
                assignment.set_int(IntVar(index), parse_value(name, value)?);
                continue;
            }
        }
        if let Some(index) = name.strip_prefix("b_").and_then(|index| index.parse().ok()) {
            if index < model.num_bool_vars() {
                assignment.set_bool(BoolVar(index), parse_value(name, value)?);
                continue;
            }
        }
        if name != OBJECTIVE {
            debug!("Ignoring unknown output variable {name}");
        }
    }

    model.derive_booleans(&mut assignment);
    Ok(assignment)
}
