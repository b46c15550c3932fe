use thiserror::Error;

use super::Assignment;
use super::Comparator;
use super::Constraint;
use super::Model;

/// The truth value of a constraint under a (possibly partial) assignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Satisfied,
    Violated,
    /// Some variable the constraint depends on has no value yet.
    Undetermined,
}

impl From<bool> for Verdict {
    fn from(value: bool) -> Self {
        if value {
            Verdict::Satisfied
        } else {
            Verdict::Violated
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelViolation {
    #[error("variable {name} has no value")]
    Unassigned { name: String },
    #[error("variable {name} has value {value} outside its domain 0..{size}")]
    OutOfDomain {
        name: String,
        value: i32,
        size: usize,
    },
    #[error("constraint {index} is violated: {constraint}")]
    Violated { index: usize, constraint: String },
}

impl Model {
    /// Evaluate a single constraint.
    pub fn evaluate(&self, constraint: &Constraint, assignment: &Assignment) -> Verdict {
        match constraint {
            Constraint::Fix { var, value } => match assignment.int(*var) {
                Some(actual) => (actual == *value).into(),
                None => Verdict::Undetermined,
            },

            Constraint::ValueIndicator {
                indicator,
                var,
                value,
            } => match (assignment.bool(*indicator), assignment.int(*var)) {
                (Some(truth), Some(actual)) => (truth == (actual == *value)).into(),
                _ => Verdict::Undetermined,
            },

            Constraint::Clause(literals) => {
                let values = literals
                    .iter()
                    .map(|literal| assignment.literal(*literal))
                    .collect::<Vec<_>>();
                if values.contains(&Some(true)) {
                    Verdict::Satisfied
                } else if values.contains(&None) {
                    Verdict::Undetermined
                } else {
                    Verdict::Violated
                }
            }

            Constraint::AndReif { result, operands } => {
                let operands = operands
                    .iter()
                    .map(|operand| assignment.bool(*operand))
                    .collect::<Option<Vec<_>>>();
                match (assignment.bool(*result), operands) {
                    (Some(truth), Some(operands)) => {
                        (truth == operands.into_iter().all(|value| value)).into()
                    }
                    _ => Verdict::Undetermined,
                }
            }

            Constraint::OrReif { result, operands } => {
                let operands = operands
                    .iter()
                    .map(|operand| assignment.bool(*operand))
                    .collect::<Option<Vec<_>>>();
                match (assignment.bool(*result), operands) {
                    (Some(truth), Some(operands)) => {
                        (truth == operands.into_iter().any(|value| value)).into()
                    }
                    _ => Verdict::Undetermined,
                }
            }

            Constraint::Linear(linear) => {
                let mut fixed_sum = 0_i64;
                let mut free_min = 0_i64;
                let mut free_max = 0_i64;
                for &(weight, var) in &linear.terms {
                    let weight = i64::from(weight);
                    match assignment.bool(var) {
                        Some(true) => fixed_sum += weight,
                        Some(false) => {}
                        None => {
                            free_min += weight.min(0);
                            free_max += weight.max(0);
                        }
                    }
                }
                let rhs = i64::from(linear.rhs);
                let (low, high) = (fixed_sum + free_min, fixed_sum + free_max);
                match linear.comparator {
                    Comparator::Equal if low == rhs && high == rhs => Verdict::Satisfied,
                    Comparator::Equal if rhs < low || rhs > high => Verdict::Violated,
                    Comparator::LessOrEqual if high <= rhs => Verdict::Satisfied,
                    Comparator::LessOrEqual if low > rhs => Verdict::Violated,
                    _ => Verdict::Undetermined,
                }
            }
        }
    }

    /// Returns the index of the first constraint the assignment already violates.
    ///
    /// Constraints over unassigned variables are only reported when no completion could
    /// satisfy them.
    pub fn first_conflict(&self, assignment: &Assignment) -> Option<usize> {
        self.constraints
            .iter()
            .position(|constraint| self.evaluate(constraint, assignment) == Verdict::Violated)
    }

    /// Assign every boolean that is functionally defined by a value indicator or a reified
    /// conjunction/disjunction whose inputs are known. Booleans which are already assigned are
    /// left untouched.
    pub fn derive_booleans(&self, assignment: &mut Assignment) {
        loop {
            let mut changed = false;
            for constraint in &self.constraints {
                let derived = match constraint {
                    Constraint::ValueIndicator {
                        indicator,
                        var,
                        value,
                    } => assignment
                        .int(*var)
                        .map(|actual| (*indicator, actual == *value)),
                    Constraint::AndReif { result, operands } => operands
                        .iter()
                        .map(|operand| assignment.bool(*operand))
                        .collect::<Option<Vec<_>>>()
                        .map(|values| (*result, values.into_iter().all(|value| value))),
                    Constraint::OrReif { result, operands } => operands
                        .iter()
                        .map(|operand| assignment.bool(*operand))
                        .collect::<Option<Vec<_>>>()
                        .map(|values| (*result, values.into_iter().any(|value| value))),
                    _ => None,
                };

                if let Some((var, value)) = derived {
                    if assignment.bool(var).is_none() {
                        assignment.set_bool(var, value);
                        changed = true;
                    }
                }
            }

            if !changed {
                break;
            }
        }
    }

    /// Verify that a complete assignment satisfies every constraint of the model.
    pub fn check(&self, assignment: &Assignment) -> Result<(), ModelViolation> {
        for var in self.int_vars() {
            let name = self.int_name(var).to_owned();
            let size = self.domain_size(var);
            match assignment.int(var) {
                None => return Err(ModelViolation::Unassigned { name }),
                Some(value) if value < 0 || value as usize >= size => {
                    return Err(ModelViolation::OutOfDomain { name, value, size })
                }
                Some(_) => {}
            }
        }

        for (index, constraint) in self.constraints.iter().enumerate() {
            match self.evaluate(constraint, assignment) {
                Verdict::Satisfied => {}
                Verdict::Violated => {
                    return Err(ModelViolation::Violated {
                        index,
                        constraint: format!("{constraint:?}"),
                    })
                }
                Verdict::Undetermined => {
                    let name = self
                        .bool_vars()
                        .find(|var| assignment.bool(*var).is_none())
                        .map(|var| self.bool_name(var).to_owned())
                        .unwrap_or_default();
                    return Err(ModelViolation::Unassigned { name });
                }
            }
        }

        Ok(())
    }

    /// The objective value of a complete assignment.
    pub fn objective_value(&self, assignment: &Assignment) -> Option<i64> {
        self.objective.as_ref().map(|objective| {
            objective
                .terms
                .iter()
                .filter(|(_, var)| assignment.bool(*var) == Some(true))
                .map(|&(weight, _)| i64::from(weight))
                .sum()
        })
    }
}
