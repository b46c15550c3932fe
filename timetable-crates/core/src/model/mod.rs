//! A declarative, backend-neutral constraint model.
//!
//! The scheduling code never talks to a concrete solver. It describes variables and constraints
//! through the [`ConstraintBuilder`] trait, which [`Model`] implements by recording them. A
//! [`crate::backend::SolverBackend`] later translates the recorded model for an actual solver.
mod builder;
mod check;

use std::fmt::Display;
use std::fmt::Formatter;
use std::ops::Not;

pub use builder::ConstraintBuilder;
pub use check::ModelViolation;
pub use check::Verdict;

/// An integer variable with the dense domain `0..size`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IntVar(pub(crate) usize);

impl IntVar {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BoolVar(pub(crate) usize);

impl BoolVar {
    pub fn index(self) -> usize {
        self.0
    }

    pub fn positive(self) -> Literal {
        Literal {
            var: self,
            positive: true,
        }
    }

    pub fn negative(self) -> Literal {
        Literal {
            var: self,
            positive: false,
        }
    }
}

/// A boolean variable or its negation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Literal {
    pub var: BoolVar,
    pub positive: bool,
}

impl Not for Literal {
    type Output = Literal;

    fn not(self) -> Self::Output {
        Literal {
            var: self.var,
            positive: !self.positive,
        }
    }
}

impl From<BoolVar> for Literal {
    fn from(value: BoolVar) -> Self {
        value.positive()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparator {
    Equal,
    LessOrEqual,
}

/// `Σ weight·var <comparator> rhs` over boolean variables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinearConstraint {
    pub terms: Vec<(i32, BoolVar)>,
    pub comparator: Comparator,
    pub rhs: i32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Constraint {
    /// `var = value`.
    Fix { var: IntVar, value: i32 },
    /// `indicator ⇔ var = value`.
    ValueIndicator {
        indicator: BoolVar,
        var: IntVar,
        value: i32,
    },
    /// At least one of the literals is true.
    Clause(Vec<Literal>),
    /// `result ⇔ ∧ operands`.
    AndReif {
        result: BoolVar,
        operands: Vec<BoolVar>,
    },
    /// `result ⇔ ∨ operands`.
    OrReif {
        result: BoolVar,
        operands: Vec<BoolVar>,
    },
    Linear(LinearConstraint),
}

/// Maximise `Σ weight·var`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Objective {
    pub terms: Vec<(i32, BoolVar)>,
}

impl Objective {
    pub fn lower_bound(&self) -> i64 {
        self.terms
            .iter()
            .map(|&(weight, _)| i64::from(weight.min(0)))
            .sum()
    }

    pub fn upper_bound(&self) -> i64 {
        self.terms
            .iter()
            .map(|&(weight, _)| i64::from(weight.max(0)))
            .sum()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct IntVarInfo {
    name: String,
    size: usize,
}

/// The recorded variables, constraints and objective of a problem.
#[derive(Clone, Debug, Default)]
pub struct Model {
    int_vars: Vec<IntVarInfo>,
    bool_vars: Vec<String>,
    constraints: Vec<Constraint>,
    objective: Option<Objective>,
}

impl Model {
    pub fn num_int_vars(&self) -> usize {
        self.int_vars.len()
    }

    pub fn num_bool_vars(&self) -> usize {
        self.bool_vars.len()
    }

    pub fn int_vars(&self) -> impl Iterator<Item = IntVar> {
        (0..self.int_vars.len()).map(IntVar)
    }

    pub fn bool_vars(&self) -> impl Iterator<Item = BoolVar> {
        (0..self.bool_vars.len()).map(BoolVar)
    }

    /// The number of values in the domain of `var`.
    pub fn domain_size(&self, var: IntVar) -> usize {
        self.int_vars[var.0].size
    }

    pub fn int_name(&self, var: IntVar) -> &str {
        &self.int_vars[var.0].name
    }

    pub fn bool_name(&self, var: BoolVar) -> &str {
        &self.bool_vars[var.0]
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn objective(&self) -> Option<&Objective> {
        self.objective.as_ref()
    }

    pub fn statistics(&self) -> ModelStatistics {
        let mut statistics = ModelStatistics {
            int_vars: self.int_vars.len(),
            bool_vars: self.bool_vars.len(),
            objective_terms: self.objective.as_ref().map_or(0, |objective| objective.terms.len()),
            ..ModelStatistics::default()
        };
        for constraint in &self.constraints {
            match constraint {
                Constraint::Fix { .. } => statistics.fixes += 1,
                Constraint::ValueIndicator { .. } => statistics.indicators += 1,
                Constraint::Clause(_) => statistics.clauses += 1,
                Constraint::AndReif { .. } | Constraint::OrReif { .. } => {
                    statistics.reifications += 1
                }
                Constraint::Linear(_) => statistics.linear += 1,
            }
        }
        statistics
    }
}

/// Counts of the model's variables and constraints, per kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ModelStatistics {
    pub int_vars: usize,
    pub bool_vars: usize,
    pub fixes: usize,
    pub indicators: usize,
    pub clauses: usize,
    pub reifications: usize,
    pub linear: usize,
    pub objective_terms: usize,
}

impl ModelStatistics {
    pub fn constraints(&self) -> usize {
        self.fixes + self.indicators + self.clauses + self.reifications + self.linear
    }
}

impl Display for ModelStatistics {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} int vars, {} bool vars, {} constraints ({} fixed, {} indicators, {} clauses, {} reified, {} linear), {} objective terms",
            self.int_vars,
            self.bool_vars,
            self.constraints(),
            self.fixes,
            self.indicators,
            self.clauses,
            self.reifications,
            self.linear,
            self.objective_terms
        )
    }
}

/// Values for (some of) the variables of a [`Model`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Assignment {
    ints: Vec<Option<i32>>,
    bools: Vec<Option<bool>>,
}

impl Assignment {
    /// An assignment for `model` in which no variable has a value yet.
    pub fn empty(model: &Model) -> Self {
        Assignment {
            ints: vec![None; model.num_int_vars()],
            bools: vec![None; model.num_bool_vars()],
        }
    }

    pub fn set_int(&mut self, var: IntVar, value: i32) {
        if self.ints.len() <= var.0 {
            self.ints.resize(var.0 + 1, None);
        }
        self.ints[var.0] = Some(value);
    }

    pub fn set_bool(&mut self, var: BoolVar, value: bool) {
        if self.bools.len() <= var.0 {
            self.bools.resize(var.0 + 1, None);
        }
        self.bools[var.0] = Some(value);
    }

    pub fn unset_int(&mut self, var: IntVar) {
        if let Some(value) = self.ints.get_mut(var.0) {
            *value = None;
        }
    }

    pub fn clear_bools(&mut self) {
        self.bools.iter_mut().for_each(|value| *value = None);
    }

    pub fn int(&self, var: IntVar) -> Option<i32> {
        self.ints.get(var.0).copied().flatten()
    }

    pub fn bool(&self, var: BoolVar) -> Option<bool> {
        self.bools.get(var.0).copied().flatten()
    }

    pub fn literal(&self, literal: Literal) -> Option<bool> {
        self.bool(literal.var)
            .map(|value| value == literal.positive)
    }
}
