use std::io::Write;

use itertools::Itertools;

use crate::model::BoolVar;
use crate::model::Comparator;
use crate::model::Constraint;
use crate::model::IntVar;
use crate::model::Literal;
use crate::model::Model;

pub(crate) const OBJECTIVE: &str = "objective";

pub(crate) fn int_name(var: IntVar) -> String {
    format!("x_{}", var.index())
}

pub(crate) fn bool_name(var: BoolVar) -> String {
    format!("b_{}", var.index())
}

fn bool_array(vars: impl IntoIterator<Item = BoolVar>) -> String {
    format!("[{}]", vars.into_iter().map(bool_name).join(", "))
}

fn weights(weights: impl IntoIterator<Item = i32>) -> String {
    format!("[{}]", weights.into_iter().join(", "))
}

/// Write `model` as a FlatZinc instance, one statement per line.
///
/// Integer variables are named `x_<index>` and boolean variables `b_<index>`; only the integer
/// variables and the objective are marked for output. The human-readable names of the model
/// appear as comments.
pub fn write_flatzinc(model: &Model, writer: &mut impl Write) -> std::io::Result<()> {
    writeln!(writer, "% {}", model.statistics())?;

    for var in model.int_vars() {
        let upper_bound = model.domain_size(var).saturating_sub(1);
        writeln!(writer, "% {} = {}", int_name(var), model.int_name(var))?;
        writeln!(
            writer,
            "var 0..{upper_bound}: {} :: output_var;",
            int_name(var)
        )?;
    }

    for var in model.bool_vars() {
        writeln!(writer, "% {} = {}", bool_name(var), model.bool_name(var))?;
        writeln!(writer, "var bool: {};", bool_name(var))?;
    }

    if let Some(objective) = model.objective() {
        writeln!(
            writer,
            "var {}..{}: {OBJECTIVE} :: output_var;",
            objective.lower_bound(),
            objective.upper_bound()
        )?;
    }

    for constraint in model.constraints() {
        writeln!(writer, "constraint {};", constraint_call(constraint))?;
    }

    match model.objective() {
        Some(objective) => {
            writeln!(
                writer,
                "constraint bool_lin_eq({}, {}, {OBJECTIVE});",
                weights(objective.terms.iter().map(|&(weight, _)| weight)),
                bool_array(objective.terms.iter().map(|&(_, var)| var))
            )?;
            writeln!(writer, "solve maximize {OBJECTIVE};")?;
        }
        None => writeln!(writer, "solve satisfy;")?,
    }

    Ok(())
}

fn constraint_call(constraint: &Constraint) -> String {
    match constraint {
        Constraint::Fix { var, value } => format!("int_eq({}, {value})", int_name(*var)),
        Constraint::ValueIndicator {
            indicator,
            var,
            value,
        } => format!(
            "int_eq_reif({}, {value}, {})",
            int_name(*var),
            bool_name(*indicator)
        ),
        Constraint::Clause(literals) => {
            let (positive, negative): (Vec<&Literal>, Vec<&Literal>) =
                literals.iter().partition(|literal| literal.positive);
            format!(
                "bool_clause({}, {})",
                bool_array(positive.into_iter().map(|literal| literal.var)),
                bool_array(negative.into_iter().map(|literal| literal.var))
            )
        }
        Constraint::AndReif { result, operands } => format!(
            "array_bool_and({}, {})",
            bool_array(operands.iter().copied()),
            bool_name(*result)
        ),
        Constraint::OrReif { result, operands } => format!(
            "array_bool_or({}, {})",
            bool_array(operands.iter().copied()),
            bool_name(*result)
        ),
        Constraint::Linear(linear) => {
            let predicate = match linear.comparator {
                Comparator::Equal => "bool_lin_eq",
                Comparator::LessOrEqual => "bool_lin_le",
            };
            format!(
                "{predicate}({}, {}, {})",
                weights(linear.terms.iter().map(|&(weight, _)| weight)),
                bool_array(linear.terms.iter().map(|&(_, var)| var)),
                linear.rhs
            )
        }
    }
}
