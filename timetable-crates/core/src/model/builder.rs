use super::BoolVar;
use super::Comparator;
use super::Constraint;
use super::IntVar;
use super::IntVarInfo;
use super::LinearConstraint;
use super::Literal;
use super::Model;
use super::Objective;

/// The modelling capabilities the scheduling code relies on.
///
/// Anything that can create finite-domain variables, reify value tests and conjunctions, post
/// cardinality constraints and hold a linear objective can host a timetabling model.
pub trait ConstraintBuilder {
    /// Create an integer variable with the domain `0..size`.
    fn new_int_var(&mut self, name: String, size: usize) -> IntVar;

    fn new_bool_var(&mut self, name: String) -> BoolVar;

    /// Post `var = value`.
    fn fix(&mut self, var: IntVar, value: i32);

    /// Post `indicator ⇔ var = value`.
    fn iff_equals(&mut self, indicator: BoolVar, var: IntVar, value: i32);

    /// Post that at least one of `literals` holds.
    fn clause(&mut self, literals: Vec<Literal>);

    /// Post `result ⇔ ∧ operands`.
    fn iff_and(&mut self, result: BoolVar, operands: Vec<BoolVar>);

    /// Post `result ⇔ ∨ operands`.
    fn iff_or(&mut self, result: BoolVar, operands: Vec<BoolVar>);

    fn linear_equals(&mut self, terms: Vec<(i32, BoolVar)>, rhs: i32);

    fn linear_less_or_equal(&mut self, terms: Vec<(i32, BoolVar)>, rhs: i32);

    /// Set the objective to maximising `Σ weight·var`, replacing any previous objective.
    fn maximise(&mut self, terms: Vec<(i32, BoolVar)>);

    /// Post `premise ⇒ conclusion`.
    fn implies(&mut self, premise: Literal, conclusion: Literal) {
        self.clause(vec![!premise, conclusion]);
    }

    fn at_most_one(&mut self, vars: Vec<BoolVar>) {
        if vars.len() > 1 {
            self.linear_less_or_equal(vars.into_iter().map(|var| (1, var)).collect(), 1);
        }
    }

    fn exactly_one(&mut self, vars: Vec<BoolVar>) {
        self.linear_equals(vars.into_iter().map(|var| (1, var)).collect(), 1);
    }
}

impl Model {
    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }
}

impl ConstraintBuilder for Model {
    fn new_int_var(&mut self, name: String, size: usize) -> IntVar {
        self.int_vars.push(IntVarInfo { name, size });
        IntVar(self.int_vars.len() - 1)
    }

    fn new_bool_var(&mut self, name: String) -> BoolVar {
        self.bool_vars.push(name);
        BoolVar(self.bool_vars.len() - 1)
    }

    fn fix(&mut self, var: IntVar, value: i32) {
        self.add_constraint(Constraint::Fix { var, value });
    }

    fn iff_equals(&mut self, indicator: BoolVar, var: IntVar, value: i32) {
        self.add_constraint(Constraint::ValueIndicator {
            indicator,
            var,
            value,
        });
    }

    fn clause(&mut self, literals: Vec<Literal>) {
        self.add_constraint(Constraint::Clause(literals));
    }

    fn iff_and(&mut self, result: BoolVar, operands: Vec<BoolVar>) {
        self.add_constraint(Constraint::AndReif { result, operands });
    }

    fn iff_or(&mut self, result: BoolVar, operands: Vec<BoolVar>) {
        self.add_constraint(Constraint::OrReif { result, operands });
    }

    fn linear_equals(&mut self, terms: Vec<(i32, BoolVar)>, rhs: i32) {
        self.add_constraint(Constraint::Linear(LinearConstraint {
            terms,
            comparator: Comparator::Equal,
            rhs,
        }));
    }

    fn linear_less_or_equal(&mut self, terms: Vec<(i32, BoolVar)>, rhs: i32) {
        self.add_constraint(Constraint::Linear(LinearConstraint {
            terms,
            comparator: Comparator::LessOrEqual,
            rhs,
        }));
    }

    fn maximise(&mut self, terms: Vec<(i32, BoolVar)>) {
        self.objective = Some(Objective { terms });
    }
}
