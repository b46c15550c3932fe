//! The adjacency objective.
//!
//! A batch that gets both units of a subject in back-to-back slots saves its teacher a trip.
//! Each such opportunity becomes a reified indicator in a weighted sum, and for single-trip
//! subjects the grouping is required outright.
use std::collections::BTreeMap;

use log::debug;
use log::info;

use crate::builder::AssignmentVars;
use crate::domain::Batch;
use crate::domain::BatchId;
use crate::domain::Domain;
use crate::domain::Session;
use crate::domain::SlotId;
use crate::domain::SubjectId;
use crate::model::Assignment;
use crate::model::BoolVar;
use crate::model::ConstraintBuilder;

/// One weighted opportunity of the objective.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdjacencyTerm {
    pub batch: BatchId,
    pub subject: SubjectId,
    pub slots: (SlotId, SlotId),
    pub weight: u32,
    /// Holds iff the subject is taught in both slots.
    pub indicator: BoolVar,
}

/// The objective "maximise the total weighted adjacency score".
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObjectiveExpression {
    pub terms: Vec<AdjacencyTerm>,
}

impl ObjectiveExpression {
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// The score of a timetable which groups every subject it can.
    pub fn max_score(&self) -> i64 {
        let mut best: BTreeMap<(&BatchId, &SubjectId), u32> = BTreeMap::new();
        for term in &self.terms {
            let entry = best.entry((&term.batch, &term.subject)).or_default();
            *entry = (*entry).max(term.weight);
        }
        best.values().map(|&weight| i64::from(weight)).sum()
    }

    pub fn evaluate(&self, assignment: &Assignment) -> i64 {
        self.terms
            .iter()
            .filter(|term| assignment.bool(term.indicator) == Some(true))
            .map(|term| i64::from(term.weight))
            .sum()
    }
}

/// The objective weight of a batch: higher when its building is far from most others.
pub fn batch_weight(domain: &Domain, batch: &Batch) -> u32 {
    if domain.is_remote(&batch.building) {
        domain.weights.far
    } else {
        domain.weights.near
    }
}

/// Add the adjacency preferences to a model built by [`crate::builder::build_into`].
///
/// Soft terms are installed as the maximisation objective of `builder`. Single-trip subjects
/// instead receive the hard constraint that exactly one adjacent pair or double-weight slot
/// holds them. Fully fixed batches keep their single-trip requirements but add no soft terms.
pub fn add_preferences<B: ConstraintBuilder>(
    builder: &mut B,
    domain: &Domain,
    vars: &AssignmentVars,
) -> ObjectiveExpression {
    let mut objective = ObjectiveExpression::default();
    let mut mandatory = 0_usize;

    for batch in &domain.batches {
        let pairs = batch.adjacent_pairs(&domain.slots);
        let weight = batch_weight(domain, batch);

        for subject in &batch.subjects {
            let single_trip = batch.single_trip_subjects.contains(subject);
            if batch.fully_fixed && !single_trip {
                continue;
            }

            let mut carries: BTreeMap<SlotId, Option<BoolVar>> = BTreeMap::new();
            let mut grouped = Vec::new();

            for &(first, second) in &pairs {
                let first_carry = *carries
                    .entry(first)
                    .or_insert_with(|| carry(builder, vars, batch, subject, first));
                let second_carry = *carries
                    .entry(second)
                    .or_insert_with(|| carry(builder, vars, batch, subject, second));
                let (Some(first_carry), Some(second_carry)) = (first_carry, second_carry) else {
                    continue;
                };

                let same = builder.new_bool_var(format!(
                    "{}:{subject}@{}+{}",
                    batch.id,
                    domain.slots.label(first),
                    domain.slots.label(second)
                ));
                builder.iff_and(same, vec![first_carry, second_carry]);
                grouped.push(AdjacencyTerm {
                    batch: batch.id.clone(),
                    subject: subject.clone(),
                    slots: (first, second),
                    weight,
                    indicator: same,
                });
            }

            if single_trip {
                let mut terms = grouped
                    .iter()
                    .map(|term| (1, term.indicator))
                    .collect::<Vec<_>>();
                terms.extend(vars.doubles_of(&batch.id, subject).map(|double| (1, double)));
                builder.linear_equals(terms, 1);
                mandatory += 1;
            } else {
                objective.terms.extend(grouped);
            }
        }
    }

    if !objective.is_empty() {
        builder.maximise(
            objective
                .terms
                .iter()
                .map(|term| (i32::try_from(term.weight).unwrap_or(i32::MAX), term.indicator))
                .collect(),
        );
    }

    info!(
        "Added {} adjacency preferences (best possible score {}) and {mandatory} single-trip requirements",
        objective.terms.len(),
        objective.max_score()
    );
    objective
}

/// A boolean which holds iff the slot carries either session of the subject.
fn carry<B: ConstraintBuilder>(
    builder: &mut B,
    vars: &AssignmentVars,
    batch: &Batch,
    subject: &SubjectId,
    slot: SlotId,
) -> Option<BoolVar> {
    let sessions = Session::ALL
        .iter()
        .filter_map(|&session| vars.lesson(&batch.id, slot, subject, session))
        .collect::<Vec<_>>();

    match sessions.as_slice() {
        [] => None,
        [single] => Some(*single),
        _ => {
            let carried = builder.new_bool_var(format!("{}@{slot}~{subject}", batch.id));
            builder.iff_or(carried, sessions);
            debug!("Created carry indicator for {subject} at slot {slot} of {}", batch.id);
            Some(carried)
        }
    }
}
