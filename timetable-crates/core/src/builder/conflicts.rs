use std::collections::BTreeMap;

use itertools::Itertools;
use log::debug;

use super::AssignmentVars;
use crate::domain::BuildingId;
use crate::domain::Domain;
use crate::domain::Session;
use crate::domain::SlotId;
use crate::domain::TeacherId;
use crate::model::BoolVar;
use crate::model::ConstraintBuilder;

/// The indicators that put a teacher in a building at one slot.
type Occupancy<'a> = BTreeMap<&'a TeacherId, BTreeMap<&'a BuildingId, Vec<BoolVar>>>;

/// Groups every indicator of a slot by the teacher it brings into the classroom, then by the
/// building of the batch. A double-weight placement occupies the teachers of both sessions.
fn occupancy_at<'a>(domain: &'a Domain, vars: &AssignmentVars, slot: SlotId) -> Occupancy<'a> {
    let mut occupancy: Occupancy<'a> = BTreeMap::new();

    for batch in &domain.batches {
        for subject in &batch.subjects {
            for session in Session::ALL {
                let Some(indicator) = vars.lesson(&batch.id, slot, subject, session) else {
                    continue;
                };
                if let Some(teacher) = domain.faculty.teacher(&batch.id, subject, session) {
                    occupancy
                        .entry(teacher)
                        .or_default()
                        .entry(&batch.building)
                        .or_default()
                        .push(indicator);
                }
            }

            if let Some(indicator) = vars.double(&batch.id, slot, subject) {
                for teacher in domain.faculty.teachers_of(&batch.id, subject) {
                    occupancy
                        .entry(teacher)
                        .or_default()
                        .entry(&batch.building)
                        .or_default()
                        .push(indicator);
                }
            }
        }
    }

    occupancy
}

/// A literal that holds iff the teacher is in the building; the single indicator itself when
/// there is only one.
fn presence<B: ConstraintBuilder>(
    builder: &mut B,
    name: String,
    indicators: &[BoolVar],
) -> BoolVar {
    if let [single] = indicators {
        return *single;
    }
    let present = builder.new_bool_var(name);
    builder.iff_or(present, indicators.to_vec());
    present
}

/// Posts the teacher exclusivity rules: at most one batch per building, and never two
/// buildings which are a trip apart, unless an allowed overlap lifts the rule.
pub(crate) fn post_teacher_conflicts<B: ConstraintBuilder>(
    builder: &mut B,
    domain: &Domain,
    vars: &AssignmentVars,
) {
    let mut within = 0_usize;
    let mut across = 0_usize;

    for (slot, _) in domain.slots.iter() {
        let occupancy = occupancy_at(domain, vars, slot);

        for (teacher, buildings) in &occupancy {
            for (building, indicators) in buildings {
                if indicators.len() > 1
                    && !domain.overlap_allowed_within(teacher, slot, building)
                {
                    builder.at_most_one(indicators.clone());
                    within += 1;
                }
            }

            let mut present: BTreeMap<&BuildingId, BoolVar> = BTreeMap::new();
            for ((first, first_indicators), (second, second_indicators)) in
                buildings.iter().tuple_combinations()
            {
                if !domain.is_travel_conflict(teacher, slot, first, second) {
                    continue;
                }
                let first_present = *present.entry(first).or_insert_with(|| {
                    presence(
                        builder,
                        format!("{teacher}@{first}@{slot}"),
                        first_indicators,
                    )
                });
                let second_present = *present.entry(second).or_insert_with(|| {
                    presence(
                        builder,
                        format!("{teacher}@{second}@{slot}"),
                        second_indicators,
                    )
                });
                builder.at_most_one(vec![first_present, second_present]);
                across += 1;
            }
        }
    }

    debug!("Posted {within} building exclusivity and {across} travel exclusivity constraints");
}

/// Posts the day-span limits: a teacher teaching in the early slot stays away from the late one.
pub(crate) fn post_day_spans<B: ConstraintBuilder>(
    builder: &mut B,
    domain: &Domain,
    vars: &AssignmentVars,
) {
    for span in &domain.day_spans {
        let indicators_at = |slot: SlotId| -> Vec<BoolVar> {
            occupancy_at(domain, vars, slot)
                .remove(&span.teacher)
                .map(|buildings| buildings.into_values().flatten().collect())
                .unwrap_or_default()
        };
        let early = indicators_at(span.early);
        let late = indicators_at(span.late);
        if early.is_empty() || late.is_empty() {
            continue;
        }

        let teaches_early = presence(
            builder,
            format!("{}@{}", span.teacher, span.early),
            &early,
        );
        let teaches_late = presence(builder, format!("{}@{}", span.teacher, span.late), &late);
        builder.implies(teaches_early.positive(), teaches_late.negative());
    }
}
