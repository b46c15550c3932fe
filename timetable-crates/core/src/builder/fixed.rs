use std::collections::BTreeMap;
use std::collections::BTreeSet;

use itertools::Itertools;

use crate::domain::Batch;
use crate::domain::BatchId;
use crate::domain::BuildingId;
use crate::domain::Domain;
use crate::domain::FixedPlacement;
use crate::domain::Session;
use crate::domain::SlotId;
use crate::domain::SubjectId;
use crate::domain::TeacherId;
use crate::ModelBuildError;

/// The sessions a fixed placement covers: both sessions on a double-weight slot.
pub(crate) fn covered_sessions(
    domain: &Domain,
    batch: &Batch,
    placement: &FixedPlacement,
) -> Vec<Session> {
    if batch.is_double_weight(&domain.slots, placement.slot) {
        Session::ALL.to_vec()
    } else {
        vec![placement.session]
    }
}

/// Finds contradictions in the data that no solver run could repair.
///
/// Every fixed placement is immovable, so two of them clashing, a batch that cannot hold its
/// units, or a single-trip subject without any way to group it is reported before the model
/// is handed to a solver.
pub(crate) fn check_fixed_data(domain: &Domain) -> Result<(), ModelBuildError> {
    for batch in &domain.batches {
        let capacity = batch.capacity(&domain.slots);
        let required = batch.required_units();
        if capacity < required {
            return Err(ModelBuildError::InsufficientCapacity {
                batch: batch.id.clone(),
                capacity,
                required,
            });
        }

        for subject in &batch.single_trip_subjects {
            let has_double = batch
                .usable_slots
                .iter()
                .any(|&slot| batch.is_double_weight(&domain.slots, slot));
            if !has_double && batch.adjacent_pairs(&domain.slots).is_empty() {
                return Err(ModelBuildError::NoGroupingOption {
                    batch: batch.id.clone(),
                    subject: subject.clone(),
                });
            }
        }
    }

    let mut slots_taken: BTreeSet<(&BatchId, SlotId)> = BTreeSet::new();
    let mut sessions_taken: BTreeMap<(&BatchId, &SubjectId, Session), SlotId> = BTreeMap::new();
    let mut presence: BTreeMap<(SlotId, TeacherId), Vec<(&BatchId, &BuildingId)>> =
        BTreeMap::new();

    for placement in &domain.fixed_placements {
        let Some(batch) = domain.batch(&placement.batch) else {
            continue;
        };

        if !slots_taken.insert((&batch.id, placement.slot)) {
            return Err(ModelBuildError::SlotFixedTwice {
                batch: batch.id.clone(),
                slot: placement.slot,
            });
        }

        if domain
            .restriction(&batch.id, placement.slot)
            .is_some_and(|allowed| !allowed.contains(&placement.subject))
        {
            return Err(ModelBuildError::RestrictionExcludesFixed {
                batch: batch.id.clone(),
                slot: placement.slot,
                subject: placement.subject.clone(),
            });
        }

        for session in covered_sessions(domain, batch, placement) {
            if let Some(first) =
                sessions_taken.insert((&batch.id, &placement.subject, session), placement.slot)
            {
                return Err(ModelBuildError::SessionFixedTwice {
                    batch: batch.id.clone(),
                    subject: placement.subject.clone(),
                    session,
                    first,
                    second: placement.slot,
                });
            }
        }

        let teachers = if batch.is_double_weight(&domain.slots, placement.slot) {
            domain
                .faculty
                .teachers_of(&batch.id, &placement.subject)
                .into_iter()
                .cloned()
                .collect()
        } else {
            vec![placement.teacher.clone()]
        };
        for teacher in teachers {
            presence
                .entry((placement.slot, teacher))
                .or_default()
                .push((&batch.id, &batch.building));
        }
    }

    for ((slot, teacher), occurrences) in &presence {
        for ((first, first_building), (second, second_building)) in
            occurrences.iter().tuple_combinations()
        {
            if first_building == second_building {
                if !domain.overlap_allowed_within(teacher, *slot, first_building) {
                    return Err(ModelBuildError::FixedTeacherClash {
                        teacher: teacher.clone(),
                        slot: *slot,
                        building: (*first_building).clone(),
                        first: (*first).clone(),
                        second: (*second).clone(),
                    });
                }
            } else if domain.is_travel_conflict(teacher, *slot, first_building, second_building) {
                return Err(ModelBuildError::FixedTravelClash {
                    teacher: teacher.clone(),
                    slot: *slot,
                    first: (*first).clone(),
                    first_building: (*first_building).clone(),
                    second: (*second).clone(),
                    second_building: (*second_building).clone(),
                });
            }
        }
    }

    for span in &domain.day_spans {
        let fixed_at = |slot: SlotId| presence.contains_key(&(slot, span.teacher.clone()));
        if fixed_at(span.early) && fixed_at(span.late) {
            return Err(ModelBuildError::FixedDaySpanClash {
                teacher: span.teacher.clone(),
                early: span.early,
                late: span.late,
            });
        }
    }

    Ok(())
}
