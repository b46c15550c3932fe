//! Compiles a [`Domain`] into a constraint model.
//!
//! Every (batch, usable slot) pair becomes one integer variable whose values enumerate the
//! (subject, session) pairs the slot may hold. Boolean indicators reify each value and carry
//! the cardinality and teacher-conflict constraints. Everything is derived from the immutable
//! domain in one pass, so the order in which constraints are posted carries no meaning.
mod conflicts;
mod fixed;
mod vars;

use log::debug;
use log::info;
pub use vars::AssignmentVars;
pub use vars::SlotValue;
pub use vars::SlotVariable;

use crate::domain::Batch;
use crate::domain::Domain;
use crate::domain::Session;
use crate::domain::SlotId;
use crate::model::ConstraintBuilder;
use crate::model::Model;
use crate::ModelBuildError;
use crate::ScheduleError;

/// Build the hard constraints of the timetabling problem.
///
/// Fails with [`ScheduleError::Config`] when the domain is malformed and with
/// [`ScheduleError::ModelBuild`] when its fixed data contradicts itself.
pub fn build_model(domain: &Domain) -> Result<(Model, AssignmentVars), ScheduleError> {
    let mut model = Model::default();
    let vars = build_into(&mut model, domain)?;
    info!("Built model: {}", model.statistics());
    Ok((model, vars))
}

/// Build the hard constraints into any [`ConstraintBuilder`].
pub fn build_into<B: ConstraintBuilder>(
    builder: &mut B,
    domain: &Domain,
) -> Result<AssignmentVars, ScheduleError> {
    domain.validate()?;
    fixed::check_fixed_data(domain)?;

    let mut vars = AssignmentVars::default();
    for batch in &domain.batches {
        for &slot in &batch.usable_slots {
            create_slot_variable(builder, domain, batch, slot, &mut vars)?;
        }
    }

    post_fixed_placements(builder, domain, &vars)?;

    for batch in &domain.batches {
        post_cardinality(builder, batch, &mut vars)?;
    }

    conflicts::post_teacher_conflicts(builder, domain, &vars);
    conflicts::post_day_spans(builder, domain, &vars);

    debug!(
        "Created {} slot variables, {} lesson indicators and {} double-weight indicators",
        vars.slots.len(),
        vars.lessons.len(),
        vars.doubles.len()
    );

    Ok(vars)
}

/// The values a (batch, slot) variable may take. A double-weight slot only holds double
/// placements; `Unused` is offered only when the batch has more room than it needs.
fn slot_values(domain: &Domain, batch: &Batch, slot: SlotId) -> Vec<SlotValue> {
    let double = batch.is_double_weight(&domain.slots, slot);
    let mut values = Vec::new();

    for subject in domain.admissible_subjects(batch, slot) {
        if double {
            values.push(SlotValue::Double {
                subject: subject.clone(),
            });
        } else {
            values.extend(Session::ALL.map(|session| SlotValue::Lesson {
                subject: subject.clone(),
                session,
            }));
        }
    }

    if batch.has_slack(&domain.slots) {
        values.push(SlotValue::Unused);
    }

    values
}

fn create_slot_variable<B: ConstraintBuilder>(
    builder: &mut B,
    domain: &Domain,
    batch: &Batch,
    slot: SlotId,
    vars: &mut AssignmentVars,
) -> Result<(), ModelBuildError> {
    let values = slot_values(domain, batch, slot);
    if values.is_empty() {
        return Err(ModelBuildError::EmptySlotDomain {
            batch: batch.id.clone(),
            slot,
        });
    }

    let label = domain.slots.label(slot);
    let var = builder.new_int_var(format!("{}@{label}", batch.id), values.len());

    for (index, value) in values.iter().enumerate() {
        let code = i32::try_from(index).unwrap_or(i32::MAX);
        match value {
            SlotValue::Unused => {}
            SlotValue::Lesson { subject, session } => {
                let indicator = builder.new_bool_var(format!(
                    "{}@{label}={subject}/{}",
                    batch.id,
                    session.index()
                ));
                builder.iff_equals(indicator, var, code);
                let _ = vars
                    .lessons
                    .insert((batch.id.clone(), slot, subject.clone(), *session), indicator);
            }
            SlotValue::Double { subject } => {
                let indicator =
                    builder.new_bool_var(format!("{}@{label}={subject}/2x", batch.id));
                builder.iff_equals(indicator, var, code);
                let _ = vars
                    .doubles
                    .insert((batch.id.clone(), slot, subject.clone()), indicator);
            }
        }
    }

    let _ = vars
        .slots
        .insert((batch.id.clone(), slot), SlotVariable { var, values });
    Ok(())
}

fn post_fixed_placements<B: ConstraintBuilder>(
    builder: &mut B,
    domain: &Domain,
    vars: &AssignmentVars,
) -> Result<(), ModelBuildError> {
    for placement in &domain.fixed_placements {
        let Some(batch) = domain.batch(&placement.batch) else {
            continue;
        };
        let value = if batch.is_double_weight(&domain.slots, placement.slot) {
            SlotValue::Double {
                subject: placement.subject.clone(),
            }
        } else {
            SlotValue::Lesson {
                subject: placement.subject.clone(),
                session: placement.session,
            }
        };

        let code = vars
            .slot(&batch.id, placement.slot)
            .and_then(|variable| variable.value_of(&value).map(|code| (variable.var, code)));
        let Some((var, code)) = code else {
            return Err(ModelBuildError::RestrictionExcludesFixed {
                batch: batch.id.clone(),
                slot: placement.slot,
                subject: placement.subject.clone(),
            });
        };
        builder.fix(var, code);
    }
    Ok(())
}

/// Each session of each subject is placed exactly once. When the batch has double-weight
/// slots, placing the subject in one of them covers both sessions instead.
fn post_cardinality<B: ConstraintBuilder>(
    builder: &mut B,
    batch: &Batch,
    vars: &mut AssignmentVars,
) -> Result<(), ModelBuildError> {
    for subject in &batch.subjects {
        let doubles = vars.doubles_of(&batch.id, subject).collect::<Vec<_>>();

        let carried = if doubles.is_empty() {
            None
        } else {
            let carried = builder.new_bool_var(format!("{}:{subject}/2x", batch.id));
            builder.iff_or(carried, doubles.clone());
            builder.at_most_one(doubles);
            let _ = vars
                .carried
                .insert((batch.id.clone(), subject.clone()), carried);
            Some(carried)
        };

        for session in Session::ALL {
            let mut terms = vars
                .lessons_of(&batch.id, subject, session)
                .map(|indicator| (1, indicator))
                .collect::<Vec<_>>();
            if let Some(carried) = carried {
                terms.push((1, carried));
            }

            if terms.is_empty() {
                return Err(ModelBuildError::NoSlotForSession {
                    batch: batch.id.clone(),
                    subject: subject.clone(),
                    session,
                });
            }
            builder.linear_equals(terms, 1);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BuildingId;
    use crate::domain::FixedPlacement;
    use crate::domain::SlotGrid;
    use crate::domain::SlotKind;
    use crate::domain::SlotRestriction;
    use crate::domain::SubjectId;
    use crate::domain::TeacherDaySpan;
    use crate::domain::TimeSlot;
    use crate::model::Assignment;
    use crate::ConfigError;

    fn two_building_domain() -> Domain {
        let mut domain = Domain::new(SlotGrid::new(
            ["S1", "S2", "S3", "S4"]
                .map(|label| TimeSlot::new(label, SlotKind::Working))
                .to_vec(),
        ));
        domain.buildings = vec![BuildingId::from("B1"), BuildingId::from("B2")];
        domain.travel.set("B1".into(), "B2".into(), 1);
        domain.subjects = vec!["MATHS".into(), "PHYSICS".into()];
        domain.batches = vec![
            Batch::new(
                "A",
                "B1",
                (0..4).map(SlotId),
                ["MATHS", "PHYSICS"].map(SubjectId::from),
            ),
            Batch::new("B", "B2", (0..4).map(SlotId), ["MATHS"].map(SubjectId::from)),
        ];
        domain
            .faculty
            .assign_both(&"A".into(), &"MATHS".into(), &"T1".into());
        domain
            .faculty
            .assign_both(&"A".into(), &"PHYSICS".into(), &"T2".into());
        domain
            .faculty
            .assign_both(&"B".into(), &"MATHS".into(), &"T1".into());
        domain
    }

    /// Assign each listed (batch, slot) its value and leave every other slot unused.
    fn assignment_for(
        model: &Model,
        vars: &AssignmentVars,
        placements: &[(&str, usize, SlotValue)],
    ) -> Assignment {
        let mut assignment = Assignment::empty(model);
        for (batch, slot, variable) in vars.iter_slots() {
            let value = placements
                .iter()
                .find(|(b, s, _)| *b == batch.as_str() && SlotId(*s) == slot)
                .map(|(_, _, value)| value.clone())
                .unwrap_or(SlotValue::Unused);
            let code = variable
                .value_of(&value)
                .unwrap_or_else(|| panic!("{value} is not a value of {batch}@{slot}"));
            assignment.set_int(variable.var, code);
        }
        model.derive_booleans(&mut assignment);
        assignment
    }

    fn lesson(subject: &str, session: Session) -> SlotValue {
        SlotValue::Lesson {
            subject: subject.into(),
            session,
        }
    }

    #[test]
    fn unused_is_only_offered_with_slack() {
        let domain = two_building_domain();
        let (_, vars) = build_model(&domain).expect("valid model");

        let a = vars.slot(&"A".into(), SlotId(0)).expect("slot variable");
        assert_eq!(a.values.len(), 4);
        assert!(!a.values.contains(&SlotValue::Unused));

        let b = vars.slot(&"B".into(), SlotId(0)).expect("slot variable");
        assert_eq!(b.values.len(), 3);
        assert!(b.values.contains(&SlotValue::Unused));
    }

    #[test]
    fn shared_teacher_cannot_be_in_two_distant_buildings() {
        let domain = two_building_domain();
        let (model, vars) = build_model(&domain).expect("valid model");

        let clash = assignment_for(
            &model,
            &vars,
            &[
                ("A", 0, lesson("MATHS", Session::First)),
                ("A", 1, lesson("MATHS", Session::Second)),
                ("A", 2, lesson("PHYSICS", Session::First)),
                ("A", 3, lesson("PHYSICS", Session::Second)),
                ("B", 0, lesson("MATHS", Session::First)),
                ("B", 2, lesson("MATHS", Session::Second)),
            ],
        );
        assert!(model.check(&clash).is_err());

        let apart = assignment_for(
            &model,
            &vars,
            &[
                ("A", 0, lesson("MATHS", Session::First)),
                ("A", 1, lesson("MATHS", Session::Second)),
                ("A", 2, lesson("PHYSICS", Session::First)),
                ("A", 3, lesson("PHYSICS", Session::Second)),
                ("B", 2, lesson("MATHS", Session::First)),
                ("B", 3, lesson("MATHS", Session::Second)),
            ],
        );
        assert_eq!(model.check(&apart), Ok(()));
    }

    #[test]
    fn every_session_is_placed_exactly_once() {
        let domain = two_building_domain();
        let (model, vars) = build_model(&domain).expect("valid model");

        let missing_session = assignment_for(
            &model,
            &vars,
            &[
                ("A", 0, lesson("MATHS", Session::First)),
                ("A", 1, lesson("MATHS", Session::First)),
                ("A", 2, lesson("PHYSICS", Session::First)),
                ("A", 3, lesson("PHYSICS", Session::Second)),
                ("B", 2, lesson("MATHS", Session::First)),
                ("B", 3, lesson("MATHS", Session::Second)),
            ],
        );
        assert!(model.check(&missing_session).is_err());
    }

    #[test]
    fn travel_free_buildings_may_share_a_teacher() {
        let mut domain = two_building_domain();
        domain.travel.set("B1".into(), "B2".into(), 0);
        let (model, vars) = build_model(&domain).expect("valid model");

        let shared = assignment_for(
            &model,
            &vars,
            &[
                ("A", 0, lesson("MATHS", Session::First)),
                ("A", 1, lesson("MATHS", Session::Second)),
                ("A", 2, lesson("PHYSICS", Session::First)),
                ("A", 3, lesson("PHYSICS", Session::Second)),
                ("B", 0, lesson("MATHS", Session::First)),
                ("B", 1, lesson("MATHS", Session::Second)),
            ],
        );
        assert_eq!(model.check(&shared), Ok(()));
    }

    #[test]
    fn allowed_overlaps_lift_the_building_rule() {
        let mut domain = two_building_domain();
        domain.batches[1].building = "B1".into();
        let (model, vars) = build_model(&domain).expect("valid model");
        let placements = [
            ("A", 0, lesson("MATHS", Session::First)),
            ("A", 1, lesson("MATHS", Session::Second)),
            ("A", 2, lesson("PHYSICS", Session::First)),
            ("A", 3, lesson("PHYSICS", Session::Second)),
            ("B", 0, lesson("MATHS", Session::First)),
            ("B", 3, lesson("MATHS", Session::Second)),
        ];
        assert!(model
            .check(&assignment_for(&model, &vars, &placements))
            .is_err());

        domain.allowed_overlaps.push(crate::domain::AllowedOverlap {
            teacher: "T1".into(),
            slot: SlotId(0),
            buildings: [BuildingId::from("B1")].into_iter().collect(),
        });
        let (model, vars) = build_model(&domain).expect("valid model");
        assert_eq!(
            model.check(&assignment_for(&model, &vars, &placements)),
            Ok(())
        );
    }

    #[test]
    fn double_weight_slots_cover_both_sessions() {
        let mut domain = two_building_domain();
        domain.batches.truncate(1);
        domain.batches[0].usable_slots = vec![SlotId(0), SlotId(1), SlotId(2)];
        let _ = domain.batches[0].double_weight_slots.insert(SlotId(2));
        let (model, vars) = build_model(&domain).expect("valid model");

        let double = SlotValue::Double {
            subject: "PHYSICS".into(),
        };
        let assignment = assignment_for(
            &model,
            &vars,
            &[
                ("A", 0, lesson("MATHS", Session::Second)),
                ("A", 1, lesson("MATHS", Session::First)),
                ("A", 2, double),
            ],
        );
        assert_eq!(model.check(&assignment), Ok(()));
        assert!(vars.carried(&"A".into(), &"PHYSICS".into()).is_some());
    }

    #[test]
    fn fixed_placements_become_unary_constraints() {
        let mut domain = two_building_domain();
        domain.fixed_placements.push(FixedPlacement {
            batch: "A".into(),
            slot: SlotId(3),
            subject: "PHYSICS".into(),
            teacher: "T2".into(),
            session: Session::Second,
        });
        let (model, vars) = build_model(&domain).expect("valid model");

        let moved = assignment_for(
            &model,
            &vars,
            &[
                ("A", 0, lesson("MATHS", Session::First)),
                ("A", 1, lesson("MATHS", Session::Second)),
                ("A", 3, lesson("PHYSICS", Session::First)),
                ("A", 2, lesson("PHYSICS", Session::Second)),
                ("B", 2, lesson("MATHS", Session::First)),
                ("B", 3, lesson("MATHS", Session::Second)),
            ],
        );
        assert!(model.check(&moved).is_err());
        assert_eq!(model.statistics().fixes, 1);
    }

    #[test]
    fn missing_faculty_fails_before_building() {
        let mut domain = two_building_domain();
        domain.batches[1].subjects.push("PHYSICS".into());

        assert!(matches!(
            build_model(&domain),
            Err(ScheduleError::Config(
                ConfigError::MissingFacultyAssignment { .. }
            ))
        ));
    }

    #[test]
    fn contradicting_fixed_placements_are_model_build_errors() {
        let mut domain = two_building_domain();
        for batch in ["A", "B"] {
            domain.fixed_placements.push(FixedPlacement {
                batch: batch.into(),
                slot: SlotId(1),
                subject: "MATHS".into(),
                teacher: "T1".into(),
                session: Session::First,
            });
        }

        assert!(matches!(
            build_model(&domain),
            Err(ScheduleError::ModelBuild(
                ModelBuildError::FixedTravelClash { .. }
            ))
        ));
    }

    #[test]
    fn insufficient_capacity_is_a_model_build_error() {
        let mut domain = two_building_domain();
        domain.batches[0].usable_slots = vec![SlotId(0), SlotId(1), SlotId(2)];

        assert!(matches!(
            build_model(&domain),
            Err(ScheduleError::ModelBuild(
                ModelBuildError::InsufficientCapacity {
                    capacity: 3,
                    required: 4,
                    ..
                }
            ))
        ));
    }

    #[test]
    fn slot_restrictions_narrow_the_domain() {
        let mut domain = two_building_domain();
        domain.slot_restrictions.push(SlotRestriction {
            batch: "B".into(),
            slot: SlotId(0),
            subjects: Default::default(),
        });
        let (_, vars) = build_model(&domain).expect("valid model");

        assert_eq!(
            vars.slot(&"B".into(), SlotId(0)).expect("slot").values,
            vec![SlotValue::Unused]
        );
    }

    #[test]
    fn day_spans_keep_a_teacher_out_of_the_late_slot() {
        let mut domain = two_building_domain();
        domain.day_spans.push(TeacherDaySpan {
            teacher: "T2".into(),
            early: SlotId(0),
            late: SlotId(3),
        });
        let (model, vars) = build_model(&domain).expect("valid model");

        let spanning = assignment_for(
            &model,
            &vars,
            &[
                ("A", 0, lesson("PHYSICS", Session::First)),
                ("A", 1, lesson("MATHS", Session::First)),
                ("A", 2, lesson("MATHS", Session::Second)),
                ("A", 3, lesson("PHYSICS", Session::Second)),
                ("B", 0, lesson("MATHS", Session::First)),
                ("B", 3, lesson("MATHS", Session::Second)),
            ],
        );
        assert!(model.check(&spanning).is_err());

        let early_only = assignment_for(
            &model,
            &vars,
            &[
                ("A", 0, lesson("PHYSICS", Session::First)),
                ("A", 1, lesson("PHYSICS", Session::Second)),
                ("A", 2, lesson("MATHS", Session::First)),
                ("A", 3, lesson("MATHS", Session::Second)),
                ("B", 0, lesson("MATHS", Session::First)),
                ("B", 1, lesson("MATHS", Session::Second)),
            ],
        );
        assert_eq!(model.check(&early_only), Ok(()));
    }

    #[test]
    fn fixed_placements_across_a_day_span_are_rejected() {
        let mut domain = two_building_domain();
        domain.day_spans.push(TeacherDaySpan {
            teacher: "T2".into(),
            early: SlotId(0),
            late: SlotId(3),
        });
        for (slot, session) in [(0, Session::First), (3, Session::Second)] {
            domain.fixed_placements.push(FixedPlacement {
                batch: "A".into(),
                slot: SlotId(slot),
                subject: "PHYSICS".into(),
                teacher: "T2".into(),
                session,
            });
        }

        assert!(matches!(
            build_model(&domain),
            Err(ScheduleError::ModelBuild(
                ModelBuildError::FixedDaySpanClash {
                    early: SlotId(0),
                    late: SlotId(3),
                    ..
                }
            ))
        ));
    }

    #[test]
    fn restrictions_must_admit_fixed_placements() {
        let mut domain = two_building_domain();
        domain.slot_restrictions.push(SlotRestriction {
            batch: "A".into(),
            slot: SlotId(0),
            subjects: [SubjectId::from("MATHS")].into_iter().collect(),
        });
        domain.fixed_placements.push(FixedPlacement {
            batch: "A".into(),
            slot: SlotId(0),
            subject: "PHYSICS".into(),
            teacher: "T2".into(),
            session: Session::First,
        });

        assert!(matches!(
            build_model(&domain),
            Err(ScheduleError::ModelBuild(
                ModelBuildError::RestrictionExcludesFixed {
                    slot: SlotId(0),
                    ..
                }
            ))
        ));
    }
}
