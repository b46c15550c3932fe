//! Turns a solver result into a [`Timetable`] and re-checks it independently of the model.
mod timetable;
mod validation;

use log::info;
use log::warn;
pub use timetable::Cell;
pub use timetable::Lesson;
pub use timetable::Occupancy;
pub use timetable::Timetable;
pub use validation::validate;
pub use validation::Invariant;
pub use validation::InvariantCheck;
pub use validation::ValidationReport;
pub use validation::Violation;

use crate::backend::SolveOptions;
use crate::backend::SolveResponse;
use crate::backend::SolveStatus;
use crate::builder::AssignmentVars;
use crate::builder::SlotValue;
use crate::domain::BatchId;
use crate::domain::Domain;
use crate::domain::Session;
use crate::domain::SlotKind;
use crate::model::Assignment;
use crate::BackendError;
use crate::ScheduleError;
use crate::ValidationFailure;

/// Materialise the timetable described by a solved assignment.
///
/// Teachers are resolved through the faculty table; slots a batch cannot use are marked as
/// lunch or blocked.
pub fn decode(
    domain: &Domain,
    vars: &AssignmentVars,
    assignment: &Assignment,
) -> Result<Timetable, BackendError> {
    let mut timetable = Timetable::default();

    for batch in &domain.batches {
        for (slot, time_slot) in domain.slots.iter() {
            let cell = match vars.slot(&batch.id, slot) {
                Some(variable) => {
                    let name = format!("{}@{}", batch.id, time_slot.label);
                    let value = assignment
                        .int(variable.var)
                        .ok_or_else(|| BackendError::MissingValue {
                            variable: name.clone(),
                        })?;
                    let decoded =
                        variable
                            .decode(value)
                            .ok_or_else(|| BackendError::ValueOutOfDomain {
                                variable: name,
                                value,
                                size: variable.values.len(),
                            })?;
                    cell_for(domain, &batch.id, decoded)
                }
                None if time_slot.kind == SlotKind::Lunch => Cell::Lunch,
                None => Cell::Blocked,
            };
            timetable.set(batch.id.clone(), slot, cell);
        }
    }

    Ok(timetable)
}

fn cell_for(domain: &Domain, batch: &BatchId, value: &SlotValue) -> Cell {
    let (subject, occupancy) = match value {
        SlotValue::Unused => return Cell::Free,
        SlotValue::Lesson { subject, session } => (subject, Occupancy::Single(*session)),
        SlotValue::Double { subject } => (subject, Occupancy::Double),
    };

    let mut teachers = Vec::new();
    for session in occupancy.sessions() {
        if let Some(teacher) = domain.faculty.teacher(batch, subject, session) {
            if !teachers.contains(teacher) {
                teachers.push(teacher.clone());
            }
        }
    }

    Cell::Lesson(Lesson {
        subject: subject.clone(),
        occupancy,
        teachers,
    })
}

/// Interpret the solver's answer, decode it and validate the result.
///
/// Infeasibility and a timeout without incumbent are terminal failures; a timeout reports the
/// limit of `options`. A timetable that fails validation is reported as
/// [`ScheduleError::ValidationFailure`], never returned as a success.
pub fn decode_and_validate(
    domain: &Domain,
    vars: &AssignmentVars,
    result: &SolveResponse,
    options: &SolveOptions,
) -> Result<(Timetable, ValidationReport), ScheduleError> {
    let assignment = match (result.status, result.assignment.as_ref()) {
        (SolveStatus::Infeasible, _) => {
            return Err(ScheduleError::SolverInfeasible {
                statistics: result.statistics,
            })
        }
        (SolveStatus::Unknown, None) => {
            return Err(ScheduleError::SolverTimeout {
                time_limit: options.time_limit,
                statistics: result.statistics,
            })
        }
        (SolveStatus::Optimal | SolveStatus::Feasible, None) => {
            return Err(BackendError::MissingAssignment.into())
        }
        (SolveStatus::Unknown, Some(assignment)) => {
            warn!("Solver stopped without a verdict; decoding its best timetable");
            assignment
        }
        (_, Some(assignment)) => assignment,
    };

    let timetable = decode(domain, vars, assignment)?;
    let report = validate(domain, &timetable);

    if !report.passed() {
        return Err(ScheduleError::ValidationFailure(Box::new(
            ValidationFailure { timetable, report },
        )));
    }

    info!(
        "Decoded and validated timetable for {} batches",
        domain.batches.len()
    );
    Ok((timetable, report))
}

/// The session each lesson of a timetable counts towards, for display.
pub fn session_label(occupancy: Occupancy) -> String {
    match occupancy {
        Occupancy::Single(Session::First) => "1".to_owned(),
        Occupancy::Single(Session::Second) => "2".to_owned(),
        Occupancy::Double => "2x".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::backend::SolverStatistics;
    use crate::builder::build_model;
    use crate::domain::AllowedOverlap;
    use crate::domain::Batch;
    use crate::domain::FixedPlacement;
    use crate::domain::SlotGrid;
    use crate::domain::SlotId;
    use crate::domain::SlotRestriction;
    use crate::domain::SubjectId;
    use crate::domain::TeacherDaySpan;
    use crate::domain::TeacherId;
    use crate::domain::TimeSlot;

    fn domain() -> Domain {
        let mut domain = Domain::new(SlotGrid::new(vec![
            TimeSlot::new("S1", SlotKind::Working),
            TimeSlot::new("S2", SlotKind::Working),
            TimeSlot::new("LUNCH", SlotKind::Lunch),
            TimeSlot::new("S3", SlotKind::Working),
            TimeSlot::new("S4", SlotKind::Working),
        ]));
        domain.buildings = vec!["B1".into(), "B2".into()];
        domain.travel.set("B1".into(), "B2".into(), 1);
        domain.subjects = vec!["MATHS".into(), "PHYSICS".into()];
        domain.batches = vec![
            Batch::new(
                "A",
                "B1",
                [0, 1, 3, 4].map(SlotId),
                ["MATHS", "PHYSICS"].map(SubjectId::from),
            ),
            Batch::new(
                "B",
                "B2",
                [0, 1, 3, 4].map(SlotId),
                [SubjectId::from("MATHS")],
            ),
        ];
        for (batch, subject, teacher) in [("A", "MATHS", "T1"), ("A", "PHYSICS", "T2"), ("B", "MATHS", "T1")] {
            domain
                .faculty
                .assign_both(&batch.into(), &subject.into(), &teacher.into());
        }
        domain
    }

    fn lesson(subject: &str, session: Session, teacher: &str) -> Cell {
        Cell::Lesson(Lesson {
            subject: subject.into(),
            occupancy: Occupancy::Single(session),
            teachers: vec![teacher.into()],
        })
    }

    fn valid_timetable() -> Timetable {
        let mut timetable = Timetable::default();
        let rows = [
            (
                "A",
                [
                    lesson("MATHS", Session::First, "T1"),
                    lesson("MATHS", Session::Second, "T1"),
                    Cell::Lunch,
                    lesson("PHYSICS", Session::First, "T2"),
                    lesson("PHYSICS", Session::Second, "T2"),
                ],
            ),
            (
                "B",
                [
                    Cell::Free,
                    Cell::Free,
                    Cell::Lunch,
                    lesson("MATHS", Session::First, "T1"),
                    lesson("MATHS", Session::Second, "T1"),
                ],
            ),
        ];
        for (batch, cells) in rows {
            for (index, cell) in cells.into_iter().enumerate() {
                timetable.set(BatchId::from(batch), SlotId(index), cell);
            }
        }
        timetable
    }

    fn violations(report: &ValidationReport, invariant: Invariant) -> usize {
        report
            .check(invariant)
            .map_or(0, |check| check.violations.len())
    }

    #[test]
    fn a_valid_timetable_passes_every_check() {
        let report = validate(&domain(), &valid_timetable());
        assert!(report.passed(), "{report}");
        assert_eq!(report.checks.len(), Invariant::ALL.len());
    }

    #[test]
    fn travel_conflicts_are_reported_with_their_batches() {
        let mut timetable = valid_timetable();
        timetable.set("B".into(), SlotId(0), lesson("MATHS", Session::First, "T1"));
        timetable.set("B".into(), SlotId(3), Cell::Free);

        let report = validate(&domain(), &timetable);
        assert!(!report.passed());
        assert_eq!(violations(&report, Invariant::TravelExclusivity), 2);
        let violation = &report
            .check(Invariant::TravelExclusivity)
            .expect("check present")
            .violations[0];
        assert_eq!(violation.slot, Some(SlotId(0)));
        assert_eq!(violation.teacher, Some("T1".into()));
    }

    #[test]
    fn building_conflicts_respect_allowed_overlaps() {
        let mut domain = domain();
        domain.batches[1].building = "B1".into();
        let mut timetable = valid_timetable();
        timetable.set("B".into(), SlotId(0), lesson("MATHS", Session::First, "T1"));
        timetable.set("B".into(), SlotId(3), Cell::Free);

        let report = validate(&domain, &timetable);
        assert_eq!(violations(&report, Invariant::BuildingExclusivity), 2);

        domain.allowed_overlaps.push(AllowedOverlap {
            teacher: "T1".into(),
            slot: SlotId(0),
            buildings: ["B1".into()].into_iter().collect(),
        });
        assert!(validate(&domain, &timetable).passed());
    }

    #[test]
    fn unit_counts_and_sessions_are_recounted() {
        let mut timetable = valid_timetable();
        timetable.set("A".into(), SlotId(4), lesson("PHYSICS", Session::First, "T2"));

        let report = validate(&domain(), &timetable);
        assert_eq!(violations(&report, Invariant::UnitCount), 0);
        assert_eq!(violations(&report, Invariant::SessionCoverage), 2);

        timetable.set("A".into(), SlotId(4), Cell::Free);
        let report = validate(&domain(), &timetable);
        assert_eq!(violations(&report, Invariant::UnitCount), 1);
    }

    #[test]
    fn a_double_lesson_in_an_ordinary_slot_counts_once() {
        let mut timetable = valid_timetable();
        timetable.set(
            "A".into(),
            SlotId(0),
            Cell::Lesson(Lesson {
                subject: "MATHS".into(),
                occupancy: Occupancy::Double,
                teachers: vec!["T1".into()],
            }),
        );
        timetable.set("A".into(), SlotId(1), Cell::Free);

        let report = validate(&domain(), &timetable);
        assert!(!report.passed());
        let unit_count = &report
            .check(Invariant::UnitCount)
            .expect("check present")
            .violations;
        assert_eq!(unit_count.len(), 2);
        assert_eq!(unit_count[0].slot, Some(SlotId(0)));
        assert_eq!(violations(&report, Invariant::SessionCoverage), 2);
    }

    #[test]
    fn lessons_in_lunch_and_missing_fixed_placements_fail() {
        let mut domain = domain();
        domain.fixed_placements.push(FixedPlacement {
            batch: "B".into(),
            slot: SlotId(0),
            subject: "MATHS".into(),
            teacher: "T1".into(),
            session: Session::First,
        });
        let mut timetable = valid_timetable();
        timetable.set("B".into(), SlotId(2), lesson("MATHS", Session::First, "T1"));
        timetable.set("B".into(), SlotId(3), Cell::Free);

        let report = validate(&domain, &timetable);
        assert_eq!(violations(&report, Invariant::NoLessonsInBreaks), 1);
        assert_eq!(violations(&report, Invariant::FixedPlacements), 1);
        assert!(report.summary().contains("fixed placements"));
    }

    #[test]
    fn single_trip_requires_an_adjacent_pair() {
        let mut domain = domain();
        let _ = domain.batches[1].single_trip_subjects.insert("MATHS".into());
        assert!(validate(&domain, &valid_timetable()).passed());

        let mut timetable = valid_timetable();
        timetable.set("B".into(), SlotId(1), lesson("MATHS", Session::First, "T1"));
        timetable.set("B".into(), SlotId(3), Cell::Free);
        let report = validate(&domain, &timetable);
        assert_eq!(violations(&report, Invariant::SingleTrip), 1);
        assert_eq!(violations(&report, Invariant::TravelExclusivity), 2);
    }

    #[test]
    fn restrictions_and_day_spans_are_rechecked() {
        let mut domain = domain();
        domain.slot_restrictions.push(SlotRestriction {
            batch: "A".into(),
            slot: SlotId(0),
            subjects: [SubjectId::from("PHYSICS")].into_iter().collect(),
        });
        domain.day_spans.push(TeacherDaySpan {
            teacher: "T1".into(),
            early: SlotId(0),
            late: SlotId(4),
        });

        let report = validate(&domain, &valid_timetable());
        let restriction = &report
            .check(Invariant::SlotRestrictions)
            .expect("check present")
            .violations;
        assert_eq!(restriction.len(), 1);
        assert_eq!(restriction[0].slot, Some(SlotId(0)));
        assert_eq!(restriction[0].subject, Some(SubjectId::from("MATHS")));

        let span = &report
            .check(Invariant::TeacherDaySpan)
            .expect("check present")
            .violations;
        assert_eq!(span.len(), 1);
        assert_eq!(span[0].teacher, Some(TeacherId::from("T1")));

        domain.day_spans[0].teacher = "T2".into();
        let report = validate(&domain, &valid_timetable());
        assert_eq!(violations(&report, Invariant::TeacherDaySpan), 0);
    }

    #[test]
    fn wrong_teachers_break_faculty_consistency() {
        let mut timetable = valid_timetable();
        timetable.set("A".into(), SlotId(3), lesson("PHYSICS", Session::First, "T9"));

        let report = validate(&domain(), &timetable);
        assert_eq!(violations(&report, Invariant::FacultyConsistency), 1);
    }

    #[test]
    fn infeasible_and_timed_out_results_are_terminal() {
        let domain = domain();
        let (_, vars) = build_model(&domain).expect("valid model");

        let infeasible = SolveResponse {
            status: SolveStatus::Infeasible,
            assignment: None,
            statistics: SolverStatistics::default(),
        };
        assert!(matches!(
            decode_and_validate(&domain, &vars, &infeasible, &SolveOptions::default()),
            Err(ScheduleError::SolverInfeasible { .. })
        ));

        let timeout = SolveResponse {
            status: SolveStatus::Unknown,
            assignment: None,
            statistics: SolverStatistics::default(),
        };
        let options = SolveOptions {
            time_limit: Duration::from_secs(3),
        };
        match decode_and_validate(&domain, &vars, &timeout, &options) {
            Err(ScheduleError::SolverTimeout { time_limit, .. }) => {
                assert_eq!(time_limit, Duration::from_secs(3));
            }
            other => panic!("expected a timeout, got {other:?}"),
        }
    }

    #[test]
    fn a_wrong_assignment_is_a_validation_failure() {
        let domain = domain();
        let (model, vars) = build_model(&domain).expect("valid model");

        // Every slot of both batches gets its first value, which breaks the unit counts.
        let mut assignment = Assignment::empty(&model);
        for (_, _, variable) in vars.iter_slots() {
            assignment.set_int(variable.var, 0);
        }
        let response = SolveResponse {
            status: SolveStatus::Feasible,
            assignment: Some(assignment),
            statistics: SolverStatistics::default(),
        };

        match decode_and_validate(&domain, &vars, &response, &SolveOptions::default()) {
            Err(ScheduleError::ValidationFailure(failure)) => {
                assert!(!failure.report.passed());
                assert_eq!(
                    failure.timetable.cell(&"A".into(), SlotId(2)),
                    Some(&Cell::Lunch)
                );
            }
            other => panic!("expected a validation failure, got {other:?}"),
        }
    }
}
