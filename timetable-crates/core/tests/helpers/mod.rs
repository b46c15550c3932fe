//! Backends and sample problems shared by the integration tests.
#![allow(
    dead_code,
    reason = "is used in integration tests but unable to find a way to silence these warnings"
)]

use std::time::Duration;
use std::time::Instant;

use timetable_core::backend::SolveOptions;
use timetable_core::backend::SolveResponse;
use timetable_core::backend::SolveStatus;
use timetable_core::backend::SolverBackend;
use timetable_core::backend::SolverStatistics;
use timetable_core::domain::Batch;
use timetable_core::domain::Domain;
use timetable_core::domain::SlotGrid;
use timetable_core::domain::SlotId;
use timetable_core::domain::SlotKind;
use timetable_core::domain::SubjectId;
use timetable_core::domain::TimeSlot;
use timetable_core::model::Assignment;
use timetable_core::model::IntVar;
use timetable_core::model::Model;
use timetable_core::BackendError;

/// Depth-first search over every integer variable, pruned by the constraints that are already
/// decided. Only suitable for instances with a handful of slots.
#[derive(Debug, Default)]
pub(crate) struct ExhaustiveBackend {
    /// Stop after visiting this many nodes and report what was found so far.
    pub(crate) node_limit: Option<u64>,
    pub(crate) calls: usize,
}

impl ExhaustiveBackend {
    pub(crate) fn with_node_limit(limit: u64) -> Self {
        ExhaustiveBackend {
            node_limit: Some(limit),
            calls: 0,
        }
    }
}

struct Search<'a> {
    model: &'a Model,
    vars: Vec<IntVar>,
    assignment: Assignment,
    best: Option<(i64, Assignment)>,
    nodes: u64,
    conflicts: u64,
    node_limit: Option<u64>,
    interrupted: bool,
}

impl Search<'_> {
    fn consistent(&mut self) -> bool {
        self.assignment.clear_bools();
        self.model.derive_booleans(&mut self.assignment);
        self.model.first_conflict(&self.assignment).is_none()
    }

    /// Returns whether the search should stop.
    fn explore(&mut self, depth: usize) -> bool {
        if self.node_limit.is_some_and(|limit| self.nodes >= limit) {
            self.interrupted = true;
            return true;
        }
        self.nodes += 1;

        let Some(&var) = self.vars.get(depth) else {
            let value = self.model.objective_value(&self.assignment).unwrap_or(0);
            if self.best.as_ref().map_or(true, |(best, _)| value > *best) {
                self.best = Some((value, self.assignment.clone()));
            }
            // Without an objective the first solution is final.
            return self.model.objective().is_none();
        };

        for value in 0..self.model.domain_size(var) {
            self.assignment.set_int(var, value as i32);
            if !self.consistent() {
                self.conflicts += 1;
                continue;
            }
            if self.explore(depth + 1) {
                return true;
            }
        }
        self.assignment.unset_int(var);
        false
    }
}

impl SolverBackend for ExhaustiveBackend {
    fn solve(
        &mut self,
        model: &Model,
        _options: &SolveOptions,
    ) -> Result<SolveResponse, BackendError> {
        self.calls += 1;
        let start = Instant::now();

        let mut search = Search {
            model,
            vars: model.int_vars().collect(),
            assignment: Assignment::empty(model),
            best: None,
            nodes: 0,
            conflicts: 0,
            node_limit: self.node_limit,
            interrupted: false,
        };
        let root_consistent = search.consistent();
        if root_consistent {
            let _ = search.explore(0);
        }

        let status = match (&search.best, search.interrupted) {
            (Some(_), false) => SolveStatus::Optimal,
            (Some(_), true) => SolveStatus::Feasible,
            (None, false) => SolveStatus::Infeasible,
            (None, true) => SolveStatus::Unknown,
        };

        let (objective, assignment) = match search.best {
            Some((value, mut assignment)) => {
                assignment.clear_bools();
                model.derive_booleans(&mut assignment);
                (model.objective().map(|_| value), Some(assignment))
            }
            None => (None, None),
        };

        Ok(SolveResponse {
            status,
            assignment,
            statistics: SolverStatistics {
                wall_time: start.elapsed(),
                conflicts: Some(search.conflicts),
                nodes: Some(search.nodes),
                objective,
            },
        })
    }
}

/// Answers every call with the same response.
#[derive(Debug)]
pub(crate) struct StubBackend {
    pub(crate) response: SolveResponse,
}

impl StubBackend {
    pub(crate) fn with_status(status: SolveStatus) -> Self {
        StubBackend {
            response: SolveResponse {
                status,
                assignment: None,
                statistics: SolverStatistics {
                    wall_time: Duration::from_millis(3),
                    ..SolverStatistics::default()
                },
            },
        }
    }
}

impl SolverBackend for StubBackend {
    fn solve(
        &mut self,
        _model: &Model,
        _options: &SolveOptions,
    ) -> Result<SolveResponse, BackendError> {
        Ok(self.response.clone())
    }
}

pub(crate) fn working_grid(labels: &[&str]) -> SlotGrid {
    SlotGrid::new(
        labels
            .iter()
            .map(|label| TimeSlot::new(*label, SlotKind::Working))
            .collect(),
    )
}

/// Batch A in B1 takes MATHS (T1) and PHYSICS (T2); batch B in B2 takes MATHS from T1 as well.
/// The two buildings are a trip apart.
pub(crate) fn shared_teacher_domain(slots: usize) -> Domain {
    let labels = ["S1", "S2", "S3", "S4", "S5", "S6"];
    let mut domain = Domain::new(working_grid(&labels[..slots]));
    domain.buildings = vec!["B1".into(), "B2".into()];
    domain.travel.set("B1".into(), "B2".into(), 1);
    domain.subjects = vec!["MATHS".into(), "PHYSICS".into()];
    domain.batches = vec![
        Batch::new(
            "A",
            "B1",
            (0..slots).map(SlotId),
            ["MATHS", "PHYSICS"].map(SubjectId::from),
        ),
        Batch::new("B", "B2", (0..slots).map(SlotId), [SubjectId::from("MATHS")]),
    ];
    for (batch, subject, teacher) in [
        ("A", "MATHS", "T1"),
        ("A", "PHYSICS", "T2"),
        ("B", "MATHS", "T1"),
    ] {
        domain
            .faculty
            .assign_both(&batch.into(), &subject.into(), &teacher.into());
    }
    domain
}

/// Three buildings, the third of them remote, with a lunch break after the second slot and a
/// double-weight evening slot.
pub(crate) fn three_building_domain() -> Domain {
    let mut domain = Domain::new(SlotGrid::new(vec![
        TimeSlot::new("8:30-10:00", SlotKind::Working),
        TimeSlot::new("10:00-11:30", SlotKind::Working),
        TimeSlot::new("1:00-2:00", SlotKind::Lunch),
        TimeSlot::new("2:00-3:30", SlotKind::Working),
        TimeSlot::new("5:30-7:00", SlotKind::DoubleWeight),
    ]));
    domain.buildings = vec!["Building_1".into(), "Building_2".into(), "Building_3".into()];
    domain.travel.set("Building_1".into(), "Building_2".into(), 0);
    domain.travel.set("Building_1".into(), "Building_3".into(), 1);
    domain.travel.set("Building_2".into(), "Building_3".into(), 1);
    domain.subjects = vec!["PHYSICS".into(), "CHEM".into()];

    let subjects = ["PHYSICS", "CHEM"].map(SubjectId::from);
    domain.batches = vec![
        Batch::new("AK-JR-1", "Building_1", [0, 1, 3, 4].map(SlotId), subjects.clone()),
        Batch::new("AK-JR-2", "Building_2", [0, 1, 3, 4].map(SlotId), subjects.clone()),
        Batch::new("9th_CLASS", "Building_3", [1, 3, 4].map(SlotId), subjects),
    ];
    for (batch, physics, chem) in [
        ("AK-JR-1", "KIRITI", "PRK"),
        ("AK-JR-2", "ANIL", "PRK"),
        ("9th_CLASS", "ANIL", "KK"),
    ] {
        domain
            .faculty
            .assign_both(&batch.into(), &"PHYSICS".into(), &physics.into());
        domain
            .faculty
            .assign_both(&batch.into(), &"CHEM".into(), &chem.into());
    }
    domain
}
