use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::backend::SolverStatistics;
use crate::decode::Timetable;
use crate::decode::ValidationReport;
use crate::domain::BatchId;
use crate::domain::BuildingId;
use crate::domain::Session;
use crate::domain::SlotId;
use crate::domain::SlotKind;
use crate::domain::SubjectId;
use crate::domain::TeacherId;

/// The configuration does not describe a well-formed timetabling problem.
///
/// Raised before any model is built.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid configuration document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{context} refers to slot '{slot}' which is not part of the slot grid")]
    UnknownSlot { context: String, slot: String },
    #[error("{context} refers to unknown batch {batch}")]
    UnknownBatch { context: String, batch: BatchId },
    #[error("batch {batch} is declared more than once")]
    DuplicateBatch { batch: BatchId },
    #[error("batch {batch} is placed in unknown building {building}")]
    UnknownBuilding { batch: BatchId, building: BuildingId },
    #[error("{context} lists subject {subject} more than once")]
    DuplicateSubject { context: String, subject: SubjectId },
    #[error("{context} refers to unknown subject {subject}")]
    UnknownSubject { context: String, subject: SubjectId },
    #[error("{context} refers to unknown building {building}")]
    UnknownBuildingReference {
        context: String,
        building: BuildingId,
    },
    #[error("batch {batch} has no usable slots")]
    NoUsableSlots { batch: BatchId },
    #[error("batch {batch} lists slot {slot} as usable, but it is a {kind:?} slot")]
    UnusableSlot {
        batch: BatchId,
        slot: SlotId,
        kind: SlotKind,
    },
    #[error("batch {batch} lists slot {slot} which is outside the slot grid")]
    SlotOutOfRange { batch: BatchId, slot: SlotId },
    #[error("batch {batch} marks slot {slot} as double-weight but cannot use it")]
    DoubleWeightSlotNotUsable { batch: BatchId, slot: SlotId },
    #[error("batch {batch} requires single-trip grouping for {subject} which it does not take")]
    SingleTripSubjectNotTaken { batch: BatchId, subject: SubjectId },
    #[error("session index {session} of {subject} for batch {batch} must be 0 or 1")]
    InvalidSession {
        batch: BatchId,
        subject: SubjectId,
        session: usize,
    },
    #[error("no teacher is assigned to {subject} ({session}) of batch {batch}")]
    MissingFacultyAssignment {
        batch: BatchId,
        subject: SubjectId,
        session: Session,
    },
    #[error("fixed placement of {subject} for batch {batch} uses slot {slot}, which the batch cannot use")]
    FixedSlotNotUsable {
        batch: BatchId,
        slot: SlotId,
        subject: SubjectId,
    },
    #[error("fixed placement at slot {slot} of batch {batch} names {subject}, which the batch does not take")]
    FixedSubjectNotTaken {
        batch: BatchId,
        slot: SlotId,
        subject: SubjectId,
    },
    #[error("fixed placement at slot {slot} of batch {batch} assigns {found} to {subject} ({session}), but the faculty table names {expected}")]
    FixedTeacherMismatch {
        batch: BatchId,
        slot: SlotId,
        subject: SubjectId,
        session: Session,
        expected: TeacherId,
        found: TeacherId,
    },
    #[error("the day-span rule for {teacher} refers to slot {slot} which is outside the slot grid")]
    DaySpanSlotOutOfRange { teacher: TeacherId, slot: SlotId },
}

/// The fixed data contradicts itself, so no timetable can exist.
///
/// Raised while building the model, before the solver is invoked.
#[derive(Debug, Error)]
pub enum ModelBuildError {
    #[error("batch {batch} can hold {capacity} session-units but requires {required}")]
    InsufficientCapacity {
        batch: BatchId,
        capacity: usize,
        required: usize,
    },
    #[error("batch {batch} has two fixed placements in slot {slot}")]
    SlotFixedTwice { batch: BatchId, slot: SlotId },
    #[error("{subject} ({session}) of batch {batch} is fixed in both slot {first} and slot {second}")]
    SessionFixedTwice {
        batch: BatchId,
        subject: SubjectId,
        session: Session,
        first: SlotId,
        second: SlotId,
    },
    #[error("{teacher} is fixed in batches {first} and {second} of building {building} at slot {slot}")]
    FixedTeacherClash {
        teacher: TeacherId,
        slot: SlotId,
        building: BuildingId,
        first: BatchId,
        second: BatchId,
    },
    #[error("{teacher} is fixed in batch {first} ({first_building}) and batch {second} ({second_building}) at slot {slot}, but the buildings are a trip apart")]
    FixedTravelClash {
        teacher: TeacherId,
        slot: SlotId,
        first: BatchId,
        first_building: BuildingId,
        second: BatchId,
        second_building: BuildingId,
    },
    #[error("{teacher} is fixed at both slot {early} and slot {late}, which the day-span rule forbids")]
    FixedDaySpanClash {
        teacher: TeacherId,
        early: SlotId,
        late: SlotId,
    },
    #[error("slot {slot} of batch {batch} admits no subject")]
    EmptySlotDomain { batch: BatchId, slot: SlotId },
    #[error("fixed placement of {subject} at slot {slot} of batch {batch} is excluded by a slot restriction")]
    RestrictionExcludesFixed {
        batch: BatchId,
        slot: SlotId,
        subject: SubjectId,
    },
    #[error("{subject} ({session}) of batch {batch} has no slot it can be placed in")]
    NoSlotForSession {
        batch: BatchId,
        subject: SubjectId,
        session: Session,
    },
    #[error("{subject} of batch {batch} must be taught in a single trip, but the batch has neither an adjacent slot pair nor a double-weight slot for it")]
    NoGroupingOption { batch: BatchId, subject: SubjectId },
}

/// The solver process or its output could not be used.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("IO error, more details: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to start solver '{}': {source}", executable.display())]
    Spawn {
        executable: PathBuf,
        source: std::io::Error,
    },
    #[error("solver exited with {status}: {stderr}")]
    SolverFailed { status: String, stderr: String },
    #[error("solver reported an error")]
    SolverError,
    #[error("could not interpret solver output line '{line}'")]
    MalformedOutput { line: String },
    #[error("solver reported a solution but did not provide an assignment")]
    MissingAssignment,
    #[error("the solution has no value for variable {variable}")]
    MissingValue { variable: String },
    #[error("the solution assigns {value} to {variable}, whose domain has {size} values")]
    ValueOutOfDomain {
        variable: String,
        value: i32,
        size: usize,
    },
}

/// A decoded timetable together with the report of the invariants it violates.
#[derive(Debug)]
pub struct ValidationFailure {
    pub timetable: Timetable,
    pub report: ValidationReport,
}

/// Every way a single scheduling run can be rejected.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("model construction failed: {0}")]
    ModelBuild(#[from] ModelBuildError),
    #[error("the solver proved that no timetable exists ({statistics})")]
    SolverInfeasible { statistics: SolverStatistics },
    #[error("the solver found no timetable within {time_limit:?} ({statistics})")]
    SolverTimeout {
        time_limit: Duration,
        statistics: SolverStatistics,
    },
    #[error("the solved timetable violates {} invariant(s): {}", .0.report.failures().count(), .0.report.summary())]
    ValidationFailure(Box<ValidationFailure>),
    #[error("solver backend failed: {0}")]
    Backend(#[from] BackendError),
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;
