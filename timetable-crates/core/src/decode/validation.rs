use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt::Display;
use std::fmt::Formatter;

use fnv::FnvHashMap;
use itertools::Itertools;

use super::Cell;
use super::Lesson;
use super::Occupancy;
use super::Timetable;
use crate::domain::BatchId;
use crate::domain::BuildingId;
use crate::domain::Domain;
use crate::domain::Session;
use crate::domain::SlotId;
use crate::domain::SlotKind;
use crate::domain::SubjectId;
use crate::domain::TeacherId;
use crate::domain::UNITS_PER_SUBJECT;

/// The invariants every accepted timetable satisfies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Invariant {
    /// Each (batch, subject) receives exactly two session-units.
    UnitCount,
    /// Each session of each subject is placed exactly once.
    SessionCoverage,
    /// A teacher is in at most one batch per building at a time.
    BuildingExclusivity,
    /// A teacher is never in two buildings a trip apart at a time.
    TravelExclusivity,
    FixedPlacements,
    /// Nothing is taught in lunch, blocked or otherwise unusable slots.
    NoLessonsInBreaks,
    /// Every lesson is given by the teacher the faculty table names.
    FacultyConsistency,
    /// Single-trip subjects are grouped in an adjacent pair or a double-weight slot.
    SingleTrip,
    SlotRestrictions,
    TeacherDaySpan,
}

impl Invariant {
    pub const ALL: [Invariant; 10] = [
        Invariant::UnitCount,
        Invariant::SessionCoverage,
        Invariant::BuildingExclusivity,
        Invariant::TravelExclusivity,
        Invariant::FixedPlacements,
        Invariant::NoLessonsInBreaks,
        Invariant::FacultyConsistency,
        Invariant::SingleTrip,
        Invariant::SlotRestrictions,
        Invariant::TeacherDaySpan,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Invariant::UnitCount => "unit count",
            Invariant::SessionCoverage => "session coverage",
            Invariant::BuildingExclusivity => "building exclusivity",
            Invariant::TravelExclusivity => "travel exclusivity",
            Invariant::FixedPlacements => "fixed placements",
            Invariant::NoLessonsInBreaks => "no lessons in breaks",
            Invariant::FacultyConsistency => "faculty consistency",
            Invariant::SingleTrip => "single trip",
            Invariant::SlotRestrictions => "slot restrictions",
            Invariant::TeacherDaySpan => "teacher day span",
        }
    }
}

impl Display for Invariant {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One offending entry, with whichever of batch, slot, teacher and subject it concerns.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Violation {
    pub batch: Option<BatchId>,
    pub slot: Option<SlotId>,
    pub teacher: Option<TeacherId>,
    pub subject: Option<SubjectId>,
    pub detail: String,
}

impl Violation {
    fn new(detail: impl Into<String>) -> Self {
        Violation {
            detail: detail.into(),
            ..Violation::default()
        }
    }

    fn batch(mut self, batch: &BatchId) -> Self {
        self.batch = Some(batch.clone());
        self
    }

    fn slot(mut self, slot: SlotId) -> Self {
        self.slot = Some(slot);
        self
    }

    fn teacher(mut self, teacher: &TeacherId) -> Self {
        self.teacher = Some(teacher.clone());
        self
    }

    fn subject(mut self, subject: &SubjectId) -> Self {
        self.subject = Some(subject.clone());
        self
    }
}

impl Display for Violation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let context = [
            self.batch.as_ref().map(|batch| format!("batch {batch}")),
            self.slot.map(|slot| format!("slot {slot}")),
            self.teacher.as_ref().map(|teacher| format!("teacher {teacher}")),
            self.subject.as_ref().map(|subject| format!("subject {subject}")),
        ]
        .into_iter()
        .flatten()
        .join(", ");
        write!(f, "[{context}] {}", self.detail)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvariantCheck {
    pub invariant: Invariant,
    pub violations: Vec<Violation>,
}

impl InvariantCheck {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

/// One pass/fail entry per invariant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationReport {
    pub checks: Vec<InvariantCheck>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.checks.iter().all(InvariantCheck::passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &InvariantCheck> {
        self.checks.iter().filter(|check| !check.passed())
    }

    pub fn check(&self, invariant: Invariant) -> Option<&InvariantCheck> {
        self.checks.iter().find(|check| check.invariant == invariant)
    }

    /// The names of the failed invariants, comma separated.
    pub fn summary(&self) -> String {
        self.failures().map(|check| check.invariant.name()).join(", ")
    }
}

impl Display for ValidationReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for check in &self.checks {
            let verdict = if check.passed() { "PASS" } else { "FAIL" };
            writeln!(f, "{verdict:<4} {}", check.invariant)?;
            for violation in &check.violations {
                writeln!(f, "     {violation}")?;
            }
        }
        Ok(())
    }
}

/// Re-derive every invariant from the timetable and the domain alone.
pub fn validate(domain: &Domain, timetable: &Timetable) -> ValidationReport {
    let checks = Invariant::ALL
        .into_iter()
        .map(|invariant| {
            let violations = match invariant {
                Invariant::UnitCount => unit_count(domain, timetable),
                Invariant::SessionCoverage => session_coverage(domain, timetable),
                Invariant::BuildingExclusivity => building_exclusivity(domain, timetable),
                Invariant::TravelExclusivity => travel_exclusivity(domain, timetable),
                Invariant::FixedPlacements => fixed_placements(domain, timetable),
                Invariant::NoLessonsInBreaks => no_lessons_in_breaks(domain, timetable),
                Invariant::FacultyConsistency => faculty_consistency(domain, timetable),
                Invariant::SingleTrip => single_trip(domain, timetable),
                Invariant::SlotRestrictions => slot_restrictions(domain, timetable),
                Invariant::TeacherDaySpan => teacher_day_span(domain, timetable),
            };
            InvariantCheck {
                invariant,
                violations,
            }
        })
        .collect();

    ValidationReport { checks }
}

fn in_double_weight_slot(domain: &Domain, batch: &BatchId, slot: SlotId) -> bool {
    domain
        .batch(batch)
        .is_some_and(|batch| batch.is_double_weight(&domain.slots, slot))
}

/// The sessions a lesson covers, taken from the kind of its slot rather than from the lesson.
/// A double placement in an ordinary slot covers nothing.
fn covered_sessions(
    domain: &Domain,
    batch: &BatchId,
    slot: SlotId,
    lesson: &Lesson,
) -> Vec<Session> {
    match (in_double_weight_slot(domain, batch, slot), lesson.occupancy) {
        (true, _) => Session::ALL.to_vec(),
        (false, Occupancy::Single(session)) => vec![session],
        (false, Occupancy::Double) => Vec::new(),
    }
}

fn unit_count(domain: &Domain, timetable: &Timetable) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut units: FnvHashMap<(&BatchId, &SubjectId), usize> = FnvHashMap::default();
    for (batch, slot, lesson) in timetable.lessons() {
        let double_weight = in_double_weight_slot(domain, batch, slot);
        if double_weight != (lesson.occupancy == Occupancy::Double) {
            let detail = if double_weight {
                "single placement in a double-weight slot"
            } else {
                "double placement in a single-weight slot"
            };
            violations.push(
                Violation::new(detail)
                    .batch(batch)
                    .slot(slot)
                    .subject(&lesson.subject),
            );
        }
        *units.entry((batch, &lesson.subject)).or_default() += if double_weight { 2 } else { 1 };
    }

    for batch in &domain.batches {
        for subject in &batch.subjects {
            let count = units.remove(&(&batch.id, subject)).unwrap_or(0);
            if count != UNITS_PER_SUBJECT {
                violations.push(
                    Violation::new(format!(
                        "{count} session-units instead of {UNITS_PER_SUBJECT}"
                    ))
                    .batch(&batch.id)
                    .subject(subject),
                );
            }
        }
    }

    for ((batch, subject), count) in units.into_iter().sorted() {
        violations.push(
            Violation::new(format!("{count} session-units of a subject the batch does not take"))
                .batch(batch)
                .subject(subject),
        );
    }

    violations
}

fn session_coverage(domain: &Domain, timetable: &Timetable) -> Vec<Violation> {
    let mut placed: BTreeMap<(&BatchId, &SubjectId, Session), Vec<SlotId>> = BTreeMap::new();
    for (batch, slot, lesson) in timetable.lessons() {
        for session in covered_sessions(domain, batch, slot, lesson) {
            placed
                .entry((batch, &lesson.subject, session))
                .or_default()
                .push(slot);
        }
    }

    let mut violations = Vec::new();
    for batch in &domain.batches {
        for subject in &batch.subjects {
            for session in Session::ALL {
                let slots = placed
                    .get(&(&batch.id, subject, session))
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                if slots.len() != 1 {
                    violations.push(
                        Violation::new(format!(
                            "{session} is placed {} times (slots {})",
                            slots.len(),
                            slots.iter().join(", ")
                        ))
                        .batch(&batch.id)
                        .subject(subject),
                    );
                }
            }
        }
    }
    violations
}

/// Slot → teacher → building → batches the teacher is in.
type Presence<'a> =
    BTreeMap<SlotId, BTreeMap<&'a TeacherId, BTreeMap<BuildingId, BTreeSet<&'a BatchId>>>>;

fn presence<'a>(domain: &Domain, timetable: &'a Timetable) -> Presence<'a> {
    let mut presence: Presence<'a> = BTreeMap::new();
    for (batch_id, slot, lesson) in timetable.lessons() {
        let Some(batch) = domain.batch(batch_id) else {
            continue;
        };
        for teacher in &lesson.teachers {
            let _ = presence
                .entry(slot)
                .or_default()
                .entry(teacher)
                .or_default()
                .entry(batch.building.clone())
                .or_default()
                .insert(batch_id);
        }
    }
    presence
}

fn building_exclusivity(domain: &Domain, timetable: &Timetable) -> Vec<Violation> {
    let mut violations = Vec::new();
    for (slot, teachers) in presence(domain, timetable) {
        for (teacher, buildings) in teachers {
            for (building, batches) in buildings {
                if batches.len() > 1 && !domain.overlap_allowed_within(teacher, slot, &building) {
                    for batch in batches {
                        violations.push(
                            Violation::new(format!(
                                "teacher is in several batches of {building} at once"
                            ))
                            .batch(batch)
                            .slot(slot)
                            .teacher(teacher),
                        );
                    }
                }
            }
        }
    }
    violations
}

fn travel_exclusivity(domain: &Domain, timetable: &Timetable) -> Vec<Violation> {
    let mut violations = Vec::new();
    for (slot, teachers) in presence(domain, timetable) {
        for (teacher, buildings) in teachers {
            for ((first, first_batches), (second, second_batches)) in
                buildings.iter().tuple_combinations()
            {
                if !domain.is_travel_conflict(teacher, slot, first, second) {
                    continue;
                }
                for batch in first_batches.iter().chain(second_batches) {
                    violations.push(
                        Violation::new(format!(
                            "teacher is in {first} and {second}, which are a trip apart"
                        ))
                        .batch(batch)
                        .slot(slot)
                        .teacher(teacher),
                    );
                }
            }
        }
    }
    violations
}

fn fixed_placements(domain: &Domain, timetable: &Timetable) -> Vec<Violation> {
    domain
        .fixed_placements
        .iter()
        .filter(|placement| {
            let lesson = timetable
                .cell(&placement.batch, placement.slot)
                .and_then(Cell::lesson);
            !lesson.is_some_and(|lesson| {
                lesson.subject == placement.subject
                    && lesson.occupancy.sessions().contains(&placement.session)
                    && lesson.teachers.contains(&placement.teacher)
            })
        })
        .map(|placement| {
            Violation::new(format!(
                "fixed {} is missing or altered",
                placement.session
            ))
            .batch(&placement.batch)
            .slot(placement.slot)
            .teacher(&placement.teacher)
            .subject(&placement.subject)
        })
        .collect()
}

fn no_lessons_in_breaks(domain: &Domain, timetable: &Timetable) -> Vec<Violation> {
    timetable
        .lessons()
        .filter_map(|(batch_id, slot, lesson)| {
            let kind = domain.slots.kind(slot);
            let usable = domain
                .batch(batch_id)
                .is_some_and(|batch| batch.is_usable(slot));
            let reason = match kind {
                None => "outside the slot grid",
                Some(SlotKind::Lunch) => "during lunch",
                Some(SlotKind::Blocked) => "in a blocked slot",
                Some(_) if !usable => "in a slot the batch cannot use",
                Some(_) => return None,
            };
            Some(
                Violation::new(format!("lesson {reason}"))
                    .batch(batch_id)
                    .slot(slot)
                    .subject(&lesson.subject),
            )
        })
        .collect()
}

fn faculty_consistency(domain: &Domain, timetable: &Timetable) -> Vec<Violation> {
    let mut violations = Vec::new();
    for (batch, slot, lesson) in timetable.lessons() {
        let expected = lesson
            .occupancy
            .sessions()
            .into_iter()
            .filter_map(|session| domain.faculty.teacher(batch, &lesson.subject, session))
            .unique()
            .cloned()
            .collect::<Vec<_>>();
        let found = lesson.teachers.iter().cloned().sorted().collect::<Vec<_>>();
        if expected.iter().cloned().sorted().collect::<Vec<_>>() != found {
            violations.push(
                Violation::new(format!(
                    "taught by {} but the faculty table names {}",
                    lesson.teachers.iter().join(" & "),
                    expected.iter().join(" & ")
                ))
                .batch(batch)
                .slot(slot)
                .subject(&lesson.subject),
            );
        }
    }
    violations
}

fn single_trip(domain: &Domain, timetable: &Timetable) -> Vec<Violation> {
    let mut violations = Vec::new();
    for batch in &domain.batches {
        for subject in &batch.single_trip_subjects {
            let slots = timetable
                .row(&batch.id)
                .into_iter()
                .flatten()
                .filter(|(_, cell)| cell.lesson().is_some_and(|lesson| &lesson.subject == subject))
                .map(|(slot, cell)| (*slot, cell))
                .collect::<Vec<_>>();

            let grouped = match slots.as_slice() {
                [(_, Cell::Lesson(lesson))] => lesson.occupancy == Occupancy::Double,
                [(first, _), (second, _)] => batch
                    .adjacent_pairs(&domain.slots)
                    .contains(&(*first, *second)),
                _ => false,
            };
            if !grouped {
                violations.push(
                    Violation::new(format!(
                        "not grouped into one trip (slots {})",
                        slots.iter().map(|(slot, _)| slot).join(", ")
                    ))
                    .batch(&batch.id)
                    .subject(subject),
                );
            }
        }
    }
    violations
}

fn slot_restrictions(domain: &Domain, timetable: &Timetable) -> Vec<Violation> {
    domain
        .slot_restrictions
        .iter()
        .filter_map(|restriction| {
            let lesson = timetable
                .cell(&restriction.batch, restriction.slot)
                .and_then(Cell::lesson)?;
            (!restriction.subjects.contains(&lesson.subject)).then(|| {
                Violation::new("subject is not allowed in this slot")
                    .batch(&restriction.batch)
                    .slot(restriction.slot)
                    .subject(&lesson.subject)
            })
        })
        .collect()
}

fn teacher_day_span(domain: &Domain, timetable: &Timetable) -> Vec<Violation> {
    let presence = presence(domain, timetable);
    let teaches = |teacher: &TeacherId, slot: SlotId| {
        presence
            .get(&slot)
            .is_some_and(|teachers| teachers.contains_key(teacher))
    };

    domain
        .day_spans
        .iter()
        .filter(|span| teaches(&span.teacher, span.early) && teaches(&span.teacher, span.late))
        .map(|span| {
            Violation::new(format!(
                "teaches at both slot {} and slot {}",
                span.early, span.late
            ))
            .slot(span.late)
            .teacher(&span.teacher)
        })
        .collect()
}
