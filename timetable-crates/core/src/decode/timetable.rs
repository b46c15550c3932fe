use std::collections::BTreeMap;

use crate::domain::BatchId;
use crate::domain::Domain;
use crate::domain::FixedPlacement;
use crate::domain::Session;
use crate::domain::SlotId;
use crate::domain::SubjectId;
use crate::domain::TeacherId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Occupancy {
    Single(Session),
    /// Both sessions in one double-weight slot.
    Double,
}

impl Occupancy {
    pub fn units(self) -> usize {
        match self {
            Occupancy::Single(_) => 1,
            Occupancy::Double => 2,
        }
    }

    pub fn sessions(self) -> Vec<Session> {
        match self {
            Occupancy::Single(session) => vec![session],
            Occupancy::Double => Session::ALL.to_vec(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lesson {
    pub subject: SubjectId,
    pub occupancy: Occupancy,
    /// The teachers in the room: one per covered session, without duplicates.
    pub teachers: Vec<TeacherId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Cell {
    Lesson(Lesson),
    /// A usable slot left empty.
    Free,
    Lunch,
    /// A slot the batch cannot use.
    Blocked,
}

impl Cell {
    pub fn lesson(&self) -> Option<&Lesson> {
        match self {
            Cell::Lesson(lesson) => Some(lesson),
            _ => None,
        }
    }
}

/// The weekly timetable of every batch: batch → slot → cell.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Timetable {
    rows: BTreeMap<BatchId, BTreeMap<SlotId, Cell>>,
}

impl Timetable {
    pub fn set(&mut self, batch: BatchId, slot: SlotId, cell: Cell) {
        let _ = self.rows.entry(batch).or_default().insert(slot, cell);
    }

    pub fn cell(&self, batch: &BatchId, slot: SlotId) -> Option<&Cell> {
        self.rows.get(batch).and_then(|row| row.get(&slot))
    }

    pub fn row(&self, batch: &BatchId) -> Option<&BTreeMap<SlotId, Cell>> {
        self.rows.get(batch)
    }

    pub fn batches(&self) -> impl Iterator<Item = &BatchId> {
        self.rows.keys()
    }

    pub fn lessons(&self) -> impl Iterator<Item = (&BatchId, SlotId, &Lesson)> {
        self.rows.iter().flat_map(|(batch, row)| {
            row.iter()
                .filter_map(move |(slot, cell)| cell.lesson().map(|lesson| (batch, *slot, lesson)))
        })
    }

    /// Re-express every lesson as a fixed placement, so a known timetable can be fed back
    /// through the model.
    pub fn to_fixed_placements(&self) -> Vec<FixedPlacement> {
        self.lessons()
            .filter_map(|(batch, slot, lesson)| {
                let session = match lesson.occupancy {
                    Occupancy::Single(session) => session,
                    Occupancy::Double => Session::First,
                };
                lesson.teachers.first().map(|teacher| FixedPlacement {
                    batch: batch.clone(),
                    slot,
                    subject: lesson.subject.clone(),
                    teacher: teacher.clone(),
                    session,
                })
            })
            .collect()
    }

    /// The weighted adjacency score: each subject of a non-fixed batch taught in both slots
    /// of an adjacent pair earns the batch's weight.
    pub fn adjacency_score(&self, domain: &Domain) -> i64 {
        let mut score = 0;
        for batch in domain.batches.iter().filter(|batch| !batch.fully_fixed) {
            let weight = i64::from(crate::preferences::batch_weight(domain, batch));
            for (first, second) in batch.adjacent_pairs(&domain.slots) {
                let subject_at = |slot| {
                    self.cell(&batch.id, slot)
                        .and_then(Cell::lesson)
                        .map(|lesson| &lesson.subject)
                };
                if let (Some(first), Some(second)) = (subject_at(first), subject_at(second)) {
                    if first == second && !batch.single_trip_subjects.contains(first) {
                        score += weight;
                    }
                }
            }
        }
        score
    }
}
