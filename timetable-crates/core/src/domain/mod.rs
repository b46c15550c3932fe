//! The typed description of a timetabling problem.
//!
//! A [`Domain`] is constructed once per run (usually through [`crate::config::ScheduleConfig`])
//! and is never mutated by model building, solving or validation.
mod batch;
mod faculty;
mod ids;
mod rules;
mod slots;
mod travel;

use std::collections::BTreeSet;
use std::time::Duration;

pub use batch::Batch;
pub use batch::UNITS_PER_SUBJECT;
pub use faculty::FacultyTable;
pub use ids::BatchId;
pub use ids::BuildingId;
pub use ids::Session;
pub use ids::SlotId;
pub use ids::SubjectId;
pub use ids::TeacherId;
use itertools::Itertools;
use log::warn;
pub use rules::AllowedOverlap;
pub use rules::FixedPlacement;
pub use rules::PreferenceWeights;
pub use rules::SlotRestriction;
pub use rules::TeacherDaySpan;
pub use slots::SlotGrid;
pub use slots::SlotKind;
pub use slots::TimeSlot;
pub use travel::Penalty;
pub use travel::TravelMatrix;

use crate::ConfigError;

pub const DEFAULT_TIME_LIMIT: Duration = Duration::from_secs(60);

#[derive(Clone, Debug)]
pub struct Domain {
    pub slots: SlotGrid,
    pub buildings: Vec<BuildingId>,
    pub subjects: Vec<SubjectId>,
    pub batches: Vec<Batch>,
    pub faculty: FacultyTable,
    pub travel: TravelMatrix,
    pub fixed_placements: Vec<FixedPlacement>,
    pub allowed_overlaps: Vec<AllowedOverlap>,
    pub slot_restrictions: Vec<SlotRestriction>,
    pub day_spans: Vec<TeacherDaySpan>,
    pub weights: PreferenceWeights,
    /// Wall-clock budget handed to the solver.
    pub time_limit: Duration,
}

impl Domain {
    /// An empty problem over the given slot grid.
    pub fn new(slots: SlotGrid) -> Self {
        Domain {
            slots,
            buildings: Vec::new(),
            subjects: Vec::new(),
            batches: Vec::new(),
            faculty: FacultyTable::default(),
            travel: TravelMatrix::default(),
            fixed_placements: Vec::new(),
            allowed_overlaps: Vec::new(),
            slot_restrictions: Vec::new(),
            day_spans: Vec::new(),
            weights: PreferenceWeights::default(),
            time_limit: DEFAULT_TIME_LIMIT,
        }
    }

    pub fn batch(&self, id: &BatchId) -> Option<&Batch> {
        self.batches.iter().find(|batch| &batch.id == id)
    }

    /// The subjects a batch may take in a slot, or `None` when the slot is unrestricted.
    pub fn restriction(&self, batch: &BatchId, slot: SlotId) -> Option<&BTreeSet<SubjectId>> {
        self.slot_restrictions
            .iter()
            .find(|restriction| &restriction.batch == batch && restriction.slot == slot)
            .map(|restriction| &restriction.subjects)
    }

    /// The subjects a batch may take in a slot, after applying any slot restriction.
    pub fn admissible_subjects<'a>(
        &'a self,
        batch: &'a Batch,
        slot: SlotId,
    ) -> impl Iterator<Item = &'a SubjectId> + 'a {
        let restriction = self.restriction(&batch.id, slot);
        batch
            .subjects
            .iter()
            .filter(move |subject| restriction.map_or(true, |allowed| allowed.contains(*subject)))
    }

    pub fn overlap_allowed_within(
        &self,
        teacher: &TeacherId,
        slot: SlotId,
        building: &BuildingId,
    ) -> bool {
        self.allowed_overlaps
            .iter()
            .any(|overlap| overlap.permits_within(teacher, slot, building))
    }

    pub fn overlap_allowed_across(
        &self,
        teacher: &TeacherId,
        slot: SlotId,
        first: &BuildingId,
        second: &BuildingId,
    ) -> bool {
        self.allowed_overlaps
            .iter()
            .any(|overlap| overlap.permits_across(teacher, slot, first, second))
    }

    /// Whether a teacher may not be in both buildings during the same slot.
    pub fn is_travel_conflict(
        &self,
        teacher: &TeacherId,
        slot: SlotId,
        first: &BuildingId,
        second: &BuildingId,
    ) -> bool {
        first != second
            && self.travel.requires_travel(first, second)
            && !self.overlap_allowed_across(teacher, slot, first, second)
    }

    /// Whether a building is a trip away from more than half of the other buildings.
    pub fn is_remote(&self, building: &BuildingId) -> bool {
        let others = self
            .buildings
            .iter()
            .filter(|other| *other != building)
            .collect::<Vec<_>>();
        let far = others
            .iter()
            .filter(|other| self.travel.requires_travel(building, other))
            .count();
        !others.is_empty() && 2 * far > others.len()
    }

    /// Checks the input constraints which do not need a model: every reference resolves, every
    /// required session has a teacher and every fixed placement is consistent with its batch.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(subject) = self.subjects.iter().duplicates().next() {
            return Err(ConfigError::DuplicateSubject {
                context: "the subject list".to_owned(),
                subject: subject.clone(),
            });
        }

        let mut seen = BTreeSet::new();
        for batch in &self.batches {
            if !seen.insert(&batch.id) {
                return Err(ConfigError::DuplicateBatch {
                    batch: batch.id.clone(),
                });
            }
            self.validate_batch(batch)?;
        }

        for placement in &self.fixed_placements {
            self.validate_fixed_placement(placement)?;
        }

        for overlap in &self.allowed_overlaps {
            if let Some(building) = overlap
                .buildings
                .iter()
                .find(|building| !self.buildings.contains(building))
            {
                return Err(ConfigError::UnknownBuildingReference {
                    context: format!("allowed overlap of {}", overlap.teacher),
                    building: building.clone(),
                });
            }
        }

        for restriction in &self.slot_restrictions {
            let context = format!("slot restriction at slot {}", restriction.slot);
            let batch = self
                .batch(&restriction.batch)
                .ok_or_else(|| ConfigError::UnknownBatch {
                    context: context.clone(),
                    batch: restriction.batch.clone(),
                })?;
            if let Some(subject) = restriction
                .subjects
                .iter()
                .find(|subject| !batch.takes(subject))
            {
                return Err(ConfigError::UnknownSubject {
                    context,
                    subject: subject.clone(),
                });
            }
        }

        for span in &self.day_spans {
            for slot in [span.early, span.late] {
                if self.slots.get(slot).is_none() {
                    return Err(ConfigError::DaySpanSlotOutOfRange {
                        teacher: span.teacher.clone(),
                        slot,
                    });
                }
            }
        }

        self.warn_about_missing_travel_entries();

        Ok(())
    }

    fn validate_batch(&self, batch: &Batch) -> Result<(), ConfigError> {
        if !self.buildings.contains(&batch.building) {
            return Err(ConfigError::UnknownBuilding {
                batch: batch.id.clone(),
                building: batch.building.clone(),
            });
        }

        if batch.usable_slots.is_empty() {
            return Err(ConfigError::NoUsableSlots {
                batch: batch.id.clone(),
            });
        }

        for &slot in &batch.usable_slots {
            match self.slots.kind(slot) {
                None => {
                    return Err(ConfigError::SlotOutOfRange {
                        batch: batch.id.clone(),
                        slot,
                    })
                }
                Some(kind) if !kind.is_teachable() => {
                    return Err(ConfigError::UnusableSlot {
                        batch: batch.id.clone(),
                        slot,
                        kind,
                    })
                }
                Some(_) => {}
            }
        }

        if let Some(&slot) = batch
            .double_weight_slots
            .iter()
            .find(|slot| !batch.is_usable(**slot))
        {
            return Err(ConfigError::DoubleWeightSlotNotUsable {
                batch: batch.id.clone(),
                slot,
            });
        }

        if let Some(subject) = batch.subjects.iter().duplicates().next() {
            return Err(ConfigError::DuplicateSubject {
                context: format!("batch {}", batch.id),
                subject: subject.clone(),
            });
        }

        for subject in &batch.subjects {
            if !self.subjects.contains(subject) {
                return Err(ConfigError::UnknownSubject {
                    context: format!("batch {}", batch.id),
                    subject: subject.clone(),
                });
            }

            for session in Session::ALL {
                if self.faculty.teacher(&batch.id, subject, session).is_none() {
                    return Err(ConfigError::MissingFacultyAssignment {
                        batch: batch.id.clone(),
                        subject: subject.clone(),
                        session,
                    });
                }
            }
        }

        if let Some(subject) = batch
            .single_trip_subjects
            .iter()
            .find(|subject| !batch.takes(subject))
        {
            return Err(ConfigError::SingleTripSubjectNotTaken {
                batch: batch.id.clone(),
                subject: subject.clone(),
            });
        }

        Ok(())
    }

    fn validate_fixed_placement(&self, placement: &FixedPlacement) -> Result<(), ConfigError> {
        let batch = self
            .batch(&placement.batch)
            .ok_or_else(|| ConfigError::UnknownBatch {
                context: format!("fixed placement at slot {}", placement.slot),
                batch: placement.batch.clone(),
            })?;

        if !batch.is_usable(placement.slot) {
            return Err(ConfigError::FixedSlotNotUsable {
                batch: batch.id.clone(),
                slot: placement.slot,
                subject: placement.subject.clone(),
            });
        }

        if !batch.takes(&placement.subject) {
            return Err(ConfigError::FixedSubjectNotTaken {
                batch: batch.id.clone(),
                slot: placement.slot,
                subject: placement.subject.clone(),
            });
        }

        if let Some(expected) = self
            .faculty
            .teacher(&batch.id, &placement.subject, placement.session)
        {
            if expected != &placement.teacher {
                return Err(ConfigError::FixedTeacherMismatch {
                    batch: batch.id.clone(),
                    slot: placement.slot,
                    subject: placement.subject.clone(),
                    session: placement.session,
                    expected: expected.clone(),
                    found: placement.teacher.clone(),
                });
            }
        }

        Ok(())
    }

    fn warn_about_missing_travel_entries(&self) {
        let used = self
            .batches
            .iter()
            .map(|batch| &batch.building)
            .collect::<BTreeSet<_>>();
        for (first, second) in used.iter().tuple_combinations() {
            if !self.travel.contains(first, second) {
                warn!("No travel penalty between {first} and {second}; assuming they can be combined");
            }
        }
    }
}
