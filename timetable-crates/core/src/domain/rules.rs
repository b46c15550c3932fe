use std::collections::BTreeSet;

use super::BatchId;
use super::BuildingId;
use super::Session;
use super::SlotId;
use super::SubjectId;
use super::TeacherId;

/// A placement that must appear unchanged in every timetable.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct FixedPlacement {
    pub batch: BatchId,
    pub slot: SlotId,
    pub subject: SubjectId,
    pub teacher: TeacherId,
    pub session: Session,
}

/// Permits a teacher to be in several batches at one slot, as long as all of them are taught
/// in the listed buildings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllowedOverlap {
    pub teacher: TeacherId,
    pub slot: SlotId,
    pub buildings: BTreeSet<BuildingId>,
}

impl AllowedOverlap {
    pub fn permits_within(&self, teacher: &TeacherId, slot: SlotId, building: &BuildingId) -> bool {
        &self.teacher == teacher && self.slot == slot && self.buildings.contains(building)
    }

    pub fn permits_across(
        &self,
        teacher: &TeacherId,
        slot: SlotId,
        first: &BuildingId,
        second: &BuildingId,
    ) -> bool {
        self.permits_within(teacher, slot, first) && self.buildings.contains(second)
    }
}

/// Limits the subjects a batch may take in one slot, e.g. an early-morning slot reserved for
/// a single subject.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotRestriction {
    pub batch: BatchId,
    pub slot: SlotId,
    pub subjects: BTreeSet<SubjectId>,
}

/// A teacher who teaches in `early` may not also teach in `late` on the same day.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TeacherDaySpan {
    pub teacher: TeacherId,
    pub early: SlotId,
    pub late: SlotId,
}

/// Weights of the adjacency objective.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PreferenceWeights {
    /// Weight for batches in co-located buildings.
    pub near: u32,
    /// Weight for batches in buildings far from most others.
    pub far: u32,
}

impl Default for PreferenceWeights {
    fn default() -> Self {
        PreferenceWeights { near: 50, far: 100 }
    }
}
