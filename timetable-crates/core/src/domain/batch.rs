use std::collections::BTreeSet;

use super::BatchId;
use super::BuildingId;
use super::SlotGrid;
use super::SlotId;
use super::SlotKind;
use super::SubjectId;

/// Every (batch, subject) pair requires this many session-units per week.
pub const UNITS_PER_SUBJECT: usize = 2;

/// A student cohort together with the slots it may be taught in and the subjects it takes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Batch {
    pub id: BatchId,
    pub building: BuildingId,
    /// Ordered by position in the day.
    pub usable_slots: Vec<SlotId>,
    pub subjects: Vec<SubjectId>,
    /// Slots which count double for this batch, on top of the grid-wide double-weight slots.
    pub double_weight_slots: BTreeSet<SlotId>,
    /// Subjects whose two units must be grouped into a single trip.
    pub single_trip_subjects: BTreeSet<SubjectId>,
    /// A fully fixed batch takes no part in the adjacency objective.
    pub fully_fixed: bool,
}

impl Batch {
    pub fn new(
        id: impl Into<BatchId>,
        building: impl Into<BuildingId>,
        usable_slots: impl IntoIterator<Item = SlotId>,
        subjects: impl IntoIterator<Item = SubjectId>,
    ) -> Self {
        let mut usable_slots = usable_slots.into_iter().collect::<Vec<_>>();
        usable_slots.sort();
        usable_slots.dedup();

        Batch {
            id: id.into(),
            building: building.into(),
            usable_slots,
            subjects: subjects.into_iter().collect(),
            double_weight_slots: BTreeSet::new(),
            single_trip_subjects: BTreeSet::new(),
            fully_fixed: false,
        }
    }

    pub fn is_usable(&self, slot: SlotId) -> bool {
        self.usable_slots.binary_search(&slot).is_ok()
    }

    pub fn takes(&self, subject: &SubjectId) -> bool {
        self.subjects.contains(subject)
    }

    pub fn is_double_weight(&self, grid: &SlotGrid, slot: SlotId) -> bool {
        self.double_weight_slots.contains(&slot) || grid.kind(slot) == Some(SlotKind::DoubleWeight)
    }

    pub fn double_weight_count(&self, grid: &SlotGrid) -> usize {
        self.usable_slots
            .iter()
            .filter(|&&slot| self.is_double_weight(grid, slot))
            .count()
    }

    pub fn required_units(&self) -> usize {
        UNITS_PER_SUBJECT * self.subjects.len()
    }

    /// The largest number of session-units the usable slots can hold.
    pub fn capacity(&self, grid: &SlotGrid) -> usize {
        let doubles = self.double_weight_count(grid);
        self.usable_slots.len() - doubles + UNITS_PER_SUBJECT * doubles
    }

    /// Pairs of usable single-weight slots which follow each other in the day, possibly across
    /// lunch but never across a blocked or otherwise unusable slot.
    pub fn adjacent_pairs(&self, grid: &SlotGrid) -> Vec<(SlotId, SlotId)> {
        self.usable_slots
            .windows(2)
            .map(|window| (window[0], window[1]))
            .filter(|&(first, second)| {
                !self.is_double_weight(grid, first)
                    && !self.is_double_weight(grid, second)
                    && grid.are_adjacent(first, second)
            })
            .collect()
    }

    /// Whether some usable slot can stay empty in a complete timetable.
    pub fn has_slack(&self, grid: &SlotGrid) -> bool {
        self.capacity(grid) > self.required_units()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TimeSlot;

    #[test]
    fn double_weight_slots_count_twice_towards_capacity() {
        let grid = SlotGrid::new(
            (0..5)
                .map(|index| TimeSlot::new(format!("S{index}"), SlotKind::Working))
                .collect(),
        );
        let mut batch = Batch::new(
            BatchId::from("9th_CLASS"),
            "Building_3",
            [SlotId(1), SlotId(2), SlotId(3), SlotId(4)],
            ["PHYSICS", "MATHS"].map(SubjectId::from),
        );
        assert_eq!(batch.capacity(&grid), 4);
        assert!(!batch.has_slack(&grid));

        let _ = batch.double_weight_slots.insert(SlotId(4));
        assert_eq!(batch.capacity(&grid), 5);
        assert!(batch.has_slack(&grid));
    }

    #[test]
    fn adjacent_pairs_skip_double_weight_and_gapped_slots() {
        let grid = SlotGrid::new(vec![
            TimeSlot::new("8:30-10:00", SlotKind::Working),
            TimeSlot::new("10:00-11:30", SlotKind::Working),
            TimeSlot::new("11:30-1:00", SlotKind::Working),
            TimeSlot::new("1:00-2:00", SlotKind::Lunch),
            TimeSlot::new("2:00-3:30", SlotKind::Working),
            TimeSlot::new("3:30-5:00", SlotKind::Working),
            TimeSlot::new("5:30-7:00", SlotKind::Working),
        ]);
        let mut ninth = Batch::new(
            "9th_CLASS",
            "Building_3",
            [1, 2, 4, 5, 6].map(SlotId),
            ["PHYSICS", "MATHS", "CHEM"].map(SubjectId::from),
        );
        let _ = ninth.double_weight_slots.insert(SlotId(6));

        assert_eq!(
            ninth.adjacent_pairs(&grid),
            vec![
                (SlotId(1), SlotId(2)),
                (SlotId(2), SlotId(4)),
                (SlotId(4), SlotId(5))
            ]
        );

        let gapped = Batch::new(
            "GAPPED",
            "Building_1",
            [0, 2, 4].map(SlotId),
            [SubjectId::from("MATHS")],
        );
        assert_eq!(gapped.adjacent_pairs(&grid), vec![(SlotId(2), SlotId(4))]);
    }

    #[test]
    fn usable_slots_are_kept_in_day_order() {
        let batch = Batch::new(
            BatchId::from("A"),
            "B1",
            [SlotId(4), SlotId(0), SlotId(2), SlotId(0)],
            [SubjectId::from("MATHS")],
        );
        assert_eq!(batch.usable_slots, vec![SlotId(0), SlotId(2), SlotId(4)]);
        assert!(batch.is_usable(SlotId(2)));
        assert!(!batch.is_usable(SlotId(1)));
    }
}
