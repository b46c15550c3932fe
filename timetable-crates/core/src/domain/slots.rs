use serde::Deserialize;
use serde::Serialize;

use super::SlotId;

/// The role a slot plays in the daily grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    #[default]
    Working,
    Lunch,
    Blocked,
    /// A slot long enough to hold both session-units of a subject in one placement.
    DoubleWeight,
}

impl SlotKind {
    /// Whether lessons may ever be placed in a slot of this kind.
    pub fn is_teachable(self) -> bool {
        matches!(self, SlotKind::Working | SlotKind::DoubleWeight)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimeSlot {
    pub label: String,
    pub kind: SlotKind,
}

impl TimeSlot {
    pub fn new(label: impl Into<String>, kind: SlotKind) -> Self {
        TimeSlot {
            label: label.into(),
            kind,
        }
    }
}

/// The ordered slots of one teaching day.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SlotGrid {
    slots: Vec<TimeSlot>,
}

impl SlotGrid {
    pub fn new(slots: Vec<TimeSlot>) -> Self {
        SlotGrid { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, slot: SlotId) -> Option<&TimeSlot> {
        self.slots.get(slot.index())
    }

    pub fn kind(&self, slot: SlotId) -> Option<SlotKind> {
        self.get(slot).map(|time_slot| time_slot.kind)
    }

    /// The label of the slot, or its ordinal if the slot is not part of the grid.
    pub fn label(&self, slot: SlotId) -> String {
        self.get(slot)
            .map(|time_slot| time_slot.label.clone())
            .unwrap_or_else(|| slot.to_string())
    }

    pub fn find_by_label(&self, label: &str) -> Option<SlotId> {
        self.slots
            .iter()
            .position(|time_slot| time_slot.label == label)
            .map(SlotId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &TimeSlot)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .map(|(index, time_slot)| (SlotId(index), time_slot))
    }

    /// The slots strictly between `first` and `second`.
    pub fn between(&self, first: SlotId, second: SlotId) -> impl Iterator<Item = SlotId> {
        let (low, high) = if first <= second {
            (first, second)
        } else {
            (second, first)
        };
        (low.index() + 1..high.index()).map(SlotId)
    }

    /// Two slots are back-to-back when every slot separating them is a lunch slot.
    pub fn are_adjacent(&self, first: SlotId, second: SlotId) -> bool {
        first != second
            && self
                .between(first, second)
                .all(|slot| self.kind(slot) == Some(SlotKind::Lunch))
    }
}
