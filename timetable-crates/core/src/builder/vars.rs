use std::collections::BTreeMap;
use std::fmt::Display;
use std::fmt::Formatter;

use crate::domain::BatchId;
use crate::domain::Session;
use crate::domain::SlotId;
use crate::domain::SubjectId;
use crate::model::BoolVar;
use crate::model::IntVar;

/// What a (batch, slot) assignment variable can take.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SlotValue {
    Unused,
    Lesson { subject: SubjectId, session: Session },
    /// Both sessions of the subject in one double-weight slot.
    Double { subject: SubjectId },
}

impl SlotValue {
    pub fn subject(&self) -> Option<&SubjectId> {
        match self {
            SlotValue::Unused => None,
            SlotValue::Lesson { subject, .. } | SlotValue::Double { subject } => Some(subject),
        }
    }
}

impl Display for SlotValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SlotValue::Unused => f.write_str("unused"),
            SlotValue::Lesson { subject, session } => write!(f, "{subject}/{}", session.index()),
            SlotValue::Double { subject } => write!(f, "{subject}/2x"),
        }
    }
}

/// The decision variable of one (batch, slot) pair and the meaning of each of its values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotVariable {
    pub var: IntVar,
    /// `values[v]` is the meaning of `var = v`.
    pub values: Vec<SlotValue>,
}

impl SlotVariable {
    pub fn value_of(&self, value: &SlotValue) -> Option<i32> {
        self.values
            .iter()
            .position(|candidate| candidate == value)
            .and_then(|index| i32::try_from(index).ok())
    }

    pub fn decode(&self, value: i32) -> Option<&SlotValue> {
        usize::try_from(value)
            .ok()
            .and_then(|index| self.values.get(index))
    }
}

/// Handles to every variable the model builder creates, keyed by what they mean.
#[derive(Clone, Debug, Default)]
pub struct AssignmentVars {
    pub(crate) slots: BTreeMap<(BatchId, SlotId), SlotVariable>,
    /// `lessons[(b, t, s, i)] ⇔ slot t of batch b holds session i of subject s`.
    pub(crate) lessons: BTreeMap<(BatchId, SlotId, SubjectId, Session), BoolVar>,
    /// `doubles[(b, t, s)] ⇔ double-weight slot t of batch b holds both sessions of s`.
    pub(crate) doubles: BTreeMap<(BatchId, SlotId, SubjectId), BoolVar>,
    /// `carried[(b, s)] ⇔ some double-weight slot of b holds s`.
    pub(crate) carried: BTreeMap<(BatchId, SubjectId), BoolVar>,
}

impl AssignmentVars {
    pub fn slot(&self, batch: &BatchId, slot: SlotId) -> Option<&SlotVariable> {
        self.slots.get(&(batch.clone(), slot))
    }

    pub fn iter_slots(&self) -> impl Iterator<Item = (&BatchId, SlotId, &SlotVariable)> {
        self.slots
            .iter()
            .map(|((batch, slot), variable)| (batch, *slot, variable))
    }

    pub fn lesson(
        &self,
        batch: &BatchId,
        slot: SlotId,
        subject: &SubjectId,
        session: Session,
    ) -> Option<BoolVar> {
        self.lessons
            .get(&(batch.clone(), slot, subject.clone(), session))
            .copied()
    }

    pub fn double(&self, batch: &BatchId, slot: SlotId, subject: &SubjectId) -> Option<BoolVar> {
        self.doubles
            .get(&(batch.clone(), slot, subject.clone()))
            .copied()
    }

    /// The double-weight indicators of a subject for a batch, in slot order.
    pub fn doubles_of<'a>(
        &'a self,
        batch: &'a BatchId,
        subject: &'a SubjectId,
    ) -> impl Iterator<Item = BoolVar> + 'a {
        self.doubles
            .iter()
            .filter(move |((b, _, s), _)| b == batch && s == subject)
            .map(|(_, var)| *var)
    }

    /// The indicators placing one session of a subject, in slot order.
    pub fn lessons_of<'a>(
        &'a self,
        batch: &'a BatchId,
        subject: &'a SubjectId,
        session: Session,
    ) -> impl Iterator<Item = BoolVar> + 'a {
        self.lessons
            .iter()
            .filter(move |((b, _, s, i), _)| b == batch && s == subject && *i == session)
            .map(|(_, var)| *var)
    }

    pub fn carried(&self, batch: &BatchId, subject: &SubjectId) -> Option<BoolVar> {
        self.carried.get(&(batch.clone(), subject.clone())).copied()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
