use std::collections::BTreeMap;

use super::BatchId;
use super::Session;
use super::SubjectId;
use super::TeacherId;

/// The immutable mapping from (batch, subject, session) to the teacher who gives it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FacultyTable {
    entries: BTreeMap<(BatchId, SubjectId, Session), TeacherId>,
}

impl FacultyTable {
    /// Register the teacher of a session, returning the teacher it replaces (if any).
    pub fn assign(
        &mut self,
        batch: BatchId,
        subject: SubjectId,
        session: Session,
        teacher: TeacherId,
    ) -> Option<TeacherId> {
        self.entries.insert((batch, subject, session), teacher)
    }

    /// Register the same teacher for both sessions of a subject.
    pub fn assign_both(&mut self, batch: &BatchId, subject: &SubjectId, teacher: &TeacherId) {
        for session in Session::ALL {
            let _ = self.assign(batch.clone(), subject.clone(), session, teacher.clone());
        }
    }

    pub fn teacher(
        &self,
        batch: &BatchId,
        subject: &SubjectId,
        session: Session,
    ) -> Option<&TeacherId> {
        self.entries
            .get(&(batch.clone(), subject.clone(), session))
    }

    /// The distinct teachers of both sessions of a subject, in session order.
    pub fn teachers_of(&self, batch: &BatchId, subject: &SubjectId) -> Vec<&TeacherId> {
        let mut teachers: Vec<&TeacherId> = Vec::with_capacity(2);
        for session in Session::ALL {
            if let Some(teacher) = self.teacher(batch, subject, session) {
                if !teachers.contains(&teacher) {
                    teachers.push(teacher);
                }
            }
        }
        teachers
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(BatchId, SubjectId, Session), &TeacherId)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
