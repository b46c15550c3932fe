use std::fmt::Display;
use std::fmt::Formatter;

use serde::Deserialize;
use serde::Serialize;

macro_rules! name_id {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(name: impl Into<String>) -> Self {
                $name(name.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                $name(value.to_owned())
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

name_id!(
    /// A student cohort, e.g. `AK-JR-1`.
    BatchId
);
name_id!(
    /// A course taught to a batch.
    SubjectId
);
name_id!(
    /// An instructor.
    TeacherId
);
name_id!(
    /// A physical building in which batches are taught.
    BuildingId
);

/// The ordinal position of a time slot within the day.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(pub usize);

impl SlotId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl Display for SlotId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Distinguishes the two weekly occurrences of a subject.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Session {
    First,
    Second,
}

impl Session {
    pub const ALL: [Session; 2] = [Session::First, Session::Second];

    pub fn index(self) -> usize {
        match self {
            Session::First => 0,
            Session::Second => 1,
        }
    }

    pub fn from_index(index: usize) -> Option<Session> {
        match index {
            0 => Some(Session::First),
            1 => Some(Session::Second),
            _ => None,
        }
    }
}

impl Display for Session {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "session {}", self.index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_indices_round_trip() {
        for session in Session::ALL {
            assert_eq!(Session::from_index(session.index()), Some(session));
        }
        assert_eq!(Session::from_index(2), None);
    }

    #[test]
    fn ids_serialise_as_plain_strings() {
        let id = BatchId::from("AK-JR-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"AK-JR-1\"");
        assert_eq!(id.to_string(), "AK-JR-1");
    }
}
