use std::collections::BTreeMap;

use super::BuildingId;

/// A travel penalty between two buildings: 0 means a teacher can serve both in the same slot.
pub type Penalty = u32;

/// Symmetric travel penalties between buildings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TravelMatrix {
    penalties: BTreeMap<(BuildingId, BuildingId), Penalty>,
}

impl TravelMatrix {
    pub fn set(&mut self, first: BuildingId, second: BuildingId, penalty: Penalty) {
        let _ = self.penalties.insert(Self::key(first, second), penalty);
    }

    /// The penalty between two buildings. The same building has no penalty, and neither has
    /// a pair the matrix does not mention.
    pub fn penalty(&self, first: &BuildingId, second: &BuildingId) -> Penalty {
        if first == second {
            return 0;
        }
        self.penalties
            .get(&Self::key(first.clone(), second.clone()))
            .copied()
            .unwrap_or(0)
    }

    pub fn contains(&self, first: &BuildingId, second: &BuildingId) -> bool {
        first == second
            || self
                .penalties
                .contains_key(&Self::key(first.clone(), second.clone()))
    }

    /// Whether a teacher cannot be in both buildings within one slot.
    pub fn requires_travel(&self, first: &BuildingId, second: &BuildingId) -> bool {
        self.penalty(first, second) > 0
    }

    fn key(first: BuildingId, second: BuildingId) -> (BuildingId, BuildingId) {
        if first <= second {
            (first, second)
        } else {
            (second, first)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn penalties_are_symmetric() {
        let mut matrix = TravelMatrix::default();
        matrix.set("Building_3".into(), "Building_1".into(), 1);

        assert_eq!(matrix.penalty(&"Building_1".into(), &"Building_3".into()), 1);
        assert!(matrix.requires_travel(&"Building_3".into(), &"Building_1".into()));
    }

    #[test]
    fn same_or_unknown_pairs_have_no_penalty() {
        let matrix = TravelMatrix::default();
        assert_eq!(matrix.penalty(&"B1".into(), &"B1".into()), 0);
        assert_eq!(matrix.penalty(&"B1".into(), &"B2".into()), 0);
        assert!(matrix.contains(&"B1".into(), &"B1".into()));
        assert!(!matrix.contains(&"B1".into(), &"B2".into()));
    }
}
