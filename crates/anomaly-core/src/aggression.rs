//! Aggression Level
//!
//! Maps the number of live anomalies to the state index consumed by the
//! monster behaviour controller.

use serde::{Deserialize, Serialize};

/// Highest level the behaviour controller understands.
pub const MAX_AGGRESSION: u8 = 3;

/// One row of the table: at `min_active` or more live anomalies the level is
/// at least `level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggressionStep {
    pub min_active: usize,
    pub level: u8,
}

/// Ordered count → level table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<AggressionStep>", into = "Vec<AggressionStep>")]
pub struct AggressionTable {
    steps: Vec<AggressionStep>,
}

impl AggressionTable {
    /// Builds a table; steps are sorted by `min_active` and levels clamped to
    /// [`MAX_AGGRESSION`].
    pub fn new(steps: impl IntoIterator<Item = AggressionStep>) -> Self {
        let mut steps: Vec<AggressionStep> = steps
            .into_iter()
            .map(|s| AggressionStep {
                min_active: s.min_active,
                level: s.level.min(MAX_AGGRESSION),
            })
            .collect();
        steps.sort_by_key(|s| s.min_active);
        Self { steps }
    }

    /// Level for `active` live anomalies: the row with the largest
    /// `min_active` not above `active`, or 0 below the first row.
    pub fn level_for(&self, active: usize) -> u8 {
        self.steps
            .iter()
            .take_while(|s| s.min_active <= active)
            .last()
            .map_or(0, |s| s.level)
    }

    pub fn steps(&self) -> &[AggressionStep] {
        &self.steps
    }
}

impl Default for AggressionTable {
    fn default() -> Self {
        Self::new([
            AggressionStep { min_active: 0, level: 0 },
            AggressionStep { min_active: 2, level: 1 },
            AggressionStep { min_active: 4, level: 2 },
            AggressionStep { min_active: 5, level: 3 },
        ])
    }
}

impl From<Vec<AggressionStep>> for AggressionTable {
    fn from(steps: Vec<AggressionStep>) -> Self {
        Self::new(steps)
    }
}

impl From<AggressionTable> for Vec<AggressionStep> {
    fn from(table: AggressionTable) -> Self {
        table.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let table = AggressionTable::default();
        let levels: Vec<u8> = (0..8).map(|n| table.level_for(n)).collect();
        assert_eq!(levels, vec![0, 0, 1, 1, 2, 3, 3, 3]);
    }

    #[test]
    fn test_unsorted_input_is_ordered() {
        let table = AggressionTable::new([
            AggressionStep { min_active: 3, level: 2 },
            AggressionStep { min_active: 1, level: 1 },
        ]);
        assert_eq!(table.level_for(0), 0);
        assert_eq!(table.level_for(1), 1);
        assert_eq!(table.level_for(3), 2);
    }

    #[test]
    fn test_levels_clamped() {
        let table = AggressionTable::new([AggressionStep { min_active: 1, level: 9 }]);
        assert_eq!(table.level_for(1), MAX_AGGRESSION);
    }
}
