use crate::model::*;

use super::EngineError;

/// Smallest table that seats the party. Ties go to the earliest table in
/// input order. Flagged optimal only on an exact capacity match.
pub fn find_optimal(tables: &[Table], party_size: u32) -> Option<RankedTable> {
    tables
        .iter()
        .filter(|t| t.capacity >= party_size)
        .min_by_key(|t| t.capacity)
        .map(|t| RankedTable {
            table: t.clone(),
            is_optimal: t.capacity == party_size,
        })
}

/// Tables that seat the party, least wasted capacity first.
///
/// Tables that are too small are dropped rather than ranked last. The sort is
/// stable, so equal waste keeps input order.
pub fn rank(tables: &[Table], party_size: u32) -> Vec<RankedTable> {
    let mut suitable: Vec<&Table> = tables.iter().filter(|t| t.capacity >= party_size).collect();
    suitable.sort_by_key(|t| t.capacity - party_size);
    suitable
        .into_iter()
        .enumerate()
        .map(|(i, t)| RankedTable {
            table: t.clone(),
            is_optimal: i == 0 && t.capacity == party_size,
        })
        .collect()
}

/// Joining several tables for one oversized party.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableCombination {
    /// Combination booking is not implemented.
    NotSupported,
}

impl TableCombination {
    /// Candidate table groups. Always empty while unsupported.
    pub fn groups(&self) -> Vec<Vec<Table>> {
        match self {
            TableCombination::NotSupported => Vec::new(),
        }
    }
}

pub fn suggest_combinations(_tables: &[Table], _party_size: u32) -> TableCombination {
    TableCombination::NotSupported
}

pub fn utilization(table: &Table, party_size: u32) -> Result<Utilization, EngineError> {
    if table.capacity == 0 {
        return Err(EngineError::InvalidArgument("table capacity must be positive"));
    }
    Ok(Utilization {
        utilization_percent: f64::from(party_size) / f64::from(table.capacity) * 100.0,
        wasted_seats: i64::from(table.capacity) - i64::from(party_size),
    })
}
