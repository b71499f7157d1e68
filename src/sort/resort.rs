//! Full stable resort with change detection
//!
//! Keys are re-derived from the row data of the current sort column rather
//! than trusted from the last stamp, since the column behind the sort may
//! have been updated in place since the row was inserted.

use std::cmp::Ordering;

use crate::errors::TableError;
use crate::schema::RowData;
use crate::store::Row;

use super::collation::SortSpec;

/// Result of planning a resort
#[derive(Debug)]
pub struct ResortOutcome {
    /// Whether any row moved
    pub changed: bool,
    /// New position `i` holds the row previously at `permutation[i]`
    pub permutation: Vec<usize>,
    /// Freshly derived key for each row, in the new order
    pub keys: Vec<Option<String>>,
    /// Comparisons that needed the fallback ordering
    pub fallbacks: usize,
    /// First comparison failure seen
    pub failure: Option<TableError>,
}

impl ResortOutcome {
    /// Outcome that moves nothing
    pub fn unchanged(keys: Vec<Option<String>>) -> Self {
        Self {
            changed: false,
            permutation: (0..keys.len()).collect(),
            keys,
            fallbacks: 0,
            failure: None,
        }
    }
}

/// Compute the stable order of `rows` under `spec`
///
/// Never fails: keys that cannot be compared under the collation fall back
/// to the collation's total safe ordering.
pub fn plan_resort<D: RowData>(rows: &[Row<D>], spec: &SortSpec) -> ResortOutcome {
    let keys: Vec<Option<String>> = rows.iter().map(|r| r.data.cell(spec.column)).collect();
    if rows.len() < 2 {
        return ResortOutcome::unchanged(keys);
    }

    let cmp = spec.comparator();
    let mut permutation: Vec<usize> = (0..rows.len()).collect();
    permutation.sort_by(|&a, &b| cmp.compare(keys[a].as_deref(), keys[b].as_deref()));

    let changed = permutation.iter().enumerate().any(|(i, &p)| i != p);

    ResortOutcome {
        changed,
        keys: permutation.iter().map(|&p| keys[p].clone()).collect(),
        permutation,
        fallbacks: cmp.fallbacks(),
        failure: cmp.take_failure(),
    }
}

/// Whether `rows` is already ordered under `spec` using their stamped keys
pub fn is_sorted<D>(rows: &[Row<D>], spec: &SortSpec) -> bool {
    let cmp = spec.comparator();
    rows.windows(2)
        .all(|w| cmp.compare(w[0].key(), w[1].key()) != Ordering::Greater)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CellRow, ColumnId};
    use crate::sort::Collation;
    use crate::store::RowId;

    fn rows(values: &[&str]) -> Vec<Row<CellRow>> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| Row::new(RowId(i as u64), i as u64, CellRow::from_cells([*v])))
            .collect()
    }

    #[test]
    fn test_empty_and_single_are_noops() {
        let spec = SortSpec::asc(ColumnId(0), Collation::Numeric);
        assert!(!plan_resort::<CellRow>(&[], &spec).changed);
        let one = plan_resort(&rows(&["4"]), &spec);
        assert!(!one.changed);
        assert_eq!(one.keys, vec![Some("4".to_string())]);
    }

    #[test]
    fn test_sorted_input_reports_unchanged() {
        let spec = SortSpec::asc(ColumnId(0), Collation::Numeric);
        let outcome = plan_resort(&rows(&["1", "2", "2", "10"]), &spec);
        assert!(!outcome.changed);
        assert_eq!(outcome.permutation, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_stable_permutation() {
        let spec = SortSpec::desc(ColumnId(0), Collation::Numeric);
        let outcome = plan_resort(&rows(&["1", "5", "3", "5"]), &spec);
        assert!(outcome.changed);
        assert_eq!(outcome.permutation, vec![1, 3, 2, 0]);
        assert_eq!(
            outcome.keys,
            vec![
                Some("5".to_string()),
                Some("5".to_string()),
                Some("3".to_string()),
                Some("1".to_string())
            ]
        );
    }

    #[test]
    fn test_keys_rederived_from_data() {
        let mut input = rows(&["2", "1"]);
        input[0].sort_key = Some("stale".into());
        let spec = SortSpec::asc(ColumnId(0), Collation::Numeric);
        let outcome = plan_resort(&input, &spec);
        assert_eq!(outcome.permutation, vec![1, 0]);
        assert_eq!(outcome.fallbacks, 0);
    }

    #[test]
    fn test_parse_failures_do_not_abort() {
        let spec = SortSpec::asc(ColumnId(0), Collation::Numeric);
        let outcome = plan_resort(&rows(&["b", "3", "a", "1"]), &spec);
        assert_eq!(outcome.permutation, vec![3, 1, 2, 0]);
        assert!(outcome.fallbacks > 0);
        assert!(outcome.failure.is_some());
    }

    #[test]
    fn test_is_sorted_uses_stamped_keys() {
        let mut input = rows(&["1", "2"]);
        input[0].sort_key = Some("1".into());
        input[1].sort_key = Some("2".into());
        let spec = SortSpec::asc(ColumnId(0), Collation::Numeric);
        assert!(is_sorted(&input, &spec));
        assert!(!is_sorted(&input, &SortSpec::desc(ColumnId(0), Collation::Numeric)));
    }
}
