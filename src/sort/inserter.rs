//! Incremental placement of a new row under the active sort
//!
//! Display order is ascending under the direction-aware comparator, so the
//! boundary row checked by the fast path is always the last row. New rows
//! go after every row whose key compares equal, which makes a sequence of
//! incremental inserts produce the same order as one stable full sort.

use std::cmp::Ordering;

use crate::config::InsertOrder;
use crate::store::Row;

use super::collation::KeyComparator;

/// Index at which a row with `key` should be inserted into `rows`
///
/// With no comparator the row goes to the front or the end according to
/// `order`.
pub fn insertion_index<D>(
    rows: &[Row<D>],
    key: Option<&str>,
    comparator: Option<&KeyComparator>,
    order: InsertOrder,
) -> usize {
    let Some(cmp) = comparator else {
        return match order {
            InsertOrder::Append => rows.len(),
            InsertOrder::Prepend => 0,
        };
    };

    let (Some(first), Some(last)) = (rows.first(), rows.last()) else {
        return 0;
    };

    // Fast paths: the stream usually extends one end of the table
    if cmp.compare(last.key(), key) != Ordering::Greater {
        return rows.len();
    }
    if cmp.compare(first.key(), key) == Ordering::Greater {
        return 0;
    }

    rows.partition_point(|row| cmp.compare(row.key(), key) != Ordering::Greater)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnId;
    use crate::sort::{Collation, SortSpec};
    use crate::store::RowId;

    fn rows(keys: &[Option<&str>]) -> Vec<Row<()>> {
        keys.iter()
            .enumerate()
            .map(|(i, k)| {
                let mut row = Row::new(RowId(i as u64), i as u64, ());
                row.sort_key = k.map(str::to_string);
                row
            })
            .collect()
    }

    fn numeric_asc() -> KeyComparator {
        SortSpec::asc(ColumnId(0), Collation::Numeric).comparator()
    }

    #[test]
    fn test_unsorted_follows_insert_order() {
        let existing = rows(&[Some("1"), Some("2")]);
        assert_eq!(
            insertion_index(&existing, Some("0"), None, InsertOrder::Append),
            2
        );
        assert_eq!(
            insertion_index(&existing, Some("9"), None, InsertOrder::Prepend),
            0
        );
    }

    #[test]
    fn test_empty_table() {
        let cmp = numeric_asc();
        assert_eq!(
            insertion_index::<()>(&[], Some("3"), Some(&cmp), InsertOrder::Append),
            0
        );
    }

    #[test]
    fn test_middle_insert() {
        let existing = rows(&[Some("2"), Some("5"), Some("8")]);
        let cmp = numeric_asc();
        assert_eq!(
            insertion_index(&existing, Some("4"), Some(&cmp), InsertOrder::Append),
            1
        );
    }

    #[test]
    fn test_equal_keys_go_after_existing() {
        let existing = rows(&[Some("2"), Some("5"), Some("5"), Some("8")]);
        let cmp = numeric_asc();
        assert_eq!(
            insertion_index(&existing, Some("5"), Some(&cmp), InsertOrder::Append),
            3
        );
        assert_eq!(
            insertion_index(&existing, Some("8"), Some(&cmp), InsertOrder::Append),
            4
        );
    }

    #[test]
    fn test_boundaries() {
        let existing = rows(&[Some("2"), Some("5")]);
        let cmp = numeric_asc();
        assert_eq!(
            insertion_index(&existing, Some("1"), Some(&cmp), InsertOrder::Append),
            0
        );
        assert_eq!(
            insertion_index(&existing, Some("6"), Some(&cmp), InsertOrder::Append),
            2
        );
    }

    #[test]
    fn test_missing_key_placement() {
        let existing = rows(&[None, Some("2"), Some("5")]);
        let asc = numeric_asc();
        assert_eq!(
            insertion_index(&existing, None, Some(&asc), InsertOrder::Append),
            1
        );

        let desc = SortSpec::desc(ColumnId(0), Collation::Numeric).comparator();
        let existing = rows(&[Some("5"), Some("2"), None]);
        assert_eq!(
            insertion_index(&existing, None, Some(&desc), InsertOrder::Append),
            3
        );
        assert_eq!(
            insertion_index(&existing, Some("3"), Some(&desc), InsertOrder::Append),
            1
        );
    }

    #[test]
    fn test_unparseable_key_still_places() {
        let existing = rows(&[Some("1"), Some("7")]);
        let cmp = numeric_asc();
        assert_eq!(
            insertion_index(&existing, Some("n/a"), Some(&cmp), InsertOrder::Append),
            2
        );
        assert!(cmp.fallbacks() > 0);
    }
}
