//! Sorting for live tables
//!
//! - Collation of sort keys (character and numeric)
//! - Incremental placement of newly arriving rows
//! - Full stable resort with change detection

mod collation;
mod inserter;
mod resort;

pub use collation::{Collation, KeyComparator, SortSpec};
pub use inserter::insertion_index;
pub use resort::{is_sorted, plan_resort, ResortOutcome};
