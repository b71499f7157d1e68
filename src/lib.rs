//! livetable - bounded, concurrently fed, sortable live tables
//!
//! Producers push samples through a bounded ingestion queue; a single
//! applier folds them into a capacity-limited row store that stays sorted
//! on the active column and evicts by arrival order. Alarm views layer a
//! per-key lifecycle with timed expiry and level/subject filtering on top.

pub mod alarm;
pub mod cli;
pub mod clock;
pub mod config;
pub mod errors;
pub mod ledger;
pub mod listener;
pub mod observability;
pub mod schema;
pub mod sort;
pub mod store;
pub mod table;

pub use alarm::{AlarmLevel, AlarmSample, AlarmTable, SelectionFilter};
pub use clock::{Clock, ManualClock, Millis, SystemClock};
pub use config::{InsertOrder, TableConfig};
pub use errors::{TableError, TableResult};
pub use listener::{NoopListener, RecordingListener, TableListener};
pub use schema::{CellRow, ColumnId, ColumnSpec, RowData, TableSchema};
pub use sort::{Collation, SortSpec};
pub use store::{Row, RowId};
pub use table::{ApplyReport, Ingest, LiveTable, OfferOutcome, TableEngine};
