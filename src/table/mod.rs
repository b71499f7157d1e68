//! Live table engine
//!
//! - `IngestQueue`: bounded FIFO between producers and the applier
//! - `TableEngine`: row store, eviction ledger and sorting under one owner
//! - `LiveTable`: cross-thread front with backpressure, pause and clear

mod engine;
mod live;
mod queue;

pub use engine::{Applied, ApplyReport, Ingest, Inserted, TableEngine, Updated};
pub use live::{Applier, LiveTable, OfferOutcome};
pub use queue::IngestQueue;
