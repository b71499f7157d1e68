//! Presentation callbacks
//!
//! The engine reports every structural change through a `TableListener`
//! so the presentation layer can mirror it into widgets. Callbacks run on
//! the applier while the table is locked and must not call back into it.

use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::errors::TableError;
use crate::store::{Row, RowId};

/// Receiver of table changes
pub trait TableListener<D>: Send + Sync {
    /// A row was inserted at `index`
    fn on_row_inserted(&self, _index: usize, _row: &Row<D>) {}

    /// A row left the table (evicted, expired, filtered or removed)
    fn on_row_removed(&self, _row: &Row<D>) {}

    /// Rows moved; new position `i` holds the row previously at `permutation[i]`
    fn on_rows_reordered(&self, _permutation: &[usize]) {}

    /// A row's data changed in place at `index`
    fn on_row_updated(&self, _index: usize, _row: &Row<D>) {}

    /// Every row was removed at once
    fn on_cleared(&self) {}

    /// One-time user notification (stall, discard, pause released)
    fn on_notice(&self, _notice: &TableError) {}
}

/// Listener that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl<D> TableListener<D> for NoopListener {}

/// A recorded listener callback
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ListenerEvent {
    Inserted { index: usize, row: RowId },
    Removed { row: RowId },
    Reordered { permutation: Vec<usize> },
    Updated { index: usize, row: RowId },
    Cleared,
    Notice { code: &'static str, message: String },
}

/// Listener that records callbacks; clones share the same log
#[derive(Debug, Default, Clone)]
pub struct RecordingListener {
    events: Arc<Mutex<Vec<ListenerEvent>>>,
}

impl RecordingListener {
    /// Empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far
    pub fn events(&self) -> Vec<ListenerEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Remove and return everything recorded so far
    pub fn take(&self) -> Vec<ListenerEvent> {
        self.events
            .lock()
            .map(|mut events| std::mem::take(&mut *events))
            .unwrap_or_default()
    }

    /// Recorded notice codes, in order
    pub fn notices(&self) -> Vec<&'static str> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ListenerEvent::Notice { code, .. } => Some(code),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: ListenerEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl<D> TableListener<D> for RecordingListener {
    fn on_row_inserted(&self, index: usize, row: &Row<D>) {
        self.push(ListenerEvent::Inserted { index, row: row.id });
    }

    fn on_row_removed(&self, row: &Row<D>) {
        self.push(ListenerEvent::Removed { row: row.id });
    }

    fn on_rows_reordered(&self, permutation: &[usize]) {
        self.push(ListenerEvent::Reordered {
            permutation: permutation.to_vec(),
        });
    }

    fn on_row_updated(&self, index: usize, row: &Row<D>) {
        self.push(ListenerEvent::Updated { index, row: row.id });
    }

    fn on_cleared(&self) {
        self.push(ListenerEvent::Cleared);
    }

    fn on_notice(&self, notice: &TableError) {
        self.push(ListenerEvent::Notice {
            code: notice.code(),
            message: notice.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_listener_shares_log() {
        let recorder = RecordingListener::new();
        let handle = recorder.clone();
        let row = Row::new(RowId(7), 0, ());

        TableListener::<()>::on_row_inserted(&recorder, 0, &row);
        TableListener::<()>::on_notice(&recorder, &TableError::StallDetected { discarded: 4 });

        assert_eq!(
            handle.events()[0],
            ListenerEvent::Inserted {
                index: 0,
                row: RowId(7)
            }
        );
        assert_eq!(handle.notices(), vec!["LIVETABLE_STALL_DETECTED"]);
        assert_eq!(handle.take().len(), 2);
        assert!(recorder.events().is_empty());
    }

    #[test]
    fn test_noop_listener() {
        let row = Row::new(RowId(1), 0, ());
        TableListener::<()>::on_row_removed(&NoopListener, &row);
    }
}
