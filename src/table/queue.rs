//! Bounded ingestion queue
//!
//! FIFO buffer between producer threads and the single applier. Producers
//! wait up to a timeout for room; the applier drains in batches and wakes
//! waiting producers.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Bounded multi-producer FIFO
#[derive(Debug)]
pub struct IngestQueue<T> {
    items: Mutex<VecDeque<T>>,
    not_full: Condvar,
    capacity: usize,
}

impl<T> IngestQueue<T> {
    /// Queue holding at most `capacity` items (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity.min(4096))),
            not_full: Condvar::new(),
            capacity,
        }
    }

    /// Maximum number of queued items
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Items currently queued
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Enqueue, waiting up to `timeout` for room
    ///
    /// Hands the item back if the queue is still full when the timeout
    /// elapses.
    pub fn offer(&self, item: T, timeout: Duration) -> Result<(), T> {
        let deadline = Instant::now() + timeout;
        let mut items = self.lock();
        while items.len() >= self.capacity {
            let now = Instant::now();
            if now >= deadline {
                return Err(item);
            }
            let (guard, _) = self
                .not_full
                .wait_timeout(items, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            items = guard;
        }
        items.push_back(item);
        Ok(())
    }

    /// Remove up to `max` items, oldest first
    pub fn drain_batch(&self, max: usize) -> Vec<T> {
        let mut items = self.lock();
        let count = max.min(items.len());
        let batch: Vec<T> = items.drain(..count).collect();
        drop(items);
        if !batch.is_empty() {
            self.not_full.notify_all();
        }
        batch
    }

    /// Remove everything, oldest first
    pub fn drain_all(&self) -> Vec<T> {
        self.drain_batch(usize::MAX)
    }

    /// Discard everything; returns how many items were dropped
    pub fn clear(&self) -> usize {
        let mut items = self.lock();
        let dropped = items.len();
        items.clear();
        drop(items);
        self.not_full.notify_all();
        dropped
    }

    /// Keep only the `keep` newest items; returns how many were dropped
    pub fn retain_newest(&self, keep: usize) -> usize {
        let mut items = self.lock();
        let dropped = items.len().saturating_sub(keep);
        items.drain(..dropped);
        drop(items);
        if dropped > 0 {
            self.not_full.notify_all();
        }
        dropped
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_fifo_batches() {
        let queue = IngestQueue::new(10);
        for i in 0..5 {
            queue.offer(i, Duration::ZERO).unwrap();
        }
        assert_eq!(queue.drain_batch(3), vec![0, 1, 2]);
        assert_eq!(queue.drain_all(), vec![3, 4]);
        assert!(queue.drain_batch(3).is_empty());
    }

    #[test]
    fn test_offer_times_out_when_full() {
        let queue = IngestQueue::new(2);
        queue.offer(1, Duration::ZERO).unwrap();
        queue.offer(2, Duration::ZERO).unwrap();
        let started = Instant::now();
        assert_eq!(queue.offer(3, Duration::from_millis(20)), Err(3));
        assert!(started.elapsed() >= Duration::from_millis(20));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_drain_wakes_blocked_producer() {
        let queue = Arc::new(IngestQueue::new(1));
        queue.offer(1, Duration::ZERO).unwrap();

        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.offer(2, Duration::from_secs(5)))
        };
        thread::sleep(Duration::from_millis(20));
        assert_eq!(queue.drain_batch(1), vec![1]);
        assert_eq!(producer.join().unwrap(), Ok(()));
        assert_eq!(queue.drain_all(), vec![2]);
    }

    #[test]
    fn test_retain_newest() {
        let queue = IngestQueue::new(10);
        for i in 0..6 {
            queue.offer(i, Duration::ZERO).unwrap();
        }
        assert_eq!(queue.retain_newest(2), 4);
        assert_eq!(queue.retain_newest(5), 0);
        assert_eq!(queue.drain_all(), vec![4, 5]);
    }

    #[test]
    fn test_clear_and_minimum_capacity() {
        let queue = IngestQueue::new(0);
        assert_eq!(queue.capacity(), 1);
        queue.offer("a", Duration::ZERO).unwrap();
        assert_eq!(queue.clear(), 1);
        assert!(queue.is_empty());
    }
}
