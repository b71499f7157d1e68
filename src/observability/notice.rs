//! One-shot notices for conditions that would otherwise flood the log.

use std::sync::atomic::{AtomicBool, Ordering};

/// Fires once per episode; `rearm` starts a new episode
#[derive(Debug)]
pub struct OnceNotice {
    armed: AtomicBool,
}

impl Default for OnceNotice {
    fn default() -> Self {
        Self::new()
    }
}

impl OnceNotice {
    /// Armed notice
    pub fn new() -> Self {
        Self {
            armed: AtomicBool::new(true),
        }
    }

    /// True exactly once until re-armed
    pub fn fire(&self) -> bool {
        self.armed.swap(false, Ordering::AcqRel)
    }

    /// Allow the next `fire` to succeed
    pub fn rearm(&self) {
        self.armed.store(true, Ordering::Release);
    }

    /// Whether the next `fire` would succeed
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_once() {
        let notice = OnceNotice::new();
        assert!(notice.fire());
        assert!(!notice.fire());
        assert!(!notice.is_armed());
    }

    #[test]
    fn test_rearm() {
        let notice = OnceNotice::new();
        assert!(notice.fire());
        notice.rearm();
        assert!(notice.fire());
    }
}
