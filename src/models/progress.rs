use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Bytes received vs. declared size for one download
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Transfer {
    pub downloaded: u64,
    pub total: u64,
}

impl Transfer {
    /// Whole percent, 0 when the size is unknown
    #[must_use]
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let pct = self.downloaded.saturating_mul(100) / self.total;
        u8::try_from(pct.min(100)).unwrap_or(100)
    }
}

/// Download progress keyed by version id.
///
/// One lock guards the whole table. Entries live until the process exits;
/// a re-install of the same id simply restarts its entry.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    transfers: Mutex<HashMap<String, Transfer>>,
}

impl ProgressTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<String, Transfer>> {
        // the table holds plain counters, so a poisoned lock is still usable
        self.transfers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Start (or restart) tracking a download
    pub fn begin(&self, version_id: &str, total: u64) {
        self.table().insert(
            version_id.to_string(),
            Transfer {
                downloaded: 0,
                total,
            },
        );
    }

    /// Add received bytes; unknown ids are ignored
    pub fn advance(&self, version_id: &str, delta: u64) {
        if let Some(transfer) = self.table().get_mut(version_id) {
            transfer.downloaded = transfer.downloaded.saturating_add(delta);
        }
    }

    /// Percent complete, 0 for unknown ids
    #[must_use]
    pub fn query(&self, version_id: &str) -> u8 {
        self.table().get(version_id).map_or(0, Transfer::percent)
    }

    /// Raw counters for one download
    #[must_use]
    pub fn snapshot(&self, version_id: &str) -> Option<Transfer> {
        self.table().get(version_id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_unknown_id_is_zero() {
        let tracker = ProgressTracker::new();
        assert_eq!(tracker.query("123"), 0);
        assert!(tracker.snapshot("123").is_none());
    }

    #[test]
    fn test_percent_floors() {
        let tracker = ProgressTracker::new();
        tracker.begin("1", 3);
        tracker.advance("1", 1);
        assert_eq!(tracker.query("1"), 33);
        tracker.advance("1", 1);
        assert_eq!(tracker.query("1"), 66);
        tracker.advance("1", 1);
        assert_eq!(tracker.query("1"), 100);
    }

    #[test]
    fn test_unknown_total_stays_zero() {
        let tracker = ProgressTracker::new();
        tracker.begin("9", 0);
        tracker.advance("9", 1_000_000);
        assert_eq!(tracker.query("9"), 0);
        assert_eq!(
            tracker.snapshot("9"),
            Some(Transfer {
                downloaded: 1_000_000,
                total: 0
            })
        );
    }

    #[test]
    fn test_overshoot_caps_at_hundred() {
        let tracker = ProgressTracker::new();
        tracker.begin("2", 10);
        tracker.advance("2", 25);
        assert_eq!(tracker.query("2"), 100);
    }

    #[test]
    fn test_begin_restarts() {
        let tracker = ProgressTracker::new();
        tracker.begin("4", 10);
        tracker.advance("4", 5);
        tracker.begin("4", 20);
        assert_eq!(tracker.query("4"), 0);
    }

    #[test]
    fn test_concurrent_advance() {
        let tracker = Arc::new(ProgressTracker::new());
        tracker.begin("5", 800);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                thread::spawn(move || {
                    for _ in 0..100 {
                        tracker.advance("5", 1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(tracker.query("5"), 100);
    }
}
