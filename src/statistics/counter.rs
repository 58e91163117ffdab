//! # View Counter
//!
//! Concurrent per-advertisement view counters. Counters only grow; a
//! tracked advertisement stays in the snapshot even when its count has not
//! changed since the last one.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// View count snapshot for a single advertisement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewStatistics {
    pub advertisement_id: i64,
    pub views: u64,
}

/// Thread-safe view counters keyed by advertisement id
#[derive(Debug, Default)]
pub struct StatisticsCounter {
    counters: DashMap<i64, AtomicU64>,
}

impl StatisticsCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one view and return the updated count
    pub fn increment(&self, advertisement_id: i64) -> ViewStatistics {
        let views = self
            .counters
            .entry(advertisement_id)
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::SeqCst)
            + 1;

        ViewStatistics {
            advertisement_id,
            views,
        }
    }

    /// Current count for an advertisement, zero when never viewed
    pub fn get(&self, advertisement_id: i64) -> ViewStatistics {
        let views = self
            .counters
            .get(&advertisement_id)
            .map(|counter| counter.load(Ordering::SeqCst))
            .unwrap_or(0);

        ViewStatistics {
            advertisement_id,
            views,
        }
    }

    /// Counts for every tracked advertisement, ordered by id
    pub fn snapshot(&self) -> Vec<ViewStatistics> {
        let mut entries: Vec<ViewStatistics> = self
            .counters
            .iter()
            .map(|entry| ViewStatistics {
                advertisement_id: *entry.key(),
                views: entry.value().load(Ordering::SeqCst),
            })
            .collect();
        entries.sort_by_key(|stats| stats.advertisement_id);
        entries
    }

    /// Number of advertisements with at least one recorded view
    pub fn tracked_count(&self) -> usize {
        self.counters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_increment_and_get() {
        let counter = StatisticsCounter::new();

        assert_eq!(counter.get(7).views, 0);

        assert_eq!(counter.increment(7).views, 1);
        assert_eq!(counter.increment(7).views, 2);
        assert_eq!(counter.increment(9).views, 1);

        assert_eq!(counter.get(7).views, 2);
        assert_eq!(counter.get(9).views, 1);
        assert_eq!(counter.tracked_count(), 2);
    }

    #[test]
    fn test_snapshot_is_ordered() {
        let counter = StatisticsCounter::new();
        counter.increment(9);
        counter.increment(7);
        counter.increment(7);

        let snapshot = counter.snapshot();
        assert_eq!(
            snapshot,
            vec![
                ViewStatistics {
                    advertisement_id: 7,
                    views: 2
                },
                ViewStatistics {
                    advertisement_id: 9,
                    views: 1
                },
            ]
        );
    }

    #[test]
    fn test_serializes_with_camel_case_fields() {
        let stats = ViewStatistics {
            advertisement_id: 7,
            views: 3,
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["advertisementId"], 7);
        assert_eq!(json["views"], 3);
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_not_lost() {
        let counter = Arc::new(StatisticsCounter::new());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let counter = Arc::clone(&counter);
            handles.push(tokio::spawn(async move {
                for _ in 0..100 {
                    counter.increment(1);
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(counter.get(1).views, 800);
    }
}
