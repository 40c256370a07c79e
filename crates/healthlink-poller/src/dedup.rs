//! Per-metric last-seen markers.
//!
//! A marker only ever moves to the id of a record the poller actually emitted; a tick that finds
//! nothing new leaves it untouched.

use std::collections::VecDeque;

use healthlink_config::DedupStrategy;

/// Last-seen tracking for one metric type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordMarker {
    strategy: DedupStrategy,
    last: Option<String>,
    recent: VecDeque<String>,
}

impl RecordMarker {
    /// Empty marker using `strategy`.
    #[must_use]
    pub const fn new(strategy: DedupStrategy) -> Self {
        Self {
            strategy,
            last: None,
            recent: VecDeque::new(),
        }
    }

    /// Id of the newest record emitted so far.
    #[must_use]
    pub fn last_record_id(&self) -> Option<&str> {
        self.last.as_deref()
    }

    /// Whether `record_id` counts as already emitted.
    #[must_use]
    pub fn is_seen(&self, record_id: &str) -> bool {
        match self.strategy {
            DedupStrategy::LastId => self.last.as_deref() == Some(record_id),
            DedupStrategy::RecentIds { .. } => self.recent.iter().any(|seen| seen == record_id),
        }
    }

    /// Keep only records not yet emitted, preserving order.
    #[must_use]
    pub fn retain_unseen<T, F>(&self, records: Vec<T>, record_id: F) -> Vec<T>
    where
        F: Fn(&T) -> &str,
    {
        records
            .into_iter()
            .filter(|record| !self.is_seen(record_id(record)))
            .collect()
    }

    /// Record that `emitted` ids (in order) were delivered. No-op when empty.
    pub fn advance<'a, I>(&mut self, emitted: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        for record_id in emitted {
            if let DedupStrategy::RecentIds { capacity } = self.strategy {
                if !self.recent.iter().any(|seen| seen == record_id) {
                    self.recent.push_back(record_id.to_string());
                }
                while self.recent.len() > capacity {
                    self.recent.pop_front();
                }
            }
            self.last = Some(record_id.to_string());
        }
    }

    /// Forget everything.
    pub fn reset(&mut self) {
        self.last = None;
        self.recent.clear();
    }
}

/// Markers for both metric types, owned by the poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerState {
    /// Steps marker.
    pub steps: RecordMarker,
    /// Heart-rate marker.
    pub heart_rate: RecordMarker,
}

impl PollerState {
    /// Empty state using `strategy` for both metrics.
    #[must_use]
    pub const fn new(strategy: DedupStrategy) -> Self {
        Self {
            steps: RecordMarker::new(strategy),
            heart_rate: RecordMarker::new(strategy),
        }
    }

    /// Clear both markers.
    pub fn reset(&mut self) {
        self.steps.reset();
        self.heart_rate.reset();
    }

    /// Point-in-time copy of the last-seen ids.
    #[must_use]
    pub fn snapshot(&self) -> MarkerSnapshot {
        MarkerSnapshot {
            last_steps_record_id: self.steps.last_record_id().map(str::to_string),
            last_heart_rate_record_id: self.heart_rate.last_record_id().map(str::to_string),
        }
    }
}

/// Observable copy of the poller's markers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerSnapshot {
    /// Newest emitted steps record id.
    pub last_steps_record_id: Option<String>,
    /// Newest emitted heart-rate record id.
    pub last_heart_rate_record_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(records: &[&'static str]) -> Vec<&'static str> {
        records.to_vec()
    }

    #[test]
    fn last_id_strategy_excludes_only_the_latest_id() {
        let mut marker = RecordMarker::new(DedupStrategy::LastId);
        let first = marker.retain_unseen(ids(&["A", "B", "C"]), |id| *id);
        assert_eq!(first, vec!["A", "B", "C"]);
        marker.advance(first.iter().copied());
        assert_eq!(marker.last_record_id(), Some("C"));

        let replay = marker.retain_unseen(ids(&["A", "B", "C"]), |id| *id);
        assert_eq!(replay, vec!["A", "B"]);
    }

    #[test]
    fn recent_ids_strategy_excludes_the_retained_ring() {
        let mut marker = RecordMarker::new(DedupStrategy::RecentIds { capacity: 3 });
        marker.advance(["A", "B", "C"]);
        assert!(marker.retain_unseen(ids(&["A", "B", "C"]), |id| *id).is_empty());

        marker.advance(["D"]);
        // "A" fell out of the ring.
        assert_eq!(
            marker.retain_unseen(ids(&["A", "B", "C", "D"]), |id| *id),
            vec!["A"]
        );
        assert_eq!(marker.last_record_id(), Some("D"));
    }

    #[test]
    fn empty_advance_keeps_the_marker() {
        let mut marker = RecordMarker::new(DedupStrategy::LastId);
        marker.advance(["X"]);
        marker.advance(std::iter::empty());
        assert_eq!(marker.last_record_id(), Some("X"));
    }

    #[test]
    fn state_snapshot_and_reset() {
        let mut state = PollerState::new(DedupStrategy::LastId);
        state.steps.advance(["s1"]);
        state.heart_rate.advance(["h1"]);
        assert_eq!(
            state.snapshot(),
            MarkerSnapshot {
                last_steps_record_id: Some("s1".into()),
                last_heart_rate_record_id: Some("h1".into()),
            }
        );
        state.reset();
        assert_eq!(state.snapshot(), MarkerSnapshot::default());
    }
}
