//! Bounded per-target sample history.

use std::collections::{HashMap, VecDeque};

use super::models::ProbeSample;

/// Fixed-capacity time series keyed by target identifier.
///
/// Series outlive registry membership: removing a target never drops its samples.
#[derive(Debug)]
pub struct HistoryStore {
    capacity: usize,
    series: HashMap<String, VecDeque<ProbeSample>>,
}

impl HistoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            series: HashMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Create an empty series for `id` if none exists yet.
    pub fn ensure(&mut self, id: &str) {
        if !self.series.contains_key(id) {
            self.series
                .insert(id.to_string(), VecDeque::with_capacity(self.capacity));
        }
    }

    /// Append a sample, evicting the oldest one once the series is full.
    pub fn append(&mut self, id: &str, sample: ProbeSample) {
        self.ensure(id);
        if let Some(queue) = self.series.get_mut(id) {
            queue.push_back(sample);
            while queue.len() > self.capacity {
                queue.pop_front();
            }
        }
    }

    /// Samples for `id`, oldest first. `None` if the target was never seen.
    pub fn get(&self, id: &str) -> Option<Vec<ProbeSample>> {
        self.series.get(id).map(|q| q.iter().cloned().collect())
    }

    /// Samples for `id`, or an empty list if the target was never seen.
    pub fn get_or_empty(&self, id: &str) -> Vec<ProbeSample> {
        self.get(id).unwrap_or_default()
    }

    pub fn latest(&self, id: &str) -> Option<ProbeSample> {
        self.series.get(id).and_then(|q| q.back().cloned())
    }

    pub fn len(&self, id: &str) -> usize {
        self.series.get(id).map_or(0, VecDeque::len)
    }

    /// Every known series identifier, including removed targets.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }
}
