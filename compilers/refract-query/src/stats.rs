//! Aggregation of projected frames into counts and probabilities.

use std::collections::BTreeMap;

use refract_protocol::Frame;

use crate::projection::ProjectionQuery;

/// Entry counting every frame observed under a conditioning key.
pub const WILDCARD: &str = "*";

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalProbability {
    /// Canonical string of the conditioning projection.
    pub given: String,
    /// Canonical string of the target projection.
    pub key: String,
    pub probability: f64,
}

/// Partial counts for P(target | given), mergeable across workers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionalCounts {
    groups: BTreeMap<String, BTreeMap<String, u64>>,
}

impl ConditionalCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one frame. Frames the conditioning query rejects are ignored.
    pub fn observe(&mut self, frame: &Frame, target: &ProjectionQuery, given: &ProjectionQuery) {
        if let Some(condition) = given.project(frame) {
            let entry = target.project(frame).map(|projected| projected.to_string());
            self.record(condition.to_string(), entry);
        }
    }

    /// Adds one occurrence under `given`: always to the wildcard, and to
    /// `entry` when the target matched.
    pub fn record(&mut self, given: String, entry: Option<String>) {
        let group = self.groups.entry(given).or_default();
        *group.entry(WILDCARD.to_string()).or_default() += 1;
        if let Some(entry) = entry {
            *group.entry(entry).or_default() += 1;
        }
    }

    pub fn merge(&mut self, other: ConditionalCounts) {
        for (given, entries) in other.groups {
            let group = self.groups.entry(given).or_default();
            for (entry, count) in entries {
                *group.entry(entry).or_default() += count;
            }
        }
    }

    pub fn count(&self, given: &str, entry: &str) -> u64 {
        self.groups
            .get(given)
            .and_then(|group| group.get(entry))
            .copied()
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Relative frequency of every target entry within its conditioning
    /// group, ordered by conditioning key then entry key.
    pub fn probabilities(&self) -> Vec<ConditionalProbability> {
        let mut out = Vec::new();
        for (given, group) in &self.groups {
            let total = group.get(WILDCARD).copied().unwrap_or_default();
            if total == 0 {
                continue;
            }
            for (key, count) in group {
                if key.starts_with(WILDCARD) {
                    continue;
                }
                out.push(ConditionalProbability {
                    given: given.clone(),
                    key: key.clone(),
                    probability: *count as f64 / total as f64,
                });
            }
        }
        out
    }
}

/// Occurrences of projected frames grouped by their slot values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyCounts {
    groups: BTreeMap<String, (String, u64)>,
}

impl FrequencyCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts `frame` under its values-only key. The group is reported with
    /// the canonical string of the last frame observed for it.
    pub fn observe(&mut self, frame: &Frame) {
        let group = self.groups.entry(frame.slot_values()).or_default();
        group.0 = frame.to_string();
        group.1 += 1;
    }

    /// Merges `other` into `self`; `other`'s representatives count as later.
    pub fn merge(&mut self, other: FrequencyCounts) {
        for (values, (canonical, count)) in other.groups {
            let group = self.groups.entry(values).or_default();
            group.0 = canonical;
            group.1 += count;
        }
    }

    /// `(canonical frame string, count)` per group, ordered by values key.
    pub fn counts(&self) -> Vec<(String, u64)> {
        self.groups
            .values()
            .map(|(canonical, count)| (canonical.clone(), *count))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
