//! Collapse records describing the same grant to one representative row.

use std::cmp::Ordering;
use std::collections::HashSet;

use tracing::debug;

use crate::types::CanonicalRecord;

/// Compare optional values ascending with `None` after every `Some`
pub fn cmp_missing_last<T: PartialOrd>(a: Option<&T>, b: Option<&T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Preference among records sharing a key: soonest deadline, then best score
pub fn preference_order(a: &CanonicalRecord, b: &CanonicalRecord) -> Ordering {
    cmp_missing_last(a.deadline.as_ref(), b.deadline.as_ref())
        .then_with(|| b.weighted_score.total_cmp(&a.weighted_score))
}

/// Strategy for resolving many source rows to one row per logical grant
pub trait Deduplicator {
    fn deduplicate(&self, records: Vec<CanonicalRecord>) -> Vec<CanonicalRecord>;
}

/// Keeps the most actionable record per `(grant name, sponsor)` key
#[derive(Debug, Default)]
pub struct KeyedDeduplicator;

impl KeyedDeduplicator {
    pub fn new() -> Self {
        Self
    }
}

impl Deduplicator for KeyedDeduplicator {
    fn deduplicate(&self, mut records: Vec<CanonicalRecord>) -> Vec<CanonicalRecord> {
        // stable: equal candidates keep load order
        records.sort_by(preference_order);

        let mut seen = HashSet::new();
        let before = records.len();
        records.retain(|record| {
            let key = record.dedup_key();
            if seen.contains(&key) {
                debug!(key = %key, source = %record.source_file, "dropping duplicate");
                false
            } else {
                seen.insert(key);
                true
            }
        });

        debug!(before, after = records.len(), "deduplicated");
        records
    }
}
