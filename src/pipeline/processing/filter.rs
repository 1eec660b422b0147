//! Deadline cutoff and the final output ordering

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::pipeline::processing::dedup::cmp_missing_last;
use crate::pipeline::processing::normalize::parse_date;
use crate::types::CanonicalRecord;

/// Minimum-deadline threshold applied after scoring and deduplication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cutoff {
    /// Keep everything
    Disabled,
    /// Keep records whose deadline is missing or on/after this date
    OnOrAfter(NaiveDate),
}

impl Cutoff {
    /// `"today"` resolves to `as_of`; an unparseable cutoff disables the filter
    pub fn resolve(cutoff: Option<&str>, as_of: NaiveDate) -> Self {
        let Some(raw) = cutoff.map(str::trim).filter(|c| !c.is_empty()) else {
            return Self::Disabled;
        };

        if raw.eq_ignore_ascii_case("today") {
            return Self::OnOrAfter(as_of);
        }

        match parse_date(raw) {
            Some(date) => Self::OnOrAfter(date),
            None => {
                warn!(cutoff = %raw, "unparseable deadline cutoff; keeping all records");
                Self::Disabled
            }
        }
    }

    pub fn keeps(&self, record: &CanonicalRecord) -> bool {
        match (self, record.deadline) {
            (Self::Disabled, _) | (_, None) => true,
            (Self::OnOrAfter(cutoff), Some(deadline)) => deadline >= *cutoff,
        }
    }

    pub fn apply(&self, records: Vec<CanonicalRecord>) -> Vec<CanonicalRecord> {
        if *self == Self::Disabled {
            return records;
        }
        let before = records.len();
        let kept: Vec<_> = records.into_iter().filter(|r| self.keeps(r)).collect();
        info!(before, after = kept.len(), "applied deadline cutoff");
        kept
    }
}

/// Best score first, then soonest deadline; missing deadlines last
pub fn sort_for_output(records: &mut [CanonicalRecord]) {
    records.sort_by(|a, b| {
        b.weighted_score
            .total_cmp(&a.weighted_score)
            .then_with(|| cmp_missing_last(a.deadline.as_ref(), b.deadline.as_ref()))
    });
}
