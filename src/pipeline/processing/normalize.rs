//! Value normalization: money and date strings into typed values.
//!
//! Nothing here fails. Input that cannot be understood becomes `None`.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::pipeline::processing::scoring::coerce_score;
use crate::types::{CanonicalField, CanonicalRecord, MappedRow};

static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("number regex"));

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const LONG_FORM_FORMATS: [&str; 3] = ["%B %d, %Y", "%B %d %Y", "%d %B %Y"];

/// Anything that can be read as a money amount
pub trait MoneyLike {
    fn to_money(&self) -> Option<f64>;
}

impl MoneyLike for str {
    /// Drops thousands separators, then takes the first number anywhere in the text
    fn to_money(&self) -> Option<f64> {
        let cleaned = self.replace(',', "");
        NUMBER_RE
            .find(&cleaned)
            .and_then(|m| m.as_str().parse::<f64>().ok())
    }
}

impl MoneyLike for String {
    fn to_money(&self) -> Option<f64> {
        self.as_str().to_money()
    }
}

impl MoneyLike for f64 {
    fn to_money(&self) -> Option<f64> {
        self.is_finite().then_some(*self)
    }
}

impl MoneyLike for i64 {
    fn to_money(&self) -> Option<f64> {
        Some(*self as f64)
    }
}

pub fn parse_money<M: MoneyLike + ?Sized>(value: &M) -> Option<f64> {
    value.to_money()
}

/// Parse ISO dates, ISO datetimes and long-form month-name dates.
///
/// Time of day and offsets are discarded; the date as written is kept.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.date_naive());
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt.date());
        }
    }

    let collapsed = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");
    LONG_FORM_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(&collapsed, format).ok())
}

pub fn days_to_deadline(deadline: Option<NaiveDate>, as_of: NaiveDate) -> Option<i64> {
    deadline.map(|d| (d - as_of).num_days())
}

pub fn is_expired(days_to_deadline: Option<i64>) -> bool {
    matches!(days_to_deadline, Some(days) if days < 0)
}

/// Converts mapped rows into typed canonical records
pub trait Normalizer {
    fn normalize(&self, row: MappedRow) -> CanonicalRecord;
}

/// Normalizer evaluating deadlines against a fixed date
pub struct DefaultNormalizer {
    pub as_of: NaiveDate,
}

impl DefaultNormalizer {
    pub fn new(as_of: NaiveDate) -> Self {
        Self { as_of }
    }
}

impl Normalizer for DefaultNormalizer {
    fn normalize(&self, mut row: MappedRow) -> CanonicalRecord {
        let mut take = |field: CanonicalField| row.fields.remove(&field);

        let grant_name = take(CanonicalField::GrantName);
        let sponsor_org = take(CanonicalField::SponsorOrg);
        let link = take(CanonicalField::Link);
        let award_max = take(CanonicalField::AwardMax).and_then(|v| parse_money(&v));
        let award_min = take(CanonicalField::AwardMin).and_then(|v| parse_money(&v));
        let funding_instrument = take(CanonicalField::FundingInstrument);
        let eligibility = take(CanonicalField::Eligibility);
        let period_of_performance = take(CanonicalField::PeriodOfPerformance);
        let deadline = take(CanonicalField::Deadline).and_then(|v| parse_date(&v));
        let total_funding = take(CanonicalField::TotalFunding).and_then(|v| parse_money(&v));
        let relevance = take(CanonicalField::Relevance).and_then(|v| coerce_score(&v));
        let fit = take(CanonicalField::Fit).and_then(|v| coerce_score(&v));
        let ease = take(CanonicalField::Ease).and_then(|v| coerce_score(&v));
        let status = take(CanonicalField::Status);
        let notes = take(CanonicalField::Notes);

        let days = days_to_deadline(deadline, self.as_of);

        CanonicalRecord {
            grant_name,
            sponsor_org,
            link,
            award_max,
            award_min,
            funding_instrument,
            eligibility,
            period_of_performance,
            deadline,
            total_funding,
            relevance,
            fit,
            ease,
            weighted_score: 0.0,
            status,
            notes,
            source_file: row.source_file,
            days_to_deadline: days,
            expired: is_expired(days),
            extras: row.extras,
        }
    }
}
