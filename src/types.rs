use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::constants;

/// Canonical fields a raw source column can be mapped onto.
///
/// Derived fields (weighted score, days to deadline, expired) and provenance
/// are deliberately absent: no source column may supply them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    GrantName,
    SponsorOrg,
    Link,
    AwardMax,
    AwardMin,
    FundingInstrument,
    Eligibility,
    PeriodOfPerformance,
    Deadline,
    TotalFunding,
    Relevance,
    Fit,
    Ease,
    Status,
    Notes,
}

impl CanonicalField {
    /// The output column label for this field
    pub fn label(&self) -> &'static str {
        match self {
            Self::GrantName => constants::GRANT_NAME,
            Self::SponsorOrg => constants::SPONSOR_ORG,
            Self::Link => constants::LINK,
            Self::AwardMax => constants::AWARD_MAX,
            Self::AwardMin => constants::AWARD_MIN,
            Self::FundingInstrument => constants::FUNDING_INSTRUMENT,
            Self::Eligibility => constants::ELIGIBILITY,
            Self::PeriodOfPerformance => constants::PERIOD_OF_PERFORMANCE,
            Self::Deadline => constants::DEADLINE,
            Self::TotalFunding => constants::TOTAL_FUNDING,
            Self::Relevance => constants::RELEVANCE,
            Self::Fit => constants::FIT,
            Self::Ease => constants::EASE,
            Self::Status => constants::STATUS,
            Self::Notes => constants::NOTES,
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One source row after header mapping, before any value parsing.
///
/// A field absent from `fields` means the source file had no column for it;
/// `Some("")` means the column existed but the cell was blank.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappedRow {
    /// Raw cell text per mapped canonical field
    pub fields: BTreeMap<CanonicalField, String>,
    /// Unmapped columns as `(original header, value)`, in source column order
    pub extras: Vec<(String, String)>,
    /// Path of the file this row came from
    pub source_file: String,
}

impl MappedRow {
    pub fn get(&self, field: CanonicalField) -> Option<&str> {
        self.fields.get(&field).map(|s| s.as_str())
    }
}

/// A fully normalized grant opportunity in the canonical schema
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalRecord {
    pub grant_name: Option<String>,
    pub sponsor_org: Option<String>,
    pub link: Option<String>,
    pub award_max: Option<f64>,
    pub award_min: Option<f64>,
    pub funding_instrument: Option<String>,
    pub eligibility: Option<String>,
    pub period_of_performance: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub total_funding: Option<f64>,
    /// Sub-scores, clamped to [0, 5]; `None` when missing or non-numeric
    pub relevance: Option<f64>,
    pub fit: Option<f64>,
    pub ease: Option<f64>,
    /// Always recomputed from the sub-scores and the configured weights
    pub weighted_score: f64,
    pub status: Option<String>,
    pub notes: Option<String>,
    pub source_file: String,
    /// Whole days from the evaluation date to the deadline
    pub days_to_deadline: Option<i64>,
    pub expired: bool,
    /// Unmapped source columns, carried through to the output
    pub extras: Vec<(String, String)>,
}

impl CanonicalRecord {
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey::new(self.grant_name.as_deref(), self.sponsor_org.as_deref())
    }

    pub fn extra(&self, header: &str) -> Option<&str> {
        self.extras
            .iter()
            .rev()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v.as_str())
    }
}

/// Identity of one logical grant across sources: trimmed, lowercased name and sponsor
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DedupKey {
    pub grant_name: String,
    pub sponsor_org: String,
}

impl DedupKey {
    pub fn new(grant_name: Option<&str>, sponsor_org: Option<&str>) -> Self {
        let clean = |s: Option<&str>| s.map(|v| v.trim().to_lowercase()).unwrap_or_default();
        Self {
            grant_name: clean(grant_name),
            sponsor_org: clean(sponsor_org),
        }
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {}", self.grant_name, self.sponsor_org)
    }
}
