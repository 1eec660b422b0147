//! Header mapping: arbitrary source column names onto the canonical schema.
//!
//! Headers are normalized (whitespace runs collapsed, trimmed, lowercased)
//! and looked up in an [`AliasTable`]. Columns without an alias are not
//! dropped: their content is folded into `notes` and carried as extras.

use std::collections::HashMap;

use tracing::debug;

use crate::constants::{NOTES_SEPARATOR, RECOMPUTED_HEADERS};
use crate::pipeline::ingestion::RawTable;
use crate::types::{CanonicalField, MappedRow};

/// Collapse whitespace runs, trim and lowercase a raw header
pub fn normalize_header(header: &str) -> String {
    header.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Lookup from normalized raw header text to canonical field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AliasTable {
    aliases: HashMap<String, CanonicalField>,
}

impl AliasTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The alias set known to work for the common grant portal exports
    pub fn builtin() -> Self {
        use CanonicalField::*;

        let entries: &[(&str, CanonicalField)] = &[
            ("grant name", GrantName),
            ("opportunity title", GrantName),
            ("title", GrantName),
            ("program name", GrantName),
            ("funding opportunity title", GrantName),
            ("sponsor org", SponsorOrg),
            ("agency", SponsorOrg),
            ("sponsoring agency", SponsorOrg),
            ("organization", SponsorOrg),
            ("sponsor", SponsorOrg),
            ("department", SponsorOrg),
            ("link", Link),
            ("url", Link),
            ("opportunity link", Link),
            ("grant link", Link),
            ("program link", Link),
            ("opportunity url", Link),
            ("award max", AwardMax),
            ("maximum award", AwardMax),
            ("max award", AwardMax),
            ("award ceiling", AwardMax),
            ("ceiling", AwardMax),
            ("award maximum", AwardMax),
            ("award min", AwardMin),
            ("minimum award", AwardMin),
            ("min award", AwardMin),
            ("award floor", AwardMin),
            ("floor", AwardMin),
            ("funding instrument", FundingInstrument),
            ("instrument", FundingInstrument),
            ("funding type", FundingInstrument),
            ("eligibility", Eligibility),
            ("eligible applicants", Eligibility),
            ("who may apply", Eligibility),
            ("applicant eligibility", Eligibility),
            ("period of performance", PeriodOfPerformance),
            ("project period", PeriodOfPerformance),
            ("period", PeriodOfPerformance),
            ("duration", PeriodOfPerformance),
            ("deadline", Deadline),
            ("application deadline", Deadline),
            ("close date", Deadline),
            ("closing date", Deadline),
            ("due date", Deadline),
            ("submission deadline", Deadline),
            ("total funding", TotalFunding),
            ("estimated total program funding", TotalFunding),
            ("funding available", TotalFunding),
            ("relevance", Relevance),
            ("eqore fit", Fit),
            ("fit", Fit),
            ("ease of use", Ease),
            ("ease", Ease),
            ("status", Status),
            ("notes", Notes),
            ("extra notes", Notes),
            ("special notes", Notes),
        ];

        let mut table = Self::empty();
        for (header, field) in entries {
            table.insert(header, *field);
        }
        table
    }

    /// Add or replace an alias; the header is normalized before storing
    pub fn insert(&mut self, header: &str, field: CanonicalField) {
        self.aliases.insert(normalize_header(header), field);
    }

    pub fn resolve(&self, header: &str) -> Option<CanonicalField> {
        self.aliases.get(&normalize_header(header)).copied()
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

/// What to do with each column of one source file
#[derive(Debug, Clone, PartialEq)]
enum ColumnRole {
    Mapped,
    Unmapped(String),
    Ignored,
}

/// Per-file column plan: the role of every column plus the winning column per field
#[derive(Debug)]
pub struct ColumnPlan {
    roles: Vec<ColumnRole>,
    winners: HashMap<CanonicalField, usize>,
}

impl ColumnPlan {
    pub fn new(headers: &[String], aliases: &AliasTable) -> Self {
        let mut roles = Vec::with_capacity(headers.len());
        let mut winners = HashMap::new();

        for (idx, header) in headers.iter().enumerate() {
            let normalized = normalize_header(header);
            let role = if normalized.is_empty() || RECOMPUTED_HEADERS.contains(&normalized.as_str()) {
                ColumnRole::Ignored
            } else if let Some(field) = aliases.resolve(header) {
                // Last column mapping to a field wins
                if let Some(previous) = winners.insert(field, idx) {
                    debug!(
                        field = %field,
                        previous = %headers[previous],
                        winner = %header,
                        "multiple columns map to one field; keeping the last"
                    );
                }
                ColumnRole::Mapped
            } else {
                ColumnRole::Unmapped(header.clone())
            };
            roles.push(role);
        }

        Self { roles, winners }
    }

    /// Canonical fields this file supplies a column for
    pub fn mapped_fields(&self) -> impl Iterator<Item = CanonicalField> + '_ {
        self.winners.keys().copied()
    }

    /// Original headers of the unmapped columns, in column order
    pub fn unmapped_headers(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().filter_map(|role| match role {
            ColumnRole::Unmapped(header) => Some(header.as_str()),
            _ => None,
        })
    }

    /// Map one data row. Short rows read missing trailing cells as blank.
    pub fn map_row(&self, cells: &[String], source_file: &str) -> MappedRow {
        let cell = |idx: usize| cells.get(idx).map(|s| s.as_str()).unwrap_or("");

        let mut row = MappedRow {
            source_file: source_file.to_string(),
            ..MappedRow::default()
        };

        for (field, idx) in &self.winners {
            row.fields.insert(*field, cell(*idx).to_string());
        }

        for (idx, role) in self.roles.iter().enumerate() {
            if let ColumnRole::Unmapped(header) = role {
                row.extras.push((header.clone(), cell(idx).to_string()));
            }
        }

        fold_extras_into_notes(&mut row);
        row
    }

    /// Map every data row of a loaded source table
    pub fn map_rows(&self, table: &RawTable) -> Vec<MappedRow> {
        let source = table.path.display().to_string();
        debug!(
            source = %source,
            mapped = self.winners.len(),
            unmapped = self.unmapped_headers().count(),
            "column plan"
        );
        table.rows.iter().map(|cells| self.map_row(cells, &source)).collect()
    }
}

/// Append `"<header>: <value>"` for every non-blank unmapped cell to `notes`
fn fold_extras_into_notes(row: &mut MappedRow) {
    let parts: Vec<String> = row
        .extras
        .iter()
        .filter(|(_, value)| !value.trim().is_empty())
        .map(|(header, value)| format!("{}: {}", header, value))
        .collect();

    if parts.is_empty() {
        return;
    }

    let existing = row.get(CanonicalField::Notes).unwrap_or("");
    let mut combined = String::from(existing);
    combined.push_str(NOTES_SEPARATOR);
    combined.push_str(&parts.join(NOTES_SEPARATOR));

    let trimmed = combined.trim_matches(|c| c == ' ' || c == '|').to_string();
    row.fields.insert(CanonicalField::Notes, trimmed);
}

/// Plan the table's columns and map every row
pub fn map_table(table: &RawTable, aliases: &AliasTable) -> Vec<MappedRow> {
    ColumnPlan::new(&table.headers, aliases).map_rows(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable {
            path: PathBuf::from("fixtures/grants.csv"),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
            delimiter: b',',
        }
    }

    #[test]
    fn test_normalize_header_collapses_whitespace() {
        assert_eq!(normalize_header("  Award \t  Ceiling "), "award ceiling");
        assert_eq!(normalize_header("CLOSE\nDATE"), "close date");
        assert_eq!(normalize_header("   "), "");
    }

    #[test]
    fn test_award_ceiling_maps_to_award_max() {
        let aliases = AliasTable::builtin();
        assert_eq!(aliases.resolve("Award Ceiling"), Some(CanonicalField::AwardMax));
        assert_eq!(aliases.resolve("Foo Bar"), None);
    }

    #[test]
    fn test_unmapped_column_folds_into_notes() {
        let rows = map_table(
            &table(&["Grant name", "Foo Bar"], &[&["Acme", "baz"]]),
            &AliasTable::builtin(),
        );

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get(CanonicalField::GrantName), Some("Acme"));
        assert_eq!(rows[0].get(CanonicalField::Notes), Some("Foo Bar: baz"));
        assert_eq!(rows[0].extras, vec![("Foo Bar".to_string(), "baz".to_string())]);
        assert_eq!(rows[0].source_file, "fixtures/grants.csv");
    }

    #[test]
    fn test_existing_notes_are_preserved() {
        let rows = map_table(
            &table(
                &["Title", "Notes", "Region", "Contact"],
                &[&["A", "call first", "West", "jo@example.org"], &["B", "", "", "x"]],
            ),
            &AliasTable::builtin(),
        );

        assert_eq!(
            rows[0].get(CanonicalField::Notes),
            Some("call first | Region: West | Contact: jo@example.org")
        );
        // blank unmapped cells are skipped and the dangling separator trimmed
        assert_eq!(rows[1].get(CanonicalField::Notes), Some("Contact: x"));
    }

    #[test]
    fn test_absent_column_differs_from_blank_cell() {
        let rows = map_table(
            &table(&["Title", "Deadline"], &[&["A", ""]]),
            &AliasTable::builtin(),
        );

        assert_eq!(rows[0].get(CanonicalField::Deadline), Some(""));
        assert_eq!(rows[0].get(CanonicalField::AwardMax), None);
        assert_eq!(rows[0].get(CanonicalField::Notes), None);
    }

    #[test]
    fn test_last_column_wins_for_duplicate_mapping() {
        let rows = map_table(
            &table(&["Title", "Grant Name"], &[&["first", "second"]]),
            &AliasTable::builtin(),
        );

        assert_eq!(rows[0].get(CanonicalField::GrantName), Some("second"));
        assert!(rows[0].extras.is_empty());
    }

    #[test]
    fn test_recomputed_and_blank_headers_are_ignored() {
        let rows = map_table(
            &table(&["Title", "Weighted Score", "", "Expired"], &[&["A", "9.9", "junk", "true"]]),
            &AliasTable::builtin(),
        );

        assert!(rows[0].extras.is_empty());
        assert_eq!(rows[0].get(CanonicalField::Notes), None);
    }

    #[test]
    fn test_one_plan_maps_every_row() {
        let raw = table(&["Title", "Region"], &[&["A", "West"], &["B", ""]]);
        let plan = ColumnPlan::new(&raw.headers, &AliasTable::builtin());

        let rows = plan.map_rows(&raw);

        assert_eq!(plan.unmapped_headers().collect::<Vec<_>>(), vec!["Region"]);
        assert_eq!(rows, map_table(&raw, &AliasTable::builtin()));
        assert_eq!(rows[1].get(CanonicalField::GrantName), Some("B"));
    }

    #[test]
    fn test_short_rows_read_as_blank() {
        let rows = map_table(
            &table(&["Title", "Agency", "Region"], &[&["A"]]),
            &AliasTable::builtin(),
        );

        assert_eq!(rows[0].get(CanonicalField::SponsorOrg), Some(""));
        assert_eq!(rows[0].extras, vec![("Region".to_string(), String::new())]);
    }

    #[test]
    fn test_custom_alias_overrides_builtin() {
        let mut aliases = AliasTable::builtin();
        aliases.insert("Title", CanonicalField::Notes);
        assert_eq!(aliases.resolve("title"), Some(CanonicalField::Notes));
    }
}
