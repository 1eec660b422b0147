//! Scoring variant for program/accelerator datasets.
//!
//! Two extra signals join the three primary dimensions:
//! `0.3·relevance + 0.3·fit + 0.2·ease + 0.1·stack_alignment + 0.1·cadence_recency`.

use chrono::NaiveDate;

use crate::constants::{
    CADENCE_HORIZON_DAYS, PROGRAM_SIGNAL_WEIGHT, PROGRAM_WEIGHTS, SCORE_DECIMALS, STACK_ALIGNED, STACK_UNALIGNED,
};
use crate::pipeline::ingestion::RawTable;
use crate::pipeline::processing::mapper::normalize_header;
use crate::pipeline::processing::normalize::parse_date;
use crate::pipeline::processing::scoring::{coerce_score, round_to};

pub const STACK_ALIGNMENT_COLUMN: &str = "StackAlignment";
pub const CADENCE_RECENCY_COLUMN: &str = "CadenceRecency";
pub const WEIGHTED_SCORE_COLUMN: &str = "Weighted Score";

const AFFIRMATIVE_TOKENS: [&str; 3] = ["yes", "y", "true"];
const OPEN_ENDED_TOKENS: [&str; 3] = ["rolling", "ongoing", "open-ended"];

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || c == '-'))
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
}

/// 1.0 when the "stack required" indicator says yes, else 0.2
pub fn stack_alignment(indicator: &str) -> f64 {
    if words(indicator).any(|w| AFFIRMATIVE_TOKENS.contains(&w.as_str())) {
        STACK_ALIGNED
    } else {
        STACK_UNALIGNED
    }
}

pub fn is_open_ended(text: &str) -> bool {
    words(text).any(|w| OPEN_ENDED_TOKENS.contains(&w.as_str()))
}

/// 1.0 for rolling programs; otherwise decays linearly to 0 over a year until the next cycle
pub fn cadence_recency(next_cycle: &str, cadence: &str, as_of: NaiveDate) -> f64 {
    if is_open_ended(next_cycle) || is_open_ended(cadence) {
        return 1.0;
    }

    match parse_date(next_cycle) {
        Some(date) => {
            let days = (date - as_of).num_days();
            if days < 0 {
                0.0
            } else {
                (1.0 - days.min(CADENCE_HORIZON_DAYS) as f64 / CADENCE_HORIZON_DAYS as f64).max(0.0)
            }
        }
        None => 0.0,
    }
}

pub fn program_score(relevance: f64, fit: f64, ease: f64, stack: f64, cadence: f64) -> f64 {
    let (wr, wf, we) = PROGRAM_WEIGHTS;
    let raw = wr * relevance + wf * fit + we * ease + PROGRAM_SIGNAL_WEIGHT * stack + PROGRAM_SIGNAL_WEIGHT * cadence;
    round_to(raw, SCORE_DECIMALS)
}

/// Per-row program signals
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgramScore {
    pub stack_alignment: f64,
    pub cadence_recency: f64,
    pub weighted_score: f64,
}

fn column(headers: &[String], name: &str) -> Option<usize> {
    let wanted = normalize_header(name);
    headers.iter().rposition(|h| normalize_header(h) == wanted)
}

/// Score every row and write the three signal columns back into the table
pub fn score_program_table(table: &mut RawTable, as_of: NaiveDate) -> Vec<ProgramScore> {
    let stack_col = column(&table.headers, "Stack Required?");
    let next_col = column(&table.headers, "Deadline / Next Cohort");
    let cadence_col = column(&table.headers, "Cadence");
    let relevance_col = column(&table.headers, "Relevance");
    let fit_col = column(&table.headers, "Fit");
    let ease_col = column(&table.headers, "Ease");

    let scores: Vec<ProgramScore> = table
        .rows
        .iter()
        .map(|row| {
            let cell = |idx: Option<usize>| idx.and_then(|i| row.get(i)).map(|s| s.as_str()).unwrap_or("");
            let sub = |idx: Option<usize>| coerce_score(cell(idx)).unwrap_or(0.0);

            let stack = stack_alignment(cell(stack_col));
            let cadence = cadence_recency(cell(next_col), cell(cadence_col), as_of);
            ProgramScore {
                stack_alignment: round_to(stack, SCORE_DECIMALS),
                cadence_recency: round_to(cadence, SCORE_DECIMALS),
                weighted_score: program_score(sub(relevance_col), sub(fit_col), sub(ease_col), stack, cadence),
            }
        })
        .collect();

    set_column(table, STACK_ALIGNMENT_COLUMN, scores.iter().map(|s| s.stack_alignment));
    set_column(table, CADENCE_RECENCY_COLUMN, scores.iter().map(|s| s.cadence_recency));
    set_column(table, WEIGHTED_SCORE_COLUMN, scores.iter().map(|s| s.weighted_score));
    scores
}

/// Overwrite the named column, or append it when the table lacks one
fn set_column(table: &mut RawTable, name: &str, values: impl Iterator<Item = f64>) {
    let idx = match table.headers.iter().position(|h| h == name) {
        Some(idx) => idx,
        None => {
            table.headers.push(name.to_string());
            table.headers.len() - 1
        }
    };

    for (row, value) in table.rows.iter_mut().zip(values) {
        if row.len() <= idx {
            row.resize(idx + 1, String::new());
        }
        row[idx] = value.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_stack_alignment() {
        assert_eq!(stack_alignment("Yes - Rust"), 1.0);
        assert_eq!(stack_alignment("y"), 1.0);
        assert_eq!(stack_alignment("No"), 0.2);
        assert_eq!(stack_alignment("eyes only"), 0.2);
        assert_eq!(stack_alignment(""), 0.2);
    }

    #[test]
    fn test_cadence_recency() {
        let today = date(2025, 1, 1);
        assert_eq!(cadence_recency("Rolling", "", today), 1.0);
        assert_eq!(cadence_recency("", "open-ended intake", today), 1.0);
        assert_eq!(cadence_recency("2025-01-01", "annual", today), 1.0);
        assert_eq!(cadence_recency("2026-01-01", "annual", today), 0.0);
        assert_eq!(cadence_recency("2027-06-01", "annual", today), 0.0);
        assert_eq!(cadence_recency("2024-12-01", "annual", today), 0.0);
        assert_eq!(cadence_recency("TBD", "annual", today), 0.0);

        let mid = cadence_recency("2025-07-02", "", today);
        assert!((mid - (1.0 - 182.0 / 365.0)).abs() < 1e-12);
    }

    #[test]
    fn test_program_score_weights() {
        assert_eq!(program_score(5.0, 5.0, 5.0, 1.0, 1.0), 4.2);
        assert_eq!(program_score(0.0, 0.0, 0.0, 0.2, 0.0), 0.02);
    }

    #[test]
    fn test_score_program_table_appends_columns() {
        let mut table = RawTable {
            path: PathBuf::from("programs.csv"),
            headers: ["Program", "Relevance", "Fit", "Ease", "Stack Required?", "Deadline / Next Cohort", "Cadence"]
                .iter()
                .map(|h| h.to_string())
                .collect(),
            rows: vec![
                ["Accel", "5", "4", "3", "yes", "rolling", ""].iter().map(|c| c.to_string()).collect(),
                ["Later", "x", "2", "2", "no", "2025-01-01", "annual"].iter().map(|c| c.to_string()).collect(),
            ],
            delimiter: b',',
        };

        let scores = score_program_table(&mut table, date(2025, 1, 1));

        assert_eq!(scores[0].weighted_score, program_score(5.0, 4.0, 3.0, 1.0, 1.0));
        assert_eq!(scores[1].stack_alignment, 0.2);
        assert_eq!(scores[1].cadence_recency, 1.0);
        assert_eq!(table.headers.len(), 10);
        assert_eq!(table.headers[9], WEIGHTED_SCORE_COLUMN);
        assert_eq!(table.rows[0][7], "1");
        assert_eq!(table.rows[1][7], "0.2");
    }
}
