use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{info, info_span, instrument};

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::pipeline::ingestion::{load_folder, RawTable, SkippedSource};
use crate::pipeline::processing::dedup::{Deduplicator, KeyedDeduplicator};
use crate::pipeline::processing::filter::{sort_for_output, Cutoff};
use crate::pipeline::processing::mapper::ColumnPlan;
use crate::pipeline::processing::normalize::{DefaultNormalizer, Normalizer};
use crate::pipeline::storage::{persist_all, Artifact, CsvTableWriter, OutputTable, TableWriter, XlsxTableWriter};
use crate::types::{CanonicalRecord, MappedRow};

/// Result of a complete pipeline run, before anything is written
#[derive(Debug)]
pub struct PipelineResult {
    /// Final rows, filtered and in output order
    pub records: Vec<CanonicalRecord>,
    /// Unmapped source headers, first-seen order across files
    pub extra_columns: Vec<String>,
    pub loaded_files: usize,
    pub skipped: Vec<SkippedSource>,
    /// Data rows read across all loaded files
    pub input_rows: usize,
}

impl PipelineResult {
    pub fn table(&self) -> OutputTable {
        OutputTable::from_records(&self.records, &self.extra_columns)
    }

    pub fn expired_count(&self) -> usize {
        self.records.iter().filter(|r| r.expired).count()
    }

    pub fn summary(&self, top_n: usize, csv_sha256: Option<String>) -> RunSummary {
        RunSummary {
            rows: self.records.len(),
            expired: self.expired_count(),
            skipped: self.skipped.len(),
            top: self.records.iter().take(top_n).cloned().collect(),
            csv_sha256,
        }
    }
}

/// Where a run writes its artifacts
#[derive(Debug, Clone)]
pub struct OutputTargets {
    pub csv: PathBuf,
    pub xlsx: Option<PathBuf>,
}

/// What a run wrote
#[derive(Debug, Clone)]
pub struct WrittenOutputs {
    pub csv_sha256: String,
    pub files: Vec<PathBuf>,
}

pub struct Pipeline {
    config: PipelineConfig,
    normalizer: Box<dyn Normalizer>,
    deduplicator: Box<dyn Deduplicator>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let normalizer = Box::new(DefaultNormalizer::new(config.as_of));
        Self {
            config,
            normalizer,
            deduplicator: Box::new(KeyedDeduplicator::new()),
        }
    }

    pub fn with_deduplicator(mut self, deduplicator: Box<dyn Deduplicator>) -> Self {
        self.deduplicator = deduplicator;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load every source under `input` and run all stages
    #[instrument(skip(self), fields(input = %input.display()))]
    pub fn run(&self, input: &Path) -> Result<PipelineResult> {
        let (tables, skipped) = load_folder(
            input,
            &self.config.extensions,
            self.config.encoding,
            self.config.strict,
        )?;

        let mut result = self.process_tables(&tables);
        result.skipped = skipped;
        Ok(result)
    }

    /// Map, normalize, score, deduplicate, filter and sort already-loaded tables
    pub fn process_tables(&self, tables: &[RawTable]) -> PipelineResult {
        let mut extra_columns: Vec<String> = Vec::new();
        let mut mapped = Vec::new();

        {
            let _span = info_span!("map").entered();
            for table in tables {
                let plan = ColumnPlan::new(&table.headers, &self.config.aliases);
                for header in plan.unmapped_headers() {
                    if !extra_columns.iter().any(|h| h == header) {
                        extra_columns.push(header.to_string());
                    }
                }
                info!(source = %table.path.display(), rows = table.rows.len(), "mapping");
                mapped.extend(plan.map_rows(table));
            }
        }

        let input_rows = mapped.len();
        let scored = self.score_rows(mapped);

        let deduped = {
            let _span = info_span!("dedup").entered();
            self.deduplicator.deduplicate(scored)
        };

        let cutoff = Cutoff::resolve(self.config.deadline_cutoff.as_deref(), self.config.as_of);
        let mut records = cutoff.apply(deduped);
        sort_for_output(&mut records);

        info!(
            files = tables.len(),
            input_rows,
            output_rows = records.len(),
            "pipeline finished"
        );

        PipelineResult {
            records,
            extra_columns,
            loaded_files: tables.len(),
            skipped: Vec::new(),
            input_rows,
        }
    }

    /// Normalize and score mapped rows; no deduplication or filtering
    pub fn score_rows(&self, rows: Vec<MappedRow>) -> Vec<CanonicalRecord> {
        let _span = info_span!("normalize_and_score", rows = rows.len()).entered();
        rows.into_iter()
            .map(|row| {
                let mut record = self.normalizer.normalize(row);
                self.config.weights.apply(&mut record);
                record
            })
            .collect()
    }

    /// Render every requested artifact, then write them all
    pub fn write(&self, result: &PipelineResult, targets: &OutputTargets) -> Result<WrittenOutputs> {
        let table = result.table();

        let csv = Artifact {
            path: targets.csv.clone(),
            bytes: CsvTableWriter.render(&table)?,
        };
        let csv_sha256 = csv.sha256();

        let mut artifacts = vec![csv];
        if let Some(path) = &targets.xlsx {
            artifacts.push(Artifact {
                path: path.clone(),
                bytes: XlsxTableWriter::default().render(&table)?,
            });
        }

        persist_all(&artifacts)?;
        Ok(WrittenOutputs {
            csv_sha256,
            files: artifacts.into_iter().map(|a| a.path).collect(),
        })
    }
}

/// Human-readable digest of a finished run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub rows: usize,
    pub expired: usize,
    pub skipped: usize,
    pub top: Vec<CanonicalRecord>,
    pub csv_sha256: Option<String>,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Rows: {} | Expired: {}", self.rows, self.expired)?;
        if self.skipped > 0 {
            writeln!(f, "Skipped files: {}", self.skipped)?;
        }
        for (rank, r) in self.top.iter().enumerate() {
            writeln!(
                f,
                "{:>2}. {:<40} {:<30} {:<10} {:>6}",
                rank + 1,
                truncate(r.grant_name.as_deref().unwrap_or(""), 40),
                truncate(r.sponsor_org.as_deref().unwrap_or(""), 30),
                r.deadline.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
                r.weighted_score
            )?;
        }
        if let Some(sha) = &self.csv_sha256 {
            writeln!(f, "sha256: {}", sha)?;
        }
        Ok(())
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max - 1).collect();
        out.push('…');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processing::dedup::tests::record;
    use chrono::NaiveDate;

    fn table(name: &str, headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable {
            path: PathBuf::from(name),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
            delimiter: b',',
        }
    }

    fn pipeline() -> Pipeline {
        Pipeline::new(PipelineConfig::default().with_as_of(NaiveDate::from_ymd_opt(2025, 1, 10).unwrap()))
    }

    #[test]
    fn test_duplicates_across_files_collapse() {
        let tables = vec![
            table(
                "a.csv",
                &["Grant name", "Sponsor org", "Deadline", "Relevance", "Fit", "Ease"],
                &[&["Acme Grant", "Dept of X", "2025-06-01", "3", "3", "3"]],
            ),
            table(
                "b.csv",
                &["Title", "Agency", "Close Date", "Relevance", "Fit", "Ease"],
                &[&["ACME GRANT", "dept of x ", "May 1, 2025", "4", "4", "4"]],
            ),
        ];

        let result = pipeline().process_tables(&tables);

        assert_eq!(result.input_rows, 2);
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].source_file, "b.csv");
        assert_eq!(result.records[0].weighted_score, 4.0);
    }

    #[test]
    fn test_extra_columns_are_collected_in_first_seen_order() {
        let tables = vec![
            table("a.csv", &["Title", "Region", "Contact"], &[&["A", "West", ""]]),
            table("b.csv", &["Title", "Contact", "Program Officer"], &[&["B", "x@y.z", "Pat"]]),
        ];

        let result = pipeline().process_tables(&tables);
        assert_eq!(result.extra_columns, vec!["Region", "Contact", "Program Officer"]);
    }

    #[test]
    fn test_cutoff_is_applied_after_dedup() {
        let config = PipelineConfig::default()
            .with_as_of(NaiveDate::from_ymd_opt(2025, 1, 10).unwrap())
            .with_cutoff("today");
        let tables = vec![table(
            "a.csv",
            &["Title", "Agency", "Deadline"],
            &[&["Old", "S", "2025-01-01"], &["Now", "S", "2025-01-10"], &["Open", "S", ""]],
        )];

        let result = Pipeline::new(config).process_tables(&tables);
        let names: Vec<_> = result.records.iter().map(|r| r.grant_name.clone().unwrap()).collect();
        assert_eq!(names, vec!["Now", "Open"]);
    }

    #[test]
    fn test_summary_counts_expired_and_takes_top() {
        let mut expired = record("Old", "S", Some((2024, 1, 1)), 1.0);
        expired.expired = true;
        let result = PipelineResult {
            records: vec![record("New", "S", None, 3.0), expired],
            extra_columns: Vec::new(),
            loaded_files: 1,
            skipped: Vec::new(),
            input_rows: 2,
        };

        let summary = result.summary(1, Some("abc".to_string()));
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.expired, 1);
        assert_eq!(summary.top.len(), 1);

        let printed = summary.to_string();
        assert!(printed.starts_with("Rows: 2 | Expired: 1\n"));
        assert!(printed.contains("New"));
        assert!(printed.contains("sha256: abc"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 4), "abc…");
    }
}
