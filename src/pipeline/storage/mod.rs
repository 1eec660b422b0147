//! Output artifacts: the master delimited file and its spreadsheet mirror.
//!
//! Writers render a whole [`OutputTable`] to bytes first; files are only
//! touched once every artifact rendered, and each lands via rename.

pub mod xlsx;

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::info;

use crate::constants::{CANONICAL_COLUMNS, DERIVED_COLUMNS};
use crate::error::Result;
use crate::types::CanonicalRecord;

pub use xlsx::XlsxTableWriter;

/// A typed output cell; writers decide how each kind is encoded
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    fn text(value: &Option<String>) -> Self {
        value.as_ref().map_or(Cell::Empty, |v| Cell::Text(v.clone()))
    }

    fn number(value: Option<f64>) -> Self {
        value.map_or(Cell::Empty, Cell::Number)
    }

    /// The text a delimited file carries for this cell
    pub fn render(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => n.to_string(),
            Cell::Bool(b) => b.to_string(),
        }
    }
}

/// The final table: canonical columns, derived columns, then leftovers
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl OutputTable {
    pub fn from_records(records: &[CanonicalRecord], extra_columns: &[String]) -> Self {
        let headers = CANONICAL_COLUMNS
            .iter()
            .chain(DERIVED_COLUMNS.iter())
            .map(|h| h.to_string())
            .chain(extra_columns.iter().cloned())
            .collect();

        let rows = records
            .iter()
            .map(|r| {
                let mut row = vec![
                    Cell::text(&r.grant_name),
                    Cell::text(&r.sponsor_org),
                    Cell::text(&r.link),
                    Cell::number(r.award_max),
                    Cell::number(r.award_min),
                    Cell::text(&r.funding_instrument),
                    Cell::text(&r.eligibility),
                    Cell::text(&r.period_of_performance),
                    r.deadline
                        .map_or(Cell::Empty, |d| Cell::Text(d.format("%Y-%m-%d").to_string())),
                    Cell::number(r.total_funding),
                    Cell::number(r.relevance),
                    Cell::number(r.fit),
                    Cell::number(r.ease),
                    Cell::Number(r.weighted_score),
                    Cell::text(&r.status),
                    Cell::text(&r.notes),
                    Cell::Text(r.source_file.clone()),
                    Cell::number(r.days_to_deadline.map(|d| d as f64)),
                    Cell::Bool(r.expired),
                ];
                row.extend(
                    extra_columns
                        .iter()
                        .map(|h| r.extra(h).map_or(Cell::Empty, |v| Cell::Text(v.to_string()))),
                );
                row
            })
            .collect();

        Self { headers, rows }
    }
}

/// Renders an output table into the bytes of one artifact
pub trait TableWriter {
    fn render(&self, table: &OutputTable) -> Result<Vec<u8>>;
}

/// Comma-separated master file writer
#[derive(Debug, Default)]
pub struct CsvTableWriter;

impl TableWriter for CsvTableWriter {
    fn render(&self, table: &OutputTable) -> Result<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
        writer.write_record(&table.headers)?;
        for row in &table.rows {
            writer.write_record(row.iter().map(Cell::render))?;
        }
        writer
            .into_inner()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()).into())
    }
}

/// A rendered artifact waiting to be written
pub struct Artifact {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn sha256(&self) -> String {
        hex::encode(Sha256::digest(&self.bytes))
    }
}

/// Write each artifact to a sibling temp file, then rename them all into place
pub fn persist_all(artifacts: &[Artifact]) -> Result<()> {
    let mut staged = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        if let Some(parent) = artifact.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = temp_path(&artifact.path);
        if let Err(e) = fs::write(&tmp, &artifact.bytes) {
            for (tmp, _) in &staged {
                let _ = fs::remove_file(tmp);
            }
            return Err(e.into());
        }
        staged.push((tmp, artifact.path.clone()));
    }

    for (tmp, path) in staged {
        fs::rename(&tmp, &path)?;
        info!(path = %path.display(), "wrote output");
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
