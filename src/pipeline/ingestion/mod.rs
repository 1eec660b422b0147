//! Source discovery and loading.
//!
//! Every candidate file ends up as exactly one [`SourceOutcome`]: a loaded
//! table, or a skip with its reason. `Err` is kept for conditions that must
//! stop the run regardless of strictness.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use encoding_rs::Encoding;
use tracing::{debug, info, warn};

use crate::error::{Result, WranglerError};

/// A delimited file read into memory: header row plus data rows
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub path: PathBuf,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// The delimiter that parsed this file
    pub delimiter: u8,
}

/// Why a source file contributed no rows
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    Unreadable(String),
    Empty,
    NoHeader,
    Malformed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreadable(e) => write!(f, "unreadable: {}", e),
            Self::Empty => write!(f, "no data rows"),
            Self::NoHeader => write!(f, "no header row"),
            Self::Malformed(e) => write!(f, "not valid CSV or TSV: {}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSource {
    pub path: PathBuf,
    pub reason: SkipReason,
}

#[derive(Debug)]
pub enum SourceOutcome {
    Loaded(RawTable),
    Skipped(SkippedSource),
}

/// Recursively list files under `dir` whose extension is in `extensions`, sorted by path
pub fn discover_sources(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(WranglerError::Config(format!(
            "input folder '{}' does not exist or is not a directory",
            dir.display()
        )));
    }

    let mut found = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if has_extension(&path, extensions) {
                found.push(path);
            }
        }
    }

    found.sort();
    debug!(dir = %dir.display(), files = found.len(), "discovered sources");
    Ok(found)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|want| want.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// Read and parse one source file. Problems with the file itself are skips, not errors.
pub fn load_source(path: &Path, encoding: &'static Encoding) -> SourceOutcome {
    let skip = |reason: SkipReason| {
        SourceOutcome::Skipped(SkippedSource {
            path: path.to_path_buf(),
            reason,
        })
    };

    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => return skip(SkipReason::Unreadable(e.to_string())),
    };

    let (text, used, had_errors) = encoding.decode(&bytes);
    if had_errors {
        warn!(
            path = %path.display(),
            encoding = used.name(),
            "undecodable bytes replaced while reading source"
        );
    }

    if text.trim().is_empty() {
        return skip(SkipReason::Empty);
    }

    match parse_delimited(&text) {
        Ok((headers, rows, delimiter)) => {
            if headers.iter().all(|h| h.trim().is_empty()) {
                return skip(SkipReason::NoHeader);
            }
            if rows.is_empty() {
                return skip(SkipReason::Empty);
            }
            info!(path = %path.display(), rows = rows.len(), "loaded source");
            SourceOutcome::Loaded(RawTable {
                path: path.to_path_buf(),
                headers,
                rows,
                delimiter,
            })
        }
        Err(e) => skip(SkipReason::Malformed(e)),
    }
}

type Parsed = (Vec<String>, Vec<Vec<String>>, u8);

/// Try comma first, fall back to tab.
///
/// Rows shorter than the header are kept as they are; the mapper reads the
/// missing trailing cells as blank. A parse is rejected when a row is wider
/// than its header, or when its single header cell still holds the other
/// delimiter.
pub fn parse_delimited(text: &str) -> std::result::Result<Parsed, String> {
    let comma_problem = match parse_with(text, b',') {
        Ok((headers, rows)) => match shape_problem(&headers, &rows, '\t') {
            None => return Ok((headers, rows, b',')),
            Some(problem) => problem,
        },
        Err(e) => e.to_string(),
    };

    match parse_with(text, b'\t') {
        Ok((headers, rows)) => match shape_problem(&headers, &rows, ',') {
            None => Ok((headers, rows, b'\t')),
            Some(problem) => Err(format!("comma: {}; tab: {}", comma_problem, problem)),
        },
        Err(e) => Err(format!("comma: {}; tab: {}", comma_problem, e)),
    }
}

fn shape_problem(headers: &[String], rows: &[Vec<String>], other_delimiter: char) -> Option<String> {
    if headers.len() == 1 && headers[0].contains(other_delimiter) {
        return Some(format!("single header cell contains {:?}", other_delimiter));
    }
    let wide = rows.iter().filter(|r| r.len() > headers.len()).count();
    if wide > 0 {
        return Some(format!("{} row(s) wider than the {}-column header", wide, headers.len()));
    }
    None
}

fn parse_with(text: &str, delimiter: u8) -> std::result::Result<(Vec<String>, Vec<Vec<String>>), csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(text.trim_start_matches('\u{feff}').as_bytes());

    let headers = reader.headers()?.iter().map(|h| h.to_string()).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        // a row of nothing but blank cells carries no grant
        if record.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        rows.push(record.iter().map(|c| c.to_string()).collect());
    }
    Ok((headers, rows))
}

/// Load every discovered source, applying the strict/lenient skip policy.
///
/// Fails when nothing usable remains.
pub fn load_folder(
    dir: &Path,
    extensions: &[String],
    encoding: &'static Encoding,
    strict: bool,
) -> Result<(Vec<RawTable>, Vec<SkippedSource>)> {
    let paths = discover_sources(dir, extensions)?;

    let mut tables = Vec::new();
    let mut skipped = Vec::new();
    for path in paths {
        match load_source(&path, encoding) {
            SourceOutcome::Loaded(table) => tables.push(table),
            SourceOutcome::Skipped(skip) => {
                if strict {
                    return Err(WranglerError::SourceRejected {
                        path: skip.path,
                        reason: skip.reason,
                    });
                }
                warn!(path = %skip.path.display(), reason = %skip.reason, "skipping source");
                skipped.push(skip);
            }
        }
    }

    if tables.is_empty() {
        return Err(WranglerError::NoInputFiles(dir.to_path_buf()));
    }
    Ok((tables, skipped))
}
