//! Page-text collaborators: document bytes to plain text, and keyword
//! windows from plain text to a mapped row.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use tracing::debug;

use crate::constants::{KEYWORD_WINDOW, NOTES_SEPARATOR};
use crate::error::Result;
use crate::types::{CanonicalField, MappedRow};

static DOLLAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\s?[\d,]+(?:\.\d+)?").expect("dollar regex"));
static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:\d{4}-\d{2}-\d{2}|(?:January|February|March|April|May|June|July|August|September|October|November|December)\s?\d{1,2},\s?\d{4})",
    )
    .expect("date regex")
});

/// Keyword hints per extracted field; the first keyword found wins
pub const KEYWORDS: [(&str, &[&str]); 9] = [
    ("grant_name", &["grant"]),
    ("sponsor_org", &["sponsor", "department"]),
    ("award_max", &["funding", "award"]),
    ("deadline", &["deadline", "due"]),
    ("industries", &["industry", "industries"]),
    ("match_req_pct", &["match", "cost share"]),
    ("timeline_summary", &["period of performance", "timeline"]),
    ("reimb_pct", &["reimburse", "reimbursement"]),
    ("reporting_schema", &["reporting", "reports"]),
];

/// Turns a document byte stream into plain text
pub trait TextExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String>;
}

/// Visible text of an HTML page; script and style content is skipped
#[derive(Debug, Default)]
pub struct HtmlTextExtractor;

impl TextExtractor for HtmlTextExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String> {
        let html = String::from_utf8_lossy(bytes);
        let document = Html::parse_document(&html);

        let parts: Vec<&str> = document
            .root_element()
            .descendants()
            .filter(|node| {
                let hidden = node
                    .parent()
                    .and_then(|p| p.value().as_element().map(|e| matches!(e.name(), "script" | "style")))
                    .unwrap_or(false);
                !hidden
            })
            .filter_map(|node| node.value().as_text().map(|t| t.trim()))
            .filter(|t| !t.is_empty())
            .collect();

        debug!(bytes = bytes.len(), fragments = parts.len(), "extracted html text");
        Ok(parts.join(" "))
    }
}

/// ±300-character windows around the first keyword hit for each field
pub fn find_field_windows(text: &str) -> BTreeMap<String, String> {
    let chars: Vec<char> = text.chars().collect();
    // one lowercase char per source char keeps indices aligned
    let lowered: Vec<char> = chars
        .iter()
        .map(|c| c.to_lowercase().next().unwrap_or(*c))
        .collect();

    let mut windows = BTreeMap::new();
    for (field, keywords) in KEYWORDS {
        for keyword in keywords {
            let needle: Vec<char> = keyword.chars().collect();
            if let Some(idx) = find_chars(&lowered, &needle) {
                let start = idx.saturating_sub(KEYWORD_WINDOW);
                let end = (idx + needle.len() + KEYWORD_WINDOW).min(chars.len());
                windows.insert(field.to_string(), chars[start..end].iter().collect());
                break;
            }
        }
    }
    windows
}

fn find_chars(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Build a mapped row from keyword windows.
///
/// Award and deadline windows are narrowed to their first dollar amount and
/// date; windows without a canonical home are folded into notes.
pub fn windows_to_row(windows: &BTreeMap<String, String>, source_file: &str) -> MappedRow {
    let mut row = MappedRow {
        source_file: source_file.to_string(),
        ..MappedRow::default()
    };
    let mut notes = Vec::new();

    for (field, window) in windows {
        let window = collapse(window);
        match field.as_str() {
            "grant_name" => {
                row.fields.insert(CanonicalField::GrantName, window);
            }
            "sponsor_org" => {
                row.fields.insert(CanonicalField::SponsorOrg, window);
            }
            "timeline_summary" => {
                row.fields.insert(CanonicalField::PeriodOfPerformance, window);
            }
            "award_max" => {
                if let Some(m) = DOLLAR_RE.find(&window) {
                    row.fields.insert(CanonicalField::AwardMax, m.as_str().to_string());
                }
            }
            "deadline" => {
                if let Some(m) = DATE_RE.find(&window) {
                    row.fields.insert(CanonicalField::Deadline, m.as_str().to_string());
                }
            }
            other => notes.push(format!("{}: {}", other, window)),
        }
    }

    if !notes.is_empty() {
        row.fields.insert(CanonicalField::Notes, notes.join(NOTES_SEPARATOR));
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_text_skips_scripts() {
        let html = br#"<html><head><style>p { color: red }</style><script>var x = 1;</script></head>
            <body><h1>Clean Water Grant</h1><p>Sponsor: Dept of Water</p></body></html>"#;

        let text = HtmlTextExtractor.extract_text(html).unwrap();
        assert_eq!(text, "Clean Water Grant Sponsor: Dept of Water");
    }

    #[test]
    fn test_find_field_windows_is_bounded() {
        let text = format!("{}Application deadline: June 1, 2025{}", "x".repeat(500), "y".repeat(500));
        let windows = find_field_windows(&text);

        let deadline = &windows["deadline"];
        assert!(deadline.contains("deadline: June 1, 2025"));
        assert_eq!(deadline.chars().count(), KEYWORD_WINDOW * 2 + "deadline".len());
        assert!(!windows.contains_key("sponsor_org"));
    }

    #[test]
    fn test_find_field_windows_handles_multibyte_text() {
        let windows = find_field_windows("Ünïcödé GRANT für Straße");
        assert_eq!(windows["grant_name"], "Ünïcödé GRANT für Straße");
    }

    #[test]
    fn test_windows_to_row_narrows_money_and_dates() {
        let mut windows = BTreeMap::new();
        windows.insert("award_max".to_string(), "Awards of up to $250,000 per  project".to_string());
        windows.insert("deadline".to_string(), "Applications due by March 3, 2026 at noon".to_string());
        windows.insert("industries".to_string(), "Industries: agriculture".to_string());

        let row = windows_to_row(&windows, "page.html");

        assert_eq!(row.get(CanonicalField::AwardMax), Some("$250,000"));
        assert_eq!(row.get(CanonicalField::Deadline), Some("March 3, 2026"));
        assert_eq!(row.get(CanonicalField::Notes), Some("industries: Industries: agriculture"));
        assert_eq!(row.source_file, "page.html");
    }
}
