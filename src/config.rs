use std::collections::HashMap;
use std::fs;
use std::path::Path;

use chrono::{Local, NaiveDate};
use encoding_rs::Encoding;
use serde::Deserialize;

use crate::constants;
use crate::error::{Result, WranglerError};
use crate::pipeline::processing::mapper::AliasTable;
use crate::pipeline::processing::scoring::ScoreWeights;
use crate::types::CanonicalField;

/// Optional on-disk overrides, read from a TOML file
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Relevance, fit and ease weights, in that order
    pub weights: Option<Vec<f64>>,
    pub deadline_cutoff: Option<String>,
    pub strict: Option<bool>,
    pub encoding: Option<String>,
    pub top_n: Option<usize>,
    /// Extra `"raw header" = "canonical_field"` aliases
    #[serde(default)]
    pub aliases: HashMap<String, CanonicalField>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            WranglerError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Everything a pipeline run depends on, fixed before the run starts
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Normalized raw header → canonical field
    pub aliases: AliasTable,
    pub weights: ScoreWeights,
    /// `"today"`, a date, or `None` for no cutoff
    pub deadline_cutoff: Option<String>,
    /// Abort on the first unusable source file instead of skipping it
    pub strict: bool,
    /// Text encoding used to decode every source file
    pub encoding: &'static Encoding,
    /// Evaluation date for deadline arithmetic and the `today` cutoff
    pub as_of: NaiveDate,
    /// Rows shown by the printed summary
    pub top_n: usize,
    /// Lowercase file extensions picked up from the input folder
    pub extensions: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            aliases: AliasTable::builtin(),
            weights: ScoreWeights::default(),
            deadline_cutoff: None,
            strict: false,
            encoding: encoding_rs::UTF_8,
            as_of: Local::now().date_naive(),
            top_n: constants::DEFAULT_TOP_N,
            extensions: constants::DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

impl PipelineConfig {
    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_cutoff(mut self, cutoff: impl Into<String>) -> Self {
        self.deadline_cutoff = Some(cutoff.into());
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_as_of(mut self, as_of: NaiveDate) -> Self {
        self.as_of = as_of;
        self
    }

    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_aliases(mut self, aliases: AliasTable) -> Self {
        self.aliases = aliases;
        self
    }

    /// Layer a parsed config file over this configuration
    pub fn apply_file(mut self, file: ConfigFile) -> Result<Self> {
        if let Some(weights) = file.weights {
            self.weights = ScoreWeights::from_slice(&weights)?;
        }
        if let Some(cutoff) = file.deadline_cutoff {
            self.deadline_cutoff = Some(cutoff);
        }
        if let Some(strict) = file.strict {
            self.strict = strict;
        }
        if let Some(label) = file.encoding {
            self.encoding = resolve_encoding(&label)?;
        }
        if let Some(top_n) = file.top_n {
            self.top_n = top_n;
        }
        for (header, field) in file.aliases {
            self.aliases.insert(&header, field);
        }
        Ok(self)
    }
}

/// Look up a WHATWG encoding label such as `utf-8`, `latin1` or `windows-1252`
pub fn resolve_encoding(label: &str) -> Result<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| WranglerError::UnknownEncoding(label.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_overrides_defaults() {
        let file = ConfigFile::from_toml_str(
            r#"
            weights = [1.0, 1.0, 2.0]
            deadline_cutoff = "today"
            strict = true
            encoding = "latin1"
            top_n = 3

            [aliases]
            "Grant Title" = "grant_name"
            "#,
        )
        .unwrap();

        let config = PipelineConfig::default().apply_file(file).unwrap();
        assert_eq!(config.weights.normalized(), (0.25, 0.25, 0.5));
        assert_eq!(config.deadline_cutoff.as_deref(), Some("today"));
        assert!(config.strict);
        assert_eq!(config.encoding, encoding_rs::WINDOWS_1252);
        assert_eq!(config.top_n, 3);
        assert_eq!(config.aliases.resolve("grant   title"), Some(CanonicalField::GrantName));
    }

    #[test]
    fn test_config_file_rejects_bad_weights() {
        let file = ConfigFile::from_toml_str("weights = [0.5, 0.5]").unwrap();
        let err = PipelineConfig::default().apply_file(file).unwrap_err();
        assert!(matches!(err, WranglerError::InvalidWeights(_)));
    }

    #[test]
    fn test_config_file_rejects_unknown_field_names() {
        assert!(ConfigFile::from_toml_str("[aliases]\n\"x\" = \"weighted_score\"").is_err());
        assert!(ConfigFile::from_toml_str("colour = \"red\"").is_err());
    }

    #[test]
    fn test_unknown_encoding_is_an_error() {
        assert!(matches!(
            resolve_encoding("klingon-8"),
            Err(WranglerError::UnknownEncoding(_))
        ));
        assert_eq!(resolve_encoding("UTF-8").unwrap(), encoding_rs::UTF_8);
    }
}
