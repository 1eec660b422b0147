//! Weighted composite scoring over the 0–5 relevance, fit and ease sub-scores

use crate::constants::{DEFAULT_WEIGHTS, SCORE_DECIMALS, SCORE_MAX, SCORE_MIN};
use crate::error::{Result, WranglerError};
use crate::types::CanonicalRecord;

/// Read a sub-score: numeric text only, clamped to [0, 5]
pub fn coerce_score(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        // + 0.0 turns -0 into 0
        .map(|v| v.clamp(SCORE_MIN, SCORE_MAX) + 0.0)
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Relevance, fit and ease weights; non-negative and finite
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    relevance: f64,
    fit: f64,
    ease: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        let (relevance, fit, ease) = DEFAULT_WEIGHTS;
        Self { relevance, fit, ease }
    }
}

impl ScoreWeights {
    pub fn new(relevance: f64, fit: f64, ease: f64) -> Result<Self> {
        for (name, w) in [("relevance", relevance), ("fit", fit), ("ease", ease)] {
            if !w.is_finite() || w < 0.0 {
                return Err(WranglerError::InvalidWeights(format!(
                    "{} weight must be a non-negative number, got {}",
                    name, w
                )));
            }
        }
        Ok(Self { relevance, fit, ease })
    }

    pub fn from_slice(weights: &[f64]) -> Result<Self> {
        match weights {
            [r, f, e] => Self::new(*r, *f, *e),
            other => Err(WranglerError::InvalidWeights(format!(
                "expected 3 weights (relevance fit ease), got {}",
                other.len()
            ))),
        }
    }

    /// Weights scaled to sum to 1. All-zero weights count as equal weights.
    pub fn normalized(&self) -> (f64, f64, f64) {
        let (r, f, e) = if self.relevance + self.fit + self.ease == 0.0 {
            (1.0, 1.0, 1.0)
        } else {
            (self.relevance, self.fit, self.ease)
        };
        let total = r + f + e;
        (r / total, f / total, e / total)
    }

    /// Composite score rounded to 3 decimals; missing sub-scores count as 0
    pub fn score(&self, relevance: Option<f64>, fit: Option<f64>, ease: Option<f64>) -> f64 {
        let (wr, wf, we) = self.normalized();
        let raw = relevance.unwrap_or(0.0) * wr + fit.unwrap_or(0.0) * wf + ease.unwrap_or(0.0) * we;
        round_to(raw, SCORE_DECIMALS)
    }

    /// Recompute `weighted_score` from the record's current sub-scores
    pub fn apply(&self, record: &mut CanonicalRecord) {
        record.weighted_score = self.score(record.relevance, record.fit, record.ease);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_score() {
        let weights = ScoreWeights::default();
        assert_eq!(weights.score(Some(5.0), Some(3.0), Some(4.0)), 4.0);
    }

    #[test]
    fn test_weights_are_normalized() {
        let weights = ScoreWeights::new(2.0, 2.0, 1.0).unwrap();
        assert_eq!(weights.score(Some(5.0), Some(3.0), Some(4.0)), 4.0);
        assert_eq!(weights.normalized(), (0.4, 0.4, 0.2));
    }

    #[test]
    fn test_zero_weights_fall_back_to_equal_thirds() {
        let weights = ScoreWeights::new(0.0, 0.0, 0.0).unwrap();
        let (r, f, e) = weights.normalized();
        assert!((r - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(r, f);
        assert_eq!(f, e);
        assert_eq!(weights.score(Some(3.0), Some(3.0), Some(3.0)), 3.0);
    }

    #[test]
    fn test_missing_subscores_count_as_zero() {
        let weights = ScoreWeights::default();
        assert_eq!(weights.score(Some(5.0), None, None), 2.0);
        assert_eq!(weights.score(None, None, None), 0.0);
    }

    #[test]
    fn test_score_rounds_to_three_decimals() {
        let weights = ScoreWeights::new(1.0, 1.0, 1.0).unwrap();
        assert_eq!(weights.score(Some(1.0), Some(0.0), Some(0.0)), 0.333);
    }

    #[test]
    fn test_score_is_deterministic() {
        let weights = ScoreWeights::new(0.7, 0.2, 0.1).unwrap();
        let a = weights.score(Some(4.3), Some(2.2), Some(1.9));
        let b = weights.score(Some(4.3), Some(2.2), Some(1.9));
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn test_coerce_score_clamps() {
        assert_eq!(coerce_score(" 4.5 "), Some(4.5));
        assert_eq!(coerce_score("9"), Some(5.0));
        assert_eq!(coerce_score("-2"), Some(0.0));
        assert_eq!(coerce_score("high"), None);
        assert_eq!(coerce_score("NaN"), None);
    }

    #[test]
    fn test_coerce_score_negative_zero_is_plain_zero() {
        let zero = coerce_score("-0").unwrap();
        assert!(zero.is_sign_positive());
        assert_eq!(zero.to_string(), "0");

        let weights = ScoreWeights::default();
        let score = weights.score(Some(zero), coerce_score("-0.0"), None);
        assert!(score.is_sign_positive());
        assert_eq!(score.total_cmp(&0.0), std::cmp::Ordering::Equal);
    }

    #[test]
    fn test_invalid_weights_are_rejected() {
        assert!(ScoreWeights::new(-0.1, 0.5, 0.5).is_err());
        assert!(ScoreWeights::new(f64::INFINITY, 0.5, 0.5).is_err());
        assert!(ScoreWeights::from_slice(&[0.5, 0.5]).is_err());
        assert!(ScoreWeights::from_slice(&[0.5, 0.5, 0.0]).is_ok());
    }
}
