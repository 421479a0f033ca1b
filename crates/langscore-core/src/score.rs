//! Scores with provenance.
//!
//! A [`Score`] is a scalar plus an attribute map. Attributes keep everything
//! needed to audit a number after the fact: the raw metric value before ceiling
//! normalization, the ceiling itself, an overshoot value when clamping
//! happened, or the full per-split / per-neuroid series behind an aggregate.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Attribute name for the pre-normalization value (or per-split series).
pub const ATTR_RAW: &str = "raw";
/// Attribute name for the ceiling used as normalization denominator.
pub const ATTR_CEILING: &str = "ceiling";
/// Attribute name for the unclamped ratio when it exceeded 1.
pub const ATTR_OVERSHOOT: &str = "overshoot";

/// One provenance attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ScoreAttr {
    Scalar(f64),
    Series(Vec<f64>),
    Score(Box<Score>),
    Text(String),
}

impl ScoreAttr {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            ScoreAttr::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_series(&self) -> Option<&[f64]> {
        match self {
            ScoreAttr::Series(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_score(&self) -> Option<&Score> {
        match self {
            ScoreAttr::Score(s) => Some(s),
            _ => None,
        }
    }
}

/// Scalar score with attached attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    value: f64,
    #[serde(default)]
    attrs: BTreeMap<String, ScoreAttr>,
}

impl Score {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            attrs: BTreeMap::new(),
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Attach an attribute (builder style).
    pub fn with_attr(mut self, name: impl Into<String>, attr: ScoreAttr) -> Self {
        self.attrs.insert(name.into(), attr);
        self
    }

    pub fn set_attr(&mut self, name: impl Into<String>, attr: ScoreAttr) {
        self.attrs.insert(name.into(), attr);
    }

    pub fn attr(&self, name: &str) -> Option<&ScoreAttr> {
        self.attrs.get(name)
    }

    pub fn attrs(&self) -> &BTreeMap<String, ScoreAttr> {
        &self.attrs
    }

    /// The `raw` attribute when it holds a score.
    pub fn raw(&self) -> Option<&Score> {
        self.attr(ATTR_RAW).and_then(ScoreAttr::as_score)
    }

    /// The `ceiling` attribute when it holds a score.
    pub fn ceiling(&self) -> Option<&Score> {
        self.attr(ATTR_CEILING).and_then(ScoreAttr::as_score)
    }

    /// The unclamped ratio, present only when normalization clamped to 1.
    pub fn overshoot(&self) -> Option<f64> {
        self.attr(ATTR_OVERSHOOT).and_then(ScoreAttr::as_scalar)
    }
}

impl PartialEq<f64> for Score {
    fn eq(&self, other: &f64) -> bool {
        self.value == *other
    }
}

impl PartialOrd<f64> for Score {
    fn partial_cmp(&self, other: &f64) -> Option<std::cmp::Ordering> {
        self.value.partial_cmp(other)
    }
}

/// Orders by value only; attributes are ignored.
impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.value.partial_cmp(&other.value)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.value)?;
        if !self.attrs.is_empty() {
            let names: Vec<&str> = self.attrs.keys().map(String::as_str).collect();
            write!(f, " [{}]", names.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scores_compare_by_value() {
        let ceiling = Score::new(0.8).with_attr(ATTR_RAW, ScoreAttr::Series(vec![0.7, 0.9]));
        let raw = Score::new(0.4);
        assert!(ceiling > raw);
        assert!(raw < ceiling);
        assert!(Score::new(f64::NAN).partial_cmp(&raw).is_none());
    }

    #[test]
    fn test_scalar_comparisons() {
        let s = Score::new(1.5);
        assert!(s > 1.0);
        assert!(s < 2.0);
        assert!(s == 1.5);
    }

    #[test]
    fn test_nested_provenance_accessors() {
        let raw = Score::new(0.4);
        let ceiling = Score::new(0.8);
        let s = Score::new(0.5)
            .with_attr(ATTR_RAW, ScoreAttr::Score(Box::new(raw.clone())))
            .with_attr(ATTR_CEILING, ScoreAttr::Score(Box::new(ceiling.clone())));
        assert_eq!(s.raw(), Some(&raw));
        assert_eq!(s.ceiling(), Some(&ceiling));
        assert_eq!(s.overshoot(), None);
    }

    #[test]
    fn test_serde_preserves_attrs() {
        let s = Score::new(0.7)
            .with_attr("raw", ScoreAttr::Series(vec![0.6, 0.8]))
            .with_attr(ATTR_OVERSHOOT, ScoreAttr::Scalar(1.2));
        let json = serde_json::to_string(&s).unwrap();
        let back: Score = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
        assert_eq!(back.overshoot(), Some(1.2));
    }

    #[test]
    fn test_display_lists_attribute_names() {
        let s = Score::new(0.25).with_attr(ATTR_CEILING, ScoreAttr::Scalar(0.5));
        assert_eq!(s.to_string(), "0.2500 [ceiling]");
    }
}
