//! Stimulus datasets.
//!
//! A [`Dataset`] is an ordered list of stimuli with unique sample ids and any
//! number of per-sample coordinates (passage, condition, context group...).
//! Sample order is the alignment key for every array derived from it.

use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Ordered stimuli plus per-sample metadata coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    identifier: String,
    stimuli: Vec<String>,
    sample_ids: Vec<String>,
    #[serde(default)]
    coords: BTreeMap<String, Vec<String>>,
}

impl Dataset {
    /// Create a dataset, validating that ids are unique and aligned.
    pub fn new(
        identifier: impl Into<String>,
        stimuli: Vec<String>,
        sample_ids: Vec<String>,
    ) -> CoreResult<Self> {
        if stimuli.len() != sample_ids.len() {
            return Err(CoreError::LengthMismatch {
                name: "sample_ids".to_string(),
                expected: stimuli.len(),
                actual: sample_ids.len(),
            });
        }
        let dataset = Self {
            identifier: identifier.into(),
            stimuli,
            sample_ids,
            coords: BTreeMap::new(),
        };
        dataset.validate()?;
        Ok(dataset)
    }

    /// Create a dataset whose sample ids are the stimulus positions ("0", "1", ...).
    pub fn from_stimuli(identifier: impl Into<String>, stimuli: Vec<String>) -> Self {
        let sample_ids = (0..stimuli.len()).map(|i| i.to_string()).collect();
        Self {
            identifier: identifier.into(),
            stimuli,
            sample_ids,
            coords: BTreeMap::new(),
        }
    }

    /// Attach a per-sample coordinate (builder style).
    pub fn with_coord(mut self, name: impl Into<String>, values: Vec<String>) -> CoreResult<Self> {
        let name = name.into();
        if values.len() != self.len() {
            return Err(CoreError::LengthMismatch {
                name,
                expected: self.len(),
                actual: values.len(),
            });
        }
        self.coords.insert(name, values);
        Ok(self)
    }

    /// Load a dataset from a JSON file and validate it.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let file = File::open(path.as_ref())?;
        let dataset: Dataset = serde_json::from_reader(BufReader::new(file))?;
        dataset.validate()?;
        Ok(dataset)
    }

    /// Check the alignment invariants.
    pub fn validate(&self) -> CoreResult<()> {
        if self.sample_ids.len() != self.stimuli.len() {
            return Err(CoreError::LengthMismatch {
                name: "sample_ids".to_string(),
                expected: self.stimuli.len(),
                actual: self.sample_ids.len(),
            });
        }
        let mut seen = HashSet::with_capacity(self.sample_ids.len());
        for id in &self.sample_ids {
            if !seen.insert(id.as_str()) {
                return Err(CoreError::DuplicateSampleId(id.clone()));
            }
        }
        for (name, values) in &self.coords {
            if values.len() != self.stimuli.len() {
                return Err(CoreError::LengthMismatch {
                    name: name.clone(),
                    expected: self.stimuli.len(),
                    actual: values.len(),
                });
            }
        }
        Ok(())
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn stimuli(&self) -> &[String] {
        &self.stimuli
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// All metadata coordinates, keyed by name.
    pub fn coords(&self) -> &BTreeMap<String, Vec<String>> {
        &self.coords
    }

    /// Values of one coordinate, if present.
    pub fn coord(&self, name: &str) -> Option<&[String]> {
        self.coords.get(name).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.stimuli.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stimuli.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_new_rejects_duplicate_ids() {
        let err = Dataset::new("d", words(&["a", "b"]), words(&["x", "x"])).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateSampleId(id) if id == "x"));
    }

    #[test]
    fn test_new_rejects_misaligned_ids() {
        let err = Dataset::new("d", words(&["a", "b"]), words(&["x"])).unwrap_err();
        assert!(matches!(err, CoreError::LengthMismatch { expected: 2, actual: 1, .. }));
    }

    #[test]
    fn test_with_coord_checks_length() {
        let ds = Dataset::from_stimuli("d", words(&["a", "b", "c"]));
        assert!(ds.clone().with_coord("passage", words(&["p1", "p1"])).is_err());

        let ds = ds.with_coord("passage", words(&["p1", "p1", "p2"])).unwrap();
        assert_eq!(ds.coord("passage").unwrap()[2], "p2");
        assert_eq!(ds.sample_ids(), &words(&["0", "1", "2"])[..]);
    }

    #[test]
    fn test_json_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset.json");
        let ds = Dataset::new("pereira", words(&["the", "dog"]), words(&["s0", "s1"]))
            .unwrap()
            .with_coord("passage", words(&["p0", "p0"]))
            .unwrap();
        std::fs::write(&path, serde_json::to_string(&ds).unwrap()).unwrap();

        let loaded = Dataset::from_json_file(&path).unwrap();
        assert_eq!(loaded, ds);
    }
}
