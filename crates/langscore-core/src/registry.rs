//! Keyed registries for datasets, metrics and benchmarks.
//!
//! A [`Registry`] maps string keys to entries (usually factories). Keys are
//! unique: registering twice fails with [`CoreError::DuplicateKey`], looking up
//! an unknown key fails with [`CoreError::NotRegistered`].

use std::collections::BTreeMap;

use crate::error::{CoreError, CoreResult};

/// String-keyed registry with a loud register/lookup contract.
///
/// # Invariants
///
/// - Keys are unique within the registry
/// - Entries are never replaced once registered
#[derive(Debug)]
pub struct Registry<T> {
    name: &'static str,
    entries: BTreeMap<String, T>,
}

impl<T> Registry<T> {
    /// Create an empty registry. `name` appears in error messages.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: BTreeMap::new(),
        }
    }

    /// Register `entry` under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateKey`] if the key is already taken.
    pub fn register(&mut self, key: impl Into<String>, entry: T) -> CoreResult<()> {
        let key = key.into();
        if self.entries.contains_key(&key) {
            return Err(CoreError::DuplicateKey {
                registry: self.name.to_string(),
                key,
            });
        }
        tracing::debug!(registry = self.name, key = %key, "registered");
        self.entries.insert(key, entry);
        Ok(())
    }

    /// Look up the entry for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotRegistered`] if the key is unknown.
    pub fn get(&self, key: &str) -> CoreResult<&T> {
        self.entries.get(key).ok_or_else(|| CoreError::NotRegistered {
            registry: self.name.to_string(),
            key: key.to_string(),
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Registered keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}
