//! Neural dataset sources.
//!
//! An [`AssemblySource`] resolves an [`AssemblyLocator`] to a
//! [`NeuralAssembly`]. Remote object-store clients live outside this crate and
//! plug in through the trait; [`LocalDiskStore`] reads JSON assemblies from a
//! directory. [`load_with_fallback`] tries a remote source first and falls back
//! to the local one only when the remote reports the assembly as missing.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use langscore_core::NeuralAssembly;

/// Where to find one versioned assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyLocator {
    /// Assembly identifier, e.g. "Pereira2018ROI".
    pub identifier: String,
    /// Object-store version, if pinned.
    #[serde(default)]
    pub version_id: Option<String>,
    /// Expected content hash, verified by sources that support it.
    #[serde(default)]
    pub sha1: Option<String>,
    /// Object-name prefix used by remote stores.
    #[serde(default = "default_assembly_prefix")]
    pub assembly_prefix: String,
}

fn default_assembly_prefix() -> String {
    "assembly_".to_string()
}

impl AssemblyLocator {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            version_id: None,
            sha1: None,
            assembly_prefix: default_assembly_prefix(),
        }
    }

    #[must_use]
    pub fn with_version(mut self, version_id: impl Into<String>, sha1: impl Into<String>) -> Self {
        self.version_id = Some(version_id.into());
        self.sha1 = Some(sha1.into());
        self
    }
}

/// Failure to fetch an assembly.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The source does not hold this assembly. Triggers fallback.
    #[error("Assembly '{identifier}' not found in {source_name}")]
    NotFound {
        identifier: String,
        source_name: String,
    },

    /// Any other failure (network, permissions, corrupt data). Never masked.
    #[error("Failed to fetch assembly '{identifier}' from {source_name}: {message}")]
    Other {
        identifier: String,
        source_name: String,
        message: String,
    },
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound { .. })
    }
}

/// Something that can produce assemblies by locator.
pub trait AssemblySource: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    fn fetch(&self, locator: &AssemblyLocator) -> Result<NeuralAssembly, FetchError>;
}

/// Assemblies stored as `<root>/<identifier>.json`.
#[derive(Debug, Clone)]
pub struct LocalDiskStore {
    root: PathBuf,
}

impl LocalDiskStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, locator: &AssemblyLocator) -> PathBuf {
        self.root.join(format!("{}.json", locator.identifier))
    }
}

impl AssemblySource for LocalDiskStore {
    fn name(&self) -> &str {
        "local disk"
    }

    fn fetch(&self, locator: &AssemblyLocator) -> Result<NeuralAssembly, FetchError> {
        let path = self.path_for(locator);
        if !path.is_file() {
            return Err(FetchError::NotFound {
                identifier: locator.identifier.clone(),
                source_name: format!("{} ({})", self.name(), path.display()),
            });
        }
        debug!(path = %path.display(), "Loading assembly from disk");
        NeuralAssembly::from_json_file(&path).map_err(|e| FetchError::Other {
            identifier: locator.identifier.clone(),
            source_name: self.name().to_string(),
            message: e.to_string(),
        })
    }
}

/// Fetch from `remote`, falling back to `local` only on [`FetchError::NotFound`].
///
/// Other remote failures propagate unchanged.
pub fn load_with_fallback(
    remote: &dyn AssemblySource,
    local: &dyn AssemblySource,
    locator: &AssemblyLocator,
) -> Result<NeuralAssembly, FetchError> {
    match remote.fetch(locator) {
        Ok(assembly) => Ok(assembly),
        Err(err) if err.is_not_found() => {
            warn!(
                identifier = %locator.identifier,
                remote = remote.name(),
                local = local.name(),
                "Assembly missing remotely, falling back"
            );
            local.fetch(locator)
        }
        Err(err) => Err(err),
    }
}
