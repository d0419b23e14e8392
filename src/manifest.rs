//! Package manifest access with byte-exact rollback
//!
//! A [`ManifestFile`] captures the raw bytes of a package.json when it is
//! opened. `revert()` writes those bytes back verbatim, so a rolled-back
//! manifest keeps the user's formatting, key order and trailing whitespace
//! exactly as they were.

use crate::error::{PkglinkError, PkglinkResult};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// File name of a package manifest
pub const MANIFEST_FILE: &str = "package.json";

/// Accessor for a single package.json on disk
///
/// Callers serialize access; there is no concurrency control at this layer.
/// If `set()` was called, `revert()` must run before the accessor is
/// discarded or the on-disk manifest is left mutated.
#[derive(Debug, Clone)]
pub struct ManifestFile {
    path: PathBuf,
    original: Vec<u8>,
}

impl ManifestFile {
    /// Open a manifest, capturing its current bytes for later rollback
    pub fn open(path: impl Into<PathBuf>) -> PkglinkResult<Self> {
        let path = path.into();
        let original = std::fs::read(&path)
            .map_err(|e| PkglinkError::io(format!("reading {}", path.display()), e))?;
        Ok(Self { path, original })
    }

    /// Path of the manifest file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse the current on-disk content
    ///
    /// Key order is preserved in the returned value, so a parse/serialize
    /// round trip does not reorder the user's fields.
    pub fn get(&self) -> PkglinkResult<Value> {
        let bytes = std::fs::read(&self.path)
            .map_err(|e| PkglinkError::io(format!("reading {}", self.path.display()), e))?;
        serde_json::from_slice(&bytes).map_err(|e| PkglinkError::ManifestParse {
            path: self.path.clone(),
            source: e,
        })
    }

    /// Overwrite the manifest with new content
    pub fn set(&self, content: &Value) -> PkglinkResult<()> {
        let text = serde_json::to_string_pretty(content)?;
        std::fs::write(&self.path, text)
            .map_err(|e| PkglinkError::io(format!("writing {}", self.path.display()), e))
    }

    /// Restore the bytes captured when the accessor was opened
    pub fn revert(&self) -> PkglinkResult<()> {
        std::fs::write(&self.path, &self.original).map_err(|e| PkglinkError::ManifestRevert {
            path: self.path.clone(),
            source: e,
        })
    }

    /// The bytes captured at open time
    pub fn original_bytes(&self) -> &[u8] {
        &self.original
    }
}

/// Whether a parsed manifest declares a multi-package workspace
pub fn declares_workspaces(manifest: &Value) -> bool {
    manifest.get("workspaces").is_some()
}

/// The `name` field of a parsed manifest, if present
pub fn package_name(manifest: &Value) -> Option<&str> {
    manifest.get("name").and_then(Value::as_str)
}
