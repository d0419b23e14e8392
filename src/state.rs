//! Link-state record for external inspection
//!
//! A JSON file under the project cache directory lists the packages that
//! are being actively synced right now. It is overwritten whole on every
//! sync start and stop; an empty list means syncing is paused (for example
//! during a reinstall), which is itself observable state.

use crate::error::PkglinkResult;
use crate::package::Package;
use crate::project::Project;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// File name of the link-state record
pub const STATE_FILE: &str = "state.json";

/// The persisted record shape
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkState {
    pub linked_packages: Vec<LinkedPackage>,
}

/// One currently-synced package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedPackage {
    pub name: String,
    pub root: PathBuf,
}

impl From<&Package> for LinkedPackage {
    fn from(package: &Package) -> Self {
        Self {
            name: package.name.clone(),
            root: package.root.clone(),
        }
    }
}

/// Path of the record for a project
pub fn state_file_path(project: &Project) -> PathBuf {
    project.cache_dir.join(STATE_FILE)
}

/// Overwrite the record with the given set of synced packages
pub fn record_linked(project: &Project, packages: &[LinkedPackage]) -> PkglinkResult<()> {
    let state = LinkState {
        linked_packages: packages.to_vec(),
    };
    let path = state_file_path(project);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            crate::error::PkglinkError::io(format!("creating {}", parent.display()), e)
        })?;
    }
    let content = serde_json::to_string_pretty(&state)?;
    std::fs::write(&path, content)
        .map_err(|e| crate::error::PkglinkError::io(format!("writing {}", path.display()), e))
}

/// The currently linked packages; empty when nothing is recorded or the
/// record cannot be read
pub fn linked_packages(project: &Project) -> Vec<LinkedPackage> {
    let Ok(content) = std::fs::read_to_string(state_file_path(project)) else {
        return Vec::new();
    };
    serde_json::from_str::<LinkState>(&content)
        .map(|state| state.linked_packages)
        .unwrap_or_default()
}
