//! Package manifest reading -- project manifests and the installed
//! dependency walk.

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Fields we read from a project's own manifest.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    /// Package name, if declared
    #[serde(default)]
    pub name: Option<String>,
    /// Dependencies this project explicitly trusts to run hooks
    #[serde(default, rename = "trustedDependencies")]
    pub trusted_dependencies: BTreeSet<String>,
}

/// One installed dependency's identity and declared scripts.
#[derive(Debug, Clone, Deserialize)]
pub struct InstalledPackage {
    /// Package name
    pub name: String,
    /// Declared scripts, hook and otherwise
    #[serde(default)]
    pub scripts: BTreeMap<String, String>,
}

/// Read a project manifest, degrading to defaults on any failure.
///
/// A missing or malformed manifest is normal for a fleet directory that
/// happens not to be a project; it must never abort the scan.
pub async fn read_manifest(path: &Path) -> Manifest {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "no readable manifest");
            return Manifest::default();
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(manifest) => manifest,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "malformed manifest, using defaults");
            Manifest::default()
        }
    }
}

/// Collect every installed dependency's manifest under `node_modules`.
///
/// Covers `node_modules/<name>` and `node_modules/@scope/<name>`.
/// Symlinks are not followed; malformed entries are skipped with a
/// warning. This walk is the expensive part of a scan.
pub async fn installed_packages(project_dir: &Path) -> Vec<InstalledPackage> {
    let node_modules = project_dir.join("node_modules");
    if !node_modules.is_dir() {
        return Vec::new();
    }

    let mut packages = Vec::new();
    for manifest_path in package_manifest_paths(&node_modules) {
        let bytes = match tokio::fs::read(&manifest_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %manifest_path.display(), error = %e, "skipping unreadable package manifest");
                continue;
            }
        };
        match serde_json::from_slice::<InstalledPackage>(&bytes) {
            Ok(pkg) => packages.push(pkg),
            Err(e) => {
                warn!(path = %manifest_path.display(), error = %e, "skipping malformed package manifest");
            }
        }
    }

    packages
}

/// Enumerate `package.json` paths for installed dependencies.
fn package_manifest_paths(node_modules: &Path) -> Vec<PathBuf> {
    let mut paths = Vec::new();

    let top_level: Vec<_> = WalkDir::new(node_modules)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_dir())
        .collect();

    for entry in top_level {
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') {
            continue;
        }
        if name.starts_with('@') {
            // Scoped packages live one level deeper.
            let scoped: Vec<_> = WalkDir::new(entry.path())
                .min_depth(1)
                .max_depth(1)
                .follow_links(false)
                .into_iter()
                .filter_map(std::result::Result::ok)
                .filter(|e| e.file_type().is_dir())
                .collect();
            for pkg in scoped {
                let manifest = pkg.path().join("package.json");
                if manifest.is_file() {
                    paths.push(manifest);
                }
            }
        } else {
            let manifest = entry.path().join("package.json");
            if manifest.is_file() {
                paths.push(manifest);
            }
        }
    }

    paths
}
