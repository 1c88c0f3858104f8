//! Lifecycle-script classification -- which installed dependencies
//! declare install-time hooks, and what the trust policy says about them.

use std::collections::BTreeSet;

use super::manifest::InstalledPackage;
use crate::types::LifecycleBuckets;

/// Script names that run automatically at install/uninstall/prepare time.
pub const LIFECYCLE_HOOKS: &[&str] = &[
    "preinstall",
    "install",
    "postinstall",
    "preuninstall",
    "uninstall",
    "postuninstall",
    "prepare",
];

/// Packages whose install hooks are conventionally allowed to run.
///
/// Mirrors the default allowlist shipped by mainstream package managers:
/// well-known build tools whose hooks compile or download platform
/// artifacts.
pub const DEFAULT_TRUSTED: &[&str] = &[
    "@swc/core",
    "bcrypt",
    "better-sqlite3",
    "bufferutil",
    "canvas",
    "cypress",
    "esbuild",
    "fsevents",
    "node-sass",
    "playwright",
    "prisma",
    "puppeteer",
    "sharp",
    "sqlite3",
    "utf-8-validate",
];

/// Substrings that mark a package or its hook script as native-code
/// related (build-tool and bindings keywords).
pub const NATIVE_PATTERNS: &[&str] = &[
    "node-gyp",
    "node-pre-gyp",
    "prebuild-install",
    "napi",
    "binding.gyp",
    "cmake-js",
    "neon",
];

/// Bucket every hook-declaring package by trust policy.
///
/// Returns the three disjoint buckets plus the native-coverage
/// annotation. A package is classified at most once no matter how many
/// hook names it declares; bucket priority is default-trust set, then
/// the project's declared trust list, then blocked. The native list is
/// an annotation layered on top and never changes bucket membership.
#[must_use]
pub fn classify(
    packages: &[InstalledPackage],
    trusted_declared: &BTreeSet<String>,
) -> (LifecycleBuckets, Vec<String>) {
    let mut buckets = LifecycleBuckets::default();
    let mut native = Vec::new();
    let mut seen = BTreeSet::new();

    for pkg in packages {
        // Deduplicate by package identity before bucketing.
        if !seen.insert(pkg.name.as_str()) {
            continue;
        }

        let hook_scripts: Vec<&str> = LIFECYCLE_HOOKS
            .iter()
            .filter_map(|hook| pkg.scripts.get(*hook).map(String::as_str))
            .collect();
        if hook_scripts.is_empty() {
            continue;
        }

        if DEFAULT_TRUSTED.contains(&pkg.name.as_str()) {
            buckets.default_trusted.push(pkg.name.clone());
        } else if trusted_declared.contains(&pkg.name) {
            buckets.explicitly_trusted.push(pkg.name.clone());
        } else {
            buckets.blocked.push(pkg.name.clone());
        }

        if looks_native(&pkg.name, &hook_scripts) {
            native.push(pkg.name.clone());
        }
    }

    buckets.default_trusted.sort();
    buckets.explicitly_trusted.sort();
    buckets.blocked.sort();
    native.sort();

    (buckets, native)
}

/// Native-code heuristic: package name or any hook script body matches
/// a known build-tool/bindings keyword.
fn looks_native(name: &str, hook_scripts: &[&str]) -> bool {
    NATIVE_PATTERNS.iter().any(|pat| {
        name.contains(pat) || hook_scripts.iter().any(|script| script.contains(pat))
    })
}
