//! On-disk layout of the artifact cache.
//!
//! Every path is a pure function of artifact identity, so two runs that
//! resolve the same coordinates land on the same files and anything already
//! present can be reused without a registry.

use std::fmt;
use std::path::{Path, PathBuf};

/// Name and version of the artifact being resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactId {
    pub name: String,
    pub version: String,
}

impl ArtifactId {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

/// Root directory of the cache, with accessors for each derived path.
#[derive(Debug, Clone)]
pub struct CacheRoot {
    root: PathBuf,
}

impl CacheRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Shared index of all published versions. Revalidated on every run.
    pub fn version_manifest(&self) -> PathBuf {
        self.root.join("version_manifest.json")
    }

    /// Per-version metadata document.
    pub fn version_info(&self, id: &ArtifactId) -> PathBuf {
        self.root
            .join(format!("{}-{}-info.json", id.name, id.version))
    }

    /// A role jar ("client", "server", "patched", ...) for one version.
    pub fn artifact_jar(&self, id: &ArtifactId, role: &str) -> PathBuf {
        self.root
            .join(format!("{}-{}-{}.jar", id.name, id.version, role))
    }

    /// Directory holding libraries discovered for one patch dependency.
    ///
    /// The dependency string is sanitized so arbitrary coordinate syntax
    /// cannot escape the cache or collide on punctuation-only differences.
    pub fn libs_dir(&self, dep_string: &str) -> PathBuf {
        self.root.join("libs").join(sanitize(dep_string))
    }

    /// Remapped jar for one target namespace under one mapping hash.
    ///
    /// The full hash is embedded in both the directory and the file name, so
    /// changing any mapping layer steers later stages to a fresh location
    /// instead of overwriting outputs another build may still reference.
    pub fn mapped_jar(&self, id: &ArtifactId, namespace: &str, hash: &str) -> PathBuf {
        let stem = format!("{}-{}-{}-{}", id.name, id.version, namespace, hash);
        self.root.join(&stem).join(format!("{stem}.jar"))
    }
}

/// Replace every character outside `[A-Za-z0-9.-]` with `_`.
pub fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
