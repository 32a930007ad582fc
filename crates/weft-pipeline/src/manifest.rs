//! Serde models for the remote version index and per-version metadata.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::StageError;

/// Top-level index of all published versions.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionManifest {
    pub versions: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestEntry {
    pub id: String,
    pub url: String,
}

impl VersionManifest {
    pub fn load(path: &Path) -> Result<Self, StageError> {
        load_json(path)
    }

    /// Case-insensitive lookup, so "1.0-Beta" resolves "1.0-beta".
    pub fn find(&self, version: &str) -> Option<&ManifestEntry> {
        self.versions
            .iter()
            .find(|entry| entry.id.eq_ignore_ascii_case(version))
    }
}

/// Per-version metadata naming the downloadable role jars.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionInfo {
    pub downloads: BTreeMap<String, ArtifactDownload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactDownload {
    pub url: String,
    pub sha1: String,
}

impl VersionInfo {
    pub fn load(path: &Path) -> Result<Self, StageError> {
        load_json(path)
    }
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, StageError> {
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|source| StageError::Metadata {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_is_case_insensitive() {
        let manifest = VersionManifest {
            versions: vec![ManifestEntry {
                id: "1.0-Beta".into(),
                url: "https://example.invalid/1.0-beta.json".into(),
            }],
        };
        assert!(manifest.find("1.0-beta").is_some());
        assert!(manifest.find("1.0-BETA").is_some());
        assert!(manifest.find("2.0").is_none());
    }

    #[test]
    fn info_parses_downloads() {
        let info: VersionInfo = serde_json::from_str(
            r#"{"downloads":{"client":{"url":"u","sha1":"aa"},"server":{"url":"v","sha1":"bb"}}}"#,
        )
        .unwrap();
        assert_eq!(info.downloads["client"].sha1, "aa");
        assert_eq!(info.downloads["server"].url, "v");
    }
}
