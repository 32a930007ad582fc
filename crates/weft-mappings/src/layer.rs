//! Mapping layers: independently sourced contributors to one merged table.
//!
//! Each layer type couples two operations on a single value so content and
//! hash can never drift apart: merging its records into the accumulating
//! table, and feeding a deterministic byte representation of itself into the
//! running composite hash. Hash contributions are pure functions of the
//! layer's content (absolute path + raw bytes, or a canonical serialization
//! for programmatic layers); never of timestamps or process state.

use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::debug;
use weft_verify::Hasher;

use crate::error::LayerError;
use crate::table::{ClassMapping, MappingTable};
use crate::tiny;

/// File extension of mapping documents inside a zip-packaged layer.
const MAPPING_EXT: &str = ".tiny";

pub trait Layer {
    /// Merge this layer's records into `table`. Order-sensitive: later
    /// layers replace earlier records under the same key.
    fn apply_to(&self, table: &mut MappingTable) -> Result<(), LayerError>;

    /// Feed this layer's canonical bytes into the composite hash.
    fn contribute_to_hash(&self, hasher: &mut dyn Hasher) -> Result<(), LayerError>;
}

fn io_err(path: &Path, source: std::io::Error) -> LayerError {
    LayerError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn hash_path_and_contents(path: &Path, hasher: &mut dyn Hasher) -> Result<(), LayerError> {
    let canonical = path
        .canonicalize()
        .unwrap_or_else(|_| path.to_path_buf());
    hasher.update(canonical.to_string_lossy().as_bytes());
    hasher.update(&[0]);
    weft_verify::hash_file_into(path, hasher).map_err(|e| match e {
        weft_verify::VerifyError::Io(source) => io_err(path, source),
        other => io_err(path, std::io::Error::other(other.to_string())),
    })
}

/// A raw text mapping document on disk.
pub struct TextLayer {
    path: PathBuf,
}

impl TextLayer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Layer for TextLayer {
    fn apply_to(&self, table: &mut MappingTable) -> Result<(), LayerError> {
        debug!(path = %self.path.display(), "importing text mapping layer");
        let text = std::fs::read_to_string(&self.path).map_err(|e| io_err(&self.path, e))?;
        tiny::parse_into(&text, table)?;
        Ok(())
    }

    fn contribute_to_hash(&self, hasher: &mut dyn Hasher) -> Result<(), LayerError> {
        hash_path_and_contents(&self.path, hasher)
    }
}

/// A zip archive packaging one or more mapping documents.
///
/// The archive is opened, imported, and closed within `apply_to`; no handle
/// outlives the call. Entries are imported in sorted name order so the
/// resulting table does not depend on archive layout.
pub struct ZipLayer {
    path: PathBuf,
}

impl ZipLayer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Layer for ZipLayer {
    fn apply_to(&self, table: &mut MappingTable) -> Result<(), LayerError> {
        debug!(path = %self.path.display(), "importing zip mapping layer");
        let archive_err = |source| LayerError::Archive {
            path: self.path.clone(),
            source,
        };

        let file = std::fs::File::open(&self.path).map_err(|e| io_err(&self.path, e))?;
        let mut archive = zip::ZipArchive::new(file).map_err(archive_err)?;

        let mut entries: Vec<String> = archive
            .file_names()
            .filter(|name| name.ends_with(MAPPING_EXT))
            .map(str::to_string)
            .collect();
        entries.sort();

        for name in entries {
            let mut entry = archive.by_name(&name).map_err(archive_err)?;
            let mut text = String::new();
            entry
                .read_to_string(&mut text)
                .map_err(|e| io_err(&self.path, e))?;
            tiny::parse_into(&text, table)?;
        }
        Ok(())
    }

    fn contribute_to_hash(&self, hasher: &mut dyn Hasher) -> Result<(), LayerError> {
        hash_path_and_contents(&self.path, hasher)
    }
}

/// Programmatic overrides declared in build configuration rather than read
/// from a file.
pub struct OverrideLayer {
    classes: Vec<ClassMapping>,
}

impl OverrideLayer {
    pub fn new() -> Self {
        Self {
            classes: Vec::new(),
        }
    }

    pub fn class(mut self, class: ClassMapping) -> Self {
        self.classes.push(class);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl Default for OverrideLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl Layer for OverrideLayer {
    fn apply_to(&self, table: &mut MappingTable) -> Result<(), LayerError> {
        for class in &self.classes {
            table.insert_class(class.clone())?;
        }
        Ok(())
    }

    fn contribute_to_hash(&self, hasher: &mut dyn Hasher) -> Result<(), LayerError> {
        // Canonical serialization of the declared records, in declared order.
        for class in &self.classes {
            for name in &class.names {
                hasher.update(name.as_bytes());
                hasher.update(&[b'\t']);
            }
            hasher.update(&[b'\n']);
            for (tag, members) in [(b'F', &class.fields), (b'M', &class.methods)] {
                for (key, names) in members {
                    hasher.update(&[tag]);
                    hasher.update(key.name.as_bytes());
                    hasher.update(&[b'\t']);
                    hasher.update(key.descriptor.as_bytes());
                    for name in names {
                        hasher.update(&[b'\t']);
                        hasher.update(name.as_bytes());
                    }
                    hasher.update(&[b'\n']);
                }
            }
        }
        Ok(())
    }
}
