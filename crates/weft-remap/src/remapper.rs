//! The remapping engine seam and the built-in archive-level engine.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::debug;
use weft_mappings::MappingTable;

use crate::error::{RemapError, RemapErrorKind, Result};

/// Everything one remap pass needs, assembled by the session.
pub struct RemapJob<'a> {
    pub mappings: &'a MappingTable,
    pub input: &'a Path,
    pub input_namespace: &'a str,
    /// Archives the engine may consult to resolve references that cross
    /// artifact boundaries. The built-in engine does not need them; they are
    /// part of the contract for engines that do.
    pub classpath: &'a [PathBuf],
    pub outputs: &'a [(String, PathBuf)],
}

/// The external bytecode-rewriting engine, consumed as a black box.
///
/// Implementations must produce every requested output in a single pass over
/// the input and must not mutate the input or classpath artifacts. On
/// failure, partially written outputs are reported, not deleted.
pub trait Remapper {
    fn remap(&self, job: &RemapJob<'_>) -> Result<()>;
}

/// Built-in engine that rewrites archive structure: every class entry is
/// renamed through the mapping table for each output namespace, other
/// entries are copied verbatim. Class-internal constant rewriting is the
/// province of a full bytecode engine behind the same trait.
pub struct ArchiveRemapper;

impl Remapper for ArchiveRemapper {
    fn remap(&self, job: &RemapJob<'_>) -> Result<()> {
        let archive_err = |source| {
            RemapError::new(RemapErrorKind::Archive {
                path: job.input.to_path_buf(),
                source,
            })
        };

        let file = std::fs::File::open(job.input)
            .map_err(|e| RemapError::new(RemapErrorKind::Io(e)))?;
        let mut input = zip::ZipArchive::new(file).map_err(archive_err)?;

        // Output files are created up front; from here on every failure
        // reports them as partially written.
        let mut written: Vec<PathBuf> = Vec::new();
        let mut writers = Vec::with_capacity(job.outputs.len());
        for (namespace, path) in job.outputs {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| RemapError::new(RemapErrorKind::Io(e)))?;
            }
            let out = std::fs::File::create(path).map_err(|e| {
                RemapError::with_partial_outputs(RemapErrorKind::Io(e), written.clone())
            })?;
            written.push(path.clone());
            writers.push((namespace.as_str(), zip::ZipWriter::new(out)));
        }

        let partial = |kind| RemapError::with_partial_outputs(kind, written.clone());
        let options = zip::write::SimpleFileOptions::default();

        // Single pass: each input entry is read once and fanned out to every
        // requested output namespace.
        for index in 0..input.len() {
            let mut entry = input
                .by_index(index)
                .map_err(|e| {
                    partial(RemapErrorKind::Archive {
                        path: job.input.to_path_buf(),
                        source: e,
                    })
                })?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            let mut bytes = Vec::with_capacity(entry.size() as usize);
            entry
                .read_to_end(&mut bytes)
                .map_err(|e| partial(RemapErrorKind::Io(e)))?;
            drop(entry);

            for (namespace, writer) in &mut writers {
                let target_name = rename_entry(job, &name, namespace, &written)?;
                writer
                    .start_file(target_name, options)
                    .map_err(|e| partial(RemapErrorKind::Io(e.into())))?;
                writer
                    .write_all(&bytes)
                    .map_err(|e| partial(RemapErrorKind::Io(e)))?;
            }
        }

        for (namespace, writer) in writers {
            writer
                .finish()
                .map_err(|e| partial(RemapErrorKind::Io(e.into())))?;
            debug!(namespace, "finished remapped output");
        }
        Ok(())
    }
}

fn rename_entry(
    job: &RemapJob<'_>,
    name: &str,
    target_namespace: &str,
    written: &[PathBuf],
) -> Result<String> {
    let Some(class) = name.strip_suffix(".class") else {
        return Ok(name.to_string());
    };
    let renamed = job
        .mappings
        .rename_class(class, job.input_namespace, target_namespace)
        .map_err(|_| {
            RemapError::new(RemapErrorKind::UnknownNamespace(target_namespace.to_string()))
        })?;
    match renamed {
        Some(new_name) => Ok(format!("{new_name}.class")),
        // Lookups must be total for everything the input touches; a partial
        // rename is never silently accepted.
        None => Err(RemapError::with_partial_outputs(
            RemapErrorKind::MissingMapping {
                class: class.to_string(),
                from: job.input_namespace.to_string(),
                to: target_namespace.to_string(),
            },
            written.to_vec(),
        )),
    }
}
