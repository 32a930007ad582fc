//! Builder for one remap pass.

use std::path::PathBuf;

use tracing::info;
use weft_mappings::MappingTable;

use crate::error::{RemapError, RemapErrorKind, Result};
use crate::remapper::{RemapJob, Remapper};

/// Configures a single rewrite of one input artifact into one or more
/// renamed outputs, all produced in the same pass.
pub struct RemapSession<'a> {
    mappings: &'a MappingTable,
    input: Option<(PathBuf, String)>,
    classpath: Vec<PathBuf>,
    outputs: Vec<(String, PathBuf)>,
}

impl<'a> RemapSession<'a> {
    pub fn new(mappings: &'a MappingTable) -> Self {
        Self {
            mappings,
            input: None,
            classpath: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Declare the input artifact and the namespace its symbols currently
    /// use.
    pub fn input(mut self, path: impl Into<PathBuf>, namespace: impl Into<String>) -> Self {
        self.input = Some((path.into(), namespace.into()));
        self
    }

    pub fn classpath(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.classpath.extend(paths);
        self
    }

    /// Request one output under a target namespace. Repeatable; every
    /// requested output is produced by the same pass.
    pub fn add_output(mut self, namespace: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.outputs.push((namespace.into(), path.into()));
        self
    }

    /// Validate the configuration and hand it to the engine.
    pub fn run(&self, remapper: &impl Remapper) -> Result<Vec<PathBuf>> {
        let (input, input_namespace) = self
            .input
            .as_ref()
            .ok_or_else(|| RemapError::new(RemapErrorKind::MissingInput))?;
        if self.outputs.is_empty() {
            return Err(RemapError::new(RemapErrorKind::NoOutputs));
        }
        if !self.mappings.has_namespace(input_namespace) {
            return Err(RemapError::new(RemapErrorKind::UnknownNamespace(
                input_namespace.clone(),
            )));
        }
        for (namespace, _) in &self.outputs {
            if !self.mappings.has_namespace(namespace) {
                return Err(RemapError::new(RemapErrorKind::UnknownNamespace(
                    namespace.clone(),
                )));
            }
        }

        info!(
            input = %input.display(),
            from = %input_namespace,
            outputs = self.outputs.len(),
            "remapping"
        );
        remapper.remap(&RemapJob {
            mappings: self.mappings,
            input,
            input_namespace,
            classpath: &self.classpath,
            outputs: &self.outputs,
        })?;
        Ok(self.outputs.iter().map(|(_, path)| path.clone()).collect())
    }
}
