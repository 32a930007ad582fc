//! Stage 4: remap the patched jar into every target namespace.

use std::fs;
use std::path::PathBuf;

use tracing::{debug, warn};
use weft_mappings::ComposedMappings;
use weft_remap::{RemapSession, Remapper};

use crate::cache::{ArtifactId, CacheRoot};
use crate::error::StageError;
use crate::stage::Stage;

/// Remapped jars keyed by target namespace, in configuration order.
#[derive(Debug)]
pub struct MappedArtifacts {
    pub mapping_hash: String,
    pub jars: Vec<(String, PathBuf)>,
}

impl MappedArtifacts {
    pub fn jar(&self, namespace: &str) -> Option<&PathBuf> {
        self.jars
            .iter()
            .find(|(ns, _)| ns == namespace)
            .map(|(_, path)| path)
    }
}

/// Produces all target-namespace jars in one pass over the input.
///
/// Output paths embed the composite mapping hash, so a changed layer stack
/// lands in a fresh directory and the stale outputs for the old hash are
/// simply never consulted again. The targets regenerate as a set: if any
/// one is missing, all are rebuilt, keeping siblings from drifting apart.
pub struct RemapStage<'a, R: Remapper> {
    mappings: &'a ComposedMappings,
    remapper: &'a R,
    id: ArtifactId,
    input: PathBuf,
    input_namespace: String,
    classpath: Vec<PathBuf>,
    targets: Vec<(String, PathBuf)>,
}

impl<'a, R: Remapper> RemapStage<'a, R> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cache: &CacheRoot,
        mappings: &'a ComposedMappings,
        remapper: &'a R,
        id: ArtifactId,
        input: impl Into<PathBuf>,
        input_namespace: impl Into<String>,
        classpath: Vec<PathBuf>,
        output_namespaces: &[String],
    ) -> Self {
        let targets = output_namespaces
            .iter()
            .map(|ns| (ns.clone(), cache.mapped_jar(&id, ns, mappings.hash())))
            .collect();
        Self {
            mappings,
            remapper,
            id,
            input: input.into(),
            input_namespace: input_namespace.into(),
            classpath,
            targets,
        }
    }
}

impl<R: Remapper + Sync> Stage for RemapStage<'_, R> {
    type Output = MappedArtifacts;

    fn name(&self) -> &'static str {
        "remap"
    }

    fn artifact(&self) -> String {
        self.id.to_string()
    }

    fn outputs(&self) -> Vec<PathBuf> {
        self.targets.iter().map(|(_, path)| path.clone()).collect()
    }

    fn is_up_to_date(&self) -> Result<bool, StageError> {
        Ok(self.targets.iter().all(|(_, path)| path.exists()))
    }

    fn reuse(&self) -> Result<Self::Output, StageError> {
        Ok(MappedArtifacts {
            mapping_hash: self.mappings.hash().to_string(),
            jars: self.targets.clone(),
        })
    }

    async fn run(&mut self) -> Result<Self::Output, StageError> {
        // Partial sets regenerate together; drop whichever siblings exist.
        for (namespace, path) in &self.targets {
            if path.exists() {
                warn!(namespace, path = %path.display(), "discarding output missing a sibling");
                fs::remove_file(path)?;
            }
        }

        let mut session = RemapSession::new(self.mappings.table())
            .input(&self.input, &self.input_namespace)
            .classpath(self.classpath.iter().cloned());
        for (namespace, path) in &self.targets {
            session = session.add_output(namespace, path);
        }
        session.run(self.remapper)?;
        debug!(hash = self.mappings.hash(), outputs = self.targets.len(), "remapped");

        Ok(MappedArtifacts {
            mapping_hash: self.mappings.hash().to_string(),
            jars: self.targets.clone(),
        })
    }
}
