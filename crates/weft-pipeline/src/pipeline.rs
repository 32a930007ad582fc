//! The end-to-end pipeline: fetch, patch, libraries, remap.

use std::path::{Path, PathBuf};

use tracing::info;
use weft_fetch::HttpClient;
use weft_mappings::Compositor;
use weft_remap::Remapper;

use crate::cache::ArtifactId;
use crate::context::PipelineContext;
use crate::error::PipelineError;
use crate::stage::run_stage;
use crate::stages::{ArtifactFetchStage, LibraryFetchStage, MappedArtifacts, PatchStage, RemapStage};

/// Patch overlay and its library sourcing, applied between fetch and remap.
#[derive(Debug, Clone)]
pub struct PatchConfig {
    /// Local patch archive to overlay onto the base jar.
    pub archive: PathBuf,
    /// Dependency string identifying the patch; names the libs directory.
    pub dep_string: String,
    /// Archive-internal path of the class whose initializer lists libraries.
    pub library_manifest_class: String,
    /// URL prefix each discovered library name is appended to.
    pub library_base_url: String,
}

/// Everything one resolution needs besides the shared context.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub artifact: ArtifactId,
    pub manifest_url: String,
    /// Bypass the manifest lookup with a fixed metadata URL.
    pub metadata_url_override: Option<String>,
    pub patch: Option<PatchConfig>,
    /// Namespace the (patched) input jar is named in.
    pub input_namespace: String,
    /// Namespaces to produce, all in one remap pass.
    pub output_namespaces: Vec<String>,
}

/// Final artifact set of a pipeline run.
#[derive(Debug)]
pub struct PipelineOutputs {
    pub client_jar: PathBuf,
    pub server_jar: PathBuf,
    pub patched_jar: PathBuf,
    pub libraries: Vec<PathBuf>,
    mapped: MappedArtifacts,
}

impl PipelineOutputs {
    /// Composite hash of the mapping layer stack used for the remap.
    pub fn mapping_hash(&self) -> &str {
        &self.mapped.mapping_hash
    }

    /// Remapped jar for one target namespace.
    pub fn mapped_jar(&self, namespace: &str) -> Option<&Path> {
        self.mapped.jar(namespace).map(PathBuf::as_path)
    }

    pub fn mapped_jars(&self) -> &[(String, PathBuf)] {
        &self.mapped.jars
    }
}

/// Drives every stage in order, reusing whatever the cache already holds.
pub struct Pipeline<C: HttpClient, R: Remapper> {
    ctx: PipelineContext<C>,
    config: PipelineConfig,
    compositor: Compositor,
    remapper: R,
}

impl<C: HttpClient, R: Remapper + Sync> Pipeline<C, R> {
    pub fn new(
        ctx: PipelineContext<C>,
        config: PipelineConfig,
        compositor: Compositor,
        remapper: R,
    ) -> Self {
        Self {
            ctx,
            config,
            compositor,
            remapper,
        }
    }

    pub async fn run(&self) -> Result<PipelineOutputs, PipelineError> {
        let id = self.config.artifact.clone();
        let force = self.ctx.force_refresh;
        info!(artifact = %id, offline = self.ctx.offline, "resolving");

        let fetched = run_stage(
            &mut ArtifactFetchStage::new(
                &self.ctx,
                id.clone(),
                &self.config.manifest_url,
                self.config.metadata_url_override.clone(),
            ),
            force,
        )
        .await?;

        let (patched_jar, libraries) = match &self.config.patch {
            Some(patch) => {
                let patched = run_stage(
                    &mut PatchStage::new(
                        &fetched.client_jar,
                        &patch.archive,
                        self.ctx.cache.artifact_jar(&id, "patched"),
                    ),
                    force,
                )
                .await?;
                let libraries = run_stage(
                    &mut LibraryFetchStage::new(
                        &self.ctx,
                        &patched.jar,
                        &patch.library_manifest_class,
                        &patch.library_base_url,
                        &patch.dep_string,
                    ),
                    force,
                )
                .await?;
                (patched.jar, libraries.paths)
            }
            None => (fetched.client_jar.clone(), Vec::new()),
        };

        // Mappings are composed in memory on every run; the hash decides
        // whether the remap outputs can be reused.
        let mappings = self
            .compositor
            .compose()
            .map_err(|source| PipelineError {
                stage: "mapping-compose",
                artifact: id.to_string(),
                source: source.into(),
            })?;

        let mapped = run_stage(
            &mut RemapStage::new(
                &self.ctx.cache,
                &mappings,
                &self.remapper,
                id.clone(),
                &patched_jar,
                &self.config.input_namespace,
                libraries.clone(),
                &self.config.output_namespaces,
            ),
            force,
        )
        .await?;

        Ok(PipelineOutputs {
            client_jar: fetched.client_jar,
            server_jar: fetched.server_jar,
            patched_jar,
            libraries,
            mapped,
        })
    }
}
