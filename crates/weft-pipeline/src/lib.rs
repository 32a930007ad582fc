//! Staged resolution of a versioned artifact into remapped jars.
//!
//! A run walks four cached stages: fetch the version manifest, metadata and
//! role jars; overlay an optional patch archive; discover and fetch the
//! patch's libraries; remap the result into every target namespace in one
//! pass. Each stage derives its output paths purely from artifact identity
//! (and, for remap outputs, the composite mapping hash), so reruns reuse
//! whatever is already on disk and `--refresh` semantics reduce to deleting
//! a stage's outputs first.

pub use cache::{ArtifactId, CacheRoot, sanitize};
pub use context::PipelineContext;
pub use error::{PipelineError, StageError};
pub use manifest::{ArtifactDownload, ManifestEntry, VersionInfo, VersionManifest};
pub use pipeline::{PatchConfig, Pipeline, PipelineConfig, PipelineOutputs};
pub use stage::{Stage, run_stage};
pub use stages::{
    ArtifactFetchStage, FetchedArtifacts, LibraryFetchStage, MappedArtifacts, PatchStage,
    PatchedArtifact, RemapStage, ResolvedLibraries,
};

mod cache;
mod context;
mod error;
mod manifest;
mod pipeline;
mod stage;
mod stages;
