use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure inside a single stage, before pipeline context is attached.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Fetch(#[from] weft_fetch::FetchError),

    #[error(transparent)]
    Verify(#[from] weft_verify::VerifyError),

    #[error(transparent)]
    Sniff(#[from] weft_sniff::SniffError),

    #[error(transparent)]
    Layer(#[from] weft_mappings::LayerError),

    #[error(transparent)]
    Remap(#[from] weft_remap::RemapError),

    #[error(transparent)]
    Fs(#[from] weft_fs::Error),

    #[error("checksum for {path} still wrong after one re-fetch (expected {expected})")]
    ChecksumRecurred { path: PathBuf, expected: String },

    #[error("version {version:?} not present in the remote manifest")]
    VersionNotFound { version: String },

    #[error("metadata for {version:?} lists no {role:?} download")]
    RoleMissing { version: String, role: String },

    #[error("malformed metadata {path}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed archive {path}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("discovered library name {name:?} is not a plain file name")]
    BadLibraryName { name: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A stage failure tagged with the stage and the artifact it was resolving.
#[derive(Debug, Error)]
#[error("stage {stage:?} failed for {artifact}")]
pub struct PipelineError {
    pub stage: &'static str,
    pub artifact: String,
    #[source]
    pub source: StageError,
}
