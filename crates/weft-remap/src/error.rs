use std::io;
use std::path::PathBuf;

/// A failed remap. `partial_outputs` lists the output files the session had
/// already started writing; they are left on disk for the caller to inspect
/// or delete. The session never cleans up behind itself.
#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct RemapError {
    pub kind: RemapErrorKind,
    pub partial_outputs: Vec<PathBuf>,
}

impl RemapError {
    pub fn new(kind: RemapErrorKind) -> Self {
        Self {
            kind,
            partial_outputs: Vec::new(),
        }
    }

    pub fn with_partial_outputs(kind: RemapErrorKind, partial_outputs: Vec<PathBuf>) -> Self {
        Self {
            kind,
            partial_outputs,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RemapErrorKind {
    #[error("namespace {0:?} is not present in the mapping table")]
    UnknownNamespace(String),

    #[error("remap session has no input artifact")]
    MissingInput,

    #[error("remap session has no outputs")]
    NoOutputs,

    #[error("no mapping for class {class:?} ({from} -> {to})")]
    MissingMapping {
        class: String,
        from: String,
        to: String,
    },

    #[error("malformed input archive {path}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, RemapError>;
