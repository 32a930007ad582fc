use std::io;
use std::path::PathBuf;

/// Errors in the mapping table model or the text codec.
#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("record carries {found} names but the table has {expected} namespaces")]
    NamespaceCount { expected: usize, found: usize },

    #[error("source namespaces {found:?} do not match the table's {expected:?}")]
    NamespaceMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("unknown namespace {0:?}")]
    UnknownNamespace(String),

    #[error("member record references unknown class {owner:?}")]
    OrphanMember { owner: String },
}

/// Importing a layer failed; the whole composition is abandoned so a
/// partially merged table is never published.
#[derive(Debug, thiserror::Error)]
pub enum LayerError {
    #[error("failed to read mapping source {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed mapping archive {path}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error(transparent)]
    Mapping(#[from] MappingError),
}
