use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("offline mode is set and {path} is not cached")]
    Offline { path: PathBuf },

    #[error("HTTP {status} fetching {url}")]
    Status { url: String, status: u16 },

    #[error("network failure fetching {url}: {message}")]
    Network { url: String, message: String },

    #[error("failed to land download at {path}")]
    Place {
        path: PathBuf,
        #[source]
        source: weft_fs::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, FetchError>;
