//! Conditional HTTP downloading with offline fallback and atomic placement.
//!
//! One [`DownloadSession`] fetches one remote resource to one local path,
//! with etag revalidation, optional gzip inflation, skip-if-present
//! short-circuiting, and offline-mode semantics. The HTTP transport sits
//! behind the [`HttpClient`] trait so tests can count or forbid network
//! calls.

pub use error::{FetchError, Result};
pub use http::{BoxStream, HttpClient, HttpResponse, ReqwestClient};
pub use session::DownloadSession;

mod error;
mod http;
mod session;
