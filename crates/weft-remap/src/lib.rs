//! Single-pass remap sessions over artifact archives.
//!
//! A [`RemapSession`] takes one input artifact in a declared namespace, a
//! classpath, and one or more requested output namespaces, and drives a
//! [`Remapper`] engine to produce every output in a single rewrite pass.
//! The engine itself is a black box behind the trait; [`ArchiveRemapper`]
//! is the built-in archive-structure implementation.

pub use error::{RemapError, RemapErrorKind, Result};
pub use remapper::{ArchiveRemapper, RemapJob, Remapper};
pub use session::RemapSession;

mod error;
mod remapper;
mod session;
