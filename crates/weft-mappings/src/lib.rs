//! Name-mapping tables, layered composition, and the composite mapping hash.
//!
//! A mapping set is assembled from an ordered list of [`Layer`]s (zip
//! archives, raw text documents, programmatic overrides). The [`Compositor`]
//! merges them into one read-only [`MappingTable`] and derives a composite
//! content hash that downstream cache paths embed, so a changed mapping
//! input can never silently reuse artifacts remapped under the old set.

pub use compositor::{ComposedMappings, Compositor};
pub use error::{LayerError, MappingError};
pub use layer::{Layer, OverrideLayer, TextLayer, ZipLayer};
pub use table::{ClassMapping, MappingTable, MemberKey};

mod compositor;
mod error;
mod layer;
mod table;
pub mod tiny;
