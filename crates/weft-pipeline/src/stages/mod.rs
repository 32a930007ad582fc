mod artifacts;
mod libraries;
mod patch;
mod remap;

pub use artifacts::{ArtifactFetchStage, FetchedArtifacts};
pub use libraries::{LibraryFetchStage, ResolvedLibraries};
pub use patch::{PatchStage, PatchedArtifact};
pub use remap::{MappedArtifacts, RemapStage};
