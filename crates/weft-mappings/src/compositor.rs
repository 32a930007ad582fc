//! Ordered application of mapping layers into one frozen table plus the
//! composite hash that keys every mapping-dependent cache entry.

use tracing::debug;
use weft_verify::{Hasher, Sha256Hasher};

use crate::error::LayerError;
use crate::layer::Layer;
use crate::table::MappingTable;

/// Separator fed into the accumulator after each layer's contribution, so
/// adjacent layers cannot collide by shifting bytes across the boundary.
const LAYER_SEPARATOR: [u8; 1] = [0];

pub struct Compositor {
    namespaces: Vec<String>,
    layers: Vec<Box<dyn Layer>>,
}

impl Compositor {
    /// Declare the authoritative namespace list. Every layer source must
    /// carry this exact list.
    pub fn new(namespaces: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            namespaces: namespaces.into_iter().map(Into::into).collect(),
            layers: Vec::new(),
        }
    }

    pub fn layer(mut self, layer: impl Layer + 'static) -> Self {
        self.layers.push(Box::new(layer));
        self
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Apply every layer in declared order into a fresh table, then freeze
    /// it together with the finalized composite hash.
    ///
    /// Any layer failure abandons the whole composition; a partially merged
    /// table is never returned.
    pub fn compose(&self) -> Result<ComposedMappings, LayerError> {
        let mut table = MappingTable::new(self.namespaces.iter().cloned());
        let mut hasher = Sha256Hasher::new();

        for layer in &self.layers {
            layer.apply_to(&mut table)?;
            layer.contribute_to_hash(&mut hasher)?;
            hasher.update(&LAYER_SEPARATOR);
        }

        let hash = hex::encode(hasher.finalize());
        debug!(
            classes = table.len(),
            layers = self.layers.len(),
            %hash,
            "composed mapping set"
        );
        Ok(ComposedMappings { table, hash })
    }
}

/// The frozen result of a composition: a read-only table and the composite
/// hash identifying exactly this mapping set.
pub struct ComposedMappings {
    table: MappingTable,
    hash: String,
}

impl ComposedMappings {
    pub fn table(&self) -> &MappingTable {
        &self.table
    }

    /// Fixed-width (64 hex chars) digest over the ordered layer
    /// contributions.
    pub fn hash(&self) -> &str {
        &self.hash
    }
}
