use weft_fetch::HttpClient;

use crate::cache::CacheRoot;

/// Shared environment every stage runs against.
#[derive(Debug)]
pub struct PipelineContext<C: HttpClient> {
    pub client: C,
    pub cache: CacheRoot,
    /// Trust what is cached and never touch the network.
    pub offline: bool,
    /// Discard stage outputs and rebuild even when up to date.
    pub force_refresh: bool,
}

impl<C: HttpClient> PipelineContext<C> {
    pub fn new(client: C, cache: CacheRoot) -> Self {
        Self {
            client,
            cache,
            offline: false,
            force_refresh: false,
        }
    }

    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    pub fn force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }
}
