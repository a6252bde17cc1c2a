use guidecall_core::PeerEndpoint;
use parking_lot::RwLock;
use std::sync::Arc;

/// Remembers the last remote endpoint a session connected to, so a
/// reopened session can reach the same operator again.
///
/// Clones share the same slot. Forgotten once a session completes.
#[derive(Debug, Clone, Default)]
pub struct EndpointMemory {
    last: Arc<RwLock<Option<PeerEndpoint>>>,
}

impl EndpointMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remember(&self, endpoint: PeerEndpoint) {
        *self.last.write() = Some(endpoint);
    }

    pub fn last(&self) -> Option<PeerEndpoint> {
        self.last.read().clone()
    }

    pub fn forget(&self) {
        self.last.write().take();
    }
}
