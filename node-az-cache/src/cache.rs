use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::RwLock;

use super::*;

/// The one record of node metadata shared by the refresher and all readers.
///
/// Every update swaps in a whole new immutable [`NodeMetadata`], so a
/// snapshot can never mix fields from two different updates. Readers only
/// hold the lock long enough to clone an `Arc`.
#[derive(Debug, Default)]
pub struct MetadataCache {
    metadata: RwLock<Arc<NodeMetadata>>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole record.
    pub async fn set(&self, metadata: NodeMetadata) {
        *self.metadata.write().await = Arc::new(metadata);
    }

    /// Immutable copy of the current record.
    pub async fn snapshot(&self) -> Arc<NodeMetadata> {
        Arc::clone(&*self.metadata.read().await)
    }

    /// Record a successful refresh at `at`, clearing any previous error.
    pub async fn record_success(
        &self,
        zone: impl Into<String>,
        region: impl Into<String>,
        node_ip: impl Into<String>,
        at: OffsetDateTime,
    ) {
        self.set(NodeMetadata::resolved(zone, region, node_ip, at))
            .await;
    }

    /// Record a failed refresh, keeping the last good values.
    pub async fn record_failure(&self, error: impl ToString) {
        let mut metadata = self.metadata.write().await;
        *metadata = Arc::new(metadata.failed(error));
    }

    pub async fn is_ready(&self) -> bool {
        self.snapshot().await.is_ready()
    }
}
