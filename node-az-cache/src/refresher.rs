use std::sync::Arc;
use std::time::Duration;

use node_az_ext as k8s;
use node_az_kubeapi::LookupError;
use node_az_kubeapi::NodeLookup;
use time::OffsetDateTime;
use time::ext::NumericalStdDuration as _;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio::time::MissedTickBehavior;

use k8s::corev1;

use super::*;

#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("timed out after {timeout:?} looking up node {node}")]
    Timeout { node: String, timeout: Duration },

    #[error(transparent)]
    Lookup(#[from] LookupError),
}

/// Periodically looks up the node and writes the result into the cache.
///
/// Each lookup is bounded by `timeout`. A failed lookup keeps the cached
/// zone, region and address and only records the error.
#[derive(Debug)]
pub struct Refresher<L> {
    lookup: L,
    cache: Arc<MetadataCache>,
    node_name: String,
    node_ip: Option<String>,
    interval: Duration,
    timeout: Duration,
}

impl<L: NodeLookup> Refresher<L> {
    pub fn new(lookup: L, cache: Arc<MetadataCache>, node_name: impl ToString) -> Self {
        Self {
            lookup,
            cache,
            node_name: node_name.to_string(),
            node_ip: None,
            interval: 60.std_seconds(),
            timeout: 2.std_seconds(),
        }
    }

    /// Address to report when the node has neither an internal nor an external one.
    pub fn node_ip(self, node_ip: Option<String>) -> Self {
        let node_ip = node_ip.filter(|ip| !ip.is_empty());
        Self { node_ip, ..self }
    }

    /// Time between refreshes. Zero is ignored.
    pub fn interval(self, interval: Duration) -> Self {
        if interval.is_zero() {
            self
        } else {
            Self { interval, ..self }
        }
    }

    /// Deadline of a single lookup.
    pub fn timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    /// Run one refresh cycle.
    ///
    /// The outcome is always written to the cache; the returned error is
    /// informational only.
    pub async fn refresh(&self) -> Result<(), RefreshError> {
        match self.lookup_node().await {
            Ok(node) => {
                let (zone, region, node_ip) =
                    metadata::node_location(&node, self.node_ip.as_deref());
                tracing::debug!(
                    node = %self.node_name,
                    zone,
                    region,
                    node_ip,
                    "AZ refresh succeeded"
                );
                self.cache
                    .record_success(zone, region, node_ip, OffsetDateTime::now_utc())
                    .await;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(node = %self.node_name, %err, "AZ refresh failed");
                self.cache.record_failure(err.to_string()).await;
                Err(err)
            }
        }
    }

    /// Refresh once per interval, forever.
    ///
    /// The first refresh happens one full interval after the call; the
    /// warm-up refresh is expected to have been awaited already. Cycles run
    /// back to back at most, missed ticks are skipped.
    pub async fn run(self) {
        if self.timeout_overruns_interval() {
            tracing::warn!(
                timeout = ?self.timeout,
                interval = ?self.interval,
                "API timeout is not shorter than the refresh interval"
            );
        }

        let start = Instant::now() + self.interval;
        let mut ticker = tokio::time::interval_at(start, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            // Failures are already logged and recorded in the cache
            let _ = self.refresh().await;
        }
    }

    /// Whether a single lookup may outlast the time between refreshes.
    pub fn timeout_overruns_interval(&self) -> bool {
        self.timeout >= self.interval
    }

    pub fn spawn(self) -> JoinHandle<()>
    where
        L: 'static,
    {
        tokio::spawn(self.run())
    }

    async fn lookup_node(&self) -> Result<corev1::Node, RefreshError> {
        let node = tokio::time::timeout(self.timeout, self.lookup.get_node(&self.node_name))
            .await
            .map_err(|_| RefreshError::Timeout {
                node: self.node_name.clone(),
                timeout: self.timeout,
            })??;
        Ok(node)
    }
}
