//! Zone/region metadata of the node this process runs on.
//!
//! A single [`MetadataCache`] holds the latest known [`NodeMetadata`]. It is
//! written only by the [`Refresher`], which periodically looks the node up
//! through a [`NodeLookup`](node_az_kubeapi::NodeLookup), and read by any
//! number of concurrent request handlers through immutable snapshots.

pub use cache::MetadataCache;
pub use metadata::NodeMetadata;
pub use refresher::RefreshError;
pub use refresher::Refresher;

mod cache;
mod metadata;
mod refresher;

pub const ZONE_UNKNOWN: &str = "ZONE UNKNOWN";
pub const REGION_UNKNOWN: &str = "REGION UNKNOWN";
pub const UNKNOWN_NODE_IP: &str = "0.0.0.0";
pub const NOT_INITIALIZED: &str = "not initialized";
