use node_az_ext as k8s;
use time::OffsetDateTime;

use k8s::NodeExt as _;
use k8s::corev1;

use super::*;

/// Zone, region and address of a node as last seen by the refresher.
///
/// `zone` and `region` always hold either a real label value or the
/// [`ZONE_UNKNOWN`]/[`REGION_UNKNOWN`] sentinel, never an empty string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeMetadata {
    pub zone: String,
    pub region: String,
    pub node_ip: String,
    /// Time of the last successful refresh.
    pub last_update: Option<OffsetDateTime>,
    /// Most recent refresh failure, `None` when the last attempt succeeded.
    pub last_error: Option<String>,
}

impl NodeMetadata {
    pub fn unknown() -> Self {
        Self {
            zone: ZONE_UNKNOWN.to_string(),
            region: REGION_UNKNOWN.to_string(),
            node_ip: UNKNOWN_NODE_IP.to_string(),
            last_update: None,
            last_error: Some(NOT_INITIALIZED.to_string()),
        }
    }

    /// Metadata of a successful refresh. Empty values are replaced by their sentinels.
    pub fn resolved(
        zone: impl Into<String>,
        region: impl Into<String>,
        node_ip: impl Into<String>,
        at: OffsetDateTime,
    ) -> Self {
        Self {
            zone: or_sentinel(zone.into(), ZONE_UNKNOWN),
            region: or_sentinel(region.into(), REGION_UNKNOWN),
            node_ip: or_sentinel(node_ip.into(), UNKNOWN_NODE_IP),
            last_update: Some(at),
            last_error: None,
        }
    }

    /// Same values with a new failure recorded.
    pub fn failed(&self, error: impl ToString) -> Self {
        Self {
            last_error: Some(error.to_string()),
            ..self.clone()
        }
    }

    /// Whether the zone has been resolved at least once.
    pub fn is_ready(&self) -> bool {
        !self.zone.is_empty() && self.zone != ZONE_UNKNOWN
    }
}

impl Default for NodeMetadata {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Zone, region and address of `node`, with sentinels for missing values.
///
/// The address falls back to `node_ip_override` when the node reports
/// neither an internal nor an external address.
pub(crate) fn node_location<'a>(
    node: &'a corev1::Node,
    node_ip_override: Option<&'a str>,
) -> (&'a str, &'a str, &'a str) {
    let zone = node.zone().unwrap_or(ZONE_UNKNOWN);
    let region = node.region().unwrap_or(REGION_UNKNOWN);
    let node_ip = node
        .preferred_address()
        .filter(|ip| !ip.is_empty())
        .or(node_ip_override)
        .unwrap_or(UNKNOWN_NODE_IP);
    (zone, region, node_ip)
}

fn or_sentinel(value: String, sentinel: &str) -> String {
    if value.is_empty() {
        sentinel.to_string()
    } else {
        value
    }
}
