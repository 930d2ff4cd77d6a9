pub use k8s_openapi::api::core::v1 as corev1;
pub use k8s_openapi::apimachinery::pkg::apis::meta::v1 as metav1;

pub use node::NodeExt;
pub use self::time::DurationExt;
pub use self::time::TimeExt;

mod node;
mod time;

/// Well-known topology label carrying the node's availability zone.
pub const ZONE_LABEL: &str = "topology.kubernetes.io/zone";

/// Well-known topology label carrying the node's region.
pub const REGION_LABEL: &str = "topology.kubernetes.io/region";

pub const INTERNAL_IP: &str = "InternalIP";
pub const EXTERNAL_IP: &str = "ExternalIP";
