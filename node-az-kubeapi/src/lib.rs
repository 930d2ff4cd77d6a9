use std::fmt;
use std::time::Duration;

use kube::api;
use node_az_ext as k8s;
use tower::limit::RateLimitLayer;

use k8s::corev1;

/// Failure to look up a Node object.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error(r#"nodes "{0}" not found"#)]
    NotFound(String),

    #[error(transparent)]
    Kube(#[from] kube::Error),
}

/// Lookup of a single Node by name.
///
/// Implementations may block on network I/O; callers are expected to bound
/// every call with their own deadline.
pub trait NodeLookup: Send + Sync {
    fn get_node(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<corev1::Node, LookupError>> + Send;
}

/// Client side request rate limit.
///
/// Allows `burst` requests per `burst / qps` seconds. The window never
/// shrinks below one nanosecond.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RateLimit {
    pub qps: f64,
    pub burst: u32,
}

impl RateLimit {
    pub fn period(&self) -> Duration {
        Duration::try_from_secs_f64(f64::from(self.burst) / self.qps)
            .map_or(Duration::from_secs(1), |period| {
                period.max(Duration::from_nanos(1))
            })
    }

    fn layer(&self) -> RateLimitLayer {
        RateLimitLayer::new(u64::from(self.burst.max(1)), self.period())
    }
}

pub struct KubeApi {
    client: kube::Client,
}

impl KubeApi {
    /// Create a KubeApi from the inferred client configuration (in-cluster
    /// service account, or the local kubeconfig), with `rate_limit` applied
    /// to every request.
    pub async fn new(rate_limit: RateLimit) -> kube::Result<Self> {
        let config = kube::Config::infer()
            .await
            .map_err(kube::Error::InferConfig)?;
        tracing::debug!(cluster_url = %config.cluster_url, ?rate_limit, "Creating Kubernetes client");
        let client = kube::client::ClientBuilder::try_from(config)?
            .with_layer(&rate_limit.layer())
            .build();
        Ok(Self::with_client(client))
    }

    /// Create a KubeApi backed by the provided Kubernetes client.
    pub fn with_client(client: kube::Client) -> Self {
        Self { client }
    }

    fn nodes(&self) -> api::Api<corev1::Node> {
        api::Api::all(self.client.clone())
    }
}

impl NodeLookup for KubeApi {
    async fn get_node(&self, name: &str) -> Result<corev1::Node, LookupError> {
        self.nodes()
            .get_opt(name)
            .await?
            .ok_or_else(|| LookupError::NotFound(name.to_string()))
    }
}

impl fmt::Debug for KubeApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KubeApi")
            .field("client", &"<kube::Client>")
            .finish()
    }
}
