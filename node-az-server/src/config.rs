use std::env;
use std::str::FromStr;
use std::time::Duration;

use node_az_kubeapi::RateLimit;
use time::ext::NumericalStdDuration as _;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_QPS: f64 = 20.0;
const DEFAULT_BURST: u32 = 40;

#[derive(Debug, thiserror::Error)]
pub(crate) enum ConfigError {
    #[error("NODE_NAME environment variable not set")]
    MissingNodeName,
}

/// Identity and tunables, resolved once at startup.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Config {
    pub(crate) node_name: String,
    /// Reported when the node has no internal or external address.
    pub(crate) node_ip: Option<String>,
    pub(crate) pod_name: String,
    pub(crate) pod_namespace: String,
    pub(crate) pod_ip: String,
    pub(crate) refresh_interval: Duration,
    pub(crate) api_timeout: Duration,
    pub(crate) access_log: bool,
    pub(crate) rate_limit: RateLimit,
    pub(crate) port: u16,
}

impl Config {
    pub(crate) fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Resolve the configuration from `lookup`.
    ///
    /// Everything except `NODE_NAME` silently falls back to its default when
    /// absent or unparseable.
    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars(lookup);
        let node_name = vars.get("NODE_NAME").ok_or(ConfigError::MissingNodeName)?;
        let rate_limit = RateLimit {
            qps: vars
                .parse::<f64>("KUBE_CLIENT_QPS")
                .filter(|qps| qps.is_finite() && *qps > 0.0)
                .unwrap_or(DEFAULT_QPS),
            burst: vars
                .parse::<u32>("KUBE_CLIENT_BURST")
                .filter(|burst| *burst > 0)
                .unwrap_or(DEFAULT_BURST),
        };

        Ok(Self {
            node_name,
            node_ip: vars.get("NODE_IP"),
            pod_name: vars.get("POD_NAME").unwrap_or_default(),
            pod_namespace: vars.get("POD_NAMESPACE").unwrap_or_default(),
            pod_ip: vars.get("POD_IP").unwrap_or_default(),
            refresh_interval: vars.duration("AZ_REFRESH_INTERVAL").unwrap_or(60.std_seconds()),
            api_timeout: vars.duration("KUBE_API_TIMEOUT").unwrap_or(2.std_seconds()),
            access_log: vars.flag("ACCESS_LOG").unwrap_or(false),
            rate_limit,
            port: vars
                .parse::<u16>("LISTEN_PORT")
                .filter(|port| *port > 0)
                .unwrap_or(DEFAULT_PORT),
        })
    }
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Non-empty value of `key`.
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.is_empty())
    }

    fn parse<T: FromStr>(&self, key: &str) -> Option<T> {
        self.get(key)?.trim().parse().ok()
    }

    /// Go duration syntax (`90s`, `1m30s`, `500ms`); only positive durations are accepted.
    fn duration(&self, key: &str) -> Option<Duration> {
        let nanos = go_parse_duration::parse_duration(&self.get(key)?).ok()?;
        u64::try_from(nanos)
            .ok()
            .filter(|nanos| *nanos > 0)
            .map(Duration::from_nanos)
    }

    fn flag(&self, key: &str) -> Option<bool> {
        match self.get(key)?.as_str() {
            "1" | "true" | "TRUE" | "yes" | "YES" | "on" | "ON" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" | "off" | "OFF" => Some(false),
            _ => None,
        }
    }
}
