use std::fmt;

use minijinja::Environment;
use minijinja::context;

use super::*;

const INFO_TEMPLATE: &str = "info.html";

/// Everything a request handler can see: the static identity and a read-only
/// handle on the metadata cache.
pub(crate) struct AppState {
    pub(crate) config: Config,
    pub(crate) cache: Arc<MetadataCache>,
    templates: Environment<'static>,
}

impl AppState {
    pub(crate) fn new(config: Config, cache: Arc<MetadataCache>) -> Result<Self, minijinja::Error> {
        let mut templates = Environment::new();
        templates.add_template(INFO_TEMPLATE, include_str!("../templates/info.html"))?;
        Ok(Self {
            config,
            cache,
            templates,
        })
    }

    pub(crate) fn render_info(
        &self,
        metadata: &NodeMetadata,
        server_time: &str,
    ) -> Result<String, minijinja::Error> {
        let config = &self.config;
        self.templates.get_template(INFO_TEMPLATE)?.render(context! {
            pod_name => &config.pod_name,
            pod_namespace => &config.pod_namespace,
            pod_ip => &config.pod_ip,
            node_name => &config.node_name,
            node_ip => &metadata.node_ip,
            region => &metadata.region,
            zone => &metadata.zone,
            server_time => server_time,
            updated_at => updated_at(metadata),
            last_error => last_error(metadata),
        })
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

/// Last successful refresh as RFC 3339, or `-`.
pub(crate) fn updated_at(metadata: &NodeMetadata) -> String {
    metadata
        .last_update
        .map_or_else(|| "-".to_string(), |at| at.rfc3339_seconds())
}

/// Last refresh error, or `-`.
pub(crate) fn last_error(metadata: &NodeMetadata) -> &str {
    metadata.last_error.as_deref().unwrap_or("-")
}
