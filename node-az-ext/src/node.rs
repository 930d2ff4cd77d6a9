use super::*;

pub trait NodeExt {
    /// Value of the label `key`, treating an empty value as absent.
    fn label(&self, key: &str) -> Option<&str>;

    /// Best-known address of the node.
    ///
    /// All reported addresses are scanned once: the first `InternalIP` wins
    /// outright, otherwise the last `ExternalIP` seen is returned.
    fn preferred_address(&self) -> Option<&str>;

    fn zone(&self) -> Option<&str> {
        self.label(ZONE_LABEL)
    }

    fn region(&self) -> Option<&str> {
        self.label(REGION_LABEL)
    }
}

impl NodeExt for corev1::Node {
    fn label(&self, key: &str) -> Option<&str> {
        self.metadata
            .labels
            .as_ref()?
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    fn preferred_address(&self) -> Option<&str> {
        let addresses = self.status.as_ref()?.addresses.as_deref()?;
        preferred_address(addresses)
    }
}

fn preferred_address(addresses: &[corev1::NodeAddress]) -> Option<&str> {
    let mut external = None;
    for address in addresses {
        match address.type_.as_str() {
            INTERNAL_IP => return Some(address.address.as_str()),
            EXTERNAL_IP => external = Some(address.address.as_str()),
            _ => {}
        }
    }
    external
}
