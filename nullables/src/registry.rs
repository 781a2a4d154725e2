//! Nullable node registry.

use std::collections::HashSet;
use trustdao_store::NodeRegistry;
use trustdao_types::NodeAddress;

/// An in-memory set of registered node addresses.
#[derive(Debug, Default)]
pub struct NullNodeRegistry {
    nodes: HashSet<NodeAddress>,
}

impl NullNodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, address: &NodeAddress) {
        self.nodes.insert(address.clone());
    }

    pub fn with_nodes<'a>(addresses: impl IntoIterator<Item = &'a NodeAddress>) -> Self {
        let mut registry = Self::new();
        for a in addresses {
            registry.register(a);
        }
        registry
    }
}

impl NodeRegistry for NullNodeRegistry {
    fn is_registered_node(&self, address: &NodeAddress) -> bool {
        self.nodes.contains(address)
    }
}
