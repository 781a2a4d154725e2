//! Identity namespace of registered nodes.

use trustdao_types::NodeAddress;

/// Answers whether an address has registered as a node.
///
/// Registration happens outside the DAO; only registered nodes may be
/// admitted as members.
pub trait NodeRegistry {
    fn is_registered_node(&self, address: &NodeAddress) -> bool;
}
