use anyhow::{Result, anyhow, bail};
use tracing::debug;

use crate::meta::asset::{BlueprintAsset, MetaNode};
use crate::meta::{NodeId, PortRef};
use crate::runtime::node::BlueprintNode;
use crate::signature;

/// Port addressed by name or by index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortSelector {
    Name(String),
    Index(usize),
}

impl From<&str> for PortSelector {
    fn from(name: &str) -> Self {
        PortSelector::Name(name.to_string())
    }
}

impl From<String> for PortSelector {
    fn from(name: String) -> Self {
        PortSelector::Name(name)
    }
}

impl From<usize> for PortSelector {
    fn from(index: usize) -> Self {
        PortSelector::Index(index)
    }
}

struct PendingLink {
    from: (String, PortSelector),
    to: (String, PortSelector),
}

pub struct BlueprintAssetBuilder {
    asset: BlueprintAsset,
    links: Vec<PendingLink>,
    errors: Vec<String>,
}

impl BlueprintAssetBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            asset: BlueprintAsset::empty(id),
            links: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.asset.id
    }

    /// Adds a node under `key`, assigning port signatures.
    pub fn add_node<N: BlueprintNode + Clone + Default>(&mut self, key: &str, node: N) -> Result<NodeId> {
        if self.asset.keys.contains_key(key) {
            bail!("Duplicate node key '{}' in asset '{}'", key, self.asset.id);
        }

        let mut ports = node.create_ports();
        for (index, port) in ports.iter_mut().enumerate() {
            if port.external {
                port.signature = signature::external_port(&self.asset.id, &port.name);
            } else if port.signature == 0 {
                port.signature = signature::internal_port(&self.asset.id, key, index);
            }
        }

        let id = self
            .asset
            .factory
            .add_node(node)
            .ok_or_else(|| anyhow!("Node source mismatch for '{}'", key))?;
        self.asset.keys.insert(key.to_string(), id);
        self.asset.nodes.insert(
            id,
            MetaNode {
                key: key.to_string(),
                ports,
            },
        );
        Ok(id)
    }

    pub fn node<N: BlueprintNode + Clone + Default>(mut self, key: &str, node: N) -> Self {
        if let Err(e) = self.add_node(key, node) {
            self.errors.push(e.to_string());
        }
        self
    }

    /// Declares a link. Orientation is normalized at build time, so either
    /// endpoint may be given first.
    pub fn add_link(
        &mut self,
        from_key: &str,
        from_port: impl Into<PortSelector>,
        to_key: &str,
        to_port: impl Into<PortSelector>,
    ) {
        self.links.push(PendingLink {
            from: (from_key.to_string(), from_port.into()),
            to: (to_key.to_string(), to_port.into()),
        });
    }

    pub fn connect(
        mut self,
        from_key: &str,
        from_port: impl Into<PortSelector>,
        to_key: &str,
        to_port: impl Into<PortSelector>,
    ) -> Self {
        self.add_link(from_key, from_port, to_key, to_port);
        self
    }

    pub fn build(mut self) -> Result<BlueprintAsset> {
        if !self.errors.is_empty() {
            bail!("Invalid asset '{}': {}", self.asset.id, self.errors.join("; "));
        }

        for link in std::mem::take(&mut self.links) {
            let from = self.resolve(&link.from)?;
            let to = self.resolve(&link.to)?;
            let (owner, target) = self.orient(from, to);

            if self.asset.links.get(&owner).is_some_and(|links| links.contains(&target)) {
                continue;
            }
            self.asset.insert_link_unchecked(owner, target);
        }

        Ok(self.asset)
    }

    fn resolve(&self, (key, selector): &(String, PortSelector)) -> Result<PortRef> {
        let id = self
            .asset
            .node_id(key)
            .ok_or_else(|| anyhow!("Link references unknown node '{}'", key))?;
        let ports = self.asset.ports(id);
        let index = match selector {
            PortSelector::Name(name) => ports
                .iter()
                .position(|port| &port.name == name)
                .ok_or_else(|| anyhow!("Node '{}' has no port '{}'", key, name))?,
            PortSelector::Index(index) if *index < ports.len() => *index,
            PortSelector::Index(index) => bail!("Node '{}' has no port #{}", key, index),
        };
        Ok(PortRef::new(id, index))
    }

    /// Links are stored from the owning port to the target port. Links whose
    /// endpoints cannot connect are kept as declared for the validator.
    fn orient(&self, from: PortRef, to: PortRef) -> (PortRef, PortRef) {
        let from_port = &self.asset.ports(from.node)[from.port];
        let to_port = &self.asset.ports(to.node)[to.port];

        if !from_port.can_connect(to_port) {
            debug!(from = %from.node, to = %to.node, "Keeping link with incompatible endpoints");
            return (from, to);
        }
        if from_port.is_enter_or_output() { (to, from) } else { (from, to) }
    }
}
