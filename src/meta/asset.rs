use std::rc::Rc;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::meta::{BlueprintMeta, NodeId, Port, PortRef};
use crate::runtime::factory::BlueprintFactory;
use crate::runtime::node::BlueprintNode;
use crate::runtime::source::BlueprintSource;

#[derive(Debug, Clone)]
pub struct MetaNode {
    pub key: String,
    pub ports: Vec<Port>,
}

/// Editable graph description: node data, ports and declared links.
///
/// Node data lives in the asset's own factory, so meta ids never alias
/// runtime ids.
pub struct BlueprintAsset {
    pub(crate) id: String,
    pub(crate) factory: BlueprintFactory,
    pub(crate) nodes: IndexMap<NodeId, MetaNode>,
    pub(crate) keys: FxHashMap<String, NodeId>,
    pub(crate) links: FxHashMap<PortRef, Vec<PortRef>>,
}

impl BlueprintAsset {
    pub(crate) fn empty(id: &str) -> Self {
        Self {
            id: id.to_string(),
            factory: BlueprintFactory::new(),
            nodes: IndexMap::new(),
            keys: FxHashMap::default(),
            links: FxHashMap::default(),
        }
    }

    pub fn node_id(&self, key: &str) -> Option<NodeId> {
        self.keys.get(key).copied()
    }

    pub fn node_key(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(&id).map(|node| node.key.as_str())
    }

    pub fn ports(&self, id: NodeId) -> &[Port] {
        self.nodes.get(&id).map(|node| node.ports.as_slice()).unwrap_or(&[])
    }

    /// Index of the port called `name` on node `key`.
    pub fn port_index(&self, key: &str, name: &str) -> Option<usize> {
        let id = self.node_id(key)?;
        self.ports(id).iter().position(|port| port.name == name)
    }

    pub fn node_as<N: BlueprintNode + Clone + Default>(&self, key: &str) -> Option<&N> {
        let id = self.node_id(key)?;
        self.factory.node_as::<N>(id)
    }

    /// Boundary ports exposed to nodes instantiating this asset, in node order.
    pub fn external_ports(&self) -> Vec<Port> {
        self.nodes
            .values()
            .flat_map(|node| node.ports.iter())
            .filter(|port| port.is_external())
            .cloned()
            .collect()
    }

    pub fn link_count(&self) -> usize {
        self.links.values().map(Vec::len).sum()
    }

    /// Appends a declared link without any endpoint checks.
    pub fn insert_link_unchecked(&mut self, from: PortRef, to: PortRef) {
        self.links.entry(from).or_default().push(to);
    }
}

impl BlueprintMeta for BlueprintAsset {
    fn id(&self) -> &str {
        &self.id
    }

    fn nodes(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    fn port_count(&self, id: NodeId) -> usize {
        self.ports(id).len()
    }

    fn port(&self, id: NodeId, index: usize) -> Option<&Port> {
        self.nodes.get(&id).and_then(|node| node.ports.get(index))
    }

    fn node_source(&self, id: NodeId) -> Option<&dyn BlueprintSource> {
        if !self.nodes.contains_key(&id) {
            return None;
        }
        self.factory.source(id.source)
    }

    fn links_from(&self, id: NodeId, port: usize) -> &[PortRef] {
        self.links
            .get(&PortRef::new(id, port))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// Assets available to subgraph nodes, in load order.
#[derive(Default, Clone)]
pub struct AssetLibrary {
    assets: IndexMap<String, Rc<BlueprintAsset>>,
}

impl AssetLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, asset: BlueprintAsset) -> Rc<BlueprintAsset> {
        let asset = Rc::new(asset);
        self.assets.insert(asset.id.clone(), asset.clone());
        asset
    }

    pub fn get(&self, id: &str) -> Option<Rc<BlueprintAsset>> {
        self.assets.get(id).cloned()
    }

    /// The last loaded asset; documents list the root graph last.
    pub fn root(&self) -> Option<Rc<BlueprintAsset>> {
        self.assets.last().map(|(_, asset)| asset.clone())
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.assets.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl std::fmt::Debug for AssetLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetLibrary")
            .field("assets", &self.assets.keys().collect::<Vec<_>>())
            .finish()
    }
}
