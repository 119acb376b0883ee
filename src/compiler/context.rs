use rustc_hash::{FxHashMap, FxHashSet};

use crate::compiler::hash_links::HashLinkTree;
use crate::meta::{BlueprintMeta, NodeId, Port};
use crate::runtime::factory::BlueprintFactory;
use crate::runtime::link::RuntimeLink;
use crate::runtime::link_storage::LinkStorage;
use crate::runtime::node_storage::NodeStorage;

/// The node instantiating a subgraph, with the ports it exposes.
#[derive(Debug, Clone)]
pub struct RootBinding {
    pub id: NodeId,
    pub ports: Vec<Port>,
}

impl RootBinding {
    /// Root port matching a boundary port by signature and mode.
    pub fn port_for(&self, port: &Port) -> Option<usize> {
        self.ports
            .iter()
            .position(|root| root.signature == port.signature && root.mode == port.mode)
    }
}

/// State of one `Compiler::compile` invocation, shared by the root graph and
/// every nested subgraph.
pub(crate) struct CompileContext<'f> {
    pub factory: &'f mut BlueprintFactory,
    pub nodes: NodeStorage,
    pub links: LinkStorage,
    pub hash_links: HashLinkTree,
    /// Assets currently being compiled, innermost last.
    pub assets: Vec<String>,
    pub validated: FxHashSet<String>,
}

impl<'f> CompileContext<'f> {
    pub fn new(factory: &'f mut BlueprintFactory, expected_nodes: usize) -> Self {
        Self {
            factory,
            nodes: NodeStorage::with_capacity(expected_nodes),
            links: LinkStorage::with_capacity(expected_nodes * 2),
            hash_links: HashLinkTree::new(),
            assets: Vec::new(),
            validated: FxHashSet::default(),
        }
    }
}

/// Per-graph memo state. Every subgraph instantiation gets a fresh scope, so
/// the same asset compiled from two sites yields independent node sets.
pub(crate) struct GraphScope<'m> {
    pub meta: &'m dyn BlueprintMeta,
    pub root: Option<RootBinding>,
    /// Meta id -> runtime id.
    pub runtime_ids: FxHashMap<NodeId, NodeId>,
    /// Meta ids whose ports are wired.
    pub compiled: FxHashSet<NodeId>,
    pub pending: Vec<NodeId>,
    /// Root ports targeted by outbound boundary ports.
    pub out_root_ports: Vec<RuntimeLink>,
}

impl<'m> GraphScope<'m> {
    pub fn new(meta: &'m dyn BlueprintMeta, root: Option<RootBinding>) -> Self {
        let nodes = meta.node_count();
        Self {
            meta,
            root,
            runtime_ids: FxHashMap::with_capacity_and_hasher(nodes, Default::default()),
            compiled: FxHashSet::with_capacity_and_hasher(nodes, Default::default()),
            pending: Vec::new(),
            out_root_ports: Vec::new(),
        }
    }
}
