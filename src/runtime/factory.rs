use std::any::TypeId;
use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::meta::NodeId;
use crate::runtime::node::BlueprintNode;
use crate::runtime::source::{BlueprintSource, NodeSource};

/// Factory shared by a root blueprint, its subgraphs and any other blueprint
/// the host decides to pool node storage with.
pub type SharedFactory = Rc<RefCell<BlueprintFactory>>;

/// Registry of node sources, one per node type.
#[derive(Default)]
pub struct BlueprintFactory {
    sources: Vec<Option<Box<dyn BlueprintSource>>>,
    by_type: FxHashMap<TypeId, usize>,
}

impl BlueprintFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedFactory {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Returns the source holding nodes of the prototype's type, creating an
    /// empty one when missing.
    pub fn get_or_create_source(&mut self, prototype: &dyn BlueprintSource) -> usize {
        let node_type = prototype.node_type();
        if let Some(&index) = self.by_type.get(&node_type) {
            return index;
        }
        self.insert_source(node_type, prototype.create_empty())
    }

    pub fn get_or_create_source_of<N: BlueprintNode + Clone + Default>(&mut self) -> usize {
        let node_type = TypeId::of::<N>();
        if let Some(&index) = self.by_type.get(&node_type) {
            return index;
        }
        self.insert_source(node_type, Box::new(NodeSource::<N>::new()))
    }

    fn insert_source(&mut self, node_type: TypeId, source: Box<dyn BlueprintSource>) -> usize {
        debug!(node_type = source.type_name(), "Creating node source");
        let index = match self.sources.iter().position(Option::is_none) {
            Some(index) => {
                self.sources[index] = Some(source);
                index
            }
            None => {
                self.sources.push(Some(source));
                self.sources.len() - 1
            }
        };
        self.by_type.insert(node_type, index);
        index
    }

    /// Stores `node` in the source for `N`. `None` only if the source index
    /// was registered for another type.
    pub fn add_node<N: BlueprintNode + Clone + Default>(&mut self, node: N) -> Option<NodeId> {
        let source = self.get_or_create_source_of::<N>();
        let typed = self.sources.get_mut(source)?.as_mut()?.as_any_mut().downcast_mut::<NodeSource<N>>()?;
        Some(NodeId::new(source, typed.insert(node)))
    }

    pub fn source(&self, source: usize) -> Option<&dyn BlueprintSource> {
        self.sources.get(source).and_then(|s| s.as_deref())
    }

    pub fn source_mut(&mut self, source: usize) -> Option<&mut (dyn BlueprintSource + 'static)> {
        self.sources.get_mut(source).and_then(|s| s.as_deref_mut())
    }

    pub fn node(&self, id: NodeId) -> Option<&dyn BlueprintNode> {
        self.source(id.source).and_then(|source| source.node(id.node))
    }

    pub fn node_as<N: BlueprintNode + Clone + Default>(&self, id: NodeId) -> Option<&N> {
        self.source(id.source)?
            .as_any()
            .downcast_ref::<NodeSource<N>>()?
            .get(id.node)
    }

    /// Releases a node and drops its source once the source is empty.
    pub fn remove_node(&mut self, id: NodeId) -> bool {
        let Some(source) = self.source_mut(id.source) else {
            return false;
        };
        let removed = source.remove_node(id.node);
        if removed && source.count() == 0 {
            self.remove_source(id.source);
        }
        removed
    }

    pub fn remove_source(&mut self, source: usize) -> bool {
        let Some(removed) = self.sources.get_mut(source).and_then(Option::take) else {
            return false;
        };
        debug!(node_type = removed.type_name(), "Removing node source");
        self.by_type.remove(&removed.node_type());
        true
    }

    /// Number of registered sources.
    pub fn source_count(&self) -> usize {
        self.sources.iter().filter(|s| s.is_some()).count()
    }

    /// Number of live nodes across all sources.
    pub fn node_count(&self) -> usize {
        self.sources.iter().flatten().map(|source| source.count()).sum()
    }
}
