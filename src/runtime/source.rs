use std::any::{Any, TypeId, type_name};

use crate::runtime::node::BlueprintNode;

/// Dense storage for all instances of one node type.
pub trait BlueprintSource: Any {
    fn node_type(&self) -> TypeId;

    fn type_name(&self) -> &'static str;

    /// Number of live nodes.
    fn count(&self) -> usize;

    /// Adds a default-constructed node and returns its slot.
    fn add_node(&mut self) -> usize;

    /// Copies node `node` of `source`, which must hold the same node type.
    fn add_node_copy(&mut self, source: &dyn BlueprintSource, node: usize) -> Option<usize>;

    fn remove_node(&mut self, node: usize) -> bool;

    fn node(&self, node: usize) -> Option<&dyn BlueprintNode>;

    /// Creates an empty source for the same node type.
    fn create_empty(&self) -> Box<dyn BlueprintSource>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

pub struct NodeSource<N> {
    slots: Vec<Option<N>>,
    free: Vec<usize>,
    count: usize,
}

impl<N> Default for NodeSource<N> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            count: 0,
        }
    }
}

impl<N: BlueprintNode + Clone + Default> NodeSource<N> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: N) -> usize {
        self.count += 1;
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(node);
                slot
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        }
    }

    pub fn get(&self, slot: usize) -> Option<&N> {
        self.slots.get(slot).and_then(Option::as_ref)
    }
}

impl<N: BlueprintNode + Clone + Default> BlueprintSource for NodeSource<N> {
    fn node_type(&self) -> TypeId {
        TypeId::of::<N>()
    }

    fn type_name(&self) -> &'static str {
        type_name::<N>()
    }

    fn count(&self) -> usize {
        self.count
    }

    fn add_node(&mut self) -> usize {
        self.insert(N::default())
    }

    fn add_node_copy(&mut self, source: &dyn BlueprintSource, node: usize) -> Option<usize> {
        let copy = source.as_any().downcast_ref::<NodeSource<N>>()?.get(node)?.clone();
        Some(self.insert(copy))
    }

    fn remove_node(&mut self, node: usize) -> bool {
        match self.slots.get_mut(node).and_then(Option::take) {
            Some(_) => {
                self.free.push(node);
                self.count -= 1;
                true
            }
            None => false,
        }
    }

    fn node(&self, node: usize) -> Option<&dyn BlueprintNode> {
        self.get(node).map(|node| node as &dyn BlueprintNode)
    }

    fn create_empty(&self) -> Box<dyn BlueprintSource> {
        Box::new(NodeSource::<N>::new())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
