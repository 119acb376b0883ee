use crate::meta::NodeId;

/// Compiled runtime node ids in instantiation order.
#[derive(Debug, Clone, Default)]
pub struct NodeStorage {
    nodes: Vec<NodeId>,
}

impl NodeStorage {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
        }
    }

    /// Appends a node and returns its position in instantiation order.
    pub fn add_node(&mut self, id: NodeId) -> usize {
        self.nodes.push(id);
        self.nodes.len() - 1
    }

    pub fn count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<NodeId> {
        self.nodes.get(index).copied()
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = NodeId> + '_ {
        self.nodes.iter().copied()
    }
}
