use std::fmt;

use serde::{Deserialize, Serialize};

use crate::meta::NodeId;

/// A typed edge endpoint: `(source, node, port)`.
///
/// Link storage uses the same value both as the key of a port's link list and
/// as a stored connection target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RuntimeLink {
    pub source: usize,
    pub node: usize,
    pub port: usize,
}

impl RuntimeLink {
    pub const fn new(source: usize, node: usize, port: usize) -> Self {
        Self { source, node, port }
    }

    pub const fn of(id: NodeId, port: usize) -> Self {
        Self::new(id.source, id.node, port)
    }

    pub const fn node_id(&self) -> NodeId {
        NodeId::new(self.source, self.node)
    }
}

impl fmt::Display for RuntimeLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}.{}", self.source, self.node, self.port)
    }
}
