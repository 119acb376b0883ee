pub mod asset;
pub mod builder;
pub mod loader;
pub mod registry;
pub mod validate;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::runtime::node::BlueprintNode;
use crate::runtime::source::BlueprintSource;
use crate::signature::Signature;

pub use asset::{AssetLibrary, BlueprintAsset};

/// Identity of a node inside a specific source's dense array.
///
/// The same type is used for meta ids (graph description) and runtime ids
/// (compiled instances); the two spaces never mix outside the compiler's map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId {
    pub source: usize,
    pub node: usize,
}

impl NodeId {
    pub const fn new(source: usize, node: usize) -> Self {
        Self { source, node }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.node)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortMode {
    /// Flow target: receives calls.
    Enter,
    /// Flow origin: issues calls.
    Exit,
    /// Data consumer: reads a value.
    Input,
    /// Typed data producer.
    Output,
    /// Data producer without a declared type.
    NonTypedOutput,
}

impl PortMode {
    pub fn is_input(self) -> bool {
        matches!(self, PortMode::Enter | PortMode::Input)
    }

    pub fn is_data(self) -> bool {
        matches!(self, PortMode::Input | PortMode::Output | PortMode::NonTypedOutput)
    }

    /// Enter and output ports are link targets; exit and input ports own links.
    pub fn is_enter_or_output(self) -> bool {
        self.is_input() != self.is_data()
    }
}

/// A connection point on a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub name: String,
    pub mode: PortMode,
    #[serde(default)]
    pub external: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub data_type: Option<String>,
    /// Assigned when the node is added to an asset.
    #[serde(default)]
    pub signature: Signature,
}

impl Port {
    fn with_mode(name: &str, mode: PortMode) -> Self {
        Self {
            name: name.to_string(),
            mode,
            external: false,
            hidden: false,
            data_type: None,
            signature: 0,
        }
    }

    pub fn enter(name: &str) -> Self {
        Self::with_mode(name, PortMode::Enter)
    }

    pub fn exit(name: &str) -> Self {
        Self::with_mode(name, PortMode::Exit)
    }

    pub fn input(name: &str) -> Self {
        Self::with_mode(name, PortMode::Input)
    }

    pub fn output(name: &str) -> Self {
        Self::with_mode(name, PortMode::Output)
    }

    pub fn non_typed_output(name: &str) -> Self {
        Self::with_mode(name, PortMode::NonTypedOutput)
    }

    pub fn external(mut self, external: bool) -> Self {
        self.external = external;
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn data_type(mut self, data_type: &str) -> Self {
        self.data_type = Some(data_type.to_string());
        self
    }

    pub fn is_external(&self) -> bool {
        self.external
    }

    pub fn is_input(&self) -> bool {
        self.mode.is_input()
    }

    pub fn is_data(&self) -> bool {
        self.mode.is_data()
    }

    pub fn is_enter_or_output(&self) -> bool {
        self.mode.is_enter_or_output()
    }

    pub fn signature(&self) -> Signature {
        self.signature
    }

    /// Flow connects to flow and data to data; one side owns the link.
    pub fn can_connect(&self, other: &Port) -> bool {
        self.is_data() == other.is_data() && self.is_enter_or_output() != other.is_enter_or_output()
    }
}

/// One end of a declared meta link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRef {
    pub node: NodeId,
    pub port: usize,
}

impl PortRef {
    pub const fn new(node: NodeId, port: usize) -> Self {
        Self { node, port }
    }
}

/// Read-only graph oracle consumed by the compiler.
///
/// Links are always reported from the owning side (exit / input port) to the
/// target side (enter / output port).
pub trait BlueprintMeta {
    /// Identity of the graph, used for signatures and recursion checks.
    fn id(&self) -> &str;

    fn nodes(&self) -> Vec<NodeId>;

    fn port_count(&self, id: NodeId) -> usize;

    fn port(&self, id: NodeId, index: usize) -> Option<&Port>;

    fn node_source(&self, id: NodeId) -> Option<&dyn BlueprintSource>;

    fn links_from(&self, id: NodeId, port: usize) -> &[PortRef];

    fn node(&self, id: NodeId) -> Option<&dyn BlueprintNode> {
        self.node_source(id).and_then(|source| source.node(id.node))
    }

    /// Number of nodes, used to pre-size node storage.
    fn node_count(&self) -> usize {
        self.nodes().len()
    }
}
