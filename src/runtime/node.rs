//! Node base trait and the optional capabilities a node type may expose.
//!
//! Capabilities are queried through `as_*` accessors returning `None` by
//! default; a node opts in by returning `Some(self)`.
use std::any::Any;
use std::rc::Rc;

use crate::meta::{BlueprintMeta, NodeId, Port};
use crate::runtime::blueprint::RuntimeBlueprint;
use crate::runtime::link_storage::LinkStorage;
use crate::signature::Signature;

pub trait BlueprintNode: Any {
    /// Ports of this node as seen by the graph description.
    fn create_ports(&self) -> Vec<Port>;

    fn on_initialize(&self, _blueprint: &RuntimeBlueprint, _id: NodeId) {}

    fn on_deinitialize(&self, _blueprint: &RuntimeBlueprint, _id: NodeId) {}

    fn as_enter(&self) -> Option<&dyn BlueprintEnter> {
        None
    }

    fn as_output(&self) -> Option<&dyn BlueprintOutput> {
        None
    }

    fn as_enable_callback(&self) -> Option<&dyn BlueprintEnableCallback> {
        None
    }

    fn as_start_callback(&self) -> Option<&dyn BlueprintStartCallback> {
        None
    }

    fn as_internal_link(&self) -> Option<&dyn BlueprintInternalLink> {
        None
    }

    fn as_hash_link(&self) -> Option<&dyn BlueprintHashLink> {
        None
    }

    fn as_linker(&self) -> Option<&dyn BlueprintLinker> {
        None
    }

    fn as_subgraph(&self) -> Option<&dyn BlueprintSubgraph> {
        None
    }

    fn as_compiled(&self) -> Option<&dyn BlueprintCompiled> {
        None
    }
}

/// Receives calls arriving on an enter port.
pub trait BlueprintEnter {
    fn on_enter(&self, blueprint: &RuntimeBlueprint, id: NodeId, port: usize);
}

/// Produces values for output ports.
///
/// `write_output` is the typed path: `out` is a `&mut Option<T>` for the
/// requested `T`, see [`put_output`]. `output_any` is the type-erased fallback.
pub trait BlueprintOutput {
    fn write_output(&self, _blueprint: &RuntimeBlueprint, _id: NodeId, _port: usize, _out: &mut dyn Any) -> bool {
        false
    }

    fn output_any(&self, _blueprint: &RuntimeBlueprint, _id: NodeId, _port: usize) -> Option<Box<dyn Any>> {
        None
    }
}

/// Stores `value` into a typed output slot if the slot asks for `T`.
pub fn put_output<T: 'static>(out: &mut dyn Any, value: T) -> bool {
    match out.downcast_mut::<Option<T>>() {
        Some(slot) => {
            *slot = Some(value);
            true
        }
        None => false,
    }
}

pub trait BlueprintEnableCallback {
    fn on_set_enabled(&self, blueprint: &RuntimeBlueprint, id: NodeId, enabled: bool);
}

pub trait BlueprintStartCallback {
    fn on_start(&self, blueprint: &RuntimeBlueprint, id: NodeId);
}

/// Forwards an enter/output port of a node to other ports of the same node.
pub trait BlueprintInternalLink {
    fn linked_ports(&self, id: NodeId, port: usize) -> Vec<usize>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashLinkDirection {
    /// The port owns links to every matching `To` port.
    From = 0,
    /// The port is a target of every matching `From` port.
    To = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HashLink {
    pub hash: Signature,
    pub port: usize,
    pub direction: HashLinkDirection,
}

/// Declares virtual links matched by signature instead of drawn edges.
pub trait BlueprintHashLink {
    fn hash_links(&self, id: NodeId) -> Vec<HashLink>;
}

/// Marks ports that only forward calls and reads. Links targeting them are
/// replaced by the links they forward to when the blueprint is compiled.
pub trait BlueprintLinker {
    fn is_linker_port(&self, _port: usize) -> bool {
        true
    }
}

/// A node that instantiates a nested graph.
pub trait BlueprintSubgraph {
    fn asset(&self) -> Option<Rc<dyn BlueprintMeta>>;
}

/// Notified once the link table is final.
pub trait BlueprintCompiled {
    fn on_compile(&self, id: NodeId, links: &LinkStorage);
}
