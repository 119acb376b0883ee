use anyhow::{Result, anyhow};
use serde_json::Value;

use crate::meta::builder::BlueprintAssetBuilder;
use crate::meta::registry::NodeDefinition;
use crate::meta::{AssetLibrary, NodeId, Port};
use crate::runtime::blueprint::RuntimeBlueprint;
use crate::runtime::node::{
    BlueprintEnter, BlueprintHashLink, BlueprintInternalLink, BlueprintLinker, BlueprintNode, HashLink,
    HashLinkDirection,
};
use crate::signature;

/// Raises a named event. Every listener of the same name in the compiled
/// blueprint, subgraphs included, is wired to the hidden `Event` port.
#[derive(Debug, Clone, Default)]
pub struct EmitEventNode {
    pub event: String,
}

impl EmitEventNode {
    pub fn new(event: &str) -> Self {
        Self { event: event.to_string() }
    }
}

impl BlueprintNode for EmitEventNode {
    fn create_ports(&self) -> Vec<Port> {
        vec![Port::enter("Emit"), Port::exit("Event").hidden(true)]
    }

    fn as_enter(&self) -> Option<&dyn BlueprintEnter> {
        Some(self)
    }

    fn as_hash_link(&self) -> Option<&dyn BlueprintHashLink> {
        Some(self)
    }
}

impl BlueprintEnter for EmitEventNode {
    fn on_enter(&self, blueprint: &RuntimeBlueprint, id: NodeId, _port: usize) {
        blueprint.call(id, 1);
    }
}

impl BlueprintHashLink for EmitEventNode {
    fn hash_links(&self, _id: NodeId) -> Vec<HashLink> {
        vec![HashLink {
            hash: signature::hash_link(&self.event),
            port: 1,
            direction: HashLinkDirection::From,
        }]
    }
}

/// Continues on `On Event` whenever an emitter of the same event fires.
#[derive(Debug, Clone, Default)]
pub struct EventListenerNode {
    pub event: String,
}

impl EventListenerNode {
    pub fn new(event: &str) -> Self {
        Self { event: event.to_string() }
    }
}

impl BlueprintNode for EventListenerNode {
    fn create_ports(&self) -> Vec<Port> {
        vec![Port::enter("Event").hidden(true), Port::exit("On Event")]
    }

    fn as_internal_link(&self) -> Option<&dyn BlueprintInternalLink> {
        Some(self)
    }

    fn as_hash_link(&self) -> Option<&dyn BlueprintHashLink> {
        Some(self)
    }

    fn as_linker(&self) -> Option<&dyn BlueprintLinker> {
        Some(self)
    }
}

impl BlueprintInternalLink for EventListenerNode {
    fn linked_ports(&self, _id: NodeId, port: usize) -> Vec<usize> {
        if port == 0 { vec![1] } else { Vec::new() }
    }
}

impl BlueprintHashLink for EventListenerNode {
    fn hash_links(&self, _id: NodeId) -> Vec<HashLink> {
        vec![HashLink {
            hash: signature::hash_link(&self.event),
            port: 0,
            direction: HashLinkDirection::To,
        }]
    }
}

impl BlueprintLinker for EventListenerNode {}

fn event_param(kind: &str, params: &Value) -> Result<String> {
    match params.get("event").and_then(|v| v.as_str()) {
        Some(event) if !event.is_empty() => Ok(event.to_string()),
        _ => Err(anyhow!("{} requires a non-empty 'event'", kind)),
    }
}

pub struct EmitEventDefinition;

impl NodeDefinition for EmitEventDefinition {
    fn name(&self) -> &str {
        "emit_event"
    }

    fn validate(&self, params: &Value) -> Result<()> {
        event_param(self.name(), params).map(|_| ())
    }

    fn instantiate(&self, key: &str, params: &Value, builder: &mut BlueprintAssetBuilder, _library: &AssetLibrary) -> Result<NodeId> {
        let event = event_param(self.name(), params)?;
        builder.add_node(key, EmitEventNode { event })
    }
}

pub struct EventListenerDefinition;

impl NodeDefinition for EventListenerDefinition {
    fn name(&self) -> &str {
        "event_listener"
    }

    fn validate(&self, params: &Value) -> Result<()> {
        event_param(self.name(), params).map(|_| ())
    }

    fn instantiate(&self, key: &str, params: &Value, builder: &mut BlueprintAssetBuilder, _library: &AssetLibrary) -> Result<NodeId> {
        let event = event_param(self.name(), params)?;
        builder.add_node(key, EventListenerNode { event })
    }
}
