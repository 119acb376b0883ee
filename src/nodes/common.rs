use std::any::Any;
use std::cell::RefCell;

use anyhow::{Result, anyhow};
use serde_json::Value;
use tracing::info;

use crate::meta::builder::BlueprintAssetBuilder;
use crate::meta::registry::NodeDefinition;
use crate::meta::{AssetLibrary, NodeId, Port};
use crate::runtime::blueprint::RuntimeBlueprint;
use crate::runtime::link::RuntimeLink;
use crate::runtime::link_storage::LinkStorage;
use crate::runtime::node::{
    BlueprintCompiled, BlueprintEnter, BlueprintNode, BlueprintOutput, BlueprintStartCallback, put_output,
};

// --- START NODE ---

/// Fires its exit port when the blueprint starts.
#[derive(Debug, Clone, Default)]
pub struct StartNode;

impl BlueprintNode for StartNode {
    fn create_ports(&self) -> Vec<Port> {
        vec![Port::exit("Start")]
    }

    fn as_start_callback(&self) -> Option<&dyn BlueprintStartCallback> {
        Some(self)
    }
}

impl BlueprintStartCallback for StartNode {
    fn on_start(&self, blueprint: &RuntimeBlueprint, id: NodeId) {
        blueprint.call(id, 0);
    }
}

pub struct StartDefinition;

impl NodeDefinition for StartDefinition {
    fn name(&self) -> &str {
        "start"
    }

    fn validate(&self, _params: &Value) -> Result<()> {
        Ok(())
    }

    fn instantiate(&self, key: &str, _params: &Value, builder: &mut BlueprintAssetBuilder, _library: &AssetLibrary) -> Result<NodeId> {
        builder.add_node(key, StartNode)
    }
}

// --- LOG NODE ---

#[derive(Debug, Clone, Default)]
pub struct LogNode {
    pub message: String,
}

impl BlueprintNode for LogNode {
    fn create_ports(&self) -> Vec<Port> {
        vec![Port::enter("In"), Port::exit("Out")]
    }

    fn as_enter(&self) -> Option<&dyn BlueprintEnter> {
        Some(self)
    }
}

impl BlueprintEnter for LogNode {
    fn on_enter(&self, blueprint: &RuntimeBlueprint, id: NodeId, _port: usize) {
        let host = blueprint.host();
        let host = host.as_ref().map(|host| host.name()).unwrap_or("-");
        info!(blueprint = blueprint.id(), host, node = %id, "[LOG] {}", self.message);
        blueprint.call(id, 1);
    }
}

pub struct LogDefinition;

impl NodeDefinition for LogDefinition {
    fn name(&self) -> &str {
        "log"
    }

    fn validate(&self, params: &Value) -> Result<()> {
        match params.get("message") {
            None | Some(Value::String(_)) => Ok(()),
            Some(other) => Err(anyhow!("log 'message' must be a string, got {}", other)),
        }
    }

    fn instantiate(&self, key: &str, params: &Value, builder: &mut BlueprintAssetBuilder, _library: &AssetLibrary) -> Result<NodeId> {
        let message = params.get("message").and_then(|v| v.as_str()).unwrap_or_default().to_string();
        builder.add_node(key, LogNode { message })
    }
}

// --- CONSTANT NODE ---

/// Produces a fixed JSON value, readable as `Value`, `bool`, `i64`, `f64`
/// or `String` depending on its content.
#[derive(Debug, Clone, Default)]
pub struct ConstantNode {
    pub value: Value,
}

impl BlueprintNode for ConstantNode {
    fn create_ports(&self) -> Vec<Port> {
        let data_type = match &self.value {
            Value::Bool(_) => "bool",
            Value::Number(n) if n.is_f64() => "f64",
            Value::Number(_) => "i64",
            Value::String(_) => "string",
            _ => "value",
        };
        vec![Port::output("Value").data_type(data_type)]
    }

    fn as_output(&self) -> Option<&dyn BlueprintOutput> {
        Some(self)
    }
}

impl BlueprintOutput for ConstantNode {
    fn write_output(&self, _blueprint: &RuntimeBlueprint, _id: NodeId, _port: usize, out: &mut dyn Any) -> bool {
        if out.is::<Option<Value>>() {
            return put_output(out, self.value.clone());
        }
        match &self.value {
            Value::Bool(b) => put_output(out, *b),
            Value::Number(n) => {
                n.as_i64().is_some_and(|i| put_output(out, i)) || n.as_f64().is_some_and(|f| put_output(out, f))
            }
            Value::String(s) => put_output(out, s.clone()),
            _ => false,
        }
    }

    fn output_any(&self, _blueprint: &RuntimeBlueprint, _id: NodeId, _port: usize) -> Option<Box<dyn Any>> {
        Some(Box::new(self.value.clone()))
    }
}

pub struct ConstantDefinition;

impl NodeDefinition for ConstantDefinition {
    fn name(&self) -> &str {
        "constant"
    }

    fn validate(&self, params: &Value) -> Result<()> {
        if params.get("value").is_none() {
            return Err(anyhow!("constant requires a 'value' param"));
        }
        Ok(())
    }

    fn instantiate(&self, key: &str, params: &Value, builder: &mut BlueprintAssetBuilder, _library: &AssetLibrary) -> Result<NodeId> {
        let value = params.get("value").cloned().unwrap_or(Value::Null);
        builder.add_node(key, ConstantNode { value })
    }
}

// --- BRANCH NODE ---

/// Reads a bool and continues on `True` or `False`.
#[derive(Debug, Clone, Default)]
pub struct BranchNode;

impl BranchNode {
    pub const IN: usize = 0;
    pub const CONDITION: usize = 1;
    pub const TRUE: usize = 2;
    pub const FALSE: usize = 3;
}

impl BlueprintNode for BranchNode {
    fn create_ports(&self) -> Vec<Port> {
        vec![
            Port::enter("In"),
            Port::input("Condition").data_type("bool"),
            Port::exit("True"),
            Port::exit("False"),
        ]
    }

    fn as_enter(&self) -> Option<&dyn BlueprintEnter> {
        Some(self)
    }
}

impl BlueprintEnter for BranchNode {
    fn on_enter(&self, blueprint: &RuntimeBlueprint, id: NodeId, _port: usize) {
        let condition = blueprint.read(id, Self::CONDITION, false);
        blueprint.call(id, if condition { Self::TRUE } else { Self::FALSE });
    }
}

pub struct BranchDefinition;

impl NodeDefinition for BranchDefinition {
    fn name(&self) -> &str {
        "branch"
    }

    fn validate(&self, _params: &Value) -> Result<()> {
        Ok(())
    }

    fn instantiate(&self, key: &str, _params: &Value, builder: &mut BlueprintAssetBuilder, _library: &AssetLibrary) -> Result<NodeId> {
        builder.add_node(key, BranchNode)
    }
}

// --- SEQUENCE NODE ---

/// Calls each connected exit in port order.
#[derive(Debug, Clone)]
pub struct SequenceNode {
    pub exits: usize,
    connected: RefCell<Vec<usize>>,
}

impl SequenceNode {
    pub fn new(exits: usize) -> Self {
        Self {
            exits,
            connected: RefCell::new(Vec::new()),
        }
    }

    pub fn connected_exits(&self) -> Vec<usize> {
        self.connected.borrow().clone()
    }
}

impl Default for SequenceNode {
    fn default() -> Self {
        Self::new(2)
    }
}

impl BlueprintNode for SequenceNode {
    fn create_ports(&self) -> Vec<Port> {
        let mut ports = Vec::with_capacity(self.exits + 1);
        ports.push(Port::enter("In"));
        for i in 0..self.exits {
            ports.push(Port::exit(&format!("Then {}", i)));
        }
        ports
    }

    fn as_enter(&self) -> Option<&dyn BlueprintEnter> {
        Some(self)
    }

    fn as_compiled(&self) -> Option<&dyn BlueprintCompiled> {
        Some(self)
    }
}

impl BlueprintCompiled for SequenceNode {
    fn on_compile(&self, id: NodeId, links: &LinkStorage) {
        let connected = (1..=self.exits)
            .filter(|&port| links.first_link(RuntimeLink::of(id, port)).is_some())
            .collect();
        *self.connected.borrow_mut() = connected;
    }
}

impl BlueprintEnter for SequenceNode {
    fn on_enter(&self, blueprint: &RuntimeBlueprint, id: NodeId, _port: usize) {
        for port in self.connected_exits() {
            blueprint.call(id, port);
        }
    }
}

/// Upper bound on `exits` accepted from graph documents.
pub const MAX_SEQUENCE_EXITS: u64 = 64;

pub struct SequenceDefinition;

impl NodeDefinition for SequenceDefinition {
    fn name(&self) -> &str {
        "sequence"
    }

    fn validate(&self, params: &Value) -> Result<()> {
        match params.get("exits") {
            None => Ok(()),
            Some(v) if v.as_u64().is_some_and(|n| (1..=MAX_SEQUENCE_EXITS).contains(&n)) => Ok(()),
            Some(v) => Err(anyhow!(
                "sequence 'exits' must be an integer between 1 and {}, got {}",
                MAX_SEQUENCE_EXITS,
                v
            )),
        }
    }

    fn instantiate(&self, key: &str, params: &Value, builder: &mut BlueprintAssetBuilder, _library: &AssetLibrary) -> Result<NodeId> {
        let exits = params
            .get("exits")
            .and_then(|v| v.as_u64())
            .unwrap_or(2)
            .min(MAX_SEQUENCE_EXITS) as usize;
        builder.add_node(key, SequenceNode::new(exits))
    }
}
