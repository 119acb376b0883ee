use anyhow::{Result, anyhow};
use serde_json::Value;

use crate::meta::builder::BlueprintAssetBuilder;
use crate::meta::registry::NodeDefinition;
use crate::meta::{AssetLibrary, NodeId, Port, PortMode};
use crate::runtime::node::{BlueprintInternalLink, BlueprintLinker, BlueprintNode};

/// Forwards flow (`In` -> `Out`) or data (`Out` reads `In`).
/// Compiles away entirely when links are inlined.
#[derive(Debug, Clone, Default)]
pub struct AliasNode {
    pub data: bool,
}

impl AliasNode {
    pub fn flow() -> Self {
        Self { data: false }
    }

    pub fn data() -> Self {
        Self { data: true }
    }
}

impl BlueprintNode for AliasNode {
    fn create_ports(&self) -> Vec<Port> {
        if self.data {
            vec![Port::input("In"), Port::output("Out")]
        } else {
            vec![Port::enter("In"), Port::exit("Out")]
        }
    }

    fn as_internal_link(&self) -> Option<&dyn BlueprintInternalLink> {
        Some(self)
    }

    fn as_linker(&self) -> Option<&dyn BlueprintLinker> {
        Some(self)
    }
}

impl BlueprintInternalLink for AliasNode {
    fn linked_ports(&self, _id: NodeId, port: usize) -> Vec<usize> {
        match (self.data, port) {
            (false, 0) => vec![1],
            (true, 1) => vec![0],
            _ => Vec::new(),
        }
    }
}

impl BlueprintLinker for AliasNode {}

pub struct AliasDefinition;

impl NodeDefinition for AliasDefinition {
    fn name(&self) -> &str {
        "alias"
    }

    fn validate(&self, params: &Value) -> Result<()> {
        match params.get("data") {
            None | Some(Value::Bool(_)) => Ok(()),
            Some(other) => Err(anyhow!("alias 'data' must be a bool, got {}", other)),
        }
    }

    fn instantiate(&self, key: &str, params: &Value, builder: &mut BlueprintAssetBuilder, _library: &AssetLibrary) -> Result<NodeId> {
        let data = params.get("data").and_then(|v| v.as_bool()).unwrap_or(false);
        builder.add_node(key, AliasNode { data })
    }
}

/// Boundary port of an asset.
///
/// The external port carries the asset-level name; the other port faces the
/// inside of the graph. Flow ports forward from port 0 to port 1, data ports
/// from port 1 to port 0.
#[derive(Debug, Clone)]
pub struct ExternalPortNode {
    pub name: String,
    pub mode: PortMode,
}

impl ExternalPortNode {
    pub fn new(name: &str, mode: PortMode) -> Self {
        Self {
            name: name.to_string(),
            mode,
        }
    }
}

impl Default for ExternalPortNode {
    fn default() -> Self {
        Self::new("Port", PortMode::Enter)
    }
}

impl BlueprintNode for ExternalPortNode {
    fn create_ports(&self) -> Vec<Port> {
        let name = self.name.as_str();
        match self.mode {
            PortMode::Enter => vec![Port::enter(name).external(true), Port::exit("Out")],
            PortMode::Exit => vec![Port::enter("In"), Port::exit(name).external(true)],
            PortMode::Input => vec![Port::input(name).external(true), Port::output("Value")],
            PortMode::Output => vec![Port::input("Value"), Port::output(name).external(true)],
            PortMode::NonTypedOutput => vec![Port::input("Value"), Port::non_typed_output(name).external(true)],
        }
    }

    fn as_internal_link(&self) -> Option<&dyn BlueprintInternalLink> {
        Some(self)
    }

    fn as_linker(&self) -> Option<&dyn BlueprintLinker> {
        Some(self)
    }
}

impl BlueprintInternalLink for ExternalPortNode {
    fn linked_ports(&self, _id: NodeId, port: usize) -> Vec<usize> {
        match (self.mode.is_data(), port) {
            (false, 0) => vec![1],
            (true, 1) => vec![0],
            _ => Vec::new(),
        }
    }
}

impl BlueprintLinker for ExternalPortNode {}

pub struct ExternalPortDefinition;

fn parse_mode(value: &str) -> Option<PortMode> {
    match value.to_ascii_lowercase().as_str() {
        "enter" => Some(PortMode::Enter),
        "exit" => Some(PortMode::Exit),
        "input" => Some(PortMode::Input),
        "output" => Some(PortMode::Output),
        "non_typed_output" | "nontypedoutput" => Some(PortMode::NonTypedOutput),
        _ => None,
    }
}

impl NodeDefinition for ExternalPortDefinition {
    fn name(&self) -> &str {
        "external_port"
    }

    fn validate(&self, params: &Value) -> Result<()> {
        let name = params.get("name").and_then(|v| v.as_str());
        if name.is_none_or(str::is_empty) {
            return Err(anyhow!("external_port requires a non-empty 'name'"));
        }
        let mode = params.get("mode").and_then(|v| v.as_str()).unwrap_or_default();
        if parse_mode(mode).is_none() {
            return Err(anyhow!("external_port has unknown mode '{}'", mode));
        }
        Ok(())
    }

    fn instantiate(&self, key: &str, params: &Value, builder: &mut BlueprintAssetBuilder, _library: &AssetLibrary) -> Result<NodeId> {
        let name = params.get("name").and_then(|v| v.as_str()).unwrap_or_default();
        let mode = params
            .get("mode")
            .and_then(|v| v.as_str())
            .and_then(parse_mode)
            .ok_or_else(|| anyhow!("external_port '{}' has no valid mode", key))?;
        builder.add_node(key, ExternalPortNode::new(name, mode))
    }
}
