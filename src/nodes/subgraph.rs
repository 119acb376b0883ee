use std::rc::Rc;

use anyhow::{Result, anyhow};
use serde_json::Value;

use crate::meta::builder::BlueprintAssetBuilder;
use crate::meta::registry::NodeDefinition;
use crate::meta::{AssetLibrary, BlueprintAsset, BlueprintMeta, NodeId, Port};
use crate::runtime::node::{BlueprintLinker, BlueprintNode, BlueprintSubgraph};

/// Instantiates another asset in place.
///
/// Its ports mirror the asset's external ports and keep their signatures, so
/// the compiler can bind them to the boundary nodes inside.
#[derive(Clone, Default)]
pub struct SubgraphNode {
    pub asset: Option<Rc<BlueprintAsset>>,
}

impl SubgraphNode {
    pub fn new(asset: Rc<BlueprintAsset>) -> Self {
        Self { asset: Some(asset) }
    }
}

impl BlueprintNode for SubgraphNode {
    fn create_ports(&self) -> Vec<Port> {
        let Some(asset) = &self.asset else {
            return Vec::new();
        };
        asset
            .external_ports()
            .into_iter()
            .map(|port| port.external(false))
            .collect()
    }

    fn as_linker(&self) -> Option<&dyn BlueprintLinker> {
        Some(self)
    }

    fn as_subgraph(&self) -> Option<&dyn BlueprintSubgraph> {
        Some(self)
    }
}

impl BlueprintLinker for SubgraphNode {}

impl BlueprintSubgraph for SubgraphNode {
    fn asset(&self) -> Option<Rc<dyn BlueprintMeta>> {
        self.asset.clone().map(|asset| asset as Rc<dyn BlueprintMeta>)
    }
}

pub struct SubgraphDefinition;

impl NodeDefinition for SubgraphDefinition {
    fn name(&self) -> &str {
        "subgraph"
    }

    fn validate(&self, params: &Value) -> Result<()> {
        match params.get("asset").and_then(|v| v.as_str()) {
            Some(asset) if !asset.is_empty() => Ok(()),
            _ => Err(anyhow!("subgraph requires an 'asset' id")),
        }
    }

    fn instantiate(&self, key: &str, params: &Value, builder: &mut BlueprintAssetBuilder, library: &AssetLibrary) -> Result<NodeId> {
        let asset_id = params.get("asset").and_then(|v| v.as_str()).unwrap_or_default();
        let asset = library
            .get(asset_id)
            .ok_or_else(|| anyhow!("Subgraph '{}' references unknown asset '{}'", key, asset_id))?;
        builder.add_node(key, SubgraphNode::new(asset))
    }
}
