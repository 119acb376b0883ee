use std::collections::HashMap;

use anyhow::{Result, anyhow};
use serde_json::Value;

use crate::meta::builder::BlueprintAssetBuilder;
use crate::meta::{AssetLibrary, NodeId};

/// 节点定义接口：把 YAML 参数转换为资产中的节点
pub trait NodeDefinition {
    fn name(&self) -> &str;
    fn validate(&self, params: &Value) -> Result<()>;
    fn instantiate(
        &self,
        key: &str,
        params: &Value,
        builder: &mut BlueprintAssetBuilder,
        library: &AssetLibrary,
    ) -> Result<NodeId>;
}

#[derive(Default)]
pub struct NodeRegistry {
    definitions: HashMap<String, Box<dyn NodeDefinition>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every node type shipped by this crate.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        crate::nodes::register_builtin(&mut registry);
        registry
    }

    pub fn register(&mut self, definition: Box<dyn NodeDefinition>) {
        self.definitions.insert(definition.name().to_string(), definition);
    }

    pub fn get(&self, name: &str) -> Option<&dyn NodeDefinition> {
        self.definitions.get(name).map(|definition| definition.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn instantiate(
        &self,
        kind: &str,
        key: &str,
        params: &Value,
        builder: &mut BlueprintAssetBuilder,
        library: &AssetLibrary,
    ) -> Result<NodeId> {
        let definition = self
            .get(kind)
            .ok_or_else(|| anyhow!("Node definition not found: {}", kind))?;
        definition.validate(params)?;
        definition.instantiate(key, params, builder, library)
    }
}
