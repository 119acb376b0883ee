use std::fs;

use anyhow::{Context as AnyhowContext, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::meta::AssetLibrary;
use crate::meta::builder::{BlueprintAssetBuilder, PortSelector};
use crate::meta::registry::NodeRegistry;

/// A YAML graph document. Assets are listed in dependency order: a subgraph
/// node may only reference assets declared before its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    pub assets: Vec<AssetDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetDocument {
    pub id: String,
    #[serde(default)]
    pub nodes: Vec<NodeDocument>,
    #[serde(default)]
    pub links: Vec<LinkDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDocument {
    pub id: String,
    pub kind: String,
    #[serde(default)]
    pub params: Value,
}

/// Endpoints are written `node.port`, where `port` is a port name or index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkDocument {
    pub from: String,
    pub to: String,
}

pub fn load_document_from_yaml(file_path: &str) -> Result<GraphDocument> {
    let yaml_content = fs::read_to_string(file_path)
        .with_context(|| format!("Failed to read YAML file from {}", file_path))?;

    let document: GraphDocument = serde_yaml::from_str(&yaml_content)
        .with_context(|| format!("Failed to deserialize YAML content from {}", file_path))?;

    Ok(document)
}

pub fn load_assets_from_yaml(file_path: &str, registry: &NodeRegistry) -> Result<AssetLibrary> {
    let document = load_document_from_yaml(file_path)?;
    build_library(&document, registry).with_context(|| format!("Failed to build assets from {}", file_path))
}

pub fn parse_assets_from_str(yaml: &str, registry: &NodeRegistry) -> Result<AssetLibrary> {
    let document: GraphDocument = serde_yaml::from_str(yaml).context("Failed to deserialize YAML content")?;
    build_library(&document, registry)
}

pub fn build_library(document: &GraphDocument, registry: &NodeRegistry) -> Result<AssetLibrary> {
    let mut library = AssetLibrary::new();

    for asset in &document.assets {
        if library.get(&asset.id).is_some() {
            bail!("Duplicate asset id '{}'", asset.id);
        }

        let mut builder = BlueprintAssetBuilder::new(&asset.id);
        for node in &asset.nodes {
            registry
                .instantiate(&node.kind, &node.id, &node.params, &mut builder, &library)
                .with_context(|| format!("Failed to create node '{}' in asset '{}'", node.id, asset.id))?;
        }

        for link in &asset.links {
            let (from_key, from_port) = parse_endpoint(&link.from)?;
            let (to_key, to_port) = parse_endpoint(&link.to)?;
            builder.add_link(from_key, from_port, to_key, to_port);
        }

        let built = builder
            .build()
            .with_context(|| format!("Failed to build asset '{}'", asset.id))?;
        debug!(asset = %asset.id, nodes = asset.nodes.len(), links = built.link_count(), "Loaded asset");
        library.insert(built);
    }

    Ok(library)
}

fn parse_endpoint(endpoint: &str) -> Result<(&str, PortSelector)> {
    let (key, port) = endpoint
        .rsplit_once('.')
        .ok_or_else(|| anyhow!("Link endpoint '{}' must be written as node.port", endpoint))?;
    if key.is_empty() || port.is_empty() {
        bail!("Link endpoint '{}' must be written as node.port", endpoint);
    }

    let selector = match port.parse::<usize>() {
        Ok(index) => PortSelector::Index(index),
        Err(_) => PortSelector::Name(port.to_string()),
    };
    Ok((key, selector))
}
