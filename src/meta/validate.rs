//! Structural checks over a graph description.
//!
//! The compiler only runs these when `CompileOptions::validate` is set (debug
//! builds by default). Issues are reported, never fatal.
use rustc_hash::FxHashSet;
use thiserror::Error;
use tracing::{error, warn};

use crate::meta::{BlueprintMeta, NodeId, PortMode, PortRef};
use crate::runtime::node::HashLinkDirection;
use crate::signature::Signature;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationIssue {
    #[error("asset '{asset}': external {mode:?} port '{name}' duplicates signature {signature:#018x}")]
    DuplicateExternalSignature {
        asset: String,
        name: String,
        mode: PortMode,
        signature: Signature,
    },

    #[error("link {}.{} -> {}.{} references a missing node or port", .from.node, .from.port, .to.node, .to.port)]
    DanglingLink { from: PortRef, to: PortRef },

    #[error("link {}.{} -> {}.{} connects incompatible ports", .from.node, .from.port, .to.node, .to.port)]
    MismatchedLink { from: PortRef, to: PortRef },

    #[error("input {}.{} has {count} producers, only the first one is read", .port.node, .port.port)]
    MultipleProducers { port: PortRef, count: usize },

    #[error("node {node} forwards port {port} to port {target}, which cannot own links")]
    MalformedInternalLink { node: NodeId, port: usize, target: usize },

    #[error("node {node} declares a {direction:?} hash link on incompatible port {port}")]
    MalformedHashLink {
        node: NodeId,
        port: usize,
        direction: HashLinkDirection,
    },
}

impl ValidationIssue {
    pub fn severity(&self) -> Severity {
        match self {
            ValidationIssue::MultipleProducers { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }

    pub fn log(&self, asset: &str) {
        match self.severity() {
            Severity::Warning => warn!(asset, "{}", self),
            Severity::Error => error!(asset, "{}", self),
        }
    }
}

pub fn validate_meta(meta: &dyn BlueprintMeta) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let mut external: FxHashSet<(Signature, PortMode)> = FxHashSet::default();

    for id in meta.nodes() {
        let port_count = meta.port_count(id);

        for index in 0..port_count {
            let Some(port) = meta.port(id, index) else {
                continue;
            };

            if port.is_external() && !external.insert((port.signature(), port.mode)) {
                issues.push(ValidationIssue::DuplicateExternalSignature {
                    asset: meta.id().to_string(),
                    name: port.name.clone(),
                    mode: port.mode,
                    signature: port.signature(),
                });
            }

            let from = PortRef::new(id, index);
            let links = meta.links_from(id, index);
            for &to in links {
                let target = meta
                    .node_source(to.node)
                    .and_then(|_| meta.port(to.node, to.port));
                match target {
                    None => issues.push(ValidationIssue::DanglingLink { from, to }),
                    Some(target) if !port.can_connect(target) || port.is_enter_or_output() => {
                        issues.push(ValidationIssue::MismatchedLink { from, to });
                    }
                    Some(_) => {}
                }
            }

            if port.mode == PortMode::Input && links.len() > 1 {
                issues.push(ValidationIssue::MultipleProducers {
                    port: from,
                    count: links.len(),
                });
            }
        }

        let Some(node) = meta.node(id) else {
            continue;
        };

        if let Some(internal) = node.as_internal_link() {
            for index in 0..port_count {
                let Some(port) = meta.port(id, index) else {
                    continue;
                };
                if !port.is_enter_or_output() {
                    continue;
                }
                for target in internal.linked_ports(id, index) {
                    let valid = meta
                        .port(id, target)
                        .is_some_and(|linked| !linked.is_enter_or_output() && linked.is_data() == port.is_data());
                    if !valid {
                        issues.push(ValidationIssue::MalformedInternalLink { node: id, port: index, target });
                    }
                }
            }
        }

        if let Some(hash_link) = node.as_hash_link() {
            for link in hash_link.hash_links(id) {
                let owner = link.direction == HashLinkDirection::From;
                let valid = meta
                    .port(id, link.port)
                    .is_some_and(|port| port.is_enter_or_output() != owner);
                if !valid {
                    issues.push(ValidationIssue::MalformedHashLink {
                        node: id,
                        port: link.port,
                        direction: link.direction,
                    });
                }
            }
        }
    }

    issues
}
