pub mod common;
pub mod event;
pub mod linker;
pub mod subgraph;

use crate::meta::registry::NodeRegistry;

/// Registers every node definition shipped with the crate.
pub fn register_builtin(registry: &mut NodeRegistry) {
    registry.register(Box::new(common::StartDefinition));
    registry.register(Box::new(common::LogDefinition));
    registry.register(Box::new(common::ConstantDefinition));
    registry.register(Box::new(common::BranchDefinition));
    registry.register(Box::new(common::SequenceDefinition));
    registry.register(Box::new(linker::AliasDefinition));
    registry.register(Box::new(linker::ExternalPortDefinition));
    registry.register(Box::new(subgraph::SubgraphDefinition));
    registry.register(Box::new(event::EmitEventDefinition));
    registry.register(Box::new(event::EventListenerDefinition));
}
