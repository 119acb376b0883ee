use tracing::{debug, error, info, trace, warn};

use crate::compiler::context::{CompileContext, GraphScope, RootBinding};
use crate::error::BlueprintError;
use crate::meta::validate::validate_meta;
use crate::meta::{BlueprintMeta, NodeId, Port};
use crate::runtime::blueprint::RuntimeBlueprint;
use crate::runtime::factory::{BlueprintFactory, SharedFactory};
use crate::runtime::link::RuntimeLink;

#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Run graph validation and report issues through `tracing`.
    pub validate: bool,
    /// Collapse linker indirections after wiring.
    pub inline: bool,
    /// Node storage pre-size; defaults to the root graph's node count.
    pub expected_nodes: Option<usize>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            validate: cfg!(debug_assertions),
            inline: true,
            expected_nodes: None,
        }
    }
}

/// Compiles graph descriptions into runtime blueprints.
///
/// The compiler holds no per-compile state, so one instance can serve any
/// number of assets.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    options: CompileOptions,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: CompileOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn compile(&self, meta: &dyn BlueprintMeta, factory: &SharedFactory) -> Result<RuntimeBlueprint, BlueprintError> {
        let expected_nodes = self.options.expected_nodes.unwrap_or_else(|| meta.node_count());
        let mut guard = factory.borrow_mut();
        let mut ctx = CompileContext::new(&mut guard, expected_nodes);

        // 1. Phase A: materialize nodes and wire declared, boundary and internal links
        let root_scope = match self.compile_graph(&mut ctx, meta, None) {
            Ok(scope) => scope,
            Err(e) => {
                for id in ctx.nodes.iter() {
                    ctx.factory.remove_node(id);
                }
                return Err(e);
            }
        };
        let runtime_ids = root_scope.runtime_ids;

        // 2. Phase B: connect hash links
        let hash_links = std::mem::take(&mut ctx.hash_links);
        if self.options.validate {
            for hash in hash_links.unmatched() {
                warn!(blueprint = meta.id(), hash = %format!("{hash:#018x}"), "Hash link has no counterpart");
            }
        }
        let hash_link_count = hash_links.resolve(&mut ctx.links);

        // 3. Finalize: inline linkers and notify compiled nodes
        let CompileContext {
            factory: runtime_factory,
            nodes,
            mut links,
            ..
        } = ctx;
        let runtime_factory: &BlueprintFactory = runtime_factory;

        if self.options.inline {
            links.inline_links(|link| is_linker(runtime_factory, link));
        }

        for id in nodes.iter() {
            if let Some(compiled) = runtime_factory.node(id).and_then(|node| node.as_compiled()) {
                compiled.on_compile(id, &links);
            }
        }

        info!(
            blueprint = meta.id(),
            nodes = nodes.count(),
            ports = links.port_count(),
            links = links.link_count(),
            hash_links = hash_link_count,
            "Compiled blueprint"
        );

        drop(guard);
        Ok(RuntimeBlueprint::new(meta.id().to_string(), factory.clone(), nodes, links, runtime_ids))
    }

    fn compile_graph<'m>(
        &self,
        ctx: &mut CompileContext<'_>,
        meta: &'m dyn BlueprintMeta,
        root: Option<RootBinding>,
    ) -> Result<GraphScope<'m>, BlueprintError> {
        if ctx.assets.iter().any(|id| id == meta.id()) {
            return Err(BlueprintError::RecursiveSubgraph(meta.id().to_string()));
        }
        if self.options.validate && ctx.validated.insert(meta.id().to_string()) {
            for issue in validate_meta(meta) {
                issue.log(meta.id());
            }
        }

        ctx.assets.push(meta.id().to_string());
        let mut scope = GraphScope::new(meta, root);

        for id in meta.nodes() {
            scope.pending.push(id);
            while let Some(next) = scope.pending.pop() {
                self.compile_node(ctx, &mut scope, next)?;
            }
        }

        ctx.assets.pop();

        if self.options.validate {
            check_root_ports(ctx, &scope);
        }
        Ok(scope)
    }

    fn compile_node(&self, ctx: &mut CompileContext<'_>, scope: &mut GraphScope<'_>, id: NodeId) -> Result<(), BlueprintError> {
        if !scope.compiled.insert(id) {
            return Ok(());
        }

        let meta = scope.meta;
        let runtime_id = self.get_or_create_node(ctx, scope, id)?;
        let port_count = meta.port_count(id);

        for index in 0..port_count {
            let Some(port) = meta.port(id, index) else {
                continue;
            };
            let owner = RuntimeLink::of(runtime_id, index);

            if port.is_external() {
                self.wire_external(ctx, scope, owner, port);
                if !port.is_enter_or_output() {
                    continue;
                }
            } else if !port.is_enter_or_output() {
                let declared = meta.links_from(id, index);
                let mut targets = Vec::with_capacity(declared.len());
                for &to in declared {
                    let Some(target_port) = meta.node_source(to.node).and_then(|_| meta.port(to.node, to.port)) else {
                        debug!(from = %id, port = index, to = %to.node, "Skipping dangling link");
                        continue;
                    };
                    if !port.can_connect(target_port) {
                        debug!(from = %id, port = index, to = %to.node, to_port = to.port, "Skipping mismatched link");
                        continue;
                    }
                    let target_id = self.get_or_create_node(ctx, scope, to.node)?;
                    if !scope.compiled.contains(&to.node) {
                        scope.pending.push(to.node);
                    }
                    targets.push(RuntimeLink::of(target_id, to.port));
                }

                let mut cursor = ctx.links.select_port(owner);
                for target in targets {
                    cursor.append(target);
                }
                continue;
            }

            let linked = ctx
                .factory
                .node(runtime_id)
                .and_then(|node| node.as_internal_link())
                .map(|internal| internal.linked_ports(runtime_id, index))
                .unwrap_or_default();
            if linked.is_empty() {
                continue;
            }

            let mut cursor = ctx.links.select_port(owner);
            for target in linked {
                if target < port_count {
                    cursor.append(RuntimeLink::of(runtime_id, target));
                }
            }
        }

        let hash_links = ctx
            .factory
            .node(runtime_id)
            .and_then(|node| node.as_hash_link())
            .map(|hash_link| hash_link.hash_links(runtime_id))
            .unwrap_or_default();
        for link in hash_links {
            if link.port < port_count {
                ctx.hash_links.add(link.hash, link.direction, RuntimeLink::of(runtime_id, link.port));
            }
        }

        Ok(())
    }

    /// Returns the runtime node for `meta_id`, creating it on first use.
    /// Creating a subgraph node compiles its asset against that node.
    fn get_or_create_node(
        &self,
        ctx: &mut CompileContext<'_>,
        scope: &mut GraphScope<'_>,
        meta_id: NodeId,
    ) -> Result<NodeId, BlueprintError> {
        if let Some(&id) = scope.runtime_ids.get(&meta_id) {
            return Ok(id);
        }

        let meta = scope.meta;
        let source = meta.node_source(meta_id).ok_or(BlueprintError::MissingSource(meta_id))?;
        let source_index = ctx.factory.get_or_create_source(source);
        let slot = ctx
            .factory
            .source_mut(source_index)
            .ok_or(BlueprintError::MissingFactorySource(source_index))?
            .add_node_copy(source, meta_id.node)
            .ok_or(BlueprintError::MissingSource(meta_id))?;

        let id = NodeId::new(source_index, slot);
        ctx.nodes.add_node(id);
        scope.runtime_ids.insert(meta_id, id);
        trace!(meta = %meta_id, runtime = %id, "Materialized node");

        let asset = ctx
            .factory
            .node(id)
            .and_then(|node| node.as_subgraph())
            .and_then(|subgraph| subgraph.asset());
        if let Some(asset) = asset {
            let ports = (0..meta.port_count(meta_id))
                .filter_map(|index| meta.port(meta_id, index).cloned())
                .collect();
            debug!(asset = asset.id(), root = %id, "Compiling subgraph");
            self.compile_graph(ctx, &*asset, Some(RootBinding { id, ports }))?;
        }

        Ok(id)
    }

    /// Inbound boundary ports receive a link from the root port, outbound
    /// ones link to it. Boundary ports of the top-level graph stay open.
    fn wire_external(&self, ctx: &mut CompileContext<'_>, scope: &mut GraphScope<'_>, owner: RuntimeLink, port: &Port) {
        let Some(root) = &scope.root else {
            return;
        };
        let Some(root_port) = root.port_for(port) else {
            if self.options.validate {
                error!(asset = scope.meta.id(), port = %port.name, "Boundary port has no counterpart on the subgraph node");
            }
            return;
        };

        let root_link = RuntimeLink::of(root.id, root_port);
        if port.is_enter_or_output() {
            ctx.links.select_port(root_link).append(owner);
        } else {
            ctx.links.select_port(owner).append(root_link);
            scope.out_root_ports.push(root_link);
        }
    }
}

fn is_linker(factory: &BlueprintFactory, link: RuntimeLink) -> bool {
    factory
        .node(link.node_id())
        .and_then(|node| node.as_linker())
        .is_some_and(|linker| linker.is_linker_port(link.port))
}

fn check_root_ports(ctx: &CompileContext<'_>, scope: &GraphScope<'_>) {
    let Some(root) = &scope.root else {
        return;
    };
    for (index, port) in root.ports.iter().enumerate() {
        let link = RuntimeLink::of(root.id, index);
        let bound = if port.is_enter_or_output() {
            ctx.links.contains_port(link)
        } else {
            scope.out_root_ports.contains(&link)
        };
        if !bound {
            warn!(asset = scope.meta.id(), port = %port.name, "Subgraph port is not bound inside the asset");
        }
    }
}
