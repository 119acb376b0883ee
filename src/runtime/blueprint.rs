use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use crate::meta::NodeId;
use crate::runtime::factory::SharedFactory;
use crate::runtime::link::RuntimeLink;
use crate::runtime::link_storage::{LinkIter, LinkStorage};
use crate::runtime::node_storage::NodeStorage;

/// The object that owns and drives a runtime blueprint.
pub trait BlueprintHost {
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlueprintState {
    Compiled,
    Initialized,
    Started,
    DeInitialized,
    Destroyed,
}

/// 编译后的运行时蓝图
///
/// Immutable node and link tables plus the factory that owns the node
/// instances. Hosts drive it through the lifecycle calls and `call` / `read`.
pub struct RuntimeBlueprint {
    id: String,
    factory: SharedFactory,
    nodes: NodeStorage,
    links: LinkStorage,
    runtime_ids: FxHashMap<NodeId, NodeId>,
    host: RefCell<Option<Rc<dyn BlueprintHost>>>,
    state: Cell<BlueprintState>,
    enabled: Cell<bool>,
}

impl RuntimeBlueprint {
    pub(crate) fn new(
        id: String,
        factory: SharedFactory,
        nodes: NodeStorage,
        links: LinkStorage,
        runtime_ids: FxHashMap<NodeId, NodeId>,
    ) -> Self {
        Self {
            id,
            factory,
            nodes,
            links,
            runtime_ids,
            host: RefCell::new(None),
            state: Cell::new(BlueprintState::Compiled),
            enabled: Cell::new(false),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> BlueprintState {
        self.state.get()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    pub fn factory(&self) -> &SharedFactory {
        &self.factory
    }

    pub fn host(&self) -> Option<Rc<dyn BlueprintHost>> {
        self.host.borrow().clone()
    }

    pub fn nodes(&self) -> &[NodeId] {
        self.nodes.nodes()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.count()
    }

    pub fn link_storage(&self) -> &LinkStorage {
        &self.links
    }

    /// Runtime id of a node of the root graph description.
    pub fn runtime_node(&self, meta_id: NodeId) -> Option<NodeId> {
        self.runtime_ids.get(&meta_id).copied()
    }

    pub fn links(&self, id: NodeId, port: usize) -> LinkIter<'_> {
        self.links.links(RuntimeLink::of(id, port))
    }

    pub fn initialize(&self, host: Rc<dyn BlueprintHost>) {
        if self.state.get() != BlueprintState::Compiled && self.state.get() != BlueprintState::DeInitialized {
            warn!(blueprint = %self.id, state = ?self.state.get(), "Initialize ignored");
            return;
        }

        info!(blueprint = %self.id, host = host.name(), nodes = self.nodes.count(), "Initializing blueprint");
        *self.host.borrow_mut() = Some(host);
        self.state.set(BlueprintState::Initialized);

        let factory = self.factory.borrow();
        for id in self.nodes.iter() {
            if let Some(node) = factory.node(id) {
                node.on_initialize(self, id);
            }
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        if !self.is_running() {
            warn!(blueprint = %self.id, state = ?self.state.get(), "SetEnabled ignored");
            return;
        }

        self.enabled.set(enabled);
        let factory = self.factory.borrow();
        for id in self.nodes.iter() {
            if let Some(callback) = factory.node(id).and_then(|node| node.as_enable_callback()) {
                callback.on_set_enabled(self, id, enabled);
            }
        }
    }

    pub fn start(&self) {
        if self.state.get() != BlueprintState::Initialized {
            warn!(blueprint = %self.id, state = ?self.state.get(), "Start ignored");
            return;
        }

        debug!(blueprint = %self.id, "Starting blueprint");
        self.state.set(BlueprintState::Started);
        let factory = self.factory.borrow();
        for id in self.nodes.iter() {
            if let Some(callback) = factory.node(id).and_then(|node| node.as_start_callback()) {
                callback.on_start(self, id);
            }
        }
    }

    pub fn deinitialize(&self) {
        if !self.is_running() {
            warn!(blueprint = %self.id, state = ?self.state.get(), "DeInitialize ignored");
            return;
        }

        debug!(blueprint = %self.id, "Deinitializing blueprint");
        {
            let factory = self.factory.borrow();
            for id in self.nodes.iter().rev() {
                if let Some(node) = factory.node(id) {
                    node.on_deinitialize(self, id);
                }
            }
        }
        self.enabled.set(false);
        self.state.set(BlueprintState::DeInitialized);
        *self.host.borrow_mut() = None;
    }

    /// Calls every enter target linked to `(id, port)` in list order.
    pub fn call(&self, id: NodeId, port: usize) {
        let factory = self.factory.borrow();
        let mut next = self.links.first_link(RuntimeLink::of(id, port));
        while let Some(index) = next {
            next = self.links.next_link(index);
            let Some(link) = self.links.link(index) else {
                continue;
            };
            if let Some(enter) = factory.node(link.node_id()).and_then(|node| node.as_enter()) {
                enter.on_enter(self, link.node_id(), link.port);
            }
        }
    }

    /// Reads the value produced by the first link of `(id, port)`.
    ///
    /// The typed output path is tried first, then the type-erased one; any
    /// miss yields `default`.
    pub fn read<T: 'static>(&self, id: NodeId, port: usize, default: T) -> T {
        let Some(link) = self.first_target(id, port) else {
            return default;
        };

        let factory = self.factory.borrow();
        let Some(output) = factory.node(link.node_id()).and_then(|node| node.as_output()) else {
            return default;
        };

        let mut slot: Option<T> = None;
        if output.write_output(self, link.node_id(), link.port, &mut slot) {
            if let Some(value) = slot {
                return value;
            }
        }

        match output.output_any(self, link.node_id(), link.port) {
            Some(value) => value.downcast::<T>().map(|value| *value).unwrap_or(default),
            None => default,
        }
    }

    /// Type-erased read of the first link of `(id, port)`.
    pub fn read_any(&self, id: NodeId, port: usize) -> Option<Box<dyn Any>> {
        let link = self.first_target(id, port)?;
        let factory = self.factory.borrow();
        let output = factory.node(link.node_id())?.as_output()?;
        output.output_any(self, link.node_id(), link.port)
    }

    fn first_target(&self, id: NodeId, port: usize) -> Option<RuntimeLink> {
        self.links
            .first_link(RuntimeLink::of(id, port))
            .and_then(|index| self.links.link(index))
    }

    fn is_running(&self) -> bool {
        matches!(self.state.get(), BlueprintState::Initialized | BlueprintState::Started)
    }

    /// Deinitializes if needed and releases every node back to its source.
    pub fn destroy(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.state.get() == BlueprintState::Destroyed {
            return;
        }
        if self.is_running() {
            self.deinitialize();
        }

        let Ok(mut factory) = self.factory.try_borrow_mut() else {
            warn!(blueprint = %self.id, "Factory busy, nodes were not released");
            return;
        };
        for id in self.nodes.iter() {
            factory.remove_node(id);
        }
        drop(factory);

        debug!(blueprint = %self.id, nodes = self.nodes.count(), "Released blueprint nodes");
        self.state.set(BlueprintState::Destroyed);
    }
}

impl Drop for RuntimeBlueprint {
    fn drop(&mut self) {
        self.release();
    }
}
