#![allow(dead_code)]

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use blink::meta::{BlueprintAsset, NodeId, Port};
use blink::runtime::blueprint::{BlueprintHost, RuntimeBlueprint};
use blink::runtime::node::{
    BlueprintEnableCallback, BlueprintEnter, BlueprintNode, BlueprintOutput, BlueprintStartCallback,
};

pub type Trace = Rc<RefCell<Vec<String>>>;

pub fn trace() -> Trace {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn entries(trace: &Trace) -> Vec<String> {
    trace.borrow().clone()
}

pub struct TestHost;

impl BlueprintHost for TestHost {
    fn name(&self) -> &str {
        "test-host"
    }
}

pub fn host() -> Rc<dyn BlueprintHost> {
    Rc::new(TestHost)
}

/// Runtime id of the node added under `key`.
pub fn runtime_id(blueprint: &RuntimeBlueprint, asset: &BlueprintAsset, key: &str) -> NodeId {
    let meta_id = asset.node_id(key).expect("unknown node key");
    blueprint.runtime_node(meta_id).expect("node was not compiled")
}

/// Two enter ports that record `label.port` when entered.
#[derive(Clone, Default)]
pub struct Recorder {
    pub label: String,
    pub trace: Trace,
}

impl Recorder {
    pub fn new(label: &str, trace: &Trace) -> Self {
        Self {
            label: label.to_string(),
            trace: trace.clone(),
        }
    }
}

impl BlueprintNode for Recorder {
    fn create_ports(&self) -> Vec<Port> {
        vec![Port::enter("A"), Port::enter("B")]
    }

    fn as_enter(&self) -> Option<&dyn BlueprintEnter> {
        Some(self)
    }
}

impl BlueprintEnter for Recorder {
    fn on_enter(&self, _blueprint: &RuntimeBlueprint, _id: NodeId, port: usize) {
        self.trace.borrow_mut().push(format!("{}.{}", self.label, port));
    }
}

/// Records its label and continues on `Out`.
#[derive(Clone, Default)]
pub struct Relay {
    pub label: String,
    pub trace: Trace,
}

impl Relay {
    pub fn new(label: &str, trace: &Trace) -> Self {
        Self {
            label: label.to_string(),
            trace: trace.clone(),
        }
    }
}

impl BlueprintNode for Relay {
    fn create_ports(&self) -> Vec<Port> {
        vec![Port::enter("In"), Port::exit("Out")]
    }

    fn as_enter(&self) -> Option<&dyn BlueprintEnter> {
        Some(self)
    }
}

impl BlueprintEnter for Relay {
    fn on_enter(&self, blueprint: &RuntimeBlueprint, id: NodeId, _port: usize) {
        self.trace.borrow_mut().push(self.label.clone());
        blueprint.call(id, 1);
    }
}

/// Only issues calls: a single exit port driven by the test.
#[derive(Clone, Default)]
pub struct Trigger;

impl BlueprintNode for Trigger {
    fn create_ports(&self) -> Vec<Port> {
        vec![Port::exit("Out")]
    }
}

/// Reads its input into the trace when entered.
#[derive(Clone, Default)]
pub struct Reader {
    pub trace: Trace,
}

impl BlueprintNode for Reader {
    fn create_ports(&self) -> Vec<Port> {
        vec![Port::enter("In"), Port::input("Value")]
    }

    fn as_enter(&self) -> Option<&dyn BlueprintEnter> {
        Some(self)
    }
}

impl BlueprintEnter for Reader {
    fn on_enter(&self, blueprint: &RuntimeBlueprint, id: NodeId, _port: usize) {
        let value = blueprint.read(id, 1, -1i64);
        self.trace.borrow_mut().push(format!("read {}", value));
    }
}

/// Produces a counter value on the typed path only, incrementing per read.
#[derive(Clone, Default)]
pub struct Counter {
    pub value: Rc<Cell<i64>>,
}

impl BlueprintNode for Counter {
    fn create_ports(&self) -> Vec<Port> {
        vec![Port::output("Value")]
    }

    fn as_output(&self) -> Option<&dyn BlueprintOutput> {
        Some(self)
    }
}

impl BlueprintOutput for Counter {
    fn write_output(&self, _blueprint: &RuntimeBlueprint, _id: NodeId, _port: usize, out: &mut dyn Any) -> bool {
        let value = self.value.get() + 1;
        self.value.set(value);
        blink::runtime::node::put_output(out, value)
    }
}

/// Produces a value on the type-erased path only.
#[derive(Clone, Default)]
pub struct Erased {
    pub value: i32,
}

impl BlueprintNode for Erased {
    fn create_ports(&self) -> Vec<Port> {
        vec![Port::non_typed_output("Value")]
    }

    fn as_output(&self) -> Option<&dyn BlueprintOutput> {
        Some(self)
    }
}

impl BlueprintOutput for Erased {
    fn output_any(&self, _blueprint: &RuntimeBlueprint, _id: NodeId, _port: usize) -> Option<Box<dyn Any>> {
        Some(Box::new(self.value))
    }
}

/// Records every lifecycle callback.
#[derive(Clone, Default)]
pub struct Lifecycle {
    pub label: String,
    pub trace: Trace,
}

impl Lifecycle {
    pub fn new(label: &str, trace: &Trace) -> Self {
        Self {
            label: label.to_string(),
            trace: trace.clone(),
        }
    }

    fn record(&self, event: &str) {
        self.trace.borrow_mut().push(format!("{}:{}", self.label, event));
    }
}

impl BlueprintNode for Lifecycle {
    fn create_ports(&self) -> Vec<Port> {
        Vec::new()
    }

    fn on_initialize(&self, blueprint: &RuntimeBlueprint, _id: NodeId) {
        let host = blueprint.host().map(|host| host.name().to_string()).unwrap_or_default();
        self.record(&format!("init@{}", host));
    }

    fn on_deinitialize(&self, _blueprint: &RuntimeBlueprint, _id: NodeId) {
        self.record("deinit");
    }

    fn as_enable_callback(&self) -> Option<&dyn BlueprintEnableCallback> {
        Some(self)
    }

    fn as_start_callback(&self) -> Option<&dyn BlueprintStartCallback> {
        Some(self)
    }
}

impl BlueprintEnableCallback for Lifecycle {
    fn on_set_enabled(&self, _blueprint: &RuntimeBlueprint, _id: NodeId, enabled: bool) {
        self.record(&format!("enabled={}", enabled));
    }
}

impl BlueprintStartCallback for Lifecycle {
    fn on_start(&self, _blueprint: &RuntimeBlueprint, _id: NodeId) {
        self.record("start");
    }
}
