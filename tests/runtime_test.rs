mod common;

use std::cell::Cell;
use std::rc::Rc;

use blink::compiler::{CompileOptions, Compiler};
use blink::meta::builder::BlueprintAssetBuilder;
use blink::meta::BlueprintAsset;
use blink::nodes::common::{ConstantNode, LogNode, StartNode};
use blink::runtime::blueprint::{BlueprintState, RuntimeBlueprint};
use blink::runtime::factory::{BlueprintFactory, SharedFactory};
use common::{Counter, Erased, Lifecycle, Reader, Recorder, entries, host, runtime_id, trace};
use serde_json::{Value, json};

fn compile(asset: &BlueprintAsset, factory: &SharedFactory) -> RuntimeBlueprint {
    Compiler::with_options(CompileOptions {
        validate: true,
        ..CompileOptions::default()
    })
    .compile(asset, factory)
    .expect("Compilation failed")
}

#[test]
fn test_lifecycle_order() {
    let log = trace();
    let asset = BlueprintAssetBuilder::new("lifecycle")
        .node("a", Lifecycle::new("a", &log))
        .node("b", Lifecycle::new("b", &log))
        .build()
        .expect("Failed to build asset");
    let blueprint = compile(&asset, &BlueprintFactory::shared());
    assert_eq!(blueprint.state(), BlueprintState::Compiled);

    blueprint.initialize(host());
    assert_eq!(blueprint.state(), BlueprintState::Initialized);
    assert_eq!(blueprint.host().map(|host| host.name().to_string()).as_deref(), Some("test-host"));

    blueprint.set_enabled(true);
    assert!(blueprint.is_enabled());
    blueprint.start();
    assert_eq!(blueprint.state(), BlueprintState::Started);
    blueprint.deinitialize();
    assert_eq!(blueprint.state(), BlueprintState::DeInitialized);
    assert!(!blueprint.is_enabled());
    assert!(blueprint.host().is_none());

    assert_eq!(
        entries(&log),
        vec![
            "a:init@test-host",
            "b:init@test-host",
            "a:enabled=true",
            "b:enabled=true",
            "a:start",
            "b:start",
            "b:deinit",
            "a:deinit",
        ]
    );
}

#[test]
fn test_illegal_transitions_are_ignored() {
    let log = trace();
    let asset = BlueprintAssetBuilder::new("lifecycle")
        .node("a", Lifecycle::new("a", &log))
        .build()
        .expect("Failed to build asset");
    let blueprint = compile(&asset, &BlueprintFactory::shared());

    blueprint.start();
    blueprint.set_enabled(true);
    blueprint.deinitialize();
    assert_eq!(blueprint.state(), BlueprintState::Compiled);
    assert!(entries(&log).is_empty());

    blueprint.initialize(host());
    blueprint.initialize(host());
    blueprint.start();
    blueprint.start();
    assert_eq!(entries(&log), vec!["a:init@test-host", "a:start"]);

    // A deinitialized blueprint can be initialized again.
    blueprint.deinitialize();
    blueprint.initialize(host());
    assert_eq!(blueprint.state(), BlueprintState::Initialized);
}

#[test]
fn test_start_callback_drives_flow() {
    let log = trace();
    let asset = BlueprintAssetBuilder::new("start")
        .node("start", StartNode)
        .node("log", LogNode { message: "hello".to_string() })
        .node("r", Recorder::new("r", &log))
        .connect("start", "Start", "log", "In")
        .connect("log", "Out", "r", "B")
        .build()
        .expect("Failed to build asset");
    let blueprint = compile(&asset, &BlueprintFactory::shared());

    blueprint.initialize(host());
    blueprint.start();
    assert_eq!(entries(&log), vec!["r.1"]);
}

#[test]
fn test_read_typed_and_erased() {
    let log = trace();
    let counter = Rc::new(Cell::new(0));
    let asset = BlueprintAssetBuilder::new("reads")
        .node("typed", Reader { trace: log.clone() })
        .node("erased", Reader { trace: log.clone() })
        .node("constant", Reader { trace: log.clone() })
        .node("text", Reader { trace: log.clone() })
        .node("open", Reader { trace: log.clone() })
        .node("counter", Counter { value: counter.clone() })
        .node("seven", Erased { value: 7 })
        .node("half", ConstantNode { value: json!(2.5) })
        .node("hi", ConstantNode { value: json!("hi") })
        .connect("typed", "Value", "counter", "Value")
        .connect("erased", "Value", "seven", "Value")
        .connect("constant", "Value", "half", "Value")
        .connect("text", "Value", "hi", "Value")
        .build()
        .expect("Failed to build asset");
    let blueprint = compile(&asset, &BlueprintFactory::shared());
    let id = |key: &str| runtime_id(&blueprint, &asset, key);

    // Typed path, evaluated on every read.
    assert_eq!(blueprint.read(id("typed"), 1, 0i64), 1);
    assert_eq!(blueprint.read(id("typed"), 1, 0i64), 2);
    assert_eq!(counter.get(), 2);
    assert_eq!(blueprint.read(id("typed"), 1, "none".to_string()), "none");

    // Type-erased fallback.
    assert_eq!(blueprint.read(id("erased"), 1, 0i32), 7);
    assert_eq!(blueprint.read(id("erased"), 1, 5i64), 5);
    let any = blueprint.read_any(id("erased"), 1).expect("erased value");
    assert_eq!(any.downcast_ref::<i32>(), Some(&7));

    // JSON constants convert to the requested type when they can.
    assert_eq!(blueprint.read(id("constant"), 1, 0.0f64), 2.5);
    assert_eq!(blueprint.read(id("constant"), 1, -1i64), -1);
    assert_eq!(blueprint.read(id("constant"), 1, Value::Null), json!(2.5));
    assert_eq!(blueprint.read(id("text"), 1, String::new()), "hi");
    assert!(!blueprint.read(id("text"), 1, false));

    // Unconnected inputs yield the default.
    assert_eq!(blueprint.read(id("open"), 1, 11u8), 11);
    assert!(blueprint.read_any(id("open"), 1).is_none());
}

#[test]
fn test_destroy_releases_nodes_of_shared_factory() {
    let log = trace();
    let factory = BlueprintFactory::shared();

    let first_asset = BlueprintAssetBuilder::new("first")
        .node("reader", Reader { trace: log.clone() })
        .node("counter", Counter::default())
        .connect("reader", "Value", "counter", "Value")
        .build()
        .expect("Failed to build asset");
    let second_asset = BlueprintAssetBuilder::new("second")
        .node("reader", Reader { trace: log.clone() })
        .node("seven", Erased { value: 7 })
        .connect("reader", "Value", "seven", "Value")
        .build()
        .expect("Failed to build asset");

    let first = compile(&first_asset, &factory);
    let second = compile(&second_asset, &factory);
    assert_eq!(factory.borrow().source_count(), 3);
    assert_eq!(factory.borrow().node_count(), 4);

    first.destroy();
    assert_eq!(factory.borrow().source_count(), 2);
    assert_eq!(factory.borrow().node_count(), 2);

    let reader = runtime_id(&second, &second_asset, "reader");
    second.initialize(host());
    second.call(reader, 0);
    assert_eq!(entries(&log), vec!["read -1"]);
    assert_eq!(second.read(reader, 1, 0i32), 7);

    drop(second);
    assert_eq!(factory.borrow().source_count(), 0);
    assert_eq!(factory.borrow().node_count(), 0);
}

#[test]
fn test_destroy_deinitializes_running_blueprint() {
    let log = trace();
    let asset = BlueprintAssetBuilder::new("running")
        .node("a", Lifecycle::new("a", &log))
        .build()
        .expect("Failed to build asset");
    let factory = BlueprintFactory::shared();
    let blueprint = compile(&asset, &factory);

    blueprint.initialize(host());
    blueprint.start();
    blueprint.destroy();

    assert_eq!(entries(&log), vec!["a:init@test-host", "a:start", "a:deinit"]);
    assert_eq!(factory.borrow().node_count(), 0);
}
