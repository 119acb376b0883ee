mod common;

use std::rc::Rc;

use blink::compiler::{CompileOptions, Compiler};
use blink::compiler::hash_links::HashLinkTree;
use blink::meta::builder::BlueprintAssetBuilder;
use blink::meta::PortMode;
use blink::nodes::event::{EmitEventNode, EventListenerNode};
use blink::nodes::linker::ExternalPortNode;
use blink::nodes::subgraph::SubgraphNode;
use blink::runtime::factory::BlueprintFactory;
use blink::runtime::link::RuntimeLink;
use blink::runtime::link_storage::LinkStorage;
use blink::runtime::node::HashLinkDirection;
use blink::signature;
use common::{Recorder, Trigger, entries, host, runtime_id, trace};

fn compiler() -> Compiler {
    Compiler::with_options(CompileOptions {
        validate: true,
        ..CompileOptions::default()
    })
}

#[test]
fn test_tree_connects_cross_product() {
    let mut tree = HashLinkTree::new();
    let ping = signature::hash_link("ping");
    let pong = signature::hash_link("pong");

    for node in 0..2 {
        tree.add(ping, HashLinkDirection::From, RuntimeLink::new(0, node, 0));
    }
    for node in 0..3 {
        tree.add(ping, HashLinkDirection::To, RuntimeLink::new(1, node, 0));
    }
    tree.add(pong, HashLinkDirection::From, RuntimeLink::new(2, 0, 0));

    assert_eq!(tree.len(), 2);
    assert_eq!(tree.unmatched().collect::<Vec<_>>(), vec![pong]);

    let mut links = LinkStorage::new();
    assert_eq!(tree.resolve(&mut links), 6);
    for node in 0..2 {
        let targets: Vec<RuntimeLink> = links.links(RuntimeLink::new(0, node, 0)).collect();
        assert_eq!(targets, (0..3).map(|n| RuntimeLink::new(1, n, 0)).collect::<Vec<_>>());
    }
    assert!(!links.contains_port(RuntimeLink::new(2, 0, 0)));
}

#[test]
fn test_events_reach_every_listener() {
    let log = trace();
    let asset = BlueprintAssetBuilder::new("events")
        .node("t1", Trigger)
        .node("t2", Trigger)
        .node("emit1", EmitEventNode::new("ping"))
        .node("emit2", EmitEventNode::new("ping"))
        .node("l1", EventListenerNode::new("ping"))
        .node("l2", EventListenerNode::new("ping"))
        .node("l3", EventListenerNode::new("ping"))
        .node("other", EventListenerNode::new("pong"))
        .node("r1", Recorder::new("r1", &log))
        .node("r2", Recorder::new("r2", &log))
        .node("r3", Recorder::new("r3", &log))
        .node("rx", Recorder::new("rx", &log))
        .connect("t1", "Out", "emit1", "Emit")
        .connect("t2", "Out", "emit2", "Emit")
        .connect("l1", "On Event", "r1", "A")
        .connect("l2", "On Event", "r2", "A")
        .connect("l3", "On Event", "r3", "B")
        .connect("other", "On Event", "rx", "A")
        .build()
        .expect("Failed to build asset");

    let blueprint = compiler()
        .compile(&asset, &BlueprintFactory::shared())
        .expect("Compilation failed");

    for key in ["emit1", "emit2"] {
        let emitter = runtime_id(&blueprint, &asset, key);
        assert_eq!(blueprint.links(emitter, 1).count(), 3);
    }

    blueprint.initialize(host());
    blueprint.call(runtime_id(&blueprint, &asset, "t1"), 0);
    blueprint.call(runtime_id(&blueprint, &asset, "t2"), 0);
    assert_eq!(entries(&log), vec!["r1.0", "r2.0", "r3.1", "r1.0", "r2.0", "r3.1"]);
}

#[test]
fn test_events_cross_subgraph_instances() {
    let log = trace();
    let inner = BlueprintAssetBuilder::new("shout")
        .node("run", ExternalPortNode::new("Run", PortMode::Enter))
        .node("emit", EmitEventNode::new("alarm"))
        .connect("run", "Out", "emit", "Emit")
        .build()
        .expect("Failed to build inner asset");
    let inner = Rc::new(inner);

    let root = BlueprintAssetBuilder::new("root")
        .node("t", Trigger)
        .node("left", SubgraphNode::new(inner.clone()))
        .node("right", SubgraphNode::new(inner))
        .node("listen", EventListenerNode::new("alarm"))
        .node("r", Recorder::new("heard", &log))
        .connect("t", "Out", "left", "Run")
        .connect("listen", "On Event", "r", "A")
        .build()
        .expect("Failed to build root asset");

    let blueprint = compiler()
        .compile(&root, &BlueprintFactory::shared())
        .expect("Compilation failed");

    blueprint.initialize(host());
    blueprint.call(runtime_id(&blueprint, &root, "t"), 0);
    assert_eq!(entries(&log), vec!["heard.0"]);
}

#[test]
fn test_listener_without_emitter_stays_idle() {
    let log = trace();
    let asset = BlueprintAssetBuilder::new("idle")
        .node("listen", EventListenerNode::new("nobody"))
        .node("r", Recorder::new("r", &log))
        .connect("listen", "On Event", "r", "A")
        .build()
        .expect("Failed to build asset");

    let blueprint = compiler()
        .compile(&asset, &BlueprintFactory::shared())
        .expect("Compilation failed");
    let listen = runtime_id(&blueprint, &asset, "listen");

    blueprint.initialize(host());
    blueprint.start();
    let table = blueprint.link_storage().to_table();
    assert!(table.iter().all(|entry| entry.links.iter().all(|link| link.node_id() != listen)));
    assert!(entries(&log).is_empty());
}
