// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! End-to-end tests of the access layer against simulated servers.

use std::sync::Arc;

use ualink_core::{AccessError, ReadKey, Registry, ServerConfig, WriteKey};
use ualink_opcua::{
    AccessLayer, ConnectionState, DefaultTransportFactory, NodeClass, NodeId, SimulatedServer,
    Variant, VariantType,
};

// =============================================================================
// Helpers
// =============================================================================

struct Fixture {
    layer: AccessLayer,
    plant: SimulatedServer,
    other: SimulatedServer,
}

fn fixture(configs: Vec<ServerConfig>) -> Fixture {
    let plant = SimulatedServer::demo();
    let other = SimulatedServer::demo();
    let factory = DefaultTransportFactory::new()
        .with_simulated("plant", plant.clone())
        .with_simulated("other", other.clone());
    let layer = AccessLayer::builder()
        .registry(Registry::new(configs).unwrap())
        .factory(Arc::new(factory))
        .build();
    Fixture {
        layer,
        plant,
        other,
    }
}

fn plant1() -> Fixture {
    fixture(vec![ServerConfig::new("Plant1", "sim://plant")])
}

// =============================================================================
// Attribute access
// =============================================================================

#[tokio::test]
async fn test_root_node_class() {
    let f = plant1();

    let class = f.layer.read_str("Plant1//NodeClass");
    f.layer.dispatch().await;

    let dv = class.await.into_result().unwrap();
    assert_eq!(dv.value, Some(Variant::Int32(NodeClass::Object.value() as i32)));
}

#[tokio::test]
async fn test_write_then_read_in_one_dispatch() {
    let f = plant1();

    let write = f.layer.write_str("Plant1/ns=2;i=5/Value/42/Int32");
    let read = f.layer.read_str("Plant1/ns=2;i=5/Value");
    f.layer.dispatch().await;

    assert!(write.await.is_ok());
    let dv = read.await.into_result().unwrap();
    assert_eq!(dv.value, Some(Variant::Int32(42)));
    assert_eq!(dv.variant_type(), Some(VariantType::Int32));
}

#[tokio::test]
async fn test_same_server_reads_share_one_call() {
    let f = plant1();

    let keys = vec![
        ReadKey::new("Plant1", "ns=2;s=Plant.Line1.Speed", "Value"),
        ReadKey::new("Plant1", "ns=2;s=Plant.Line1.Running", "Value"),
        ReadKey::new("Plant1", "ns=2;s=Plant.Line1.Label", "Value"),
        ReadKey::new("Plant1", "ns=2;s=Plant.Line1.Speed", "DisplayName"),
    ];
    let results = f.layer.read_all(keys).await;

    let values: Vec<_> = results
        .iter()
        .map(|r| r.value().and_then(|dv| dv.value.clone()))
        .collect();
    assert_eq!(
        values,
        vec![
            Some(Variant::Double(12.5)),
            Some(Variant::Boolean(true)),
            Some(Variant::String("Line one".into())),
            Some(Variant::text("Speed")),
        ]
    );

    let stats = f.plant.stats();
    assert_eq!(stats.read_calls, 1);
    assert_eq!(stats.read_items, 4);

    let latency = results[0].latency();
    assert!(latency.is_some());
    assert!(results.iter().all(|r| r.latency() == latency));
}

#[tokio::test]
async fn test_one_call_per_server() {
    let f = fixture(vec![
        ServerConfig::new("Plant1", "sim://plant"),
        ServerConfig::new("Plant2", "sim://other"),
    ]);

    let mut pending = Vec::new();
    for i in 0..3 {
        let server = if i % 2 == 0 { "Plant1" } else { "Plant2" };
        pending.push(f.layer.read(ReadKey::new(server, "ns=2;i=5", "Value")));
        pending.push(f.layer.read(ReadKey::new(server, "", "BrowseName")));
    }
    let summary = f.layer.dispatch().await;

    assert_eq!(summary.read_calls, 2);
    assert_eq!(summary.requests, 6);
    for p in pending {
        assert!(p.await.is_ok());
    }
    assert_eq!(f.plant.stats().read_calls, 1);
    assert_eq!(f.other.stats().read_calls, 1);
}

#[tokio::test]
async fn test_unreachable_server_fails_only_its_group() {
    let f = fixture(vec![
        ServerConfig::new("Plant1", "sim://plant"),
        ServerConfig::new("Plant2", "sim://other"),
    ]);
    f.other.set_online(false);

    let good = f.layer.read_str("Plant1/ns=2;i=5/Value");
    let bad_a = f.layer.read_str("Plant2/ns=2;i=5/Value");
    let bad_b = f.layer.read_str("Plant2//NodeClass");
    f.layer.dispatch().await;

    assert!(good.await.is_ok());
    for bad in [bad_a.await, bad_b.await] {
        assert!(matches!(
            bad.error(),
            Some(AccessError::ConnectionFailure { server, .. }) if server == "Plant2"
        ));
    }
}

#[tokio::test]
async fn test_item_failures_are_isolated() {
    let f = plant1();

    let missing = f.layer.read_str("Plant1/ns=2;i=404/Value");
    let readonly = f.layer.write_str("Plant1/i=2259/Value/1/Int32");
    let literal = f.layer.write_str("Plant1/ns=2;i=5/Value/many/Int32");
    let untyped = f.layer.write_str("Plant1/ns=2;s=Plant/Value/[1,2]/");
    let fine = f.layer.read_str("Plant1/ns=2;i=5/Value");
    f.layer.dispatch().await;

    assert!(matches!(
        missing.await.error(),
        Some(AccessError::RemoteOperationFailure { .. })
    ));
    assert!(matches!(
        readonly.await.error(),
        Some(AccessError::RemoteOperationFailure { .. })
    ));
    assert!(matches!(
        literal.await.error(),
        Some(AccessError::UnsupportedLiteral { .. })
    ));
    // text literal to an Object's Value attribute is rejected by the server
    assert!(untyped.await.error().is_some());
    assert!(fine.await.is_ok());
}

#[tokio::test]
async fn test_unknown_server_and_malformed_key() {
    let f = plant1();

    let unknown = f.layer.read_str("Nowhere/i=84/NodeClass");
    let malformed = f.layer.read_str("Plant1");
    let summary = f.layer.dispatch().await;

    assert!(matches!(
        unknown.await.error(),
        Some(AccessError::UnknownServer { .. })
    ));
    assert!(matches!(
        malformed.await.error(),
        Some(AccessError::InvalidKey { .. })
    ));
    assert_eq!(summary.requests, 1);
    assert_eq!(f.plant.stats().connects, 0);
}

// =============================================================================
// Type inference
// =============================================================================

#[tokio::test]
async fn test_untyped_numeric_write_costs_one_lookup() {
    let f = plant1();

    let results = f
        .layer
        .write_all(vec![WriteKey::new("Plant1", "ns=2;i=5", "Value", "42", None)])
        .await;
    assert!(results[0].is_ok());

    let stats = f.plant.stats();
    assert_eq!(stats.read_calls, 1);
    assert_eq!(stats.write_calls, 1);
    assert_eq!(f.plant.value(&NodeId::numeric(2, 5)), Some(Variant::Int32(42)));
}

#[tokio::test]
async fn test_explicit_tag_skips_lookup() {
    let f = plant1();

    let results = f
        .layer
        .write_all(vec![WriteKey::new(
            "Plant1",
            "ns=2;i=5",
            "Value",
            "42",
            Some("Int32".into()),
        )])
        .await;
    assert!(results[0].is_ok());

    let stats = f.plant.stats();
    assert_eq!(stats.read_calls, 0);
    assert_eq!(stats.write_calls, 1);
}

#[tokio::test]
async fn test_description_written_as_localized_text() {
    let f = plant1();

    let write = f.layer.write_str("Plant1/ns=2;i=5/Description/Target speed/");
    let read = f.layer.read_str("Plant1/ns=2;i=5/Description");
    f.layer.dispatch().await;

    assert!(write.await.is_ok());
    let dv = read.await.into_result().unwrap();
    assert_eq!(dv.value, Some(Variant::text("Target speed")));
}

// =============================================================================
// Connection supervision
// =============================================================================

#[tokio::test]
async fn test_dead_session_repaired_transparently() {
    let f = plant1();

    let first = f.layer.read_str("Plant1/ns=2;i=5/Value");
    f.layer.dispatch().await;
    assert!(first.await.is_ok());

    f.plant.drop_sessions();

    let second = f.layer.read_str("Plant1/ns=2;i=5/Value");
    f.layer.dispatch().await;
    assert!(second.await.is_ok());

    assert_eq!(f.plant.stats().connects, 2);
    let status = &f.layer.servers()[0];
    assert_eq!(status.state, ConnectionState::Connected);
    assert_eq!(status.stats.probe_failures, 1);
}

#[tokio::test]
async fn test_recovers_after_outage() {
    let f = plant1();
    f.plant.set_online(false);

    let during = f.layer.read_str("Plant1//NodeClass");
    f.layer.dispatch().await;
    assert!(during.await.error().is_some());

    f.plant.set_online(true);
    let after = f.layer.read_str("Plant1//NodeClass");
    f.layer.dispatch().await;
    assert!(after.await.is_ok());
}

#[tokio::test]
async fn test_namespace_qualification() {
    let f = fixture(vec![ServerConfig::new("Demo", "sim://plant")
        .with_namespace("urn:ualink:demo", "s=Plant")]);

    let relative = f.layer.read_str("Demo/s=Plant.Line1.Speed/Value");
    let restacked = f.layer.read_str("Demo/ns=7;s=Plant.Line1.Speed/Value");
    let root = f.layer.read_str("Demo//DisplayName");
    f.layer.dispatch().await;

    assert_eq!(
        relative.await.into_result().unwrap().value,
        Some(Variant::Double(12.5))
    );
    assert_eq!(
        restacked.await.into_result().unwrap().value,
        Some(Variant::Double(12.5))
    );
    assert_eq!(
        root.await.into_result().unwrap().value,
        Some(Variant::text("Plant"))
    );
}

#[tokio::test]
async fn test_missing_namespace_fails_group() {
    let f = fixture(vec![ServerConfig::new("Demo", "sim://plant")
        .with_namespace("urn:not-there", "s=Plant")]);

    let read = f.layer.read_str("Demo//NodeClass");
    f.layer.dispatch().await;

    assert!(matches!(
        read.await.error(),
        Some(AccessError::NamespaceNotFound { .. })
    ));
    assert_eq!(f.layer.servers()[0].state, ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_reload_adds_server() {
    let f = plant1();
    assert!(f.layer.connect_all().await.iter().all(|(_, r)| r.is_ok()));

    let next = Registry::new(vec![
        ServerConfig::new("Plant1", "sim://plant"),
        ServerConfig::new("Plant2", "sim://other"),
    ])
    .unwrap();
    let summary = f.layer.reload(&next).await;
    assert_eq!(summary.kept, vec!["Plant1".to_string()]);
    assert_eq!(summary.added, vec!["Plant2".to_string()]);

    let read = f.layer.read_str("Plant2//NodeClass");
    f.layer.dispatch().await;
    assert!(read.await.is_ok());
    assert_eq!(f.plant.stats().connects, 1);

    f.layer.shutdown().await;
    assert!(f
        .layer
        .servers()
        .iter()
        .all(|s| s.state == ConnectionState::Disconnected));
}

// =============================================================================
// Subtree scanning
// =============================================================================

#[tokio::test]
async fn test_depth_bounds() {
    let f = plant1();

    let none = f
        .layer
        .find_by_kind("Plant1", "ns=2;s=Plant", NodeClass::Variable, Some(0))
        .await
        .unwrap();
    assert!(none.is_empty());

    let shallow = f
        .layer
        .find_by_kind("Plant1", "ns=2;s=Plant", NodeClass::Variable, Some(1))
        .await
        .unwrap();
    assert!(shallow.is_empty());

    let deep = f
        .layer
        .find_by_kind("Plant1", "ns=2;s=Plant", NodeClass::Variable, Some(2))
        .await
        .unwrap();
    let names: Vec<_> = deep.iter().map(|n| n.browse_name.as_str()).collect();
    assert_eq!(names, vec!["Speed", "Running", "Label", "Counter"]);
    assert!(deep.iter().all(|n| n.depth == 2));
}

#[tokio::test]
async fn test_scan_costs_one_browse_per_level() {
    let f = plant1();

    let objects = f
        .layer
        .find_by_kind("Plant1", "ns=2;s=Plant", NodeClass::Object, None)
        .await
        .unwrap();
    let names: Vec<_> = objects.iter().map(|n| n.display_name.as_str()).collect();
    assert_eq!(names, vec!["Line1", "Line2"]);

    // levels 1 and 2 have nodes, level 3 browse finds none
    let stats = f.plant.stats();
    assert_eq!(stats.browse_calls, 3);
    assert_eq!(stats.read_calls, 2);
}

#[tokio::test]
async fn test_children_of_root() {
    let f = plant1();

    let children = f.layer.children("Plant1", "").await.unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].browse_name, "Objects");
    assert_eq!(children[0].node_class, Some(NodeClass::Object));
}

#[tokio::test]
async fn test_describe_variables() {
    let f = fixture(vec![ServerConfig::new("Demo", "sim://plant")
        .with_namespace("urn:ualink:demo", "s=Plant.Line1")]);
    f.plant
        .set_description(&NodeId::string(2, "Plant.Line1.Speed"), "Belt speed");

    let described = f
        .layer
        .describe_variables("Demo", "", Some(1))
        .await
        .unwrap();
    let described: Vec<_> = described.into_iter().map(Result::unwrap).collect();

    assert_eq!(described.len(), 3);
    let speed = &described[0];
    assert_eq!(speed.node_id, "ns=2;s=Plant.Line1.Speed");
    assert_eq!(speed.path, "Speed");
    assert_eq!(speed.value, Some(Variant::Double(12.5)));
    assert_eq!(speed.type_tag, Some(VariantType::Double));
    assert_eq!(speed.description.as_deref(), Some("Belt speed"));
    assert_eq!(described[1].type_tag, Some(VariantType::Boolean));
    assert_eq!(described[2].description, None);
}

#[tokio::test]
async fn test_describe_keeps_foreign_namespace() {
    let f = fixture(vec![ServerConfig::new("Demo", "sim://plant")
        .with_namespace("urn:ualink:demo", "s=Plant.Line1")]);
    f.plant.add_variable(
        &NodeId::string(2, "Plant.Line1"),
        NodeId::numeric(1, 77),
        "Vendor",
        Variant::Int32(7),
    );

    let described = f
        .layer
        .describe_variables("Demo", "", Some(1))
        .await
        .unwrap();

    assert_eq!(described.len(), 4);
    let vendor = described[3].as_ref().unwrap();
    assert_eq!(vendor.node_id, "ns=1;i=77");
    assert_eq!(vendor.value, Some(Variant::Int32(7)));
    assert!(described.iter().all(Result::is_ok));
}
