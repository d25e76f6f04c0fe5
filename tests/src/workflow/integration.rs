use std::net::{IpAddr, Ipv4Addr};

use pnet::packet::Packet;
use pnet::packet::arp::ArpPacket;
use pnet::packet::ethernet::{EtherTypes, EthernetPacket};
use pnet::packet::icmp::{IcmpPacket, IcmpTypes};
use pnet::packet::icmpv6::{Icmpv6Packet, Icmpv6Types};
use probeflow_common::config::{ChecksumMode, EngineConfig};
use probeflow_core::error::WorkflowError;
use probeflow_core::event::{NodeStatus, WorkflowEvent, WorkflowEventKind};
use probeflow_core::injector::ProtocolFamily;
use probeflow_core::step::{StepOutput, WorkflowContext};
use serde_json::json;

use crate::support::{FakeTransmitters, INTERFACE, engine, graph, mac, node, run};

fn context() -> WorkflowContext {
    WorkflowContext::with_interface(INTERFACE)
}

fn infos<'a>(events: &'a [WorkflowEvent], id: &str) -> Vec<&'a str> {
    events
        .iter()
        .filter_map(|e| match &e.kind {
            WorkflowEventKind::NodeInfo { node_id, message } if node_id == id => Some(message.as_str()),
            _ => None,
        })
        .collect()
}

fn errors<'a>(events: &'a [WorkflowEvent], id: &str) -> Vec<&'a str> {
    events
        .iter()
        .filter_map(|e| match &e.kind {
            WorkflowEventKind::NodeError { node_id, error_message } if node_id == id => {
                Some(error_message.as_str())
            }
            _ => None,
        })
        .collect()
}

fn statuses(events: &[WorkflowEvent], id: &str) -> Vec<NodeStatus> {
    events
        .iter()
        .filter_map(|e| match &e.kind {
            WorkflowEventKind::NodeStatus { node_id, status } if node_id == id => Some(*status),
            _ => None,
        })
        .collect()
}

fn arp_pipeline(start: &str, end: &str) -> probeflow_core::graph::Graph {
    graph(
        vec![
            node("range", "ip-range", json!({ "startIp": start, "endIp": end })),
            node("arp", "arp-scan", json!({ "delay": 0 })),
            node("out", "net-output", json!({})),
        ],
        &[("range", "arp"), ("arp", "out")],
    )
}

#[tokio::test]
async fn arp_range_is_broadcast_on_the_interface() {
    let tx = FakeTransmitters::new();
    let engine = engine(&tx, EngineConfig::default());

    let (result, events) = run(&engine, &arp_pipeline("192.168.1.1", "192.168.1.3"), &context()).await;
    let summary = result.unwrap();

    for id in ["range", "arp", "out"] {
        assert_eq!(summary.status_by_node_id[id], NodeStatus::Completed, "{id}");
    }
    assert_eq!(infos(&events, "out"), vec!["ARP: Sent 3/3 packets"]);
    assert_eq!(tx.initialized(), vec![(ProtocolFamily::Arp, INTERFACE.to_string())]);
    assert_eq!(tx.closed(), vec![ProtocolFamily::Arp]);

    let sent = tx.sent();
    assert_eq!(sent.len(), 3);
    for (i, packet) in sent.iter().enumerate() {
        let eth = EthernetPacket::new(&packet.bytes).unwrap();
        assert_eq!(eth.get_ethertype(), EtherTypes::Arp);
        assert_eq!(eth.get_source(), mac());

        let arp = ArpPacket::new(eth.payload()).unwrap();
        assert_eq!(arp.get_sender_proto_addr(), Ipv4Addr::new(192, 168, 1, 10));
        assert_eq!(arp.get_target_proto_addr(), Ipv4Addr::new(192, 168, 1, 1 + i as u8));
    }
}

#[tokio::test]
async fn events_follow_the_node_lifecycle() {
    let tx = FakeTransmitters::new();
    let engine = engine(&tx, EngineConfig::default());

    let (result, events) = run(&engine, &arp_pipeline("192.168.1.1", "192.168.1.2"), &context()).await;
    let summary = result.unwrap();

    assert_eq!(events.first().map(|e| &e.kind), Some(&WorkflowEventKind::WorkflowStart));
    let Some(WorkflowEventKind::WorkflowComplete { result }) = events.last().map(|e| &e.kind) else {
        panic!("run must end with workflow-complete");
    };
    assert_eq!(result, &summary);

    // all nodes are announced as pending before anything runs
    let pending: Vec<_> = events[1..4].iter().filter_map(|e| e.node_id()).collect();
    assert_eq!(pending, vec!["range", "arp", "out"]);

    for id in ["range", "arp", "out"] {
        assert_eq!(
            statuses(&events, id),
            vec![NodeStatus::Pending, NodeStatus::Running, NodeStatus::Completed]
        );
    }
}

#[tokio::test]
async fn icmp_echo_requests_reach_the_transport_sender() {
    let tx = FakeTransmitters::new();
    let engine = engine(&tx, EngineConfig::default());
    let graph = graph(
        vec![
            node("a", "ip-single", json!({ "ipAddress": "192.168.1.20" })),
            node("b", "ip-single", json!({ "ipAddress": "192.168.1.21" })),
            node("ping", "icmp-ping", json!({ "identifier": 0x1234, "sequenceStart": 7 })),
            node("out", "net-output", json!({})),
        ],
        &[("a", "ping"), ("b", "ping"), ("ping", "out")],
    );

    let (result, events) = run(&engine, &graph, &context()).await;
    assert!(!result.unwrap().has_failures());
    assert_eq!(infos(&events, "out"), vec!["ICMP: Sent 2/2 pings"]);

    let sent = tx.sent();
    let targets: Vec<_> = sent.iter().map(|p| p.target).collect();
    assert_eq!(
        targets,
        vec![Some("192.168.1.20".parse().unwrap()), Some("192.168.1.21".parse().unwrap())]
    );

    let first = IcmpPacket::new(&sent[0].bytes).unwrap();
    assert_eq!(first.get_icmp_type(), IcmpTypes::EchoRequest);
    assert_eq!(&sent[0].bytes[4..8], &[0x12, 0x34, 0x00, 0x07]);
    assert_eq!(&sent[1].bytes[6..8], &[0x00, 0x08]);
}

#[tokio::test]
async fn ipv6_discovery_fans_into_one_sink() {
    let tx = FakeTransmitters::new();
    let engine = engine(&tx, EngineConfig::default());
    let graph = graph(
        vec![
            node("host", "ipv6-single", json!({ "ipv6Address": "2001:db8::1" })),
            node("ping6", "icmpv6-ping", json!({})),
            node("ns", "ipv6-ns", json!({})),
            node("rs", "ipv6-rs", json!({})),
            node("out", "net-output", json!({})),
        ],
        &[("host", "ping6"), ("host", "ns"), ("ping6", "out"), ("ns", "out"), ("rs", "out")],
    );

    let (result, events) = run(&engine, &graph, &context()).await;
    let summary = result.unwrap();
    assert!(!summary.has_failures());

    let mut families: Vec<_> = tx.sent().iter().map(|p| p.family).collect();
    families.sort();
    assert_eq!(families, vec![ProtocolFamily::Icmpv6, ProtocolFamily::Ns, ProtocolFamily::Rs]);

    let mut lines = infos(&events, "out");
    lines.sort();
    assert_eq!(
        lines,
        vec!["ICMPv6: Sent 1/1 pings", "IPv6 NS: Sent 1/1 packets", "IPv6 RS: Sent 1/1 packets"]
    );

    let Some(StepOutput::Sent(reports)) = summary.output_by_node_id.get("out") else {
        panic!("sink should report what it sent");
    };
    assert_eq!(reports.len(), 3);
    assert!(reports.iter().all(|r| r.sent == 1 && r.failed == 0));
}

#[tokio::test]
async fn transmitter_mode_leaves_icmpv6_checksums_to_the_kernel() {
    let tx = FakeTransmitters::new();
    let engine = engine(&tx, EngineConfig::default());
    let graph = graph(
        vec![
            node("host", "ipv6-single", json!({ "ipv6Address": "2001:db8::1" })),
            node("ping6", "icmpv6-ping", json!({})),
            node("out", "net-output", json!({})),
        ],
        &[("host", "ping6"), ("ping6", "out")],
    );

    let (result, _) = run(&engine, &graph, &context()).await;
    assert!(!result.unwrap().has_failures());

    let sent = tx.sent();
    let packet = Icmpv6Packet::new(&sent[0].bytes).unwrap();
    assert_eq!(packet.get_icmpv6_type(), Icmpv6Types::EchoRequest);
    assert_eq!(packet.get_checksum(), 0);
}

#[tokio::test]
async fn builder_mode_fills_icmpv6_checksums() {
    let tx = FakeTransmitters::new();
    let config = EngineConfig {
        checksum_mode: ChecksumMode::Builder,
        ..EngineConfig::default()
    };
    let engine = engine(&tx, config);
    let graph = graph(
        vec![
            node("host", "ipv6-single", json!({ "ipv6Address": "2001:db8::1" })),
            node("ping6", "icmpv6-ping", json!({})),
            node("out", "net-output", json!({})),
        ],
        &[("host", "ping6"), ("ping6", "out")],
    );

    let (result, _) = run(&engine, &graph, &context()).await;
    assert!(!result.unwrap().has_failures());

    let sent = tx.sent();
    let packet = Icmpv6Packet::new(&sent[0].bytes).unwrap();
    assert_ne!(packet.get_checksum(), 0);
}

#[tokio::test]
async fn injector_init_failure_fails_only_the_sink() {
    let tx = FakeTransmitters::new().failing_init(ProtocolFamily::Arp);
    let engine = engine(&tx, EngineConfig::default());

    let (result, events) = run(&engine, &arp_pipeline("192.168.1.1", "192.168.1.3"), &context()).await;
    let summary = result.unwrap();

    assert_eq!(summary.status_by_node_id["range"], NodeStatus::Completed);
    assert_eq!(summary.status_by_node_id["arp"], NodeStatus::Completed);
    assert_eq!(summary.status_by_node_id["out"], NodeStatus::Failed);

    let expected = "Failed to initialize ArpInjector on interface \"eth0\"";
    assert_eq!(summary.error_by_node_id["out"], expected);
    let reported = errors(&events, "out");
    assert!(!reported.is_empty());
    assert!(reported.iter().all(|m| *m == expected));
    assert!(tx.sent().is_empty());
}

#[tokio::test]
async fn refused_packets_are_counted_and_warned() {
    let refused: IpAddr = "192.168.1.2".parse().unwrap();
    let tx = FakeTransmitters::new().refusing(refused);
    let engine = engine(&tx, EngineConfig::default());

    let (result, events) = run(&engine, &arp_pipeline("192.168.1.1", "192.168.1.3"), &context()).await;
    assert_eq!(result.unwrap().status_by_node_id["out"], NodeStatus::Completed);

    assert_eq!(infos(&events, "out"), vec!["ARP: Sent 2/3 packets, 1 failed"]);
    let warnings: Vec<_> = events
        .iter()
        .filter_map(|e| match &e.kind {
            WorkflowEventKind::NodeWarning { message, .. } => Some(message.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(warnings, vec!["Failed to send ARP packet: host unreachable"]);
}

#[tokio::test]
async fn failed_step_skips_its_descendants_only() {
    let tx = FakeTransmitters::new();
    let engine = engine(&tx, EngineConfig::default());
    let graph = graph(
        vec![
            node("range", "ip-range", json!({ "startIp": "not-an-ip", "endIp": "192.168.1.3" })),
            node("arp", "arp-scan", json!({})),
            node("out", "net-output", json!({})),
            node("rs", "ipv6-rs", json!({})),
            node("out6", "net-output", json!({})),
        ],
        &[("range", "arp"), ("arp", "out"), ("rs", "out6")],
    );

    let (result, events) = run(&engine, &graph, &context()).await;
    let summary = result.unwrap();

    assert_eq!(summary.status_by_node_id["range"], NodeStatus::Failed);
    assert_eq!(summary.status_by_node_id["arp"], NodeStatus::Skipped);
    assert_eq!(summary.status_by_node_id["out"], NodeStatus::Skipped);
    assert_eq!(summary.status_by_node_id["rs"], NodeStatus::Completed);
    assert_eq!(summary.status_by_node_id["out6"], NodeStatus::Completed);

    assert_eq!(statuses(&events, "arp"), vec![NodeStatus::Pending, NodeStatus::Skipped]);
    assert!(!summary.output_by_node_id.contains_key("arp"));
    let terminal = summary.count(NodeStatus::Completed)
        + summary.count(NodeStatus::Failed)
        + summary.count(NodeStatus::Skipped);
    assert_eq!(terminal, graph.nodes.len());
}

#[tokio::test]
async fn missing_interface_fails_the_builders() {
    let tx = FakeTransmitters::new();
    let engine = engine(&tx, EngineConfig::default());

    let (result, events) =
        run(&engine, &arp_pipeline("192.168.1.1", "192.168.1.3"), &WorkflowContext::with_interface("  ")).await;
    let summary = result.unwrap();

    assert_eq!(summary.status_by_node_id["arp"], NodeStatus::Failed);
    assert_eq!(errors(&events, "arp"), vec!["Interface name must be a non-empty string"]);
    assert_eq!(summary.status_by_node_id["out"], NodeStatus::Skipped);
}

#[tokio::test]
async fn unknown_step_type_fails_when_scheduled() {
    let tx = FakeTransmitters::new();
    let engine = engine(&tx, EngineConfig::default());
    let graph = graph(
        vec![node("x", "teleport", json!({})), node("out", "net-output", json!({}))],
        &[("x", "out")],
    );

    let (result, events) = run(&engine, &graph, &context()).await;
    let summary = result.unwrap();

    assert_eq!(statuses(&events, "x"), vec![NodeStatus::Pending, NodeStatus::Failed]);
    assert_eq!(errors(&events, "x"), vec!["Unsupported step type: teleport"]);
    assert_eq!(summary.status_by_node_id["out"], NodeStatus::Skipped);
}

#[tokio::test]
async fn strict_mode_rejects_unknown_types_up_front() {
    let tx = FakeTransmitters::new();
    let config = EngineConfig {
        strict_step_types: true,
        ..EngineConfig::default()
    };
    let engine = engine(&tx, config);
    let graph = graph(vec![node("x", "teleport", json!({}))], &[]);

    let (result, events) = run(&engine, &graph, &context()).await;
    let err = result.unwrap_err();

    assert!(matches!(err, WorkflowError::UnsupportedStepType(_)));
    assert!(events.is_empty());
}

#[tokio::test]
async fn cycles_are_rejected_before_any_event() {
    let tx = FakeTransmitters::new();
    let engine = engine(&tx, EngineConfig::default());
    let graph = graph(
        vec![
            node("a", "ip-single", json!({ "ipAddress": "192.168.1.1" })),
            node("b", "arp-scan", json!({})),
        ],
        &[("a", "b"), ("b", "a")],
    );

    let (result, events) = run(&engine, &graph, &context()).await;
    let err = result.unwrap_err();

    assert!(matches!(err, WorkflowError::CycleDetected));
    assert_eq!(err.to_string(), "Cycle detected in workflow graph");
    assert!(events.is_empty());
    assert!(tx.initialized().is_empty());
}

#[tokio::test]
async fn dangling_edges_are_invalid() {
    let tx = FakeTransmitters::new();
    let engine = engine(&tx, EngineConfig::default());
    let graph = graph(
        vec![node("a", "ip-single", json!({ "ipAddress": "192.168.1.1" }))],
        &[("a", "ghost")],
    );

    let (result, events) = run(&engine, &graph, &context()).await;
    let err = result.unwrap_err();

    assert!(matches!(err, WorkflowError::InvalidGraph(_)));
    assert_eq!(err.to_string(), "Edge target not found: ghost");
    assert!(events.is_empty());
}

#[tokio::test]
async fn editor_documents_run_unchanged() {
    let document = r#"{
        "nodes": [
            { "id": "n1", "type": "ip-single", "data": { "ipAddress": "192.168.1.7" } },
            { "id": "n2", "type": "arp-scan", "data": { "delay": 0 } },
            { "id": "n3", "type": "net-output" }
        ],
        "edges": [
            { "source": "n1", "target": "n2" },
            { "source": "n2", "target": "n3" }
        ]
    }"#;
    let graph: probeflow_core::graph::Graph = document.parse().unwrap();

    let tx = FakeTransmitters::new();
    let engine = engine(&tx, EngineConfig::default());
    let (result, _) = run(&engine, &graph, &context()).await;

    assert!(!result.unwrap().has_failures());
    assert_eq!(tx.sent().len(), 1);
}
