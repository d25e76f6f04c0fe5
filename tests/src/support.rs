//! Shared fixtures for driving the engine without touching the host network.

use std::net::IpAddr;
use std::sync::{Arc, Mutex};

use pnet::util::MacAddr;
use probeflow_common::config::EngineConfig;
use probeflow_common::network::interface::{InterfaceSnapshot, StaticInventory};
use probeflow_core::engine::Engine;
use probeflow_core::error::WorkflowResult;
use probeflow_core::event::{EventSink, ExecutionSummary, WorkflowEvent};
use probeflow_core::graph::{Graph, GraphEdge, GraphNode};
use probeflow_core::injector::{ProtocolFamily, TransmitError, Transmitter, TransmitterFactory};
use probeflow_core::step::WorkflowContext;
use serde_json::Value;

pub const INTERFACE: &str = "eth0";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentPacket {
    pub family: ProtocolFamily,
    pub target: Option<IpAddr>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct SendLog {
    pub initialized: Vec<(ProtocolFamily, String)>,
    pub sent: Vec<SentPacket>,
    pub closed: Vec<ProtocolFamily>,
}

/// Transmitters that record every packet instead of putting it on the wire.
#[derive(Clone, Default)]
pub struct FakeTransmitters {
    log: Arc<Mutex<SendLog>>,
    fail_init: Vec<ProtocolFamily>,
    refused: Vec<IpAddr>,
}

impl FakeTransmitters {
    pub fn new() -> Self {
        Self::default()
    }

    /// `family` fails to initialize, as if the interface could not be opened.
    pub fn failing_init(mut self, family: ProtocolFamily) -> Self {
        self.fail_init.push(family);
        self
    }

    /// Packets addressed to `target` are refused by the transmitter.
    pub fn refusing(mut self, target: IpAddr) -> Self {
        self.refused.push(target);
        self
    }

    pub fn sent(&self) -> Vec<SentPacket> {
        self.log.lock().unwrap().sent.clone()
    }

    pub fn initialized(&self) -> Vec<(ProtocolFamily, String)> {
        self.log.lock().unwrap().initialized.clone()
    }

    pub fn closed(&self) -> Vec<ProtocolFamily> {
        self.log.lock().unwrap().closed.clone()
    }
}

struct FakeTransmitter {
    family: ProtocolFamily,
    log: Arc<Mutex<SendLog>>,
    fail_init: bool,
    refused: Vec<IpAddr>,
    up: bool,
}

impl Transmitter for FakeTransmitter {
    fn initialize(&mut self, interface: &str) -> Result<(), TransmitError> {
        if self.fail_init {
            return Err(TransmitError::InterfaceNotFound(interface.to_string()));
        }
        self.log.lock().unwrap().initialized.push((self.family, interface.to_string()));
        self.up = true;
        Ok(())
    }

    fn send(&mut self, target: Option<IpAddr>, packet: &[u8]) -> Result<(), TransmitError> {
        if !self.up {
            return Err(TransmitError::NotInitialized);
        }
        if target.is_some_and(|t| self.refused.contains(&t)) {
            return Err(TransmitError::Io(std::io::Error::other("host unreachable")));
        }
        self.log.lock().unwrap().sent.push(SentPacket {
            family: self.family,
            target,
            bytes: packet.to_vec(),
        });
        Ok(())
    }

    fn close(&mut self) {
        if self.up {
            self.up = false;
            self.log.lock().unwrap().closed.push(self.family);
        }
    }

    fn is_initialized(&self) -> bool {
        self.up
    }
}

impl TransmitterFactory for FakeTransmitters {
    fn is_available(&self, _family: ProtocolFamily) -> bool {
        true
    }

    fn create(&self, family: ProtocolFamily) -> Box<dyn Transmitter> {
        Box::new(FakeTransmitter {
            family,
            log: self.log.clone(),
            fail_init: self.fail_init.contains(&family),
            refused: self.refused.clone(),
            up: false,
        })
    }
}

pub fn mac() -> MacAddr {
    MacAddr::new(0x02, 0x42, 0xac, 0x11, 0x00, 0x02)
}

/// One Ethernet interface with IPv4, global and link-local IPv6 addresses.
pub fn inventory() -> Arc<StaticInventory> {
    Arc::new(StaticInventory::new(vec![
        InterfaceSnapshot::new("lo")
            .with_address("127.0.0.1".parse().unwrap(), true)
            .with_address("::1".parse().unwrap(), true),
        InterfaceSnapshot::new(INTERFACE)
            .with_mac(mac())
            .with_address("192.168.1.10".parse().unwrap(), false)
            .with_address("2001:db8::10".parse().unwrap(), false)
            .with_address("fe80::42:acff:fe11:2".parse().unwrap(), false),
    ]))
}

pub fn engine(transmitters: &FakeTransmitters, config: EngineConfig) -> Engine {
    Engine::new(inventory(), Arc::new(transmitters.clone()), config)
}

pub fn node(id: &str, node_type: &str, data: Value) -> GraphNode {
    GraphNode::new(id, node_type, data)
}

pub fn graph(nodes: Vec<GraphNode>, edges: &[(&str, &str)]) -> Graph {
    Graph::new(nodes, edges.iter().map(|(s, t)| GraphEdge::new(*s, *t)).collect())
}

/// Runs `graph` to completion and collects every event it produced.
pub async fn run(
    engine: &Engine,
    graph: &Graph,
    context: &WorkflowContext,
) -> (WorkflowResult<ExecutionSummary>, Vec<WorkflowEvent>) {
    let (sink, mut rx) = EventSink::channel();
    let result = engine.start(graph, context, sink).await;

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    (result, events)
}
