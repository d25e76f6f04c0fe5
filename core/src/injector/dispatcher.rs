//! Routes packet streams onto lazily created, per-family transmitters.

use std::sync::Arc;

use futures::future::join_all;

use crate::error::{WorkflowError, WorkflowResult};
use crate::event::NodeEvents;
use crate::injector::{ProtocolFamily, TransmitError, Transmitter, TransmitterFactory};
use crate::step::{PacketStream, StreamItem, StreamReport};

const TRACING_TARGET: &str = "probeflow_core::injector";

type Slot = Option<Box<dyn Transmitter>>;

/// Owns at most one transmitter per [`ProtocolFamily`] for the lifetime of one sink invocation.
pub struct InjectorDispatcher {
    factory: Arc<dyn TransmitterFactory>,
    interface: String,
    slots: [Slot; ProtocolFamily::ALL.len()],
}

impl InjectorDispatcher {
    pub fn new(factory: Arc<dyn TransmitterFactory>, interface: impl Into<String>) -> Self {
        Self {
            factory,
            interface: interface.into(),
            slots: Default::default(),
        }
    }

    /// Sends every stream and returns one report per stream, in input order.
    ///
    /// Families progress concurrently; streams of one family run back to back.
    /// The first transmitter failure is returned once every family has settled.
    pub async fn dispatch(&mut self, streams: &[&PacketStream], events: &NodeEvents) -> WorkflowResult<Vec<StreamReport>> {
        let mut reports: Vec<Option<StreamReport>> = vec![None; streams.len()];
        let factory = self.factory.as_ref();
        let interface = self.interface.as_str();

        let jobs = self.slots.iter_mut().enumerate().filter_map(|(idx, slot)| {
            let family = ProtocolFamily::ALL[idx];
            let queue: Vec<(usize, &PacketStream)> = streams
                .iter()
                .enumerate()
                .filter(|(_, stream)| stream.kind == family)
                .map(|(pos, stream)| (pos, *stream))
                .collect();
            if queue.is_empty() {
                return None;
            }
            Some(run_family(factory, interface, family, slot, queue, events))
        });

        let mut first_error = None;
        for outcome in join_all(jobs).await {
            match outcome {
                Ok(done) => {
                    for (pos, report) in done {
                        reports[pos] = Some(report);
                    }
                }
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }
        Ok(reports.into_iter().flatten().collect())
    }

    /// Releases every transmitter that was opened. Safe to call repeatedly.
    pub fn close(&mut self) {
        for (idx, slot) in self.slots.iter_mut().enumerate() {
            if let Some(mut transmitter) = slot.take() {
                tracing::debug!(target: TRACING_TARGET, family = %ProtocolFamily::ALL[idx], "closing transmitter");
                transmitter.close();
            }
        }
    }
}

impl Drop for InjectorDispatcher {
    fn drop(&mut self) {
        self.close();
    }
}

async fn run_family(
    factory: &dyn TransmitterFactory,
    interface: &str,
    family: ProtocolFamily,
    slot: &mut Slot,
    queue: Vec<(usize, &PacketStream)>,
    events: &NodeEvents,
) -> WorkflowResult<Vec<(usize, StreamReport)>> {
    let transmitter = ensure_transmitter(factory, interface, family, slot)?;
    let mut done = Vec::with_capacity(queue.len());
    for (pos, stream) in queue {
        let report = send_stream(&mut **transmitter, stream, events).await;
        events.info(family.summary(report.sent, report.total, report.failed));
        done.push((pos, report));
    }
    Ok(done)
}

fn ensure_transmitter<'a>(
    factory: &dyn TransmitterFactory,
    interface: &str,
    family: ProtocolFamily,
    slot: &'a mut Slot,
) -> WorkflowResult<&'a mut Box<dyn Transmitter>> {
    let init_failed = |source: TransmitError| WorkflowError::InjectorInitFailed {
        family,
        interface: interface.to_string(),
        source,
    };

    if slot.is_none() {
        if !factory.is_available(family) {
            return Err(init_failed(TransmitError::Unavailable(family)));
        }
        let mut transmitter = factory.create(family);
        if let Err(e) = transmitter.initialize(interface) {
            transmitter.close();
            return Err(init_failed(e));
        }
        tracing::debug!(target: TRACING_TARGET, %family, interface, "transmitter initialized");
        *slot = Some(transmitter);
    }

    match slot {
        Some(transmitter) => Ok(transmitter),
        None => Err(init_failed(TransmitError::NotInitialized)),
    }
}

async fn send_stream(transmitter: &mut dyn Transmitter, stream: &PacketStream, events: &NodeEvents) -> StreamReport {
    let mut report = StreamReport {
        kind: stream.kind,
        sent: 0,
        failed: 0,
        total: stream.packet_count(),
    };

    for item in &stream.items {
        match item {
            StreamItem::Packet { bytes, target } => match transmitter.send(*target, bytes) {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(target: TRACING_TARGET, family = %stream.kind, error = %e, "packet send failed");
                    events.warning(stream.kind.send_failure(*target, &e));
                }
            },
            StreamItem::Delay(ms) => {
                if *ms > 0 {
                    tokio::time::sleep(std::time::Duration::from_millis(*ms)).await;
                }
            }
        }
    }
    report
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
