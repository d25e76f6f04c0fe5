use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{WorkflowError, WorkflowResult};
use crate::event::NodeEvents;
use crate::factory::StepKind;
use crate::injector::TransmitterFactory;
use crate::injector::dispatcher::InjectorDispatcher;
use crate::step::{StepInput, StepOutput, WorkflowContext, WorkflowStep};

/// `net-output`: puts every packet stream from its parents on the wire.
///
/// A fresh dispatcher is created per invocation and closed on every exit path.
pub struct NetOutputStep {
    transmitters: Arc<dyn TransmitterFactory>,
}

impl NetOutputStep {
    pub fn new(transmitters: Arc<dyn TransmitterFactory>) -> Self {
        Self { transmitters }
    }
}

#[async_trait]
impl WorkflowStep for NetOutputStep {
    fn kind(&self) -> StepKind {
        StepKind::NetOutput
    }

    async fn execute(
        &self,
        context: &WorkflowContext,
        input: &StepInput,
        events: &NodeEvents,
    ) -> WorkflowResult<StepOutput> {
        let interface = context.interface().ok_or(WorkflowError::MissingInterface)?;

        let streams = input.packet_streams();
        if streams.is_empty() {
            return Err(WorkflowError::NoPacketStreams);
        }

        let mut dispatcher = InjectorDispatcher::new(self.transmitters.clone(), interface);
        let result = dispatcher.dispatch(&streams, events).await;
        dispatcher.close();

        match result {
            Ok(reports) => Ok(StepOutput::Sent(reports)),
            Err(e) => {
                events.error(e.to_string());
                Err(e)
            }
        }
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
