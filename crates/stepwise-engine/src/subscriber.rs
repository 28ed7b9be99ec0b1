//! Bus adapter for the step engine.

use async_trait::async_trait;
use stepwise_bus::Subscriber;
use stepwise_core::{AgentEvent, Step};
use tokio::sync::{Mutex, mpsc};

use crate::engine::{StepDelta, StepEngine};

/// Feeds bus events into a [`StepEngine`] and forwards non-empty deltas to
/// the presentation side.
///
/// The mutex serializes processing, so the engine still sees one event at
/// a time even though the bus delivers concurrently.
pub struct EngineSubscriber {
    engine: Mutex<StepEngine>,
    deltas: mpsc::UnboundedSender<StepDelta>,
}

impl EngineSubscriber {
    pub fn new(engine: StepEngine) -> (Self, mpsc::UnboundedReceiver<StepDelta>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscriber = Self {
            engine: Mutex::new(engine),
            deltas: tx,
        };
        (subscriber, rx)
    }

    /// Snapshot of the full step list.
    pub async fn steps(&self) -> Vec<Step> {
        self.engine.lock().await.steps().to_vec()
    }

    pub async fn headline(&self) -> String {
        self.engine.lock().await.headline().to_string()
    }
}

#[async_trait]
impl Subscriber for EngineSubscriber {
    async fn on_event(&self, event: &AgentEvent) -> anyhow::Result<()> {
        let delta = self.engine.lock().await.process(event);
        if delta.is_empty() {
            return Ok(());
        }
        self.deltas
            .send(delta)
            .map_err(|_| anyhow::anyhow!("step delta receiver dropped"))
    }

    fn name(&self) -> &str {
        "step-engine"
    }
}
