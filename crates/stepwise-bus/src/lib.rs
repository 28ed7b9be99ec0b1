//! Event bus for agent events.
//!
//! Every published [`AgentEvent`] is delivered to all subscribers
//! concurrently. A subscriber that errors or panics is reported and logged
//! without affecting delivery to the others.

use async_trait::async_trait;
use stepwise_core::AgentEvent;

pub mod bus;
pub mod logging;

pub use bus::{EventBus, FailureKind, PublishReport, SubscriberFailure};
pub use logging::LoggingSubscriber;

/// A single-argument asynchronous event callback.
#[async_trait]
pub trait Subscriber: Send + Sync {
    /// Handle one event. Errors are caught by the bus.
    async fn on_event(&self, event: &AgentEvent) -> anyhow::Result<()>;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "Subscriber"
    }
}

/// Boxed async closure subscriber.
pub type SubscriberFn = Box<
    dyn Fn(std::sync::Arc<AgentEvent>) -> futures::future::BoxFuture<'static, anyhow::Result<()>>
        + Send
        + Sync,
>;

/// Adapts a closure into a [`Subscriber`].
pub struct FnSubscriber {
    name: String,
    handler: SubscriberFn,
}

impl FnSubscriber {
    pub fn new(name: impl Into<String>, handler: SubscriberFn) -> Self {
        Self {
            name: name.into(),
            handler,
        }
    }
}

#[async_trait]
impl Subscriber for FnSubscriber {
    async fn on_event(&self, event: &AgentEvent) -> anyhow::Result<()> {
        (self.handler)(std::sync::Arc::new(event.clone())).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}
