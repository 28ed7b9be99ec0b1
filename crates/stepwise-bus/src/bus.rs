//! Concurrent fan-out with per-subscriber failure isolation.

use std::sync::Arc;

use futures::future::join_all;
use stepwise_core::AgentEvent;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::Subscriber;

/// Why a subscriber failed to handle an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The callback returned an error.
    Error,
    /// The callback panicked.
    Panic,
}

#[derive(Debug, Clone)]
pub struct SubscriberFailure {
    pub subscriber: String,
    pub kind: FailureKind,
    pub message: String,
}

/// Outcome of one [`EventBus::publish`] call.
#[derive(Debug, Clone, Default)]
pub struct PublishReport {
    /// Subscribers that handled the event successfully.
    pub delivered: usize,
    pub failures: Vec<SubscriberFailure>,
}

impl PublishReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Fans each event out to every registered subscriber.
pub struct EventBus {
    subscribers: RwLock<Vec<Arc<dyn Subscriber>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Register a subscriber. It receives every event published afterwards.
    pub async fn subscribe(&self, subscriber: Arc<dyn Subscriber>) {
        debug!(subscriber = subscriber.name(), "Subscriber registered");
        self.subscribers.write().await.push(subscriber);
    }

    pub async fn len(&self) -> usize {
        self.subscribers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.subscribers.read().await.is_empty()
    }

    /// Deliver `event` to all subscribers concurrently and wait for all of them.
    ///
    /// Each subscriber runs on its own task, so an error or panic in one is
    /// caught and reported without cancelling the rest. Returning only after
    /// every task settles keeps sequential publishes in order per subscriber.
    pub async fn publish(&self, event: AgentEvent) -> PublishReport {
        let subscribers = self.subscribers.read().await.clone();
        let event = Arc::new(event);

        let tasks = subscribers.iter().map(|subscriber| {
            let subscriber = Arc::clone(subscriber);
            let event = Arc::clone(&event);
            tokio::spawn(async move { subscriber.on_event(&event).await })
        });
        let results = join_all(tasks).await;

        let mut report = PublishReport::default();
        for (subscriber, result) in subscribers.iter().zip(results) {
            let failure = match result {
                Ok(Ok(())) => {
                    report.delivered += 1;
                    continue;
                }
                Ok(Err(e)) => SubscriberFailure {
                    subscriber: subscriber.name().to_string(),
                    kind: FailureKind::Error,
                    message: format!("{e:#}"),
                },
                Err(join_err) => SubscriberFailure {
                    subscriber: subscriber.name().to_string(),
                    kind: FailureKind::Panic,
                    message: join_err.to_string(),
                },
            };
            warn!(
                subscriber = %failure.subscriber,
                event_type = %event.event_type,
                kind = ?failure.kind,
                error = %failure.message,
                "Subscriber failed, continuing"
            );
            report.failures.push(failure);
        }

        #[cfg(feature = "metrics")]
        {
            let labels = [("event_type", event.event_type.to_string())];
            metrics::counter!("events_published_total", &labels).increment(1);
            if !report.failures.is_empty() {
                metrics::counter!("subscriber_failures_total", &labels)
                    .increment(report.failures.len() as u64);
            }
        }

        report
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use futures::FutureExt;

    use super::*;
    use crate::FnSubscriber;

    struct CountingSubscriber {
        count: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Subscriber for CountingSubscriber {
        async fn on_event(&self, _event: &AgentEvent) -> anyhow::Result<()> {
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    struct FailingSubscriber;

    #[async_trait]
    impl Subscriber for FailingSubscriber {
        async fn on_event(&self, _event: &AgentEvent) -> anyhow::Result<()> {
            anyhow::bail!("render target gone")
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    struct PanickingSubscriber;

    #[async_trait]
    impl Subscriber for PanickingSubscriber {
        async fn on_event(&self, _event: &AgentEvent) -> anyhow::Result<()> {
            panic!("subscriber bug");
        }

        fn name(&self) -> &str {
            "panicking"
        }
    }

    fn event() -> AgentEvent {
        AgentEvent::new("llm_started", "Manager")
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let bus = EventBus::new();
        assert!(bus.is_empty().await);
        let report = bus.publish(event()).await;
        assert_eq!(report.delivered, 0);
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicU32::new(0));
        for _ in 0..3 {
            bus.subscribe(Arc::new(CountingSubscriber {
                count: count.clone(),
            }))
            .await;
        }
        assert_eq!(bus.len().await, 3);

        let report = bus.publish(event()).await;
        assert_eq!(report.delivered, 3);
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_error_is_isolated() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicU32::new(0));
        bus.subscribe(Arc::new(FailingSubscriber)).await;
        bus.subscribe(Arc::new(CountingSubscriber {
            count: count.clone(),
        }))
        .await;

        let report = bus.publish(event()).await;
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].subscriber, "failing");
        assert_eq!(report.failures[0].kind, FailureKind::Error);
        assert!(report.failures[0].message.contains("render target gone"));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panic_is_isolated() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicU32::new(0));
        bus.subscribe(Arc::new(PanickingSubscriber)).await;
        bus.subscribe(Arc::new(CountingSubscriber {
            count: count.clone(),
        }))
        .await;

        let report = bus.publish(event()).await;
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failures[0].kind, FailureKind::Panic);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_publish_waits_for_slow_subscriber() {
        let bus = EventBus::new();
        let done = Arc::new(AtomicU32::new(0));
        let flag = done.clone();
        bus.subscribe(Arc::new(FnSubscriber::new(
            "slow",
            Box::new(move |_event: Arc<AgentEvent>| {
                let flag = flag.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    flag.store(1, Ordering::SeqCst);
                    Ok(())
                }
                .boxed()
            }),
        )))
        .await;

        bus.publish(event()).await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sequential_publishes_arrive_in_order() {
        let bus = EventBus::new();
        let seen = Arc::new(tokio::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        bus.subscribe(Arc::new(FnSubscriber::new(
            "recorder",
            Box::new(move |event: Arc<AgentEvent>| {
                let sink = sink.clone();
                async move {
                    // Earlier events sleep longer; order must still hold.
                    let delay = if event.event_type.as_str() == "llm_started" { 15 } else { 0 };
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    sink.lock().await.push(event.event_type.to_string());
                    Ok(())
                }
                .boxed()
            }),
        )))
        .await;

        bus.publish(AgentEvent::new("llm_started", "Manager")).await;
        bus.publish(AgentEvent::new("llm_ended", "Manager")).await;

        assert_eq!(*seen.lock().await, vec!["llm_started", "llm_ended"]);
    }
}
