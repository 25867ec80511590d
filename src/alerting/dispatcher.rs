//! Fan-out of alert events to pluggable notification sinks.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::domain::alert::{AlertEvent, TriggerMetric};
use crate::domain::message::NotificationMessage;
use crate::domain::UserId;
use crate::Result;

/// A delivery channel for alert notifications (push service, SMS
/// gateway, test recorder). Implementations own any provider-specific
/// payload shaping.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Channel name used in logs.
    fn name(&self) -> &str;

    /// Deliver one notification to one user.
    async fn deliver(&self, user_id: UserId, message: &NotificationMessage) -> Result<()>;
}

/// Sends each alert event to every registered sink.
///
/// A failing sink is logged and skipped; one broken channel never
/// blocks the others.
#[derive(Default)]
pub struct AlertDispatcher {
    sinks: Vec<Arc<dyn AlertSink>>,
}

impl AlertDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a delivery channel.
    pub fn add_sink(&mut self, sink: Arc<dyn AlertSink>) {
        self.sinks.push(sink);
    }

    /// Builder form of [`add_sink`](Self::add_sink).
    pub fn with_sink(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.add_sink(sink);
        self
    }

    /// Dispatch an event to all sinks. Returns the number of sinks
    /// that accepted the notification.
    pub async fn dispatch(&self, event: &AlertEvent) -> usize {
        let message = NotificationMessage::from_alert(title_for(event.triggering_metric), event);
        let mut delivered = 0;

        for sink in &self.sinks {
            match sink.deliver(event.user_id, &message).await {
                Ok(()) => {
                    info!(
                        sink = sink.name(),
                        user_id = %event.user_id,
                        metric = %event.triggering_metric,
                        "notification delivered"
                    );
                    delivered += 1;
                }
                Err(err) => {
                    warn!(
                        sink = sink.name(),
                        user_id = %event.user_id,
                        error = %err,
                        "notification delivery failed"
                    );
                }
            }
        }

        delivered
    }
}

fn title_for(metric: TriggerMetric) -> &'static str {
    match metric {
        TriggerMetric::HeartRate => "Heart rate alert",
        TriggerMetric::Oxygen => "Oxygen saturation alert",
        TriggerMetric::RiskScore => "Cardiovascular risk alert",
        TriggerMetric::DailyAggregate => "Daily health report",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::alert::AlertSeverity;
    use crate::HeartwatchError;
    use chrono::Utc;
    use parking_lot::Mutex;

    struct Recorder {
        delivered: Mutex<Vec<NotificationMessage>>,
        fail: bool,
    }

    impl Recorder {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                delivered: Mutex::new(Vec::new()),
                fail,
            })
        }
    }

    #[async_trait]
    impl AlertSink for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        async fn deliver(&self, _user_id: UserId, message: &NotificationMessage) -> Result<()> {
            if self.fail {
                return Err(HeartwatchError::Delivery("simulated outage".into()));
            }
            self.delivered.lock().push(message.clone());
            Ok(())
        }
    }

    fn event() -> AlertEvent {
        AlertEvent::new(
            UserId(4),
            AlertSeverity::Risk,
            "Heart rate 150 bpm above limit 120",
            TriggerMetric::HeartRate,
            150.0,
            120.0,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn dispatches_to_all_sinks() {
        let first = Recorder::new(false);
        let second = Recorder::new(false);
        let dispatcher = AlertDispatcher::new()
            .with_sink(first.clone())
            .with_sink(second.clone());

        let delivered = dispatcher.dispatch(&event()).await;
        assert_eq!(delivered, 2);
        assert_eq!(first.delivered.lock().len(), 1);
        assert_eq!(second.delivered.lock().len(), 1);
    }

    #[tokio::test]
    async fn failing_sink_does_not_block_others() {
        let broken = Recorder::new(true);
        let working = Recorder::new(false);
        let dispatcher = AlertDispatcher::new()
            .with_sink(broken)
            .with_sink(working.clone());

        let delivered = dispatcher.dispatch(&event()).await;
        assert_eq!(delivered, 1);
        assert_eq!(working.delivered.lock().len(), 1);
    }

    #[tokio::test]
    async fn notification_carries_structured_data() {
        let sink = Recorder::new(false);
        let dispatcher = AlertDispatcher::new().with_sink(sink.clone());
        dispatcher.dispatch(&event()).await;

        let messages = sink.delivered.lock();
        assert_eq!(messages[0].title, "Heart rate alert");
        assert_eq!(messages[0].data.value, 150.0);
        assert_eq!(messages[0].data.threshold, 120.0);
    }
}
