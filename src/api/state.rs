//! Shared application state wiring the pipeline stages together.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tracing::info;

use crate::alerting::{AlertDispatcher, ThresholdEvaluator};
use crate::domain::alert::{AlertEvent, AlertThresholdConfig};
use crate::domain::message::{RealtimePayload, SignalFeed};
use crate::domain::sample::SampleBuffer;
use crate::domain::vitals::VitalSigns;
use crate::domain::UserId;
use crate::features::{EcgFeatureSet, FeatureExtractor, SignalStatus};
use crate::realtime::{BroadcastManager, ConnectionId};
use crate::risk::{RiskInput, RiskScorer};

/// Shared state handed to every request handler. Cloning is cheap;
/// all fields live behind one `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    scorer: RiskScorer,
    extractor: FeatureExtractor,
    evaluator: Arc<ThresholdEvaluator>,
    dispatcher: Arc<AlertDispatcher>,
    broadcast: Arc<BroadcastManager>,
    thresholds: RwLock<HashMap<UserId, AlertThresholdConfig>>,
    buffers: RwLock<HashMap<UserId, SampleBuffer>>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    /// State with default engines and no registered notification sinks.
    pub fn new() -> Self {
        Self::with_dispatcher(Arc::new(AlertDispatcher::new()))
    }

    /// State with an externally configured dispatcher (push sinks,
    /// test recorders).
    pub fn with_dispatcher(dispatcher: Arc<AlertDispatcher>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                scorer: RiskScorer::default(),
                extractor: FeatureExtractor::default(),
                evaluator: Arc::new(ThresholdEvaluator::new()),
                dispatcher,
                broadcast: Arc::new(BroadcastManager::new()),
                thresholds: RwLock::new(HashMap::new()),
                buffers: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn scorer(&self) -> &RiskScorer {
        &self.inner.scorer
    }

    pub fn evaluator(&self) -> &Arc<ThresholdEvaluator> {
        &self.inner.evaluator
    }

    pub fn broadcast(&self) -> &Arc<BroadcastManager> {
        &self.inner.broadcast
    }

    /// A user's alert thresholds, falling back to the defaults.
    pub fn thresholds_for(&self, user_id: UserId) -> AlertThresholdConfig {
        self.inner
            .thresholds
            .read()
            .get(&user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Replace a user's alert thresholds.
    pub fn set_thresholds(&self, user_id: UserId, config: AlertThresholdConfig) {
        info!(user_id = %user_id, "alert thresholds updated");
        self.inner.thresholds.write().insert(user_id, config);
    }

    /// Process one inbound feed message: evaluate, dispatch and fan
    /// out. Returns the alert events that survived cooldown.
    pub async fn ingest(&self, feed: SignalFeed) -> Vec<AlertEvent> {
        match feed {
            SignalFeed::HealthData { user_id, vitals, .. } => {
                self.ingest_vitals(user_id, vitals).await
            }
            SignalFeed::EcgSample {
                user_id,
                value,
                timestamp,
            } => self.ingest_ecg_sample(user_id, value, timestamp).await,
        }
    }

    async fn ingest_vitals(&self, user_id: UserId, vitals: VitalSigns) -> Vec<AlertEvent> {
        let config = self.thresholds_for(user_id);
        let now = Utc::now();

        let mut events = self
            .inner
            .evaluator
            .evaluate_vitals(user_id, &config, &vitals, now);

        let assessment = self.inner.scorer.score(&RiskInput::from_vitals(&vitals));
        if let Some(event) =
            self.inner
                .evaluator
                .evaluate_risk_score(user_id, &config, &assessment, now)
        {
            events.push(event);
        }

        self.inner
            .broadcast
            .publish(user_id, RealtimePayload::HealthData(vitals))
            .await;
        self.publish_and_dispatch(user_id, &events).await;
        events
    }

    async fn ingest_ecg_sample(
        &self,
        user_id: UserId,
        value: f64,
        timestamp_ms: i64,
    ) -> Vec<AlertEvent> {
        let features = self.push_sample(user_id, value, timestamp_ms);

        if features.status != SignalStatus::Critical {
            return Vec::new();
        }

        let config = self.thresholds_for(user_id);
        let now = Utc::now();
        let assessment = self.inner.scorer.score(&RiskInput {
            ecg_features: Some(features.features.clone()),
            heart_rate: (features.heart_rate > 0).then_some(f64::from(features.heart_rate)),
            ..RiskInput::default()
        });

        let events: Vec<AlertEvent> = self
            .inner
            .evaluator
            .evaluate_risk_score(user_id, &config, &assessment, now)
            .into_iter()
            .collect();
        self.publish_and_dispatch(user_id, &events).await;
        events
    }

    /// Append an ECG sample to the user's rolling buffer and re-run
    /// extraction over the current window.
    pub fn push_sample(&self, user_id: UserId, value: f64, timestamp_ms: i64) -> EcgFeatureSet {
        let mut buffers = self.inner.buffers.write();
        let buffer = buffers.entry(user_id).or_insert_with(SampleBuffer::new);
        buffer.push(value, timestamp_ms);
        self.inner.extractor.extract(buffer)
    }

    /// Drop a user's session state (buffer and cooldowns).
    pub fn end_session(&self, user_id: UserId) {
        self.inner.buffers.write().remove(&user_id);
        self.inner.evaluator.reset_user(user_id);
    }

    /// Tear down after a connection closes. Session state is dropped
    /// only with the user's last open connection; while another viewer
    /// remains subscribed, buffers and cooldowns stay intact.
    pub async fn connection_closed(&self, connection: ConnectionId, user_id: UserId) {
        self.inner.broadcast.unsubscribe(connection).await;
        if self.inner.broadcast.connection_count(user_id) == 0 {
            self.end_session(user_id);
        }
    }

    async fn publish_and_dispatch(&self, user_id: UserId, events: &[AlertEvent]) {
        for event in events {
            self.inner.dispatcher.dispatch(event).await;
            self.inner
                .broadcast
                .publish(user_id, RealtimePayload::Alert(event.clone()))
                .await;
        }
    }
}

impl crate::aggregation::ThresholdSource for AppState {
    fn thresholds_for(&self, user_id: UserId) -> AlertThresholdConfig {
        AppState::thresholds_for(self, user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::alert::TriggerMetric;
    use crate::domain::message::RealtimeMessage;
    use crate::realtime::ConnectionSink;

    struct NullSink;

    #[async_trait::async_trait]
    impl ConnectionSink for NullSink {
        async fn send(&self, _message: &RealtimeMessage) -> crate::Result<()> {
            Ok(())
        }

        fn is_open(&self) -> bool {
            true
        }

        async fn close(&self) {}
    }

    fn health_feed(user_id: i64, hr: f64) -> SignalFeed {
        SignalFeed::HealthData {
            user_id: UserId(user_id),
            vitals: VitalSigns {
                heart_rate: Some(hr),
                ..VitalSigns::empty()
            },
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    #[tokio::test]
    async fn breaching_vitals_produce_alerts() {
        let state = AppState::new();
        let events = state.ingest(health_feed(1, 150.0)).await;
        assert!(events
            .iter()
            .any(|e| e.triggering_metric == TriggerMetric::HeartRate));
    }

    #[tokio::test]
    async fn normal_vitals_produce_no_alerts() {
        let state = AppState::new();
        let events = state.ingest(health_feed(1, 72.0)).await;
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn repeated_breaches_are_cooled_down() {
        let state = AppState::new();
        let first = state.ingest(health_feed(2, 150.0)).await;
        let second = state.ingest(health_feed(2, 155.0)).await;
        assert!(!first.is_empty());
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn ecg_samples_accumulate_per_user() {
        let state = AppState::new();
        for _ in 0..50 {
            state.ingest(SignalFeed::EcgSample {
                user_id: UserId(3),
                value: 0.1,
                timestamp: 0,
            })
            .await;
        }
        let features = state.push_sample(UserId(3), 0.1, 0);
        // 51 samples: still below the analysis window
        assert_eq!(features.status, SignalStatus::Insufficient);
    }

    #[tokio::test]
    async fn viewer_disconnect_keeps_cooldowns_while_others_remain() {
        let state = AppState::new();
        let user = UserId(7);
        let phone = state.broadcast().subscribe(user, Arc::new(NullSink)).await;
        let dashboard = state.broadcast().subscribe(user, Arc::new(NullSink)).await;

        assert!(!state.ingest(health_feed(7, 150.0)).await.is_empty());

        // One viewer leaves; the other connection keeps the session
        // and its cooldowns alive
        state.connection_closed(dashboard, user).await;
        assert!(state.ingest(health_feed(7, 150.0)).await.is_empty());

        // Last connection gone: session state is dropped
        state.connection_closed(phone, user).await;
        assert!(!state.ingest(health_feed(7, 150.0)).await.is_empty());
    }

    #[tokio::test]
    async fn end_session_clears_cooldowns() {
        let state = AppState::new();
        assert!(!state.ingest(health_feed(4, 150.0)).await.is_empty());
        state.end_session(UserId(4));
        assert!(!state.ingest(health_feed(4, 150.0)).await.is_empty());
    }

    #[test]
    fn thresholds_round_trip() {
        let state = AppState::new();
        let config = AlertThresholdConfig {
            heart_rate_high: 150.0,
            ..AlertThresholdConfig::default()
        };
        state.set_thresholds(UserId(5), config.clone());
        assert_eq!(state.thresholds_for(UserId(5)), config);
        assert_eq!(
            state.thresholds_for(UserId(6)),
            AlertThresholdConfig::default()
        );
    }
}
