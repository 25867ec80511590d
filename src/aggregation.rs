//! Scheduled daily aggregation of stored vitals.
//!
//! Once per period the aggregator walks the active users, summarizes
//! their recent heart-rate readings and, when the aggregate falls
//! outside normal bounds, routes a warning through the same evaluator
//! and dispatcher path as realtime alerts.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::alerting::{AlertDispatcher, ThresholdEvaluator};
use crate::domain::alert::{AlertEvent, AlertSeverity, AlertThresholdConfig, TriggerMetric};
use crate::domain::UserId;

/// Fewest readings required before a user's day is summarized.
pub const MIN_READINGS: usize = 5;
/// Aggregate bounds. Outside these the day is flagged.
const MEAN_LOW: f64 = 50.0;
const MEAN_HIGH: f64 = 90.0;
const VARIANCE_LIMIT: f64 = 100.0;

/// Per-user alert configuration lookup for the aggregation job. The
/// API state implements this over its stored thresholds; a single
/// [`AlertThresholdConfig`] acts as a uniform source.
pub trait ThresholdSource: Send + Sync {
    fn thresholds_for(&self, user_id: UserId) -> AlertThresholdConfig;
}

impl ThresholdSource for AlertThresholdConfig {
    fn thresholds_for(&self, _user_id: UserId) -> AlertThresholdConfig {
        self.clone()
    }
}

/// Read access to stored vitals for the aggregation job.
#[async_trait]
pub trait VitalsSource: Send + Sync {
    /// Users with monitoring activity in the current period.
    async fn active_users(&self) -> Vec<UserId>;

    /// Heart-rate readings recorded for a user in the current period.
    async fn recent_heart_rates(&self, user_id: UserId) -> Vec<f64>;
}

/// Summary of one user's day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyReport {
    pub user_id: UserId,
    pub readings: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub variance: f64,
    /// Whether the aggregate breached a bound and raised an alert
    pub out_of_bounds: bool,
    pub generated_at: DateTime<Utc>,
}

/// Periodic aggregation job over an injected vitals source.
pub struct DailyAggregator {
    source: Arc<dyn VitalsSource>,
    evaluator: Arc<ThresholdEvaluator>,
    dispatcher: Arc<AlertDispatcher>,
}

impl DailyAggregator {
    pub fn new(
        source: Arc<dyn VitalsSource>,
        evaluator: Arc<ThresholdEvaluator>,
        dispatcher: Arc<AlertDispatcher>,
    ) -> Self {
        Self {
            source,
            evaluator,
            dispatcher,
        }
    }

    /// Run one aggregation pass. Users with fewer than
    /// [`MIN_READINGS`] readings are skipped; every summarized user
    /// yields a report, alert or not.
    pub async fn run_once(
        &self,
        configs: &dyn ThresholdSource,
        now: DateTime<Utc>,
    ) -> Vec<DailyReport> {
        let mut reports = Vec::new();

        for user_id in self.source.active_users().await {
            let readings = self.source.recent_heart_rates(user_id).await;
            if readings.len() < MIN_READINGS {
                debug!(
                    user_id = %user_id,
                    readings = readings.len(),
                    "too few readings, skipping aggregation"
                );
                continue;
            }

            let report = summarize(user_id, &readings, now);
            info!(
                user_id = %user_id,
                readings = report.readings,
                mean = report.mean,
                variance = report.variance,
                out_of_bounds = report.out_of_bounds,
                "daily aggregate computed"
            );

            if report.out_of_bounds {
                let (value, threshold) = breach_detail(&report);
                let event = AlertEvent::new(
                    user_id,
                    AlertSeverity::Warning,
                    format!(
                        "Daily heart-rate aggregate out of bounds: mean {:.1} bpm, variance {:.1} over {} readings",
                        report.mean, report.variance, report.readings
                    ),
                    TriggerMetric::DailyAggregate,
                    value,
                    threshold,
                    now,
                );
                let config = configs.thresholds_for(user_id);
                if let Some(event) = self.evaluator.emit_event(&config, event, now) {
                    self.dispatcher.dispatch(&event).await;
                }
            }

            reports.push(report);
        }

        reports
    }

    /// Spawn the job on a fixed period. Runs until aborted.
    pub fn spawn_schedule(
        self: Arc<Self>,
        configs: Arc<dyn ThresholdSource>,
        period: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                self.run_once(configs.as_ref(), Utc::now()).await;
            }
        })
    }
}

fn summarize(user_id: UserId, readings: &[f64], now: DateTime<Utc>) -> DailyReport {
    let n = readings.len() as f64;
    let mean = readings.iter().sum::<f64>() / n;
    let variance = readings.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    let min = readings.iter().copied().fold(f64::INFINITY, f64::min);
    let max = readings.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let out_of_bounds = variance > VARIANCE_LIMIT || mean > MEAN_HIGH || mean < MEAN_LOW;

    DailyReport {
        user_id,
        readings: readings.len(),
        mean,
        min,
        max,
        variance,
        out_of_bounds,
        generated_at: now,
    }
}

/// Which bound the aggregate broke, for the alert's value/threshold.
fn breach_detail(report: &DailyReport) -> (f64, f64) {
    if report.mean > MEAN_HIGH {
        (report.mean, MEAN_HIGH)
    } else if report.mean < MEAN_LOW {
        (report.mean, MEAN_LOW)
    } else {
        (report.variance, VARIANCE_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerting::AlertSink;
    use crate::domain::message::NotificationMessage;
    use crate::Result;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    struct FixedSource {
        data: HashMap<UserId, Vec<f64>>,
    }

    #[async_trait]
    impl VitalsSource for FixedSource {
        async fn active_users(&self) -> Vec<UserId> {
            let mut users: Vec<UserId> = self.data.keys().copied().collect();
            users.sort_by_key(|u| u.0);
            users
        }

        async fn recent_heart_rates(&self, user_id: UserId) -> Vec<f64> {
            self.data.get(&user_id).cloned().unwrap_or_default()
        }
    }

    #[derive(Default)]
    struct CountingSink {
        delivered: Mutex<Vec<(UserId, NotificationMessage)>>,
    }

    #[async_trait]
    impl AlertSink for CountingSink {
        fn name(&self) -> &str {
            "counting"
        }

        async fn deliver(&self, user_id: UserId, message: &NotificationMessage) -> Result<()> {
            self.delivered.lock().push((user_id, message.clone()));
            Ok(())
        }
    }

    fn aggregator(
        data: HashMap<UserId, Vec<f64>>,
    ) -> (DailyAggregator, Arc<CountingSink>) {
        let sink = Arc::new(CountingSink::default());
        let dispatcher =
            Arc::new(AlertDispatcher::new().with_sink(sink.clone() as Arc<dyn AlertSink>));
        let aggregator = DailyAggregator::new(
            Arc::new(FixedSource { data }),
            Arc::new(ThresholdEvaluator::new()),
            dispatcher,
        );
        (aggregator, sink)
    }

    #[tokio::test]
    async fn in_bounds_day_reports_without_alerting() {
        let (aggregator, sink) = aggregator(HashMap::from([(
            UserId(1),
            vec![70.0, 72.0, 74.0, 71.0, 73.0, 72.0],
        )]));

        let reports = aggregator
            .run_once(&AlertThresholdConfig::default(), Utc::now())
            .await;
        assert_eq!(reports.len(), 1);
        assert!(!reports[0].out_of_bounds);
        assert!(sink.delivered.lock().is_empty());
    }

    #[tokio::test]
    async fn high_mean_raises_a_warning() {
        let (aggregator, sink) = aggregator(HashMap::from([(
            UserId(2),
            vec![95.0, 96.0, 94.0, 97.0, 95.0],
        )]));

        let reports = aggregator
            .run_once(&AlertThresholdConfig::default(), Utc::now())
            .await;
        assert!(reports[0].out_of_bounds);

        let delivered = sink.delivered.lock();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].1.data.metric, TriggerMetric::DailyAggregate);
        assert_eq!(delivered[0].1.data.threshold, MEAN_HIGH);
    }

    #[tokio::test]
    async fn high_variance_alone_raises_a_warning() {
        // Mean stays in bounds, spread does not
        let (aggregator, sink) = aggregator(HashMap::from([(
            UserId(3),
            vec![50.0, 90.0, 50.0, 90.0, 70.0],
        )]));

        let reports = aggregator
            .run_once(&AlertThresholdConfig::default(), Utc::now())
            .await;
        assert!(reports[0].variance > VARIANCE_LIMIT);
        assert!(reports[0].out_of_bounds);
        assert_eq!(sink.delivered.lock().len(), 1);
    }

    #[tokio::test]
    async fn too_few_readings_skips_the_user() {
        let (aggregator, sink) = aggregator(HashMap::from([
            (UserId(4), vec![200.0, 200.0]),
            (UserId(5), vec![72.0; 10]),
        ]));

        let reports = aggregator
            .run_once(&AlertThresholdConfig::default(), Utc::now())
            .await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].user_id, UserId(5));
        assert!(sink.delivered.lock().is_empty());
    }

    struct PerUserConfigs(HashMap<UserId, AlertThresholdConfig>);

    impl ThresholdSource for PerUserConfigs {
        fn thresholds_for(&self, user_id: UserId) -> AlertThresholdConfig {
            self.0.get(&user_id).cloned().unwrap_or_default()
        }
    }

    #[tokio::test]
    async fn per_user_cooldowns_are_honored() {
        let day = vec![95.0, 96.0, 94.0, 97.0, 95.0];
        let (aggregator, sink) = aggregator(HashMap::from([
            (UserId(7), day.clone()),
            (UserId(8), day),
        ]));
        let configs = PerUserConfigs(HashMap::from([(
            UserId(7),
            AlertThresholdConfig {
                cooldown_seconds: 3,
                ..AlertThresholdConfig::default()
            },
        )]));

        let now = Utc::now();
        aggregator.run_once(&configs, now).await;
        aggregator
            .run_once(&configs, now + chrono::Duration::seconds(5))
            .await;

        // User 7's short cooldown lapsed between runs; user 8 stays
        // suppressed by the default window
        let delivered = sink.delivered.lock();
        let for_user =
            |u: i64| delivered.iter().filter(|(uid, _)| *uid == UserId(u)).count();
        assert_eq!(for_user(7), 2);
        assert_eq!(for_user(8), 1);
    }

    #[tokio::test]
    async fn repeated_run_within_cooldown_alerts_once() {
        let (aggregator, sink) = aggregator(HashMap::from([(
            UserId(6),
            vec![95.0, 96.0, 94.0, 97.0, 95.0],
        )]));

        let now = Utc::now();
        let config = AlertThresholdConfig::default();
        aggregator.run_once(&config, now).await;
        aggregator
            .run_once(&config, now + chrono::Duration::seconds(5))
            .await;
        assert_eq!(sink.delivered.lock().len(), 1);
    }
}
