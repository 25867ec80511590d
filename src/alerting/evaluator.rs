//! Per-(user, metric) breach evaluation with cooldown suppression.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::domain::alert::{AlertEvent, AlertSeverity, AlertThresholdConfig, TriggerMetric};
use crate::domain::vitals::VitalSigns;
use crate::domain::UserId;
use crate::risk::{RiskAssessment, RiskLevel};

/// Evaluates observations against per-user thresholds.
///
/// Each (user, metric) pair moves through Idle, Breached and Cooldown.
/// A breach from Idle emits exactly one event and starts the cooldown;
/// while the cooldown runs, further breaches of the same metric are
/// suppressed. Once it expires the pair is Idle again, so a value that
/// is still out of bounds emits a fresh event immediately.
///
/// Bound comparisons are strict: a value exactly at a bound is not a
/// breach. Evaluation takes an explicit `now` so cooldown behavior is
/// deterministic under test.
#[derive(Debug, Default)]
pub struct ThresholdEvaluator {
    cooldowns: RwLock<HashMap<(UserId, TriggerMetric), DateTime<Utc>>>,
}

impl ThresholdEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate a vitals reading. Returns at most one event per metric.
    pub fn evaluate_vitals(
        &self,
        user_id: UserId,
        config: &AlertThresholdConfig,
        vitals: &VitalSigns,
        now: DateTime<Utc>,
    ) -> Vec<AlertEvent> {
        let mut events = Vec::new();

        if let Some(hr) = vitals.heart_rate {
            if hr > config.heart_rate_high {
                self.emit(
                    &mut events,
                    user_id,
                    config,
                    TriggerMetric::HeartRate,
                    AlertSeverity::Risk,
                    format!("Heart rate {hr:.0} bpm above limit {:.0}", config.heart_rate_high),
                    hr,
                    config.heart_rate_high,
                    now,
                );
            } else if hr < config.heart_rate_low {
                self.emit(
                    &mut events,
                    user_id,
                    config,
                    TriggerMetric::HeartRate,
                    AlertSeverity::Risk,
                    format!("Heart rate {hr:.0} bpm below limit {:.0}", config.heart_rate_low),
                    hr,
                    config.heart_rate_low,
                    now,
                );
            }
        }

        if let Some(oxygen) = vitals.oxygen_level {
            if oxygen < config.oxygen_low {
                self.emit(
                    &mut events,
                    user_id,
                    config,
                    TriggerMetric::Oxygen,
                    AlertSeverity::Risk,
                    format!("SpO2 {oxygen:.0}% below limit {:.0}%", config.oxygen_low),
                    oxygen,
                    config.oxygen_low,
                    now,
                );
            }
        }

        events
    }

    /// Evaluate a computed risk assessment. Moderate maps to a warning,
    /// high and critical to a risk alert; low never alerts. The event's
    /// threshold is the lower bound of the band reached.
    pub fn evaluate_risk_score(
        &self,
        user_id: UserId,
        config: &AlertThresholdConfig,
        assessment: &RiskAssessment,
        now: DateTime<Utc>,
    ) -> Option<AlertEvent> {
        let (severity, band_floor) = match assessment.level {
            RiskLevel::Low => return None,
            RiskLevel::Moderate => (AlertSeverity::Warning, 25.0),
            RiskLevel::High => (AlertSeverity::Risk, 50.0),
            RiskLevel::Critical => (AlertSeverity::Risk, 75.0),
        };

        let mut events = Vec::new();
        self.emit(
            &mut events,
            user_id,
            config,
            TriggerMetric::RiskScore,
            severity,
            format!(
                "Cardiovascular risk score {} ({})",
                assessment.score, assessment.level
            ),
            f64::from(assessment.score),
            band_floor,
            now,
        );
        events.pop()
    }

    /// Emit an externally-constructed event (aggregation reports) under
    /// the same cooldown discipline.
    pub fn emit_event(
        &self,
        config: &AlertThresholdConfig,
        event: AlertEvent,
        now: DateTime<Utc>,
    ) -> Option<AlertEvent> {
        let key = (event.user_id, event.triggering_metric);
        if self.in_cooldown(key, config.cooldown_seconds, now) {
            debug!(
                user_id = %event.user_id,
                metric = %event.triggering_metric,
                "alert suppressed by cooldown"
            );
            return None;
        }
        self.cooldowns.write().insert(key, now);
        info!(
            user_id = %event.user_id,
            metric = %event.triggering_metric,
            severity = %event.severity,
            value = event.value,
            "alert emitted"
        );
        Some(event)
    }

    /// Drop all cooldown state for a user, e.g. when the session ends.
    pub fn reset_user(&self, user_id: UserId) {
        self.cooldowns.write().retain(|(uid, _), _| *uid != user_id);
    }

    #[allow(clippy::too_many_arguments)]
    fn emit(
        &self,
        events: &mut Vec<AlertEvent>,
        user_id: UserId,
        config: &AlertThresholdConfig,
        metric: TriggerMetric,
        severity: AlertSeverity,
        message: String,
        value: f64,
        threshold: f64,
        now: DateTime<Utc>,
    ) {
        let event = AlertEvent::new(user_id, severity, message, metric, value, threshold, now);
        if let Some(event) = self.emit_event(config, event, now) {
            events.push(event);
        }
    }

    fn in_cooldown(
        &self,
        key: (UserId, TriggerMetric),
        cooldown_seconds: u64,
        now: DateTime<Utc>,
    ) -> bool {
        let cooldowns = self.cooldowns.read();
        match cooldowns.get(&key) {
            Some(started) => now < *started + Duration::seconds(cooldown_seconds as i64),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn reading(hr: f64) -> VitalSigns {
        VitalSigns {
            heart_rate: Some(hr),
            ..VitalSigns::empty()
        }
    }

    #[test]
    fn breach_emits_single_event() {
        let evaluator = ThresholdEvaluator::new();
        let config = AlertThresholdConfig::default();
        let events = evaluator.evaluate_vitals(UserId(1), &config, &reading(140.0), at(0));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].triggering_metric, TriggerMetric::HeartRate);
        assert_eq!(events[0].severity, AlertSeverity::Risk);
    }

    #[test]
    fn value_at_bound_is_not_a_breach() {
        let evaluator = ThresholdEvaluator::new();
        let config = AlertThresholdConfig::default();
        // Exactly at both bounds: not a breach on either side
        let high = evaluator.evaluate_vitals(UserId(1), &config, &reading(120.0), at(0));
        assert!(high.is_empty());
        let low = evaluator.evaluate_vitals(UserId(1), &config, &reading(50.0), at(1));
        assert!(low.is_empty());
        // One past the bound breaches
        let over = evaluator.evaluate_vitals(UserId(1), &config, &reading(121.0), at(2));
        assert_eq!(over.len(), 1);
    }

    #[test]
    fn cooldown_suppresses_then_re_emits() {
        let evaluator = ThresholdEvaluator::new();
        let config = AlertThresholdConfig {
            cooldown_seconds: 30,
            ..AlertThresholdConfig::default()
        };
        let user = UserId(7);

        let first = evaluator.evaluate_vitals(user, &config, &reading(150.0), at(0));
        assert_eq!(first.len(), 1);

        // Second breach 5 seconds later is suppressed
        let second = evaluator.evaluate_vitals(user, &config, &reading(155.0), at(5));
        assert!(second.is_empty());

        // Third breach after cooldown expiry emits again
        let third = evaluator.evaluate_vitals(user, &config, &reading(150.0), at(35));
        assert_eq!(third.len(), 1);
    }

    #[test]
    fn cooldown_is_keyed_per_metric() {
        let evaluator = ThresholdEvaluator::new();
        let config = AlertThresholdConfig::default();
        let user = UserId(2);

        let hr = evaluator.evaluate_vitals(user, &config, &reading(150.0), at(0));
        assert_eq!(hr.len(), 1);

        // A different metric for the same user is not suppressed
        let vitals = VitalSigns {
            oxygen_level: Some(85.0),
            ..VitalSigns::empty()
        };
        let oxygen = evaluator.evaluate_vitals(user, &config, &vitals, at(1));
        assert_eq!(oxygen.len(), 1);
        assert_eq!(oxygen[0].triggering_metric, TriggerMetric::Oxygen);
    }

    #[test]
    fn cooldown_is_keyed_per_user() {
        let evaluator = ThresholdEvaluator::new();
        let config = AlertThresholdConfig::default();

        assert_eq!(
            evaluator
                .evaluate_vitals(UserId(1), &config, &reading(150.0), at(0))
                .len(),
            1
        );
        assert_eq!(
            evaluator
                .evaluate_vitals(UserId(2), &config, &reading(150.0), at(1))
                .len(),
            1
        );
    }

    #[test]
    fn risk_levels_map_to_severities() {
        let evaluator = ThresholdEvaluator::new();
        let config = AlertThresholdConfig::default();
        let scorer = crate::risk::RiskScorer::default();

        let low = scorer.score(&crate::risk::RiskInput {
            age: Some(35),
            ..Default::default()
        });
        assert!(evaluator
            .evaluate_risk_score(UserId(1), &config, &low, at(0))
            .is_none());

        let critical = scorer.score(&crate::risk::RiskInput {
            heart_rate: Some(180.0),
            oxygen_level: Some(85.0),
            ..Default::default()
        });
        let event = evaluator
            .evaluate_risk_score(UserId(1), &config, &critical, at(1))
            .unwrap();
        assert_eq!(event.severity, AlertSeverity::Risk);
        assert_eq!(event.triggering_metric, TriggerMetric::RiskScore);
        assert_eq!(event.threshold, 75.0);
    }

    #[test]
    fn reset_clears_only_that_user() {
        let evaluator = ThresholdEvaluator::new();
        let config = AlertThresholdConfig::default();

        evaluator.evaluate_vitals(UserId(1), &config, &reading(150.0), at(0));
        evaluator.evaluate_vitals(UserId(2), &config, &reading(150.0), at(0));
        evaluator.reset_user(UserId(1));

        // User 1 alerts again immediately, user 2 is still cooling down
        assert_eq!(
            evaluator
                .evaluate_vitals(UserId(1), &config, &reading(150.0), at(1))
                .len(),
            1
        );
        assert!(evaluator
            .evaluate_vitals(UserId(2), &config, &reading(150.0), at(1))
            .is_empty());
    }
}
