//! Alert events and per-user threshold configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserId;

/// Severity of an emitted alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    /// Informational (aggregation reports, call confirmations)
    Info,
    /// Attention needed, not immediately dangerous
    Warning,
    /// Physiological threshold breach
    Risk,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertSeverity::Info => write!(f, "info"),
            AlertSeverity::Warning => write!(f, "warning"),
            AlertSeverity::Risk => write!(f, "risk"),
        }
    }
}

/// The metric whose threshold breach triggered an alert.
///
/// Deduplication is keyed on `(user, metric)`: while a metric is in
/// cooldown, further breaches of the same metric are suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerMetric {
    /// Heart rate (bpm), high or low bound
    HeartRate,
    /// Oxygen saturation (%), low bound
    Oxygen,
    /// Combined cardiovascular risk score
    RiskScore,
    /// Daily aggregate statistics out of normal bounds
    DailyAggregate,
}

impl std::fmt::Display for TriggerMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerMetric::HeartRate => write!(f, "heart_rate"),
            TriggerMetric::Oxygen => write!(f, "oxygen"),
            TriggerMetric::RiskScore => write!(f, "risk_score"),
            TriggerMetric::DailyAggregate => write!(f, "daily_aggregate"),
        }
    }
}

/// An alert emitted by the threshold evaluator.
///
/// Immutable once created; its lifecycle ends when a collaborator
/// acknowledges or reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertEvent {
    /// Unique alert identifier
    pub id: Uuid,
    /// User the alert belongs to
    pub user_id: UserId,
    /// Alert severity
    pub severity: AlertSeverity,
    /// Human-readable message
    pub message: String,
    /// Metric that breached
    pub triggering_metric: TriggerMetric,
    /// Observed value at breach time
    pub value: f64,
    /// Configured threshold that was crossed
    pub threshold: f64,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl AlertEvent {
    /// Create a new alert event timestamped at `created_at`.
    pub fn new(
        user_id: UserId,
        severity: AlertSeverity,
        message: impl Into<String>,
        triggering_metric: TriggerMetric,
        value: f64,
        threshold: f64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            severity,
            message: message.into(),
            triggering_metric,
            value,
            threshold,
            created_at,
        }
    }
}

/// Per-user alert threshold configuration.
///
/// Mutated only through explicit settings updates; the evaluator reads
/// a snapshot per evaluation. Bound comparisons are strict: a value
/// exactly at a bound is not a breach.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertThresholdConfig {
    /// Heart rate upper bound (bpm); breach when value > bound
    pub heart_rate_high: f64,
    /// Heart rate lower bound (bpm); breach when value < bound
    pub heart_rate_low: f64,
    /// Oxygen saturation lower bound (%); breach when value < bound
    pub oxygen_low: f64,
    /// Suppression window for repeated same-metric alerts
    pub cooldown_seconds: u64,
    /// Call emergency services when the guardian chain is exhausted
    pub escalate_to_119: bool,
    /// Grace period before the escalation chain starts
    pub delay_before_call_secs: u64,
}

impl Default for AlertThresholdConfig {
    fn default() -> Self {
        Self {
            heart_rate_high: 120.0,
            heart_rate_low: 50.0,
            oxygen_low: 90.0,
            cooldown_seconds: 60,
            escalate_to_119: false,
            delay_before_call_secs: 30,
        }
    }
}

/// An emergency contact tried during guardian escalation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardianContact {
    /// Display name
    pub name: String,
    /// Phone number used by the contact channel
    pub phone_number: String,
    /// Dispatch order; contacts are tried by ascending priority
    pub priority: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_event_round_trips_through_json() {
        let event = AlertEvent::new(
            UserId(3),
            AlertSeverity::Risk,
            "heart rate above limit",
            TriggerMetric::HeartRate,
            142.0,
            120.0,
            Utc::now(),
        );
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"severity\":\"risk\""));
        assert!(json.contains("\"triggeringMetric\":\"heart_rate\""));

        let back: AlertEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, event.id);
        assert_eq!(back.triggering_metric, TriggerMetric::HeartRate);
    }

    #[test]
    fn default_thresholds_are_sane() {
        let cfg = AlertThresholdConfig::default();
        assert!(cfg.heart_rate_low < cfg.heart_rate_high);
        assert!(cfg.oxygen_low < 100.0);
        assert!(!cfg.escalate_to_119);
    }
}
