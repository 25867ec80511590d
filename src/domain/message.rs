//! Wire message contracts for the realtime and notification boundaries.

use serde::{Deserialize, Serialize};

use super::alert::{AlertEvent, AlertSeverity, TriggerMetric};
use super::vitals::VitalSigns;
use super::UserId;

/// Inbound signal feed message from a device or client.
///
/// ```json
/// {"type": "ecg_sample", "userId": 1, "value": 0.42, "timestamp": 1712000000000}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignalFeed {
    /// A vital-sign reading
    #[serde(rename_all = "camelCase")]
    HealthData {
        /// User the reading belongs to
        user_id: UserId,
        /// The reading itself
        vitals: VitalSigns,
        /// Device capture time in Unix milliseconds
        timestamp: i64,
    },
    /// A single ECG sample
    #[serde(rename_all = "camelCase")]
    EcgSample {
        /// User the sample belongs to
        user_id: UserId,
        /// Sample amplitude
        value: f64,
        /// Device capture time in Unix milliseconds
        timestamp: i64,
    },
}

impl SignalFeed {
    /// User the feed message belongs to.
    pub fn user_id(&self) -> UserId {
        match self {
            SignalFeed::HealthData { user_id, .. } | SignalFeed::EcgSample { user_id, .. } => {
                *user_id
            }
        }
    }
}

/// Outbound realtime message envelope.
///
/// Serialized as `{"type": ..., "payload": ..., "timestamp": ...}` and
/// delivered through the broadcast manager to any subscribed transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeMessage {
    /// Typed message payload
    #[serde(flatten)]
    pub payload: RealtimePayload,
    /// Send time in Unix milliseconds
    pub timestamp: i64,
}

impl RealtimeMessage {
    /// Wrap a payload with the current time.
    pub fn now(payload: RealtimePayload) -> Self {
        Self {
            payload,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Payload variants for [`RealtimeMessage`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum RealtimePayload {
    /// Keep-alive ping
    Ping,
    /// A vital-sign update for the subscribed user
    HealthData(VitalSigns),
    /// An alert event for the subscribed user
    Alert(AlertEvent),
    /// Connection lifecycle notification
    #[serde(rename_all = "camelCase")]
    ConnectionStatus {
        /// `connected` or `closing`
        status: String,
        /// Human-readable detail
        message: String,
    },
}

/// Transport-agnostic alert dispatch contract for external
/// notification senders. Provider-specific fields (FCM/APNs) are the
/// collaborator's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationMessage {
    /// Notification title
    pub title: String,
    /// Notification body text
    pub body: String,
    /// Structured alert data
    pub data: NotificationData,
}

/// Structured data block of a [`NotificationMessage`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationData {
    /// Message discriminator for the receiving client
    #[serde(rename = "type")]
    pub kind: String,
    /// Metric that triggered the alert
    pub metric: TriggerMetric,
    /// Observed value
    pub value: f64,
    /// Configured threshold
    pub threshold: f64,
    /// Alert severity
    pub severity: AlertSeverity,
}

impl NotificationMessage {
    /// Build the dispatch contract from an alert event.
    pub fn from_alert(title: impl Into<String>, alert: &AlertEvent) -> Self {
        Self {
            title: title.into(),
            body: alert.message.clone(),
            data: NotificationData {
                kind: "threshold_alert".to_string(),
                metric: alert.triggering_metric,
                value: alert.value,
                threshold: alert.threshold,
                severity: alert.severity,
            },
        }
    }
}
