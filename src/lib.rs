//! # Heartwatch
//!
//! Core pipeline for a realtime cardiovascular monitoring service:
//! synthetic ECG waveform generation, signal feature extraction,
//! multi-factor risk scoring, threshold alerting with guardian
//! escalation, and realtime fan-out to subscribed clients.
//!
//! ## Architecture
//!
//! Data flows leaf-to-root through five components:
//!
//! ```text
//! ┌────────────┐   ┌───────────┐   ┌────────┐   ┌───────────┐   ┌───────────┐
//! │  Waveform  │──▶│  Feature  │──▶│  Risk  │──▶│ Threshold │──▶│ Broadcast │
//! │ Synthesizer│   │ Extractor │   │ Scorer │   │ Evaluator │   │  Manager  │
//! └────────────┘   └───────────┘   └────────┘   └───────────┘   └───────────┘
//! ```
//!
//! Feature extraction and scoring are pure synchronous computations;
//! the synthesizer's streaming mode, the broadcast heartbeat and the
//! escalation grace timer run as independently cancellable tokio tasks.
//!
//! ## Example
//!
//! ```
//! use heartwatch::waveform::{EcgPattern, WaveformConfig, WaveformGenerator};
//! use heartwatch::features::FeatureExtractor;
//! use heartwatch::risk::{RiskInput, RiskScorer};
//!
//! let config = WaveformConfig {
//!     pattern: EcgPattern::StElevation,
//!     heart_rate: 90,
//!     duration_secs: 10.0,
//!     amplitude: 1.0,
//!     noise_level: 0.03,
//! };
//! let mut generator = WaveformGenerator::with_seed(config, 42).unwrap();
//! let samples = generator.generate();
//!
//! let extractor = FeatureExtractor::default();
//! let features = extractor.extract_from_values(&samples);
//!
//! let scorer = RiskScorer::default();
//! let assessment = scorer.score(&RiskInput {
//!     ecg_features: Some(features.features.clone()),
//!     ..Default::default()
//! });
//! assert!(assessment.score <= 100);
//! ```

pub mod aggregation;
pub mod alerting;
pub mod api;
pub mod domain;
pub mod features;
pub mod realtime;
pub mod risk;
pub mod waveform;

pub use domain::{
    alert::{AlertEvent, AlertSeverity, AlertThresholdConfig, GuardianContact, TriggerMetric},
    message::{NotificationMessage, RealtimeMessage, RealtimePayload, SignalFeed},
    sample::SampleBuffer,
    vitals::VitalSigns,
    UserId,
};

pub use aggregation::{DailyAggregator, DailyReport, ThresholdSource, VitalsSource};
pub use alerting::{
    AlertDispatcher, AlertSink, CancelSignal, ContactChannel, EmergencyChannel, EscalationOutcome,
    EscalationPolicy, EscalationService, ThresholdEvaluator,
};
pub use features::{EcgFeatureSet, ExtractorConfig, FeatureExtractor, SignalStatus};
pub use realtime::{BroadcastManager, ConnectionId, ConnectionSink};
pub use risk::{EcgFeature, RiskAssessment, RiskFactor, RiskInput, RiskLevel, RiskScorer};
pub use waveform::{EcgPattern, StreamHandle, WaveformConfig, WaveformGenerator};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common result type for heartwatch operations
pub type Result<T> = std::result::Result<T, HeartwatchError>;

/// Unified error type for the monitoring core.
///
/// Every failure class is a distinct variant so callers can branch
/// without string matching. Expected steady-state conditions
/// (under-filled sample buffers, risk scoring with no usable input)
/// are in-band results, not errors.
#[derive(Debug, thiserror::Error)]
pub enum HeartwatchError {
    /// Malformed waveform or threshold configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Alert evaluation/dispatch error
    #[error("alerting error: {0}")]
    Alerting(String),

    /// Delivery to a realtime subscriber failed
    #[error("delivery failed: {0}")]
    Delivery(String),

    /// Guardian escalation exhausted without acknowledgment
    #[error("emergency unresolved for user {user_id}: {reason}")]
    EmergencyUnresolved {
        /// User whose escalation went unanswered
        user_id: UserId,
        /// Why the chain terminated
        reason: String,
    },

    /// Message (de)serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
