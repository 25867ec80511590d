//! Threshold alerting: breach evaluation, notification dispatch and
//! guardian escalation.
//!
//! The evaluator turns vitals and risk assessments into [`AlertEvent`]s
//! with per-(user, metric) cooldown suppression. The dispatcher fans an
//! event out to pluggable notification sinks. The escalation service
//! walks a guardian contact chain after a cancellable grace period.
//!
//! [`AlertEvent`]: crate::domain::alert::AlertEvent

mod dispatcher;
mod evaluator;
mod escalation;

pub use dispatcher::{AlertDispatcher, AlertSink};
pub use escalation::{
    CancelSignal, ContactChannel, EmergencyChannel, EscalationOutcome, EscalationPolicy,
    EscalationService,
};
pub use evaluator::ThresholdEvaluator;
