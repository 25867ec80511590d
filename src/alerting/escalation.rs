//! Guardian escalation chain with a cancellable grace period.
//!
//! When a serious alert fires, the service waits a grace period so the
//! subject or a guardian can cancel, re-checks the condition, and only
//! then works through the contact list in priority order. The first
//! acknowledgment stops the chain; exhausting it either calls emergency
//! services or surfaces an unresolved emergency, never a silent drop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tracing::{error, info, warn};

use crate::domain::alert::{AlertEvent, AlertThresholdConfig, GuardianContact};
use crate::domain::UserId;
use crate::{HeartwatchError, Result};

/// Explicit external cancellation for a pending escalation.
///
/// Cancelling is idempotent and effective even if it happens before
/// the escalation starts waiting.
#[derive(Clone, Default)]
pub struct CancelSignal {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the pending escalation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Places a call or message to one guardian contact. Returns whether
/// the contact acknowledged.
#[async_trait]
pub trait ContactChannel: Send + Sync {
    async fn reach(&self, contact: &GuardianContact, alert: &AlertEvent) -> Result<bool>;
}

/// Terminal escalation to emergency services.
#[async_trait]
pub trait EmergencyChannel: Send + Sync {
    async fn call_emergency(&self, user_id: UserId, alert: &AlertEvent) -> Result<()>;
}

/// Escalation parameters for one run.
#[derive(Clone)]
pub struct EscalationPolicy {
    /// Contacts to try, in any order; the service sorts by priority
    pub contacts: Vec<GuardianContact>,
    /// Call emergency services when the chain is exhausted
    pub escalate_to_119: bool,
    /// Grace period before the first contact attempt
    pub delay_before_call: Duration,
}

impl EscalationPolicy {
    /// Derive a policy from a user's threshold configuration.
    pub fn from_config(config: &AlertThresholdConfig, contacts: Vec<GuardianContact>) -> Self {
        Self {
            contacts,
            escalate_to_119: config.escalate_to_119,
            delay_before_call: Duration::from_secs(config.delay_before_call_secs),
        }
    }
}

/// How an escalation run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscalationOutcome {
    /// Explicitly cancelled during the grace period or chain
    Cancelled,
    /// The condition no longer held after the grace period
    ClearedOnRecheck,
    /// A guardian acknowledged; the chain stopped there
    Acknowledged { contact: String },
    /// The chain was exhausted and emergency services were called
    EmergencyServicesCalled,
    /// The chain was exhausted with no acknowledgment and emergency
    /// escalation disabled
    Unresolved,
}

impl EscalationOutcome {
    /// Convert an unresolved outcome into its typed error so callers
    /// that must not drop it can propagate with `?`.
    pub fn ensure_resolved(self, user_id: UserId) -> Result<EscalationOutcome> {
        match self {
            EscalationOutcome::Unresolved => Err(HeartwatchError::EmergencyUnresolved {
                user_id,
                reason: "no guardian contact acknowledged".into(),
            }),
            other => Ok(other),
        }
    }
}

/// Runs escalation chains over injected contact and emergency channels.
pub struct EscalationService {
    contacts: Arc<dyn ContactChannel>,
    emergency: Arc<dyn EmergencyChannel>,
}

impl EscalationService {
    pub fn new(contacts: Arc<dyn ContactChannel>, emergency: Arc<dyn EmergencyChannel>) -> Self {
        Self { contacts, emergency }
    }

    /// Run one escalation for `alert`.
    ///
    /// `still_breached` is consulted once, after the grace period; a
    /// reading that has returned to normal aborts the chain with no
    /// contact attempts. `cancel` aborts at any suspension point.
    pub async fn run<F>(
        &self,
        alert: &AlertEvent,
        policy: &EscalationPolicy,
        still_breached: F,
        cancel: &CancelSignal,
    ) -> Result<EscalationOutcome>
    where
        F: Fn() -> bool + Send,
    {
        tokio::select! {
            _ = tokio::time::sleep(policy.delay_before_call) => {}
            _ = cancel.wait() => {
                info!(user_id = %alert.user_id, "escalation cancelled during grace period");
                return Ok(EscalationOutcome::Cancelled);
            }
        }

        if !still_breached() {
            info!(user_id = %alert.user_id, "condition cleared on recheck, escalation aborted");
            return Ok(EscalationOutcome::ClearedOnRecheck);
        }

        let mut contacts = policy.contacts.clone();
        contacts.sort_by_key(|c| c.priority);

        for contact in &contacts {
            if cancel.is_cancelled() {
                info!(user_id = %alert.user_id, "escalation cancelled mid-chain");
                return Ok(EscalationOutcome::Cancelled);
            }

            let reached = tokio::select! {
                result = self.contacts.reach(contact, alert) => result,
                _ = cancel.wait() => {
                    info!(user_id = %alert.user_id, "escalation cancelled mid-chain");
                    return Ok(EscalationOutcome::Cancelled);
                }
            };

            match reached {
                Ok(true) => {
                    info!(
                        user_id = %alert.user_id,
                        contact = %contact.name,
                        priority = contact.priority,
                        "guardian acknowledged alert"
                    );
                    return Ok(EscalationOutcome::Acknowledged {
                        contact: contact.name.clone(),
                    });
                }
                Ok(false) => {
                    info!(
                        user_id = %alert.user_id,
                        contact = %contact.name,
                        "guardian did not acknowledge, trying next"
                    );
                }
                Err(err) => {
                    warn!(
                        user_id = %alert.user_id,
                        contact = %contact.name,
                        error = %err,
                        "contact channel failed, trying next"
                    );
                }
            }
        }

        if policy.escalate_to_119 {
            self.emergency.call_emergency(alert.user_id, alert).await?;
            info!(user_id = %alert.user_id, "emergency services called");
            return Ok(EscalationOutcome::EmergencyServicesCalled);
        }

        error!(
            user_id = %alert.user_id,
            metric = %alert.triggering_metric,
            "escalation exhausted with no acknowledgment"
        );
        Ok(EscalationOutcome::Unresolved)
    }
}
