use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GateError;
use crate::message::SmsMessage;

/// Per-instance fault policy governing error propagation during sends.
///
/// Configuration errors are unaffected: they occur before, or independent
/// of, any backend instance owning this policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendPolicy {
    /// Raise the first fatal error and abandon remaining processing.
    #[default]
    Strict,
    /// Swallow faults, log them, continue with the rest, and return a
    /// best-effort tally of confirmed successes only.
    Lenient,
}

impl SendPolicy {
    pub fn is_lenient(self) -> bool {
        matches!(self, SendPolicy::Lenient)
    }
}

/// What one unit in a backend's success tally stands for.
///
/// Source gateways disagree on whether a multi-recipient envelope counts
/// once per recipient or once per envelope, so every adapter declares its
/// unit here instead of leaving callers to guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuccessUnit {
    PerRecipient,
    PerMessage,
}

/// Outcome of one recipient (or one envelope, per the adapter's
/// [`SuccessUnit`]) within a send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientOutcome {
    pub recipient: String,
    pub status: DeliveryStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// Provider acknowledged the submission; `id` is its message id when
    /// one was returned.
    Sent { id: Option<String> },
    /// Handed off to a delivery worker; no provider acknowledgment yet.
    Queued,
    Failed { reason: String },
}

/// Result of a send: the success tally plus per-recipient outcomes.
///
/// `sent` counts confirmed successes in the backend's declared unit. Under
/// a lenient policy the outcomes also record what was swallowed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReport {
    pub sent: usize,
    pub outcomes: Vec<RecipientOutcome>,
}

impl SendReport {
    pub fn record(&mut self, recipient: impl Into<String>, status: DeliveryStatus) {
        if matches!(status, DeliveryStatus::Sent { .. } | DeliveryStatus::Queued) {
            self.sent += 1;
        }
        self.outcomes.push(RecipientOutcome {
            recipient: recipient.into(),
            status,
        });
    }

    pub fn merge(&mut self, other: SendReport) {
        self.sent += other.sent;
        self.outcomes.extend(other.outcomes);
    }
}

/// Options handed to a backend factory at resolution time.
///
/// `username`/`password` override configured credentials for this instance.
/// `extra` carries opaque adapter-specific settings (timeouts, routes, ...)
/// forwarded verbatim; the core never interprets them.
#[derive(Debug, Clone, Default)]
pub struct BackendOptions {
    pub policy: SendPolicy,
    pub username: Option<String>,
    pub password: Option<String>,
    pub extra: HashMap<String, String>,
}

impl BackendOptions {
    pub fn new(policy: SendPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }
}

/// The contract every gateway adapter implements.
///
/// Lifecycle: Unopened → `open()` → Opened → `close()` → Closed. The
/// default `open`/`close` are no-ops; adapters holding a persistent network
/// resource override both. `open()` returns whether it created a new
/// resource, so the caller knows whether a matching `close()` is owed.
#[async_trait]
pub trait SmsBackend: Send {
    /// The fault policy this instance was constructed with.
    fn policy(&self) -> SendPolicy;

    /// The unit this adapter's tally counts in.
    fn success_unit(&self) -> SuccessUnit;

    async fn open(&mut self) -> Result<bool, GateError> {
        Ok(false)
    }

    async fn close(&mut self) -> Result<(), GateError> {
        Ok(())
    }

    /// Deliver the given envelopes and return the success tally.
    ///
    /// Implementations iterate envelopes (and recipients within each, or
    /// submit them together, per provider). On a fault under
    /// [`SendPolicy::Strict`] they return the first fatal error and abandon
    /// the rest; under [`SendPolicy::Lenient`] they log it, record a failed
    /// outcome, and continue.
    async fn send_messages(&mut self, messages: &[SmsMessage]) -> Result<SendReport, GateError>;
}

impl std::fmt::Debug for dyn SmsBackend + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SmsBackend")
    }
}

/// Pseudo message id for providers that do not return one.
pub fn fallback_id() -> String {
    Uuid::new_v4().to_string()
}
