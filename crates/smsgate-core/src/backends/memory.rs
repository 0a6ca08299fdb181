//! Capture backend for test environments.
//!
//! Envelopes are appended to a caller-owned [`Outbox`] instead of leaving
//! the process, so the dispatch path can be verified without network
//! egress.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::backend::{DeliveryStatus, SendPolicy, SendReport, SmsBackend, SuccessUnit};
use crate::error::GateError;
use crate::message::SmsMessage;

/// Cloneable handle to a capture sink.
///
/// Constructed by the test (or host application) and injected into
/// [`MemoryBackend`]; clones share the same underlying sink.
#[derive(Debug, Clone, Default)]
pub struct Outbox {
    inner: Arc<Mutex<Vec<SmsMessage>>>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, message: SmsMessage) {
        self.lock().push(message);
    }

    /// Snapshot of everything captured so far.
    pub fn messages(&self) -> Vec<SmsMessage> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<SmsMessage>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Appends every envelope to its [`Outbox`]. Tally unit: per recipient.
#[derive(Debug)]
pub struct MemoryBackend {
    policy: SendPolicy,
    outbox: Outbox,
}

impl MemoryBackend {
    pub fn new(policy: SendPolicy, outbox: Outbox) -> Self {
        Self { policy, outbox }
    }
}

#[async_trait]
impl SmsBackend for MemoryBackend {
    fn policy(&self) -> SendPolicy {
        self.policy
    }

    fn success_unit(&self) -> SuccessUnit {
        SuccessUnit::PerRecipient
    }

    async fn send_messages(&mut self, messages: &[SmsMessage]) -> Result<SendReport, GateError> {
        let mut report = SendReport::default();
        for message in messages {
            self.outbox.push(message.clone());
            for recipient in message.recipients() {
                report.record(recipient.clone(), DeliveryStatus::Sent { id: None });
            }
        }
        Ok(report)
    }
}
