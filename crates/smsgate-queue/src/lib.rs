//! Queue hand-off backend.
//!
//! Wraps any inner backend and makes `send_messages` return immediately:
//! batches are enqueued to a background delivery worker that forwards them
//! to the wrapped backend. Swapping a direct backend for this one changes
//! nothing above the connection resolver — the interface is identical, only
//! the latency moves.
//!
//! The tally counts envelopes *queued*, not delivered; delivery faults
//! surface in the worker's logs, governed by the inner backend's own
//! policy. Tally unit: per message.

use async_trait::async_trait;
use smsgate_core::{
    DeliveryStatus, GateError, SendPolicy, SendReport, SmsBackend, SmsMessage, SuccessUnit,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Identifier to register this backend under.
pub const BACKEND_PATH: &str = "smsgate::backends::queue::QueueBackend";

/// Enqueues batches for a background worker driving an inner backend.
pub struct QueueBackend {
    policy: SendPolicy,
    tx: Option<mpsc::UnboundedSender<Vec<SmsMessage>>>,
    worker: Option<JoinHandle<()>>,
}

impl QueueBackend {
    /// Spawn the delivery worker around `inner`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(policy: SendPolicy, inner: Box<dyn SmsBackend>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<SmsMessage>>();
        let worker = tokio::spawn(async move {
            let mut inner = inner;
            while let Some(batch) = rx.recv().await {
                debug!(messages = batch.len(), "delivering queued batch");
                if let Err(e) = inner.send_messages(&batch).await {
                    warn!(error = %e, "queued batch delivery failed");
                }
            }
        });
        Self {
            policy,
            tx: Some(tx),
            worker: Some(worker),
        }
    }
}

#[async_trait]
impl SmsBackend for QueueBackend {
    fn policy(&self) -> SendPolicy {
        self.policy
    }

    fn success_unit(&self) -> SuccessUnit {
        SuccessUnit::PerMessage
    }

    /// Stop accepting batches and wait for the worker to drain the queue.
    async fn close(&mut self) -> Result<(), GateError> {
        self.tx = None;
        if let Some(worker) = self.worker.take() {
            worker
                .await
                .map_err(|e| GateError::Transport(format!("delivery worker failed: {e}")))?;
        }
        Ok(())
    }

    async fn send_messages(&mut self, messages: &[SmsMessage]) -> Result<SendReport, GateError> {
        let mut report = SendReport::default();
        if messages.is_empty() {
            return Ok(report);
        }

        let Some(tx) = &self.tx else {
            let err = GateError::Transport("delivery queue is closed".into());
            if self.policy.is_lenient() {
                warn!(error = %err, "dropping batch");
                return Ok(report);
            }
            return Err(err);
        };
        if tx.send(messages.to_vec()).is_err() {
            let err = GateError::Transport("delivery worker stopped".into());
            if self.policy.is_lenient() {
                warn!(error = %err, "dropping batch");
                return Ok(report);
            }
            return Err(err);
        }

        for message in messages {
            report.record(message.recipients().join(", "), DeliveryStatus::Queued);
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smsgate_core::backends::memory::{MemoryBackend, Outbox};

    #[tokio::test]
    async fn batches_are_delivered_by_the_worker() {
        let outbox = Outbox::new();
        let inner = Box::new(MemoryBackend::new(SendPolicy::Strict, outbox.clone()));
        let mut backend = QueueBackend::new(SendPolicy::Strict, inner);

        let report = backend
            .send_messages(&[SmsMessage::new("hi", "111", ["222"], false)])
            .await
            .unwrap();
        assert_eq!(report.sent, 1);
        assert!(matches!(report.outcomes[0].status, DeliveryStatus::Queued));

        // close() drains the queue before returning.
        backend.close().await.unwrap();
        assert_eq!(outbox.len(), 1);
    }

    #[tokio::test]
    async fn strict_send_after_close_is_a_transport_error() {
        let outbox = Outbox::new();
        let inner = Box::new(MemoryBackend::new(SendPolicy::Strict, outbox.clone()));
        let mut backend = QueueBackend::new(SendPolicy::Strict, inner);
        backend.close().await.unwrap();

        let err = backend
            .send_messages(&[SmsMessage::new("hi", "111", ["222"], false)])
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::Transport(_)));
    }

    #[tokio::test]
    async fn lenient_send_after_close_returns_an_empty_tally() {
        let outbox = Outbox::new();
        let inner = Box::new(MemoryBackend::new(SendPolicy::Lenient, outbox.clone()));
        let mut backend = QueueBackend::new(SendPolicy::Lenient, inner);
        backend.close().await.unwrap();

        let report = backend
            .send_messages(&[SmsMessage::new("hi", "111", ["222"], false)])
            .await
            .unwrap();
        assert_eq!(report.sent, 0);
        assert!(outbox.is_empty());
    }
}
