//! Backend that does nothing.

use async_trait::async_trait;

use crate::backend::{DeliveryStatus, SendPolicy, SendReport, SmsBackend, SuccessUnit};
use crate::error::GateError;
use crate::message::SmsMessage;

/// Accepts every envelope and discards it. Tally unit: per message.
#[derive(Debug, Default)]
pub struct DummyBackend {
    policy: SendPolicy,
}

impl DummyBackend {
    pub fn new(policy: SendPolicy) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl SmsBackend for DummyBackend {
    fn policy(&self) -> SendPolicy {
        self.policy
    }

    fn success_unit(&self) -> SuccessUnit {
        SuccessUnit::PerMessage
    }

    async fn send_messages(&mut self, messages: &[SmsMessage]) -> Result<SendReport, GateError> {
        let mut report = SendReport::default();
        for message in messages {
            report.record(
                message.recipients().join(", "),
                DeliveryStatus::Sent { id: None },
            );
        }
        Ok(report)
    }
}
