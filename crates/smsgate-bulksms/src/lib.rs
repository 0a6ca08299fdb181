//! BulkSMS gateway backend (<https://www.bulksms.com>).
//!
//! Submits the whole batch as one JSON POST against the v1 messages API,
//! authenticated with a token id/secret pair. Tally unit: per recipient —
//! BulkSMS creates one message per recipient and reports each in its
//! response array.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use smsgate_core::{
    fallback_id, DeliveryStatus, GateError, SendPolicy, SendReport, SmsBackend, SmsMessage,
    SuccessUnit,
};
use tracing::{debug, warn};

const PROVIDER: &str = "bulksms";
const DEFAULT_BASE_URL: &str = "https://api.bulksms.com";

/// Identifier to register this backend under.
pub const BACKEND_PATH: &str = "smsgate::backends::bulksms::BulkSmsBackend";

/// BulkSMS REST backend.
#[derive(Debug, Clone)]
pub struct BulkSmsBackend {
    policy: SendPolicy,
    token_id: String,
    token_secret: String,
    base_url: String,
    unicode: bool,
    http: reqwest::Client,
}

impl BulkSmsBackend {
    pub fn new<S: Into<String>>(policy: SendPolicy, token_id: S, token_secret: S) -> Self {
        Self::with_base_url(policy, token_id, token_secret, DEFAULT_BASE_URL.to_string())
    }

    /// Override the API base URL for testing/mocking.
    pub fn with_base_url<S: Into<String>>(
        policy: SendPolicy,
        token_id: S,
        token_secret: S,
        base_url: String,
    ) -> Self {
        Self {
            policy,
            token_id: token_id.into(),
            token_secret: token_secret.into(),
            base_url,
            unicode: true,
            http: reqwest::Client::new(),
        }
    }

    /// Whether to request UNICODE encoding for every entry (on by default).
    pub fn unicode(mut self, unicode: bool) -> Self {
        self.unicode = unicode;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct BulkSmsEntry<'a> {
    from: &'a str,
    to: &'a [String],
    body: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    encoding: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
struct BulkSmsCreated {
    id: Option<String>,
    to: Option<String>,
}

fn batch_payload<'a>(messages: &'a [SmsMessage], unicode: bool) -> Vec<BulkSmsEntry<'a>> {
    messages
        .iter()
        .map(|message| BulkSmsEntry {
            from: message.sender(),
            to: message.recipients(),
            body: message.body(),
            encoding: unicode.then_some("UNICODE"),
        })
        .collect()
}

#[async_trait]
impl SmsBackend for BulkSmsBackend {
    fn policy(&self) -> SendPolicy {
        self.policy
    }

    fn success_unit(&self) -> SuccessUnit {
        SuccessUnit::PerRecipient
    }

    async fn send_messages(&mut self, messages: &[SmsMessage]) -> Result<SendReport, GateError> {
        let mut report = SendReport::default();
        if messages.is_empty() {
            return Ok(report);
        }

        for message in messages {
            if message.body().is_empty() {
                let err = GateError::Validation("message body is empty".into());
                if !self.policy.is_lenient() {
                    return Err(err);
                }
                warn!(provider = PROVIDER, error = %err, "skipping invalid message");
            }
        }
        let valid: Vec<&SmsMessage> = messages.iter().filter(|m| !m.body().is_empty()).collect();
        let failed_recipients: Vec<&SmsMessage> =
            messages.iter().filter(|m| m.body().is_empty()).collect();
        for message in &failed_recipients {
            for recipient in message.recipients() {
                report.record(recipient.clone(), DeliveryStatus::Failed {
                    reason: "message body is empty".into(),
                });
            }
        }
        if valid.is_empty() {
            return Ok(report);
        }

        let owned: Vec<SmsMessage> = valid.into_iter().cloned().collect();
        let payload = batch_payload(&owned, self.unicode);
        debug!(provider = PROVIDER, entries = payload.len(), "submitting batch");

        let response = self
            .http
            .post(self.endpoint())
            .basic_auth(&self.token_id, Some(&self.token_secret))
            .json(&payload)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                let err = GateError::Transport(e.to_string());
                if self.policy.is_lenient() {
                    warn!(provider = PROVIDER, error = %err, "batch submission failed");
                    record_batch_failure(&mut report, &owned, &err);
                    return Ok(report);
                }
                return Err(err);
            }
        };

        let status = response.status();
        if status.as_u16() != 201 {
            let body = response.text().await.unwrap_or_default();
            let err = GateError::Protocol(format!("HTTP {status}: {body}"));
            if self.policy.is_lenient() {
                warn!(provider = PROVIDER, error = %err, "batch rejected");
                record_batch_failure(&mut report, &owned, &err);
                return Ok(report);
            }
            return Err(err);
        }

        match response.json::<Vec<BulkSmsCreated>>().await {
            Ok(created) => {
                for entry in created {
                    let recipient = entry.to.unwrap_or_default();
                    let id = entry.id.unwrap_or_else(fallback_id);
                    report.record(recipient, DeliveryStatus::Sent { id: Some(id) });
                }
            }
            // Accepted but with an unparseable body: count every recipient,
            // under pseudo ids.
            Err(e) => {
                debug!(provider = PROVIDER, error = %e, "unparseable creation response");
                for message in &owned {
                    for recipient in message.recipients() {
                        report.record(recipient.clone(), DeliveryStatus::Sent {
                            id: Some(fallback_id()),
                        });
                    }
                }
            }
        }
        Ok(report)
    }
}

fn record_batch_failure(report: &mut SendReport, messages: &[SmsMessage], err: &GateError) {
    for message in messages {
        for recipient in message.recipients() {
            report.record(recipient.clone(), DeliveryStatus::Failed {
                reason: err.to_string(),
            });
        }
    }
}
