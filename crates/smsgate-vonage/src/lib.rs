//! Vonage (formerly Nexmo) gateway backend (<https://www.vonage.com>).
//!
//! Submits one form POST per envelope against the SMS JSON API, with the
//! recipient list joined into the `to` parameter. Numeric platform status
//! codes are mapped into the shared error taxonomy. Tally unit: per
//! message.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use smsgate_core::{
    DeliveryStatus, GateError, SendPolicy, SendReport, SmsBackend, SmsMessage, SuccessUnit,
};
use tracing::{debug, warn};

const PROVIDER: &str = "vonage";
const DEFAULT_BASE_URL: &str = "https://rest.nexmo.com";

/// Longest accepted body: the platform caps concatenated text messages.
const MAX_BODY_CHARS: usize = 3200;

/// Identifier to register this backend under.
pub const BACKEND_PATH: &str = "smsgate::backends::vonage::VonageBackend";

/// Vonage REST backend.
#[derive(Debug, Clone)]
pub struct VonageBackend {
    policy: SendPolicy,
    api_key: String,
    api_secret: String,
    base_url: String,
    http: reqwest::Client,
}

impl VonageBackend {
    pub fn new<S: Into<String>>(policy: SendPolicy, api_key: S, api_secret: S) -> Self {
        Self::with_base_url(policy, api_key, api_secret, DEFAULT_BASE_URL.to_string())
    }

    /// Override the API base URL for testing/mocking.
    pub fn with_base_url<S: Into<String>>(
        policy: SendPolicy,
        api_key: S,
        api_secret: S,
        base_url: String,
    ) -> Self {
        Self {
            policy,
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            base_url,
            http: reqwest::Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/sms/json", self.base_url.trim_end_matches('/'))
    }

    async fn submit(&self, message: &SmsMessage) -> Result<Option<String>, GateError> {
        if message.body().chars().count() > MAX_BODY_CHARS {
            return Err(GateError::Validation(format!(
                "body exceeds {MAX_BODY_CHARS} characters"
            )));
        }

        let params = SendParams {
            api_key: &self.api_key,
            api_secret: &self.api_secret,
            from: message.sender(),
            to: message.recipients().join(","),
            text: message.body(),
        };
        debug!(provider = PROVIDER, to = %params.to, "submitting message");

        let response = self
            .http
            .post(self.endpoint())
            .form(&params)
            .send()
            .await
            .map_err(|e| GateError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GateError::Protocol(format!("HTTP {status}: {body}")));
        }

        let parsed: SendResponse = response
            .json()
            .await
            .map_err(|e| GateError::Protocol(format!("unparseable response: {e}")))?;
        let first = parsed
            .messages
            .first()
            .ok_or_else(|| GateError::Protocol("response carried no message status".into()))?;

        if first.status != "0" {
            let meaning = status_meaning(&first.status).unwrap_or("unknown status");
            let detail = first.error_text.as_deref().unwrap_or(meaning);
            return Err(GateError::Protocol(format!(
                "status {}: {}",
                first.status, detail
            )));
        }
        Ok(first.message_id.clone())
    }
}

#[derive(Debug, Serialize)]
struct SendParams<'a> {
    api_key: &'a str,
    api_secret: &'a str,
    from: &'a str,
    to: String,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    messages: Vec<MessageStatus>,
}

#[derive(Debug, Deserialize)]
struct MessageStatus {
    status: String,
    #[serde(rename = "message-id")]
    message_id: Option<String>,
    #[serde(rename = "error-text")]
    error_text: Option<String>,
}

/// Platform status codes, per the SMS API reference.
fn status_meaning(code: &str) -> Option<&'static str> {
    Some(match code {
        "1" => "throttled: submission capacity exceeded, wait and retry",
        "2" => "missing mandatory parameters",
        "3" => "invalid parameter value",
        "4" => "invalid credentials",
        "5" => "internal platform error",
        "6" => "invalid message: unrecognised number prefix",
        "7" => "number barred",
        "8" => "partner account barred",
        "9" => "partner quota exceeded",
        "12" => "message too long",
        "15" => "illegal sender address for destination",
        "29" => "non-whitelisted destination",
        "34" => "invalid or missing msisdn parameter",
        _ => return None,
    })
}

#[async_trait]
impl SmsBackend for VonageBackend {
    fn policy(&self) -> SendPolicy {
        self.policy
    }

    fn success_unit(&self) -> SuccessUnit {
        SuccessUnit::PerMessage
    }

    async fn send_messages(&mut self, messages: &[SmsMessage]) -> Result<SendReport, GateError> {
        let mut report = SendReport::default();
        for message in messages {
            let recipients = message.recipients().join(",");
            match self.submit(message).await {
                Ok(id) => report.record(recipients, DeliveryStatus::Sent { id }),
                Err(e) if self.policy.is_lenient() => {
                    warn!(provider = PROVIDER, error = %e, "message submission failed");
                    report.record(recipients, DeliveryStatus::Failed {
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }
        Ok(report)
    }
}
