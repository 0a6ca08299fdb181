//! OVH http2sms gateway backend (<https://www.ovh.com>).
//!
//! Submits one GET per recipient against the http2sms CGI endpoint. The
//! flash flag maps to SMS class 0 (immediate on-screen display); newlines
//! are normalized to the CR form the endpoint expects. Tally unit: per
//! recipient.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use smsgate_core::{
    DeliveryStatus, GateError, SendPolicy, SendReport, SmsBackend, SmsMessage, SuccessUnit,
};
use tracing::{debug, warn};

const PROVIDER: &str = "ovh";
const DEFAULT_API_URL: &str = "https://www.ovh.com/cgi-bin/sms/http2sms.cgi";

// UTF-8 coding; the endpoint then caps each SMS at 70 characters per
// segment and concatenates.
const SMS_CODING: &str = "2";

/// Identifier to register this backend under.
pub const BACKEND_PATH: &str = "smsgate::backends::ovh::OvhBackend";

/// OVH http2sms backend.
#[derive(Debug, Clone)]
pub struct OvhBackend {
    policy: SendPolicy,
    account: String,
    login: String,
    password: String,
    api_url: String,
    no_stop: bool,
    http: reqwest::Client,
}

impl OvhBackend {
    pub fn new<S: Into<String>>(policy: SendPolicy, account: S, login: S, password: S) -> Self {
        Self::with_api_url(policy, account, login, password, DEFAULT_API_URL.to_string())
    }

    /// Override the endpoint URL for testing/mocking.
    pub fn with_api_url<S: Into<String>>(
        policy: SendPolicy,
        account: S,
        login: S,
        password: S,
        api_url: String,
    ) -> Self {
        Self {
            policy,
            account: account.into(),
            login: login.into(),
            password: password.into(),
            api_url,
            no_stop: true,
            http: reqwest::Client::new(),
        }
    }

    /// Suppress the STOP marketing footer (on by default; only marketing
    /// traffic must carry it).
    pub fn no_stop(mut self, no_stop: bool) -> Self {
        self.no_stop = no_stop;
        self
    }

    async fn submit(&self, message: &SmsMessage, recipient: &str) -> Result<Option<String>, GateError> {
        let params = SendParams {
            account: &self.account,
            login: &self.login,
            password: &self.password,
            from: message.sender(),
            to: recipient,
            message: normalize_newlines(message.body()),
            class: if message.flash() { "0" } else { "1" },
            sms_coding: SMS_CODING,
            content_type: "text/json",
            no_stop: if self.no_stop { "1" } else { "0" },
        };
        debug!(provider = PROVIDER, to = recipient, "submitting message");

        let response = self
            .http
            .get(&self.api_url)
            .query(&params)
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
        // The endpoint reports 1xx for accepted submissions, 2xx for
        // application-level rejections.
        if parsed.status >= 200 {
            return Err(GateError::Protocol(format!(
                "status {}: {}",
                parsed.status,
                parsed.message.unwrap_or_default()
            )));
        }
        Ok(parsed.sms_ids.into_iter().next())
    }
}

/// The endpoint wants `%0d` (CR) for line breaks.
fn normalize_newlines(body: &str) -> String {
    body.replace("\r\n", "\r").replace('\n', "\r")
}

#[derive(Debug, Serialize)]
struct SendParams<'a> {
    account: &'a str,
    login: &'a str,
    password: &'a str,
    from: &'a str,
    to: &'a str,
    message: String,
    class: &'a str,
    #[serde(rename = "smsCoding")]
    sms_coding: &'a str,
    #[serde(rename = "contentType")]
    content_type: &'a str,
    #[serde(rename = "noStop")]
    no_stop: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    status: u32,
    message: Option<String>,
    #[serde(rename = "smsIds", default)]
    sms_ids: Vec<String>,
}

#[async_trait]
impl SmsBackend for OvhBackend {
    fn policy(&self) -> SendPolicy {
        self.policy
    }

    fn success_unit(&self) -> SuccessUnit {
        SuccessUnit::PerRecipient
    }

    async fn send_messages(&mut self, messages: &[SmsMessage]) -> Result<SendReport, GateError> {
        let mut report = SendReport::default();
        for message in messages {
            for recipient in message.recipients() {
                match self.submit(message, recipient).await {
                    Ok(id) => report.record(recipient.clone(), DeliveryStatus::Sent { id }),
                    Err(e) if self.policy.is_lenient() => {
                        warn!(provider = PROVIDER, error = %e, to = %recipient, "submission failed");
                        report.record(recipient.clone(), DeliveryStatus::Failed {
                            reason: e.to_string(),
                        });
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newlines_become_carriage_returns() {
        assert_eq!(normalize_newlines("a\r\nb\nc"), "a\rb\rc");
    }

    #[test]
    fn flash_maps_to_class_zero() {
        let flash = SmsMessage::new("now", "111", ["222"], true);
        let class = if flash.flash() { "0" } else { "1" };
        assert_eq!(class, "0");
    }

    #[test]
    fn params_encode_with_endpoint_key_names() {
        let params = SendParams {
            account: "sms-ab1234-1",
            login: "user",
            password: "pass",
            from: "111",
            to: "0033600000000",
            message: "line one\rline two".to_string(),
            class: "1",
            sms_coding: SMS_CODING,
            content_type: "text/json",
            no_stop: "1",
        };
        let encoded = serde_urlencoded::to_string(&params).unwrap();
        assert!(encoded.contains("smsCoding=2"));
        assert!(encoded.contains("contentType=text%2Fjson"));
        assert!(encoded.contains("noStop=1"));
    }

    #[test]
    fn response_parses_status_and_ids() {
        let parsed: SendResponse = serde_json::from_str(
            r#"{"status": 100, "smsIds": ["26929925"], "creditLeft": "180"}"#,
        )
        .unwrap();
        assert_eq!(parsed.status, 100);
        assert_eq!(parsed.sms_ids, ["26929925"]);
        assert!(parsed.message.is_none());
    }
}
