//! Esendex gateway backend (<https://www.esendex.com>).
//!
//! Submits one form POST per envelope against the form-post SendSMS
//! endpoint and parses its `key=value` response lines. Sandbox mode asks
//! the gateway to acknowledge without delivering, which it signals with a
//! `Test` result. Tally unit: per message.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;
use smsgate_core::{
    DeliveryStatus, GateError, SendPolicy, SendReport, SmsBackend, SmsMessage, SuccessUnit,
};
use tracing::{debug, warn};

const PROVIDER: &str = "esendex";
const DEFAULT_API_URL: &str = "https://www.esendex.com/secure/messenger/formpost/SendSMS.aspx";

/// Identifier to register this backend under.
pub const BACKEND_PATH: &str = "smsgate::backends::esendex::EsendexBackend";

/// Esendex form-post backend.
#[derive(Debug, Clone)]
pub struct EsendexBackend {
    policy: SendPolicy,
    username: String,
    password: String,
    account: String,
    api_url: String,
    sandbox: bool,
    http: reqwest::Client,
}

impl EsendexBackend {
    pub fn new<S: Into<String>>(policy: SendPolicy, username: S, password: S, account: S) -> Self {
        Self::with_api_url(policy, username, password, account, DEFAULT_API_URL.to_string())
    }

    /// Override the endpoint URL for testing/mocking.
    pub fn with_api_url<S: Into<String>>(
        policy: SendPolicy,
        username: S,
        password: S,
        account: S,
        api_url: String,
    ) -> Self {
        Self {
            policy,
            username: username.into(),
            password: password.into(),
            account: account.into(),
            api_url,
            sandbox: false,
            http: reqwest::Client::new(),
        }
    }

    /// Ask the gateway to acknowledge without delivering.
    pub fn sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }

    async fn submit(&self, message: &SmsMessage) -> Result<(), GateError> {
        let params = SendParams {
            username: &self.username,
            password: &self.password,
            account: &self.account,
            originator: message.sender(),
            recipient: message.recipients().join(","),
            body: message.body(),
            plain_text: "1",
            test: self.sandbox.then_some("1"),
        };
        debug!(provider = PROVIDER, to = %params.recipient, "submitting message");

        let response = self
            .http
            .post(&self.api_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| GateError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GateError::Protocol(format!("HTTP {status}: {body}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| GateError::Transport(e.to_string()))?;
        check_result(&body, self.sandbox)
    }
}

#[derive(Debug, Serialize)]
struct SendParams<'a> {
    #[serde(rename = "EsendexUsername")]
    username: &'a str,
    #[serde(rename = "EsendexPassword")]
    password: &'a str,
    #[serde(rename = "EsendexAccount")]
    account: &'a str,
    #[serde(rename = "EsendexOriginator")]
    originator: &'a str,
    #[serde(rename = "EsendexRecipient")]
    recipient: String,
    #[serde(rename = "EsendexBody")]
    body: &'a str,
    #[serde(rename = "EsendexPlainText")]
    plain_text: &'a str,
    #[serde(rename = "EsendexTest", skip_serializing_if = "Option::is_none")]
    test: Option<&'a str>,
}

/// The endpoint answers with `key=value` lines, e.g. `Result=OK`.
fn parse_response(body: &str) -> HashMap<&str, &str> {
    body.lines()
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim(), value.trim()))
        .collect()
}

fn check_result(body: &str, sandbox: bool) -> Result<(), GateError> {
    if !body.starts_with("Result") {
        return Err(GateError::Protocol(format!("unexpected response: {body}")));
    }
    let fields = parse_response(body);
    match fields.get("Result").copied() {
        Some("OK") => Ok(()),
        Some("Test") if sandbox => Ok(()),
        Some(other) => Err(GateError::Protocol(format!("result {other}: {body}"))),
        None => Err(GateError::Protocol(format!("unexpected response: {body}"))),
    }
}

#[async_trait]
impl SmsBackend for EsendexBackend {
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
                Ok(()) => report.record(recipients, DeliveryStatus::Sent { id: None }),
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
