//! AWS SNS gateway backend.
//!
//! Publishes one SNS message per recipient, marked transactional for
//! delivery priority. An alphanumeric sender id (anything that is not a
//! `+`-prefixed number) is forwarded as the `SenderID` attribute where the
//! destination country supports it. Tally unit: per recipient.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_sns::config::Credentials;
use aws_sdk_sns::error::SdkError;
use aws_sdk_sns::operation::publish::PublishError;
use aws_sdk_sns::types::MessageAttributeValue;
use aws_sdk_sns::{Client as SnsClient, Config as SnsConfig};
use smsgate_core::{
    DeliveryStatus, GateError, SendPolicy, SendReport, SmsBackend, SmsMessage, SuccessUnit,
};
use tracing::{debug, warn};

const PROVIDER: &str = "aws-sns";

/// Identifier to register this backend under.
pub const BACKEND_PATH: &str = "smsgate::backends::aws_sns::AwsSnsBackend";

/// AWS SNS backend.
#[derive(Debug, Clone)]
pub struct AwsSnsBackend {
    policy: SendPolicy,
    client: SnsClient,
    region: String,
}

impl AwsSnsBackend {
    /// Build a client from explicit credentials.
    pub fn new(
        policy: SendPolicy,
        region: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        let region_str = region.into();
        let credentials = Credentials::new(
            access_key_id,
            secret_access_key,
            None,
            None,
            "smsgate",
        );
        let config = SnsConfig::builder()
            .region(Region::new(region_str.clone()))
            .credentials_provider(credentials)
            .behavior_version(BehaviorVersion::latest())
            .build();

        Self {
            policy,
            client: SnsClient::from_conf(config),
            region: region_str,
        }
    }

    /// Build a client using the default AWS credential chain.
    pub async fn with_default_credentials(policy: SendPolicy, region: impl Into<String>) -> Self {
        let region_str = region.into();
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region_str.clone()))
            .load()
            .await;

        Self {
            policy,
            client: SnsClient::new(&config),
            region: region_str,
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    async fn publish(&self, message: &SmsMessage, recipient: &str) -> Result<Option<String>, GateError> {
        let mut request = self
            .client
            .publish()
            .phone_number(recipient)
            .message(message.body())
            .message_attributes(
                "AWS.SNS.SMS.SMSType",
                string_attribute("Transactional")?,
            );

        if !message.sender().is_empty() && !message.sender().starts_with('+') {
            request = request.message_attributes(
                "AWS.SNS.SMS.SenderID",
                string_attribute(message.sender())?,
            );
        }

        debug!(provider = PROVIDER, to = recipient, "publishing message");
        let output = request.send().await.map_err(map_publish_error)?;
        Ok(output.message_id().map(str::to_string))
    }
}

fn string_attribute(value: &str) -> Result<MessageAttributeValue, GateError> {
    MessageAttributeValue::builder()
        .data_type("String")
        .string_value(value)
        .build()
        .map_err(|e| GateError::Protocol(format!("failed to build message attribute: {e}")))
}

fn map_publish_error(e: SdkError<PublishError>) -> GateError {
    match &e {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => {
            return GateError::Transport(e.to_string());
        }
        _ => {}
    }
    match e.into_service_error() {
        PublishError::AuthorizationErrorException(_) => {
            GateError::Protocol("authorization failed".to_string())
        }
        PublishError::InvalidParameterException(err) => GateError::Validation(
            err.message().unwrap_or("invalid parameter").to_string(),
        ),
        PublishError::InvalidParameterValueException(err) => GateError::Validation(
            err.message().unwrap_or("invalid parameter value").to_string(),
        ),
        other => GateError::Protocol(format!("sns error: {other}")),
    }
}

#[async_trait]
impl SmsBackend for AwsSnsBackend {
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
                match self.publish(message, recipient).await {
                    Ok(id) => report.record(recipient.clone(), DeliveryStatus::Sent { id }),
                    Err(e) if self.policy.is_lenient() => {
                        warn!(provider = PROVIDER, error = %e, to = %recipient, "publish failed");
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
