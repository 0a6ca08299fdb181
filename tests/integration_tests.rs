use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use smsgate::backends::{CONSOLE_BACKEND, MEMORY_BACKEND};
use smsgate::prelude::*;
use smsgate::{default_registry, gate_from_config, gate_with_observer};

fn memory_config() -> AppConfig {
    AppConfig {
        backend: MEMORY_BACKEND.to_string(),
        default_sender: "+15550000000".to_string(),
        ..AppConfig::default()
    }
}

#[tokio::test]
async fn send_reports_recipient_count_and_captures_one_envelope() {
    let outbox = Outbox::new();
    let gate = gate_from_config(&memory_config(), outbox.clone());

    let report = gate
        .send(
            MessageDraft::new("hello", ["+15550001111", "+15550002222", "+15550003333"]),
            SendOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(report.sent, 3);
    let captured = outbox.messages();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].recipients().len(), 3);
    assert_eq!(captured[0].sender(), "+15550000000");
}

#[tokio::test]
async fn empty_recipient_list_never_resolves_even_a_bogus_backend() {
    // No separator at all: resolution of this identifier can only fail.
    let config = AppConfig {
        backend: "definitely-not-a-backend".to_string(),
        ..AppConfig::default()
    };
    let gate = gate_from_config(&config, Outbox::new());

    let report = gate
        .send(
            MessageDraft::new("hello", Vec::<String>::new()),
            SendOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(report.sent, 0);
    assert!(report.outcomes.is_empty());
}

#[tokio::test]
async fn resolver_rejects_malformed_and_unknown_identifiers() {
    let registry = default_registry(&AppConfig::default(), Outbox::new());

    let err = registry
        .resolve("console", BackendOptions::default())
        .unwrap_err();
    assert!(matches!(
        err,
        GateError::Configuration(ConfigurationError::MissingSeparator(_))
    ));

    let err = registry
        .resolve("smsgate::backends::telegraph::TelegraphBackend", BackendOptions::default())
        .unwrap_err();
    assert!(matches!(
        err,
        GateError::Configuration(ConfigurationError::ModuleNotFound { .. })
    ));

    let err = registry
        .resolve("smsgate::backends::memory::TapeBackend", BackendOptions::default())
        .unwrap_err();
    assert!(matches!(
        err,
        GateError::Configuration(ConfigurationError::TypeNotFound { .. })
    ));
}

#[tokio::test]
async fn providers_register_only_when_configured() {
    let unconfigured = default_registry(&AppConfig::default(), Outbox::new());
    let err = unconfigured
        .resolve(smsgate::backends::bulksms::BACKEND_PATH, BackendOptions::default())
        .unwrap_err();
    assert!(matches!(
        err,
        GateError::Configuration(ConfigurationError::ModuleNotFound { .. })
    ));

    let mut config = AppConfig::default();
    config.providers.bulksms = Some(BulkSmsConfig {
        token_id: "token".into(),
        token_secret: "secret".into(),
        unicode: true,
    });
    config.providers.vonage = Some(VonageConfig {
        api_key: "key".into(),
        api_secret: "secret".into(),
    });
    let configured = default_registry(&config, Outbox::new());
    assert!(configured
        .resolve(smsgate::backends::bulksms::BACKEND_PATH, BackendOptions::default())
        .is_ok());
    assert!(configured
        .resolve(smsgate::backends::vonage::BACKEND_PATH, BackendOptions::default())
        .is_ok());
    // Resolution-time credentials override the configured ones.
    let options = BackendOptions {
        username: Some("other-key".into()),
        password: Some("other-secret".into()),
        ..BackendOptions::default()
    };
    assert!(configured
        .resolve(smsgate::backends::vonage::BACKEND_PATH, options)
        .is_ok());
}

/// Simulated gateway whose transport fails for every recipient, recording
/// each attempt.
struct FlakyBackend {
    policy: SendPolicy,
    attempts: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl SmsBackend for FlakyBackend {
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
                self.attempts.lock().unwrap().push(recipient.clone());
                let err = GateError::Transport("connection reset".into());
                if self.policy.is_lenient() {
                    report.record(recipient.clone(), DeliveryStatus::Failed {
                        reason: err.to_string(),
                    });
                } else {
                    return Err(err);
                }
            }
        }
        Ok(report)
    }
}

#[tokio::test]
async fn strict_backend_raises_on_first_failure_and_stops() {
    let attempts = Arc::new(Mutex::new(Vec::new()));
    let mut backend = FlakyBackend {
        policy: SendPolicy::Strict,
        attempts: attempts.clone(),
    };
    let gate = gate_from_config(&memory_config(), Outbox::new());

    let err = gate
        .send_via(
            MessageDraft::new("hello", ["+15550001111", "+15550002222"]),
            &mut backend,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, GateError::Transport(_)));
    assert_eq!(attempts.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn lenient_backend_swallows_every_failure_and_tallies_zero() {
    let attempts = Arc::new(Mutex::new(Vec::new()));
    let mut backend = FlakyBackend {
        policy: SendPolicy::Lenient,
        attempts: attempts.clone(),
    };
    let gate = gate_from_config(&memory_config(), Outbox::new());

    let report = gate
        .send_via(
            MessageDraft::new("hello", ["+15550001111", "+15550002222"]),
            &mut backend,
        )
        .await
        .unwrap();
    assert_eq!(report.sent, 0);
    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(attempts.lock().unwrap().len(), 2);
}

/// Counts `send_messages` invocations and captures the batch sizes.
struct CountingBackend {
    calls: Arc<Mutex<Vec<usize>>>,
}

#[async_trait]
impl SmsBackend for CountingBackend {
    fn policy(&self) -> SendPolicy {
        SendPolicy::Strict
    }

    fn success_unit(&self) -> SuccessUnit {
        SuccessUnit::PerMessage
    }

    async fn send_messages(&mut self, messages: &[SmsMessage]) -> Result<SendReport, GateError> {
        self.calls.lock().unwrap().push(messages.len());
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

#[tokio::test]
async fn send_mass_submits_the_whole_batch_in_one_call() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut backend = CountingBackend { calls: calls.clone() };
    let gate = gate_from_config(&memory_config(), Outbox::new());

    let drafts = vec![
        MessageDraft::new("one", ["+15550001111"]),
        MessageDraft::new("two", ["+15550002222"]),
        MessageDraft::new("three", ["+15550003333"]),
    ];
    let report = gate.send_mass_via(drafts, &mut backend).await.unwrap();

    assert_eq!(report.sent, 3);
    let calls = calls.lock().unwrap();
    assert_eq!(calls.as_slice(), &[3]);
}

struct CapturingObserver {
    notices: Arc<Mutex<Vec<(Vec<String>, String, String)>>>,
}

impl SendObserver for CapturingObserver {
    fn message_sent(&self, notice: &SendNotice<'_>) {
        self.notices.lock().unwrap().push((
            notice.recipients.to_vec(),
            notice.sender.to_string(),
            notice.body.to_string(),
        ));
    }
}

#[tokio::test]
async fn observers_receive_recipients_sender_and_body() {
    let notices = Arc::new(Mutex::new(Vec::new()));
    let observer = Arc::new(CapturingObserver {
        notices: notices.clone(),
    });
    let gate = gate_with_observer(&memory_config(), Outbox::new(), observer);

    gate.send(
        MessageDraft::new("observed", ["+15550001111"]).sender("+15557770000"),
        SendOptions::default(),
    )
    .await
    .unwrap();

    let notices = notices.lock().unwrap();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].0, ["+15550001111"]);
    assert_eq!(notices[0].1, "+15557770000");
    assert_eq!(notices[0].2, "observed");
}

#[tokio::test]
async fn concurrent_sends_all_land_in_the_outbox() {
    let outbox = Outbox::new();
    let gate = gate_from_config(&memory_config(), outbox.clone());

    let sends = (0..20).map(|i| {
        let gate = gate.clone();
        async move {
            gate.send(
                MessageDraft::new(format!("message {i}"), [format!("+1555{i:07}")]),
                SendOptions::default(),
            )
            .await
        }
    });
    let results = futures::future::join_all(sends).await;

    assert!(results.iter().all(|r| matches!(r, Ok(report) if report.sent == 1)));
    assert_eq!(outbox.len(), 20);
}

#[tokio::test]
async fn console_is_the_default_backend() {
    let config = AppConfig::default();
    assert_eq!(config.backend, CONSOLE_BACKEND);
    // The default gate resolves its default backend without error.
    let gate = gate_from_config(&config, Outbox::new());
    assert!(gate.resolve(None, BackendOptions::default()).is_ok());
}
