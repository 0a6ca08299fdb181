use std::sync::Arc;

use tracing::debug;

use crate::backend::{BackendOptions, SendPolicy, SendReport, SmsBackend};
use crate::error::GateError;
use crate::message::{MessageDraft, SmsMessage};
use crate::registry::BackendRegistry;

/// Payload of the post-send notification: who was messaged, by whom, what.
#[derive(Debug, Clone, Copy)]
pub struct SendNotice<'a> {
    pub recipients: &'a [String],
    pub sender: &'a str,
    pub body: &'a str,
}

/// In-process observer invoked after a successful single send.
///
/// Best-effort and fire-and-forget: no persistence, no delivery guarantee,
/// no ordering guarantee across concurrent senders.
pub trait SendObserver: Send + Sync {
    fn message_sent(&self, notice: &SendNotice<'_>);
}

/// Per-call options for [`SmsGate::send`] and [`SmsGate::send_mass`].
///
/// `username`/`password` are forwarded to the resolved backend as
/// construction options, overriding configured credentials.
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    pub policy: SendPolicy,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl SendOptions {
    pub fn new(policy: SendPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    fn into_backend_options(self) -> BackendOptions {
        BackendOptions {
            policy: self.policy,
            username: self.username,
            password: self.password,
            ..BackendOptions::default()
        }
    }
}

/// The caller-facing dispatch API: builds envelopes, resolves a backend
/// when none is supplied, and invokes `send_messages`.
///
/// The dispatch chain is sequential per call — the caller awaits the full
/// round trip of however many network calls the chosen adapter performs.
/// The gate spawns no tasks and owns no timeout.
#[derive(Clone)]
pub struct SmsGate {
    registry: BackendRegistry,
    default_backend: String,
    default_sender: String,
    observers: Vec<Arc<dyn SendObserver>>,
}

impl SmsGate {
    pub fn new(registry: BackendRegistry, default_backend: impl Into<String>) -> Self {
        Self {
            registry,
            default_backend: default_backend.into(),
            default_sender: String::new(),
            observers: Vec::new(),
        }
    }

    /// Sender id applied to drafts that do not set one.
    pub fn default_sender(mut self, sender: impl Into<String>) -> Self {
        self.default_sender = sender.into();
        self
    }

    /// Register a post-send observer.
    pub fn observe(mut self, observer: Arc<dyn SendObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Resolve `identifier` (or the configured default when `None`) into a
    /// fresh backend instance.
    pub fn resolve(
        &self,
        identifier: Option<&str>,
        options: BackendOptions,
    ) -> Result<Box<dyn SmsBackend>, GateError> {
        let identifier = identifier.unwrap_or(&self.default_backend);
        debug!(backend = identifier, "resolving sms backend");
        self.registry.resolve(identifier, options)
    }

    /// Send a single message to its recipient list.
    ///
    /// An empty recipient list returns the zero report immediately, without
    /// resolving a connection — even an invalid configured default backend
    /// identifier cannot fail such a call.
    pub async fn send(
        &self,
        draft: MessageDraft,
        options: SendOptions,
    ) -> Result<SendReport, GateError> {
        if draft.recipients().is_empty() {
            return Ok(SendReport::default());
        }
        let mut connection = self.resolve(None, options.into_backend_options())?;
        self.send_via(draft, connection.as_mut()).await
    }

    /// Send a single message over an already-constructed connection.
    pub async fn send_via(
        &self,
        draft: MessageDraft,
        connection: &mut dyn SmsBackend,
    ) -> Result<SendReport, GateError> {
        if draft.recipients().is_empty() {
            return Ok(SendReport::default());
        }
        let message = draft.into_message(&self.default_sender);
        let report = connection
            .send_messages(std::slice::from_ref(&message))
            .await?;
        self.notify(&message);
        Ok(report)
    }

    /// Send a batch of messages, one envelope per draft.
    ///
    /// The backend is resolved at most once for the whole batch and receives
    /// every envelope in a single `send_messages` call. Whether that means
    /// one network round trip or many is the adapter's decision; the gate
    /// promises a single interface call, not atomic delivery.
    pub async fn send_mass(
        &self,
        drafts: Vec<MessageDraft>,
        options: SendOptions,
    ) -> Result<SendReport, GateError> {
        let mut connection = self.resolve(None, options.into_backend_options())?;
        self.send_mass_via(drafts, connection.as_mut()).await
    }

    /// Send a batch of messages over an already-constructed connection.
    pub async fn send_mass_via(
        &self,
        drafts: Vec<MessageDraft>,
        connection: &mut dyn SmsBackend,
    ) -> Result<SendReport, GateError> {
        let messages: Vec<SmsMessage> = drafts
            .into_iter()
            .map(|draft| draft.into_message(&self.default_sender))
            .collect();
        connection.send_messages(&messages).await
    }

    fn notify(&self, message: &SmsMessage) {
        let notice = SendNotice {
            recipients: message.recipients(),
            sender: message.sender(),
            body: message.body(),
        };
        for observer in &self.observers {
            observer.message_sent(&notice);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::memory::Outbox;
    use crate::backends::MEMORY_BACKEND;
    use std::sync::Mutex;

    fn gate(outbox: Outbox) -> SmsGate {
        let registry = BackendRegistry::new().with_builtins(outbox);
        SmsGate::new(registry, MEMORY_BACKEND).default_sender("+15550000000")
    }

    #[tokio::test]
    async fn send_captures_one_envelope_and_counts_recipients() {
        let outbox = Outbox::new();
        let report = gate(outbox.clone())
            .send(
                MessageDraft::new("hello", ["+15550001111", "+15550002222"]),
                SendOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(report.sent, 2);
        let captured = outbox.messages();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].sender(), "+15550000000");
    }

    #[tokio::test]
    async fn empty_recipient_list_skips_resolution_entirely() {
        // The configured default backend is bogus on purpose: the zero
        // report must come back before any resolution is attempted.
        let registry = BackendRegistry::new();
        let gate = SmsGate::new(registry, "not-an-identifier");

        let report = gate
            .send(MessageDraft::new("hello", Vec::<String>::new()), SendOptions::default())
            .await
            .unwrap();
        assert_eq!(report, SendReport::default());
    }

    #[tokio::test]
    async fn send_mass_builds_one_envelope_per_draft() {
        let outbox = Outbox::new();
        let drafts = vec![
            MessageDraft::new("one", ["+15550001111"]),
            MessageDraft::new("two", ["+15550002222"]),
            MessageDraft::new("three", ["+15550003333"]).flash(true),
        ];
        let report = gate(outbox.clone())
            .send_mass(drafts, SendOptions::default())
            .await
            .unwrap();

        assert_eq!(report.sent, 3);
        let captured = outbox.messages();
        assert_eq!(captured.len(), 3);
        assert_eq!(captured[2].body(), "three");
        assert!(captured[2].flash());
    }

    struct Recorder {
        seen: Mutex<Vec<(Vec<String>, String, String)>>,
    }

    impl SendObserver for Recorder {
        fn message_sent(&self, notice: &SendNotice<'_>) {
            self.seen.lock().unwrap().push((
                notice.recipients.to_vec(),
                notice.sender.to_string(),
                notice.body.to_string(),
            ));
        }
    }

    #[tokio::test]
    async fn successful_send_notifies_observers() {
        let recorder = Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
        });
        let outbox = Outbox::new();
        let gate = gate(outbox).observe(recorder.clone());

        gate.send(MessageDraft::new("ping", ["+15550001111"]), SendOptions::default())
            .await
            .unwrap();

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, ["+15550001111"]);
        assert_eq!(seen[0].2, "ping");
    }

    #[tokio::test]
    async fn failed_send_does_not_notify_observers() {
        let recorder = Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
        });
        let registry = BackendRegistry::new();
        let gate = SmsGate::new(registry, "smsgate::backends::missing::Backend")
            .observe(recorder.clone());

        let err = gate
            .send(MessageDraft::new("ping", ["+15550001111"]), SendOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::Configuration(_)));
        assert!(recorder.seen.lock().unwrap().is_empty());
    }
}
