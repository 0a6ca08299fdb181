use serde::{Deserialize, Serialize};

/// One outbound message: body, sender id, recipient list, flash flag.
///
/// Envelopes are immutable once constructed. The dispatch core never mutates
/// the recipient list; adapters may read it but must not rely on changing it.
/// An envelope lives for exactly one dispatch call and is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsMessage {
    body: String,
    sender: String,
    recipients: Vec<String>,
    flash: bool,
}

impl SmsMessage {
    pub fn new<S, R, I>(body: S, sender: S, recipients: I, flash: bool) -> Self
    where
        S: Into<String>,
        R: Into<String>,
        I: IntoIterator<Item = R>,
    {
        Self {
            body: body.into(),
            sender: sender.into(),
            recipients: recipients.into_iter().map(Into::into).collect(),
            flash,
        }
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    /// Flash messages are flagged for immediate on-screen display rather
    /// than standard inbox delivery.
    pub fn flash(&self) -> bool {
        self.flash
    }
}

/// Caller-facing message builder consumed by [`SmsGate`](crate::SmsGate).
///
/// A draft without an explicit sender picks up the gate's configured default
/// when it is turned into an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDraft {
    body: String,
    sender: Option<String>,
    recipients: Vec<String>,
    flash: bool,
}

impl MessageDraft {
    pub fn new<S, R, I>(body: S, recipients: I) -> Self
    where
        S: Into<String>,
        R: Into<String>,
        I: IntoIterator<Item = R>,
    {
        Self {
            body: body.into(),
            sender: None,
            recipients: recipients.into_iter().map(Into::into).collect(),
            flash: false,
        }
    }

    pub fn sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    pub fn flash(mut self, flash: bool) -> Self {
        self.flash = flash;
        self
    }

    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    /// Seal the draft into an envelope, falling back to `default_sender`
    /// when no sender was set.
    pub fn into_message(self, default_sender: &str) -> SmsMessage {
        let sender = self.sender.unwrap_or_else(|| default_sender.to_string());
        SmsMessage {
            body: self.body,
            sender,
            recipients: self.recipients,
            flash: self.flash,
        }
    }
}
