//! Backend that renders messages to an output stream instead of sending
//! them.

use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tracing::warn;

use crate::backend::{DeliveryStatus, SendPolicy, SendReport, SmsBackend, SuccessUnit};
use crate::error::GateError;
use crate::message::SmsMessage;

const SEPARATOR_WIDTH: usize = 79;

/// Shared, lockable output stream. Two backend instances constructed over
/// the same stream contend on the same lock.
pub type SharedStream = Arc<Mutex<Box<dyn Write + Send>>>;

/// Writes each envelope as a fixed-format record followed by a separator
/// line.
///
/// The stream lock is held for the full multi-line render of one batch and
/// released on every exit path, so concurrent batches never interleave
/// their lines. Tally unit: per message.
pub struct ConsoleBackend {
    policy: SendPolicy,
    stream: SharedStream,
}

impl ConsoleBackend {
    /// Render to standard output.
    pub fn new(policy: SendPolicy) -> Self {
        Self::with_stream(policy, Arc::new(Mutex::new(Box::new(std::io::stdout()))))
    }

    /// Render to a caller-supplied stream; pass the same handle to several
    /// instances to serialize their output.
    pub fn with_stream(policy: SendPolicy, stream: SharedStream) -> Self {
        Self { policy, stream }
    }
}

fn render(message: &SmsMessage) -> String {
    format!(
        "from: {}\nto: {}\nflash: {}\n{}\n",
        message.sender(),
        message.recipients().join(", "),
        message.flash(),
        message.body(),
    )
}

fn write_record(stream: &mut dyn Write, message: &SmsMessage) -> std::io::Result<()> {
    stream.write_all(render(message).as_bytes())?;
    stream.write_all("-".repeat(SEPARATOR_WIDTH).as_bytes())?;
    stream.write_all(b"\n")?;
    stream.flush()
}

#[async_trait]
impl SmsBackend for ConsoleBackend {
    fn policy(&self) -> SendPolicy {
        self.policy
    }

    fn success_unit(&self) -> SuccessUnit {
        SuccessUnit::PerMessage
    }

    async fn send_messages(&mut self, messages: &[SmsMessage]) -> Result<SendReport, GateError> {
        let mut report = SendReport::default();
        if messages.is_empty() {
            return Ok(report);
        }

        let opened = self.open().await?;
        {
            let stream = Arc::clone(&self.stream);
            let mut guard = stream.lock().unwrap_or_else(PoisonError::into_inner);
            for message in messages {
                match write_record(guard.as_mut(), message) {
                    Ok(()) => report.record(message.recipients().join(", "), DeliveryStatus::Sent {
                        id: None,
                    }),
                    Err(e) if self.policy.is_lenient() => {
                        warn!(error = %e, "console backend failed to write message");
                        report.record(message.recipients().join(", "), DeliveryStatus::Failed {
                            reason: e.to_string(),
                        });
                    }
                    Err(e) => return Err(GateError::Transport(format!("stream write failed: {e}"))),
                }
            }
        }
        if opened {
            self.close().await?;
        }
        Ok(report)
    }
}
