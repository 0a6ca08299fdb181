//! # SMS Gate Core
//!
//! Core types for the smsgate multi-gateway SMS abstraction.
//!
//! This crate provides the fundamental building blocks for SMS dispatch:
//! - [`SmsMessage`] — the outbound message envelope
//! - [`SmsBackend`] trait — the contract every gateway adapter implements
//! - [`BackendRegistry`] — string identifier to backend factory resolution
//! - [`SmsGate`] — the caller-facing dispatch API
//! - The no-network [`backends`] (console, dummy, in-memory capture)
//!
//! ## Example
//!
//! ```rust
//! use smsgate_core::{backends::memory::Outbox, BackendRegistry, MessageDraft, SmsGate};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), smsgate_core::GateError> {
//! let outbox = Outbox::new();
//! let registry = BackendRegistry::new().with_builtins(outbox.clone());
//! let gate = SmsGate::new(registry, smsgate_core::backends::MEMORY_BACKEND);
//!
//! let draft = MessageDraft::new("meet at noon", ["+15550001111"]);
//! let report = gate.send(draft, Default::default()).await?;
//! assert_eq!(report.sent, 1);
//! assert_eq!(outbox.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod backends;
pub mod error;
pub mod gate;
pub mod message;
pub mod registry;

pub use backend::{
    fallback_id, BackendOptions, DeliveryStatus, RecipientOutcome, SendPolicy, SendReport,
    SmsBackend, SuccessUnit,
};
pub use error::{ConfigurationError, GateError, ModuleLookupError};
pub use gate::{SendNotice, SendObserver, SendOptions, SmsGate};
pub use message::{MessageDraft, SmsMessage};
pub use registry::{BackendFactory, BackendRegistry};
