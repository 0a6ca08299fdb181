//! # SMS Gate
//!
//! A multi-gateway SMS dispatch toolkit for Rust.
//!
//! Applications send messages through whichever third-party gateway their
//! configuration names, without hardcoding any gateway's API into
//! application logic:
//!
//! - **Uniform envelope**: every adapter consumes the same
//!   [`SmsMessage`](smsgate_core::SmsMessage)
//! - **Capability trait**: adapters implement
//!   [`SmsBackend`](smsgate_core::SmsBackend) (`open`/`close`/`send_messages`)
//! - **Runtime selection**: a configured `"module::path::TypeName"`
//!   identifier resolves to a fresh adapter instance per send
//! - **Uniform fault policy**: strict sends raise the first error, lenient
//!   sends log, continue and tally
//! - **No-network backends**: console, dummy and in-memory capture for
//!   development and tests
//!
//! ## Quick Start
//!
//! ```rust
//! use smsgate::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), GateError> {
//! let config = AppConfig::default();
//! let outbox = Outbox::new();
//! let gate = smsgate::gate_from_config(&config, outbox);
//!
//! let report = gate
//!     .send(
//!         MessageDraft::new("Hello from smsgate!", ["+15550001111"]).sender("+15559998888"),
//!         SendOptions::default(),
//!     )
//!     .await?;
//! println!("sent: {}", report.sent);
//! # Ok(())
//! # }
//! ```

pub mod config;

pub use config::*;

use std::sync::Arc;

use smsgate_core::backends::memory::Outbox;
use smsgate_core::{BackendRegistry, SmsBackend, SmsGate};
use tracing_subscriber::EnvFilter;

use smsgate_aws_sns::AwsSnsBackend;
use smsgate_bulksms::BulkSmsBackend;
use smsgate_esendex::EsendexBackend;
use smsgate_ovh::OvhBackend;
use smsgate_vonage::VonageBackend;

/// Backend modules, re-exported so registry identifiers such as
/// `smsgate::backends::console::ConsoleBackend` are real paths.
pub mod backends {
    pub use smsgate_aws_sns as aws_sns;
    pub use smsgate_bulksms as bulksms;
    pub use smsgate_core::backends::{
        console, dummy, memory, CONSOLE_BACKEND, DUMMY_BACKEND, MEMORY_BACKEND,
    };
    pub use smsgate_esendex as esendex;
    pub use smsgate_ovh as ovh;
    pub use smsgate_queue as queue;
    pub use smsgate_vonage as vonage;
}

/// Initialize global tracing output from the logging configuration.
///
/// Safe to call more than once; later calls keep the first subscriber.
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if config.format == "pretty" {
        builder.pretty().try_init()
    } else {
        builder.json().try_init()
    };
    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Build the registry for a configuration: the built-in no-network
/// backends plus every provider with a configured section.
///
/// Resolution-time `username`/`password` options override the configured
/// credentials of the resolved provider (for AWS SNS they stand in for the
/// access key id and secret). The queue backend is not registered here: it
/// wraps a host-chosen inner backend and is constructed directly.
pub fn default_registry(config: &AppConfig, outbox: Outbox) -> BackendRegistry {
    let mut registry = BackendRegistry::new().with_builtins(outbox);

    if let Some(provider) = config.providers.bulksms.clone() {
        registry = registry.with(
            "smsgate::backends::bulksms",
            "BulkSmsBackend",
            move |options| {
                let token_id = options.username.unwrap_or_else(|| provider.token_id.clone());
                let token_secret = options
                    .password
                    .unwrap_or_else(|| provider.token_secret.clone());
                Ok(Box::new(
                    BulkSmsBackend::new(options.policy, token_id, token_secret)
                        .unicode(provider.unicode),
                ) as Box<dyn SmsBackend>)
            },
        );
    }

    if let Some(provider) = config.providers.vonage.clone() {
        registry = registry.with(
            "smsgate::backends::vonage",
            "VonageBackend",
            move |options| {
                let api_key = options.username.unwrap_or_else(|| provider.api_key.clone());
                let api_secret = options
                    .password
                    .unwrap_or_else(|| provider.api_secret.clone());
                Ok(Box::new(VonageBackend::new(options.policy, api_key, api_secret))
                    as Box<dyn SmsBackend>)
            },
        );
    }

    if let Some(provider) = config.providers.ovh.clone() {
        registry = registry.with("smsgate::backends::ovh", "OvhBackend", move |options| {
            let login = options.username.unwrap_or_else(|| provider.login.clone());
            let password = options.password.unwrap_or_else(|| provider.password.clone());
            Ok(Box::new(
                OvhBackend::new(options.policy, provider.account.clone(), login, password)
                    .no_stop(provider.no_stop),
            ) as Box<dyn SmsBackend>)
        });
    }

    if let Some(provider) = config.providers.esendex.clone() {
        registry = registry.with(
            "smsgate::backends::esendex",
            "EsendexBackend",
            move |options| {
                let username = options.username.unwrap_or_else(|| provider.username.clone());
                let password = options.password.unwrap_or_else(|| provider.password.clone());
                Ok(Box::new(
                    EsendexBackend::new(options.policy, username, password, provider.account.clone())
                        .sandbox(provider.sandbox),
                ) as Box<dyn SmsBackend>)
            },
        );
    }

    if let Some(provider) = config.providers.aws_sns.clone() {
        registry = registry.with(
            "smsgate::backends::aws_sns",
            "AwsSnsBackend",
            move |options| {
                let access_key_id = options
                    .username
                    .unwrap_or_else(|| provider.access_key_id.clone());
                let secret_access_key = options
                    .password
                    .unwrap_or_else(|| provider.secret_access_key.clone());
                Ok(Box::new(AwsSnsBackend::new(
                    options.policy,
                    provider.region.clone(),
                    access_key_id,
                    secret_access_key,
                )) as Box<dyn SmsBackend>)
            },
        );
    }

    registry
}

/// Build a ready-to-use gate: [`default_registry`] plus the configured
/// default backend identifier and default sender.
pub fn gate_from_config(config: &AppConfig, outbox: Outbox) -> SmsGate {
    SmsGate::new(default_registry(config, outbox), config.backend.as_str())
        .default_sender(config.default_sender.as_str())
}

/// Register `observer` on a configured gate.
pub fn gate_with_observer(
    config: &AppConfig,
    outbox: Outbox,
    observer: Arc<dyn smsgate_core::SendObserver>,
) -> SmsGate {
    gate_from_config(config, outbox).observe(observer)
}

/// Common imports for smsgate usage
pub mod prelude {
    pub use crate::config::{
        AppConfig, AwsSnsConfig, BulkSmsConfig, EsendexConfig, LoggingConfig, OvhConfig,
        ProvidersConfig, VonageConfig,
    };
    pub use smsgate_core::backends::memory::Outbox;
    pub use smsgate_core::*;
}
