use std::collections::HashMap;
use std::sync::Arc;

use crate::backend::{BackendOptions, SmsBackend};
use crate::backends::memory::Outbox;
use crate::backends::{console::ConsoleBackend, dummy::DummyBackend, memory::MemoryBackend};
use crate::error::{ConfigurationError, GateError, ModuleLookupError};

/// Constructs a fresh backend instance from resolution-time options.
pub type BackendFactory =
    Arc<dyn Fn(BackendOptions) -> Result<Box<dyn SmsBackend>, GateError> + Send + Sync>;

/// Runtime registry mapping backend identifiers to factories.
///
/// An identifier has the form `"module::path::TypeName"` and is split on its
/// last `::`: the left part locates a registered module, the right part a
/// type within it. Registration happens deliberately at startup; resolution
/// never caches or pools — every call produces a fresh instance.
#[derive(Default, Clone)]
pub struct BackendRegistry {
    modules: Arc<HashMap<String, HashMap<String, BackendFactory>>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            modules: Arc::new(HashMap::new()),
        }
    }

    /// Register `factory` as `module::name`.
    pub fn with<F>(mut self, module: &str, name: &str, factory: F) -> Self
    where
        F: Fn(BackendOptions) -> Result<Box<dyn SmsBackend>, GateError> + Send + Sync + 'static,
    {
        let mut modules = (*self.modules).clone();
        modules
            .entry(module.to_string())
            .or_default()
            .insert(name.to_string(), Arc::new(factory));
        self.modules = Arc::new(modules);
        self
    }

    /// Register the built-in no-network backends (console, dummy, capture).
    ///
    /// The capture backend appends to the caller-owned `outbox`.
    pub fn with_builtins(self, outbox: Outbox) -> Self {
        self.with("smsgate::backends::console", "ConsoleBackend", |options| {
            Ok(Box::new(ConsoleBackend::new(options.policy)) as Box<dyn SmsBackend>)
        })
        .with("smsgate::backends::dummy", "DummyBackend", |options| {
            Ok(Box::new(DummyBackend::new(options.policy)) as Box<dyn SmsBackend>)
        })
        .with("smsgate::backends::memory", "MemoryBackend", move |options| {
            Ok(Box::new(MemoryBackend::new(options.policy, outbox.clone())) as Box<dyn SmsBackend>)
        })
    }

    /// Turn `identifier` into a live backend instance.
    ///
    /// Fails with a [`ConfigurationError`] when the identifier has no `::`
    /// separator, when no module is registered under its module part, or
    /// when the module does not define the named type.
    pub fn resolve(
        &self,
        identifier: &str,
        options: BackendOptions,
    ) -> Result<Box<dyn SmsBackend>, GateError> {
        let (module, name) = identifier
            .rsplit_once("::")
            .ok_or_else(|| ConfigurationError::MissingSeparator(identifier.to_string()))?;

        let types = self.modules.get(module).ok_or_else(|| {
            ConfigurationError::ModuleNotFound {
                module: module.to_string(),
                source: ModuleLookupError(module.to_string()),
            }
        })?;

        let factory = types.get(name).ok_or_else(|| ConfigurationError::TypeNotFound {
            module: module.to_string(),
            name: name.to_string(),
        })?;

        factory(options)
    }
}
