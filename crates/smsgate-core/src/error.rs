/// Errors that can occur while resolving backends or sending messages.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// Malformed backend identifier, unlocatable module, or missing type.
    /// Always fatal; never suppressed by a backend's send policy.
    #[error("improperly configured: {0}")]
    Configuration(#[from] ConfigurationError),
    /// Network/HTTP-level failure reaching the gateway.
    #[error("transport failure: {0}")]
    Transport(String),
    /// Gateway reachable but returned an application-level failure
    /// (bad credentials, invalid recipient, quota exceeded, ...).
    #[error("gateway error: {0}")]
    Protocol(String),
    /// Envelope failed an adapter precondition before any network call.
    #[error("invalid message: {0}")]
    Validation(String),
}

/// Failure to turn a backend identifier into a registered factory.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("backend identifier `{0}` must contain a `::` separator")]
    MissingSeparator(String),
    #[error("error locating backend module `{module}`")]
    ModuleNotFound {
        module: String,
        #[source]
        source: ModuleLookupError,
    },
    #[error("module `{module}` does not define a backend type `{name}`")]
    TypeNotFound { module: String, name: String },
}

/// Underlying lookup failure carried as the source of
/// [`ConfigurationError::ModuleNotFound`].
#[derive(Debug, thiserror::Error)]
#[error("no backend module registered under `{0}`")]
pub struct ModuleLookupError(pub String);

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn module_not_found_carries_source() {
        let err = ConfigurationError::ModuleNotFound {
            module: "smsgate::backends::nope".into(),
            source: ModuleLookupError("smsgate::backends::nope".into()),
        };
        let source = err.source().expect("lookup failure should be wrapped");
        assert!(source.to_string().contains("smsgate::backends::nope"));
    }

    #[test]
    fn configuration_errors_convert_into_gate_errors() {
        let err: GateError = ConfigurationError::MissingSeparator("console".into()).into();
        assert!(matches!(err, GateError::Configuration(_)));
        assert!(err.to_string().contains("improperly configured"));
    }
}
