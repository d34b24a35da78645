//! Dispatch errors

use relaystack_core::{BoxError, ErrorPayload, HandlerError, ResolveError};
use relaystack_http::BridgeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Handler resolution failed: {0}")]
    Resolve(#[from] ResolveError),

    #[error("No web application is configured for this process")]
    ApplicationUnavailable,

    #[error("Application initialization failed: {0}")]
    ApplicationInit(#[source] BoxError),

    #[error(transparent)]
    Handler(#[from] HandlerError),

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

impl DispatchError {
    /// Error type name reported to the host
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Resolve(_) => "ResolveError",
            Self::ApplicationUnavailable => "ApplicationUnavailable",
            Self::ApplicationInit(_) => "ApplicationInitError",
            Self::Handler(e) => e.kind(),
            Self::Bridge(_) => "BridgeError",
        }
    }

    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload::from_error(self.error_type(), self)
    }
}
