//! The handler contract
//!
//! Every dispatch target, built-in or user supplied, implements [`Handler`].

use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use thiserror::Error;

use crate::context::{Event, InvocationContext};

/// Boxed error type used at trait-object seams
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Code execution failed with exit code {0:?}")]
    CodeFailed(Option<i32>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] BoxError),
}

impl HandlerError {
    /// Short name reported to the host as the error type
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidEvent(_) => "InvalidEvent",
            Self::UnknownCommand(_) => "UnknownCommand",
            Self::CodeFailed(_) => "CodeFailed",
            Self::Io(_) => "IOError",
            Self::Other(_) => "HandlerError",
        }
    }
}

/// Processes a single invocation event
#[async_trait]
pub trait Handler: Send + Sync {
    async fn invoke(&self, event: &Event, context: &InvocationContext)
        -> Result<Value, HandlerError>;
}

/// Handler backed by an async closure, see [`handler_fn`]
pub struct FnHandler<F> {
    f: F,
}

/// Wrap an async closure as a [`Handler`]
///
/// ```rust
/// use relaystack_core::{handler_fn, Event, InvocationContext, HandlerError};
/// use serde_json::{json, Value};
///
/// let handler = handler_fn(|event: Event, _ctx: InvocationContext| async move {
///     Ok::<Value, HandlerError>(json!({ "seen": event }))
/// });
/// # let _ = handler;
/// ```
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(Event, InvocationContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, HandlerError>> + Send,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(Event, InvocationContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, HandlerError>> + Send,
{
    async fn invoke(
        &self,
        event: &Event,
        context: &InvocationContext,
    ) -> Result<Value, HandlerError> {
        (self.f)(event.clone(), context.clone()).await
    }
}
