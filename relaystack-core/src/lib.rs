//! Core types and traits for RelayStack
//!
//! This crate provides the handler contract every dispatch target implements,
//! the invocation context passed through from the host runtime, and the
//! path-keyed registry used to resolve handler references.

pub mod context;
pub mod error;
pub mod handler;
pub mod registry;

pub use context::{Event, InvocationContext};
pub use error::ErrorPayload;
pub use handler::{handler_fn, BoxError, FnHandler, Handler, HandlerError};
pub use registry::{HandlerPath, HandlerRegistry, PathRegistry, ResolveError};
