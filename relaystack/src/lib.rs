//! RelayStack - event dispatch for serverless functions
//!
//! One process receives every invocation for a function and routes it to a
//! single handler by the event's shape: an explicit `handler_path`, a
//! gateway HTTP event for the process-wide web application, queue records,
//! a configured default, or the logger fallback.
//!
//! ```rust,no_run
//! use relaystack::{DispatchConfig, Dispatcher};
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let dispatcher = Dispatcher::builder(DispatchConfig::load()?).build()?;
//! relaystack::host::serve(Arc::new(dispatcher))
//!     .await
//!     .map_err(|e| anyhow::anyhow!(e))?;
//! # Ok(())
//! # }
//! ```

pub mod commands;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod host;
pub mod logging;
pub mod route;
pub mod singleton;

pub use config::DispatchConfig;
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use error::DispatchError;
pub use route::{route, Route, RouteTable};
pub use singleton::ApplicationSingleton;
