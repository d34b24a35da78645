//! Event shape classification
//!
//! Events carry no type tag, so the route is chosen from structural checks
//! in a fixed order. The first match wins.

use relaystack_core::Event;
use serde_json::Value;

/// `eventSource` of queue-delivered records
pub const QUEUE_EVENT_SOURCE: &str = "aws:sqs";

/// Where an event goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// The event names its handler in `handler_path`
    Explicit(String),
    /// Gateway HTTP event for the process's application
    Http,
    /// Queue records for the configured queue handler
    Queue(String),
    /// The configured default handler
    Default(String),
    /// Nothing matched
    Fallback,
}

impl Route {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Explicit(_) => "explicit",
            Self::Http => "http",
            Self::Queue(_) => "queue",
            Self::Default(_) => "default",
            Self::Fallback => "fallback",
        }
    }

    /// Handler path this route resolves, if any
    pub fn handler_path(&self) -> Option<&str> {
        match self {
            Self::Explicit(path) | Self::Queue(path) | Self::Default(path) => Some(path),
            Self::Http | Self::Fallback => None,
        }
    }
}

/// Routes enabled by the process configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTable {
    pub serves_http: bool,
    pub queue_handler: Option<String>,
    pub default_handler: Option<String>,
}

/// Choose the route for `event`
pub fn route(event: &Event, table: &RouteTable) -> Route {
    if let Some(path) = explicit_handler_path(event) {
        return Route::Explicit(path.to_string());
    }

    if table.serves_http && is_http_event(event) {
        return Route::Http;
    }

    if let Some(path) = &table.queue_handler {
        if is_queue_event(event) {
            return Route::Queue(path.clone());
        }
    }

    match &table.default_handler {
        Some(path) => Route::Default(path.clone()),
        None => Route::Fallback,
    }
}

/// A non-empty string `handler_path` field
pub fn explicit_handler_path(event: &Event) -> Option<&str> {
    event
        .get("handler_path")
        .and_then(Value::as_str)
        .filter(|path| !path.is_empty())
}

/// Gateway events carry both `requestContext` and `version`
pub fn is_http_event(event: &Event) -> bool {
    event.get("requestContext").is_some() && event.get("version").is_some()
}

/// Only the first record's origin is checked
pub fn is_queue_event(event: &Event) -> bool {
    event
        .get("Records")
        .and_then(Value::as_array)
        .and_then(|records| records.first())
        .and_then(|record| record.get("eventSource"))
        .and_then(Value::as_str)
        == Some(QUEUE_EVENT_SOURCE)
}
