//! The long-lived web application contract

use async_trait::async_trait;
use axum::body::Body;
use http::{Request, Response};
use relaystack_core::{BoxError, PathRegistry};
use std::sync::Arc;
use tower::{Service, ServiceExt};

/// A web application served through the HTTP bridge
///
/// One instance lives for the whole process and handles every HTTP-shaped
/// invocation, so construction cost is paid once per cold start.
#[async_trait]
pub trait Application: Send + Sync {
    /// Handle one request. The response body may be streamed; the bridge
    /// drains it completely.
    async fn call(&self, request: Request<Body>) -> Result<Response<Body>, BoxError>;
}

/// Builds the process's application on first use
pub type ApplicationFactory = Arc<dyn Fn() -> Result<Arc<dyn Application>, BoxError> + Send + Sync>;

/// Application factories addressable by dotted path
pub type ApplicationRegistry = PathRegistry<ApplicationFactory>;

/// Serves requests through a cloneable `tower::Service`, such as an
/// `axum::Router`
#[derive(Debug, Clone)]
pub struct ServiceApplication<S> {
    service: S,
}

impl<S> ServiceApplication<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S> Application for ServiceApplication<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + Sync + 'static,
    S::Future: Send,
    S::Error: Into<BoxError>,
{
    async fn call(&self, request: Request<Body>) -> Result<Response<Body>, BoxError> {
        self.service.clone().oneshot(request).await.map_err(Into::into)
    }
}
