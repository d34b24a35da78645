//! Synchronous function invocation

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::Client;
use bytes::Bytes;
use relaystack_core::BoxError;
use tracing::debug;

/// Raw outcome of a request/response invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeResponse {
    pub status_code: i32,
    /// Set when the function itself failed; the payload then holds the
    /// error document
    pub function_error: Option<String>,
    pub payload: Bytes,
}

/// Invokes a deployed function by name
#[async_trait]
pub trait FunctionInvoker: Send + Sync {
    async fn invoke(&self, function_name: &str, payload: Bytes) -> Result<InvokeResponse, BoxError>;
}

/// [`FunctionInvoker`] backed by the AWS Lambda API
#[derive(Debug, Clone)]
pub struct LambdaInvoker {
    client: Client,
}

impl LambdaInvoker {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the default credential and region chain
    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        Self::new(Client::new(&config))
    }
}

#[async_trait]
impl FunctionInvoker for LambdaInvoker {
    async fn invoke(&self, function_name: &str, payload: Bytes) -> Result<InvokeResponse, BoxError> {
        debug!(function = %function_name, bytes = payload.len(), "Invoking function");

        let output = self
            .client
            .invoke()
            .function_name(function_name)
            .payload(Blob::new(payload.to_vec()))
            .send()
            .await
            .map_err(aws_sdk_lambda::Error::from)?;

        Ok(InvokeResponse {
            status_code: output.status_code(),
            function_error: output.function_error().map(str::to_string),
            payload: output
                .payload()
                .map(|blob| Bytes::copy_from_slice(blob.as_ref()))
                .unwrap_or_default(),
        })
    }
}
