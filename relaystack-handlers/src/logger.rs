//! Diagnostic handler that records its input

use async_trait::async_trait;
use relaystack_core::{Event, Handler, HandlerError, InvocationContext};
use serde_json::Value;
use tracing::info;

/// Logs the event and context, returns `null`.
///
/// Also used by the dispatcher when no other handler matches.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggerHandler;

#[async_trait]
impl Handler for LoggerHandler {
    async fn invoke(
        &self,
        event: &Event,
        context: &InvocationContext,
    ) -> Result<Value, HandlerError> {
        info!(event = %event, "Lambda event");
        info!(
            request_id = %context.aws_request_id,
            function_name = %context.function_name,
            function_version = %context.function_version,
            invoked_function_arn = %context.invoked_function_arn,
            memory_limit_in_mb = context.memory_limit_in_mb,
            remaining_ms = u64::try_from(context.remaining_time().as_millis()).unwrap_or(u64::MAX),
            "Lambda context"
        );
        Ok(Value::Null)
    }
}
