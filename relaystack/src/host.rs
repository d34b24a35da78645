//! Host runtime loop
//!
//! Events arrive one at a time through `lambda_runtime`; each is dispatched
//! to completion before the next is polled.

use lambda_runtime::{service_fn, Context, LambdaEvent};
use relaystack_core::InvocationContext;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use crate::dispatcher::Dispatcher;

/// Convert the host's context into an [`InvocationContext`]
pub fn invocation_context(context: &Context) -> InvocationContext {
    let config = &context.env_config;
    InvocationContext {
        aws_request_id: context.request_id.clone(),
        invoked_function_arn: context.invoked_function_arn.clone(),
        function_name: config.function_name.clone(),
        function_version: config.version.clone(),
        memory_limit_in_mb: config.memory,
        log_group_name: config.log_group.clone(),
        log_stream_name: config.log_stream.clone(),
        deadline_ms: i64::try_from(context.deadline).unwrap_or(i64::MAX),
    }
}

/// Serve invocations until the host shuts the process down
pub async fn serve(dispatcher: Arc<Dispatcher>) -> Result<(), lambda_runtime::Error> {
    info!(
        http = dispatcher.route_table().serves_http,
        handlers = dispatcher.handlers().len(),
        "Starting host loop"
    );

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let dispatcher = dispatcher.clone();
        async move {
            let context = invocation_context(&event.context);
            dispatcher
                .dispatch(&event.payload, &context)
                .await
                .map_err(|e| {
                    warn!(error = %e, error_type = e.error_type(), "Invocation failed");
                    lambda_runtime::Error::from(e)
                })
        }
    }))
    .await
}
