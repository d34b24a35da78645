//! Invocation context passed through from the host runtime

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// An invocation event as delivered by the host.
///
/// Events carry no fixed schema; their shape decides which handler runs.
pub type Event = serde_json::Value;

/// Runtime metadata supplied by the host alongside each event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationContext {
    pub aws_request_id: String,
    pub invoked_function_arn: String,
    pub function_name: String,
    pub function_version: String,
    pub memory_limit_in_mb: i32,
    pub log_group_name: String,
    pub log_stream_name: String,
    /// Deadline as epoch milliseconds
    pub deadline_ms: i64,
}

impl InvocationContext {
    /// Build a context for a locally driven invocation.
    ///
    /// Used when no host runtime is present, e.g. `relaystack invoke`.
    pub fn local(function_name: &str, timeout: Duration) -> Self {
        let request_id = uuid::Uuid::new_v4().to_string();
        let timeout_ms = i64::try_from(timeout.as_millis()).unwrap_or(i64::MAX);
        let deadline_ms = chrono::Utc::now()
            .timestamp_millis()
            .saturating_add(timeout_ms);

        Self {
            invoked_function_arn: format!(
                "arn:aws:lambda:us-east-1:000000000000:function:{}",
                function_name
            ),
            function_name: function_name.to_string(),
            function_version: "$LATEST".to_string(),
            memory_limit_in_mb: 128,
            log_group_name: format!("/aws/lambda/{}", function_name),
            log_stream_name: format!(
                "{}/[$LATEST]{}",
                chrono::Utc::now().format("%Y/%m/%d"),
                &request_id[..8]
            ),
            aws_request_id: request_id,
            deadline_ms,
        }
    }

    /// Remaining time before the host cancels the invocation
    pub fn remaining_time(&self) -> Duration {
        let now = chrono::Utc::now().timestamp_millis();
        let remaining = (self.deadline_ms - now).max(0);
        Duration::from_millis(remaining.unsigned_abs())
    }
}
