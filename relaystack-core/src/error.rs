//! Error payload shape reported back to the host

use serde::{Deserialize, Serialize};

/// Error document returned for a failed invocation
///
/// Mirrors the JSON the host runtime reports to callers, so both the local
/// `invoke` command and the remote client speak the same shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub error_message: String,
    pub error_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<Vec<String>>,
}

impl ErrorPayload {
    pub fn new(error_type: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            error_message: error_message.into(),
            error_type: error_type.into(),
            stack_trace: None,
        }
    }

    /// Build a payload from an error and its source chain
    pub fn from_error(error_type: impl Into<String>, error: &dyn std::error::Error) -> Self {
        let mut trace = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            trace.push(cause.to_string());
            source = cause.source();
        }

        Self {
            error_message: error.to_string(),
            error_type: error_type.into(),
            stack_trace: (!trace.is_empty()).then_some(trace),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                r#"{{"errorMessage":{:?},"errorType":{:?}}}"#,
                self.error_message, self.error_type
            )
        })
    }
}
