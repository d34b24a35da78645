//! Remote shell commands
//!
//! Sends a shell invocation to a deployed function with an explicit
//! `handler_path`, so it is routed to the shell handler whatever else the
//! function serves.

use bytes::Bytes;
use relaystack_core::BoxError;
use relaystack_handlers::{ShellResult, SHELL_HANDLER_PATH};
use serde::Deserialize;
use serde_json::{json, Value};
use std::io::{self, Write};
use thiserror::Error;
use tracing::{info, warn};

use crate::invoker::{FunctionInvoker, InvokeResponse};

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Function invocation failed with status {status}: {function_error:?}")]
    InvocationFailed {
        status: i32,
        function_error: Option<String>,
    },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Shell command failed: {error_type}: {error_message}")]
    CommandFailed {
        error_type: String,
        error_message: String,
    },

    #[error("Invoke error: {0}")]
    Invoke(#[source] BoxError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub struct RemoteShell<I> {
    invoker: I,
    function_name: String,
}

impl<I: FunctionInvoker> RemoteShell<I> {
    pub fn new(invoker: I, function_name: impl Into<String>) -> Self {
        Self {
            invoker,
            function_name: function_name.into(),
        }
    }

    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    /// Event sent to the function for `args`
    pub fn payload(args: &[String], log_result: bool) -> Value {
        json!({
            "args": args,
            "log_result": log_result,
            "handler_path": SHELL_HANDLER_PATH,
        })
    }

    /// Run `args` remotely and return the command's outcome
    pub async fn run(&self, args: &[String], log_result: bool) -> Result<ShellResult, RemoteError> {
        let payload = serde_json::to_vec(&Self::payload(args, log_result))?;

        info!(function = %self.function_name, "Invoking function");
        let response = self
            .invoker
            .invoke(&self.function_name, Bytes::from(payload))
            .await
            .map_err(RemoteError::Invoke)?;

        interpret(&response)
    }
}

/// Turn a raw invocation response into the shell outcome
pub fn interpret(response: &InvokeResponse) -> Result<ShellResult, RemoteError> {
    if response.status_code != 200 {
        return Err(RemoteError::InvocationFailed {
            status: response.status_code,
            function_error: response.function_error.clone(),
        });
    }

    let result: Value = serde_json::from_slice(&response.payload).map_err(|_| {
        RemoteError::UnexpectedResponse(String::from_utf8_lossy(&response.payload).into_owned())
    })?;

    let Value::Object(document) = &result else {
        return Err(RemoteError::UnexpectedResponse(result.to_string()));
    };

    if response.function_error.is_some() {
        let field = |name: &str| {
            document
                .get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let error_message = field("errorMessage");
        warn!(error = %error_message, "Shell command failed remotely");
        return Err(RemoteError::CommandFailed {
            error_type: field("errorType"),
            error_message,
        });
    }

    ShellResult::deserialize(&result).map_err(|_| RemoteError::UnexpectedResponse(result.to_string()))
}

/// Write a remote command's output to local streams.
///
/// Empty streams are skipped; others are written with their trailing
/// newlines replaced by exactly one. Returns the command's exit code.
pub fn replay<O: Write, E: Write>(result: &ShellResult, stdout: &mut O, stderr: &mut E) -> io::Result<i32> {
    if !result.stdout.is_empty() {
        writeln!(stdout, "{}", result.stdout.trim_matches('\n'))?;
    }
    if !result.stderr.is_empty() {
        writeln!(stderr, "{}", result.stderr.trim_matches('\n'))?;
    }
    Ok(result.exit_code)
}
