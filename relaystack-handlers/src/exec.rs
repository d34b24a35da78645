//! Dynamic code handler
//!
//! Runs the code snippet carried by the event through an interpreter. There
//! is no sandbox and no output capture: the snippet writes straight to the
//! process streams, which the host forwards to its logs.

use async_trait::async_trait;
use relaystack_core::{Event, Handler, HandlerError, InvocationContext};
use serde_json::Value;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

pub const DEFAULT_INTERPRETER: &str = "/bin/sh";

#[derive(Debug, Clone)]
pub struct ExecHandler {
    interpreter: String,
}

impl ExecHandler {
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }

    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }
}

impl Default for ExecHandler {
    fn default() -> Self {
        Self::new(DEFAULT_INTERPRETER)
    }
}

#[async_trait]
impl Handler for ExecHandler {
    async fn invoke(
        &self,
        event: &Event,
        _context: &InvocationContext,
    ) -> Result<Value, HandlerError> {
        let code = event
            .get("args")
            .and_then(Value::as_array)
            .and_then(|args| args.first())
            .and_then(Value::as_str)
            .ok_or_else(|| {
                HandlerError::InvalidEvent("`args` must start with the code to run".to_string())
            })?;

        let kwargs = match event.get("kwargs") {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(map),
            Some(other) => {
                return Err(HandlerError::InvalidEvent(format!(
                    "`kwargs` must be an object, got {}",
                    other
                )))
            }
        };

        let interpreter = kwargs
            .and_then(|k| k.get("interpreter"))
            .and_then(Value::as_str)
            .unwrap_or(self.interpreter.as_str());

        let mut command = Command::new(interpreter);
        command.arg("-c").arg(code).stdin(Stdio::null());

        if let Some(env) = kwargs.and_then(|k| k.get("env")).and_then(Value::as_object) {
            for (key, value) in env {
                match value.as_str() {
                    Some(value) => {
                        command.env(key, value);
                    }
                    None => {
                        return Err(HandlerError::InvalidEvent(format!(
                            "`env.{}` must be a string",
                            key
                        )))
                    }
                }
            }
        }

        debug!(interpreter = %interpreter, "Executing code snippet");

        let status = command.status().await?;
        if !status.success() {
            warn!(interpreter = %interpreter, status = ?status.code(), "Code snippet failed");
            return Err(HandlerError::CodeFailed(status.code()));
        }

        Ok(Value::Null)
    }
}
