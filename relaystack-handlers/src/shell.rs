//! Shell command handler
//!
//! Runs the command given in the event's `args` list and returns its exit
//! code together with the captured output. A failing command is not a
//! handler error: the exit code is part of the result.

use async_trait::async_trait;
use relaystack_core::{Event, Handler, HandlerError, InvocationContext};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::ErrorKind;
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;
use tracing::{debug, info};

/// Exit code reported when the program does not exist
const EXIT_NOT_FOUND: i32 = 127;
/// Exit code reported when the program exists but could not be started
const EXIT_CANNOT_EXECUTE: i32 = 126;

/// Outcome of a shell command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ShellHandler;

impl ShellHandler {
    /// Run `args[0]` with the remaining arguments
    pub async fn run(args: &[String]) -> ShellResult {
        let Some((program, rest)) = args.split_first() else {
            return ShellResult {
                exit_code: EXIT_NOT_FOUND,
                stdout: String::new(),
                stderr: "no command given".to_string(),
            };
        };

        debug!(program = %program, args = ?rest, "Running shell command");

        let output = Command::new(program)
            .args(rest)
            .stdin(Stdio::null())
            .output()
            .await;

        match output {
            Ok(output) => ShellResult {
                exit_code: exit_code(output.status),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            },
            Err(e) => {
                let exit_code = if e.kind() == ErrorKind::NotFound {
                    EXIT_NOT_FOUND
                } else {
                    EXIT_CANNOT_EXECUTE
                };
                ShellResult {
                    exit_code,
                    stdout: String::new(),
                    stderr: format!("{}: {}", program, e),
                }
            }
        }
    }
}

#[async_trait]
impl Handler for ShellHandler {
    async fn invoke(
        &self,
        event: &Event,
        _context: &InvocationContext,
    ) -> Result<Value, HandlerError> {
        let args = parse_args(event)?;
        let result = Self::run(&args).await;

        let value = serde_json::to_value(&result)
            .map_err(|e| HandlerError::Other(Box::new(e)))?;

        if event.get("log_result") == Some(&Value::Bool(true)) {
            info!(result = %value, "Shell command result");
        }

        Ok(value)
    }
}

fn parse_args(event: &Event) -> Result<Vec<String>, HandlerError> {
    let args = event
        .get("args")
        .and_then(Value::as_array)
        .ok_or_else(|| HandlerError::InvalidEvent("`args` must be a list".to_string()))?;

    if args.is_empty() {
        return Err(HandlerError::InvalidEvent("`args` must not be empty".to_string()));
    }

    args.iter()
        .map(|arg| {
            arg.as_str().map(str::to_string).ok_or_else(|| {
                HandlerError::InvalidEvent(format!("`args` entries must be strings, got {}", arg))
            })
        })
        .collect()
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }

    -1
}
