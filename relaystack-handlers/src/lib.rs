//! Built-in handlers for RelayStack
//!
//! - `logger`: records the event and context, also the dispatch fallback
//! - `shell`: runs an external command and captures its output
//! - `exec`: runs a code snippet through an interpreter
//! - `manage`: runs a registered management command

pub mod exec;
pub mod logger;
pub mod manage;
pub mod shell;

use std::sync::Arc;

use relaystack_core::{HandlerRegistry, ResolveError};

pub use exec::ExecHandler;
pub use logger::LoggerHandler;
pub use manage::{CommandOutput, CommandRegistry, ManagementCommand, ManagementHandler, SetupHook};
pub use shell::{ShellHandler, ShellResult};

pub const LOGGER_HANDLER_PATH: &str = "relaystack.handlers.logger.handler";
pub const SHELL_HANDLER_PATH: &str = "relaystack.handlers.shell.handler";
pub const EXEC_HANDLER_PATH: &str = "relaystack.handlers.exec.handler";
pub const MANAGE_HANDLER_PATH: &str = "relaystack.handlers.manage.handler";

/// Register the built-in handlers under their well-known paths
pub fn register_builtin(
    registry: &HandlerRegistry,
    management: ManagementHandler,
    exec: ExecHandler,
) -> Result<(), ResolveError> {
    registry.register(LOGGER_HANDLER_PATH, Arc::new(LoggerHandler))?;
    registry.register(SHELL_HANDLER_PATH, Arc::new(ShellHandler))?;
    registry.register(EXEC_HANDLER_PATH, Arc::new(exec))?;
    registry.register(MANAGE_HANDLER_PATH, Arc::new(management))?;
    Ok(())
}
