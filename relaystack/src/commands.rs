//! Built-in management commands
//!
//! `check` resolves every configured handler path and the application path
//! so a broken deployment shows up before real traffic does. `handlers`
//! lists the registered handler and application paths.

use async_trait::async_trait;
use relaystack_core::{BoxError, HandlerError, HandlerRegistry};
use relaystack_handlers::{CommandOutput, CommandRegistry, ManagementCommand};
use relaystack_http::ApplicationRegistry;
use serde_json::{Map, Value};
use std::fmt::Write;
use std::sync::{Arc, Weak};

/// Paths `check` verifies
#[derive(Debug, Clone, Default)]
pub struct CheckTargets {
    pub http_application: Option<String>,
    pub queue_handler: Option<String>,
    pub default_handler: Option<String>,
}

// The registries own the management handler, which owns these commands.
// Weak references keep that from becoming a cycle.
pub struct CheckCommand {
    handlers: Weak<HandlerRegistry>,
    applications: Weak<ApplicationRegistry>,
    targets: CheckTargets,
}

pub struct HandlersCommand {
    handlers: Weak<HandlerRegistry>,
    applications: Weak<ApplicationRegistry>,
}

fn upgrade<T>(registry: &Weak<T>) -> Result<Arc<T>, HandlerError> {
    registry
        .upgrade()
        .ok_or_else(|| HandlerError::Other(BoxError::from("dispatcher is shutting down")))
}

/// Register `check` and `handlers`
pub fn register(
    commands: &CommandRegistry,
    handlers: &Arc<HandlerRegistry>,
    applications: &Arc<ApplicationRegistry>,
    targets: CheckTargets,
) {
    commands.register(
        "check",
        Arc::new(CheckCommand {
            handlers: Arc::downgrade(handlers),
            applications: Arc::downgrade(applications),
            targets,
        }),
    );
    commands.register(
        "handlers",
        Arc::new(HandlersCommand {
            handlers: Arc::downgrade(handlers),
            applications: Arc::downgrade(applications),
        }),
    );
}

#[async_trait]
impl ManagementCommand for CheckCommand {
    fn help(&self) -> &str {
        "Verify that every configured handler and application path resolves"
    }

    async fn execute(
        &self,
        _args: &[Value],
        _options: &Map<String, Value>,
        output: &mut CommandOutput,
    ) -> Result<(), HandlerError> {
        let handlers = upgrade(&self.handlers)?;
        let applications = upgrade(&self.applications)?;
        let mut failures = 0;

        let handler_paths = [
            ("queue_handler", &self.targets.queue_handler),
            ("default_handler", &self.targets.default_handler),
        ];
        for (setting, path) in handler_paths {
            let Some(path) = path else { continue };
            match handlers.resolve(path) {
                Ok(_) => {
                    let _ = writeln!(output.stdout(), "ok {} {}", setting, path);
                }
                Err(e) => {
                    failures += 1;
                    let _ = writeln!(output.stderr(), "error {} {}: {}", setting, path, e);
                }
            }
        }

        if let Some(path) = &self.targets.http_application {
            match applications.resolve(path) {
                Ok(_) => {
                    let _ = writeln!(output.stdout(), "ok http_application {}", path);
                }
                Err(e) => {
                    failures += 1;
                    let _ = writeln!(output.stderr(), "error http_application {}: {}", path, e);
                }
            }
        }

        if failures > 0 {
            return Err(HandlerError::Other(BoxError::from(format!(
                "{} configured path(s) failed to resolve",
                failures
            ))));
        }
        Ok(())
    }
}

#[async_trait]
impl ManagementCommand for HandlersCommand {
    fn help(&self) -> &str {
        "List registered handler and application paths"
    }

    async fn execute(
        &self,
        _args: &[Value],
        _options: &Map<String, Value>,
        output: &mut CommandOutput,
    ) -> Result<(), HandlerError> {
        let handlers = upgrade(&self.handlers)?;
        let applications = upgrade(&self.applications)?;
        for path in handlers.paths() {
            let _ = writeln!(output.stdout(), "handler {}", path);
        }
        for path in applications.paths() {
            let _ = writeln!(output.stdout(), "application {}", path);
        }
        Ok(())
    }
}
