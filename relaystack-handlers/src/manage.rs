//! Management command handler
//!
//! Runs a named administrative command registered with the process. The
//! command name is the first positional argument or the `command_name`
//! keyword; remaining arguments are passed through without validation.

use async_trait::async_trait;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use relaystack_core::{BoxError, Event, Handler, HandlerError, InvocationContext};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// Captured text output of a management command
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    stdout: String,
    stderr: String,
}

impl CommandOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writer for standard output, use with `writeln!`
    pub fn stdout(&mut self) -> &mut String {
        &mut self.stdout
    }

    /// Writer for standard error, use with `writeln!`
    pub fn stderr(&mut self) -> &mut String {
        &mut self.stderr
    }

    pub fn into_value(self) -> Value {
        json!({ "stdout": self.stdout, "stderr": self.stderr })
    }
}

/// An administrative command invocable by name
#[async_trait]
pub trait ManagementCommand: Send + Sync {
    /// One-line description shown by command listings
    fn help(&self) -> &str {
        ""
    }

    async fn execute(
        &self,
        args: &[Value],
        options: &Map<String, Value>,
        output: &mut CommandOutput,
    ) -> Result<(), HandlerError>;
}

/// Named management commands
#[derive(Default)]
pub struct CommandRegistry {
    commands: DashMap<String, Arc<dyn ManagementCommand>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: impl Into<String>, command: Arc<dyn ManagementCommand>) {
        let name = name.into();
        debug!(command = %name, "Registered management command");
        self.commands.insert(name, command);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ManagementCommand>> {
        self.commands.get(name).map(|c| c.value().clone())
    }

    /// Registered command names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.commands.iter().map(|c| c.key().clone()).collect();
        names.sort();
        names
    }
}

/// One-time framework initialization run before the first command
pub type SetupHook = Box<dyn Fn() -> Result<(), BoxError> + Send + Sync>;

pub struct ManagementHandler {
    commands: Arc<CommandRegistry>,
    setup: Option<SetupHook>,
    initialized: OnceCell<()>,
}

impl ManagementHandler {
    pub fn new(commands: Arc<CommandRegistry>) -> Self {
        Self {
            commands,
            setup: None,
            initialized: OnceCell::new(),
        }
    }

    pub fn with_setup(mut self, setup: SetupHook) -> Self {
        self.setup = Some(setup);
        self
    }

    pub fn commands(&self) -> &Arc<CommandRegistry> {
        &self.commands
    }

    fn ensure_setup(&self) -> Result<(), HandlerError> {
        self.initialized.get_or_try_init(|| {
            if let Some(setup) = &self.setup {
                info!("Initializing framework for management commands");
                setup().map_err(HandlerError::Other)?;
            }
            Ok::<(), HandlerError>(())
        })?;
        Ok(())
    }
}

#[async_trait]
impl Handler for ManagementHandler {
    async fn invoke(
        &self,
        event: &Event,
        _context: &InvocationContext,
    ) -> Result<Value, HandlerError> {
        self.ensure_setup()?;

        let mut args = match event.get("args") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(args)) => args.clone(),
            Some(other) => {
                return Err(HandlerError::InvalidEvent(format!(
                    "`args` must be a list, got {}",
                    other
                )))
            }
        };
        let mut options = match event.get("kwargs") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(kwargs)) => kwargs.clone(),
            Some(other) => {
                return Err(HandlerError::InvalidEvent(format!(
                    "`kwargs` must be an object, got {}",
                    other
                )))
            }
        };

        let name = match args.first() {
            Some(Value::String(name)) => {
                let name = name.clone();
                args.remove(0);
                name
            }
            _ => match options.remove("command_name") {
                Some(Value::String(name)) => name,
                _ => {
                    return Err(HandlerError::InvalidEvent(
                        "a command name is required".to_string(),
                    ))
                }
            },
        };

        let command = self
            .commands
            .get(&name)
            .ok_or_else(|| HandlerError::UnknownCommand(name.clone()))?;

        info!(command = %name, "Running management command");

        let mut output = CommandOutput::new();
        command.execute(&args, &options, &mut output).await?;

        Ok(output.into_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Greet;

    #[async_trait]
    impl ManagementCommand for Greet {
        fn help(&self) -> &str {
            "Say hello"
        }

        async fn execute(
            &self,
            args: &[Value],
            options: &Map<String, Value>,
            output: &mut CommandOutput,
        ) -> Result<(), HandlerError> {
            let loud = options.get("loud").and_then(Value::as_bool).unwrap_or(false);
            for arg in args {
                let name = arg.as_str().unwrap_or("?");
                let line = if loud { name.to_uppercase() } else { name.to_string() };
                writeln!(output.stdout(), "hello {}", line).unwrap();
            }
            if args.is_empty() {
                writeln!(output.stderr(), "nobody to greet").unwrap();
            }
            Ok(())
        }
    }

    struct Broken;

    #[async_trait]
    impl ManagementCommand for Broken {
        async fn execute(
            &self,
            _args: &[Value],
            _options: &Map<String, Value>,
            _output: &mut CommandOutput,
        ) -> Result<(), HandlerError> {
            Err(HandlerError::InvalidEvent("bad option".to_string()))
        }
    }

    fn handler() -> ManagementHandler {
        let commands = Arc::new(CommandRegistry::new());
        commands.register("greet", Arc::new(Greet));
        commands.register("broken", Arc::new(Broken));
        ManagementHandler::new(commands)
    }

    fn ctx() -> InvocationContext {
        InvocationContext::local("tasks", Duration::from_secs(10))
    }

    #[tokio::test]
    async fn test_command_name_from_args() {
        let result = handler()
            .invoke(&json!({ "args": ["greet", "ada", "alan"] }), &ctx())
            .await
            .unwrap();

        assert_eq!(result, json!({ "stdout": "hello ada\nhello alan\n", "stderr": "" }));
    }

    #[tokio::test]
    async fn test_command_name_from_kwargs() {
        let result = handler()
            .invoke(
                &json!({ "kwargs": { "command_name": "greet", "loud": true } }),
                &ctx(),
            )
            .await
            .unwrap();

        assert_eq!(result, json!({ "stdout": "", "stderr": "nobody to greet\n" }));
    }

    #[tokio::test]
    async fn test_kwargs_passed_to_command() {
        let result = handler()
            .invoke(&json!({ "args": ["greet", "ada"], "kwargs": { "loud": true } }), &ctx())
            .await
            .unwrap();

        assert_eq!(result["stdout"], "hello ADA\n");
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let err = handler()
            .invoke(&json!({ "args": ["migrate"] }), &ctx())
            .await
            .unwrap_err();

        assert!(matches!(err, HandlerError::UnknownCommand(name) if name == "migrate"));
    }

    #[tokio::test]
    async fn test_missing_command_name() {
        let err = handler().invoke(&json!({}), &ctx()).await.unwrap_err();
        assert!(matches!(err, HandlerError::InvalidEvent(_)));
    }

    #[tokio::test]
    async fn test_command_error_propagates() {
        let err = handler()
            .invoke(&json!({ "args": ["broken"] }), &ctx())
            .await
            .unwrap_err();

        assert!(matches!(err, HandlerError::InvalidEvent(msg) if msg == "bad option"));
    }

    #[tokio::test]
    async fn test_setup_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handler = handler().with_setup(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        for _ in 0..3 {
            handler
                .invoke(&json!({ "args": ["greet", "x"] }), &ctx())
                .await
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_setup_is_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handler = handler().with_setup(Box::new(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(BoxError::from("settings not ready"))
            } else {
                Ok(())
            }
        }));

        let event = json!({ "args": ["greet", "x"] });
        assert!(handler.invoke(&event, &ctx()).await.is_err());
        assert!(handler.invoke(&event, &ctx()).await.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_registry_names() {
        let registry = CommandRegistry::new();
        registry.register("b", Arc::new(Broken));
        registry.register("a", Arc::new(Greet));

        assert_eq!(registry.names(), vec!["a", "b"]);
        assert_eq!(registry.get("a").unwrap().help(), "Say hello");
        assert!(registry.get("c").is_none());
    }
}
