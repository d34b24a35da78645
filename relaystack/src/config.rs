//! Configuration management

use relaystack_handlers::exec::DEFAULT_INTERPRETER;
use serde::Deserialize;

use crate::route::RouteTable;

/// Marker in the host function name that gives a process the HTTP role
pub const HTTP_FUNCTION_MARKER: &str = "HttpFunction";

/// Environment variable holding the host function name
pub const FUNCTION_NAME_ENV: &str = "AWS_LAMBDA_FUNCTION_NAME";

/// Process dispatch configuration, read once at start
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Path of the web application factory
    #[serde(default)]
    pub http_application: Option<String>,

    /// Handler for queue-delivered records
    #[serde(default)]
    pub queue_handler: Option<String>,

    /// Handler for events no other route claims
    #[serde(default)]
    pub default_handler: Option<String>,

    /// Overrides the function-name check for the HTTP role
    #[serde(default)]
    pub http_function: Option<bool>,

    #[serde(default = "default_interpreter")]
    pub exec_interpreter: String,

    #[serde(default)]
    pub function_name: Option<String>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            http_application: None,
            queue_handler: None,
            default_handler: None,
            http_function: None,
            exec_interpreter: default_interpreter(),
            function_name: None,
        }
    }
}

fn default_interpreter() -> String {
    DEFAULT_INTERPRETER.to_string()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl DispatchConfig {
    /// Load configuration from file and environment
    pub fn load() -> anyhow::Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("relaystack").required(false))
            .add_source(
                config::Environment::with_prefix("RELAYSTACK").ignore_empty(true),
            )
            .set_override_option(
                "function_name",
                non_empty(std::env::var(FUNCTION_NAME_ENV).ok()),
            )?;

        Self::from_config(builder.build()?)
    }

    pub fn from_config(config: config::Config) -> anyhow::Result<Self> {
        Ok(config.try_deserialize::<Self>()?.normalized())
    }

    fn normalized(mut self) -> Self {
        self.http_application = non_empty(self.http_application);
        self.queue_handler = non_empty(self.queue_handler);
        self.default_handler = non_empty(self.default_handler);
        self.function_name = non_empty(self.function_name);
        if self.exec_interpreter.is_empty() {
            self.exec_interpreter = default_interpreter();
        }
        self
    }

    /// Whether this process serves the web application
    pub fn serves_http(&self) -> bool {
        self.http_function.unwrap_or_else(|| {
            self.function_name
                .as_deref()
                .is_some_and(|name| name.contains(HTTP_FUNCTION_MARKER))
        })
    }

    pub fn route_table(&self) -> RouteTable {
        RouteTable {
            serves_http: self.serves_http() && self.http_application.is_some(),
            queue_handler: self.queue_handler.clone(),
            default_handler: self.default_handler.clone(),
        }
    }
}
