//! Event dispatcher
//!
//! Routes each invocation to exactly one handler. Precedence is fixed:
//! explicit `handler_path`, HTTP-shaped, queue-shaped, configured default,
//! then the logger fallback.

use relaystack_core::{Event, Handler, HandlerRegistry, InvocationContext, ResolveError};
use relaystack_handlers::{
    register_builtin, CommandRegistry, ExecHandler, LoggerHandler, ManagementCommand,
    ManagementHandler, SetupHook,
};
use relaystack_http::{bridge, Application, ApplicationFactory, ApplicationRegistry};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info_span, Instrument};

use crate::commands::{self, CheckTargets};
use crate::config::DispatchConfig;
use crate::error::DispatchError;
use crate::route::{route, Route, RouteTable};
use crate::singleton::ApplicationSingleton;

pub struct Dispatcher {
    handlers: Arc<HandlerRegistry>,
    applications: Arc<ApplicationRegistry>,
    application: ApplicationSingleton,
    routes: RouteTable,
}

impl Dispatcher {
    pub fn builder(config: DispatchConfig) -> DispatcherBuilder {
        DispatcherBuilder::new(config)
    }

    pub fn handlers(&self) -> &Arc<HandlerRegistry> {
        &self.handlers
    }

    pub fn route_table(&self) -> &RouteTable {
        &self.routes
    }

    /// The process's web application, built on first use
    pub fn web_application(&self) -> Result<Option<Arc<dyn Application>>, DispatchError> {
        self.application.get(&self.applications)
    }

    /// Route `event` and run the selected handler
    pub async fn dispatch(
        &self,
        event: &Event,
        context: &InvocationContext,
    ) -> Result<Value, DispatchError> {
        let route = route(event, &self.routes);
        let span = info_span!(
            "dispatch",
            request_id = %context.aws_request_id,
            route = route.name(),
        );

        async move {
            debug!(handler = ?route.handler_path(), "Dispatching event");
            match route {
                Route::Explicit(path) | Route::Queue(path) | Route::Default(path) => {
                    self.invoke_path(&path, event, context).await
                }
                Route::Http => self.serve_http(event, context).await,
                Route::Fallback => self.fallback(event, context).await,
            }
        }
        .instrument(span)
        .await
    }

    async fn invoke_path(
        &self,
        path: &str,
        event: &Event,
        context: &InvocationContext,
    ) -> Result<Value, DispatchError> {
        let handler = self.handlers.resolve(path)?;
        Ok(handler.invoke(event, context).await?)
    }

    async fn serve_http(
        &self,
        event: &Event,
        context: &InvocationContext,
    ) -> Result<Value, DispatchError> {
        let app = self
            .web_application()?
            .ok_or(DispatchError::ApplicationUnavailable)?;
        Ok(bridge(app.as_ref(), event, context).await?)
    }

    async fn fallback(
        &self,
        event: &Event,
        context: &InvocationContext,
    ) -> Result<Value, DispatchError> {
        error!("No handler found for this event");
        Ok(LoggerHandler.invoke(event, context).await?)
    }
}

/// Collects handlers, applications and management commands, then builds a
/// [`Dispatcher`] with the built-in handlers registered.
pub struct DispatcherBuilder {
    config: DispatchConfig,
    handlers: HandlerRegistry,
    applications: ApplicationRegistry,
    commands: Arc<CommandRegistry>,
    setup: Option<SetupHook>,
}

impl DispatcherBuilder {
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            config,
            handlers: HandlerRegistry::new(),
            applications: ApplicationRegistry::new(),
            commands: Arc::new(CommandRegistry::new()),
            setup: None,
        }
    }

    pub fn handler(self, path: &str, handler: Arc<dyn Handler>) -> Result<Self, ResolveError> {
        self.handlers.register(path, handler)?;
        Ok(self)
    }

    pub fn application(self, path: &str, factory: ApplicationFactory) -> Result<Self, ResolveError> {
        self.applications.register(path, factory)?;
        Ok(self)
    }

    pub fn command(self, name: &str, command: Arc<dyn ManagementCommand>) -> Self {
        self.commands.register(name, command);
        self
    }

    /// Framework initialization run once before the first management command
    pub fn setup(mut self, setup: SetupHook) -> Self {
        self.setup = Some(setup);
        self
    }

    pub fn build(self) -> Result<Dispatcher, ResolveError> {
        let handlers = Arc::new(self.handlers);
        let applications = Arc::new(self.applications);

        let mut management = ManagementHandler::new(self.commands.clone());
        if let Some(setup) = self.setup {
            management = management.with_setup(setup);
        }
        register_builtin(
            &handlers,
            management,
            ExecHandler::new(self.config.exec_interpreter.clone()),
        )?;

        commands::register(
            &self.commands,
            &handlers,
            &applications,
            CheckTargets {
                http_application: self.config.http_application.clone(),
                queue_handler: self.config.queue_handler.clone(),
                default_handler: self.config.default_handler.clone(),
            },
        );

        let routes = self.config.route_table();
        let application =
            ApplicationSingleton::new(self.config.http_application.clone(), self.config.serves_http());

        debug!(
            http = routes.serves_http,
            queue_handler = ?routes.queue_handler,
            default_handler = ?routes.default_handler,
            handlers = handlers.len(),
            "Dispatcher ready"
        );

        Ok(Dispatcher {
            handlers,
            applications,
            application,
            routes,
        })
    }
}
