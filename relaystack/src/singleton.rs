//! Process-wide web application
//!
//! The application is built on the first HTTP-shaped invocation and reused
//! by every later invocation in the same process.

use once_cell::sync::OnceCell;
use relaystack_http::{Application, ApplicationRegistry};
use std::sync::Arc;
use tracing::info;

use crate::error::DispatchError;

pub struct ApplicationSingleton {
    path: Option<String>,
    cell: OnceCell<Arc<dyn Application>>,
}

impl ApplicationSingleton {
    /// The role is fixed here: without a path, or outside an HTTP role,
    /// the singleton stays disabled for the life of the process.
    pub fn new(http_application: Option<String>, serves_http: bool) -> Self {
        Self {
            path: http_application.filter(|_| serves_http),
            cell: OnceCell::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.path.is_some()
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }

    /// The application, building it on first use. A failed build is
    /// returned and retried on the next call.
    pub fn get(
        &self,
        registry: &ApplicationRegistry,
    ) -> Result<Option<Arc<dyn Application>>, DispatchError> {
        let Some(path) = &self.path else {
            return Ok(None);
        };

        let app = self.cell.get_or_try_init(|| {
            let factory = registry.resolve(path)?;
            info!(application = %path, "Initializing web application");
            factory().map_err(DispatchError::ApplicationInit)
        })?;

        Ok(Some(app.clone()))
    }
}
