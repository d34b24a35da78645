//! Handler path resolution
//!
//! Handlers are referenced by dotted paths of the form
//! `package.module.attribute`. Instead of importing code at runtime, paths
//! are looked up in a registry populated when the process starts.

use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::handler::Handler;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("Invalid handler path: {0:?}")]
    InvalidPath(String),

    #[error("No module named {0:?}")]
    ModuleNotFound(String),

    #[error("Module {module:?} has no attribute {attribute:?}")]
    AttributeNotFound { module: String, attribute: String },
}

/// A parsed `module.attribute` reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandlerPath {
    module: String,
    attribute: String,
}

impl HandlerPath {
    /// Split a dotted path at its last dot
    pub fn parse(path: &str) -> Result<Self, ResolveError> {
        match path.rsplit_once('.') {
            Some((module, attribute)) if !module.is_empty() && !attribute.is_empty() => {
                Ok(Self {
                    module: module.to_string(),
                    attribute: attribute.to_string(),
                })
            }
            _ => Err(ResolveError::InvalidPath(path.to_string())),
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }
}

impl fmt::Display for HandlerPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.attribute)
    }
}

/// Registry of values addressable by dotted path
///
/// Entries are grouped by module so a lookup failure can tell a missing
/// module apart from a missing attribute.
pub struct PathRegistry<T> {
    // module -> attribute -> entry
    modules: DashMap<String, DashMap<String, T>>,
}

/// Registry of dispatch targets
pub type HandlerRegistry = PathRegistry<Arc<dyn Handler>>;

impl<T: Clone> PathRegistry<T> {
    pub fn new() -> Self {
        Self {
            modules: DashMap::new(),
        }
    }

    /// Register an entry, replacing any previous entry at the same path
    pub fn register(&self, path: &str, entry: T) -> Result<(), ResolveError> {
        let path = HandlerPath::parse(path)?;
        self.modules
            .entry(path.module)
            .or_default()
            .insert(path.attribute, entry);
        Ok(())
    }

    /// Resolve a dotted path to its entry
    pub fn resolve(&self, path: &str) -> Result<T, ResolveError> {
        let path = HandlerPath::parse(path)?;
        let module = self
            .modules
            .get(path.module())
            .ok_or_else(|| ResolveError::ModuleNotFound(path.module().to_string()))?;

        let entry = module
            .get(path.attribute())
            .ok_or_else(|| ResolveError::AttributeNotFound {
                module: path.module().to_string(),
                attribute: path.attribute().to_string(),
            })?;

        Ok(entry.value().clone())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.resolve(path).is_ok()
    }

    /// All registered paths, sorted
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .modules
            .iter()
            .flat_map(|module| {
                let name = module.key().clone();
                module
                    .value()
                    .iter()
                    .map(|attr| format!("{}.{}", name, attr.key()))
                    .collect::<Vec<_>>()
            })
            .collect();
        paths.sort();
        paths
    }

    pub fn len(&self) -> usize {
        self.modules.iter().map(|m| m.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone> Default for PathRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
