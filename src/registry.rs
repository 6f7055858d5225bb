//! Interceptor registry
//!
//! A catalog mapping stage names to their metadata and factory. It is
//! populated once while the process assembles its pipelines and only read
//! afterwards, so it is an owned value handed to the assembly step rather
//! than a global.

use crate::interceptor::Interceptor;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Prefix reserved for stages provided by the pipeline itself
pub const RESERVED_PREFIX: &str = "system:";

/// Builds a stage instance from its opaque configuration
pub type InterceptorFactory =
    Arc<dyn Fn(&Value) -> Result<Arc<dyn Interceptor>, RegistryError> + Send + Sync>;

/// Registry errors
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Interceptor name can not start with \"system:\": {0}")]
    ReservedName(String),
    #[error("Failed to instantiate interceptor '{name}': {message}")]
    Instantiation { name: String, message: String },
}

impl RegistryError {
    pub fn instantiation<N: Into<String>, M: Into<String>>(name: N, message: M) -> Self {
        Self::Instantiation {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Declared metadata of a stage
#[derive(Clone)]
pub struct InterceptorMetadata {
    pub name: String,
    pub description: String,
    factory: InterceptorFactory,
}

impl InterceptorMetadata {
    pub fn new<N, D, F>(name: N, description: D, factory: F) -> Self
    where
        N: Into<String>,
        D: Into<String>,
        F: Fn(&Value) -> Result<Arc<dyn Interceptor>, RegistryError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            factory: Arc::new(factory),
        }
    }

    pub fn factory(&self) -> InterceptorFactory {
        self.factory.clone()
    }

    /// Instantiate the stage with `config`
    pub fn instantiate(&self, config: &Value) -> Result<Arc<dyn Interceptor>, RegistryError> {
        (self.factory)(config)
    }
}

impl fmt::Debug for InterceptorMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorMetadata")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Name-keyed catalog of interceptor metadata
#[derive(Debug, Default, Clone)]
pub struct InterceptorRegistry {
    entries: HashMap<String, InterceptorMetadata>,
}

impl InterceptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a stage.
    ///
    /// Names starting with [`RESERVED_PREFIX`] are always rejected. A name
    /// that is already registered is left untouched and the call is a no-op.
    pub fn register(&mut self, metadata: InterceptorMetadata) -> Result<(), RegistryError> {
        if metadata.name.starts_with(RESERVED_PREFIX) {
            return Err(RegistryError::ReservedName(metadata.name));
        }

        if self.entries.contains_key(&metadata.name) {
            warn!(
                interceptor = %metadata.name,
                "Duplicated interceptor definition ignored"
            );
            return Ok(());
        }

        debug!(interceptor = %metadata.name, "Registered interceptor");
        self.entries.insert(metadata.name.clone(), metadata);
        Ok(())
    }

    /// Factory registered under `name`
    pub fn lookup_class(&self, name: &str) -> Option<InterceptorFactory> {
        self.lookup_metadata(name).map(InterceptorMetadata::factory)
    }

    /// Metadata registered under `name`
    pub fn lookup_metadata(&self, name: &str) -> Option<&InterceptorMetadata> {
        let metadata = self.entries.get(name);
        if metadata.is_none() {
            warn!(interceptor = %name, "Missing interceptor in registry");
        }
        metadata
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
