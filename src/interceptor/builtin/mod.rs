//! Built-in interceptors
//!
//! Each built-in lives in its own module; [`register_builtins`] adds all of
//! them to a registry under their well-known names.

pub mod attributes;
pub mod logging;

pub use attributes::{AttributesInterceptor, ATTRIBUTES_INTERCEPTOR};
pub use logging::{LoggingInterceptor, LOGGING_INTERCEPTOR};

use crate::error::PipelineResult;
use crate::interceptor::Interceptor;
use crate::registry::{InterceptorMetadata, InterceptorRegistry, RegistryError};
use std::sync::Arc;

/// Register every built-in interceptor
pub fn register_builtins(registry: &mut InterceptorRegistry) -> Result<(), RegistryError> {
    registry.register(InterceptorMetadata::new(
        LOGGING_INTERCEPTOR,
        "Logs every interceptor hook of an invocation",
        |config| Ok(Arc::new(LoggingInterceptor::from_config(config)?) as Arc<dyn Interceptor>),
    ))?;

    registry.register(InterceptorMetadata::new(
        ATTRIBUTES_INTERCEPTOR,
        "Stamps configured attributes onto the invocation context",
        |config| {
            Ok(Arc::new(AttributesInterceptor::from_config(config)?) as Arc<dyn Interceptor>)
        },
    ))?;

    Ok(())
}

/// Registry pre-populated with the built-ins
pub fn builtin_registry() -> PipelineResult<InterceptorRegistry> {
    let mut registry = InterceptorRegistry::new();
    register_builtins(&mut registry)?;
    Ok(registry)
}
