//! Chain assembly from configuration
//!
//! Resolves each declared interceptor name through the registry, builds the
//! stage from its configuration and links the stages in declaration order.

use crate::assembly_span;
use crate::chain::Chain;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::interceptor::Interceptor;
use crate::registry::InterceptorRegistry;
use std::sync::Arc;
use tracing::{info, warn};

/// Assembles chains from a registry
pub struct ChainBuilder<'r> {
    registry: &'r InterceptorRegistry,
}

impl<'r> ChainBuilder<'r> {
    pub fn new(registry: &'r InterceptorRegistry) -> Self {
        Self { registry }
    }

    /// Build the chain declared by `config`
    pub fn build(&self, config: &PipelineConfig) -> PipelineResult<Chain> {
        let _span = assembly_span!(pipeline = %config.pipeline.name).entered();
        config.validate()?;

        let mut stages: Vec<Arc<dyn Interceptor>> = Vec::with_capacity(config.interceptors.len());
        for declaration in &config.interceptors {
            let name = declaration.name();
            let factory = self.registry.lookup_class(name).ok_or_else(|| {
                PipelineError::assembly(format!("unknown interceptor '{name}'"))
            })?;

            let stage = factory(&declaration.config_value()).map_err(|e| {
                PipelineError::assembly(format!("failed to instantiate '{name}': {e}"))
            })?;
            if stage.name() != name {
                warn!(
                    declared = %name,
                    actual = %stage.name(),
                    "Interceptor instance name differs from its declaration"
                );
            }
            stages.push(stage);
        }

        let chain = Chain::new(stages)?;
        info!(
            pipeline = %config.pipeline.name,
            stages = ?chain.stage_names(),
            "Assembled interceptor chain"
        );
        Ok(chain)
    }
}
