//! Logging interceptor
//!
//! Accepts every context and emits one structured event per hook, which makes
//! the traversal order of an invocation visible in the logs.

use crate::interceptor::{HookError, HookResult, Interceptor};
use crate::invocation::InvocationContext;
use crate::observability::parse_log_level;
use crate::registry::RegistryError;
use async_trait::async_trait;
use serde_json::Value;
use tracing::Level;

pub const LOGGING_INTERCEPTOR: &str = "logging";

/// Logs every phase it sees
pub struct LoggingInterceptor {
    name: String,
    level: Level,
}

impl LoggingInterceptor {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            level: Level::INFO,
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Build from `{ "level": "debug" }`; missing config means INFO
    pub fn from_config(config: &Value) -> Result<Self, RegistryError> {
        let level = match config.get("level") {
            None | Some(Value::Null) => Level::INFO,
            Some(Value::String(level)) => parse_log_level(level).ok_or_else(|| {
                RegistryError::instantiation(
                    LOGGING_INTERCEPTOR,
                    format!("unknown log level '{level}'"),
                )
            })?,
            Some(other) => {
                return Err(RegistryError::instantiation(
                    LOGGING_INTERCEPTOR,
                    format!("log level must be a string, got {other}"),
                ))
            }
        };

        Ok(Self::new(LOGGING_INTERCEPTOR).with_level(level))
    }

    pub fn level(&self) -> Level {
        self.level
    }

    fn log(&self, hook: &str, ctx: &InvocationContext) {
        let invocation_id = ctx.id();
        let phase = ctx.interaction();
        match self.level {
            Level::ERROR => {
                tracing::error!(stage = %self.name, hook, %invocation_id, %phase, "interceptor hook")
            }
            Level::WARN => {
                tracing::warn!(stage = %self.name, hook, %invocation_id, %phase, "interceptor hook")
            }
            Level::INFO => {
                tracing::info!(stage = %self.name, hook, %invocation_id, %phase, "interceptor hook")
            }
            Level::DEBUG => {
                tracing::debug!(stage = %self.name, hook, %invocation_id, %phase, "interceptor hook")
            }
            _ => {
                tracing::trace!(stage = %self.name, hook, %invocation_id, %phase, "interceptor hook")
            }
        }
    }
}

#[async_trait]
impl Interceptor for LoggingInterceptor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn can_process(&self, _ctx: &InvocationContext) -> Result<bool, HookError> {
        Ok(true)
    }

    async fn init(&self, ctx: &mut InvocationContext) -> HookResult {
        self.log("init", ctx);
        Ok(())
    }

    async fn handle_request(&self, ctx: &mut InvocationContext) -> HookResult {
        self.log("handle_request", ctx);
        Ok(())
    }

    async fn handle_response(&self, ctx: &mut InvocationContext) -> HookResult {
        self.log("handle_response", ctx);
        Ok(())
    }

    async fn handle_fault(&self, ctx: &mut InvocationContext) -> HookResult {
        if let Some(fault) = ctx.fault() {
            tracing::warn!(
                stage = %self.name,
                invocation_id = %ctx.id(),
                origin = %fault.origin_name,
                "observed fault"
            );
        }
        self.log("handle_fault", ctx);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_config_defaults_to_info() {
        let stage = LoggingInterceptor::from_config(&Value::Null).unwrap();
        assert_eq!(stage.level(), Level::INFO);
        assert_eq!(stage.name(), LOGGING_INTERCEPTOR);
    }

    #[test]
    fn test_from_config_parses_level_case_insensitive() {
        let stage = LoggingInterceptor::from_config(&json!({"level": "Debug"})).unwrap();
        assert_eq!(stage.level(), Level::DEBUG);
    }

    #[test]
    fn test_from_config_rejects_unknown_level() {
        let result = LoggingInterceptor::from_config(&json!({"level": "loud"}));
        assert!(matches!(result, Err(RegistryError::Instantiation { .. })));

        let result = LoggingInterceptor::from_config(&json!({"level": 3}));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_accepts_every_phase() {
        let stage = LoggingInterceptor::new("log");
        let mut ctx = InvocationContext::new(Value::Null);

        assert!(stage.can_process(&ctx).await.unwrap());
        assert!(stage.init(&mut ctx).await.is_ok());
        assert!(stage.handle_fault(&mut ctx).await.is_ok());
    }
}
