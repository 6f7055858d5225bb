//! Attributes interceptor
//!
//! Stamps static key/value pairs onto every invocation it participates in.
//! Configuration:
//!
//! ```toml
//! interceptors = [
//!     { name = "attributes", config = { set = { tenant = "acme" }, phases = ["LOCATE"] } },
//! ]
//! ```

use crate::interceptor::{HookError, HookResult, Interceptor};
use crate::invocation::{InteractionType, InvocationContext};
use crate::registry::RegistryError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

pub const ATTRIBUTES_INTERCEPTOR: &str = "attributes";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct AttributesSettings {
    #[serde(default)]
    set: Map<String, Value>,
    /// Phases to participate in; all phases when absent
    #[serde(default)]
    phases: Option<Vec<InteractionType>>,
}

/// Copies configured attributes into the context on `LOCATE` and `INVOKE`
pub struct AttributesInterceptor {
    name: String,
    values: Map<String, Value>,
    phases: Option<Vec<InteractionType>>,
}

impl AttributesInterceptor {
    pub fn new<S: Into<String>>(name: S, values: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            values,
            phases: None,
        }
    }

    /// Restrict participation to `phases`
    pub fn with_phases(mut self, phases: Vec<InteractionType>) -> Self {
        self.phases = Some(phases);
        self
    }

    pub fn from_config(config: &Value) -> Result<Self, RegistryError> {
        let settings: AttributesSettings = match config {
            Value::Null => AttributesSettings::default(),
            other => serde_json::from_value(other.clone()).map_err(|e| {
                RegistryError::instantiation(ATTRIBUTES_INTERCEPTOR, e.to_string())
            })?,
        };

        let mut stage = Self::new(ATTRIBUTES_INTERCEPTOR, settings.set);
        stage.phases = settings.phases;
        Ok(stage)
    }

    fn apply(&self, ctx: &mut InvocationContext) {
        for (key, value) in &self.values {
            ctx.set_attribute(key.clone(), value.clone());
        }
    }
}

#[async_trait]
impl Interceptor for AttributesInterceptor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn can_process(&self, ctx: &InvocationContext) -> Result<bool, HookError> {
        Ok(match &self.phases {
            Some(phases) => phases.contains(&ctx.interaction()),
            None => true,
        })
    }

    async fn init(&self, ctx: &mut InvocationContext) -> HookResult {
        self.apply(ctx);
        Ok(())
    }

    async fn handle_request(&self, ctx: &mut InvocationContext) -> HookResult {
        self.apply(ctx);
        Ok(())
    }
}
