//! Registry behaviour as seen by chain assembly

use async_trait::async_trait;
use proxify::chain::ChainBuilder;
use proxify::config::PipelineConfig;
use proxify::interceptor::builtin::{builtin_registry, register_builtins, LOGGING_INTERCEPTOR};
use proxify::interceptor::{HookError, Interceptor};
use proxify::invocation::InvocationContext;
use proxify::registry::{InterceptorMetadata, InterceptorRegistry, RegistryError};
use serde_json::{json, Value};
use std::sync::Arc;

struct Tagged {
    name: String,
    tag: String,
}

#[async_trait]
impl Interceptor for Tagged {
    fn name(&self) -> &str {
        &self.name
    }

    async fn can_process(&self, _ctx: &InvocationContext) -> Result<bool, HookError> {
        Ok(true)
    }

    async fn init(&self, ctx: &mut InvocationContext) -> Result<(), HookError> {
        ctx.set_attribute(self.name.clone(), json!(self.tag));
        Ok(())
    }
}

fn tagged_metadata(name: &'static str) -> InterceptorMetadata {
    InterceptorMetadata::new(name, "tags the context", move |config: &Value| {
        let tag = config
            .get("tag")
            .and_then(Value::as_str)
            .ok_or_else(|| RegistryError::instantiation(name, "missing 'tag'"))?;
        Ok(Arc::new(Tagged {
            name: name.to_string(),
            tag: tag.to_string(),
        }) as Arc<dyn Interceptor>)
    })
}

#[test]
fn test_custom_interceptor_alongside_builtins() {
    let mut registry = builtin_registry().unwrap();
    registry.register(tagged_metadata("tagger")).unwrap();

    assert_eq!(registry.names(), vec!["attributes", "logging", "tagger"]);
}

#[test]
fn test_reserved_prefix_fails_registration() {
    let mut registry = InterceptorRegistry::new();

    let result = registry.register(tagged_metadata("system:tagger"));

    assert!(matches!(result, Err(RegistryError::ReservedName(ref n)) if n == "system:tagger"));
    assert!(!registry.contains("system:tagger"));
}

#[test]
fn test_registering_builtins_twice_is_a_noop() {
    let mut registry = builtin_registry().unwrap();

    register_builtins(&mut registry).unwrap();

    assert_eq!(registry.len(), 2);
    assert!(registry.lookup_metadata(LOGGING_INTERCEPTOR).is_some());
}

#[test]
fn test_lookup_miss_is_absent() {
    let registry = builtin_registry().unwrap();

    assert!(registry.lookup_class("rate-limit").is_none());
    assert!(registry.lookup_metadata("rate-limit").is_none());
}

#[tokio::test]
async fn test_factory_receives_declared_config() {
    let mut registry = InterceptorRegistry::new();
    registry.register(tagged_metadata("tagger")).unwrap();
    let config = PipelineConfig::from_toml_str(
        "interceptors = [{ name = \"tagger\", config = { tag = \"blue\" } }]\n[pipeline]\nname = \"p\"\n",
    )
    .unwrap();

    let chain = ChainBuilder::new(&registry).build(&config).unwrap();
    let mut ctx = InvocationContext::new(Value::Null);
    chain.dispatch(&mut ctx).await.unwrap();

    assert_eq!(ctx.attribute("tagger"), Some(&json!("blue")));
}

#[test]
fn test_factory_error_surfaces_at_assembly() {
    let mut registry = InterceptorRegistry::new();
    registry.register(tagged_metadata("tagger")).unwrap();
    let config =
        PipelineConfig::from_toml_str("interceptors = [\"tagger\"]\n[pipeline]\nname = \"p\"\n")
            .unwrap();

    let result = ChainBuilder::new(&registry).build(&config);

    let message = result.unwrap_err().to_string();
    assert!(message.contains("missing 'tag'"), "unexpected error: {message}");
}
