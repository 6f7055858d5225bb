//! Stock targets
//!
//! Small [`Target`] implementations for wiring up a chain without a real
//! backend: one that echoes the request and one that always fails.

use crate::driver::Target;
use crate::interceptor::{HookError, HookResult};
use crate::invocation::InvocationContext;
use async_trait::async_trait;
use serde_json::json;

/// Target that answers with the request payload
#[derive(Debug, Clone, Default)]
pub struct EchoTarget;

#[async_trait]
impl Target for EchoTarget {
    async fn locate(&self, ctx: &mut InvocationContext) -> HookResult {
        ctx.set_attribute("target", json!("echo"));
        Ok(())
    }

    async fn invoke(&self, ctx: &mut InvocationContext) -> HookResult {
        ctx.output = Some(json!({ "echo": ctx.input.clone() }));
        Ok(())
    }
}

/// Target that always fails
#[derive(Debug, Clone)]
pub struct FailingTarget {
    error_code: String,
    reason: String,
    during_locate: bool,
}

impl FailingTarget {
    pub fn new<C: Into<String>, R: Into<String>>(error_code: C, reason: R) -> Self {
        Self {
            error_code: error_code.into(),
            reason: reason.into(),
            during_locate: false,
        }
    }

    /// Fail while locating instead of while invoking
    pub fn during_locate(mut self) -> Self {
        self.during_locate = true;
        self
    }

    fn failure(&self) -> HookError {
        HookError::with_code(self.error_code.clone(), self.reason.clone())
    }
}

impl Default for FailingTarget {
    fn default() -> Self {
        Self::new("E_TARGET", "target unavailable")
    }
}

#[async_trait]
impl Target for FailingTarget {
    async fn locate(&self, _ctx: &mut InvocationContext) -> HookResult {
        if self.during_locate {
            return Err(self.failure());
        }
        Ok(())
    }

    async fn invoke(&self, _ctx: &mut InvocationContext) -> HookResult {
        Err(self.failure())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[tokio::test]
    async fn test_echo_target() {
        let mut ctx = InvocationContext::new(json!({"q": 1}));

        EchoTarget.locate(&mut ctx).await.unwrap();
        EchoTarget.invoke(&mut ctx).await.unwrap();

        assert_eq!(ctx.attribute("target"), Some(&json!("echo")));
        assert_eq!(ctx.output, Some(json!({"echo": {"q": 1}})));
    }

    #[tokio::test]
    async fn test_failing_target() {
        let mut ctx = InvocationContext::new(Value::Null);
        let target = FailingTarget::default();

        assert!(target.locate(&mut ctx).await.is_ok());
        assert!(target.invoke(&mut ctx).await.is_err());
        assert!(target.during_locate().locate(&mut ctx).await.is_err());
    }

    #[tokio::test]
    async fn test_failing_target_keeps_code() {
        let mut ctx = InvocationContext::new(Value::Null);
        let target = FailingTarget::new("E_DOWN", "backend down");

        let error = target.invoke(&mut ctx).await.unwrap_err();

        assert!(matches!(
            error,
            HookError::Failed { error_code: Some(ref c), .. } if c == "E_DOWN"
        ));
        assert_eq!(error.to_string(), "backend down");
    }
}
