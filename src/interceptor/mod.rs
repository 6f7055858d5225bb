//! Interceptor capability interface
//!
//! An interceptor is a named stage of the chain. It answers a gating question
//! for every context it sees and exposes four lifecycle hooks, one per phase
//! that carries work:
//!
//! | Phase           | Hook              |
//! |-----------------|-------------------|
//! | `LOCATE`        | [`Interceptor::init`] |
//! | `INVOKE`        | [`Interceptor::handle_request`] |
//! | `INVOKE_RESULT` | [`Interceptor::handle_response`] |
//! | `INVOKE_FAULT`  | [`Interceptor::handle_fault`] |
//!
//! `LOCATE_RESULT` has no hook; accepting stages pass it straight back.
//! A hook may switch the context to the fault phase or answer the request
//! with [`InvocationContext::answer`], but any other phase change becomes a
//! fault of its stage.
//!
//! Stage instances are shared by every in-flight invocation over the same
//! chain. They must keep per-request state on the [`InvocationContext`],
//! never on `self`.

use crate::invocation::{Fault, InvocationContext};
use async_trait::async_trait;
use std::error::Error as StdError;
use thiserror::Error;

pub mod builtin;

/// Outcome of a lifecycle hook
pub type HookResult = Result<(), HookError>;

/// Failure reported by a hook or gating predicate
#[derive(Debug, Error)]
pub enum HookError {
    /// The hook already produced a fault; it is propagated as-is
    #[error("{0}")]
    Fault(Fault),

    /// A raw failure that the observing stage wraps into a fault
    #[error("{reason}")]
    Failed {
        error_code: Option<String>,
        reason: String,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },
}

impl HookError {
    /// Create a raw failure with a reason only
    pub fn failed<S: Into<String>>(reason: S) -> Self {
        Self::Failed {
            error_code: None,
            reason: reason.into(),
            source: None,
        }
    }

    /// Create a raw failure with an error code
    pub fn with_code<C: Into<String>, S: Into<String>>(error_code: C, reason: S) -> Self {
        Self::Failed {
            error_code: Some(error_code.into()),
            reason: reason.into(),
            source: None,
        }
    }

    /// Create a raw failure that keeps the underlying error
    pub fn failed_with_source<C, S, E>(error_code: C, reason: S, source: E) -> Self
    where
        C: Into<String>,
        S: Into<String>,
        E: StdError + Send + Sync + 'static,
    {
        Self::Failed {
            error_code: Some(error_code.into()),
            reason: reason.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Wrap any error as a raw failure, using its message as the reason
    pub fn from_error<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Failed {
            error_code: None,
            reason: error.to_string(),
            source: Some(Box::new(error)),
        }
    }

    pub fn is_fault(&self) -> bool {
        matches!(self, HookError::Fault(_))
    }
}

impl From<Fault> for HookError {
    fn from(fault: Fault) -> Self {
        HookError::Fault(fault)
    }
}

/// A named, chain-linked stage of the pipeline
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Unique stage name
    fn name(&self) -> &str;

    /// Decide whether this stage participates in the current phase.
    ///
    /// A declining stage is transparent: the context moves on in the
    /// phase's natural direction without any hook running. An error is
    /// treated as a decline.
    async fn can_process(&self, ctx: &InvocationContext) -> Result<bool, HookError>;

    /// `LOCATE` hook
    async fn init(&self, _ctx: &mut InvocationContext) -> HookResult {
        Ok(())
    }

    /// `INVOKE` hook
    async fn handle_request(&self, _ctx: &mut InvocationContext) -> HookResult {
        Ok(())
    }

    /// `INVOKE_RESULT` hook
    async fn handle_response(&self, _ctx: &mut InvocationContext) -> HookResult {
        Ok(())
    }

    /// `INVOKE_FAULT` hook.
    ///
    /// Best effort: an error returned here is logged and otherwise ignored,
    /// so fault unwinding always reaches the head of the chain.
    async fn handle_fault(&self, _ctx: &mut InvocationContext) -> HookResult {
        Ok(())
    }
}
