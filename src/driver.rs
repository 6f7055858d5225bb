//! Standard driver for a chain
//!
//! The [`Invoker`] runs the full lifecycle of one invocation against a
//! [`Target`]: resolution travels forward to the target and back, then
//! execution does the same. A fault at any point unwinds to the head and
//! ends the invocation. A stage that answers the request with
//! [`InvocationContext::answer`] while it travels forward spares the target
//! its `invoke` call.

use crate::chain::Chain;
use crate::dispatch::ProcessStatus;
use crate::error::PipelineResult;
use crate::interceptor::HookResult;
use crate::invocation::{Fault, InteractionType, InvocationContext};
use crate::invocation_span;
use crate::observability::metrics;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};

/// Origin recorded on faults raised by the target
pub const TARGET_ORIGIN: &str = "system:target";

/// The service reached once the context has passed the tail of the chain
#[async_trait]
pub trait Target: Send + Sync {
    /// Resolve the target for this invocation
    async fn locate(&self, _ctx: &mut InvocationContext) -> HookResult {
        Ok(())
    }

    /// Execute the request; the response goes into `ctx.output`
    async fn invoke(&self, ctx: &mut InvocationContext) -> HookResult;
}

/// Completed invocation
#[derive(Debug)]
pub struct InvocationOutcome {
    pub context: InvocationContext,
    /// Status of the last traversal
    pub status: ProcessStatus,
}

impl InvocationOutcome {
    pub fn is_faulted(&self) -> bool {
        self.context.is_faulted()
    }

    pub fn fault(&self) -> Option<&Fault> {
        self.context.fault()
    }
}

/// Drives invocations through a shared chain
#[derive(Clone)]
pub struct Invoker {
    chain: Arc<Chain>,
    target: Arc<dyn Target>,
}

impl Invoker {
    pub fn new(chain: Arc<Chain>, target: Arc<dyn Target>) -> Self {
        Self { chain, target }
    }

    pub fn chain(&self) -> &Arc<Chain> {
        &self.chain
    }

    /// Run `ctx` through resolution and execution.
    ///
    /// Faults are part of a normal outcome; only configuration errors are
    /// returned as `Err`.
    pub async fn invoke(&self, ctx: InvocationContext) -> PipelineResult<InvocationOutcome> {
        let span = invocation_span!(invocation_id = %ctx.id());
        async move {
            let metrics = metrics();
            metrics.invocation_started();

            let result = self.run(ctx).await;
            match &result {
                Ok(outcome) if outcome.is_faulted() => {
                    metrics.invocation_faulted();
                    warn!(
                        origin = ?outcome.fault().map(|f| f.origin_name.as_str()),
                        steps = outcome.status.steps,
                        "Invocation faulted"
                    );
                }
                Ok(outcome) => {
                    metrics.invocation_completed();
                    info!(steps = outcome.status.steps, "Invocation completed");
                }
                Err(e) => {
                    metrics.invocation_faulted();
                    warn!(error = %e, "Invocation aborted");
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run(&self, mut ctx: InvocationContext) -> PipelineResult<InvocationOutcome> {
        // Resolution
        let status = self.traverse(&mut ctx, InteractionType::Locate).await?;
        if status.is_faulted() {
            return Ok(finish(ctx, status));
        }
        if let Some(status) = self.call_target(&mut ctx, InteractionType::Locate).await? {
            return Ok(finish(ctx, status));
        }
        let status = self.traverse(&mut ctx, InteractionType::LocateResult).await?;
        if status.is_faulted() {
            return Ok(finish(ctx, status));
        }

        // Execution
        let status = self.traverse(&mut ctx, InteractionType::Invoke).await?;
        if status.is_faulted() {
            return Ok(finish(ctx, status));
        }
        if ctx.is_answered() {
            debug!("Chain answered before the target");
        } else if let Some(status) = self.call_target(&mut ctx, InteractionType::Invoke).await? {
            return Ok(finish(ctx, status));
        }
        let status = self.traverse(&mut ctx, InteractionType::InvokeResult).await?;
        Ok(finish(ctx, status))
    }

    async fn traverse(
        &self,
        ctx: &mut InvocationContext,
        interaction: InteractionType,
    ) -> PipelineResult<ProcessStatus> {
        ctx.set_interaction(interaction)?;
        self.chain.dispatch(ctx).await
    }

    /// Call the target for a forward phase. On failure the fault is unwound
    /// through the chain and the resulting status returned.
    async fn call_target(
        &self,
        ctx: &mut InvocationContext,
        interaction: InteractionType,
    ) -> PipelineResult<Option<ProcessStatus>> {
        let result = match interaction {
            InteractionType::Locate => self.target.locate(ctx).await,
            _ => self.target.invoke(ctx).await,
        };

        if let Err(e) = result {
            let fault = Fault::from_hook_error(TARGET_ORIGIN, e);
            warn!(phase = %interaction, reason = ?fault.reason, "Target failed");
            ctx.switch_to_fault(fault);
        }
        if !ctx.is_faulted() {
            return Ok(None);
        }

        metrics().fault_switched();
        self.chain.dispatch(ctx).await.map(Some)
    }
}

fn finish(context: InvocationContext, status: ProcessStatus) -> InvocationOutcome {
    InvocationOutcome { context, status }
}
