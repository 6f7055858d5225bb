//! Dispatch engine
//!
//! Moves one invocation context through a [`Chain`]. Each step asks a single
//! stage whether it participates, runs the hook that belongs to the current
//! phase and decides where the context goes next:
//!
//! | Phase           | Hook              | On success | On hook error          |
//! |-----------------|-------------------|------------|------------------------|
//! | `LOCATE`        | `init`            | next       | fault, re-enter stage  |
//! | `LOCATE_RESULT` | none              | previous   | n/a                    |
//! | `INVOKE`        | `handle_request`  | next       | fault, re-enter stage  |
//! | `INVOKE_RESULT` | `handle_response` | previous   | fault, re-enter stage  |
//! | `INVOKE_FAULT`  | `handle_fault`    | previous   | logged, previous       |
//!
//! A declining stage is transparent: the context continues in the phase's
//! natural direction. Routing always follows the phase a stage was entered
//! with; a hook may leave that phase only by switching to the fault phase,
//! and any other phase change is turned into a fault of that stage.
//! Traversal is an explicit loop over chain positions, so stack depth does
//! not grow with the length of the chain.

use crate::chain::{Chain, ChainExit, ChainNode, Link};
use crate::error::{PipelineError, PipelineResult};
use crate::interceptor::{HookError, HookResult, Interceptor};
use crate::invocation::{Direction, Fault, InteractionType, InvocationContext};
use crate::observability::metrics;
use crate::stage_span;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, warn, Instrument};

/// Fault code for a hook that changed the phase on its own
pub const ILLEGAL_TRANSITION_CODE: &str = "E_ILLEGAL_TRANSITION";

/// Where a stage sends the context after processing it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Towards the tail
    Next,
    /// Towards the head
    Previous,
    /// Back into the same stage; used after a fault switch
    Reenter,
}

impl Transition {
    fn along(direction: Direction) -> Self {
        match direction {
            Direction::Forward => Transition::Next,
            Direction::Backward => Transition::Previous,
        }
    }
}

/// Final status of a traversal, handed to the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProcessStatus {
    /// End of the chain the context left through
    pub exit: ChainExit,
    /// Phase of the context when it left the chain
    pub interaction: InteractionType,
    /// Number of stage steps taken, re-entries included
    pub steps: usize,
}

impl ProcessStatus {
    pub fn is_faulted(&self) -> bool {
        self.interaction == InteractionType::InvokeFault
    }
}

/// Process `ctx` at one stage and report where it goes next
pub async fn process_stage(stage: &dyn Interceptor, ctx: &mut InvocationContext) -> Transition {
    let span = stage_span!(stage = %stage.name(), phase = %ctx.interaction());
    step(stage, ctx).instrument(span).await
}

async fn step(stage: &dyn Interceptor, ctx: &mut InvocationContext) -> Transition {
    let metrics = metrics();
    metrics.dispatch_step();
    ctx.set_current_processor(stage.name());

    let phase = ctx.interaction();
    let accepted = match stage.can_process(ctx).await {
        Ok(accepted) => accepted,
        Err(e) => {
            warn!(error = %e, "Gating check failed, treating as decline");
            false
        }
    };

    if !accepted {
        debug!("Stage declined");
        metrics.stage_skipped();
        return Transition::along(phase.direction());
    }

    match phase {
        InteractionType::Locate => {
            let result = timed(stage.name(), stage.init(ctx)).await;
            settle(stage.name(), phase, result, ctx)
        }
        InteractionType::LocateResult => Transition::Previous,
        InteractionType::Invoke => {
            let result = timed(stage.name(), stage.handle_request(ctx)).await;
            settle(stage.name(), phase, result, ctx)
        }
        InteractionType::InvokeResult => {
            let result = timed(stage.name(), stage.handle_response(ctx)).await;
            settle(stage.name(), phase, result, ctx)
        }
        InteractionType::InvokeFault => {
            if let Err(e) = timed(stage.name(), stage.handle_fault(ctx)).await {
                metrics.fault_handler_failed();
                warn!(error = %e, "Fault handler failed, continuing to unwind");
            }
            Transition::Previous
        }
    }
}

async fn timed<F>(stage: &str, hook: F) -> HookResult
where
    F: std::future::Future<Output = HookResult>,
{
    let started = Instant::now();
    let result = hook.await;
    metrics().hook_executed(stage, started.elapsed(), result.is_ok());
    result
}

/// Turn a hook outcome of a non-fault phase into a transition
fn settle(
    stage: &str,
    phase: InteractionType,
    result: HookResult,
    ctx: &mut InvocationContext,
) -> Transition {
    let result = result.and_then(|()| {
        let current = ctx.interaction();
        if current == phase || current == InteractionType::InvokeFault {
            return Ok(());
        }
        Err(HookError::failed_with_source(
            ILLEGAL_TRANSITION_CODE,
            format!("hook moved the context from {phase} to {current}"),
            PipelineError::IllegalTransition {
                from: phase,
                to: current,
            },
        ))
    });

    match result {
        Ok(()) if ctx.is_faulted() => {
            // The hook switched to the fault phase itself
            metrics().fault_switched();
            warn!(origin = ?ctx.fault().map(|f| f.origin_name.as_str()), "Stage switched to fault");
            Transition::Reenter
        }
        Ok(()) => Transition::along(phase.direction()),
        Err(e) => {
            let fault = Fault::from_hook_error(stage, e);
            warn!(
                origin = %fault.origin_name,
                code = ?fault.error_code,
                reason = ?fault.reason,
                "Hook failed, switching to fault"
            );
            ctx.switch_to_fault(fault);
            metrics().fault_switched();
            Transition::Reenter
        }
    }
}

impl Chain {
    /// Dispatch `ctx` from the end its phase enters at: the head for
    /// forward phases, the tail for backward ones.
    pub async fn dispatch(&self, ctx: &mut InvocationContext) -> PipelineResult<ProcessStatus> {
        let direction = ctx.interaction().direction();
        let start = match direction {
            Direction::Forward => self.head(),
            Direction::Backward => self.tail(),
        };

        match start {
            Some(node) => self.dispatch_from(node, ctx).await,
            None => Ok(ProcessStatus {
                exit: ChainExit::for_direction(direction),
                interaction: ctx.interaction(),
                steps: 0,
            }),
        }
    }

    /// Dispatch `ctx` starting at `start` until it leaves the chain
    pub async fn dispatch_from(
        &self,
        start: ChainNode<'_>,
        ctx: &mut InvocationContext,
    ) -> PipelineResult<ProcessStatus> {
        if !std::ptr::eq(start.chain(), self) {
            return Err(PipelineError::assembly(format!(
                "stage '{}' belongs to another chain",
                start.name()
            )));
        }

        let mut node = start;
        let mut steps = 0;
        loop {
            let transition = process_stage(node.stage().as_ref(), ctx).await;
            steps += 1;

            let link = match transition {
                Transition::Reenter => continue,
                Transition::Next => node.successor(),
                Transition::Previous => node.predecessor(),
            };

            match link {
                Link::Node(following) => node = following,
                Link::Exit(exit) => {
                    debug!(?exit, phase = %ctx.interaction(), steps, "Context left the chain");
                    return Ok(ProcessStatus {
                        exit,
                        interaction: ctx.interaction(),
                        steps,
                    });
                }
            }
        }
    }
}

/// Dispatch `ctx` on the runtime and hand the outcome to `done`.
///
/// `done` runs exactly once, after the context has left the chain, and gets
/// the context back along with the status.
pub fn spawn_dispatch<F>(chain: Arc<Chain>, mut ctx: InvocationContext, done: F) -> JoinHandle<()>
where
    F: FnOnce(PipelineResult<ProcessStatus>, InvocationContext) + Send + 'static,
{
    tokio::spawn(async move {
        let result = chain.dispatch(&mut ctx).await;
        done(result, ctx);
    })
}
