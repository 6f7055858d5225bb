//! Mock implementations for testing
//!
//! Provides a recording interceptor whose behaviour per phase can be scripted
//! and a shared journal of the hooks it ran.

use crate::interceptor::{HookError, HookResult, Interceptor};
use crate::invocation::{Fault, InteractionType, InvocationContext};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Lifecycle hook of an interceptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    Init,
    HandleRequest,
    HandleResponse,
    HandleFault,
}

impl Hook {
    /// Hook that runs for `interaction`, if any
    pub fn for_interaction(interaction: InteractionType) -> Option<Hook> {
        match interaction {
            InteractionType::Locate => Some(Hook::Init),
            InteractionType::LocateResult => None,
            InteractionType::Invoke => Some(Hook::HandleRequest),
            InteractionType::InvokeResult => Some(Hook::HandleResponse),
            InteractionType::InvokeFault => Some(Hook::HandleFault),
        }
    }
}

pub type HookCall = (String, Hook);

/// Ordered record of hook calls shared by several stages
#[derive(Debug, Clone, Default)]
pub struct HookJournal {
    calls: Arc<Mutex<Vec<HookCall>>>,
    gate_checks: Arc<AtomicUsize>,
}

impl HookJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, stage: &str, hook: Hook) {
        self.calls.lock().await.push((stage.to_string(), hook));
    }

    pub async fn calls(&self) -> Vec<HookCall> {
        self.calls.lock().await.clone()
    }

    /// Hooks run by `stage`, in order
    pub async fn calls_for(&self, stage: &str) -> Vec<Hook> {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|(name, _)| name == stage)
            .map(|(_, hook)| *hook)
            .collect()
    }

    /// Stages that ran `hook`, in order
    pub async fn stages_running(&self, hook: Hook) -> Vec<String> {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|(_, h)| *h == hook)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Number of gating checks made by stages sharing this journal
    pub fn gate_checks(&self) -> usize {
        self.gate_checks.load(Ordering::SeqCst)
    }

    pub async fn clear(&self) {
        self.calls.lock().await.clear();
        self.gate_checks.store(0, Ordering::SeqCst);
    }
}

/// Interceptor that records its hooks and fails on demand
#[derive(Debug, Clone)]
pub struct RecordingInterceptor {
    name: String,
    journal: HookJournal,
    declined: HashSet<InteractionType>,
    failing: HashSet<Hook>,
    switching: HashSet<Hook>,
    moving: HashMap<Hook, InteractionType>,
    failing_gate: bool,
    yielding: bool,
}

impl RecordingInterceptor {
    pub fn new<S: Into<String>>(name: S, journal: &HookJournal) -> Self {
        Self {
            name: name.into(),
            journal: journal.clone(),
            declined: HashSet::new(),
            failing: HashSet::new(),
            switching: HashSet::new(),
            moving: HashMap::new(),
            failing_gate: false,
            yielding: false,
        }
    }

    /// Decline every phase
    pub fn declining(mut self) -> Self {
        self.declined.extend(InteractionType::ALL);
        self
    }

    /// Decline one phase
    pub fn declining_phase(mut self, interaction: InteractionType) -> Self {
        self.declined.insert(interaction);
        self
    }

    /// Return a raw failure from `hook`
    pub fn failing_on(mut self, hook: Hook) -> Self {
        self.failing.insert(hook);
        self
    }

    /// Switch the context to the fault phase from inside `hook` and succeed
    pub fn switching_to_fault_on(mut self, hook: Hook) -> Self {
        self.switching.insert(hook);
        self
    }

    /// Move the context to `interaction` from inside `hook` and succeed
    pub fn moving_to_on(mut self, hook: Hook, interaction: InteractionType) -> Self {
        self.moving.insert(hook, interaction);
        self
    }

    /// Return an error from the gating check
    pub fn failing_gate(mut self) -> Self {
        self.failing_gate = true;
        self
    }

    /// Yield to the runtime inside every hook
    pub fn yielding(mut self) -> Self {
        self.yielding = true;
        self
    }

    async fn run(&self, hook: Hook, ctx: &mut InvocationContext) -> HookResult {
        self.journal.record(&self.name, hook).await;
        if self.yielding {
            tokio::task::yield_now().await;
        }

        if self.failing.contains(&hook) {
            return Err(HookError::with_code(
                "E_MOCK",
                format!("{} failed in {hook:?}", self.name),
            ));
        }
        if self.switching.contains(&hook) {
            ctx.switch_to_fault(
                Fault::new(self.name.clone())
                    .with_code("E_SWITCH")
                    .with_reason(format!("{} switched to fault", self.name)),
            );
        }
        if let Some(interaction) = self.moving.get(&hook) {
            ctx.set_interaction(*interaction)
                .map_err(HookError::from_error)?;
        }
        Ok(())
    }
}

#[async_trait]
impl Interceptor for RecordingInterceptor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn can_process(&self, ctx: &InvocationContext) -> Result<bool, HookError> {
        self.journal.gate_checks.fetch_add(1, Ordering::SeqCst);
        if self.failing_gate {
            return Err(HookError::failed(format!("{} gate unavailable", self.name)));
        }
        Ok(!self.declined.contains(&ctx.interaction()))
    }

    async fn init(&self, ctx: &mut InvocationContext) -> HookResult {
        self.run(Hook::Init, ctx).await
    }

    async fn handle_request(&self, ctx: &mut InvocationContext) -> HookResult {
        self.run(Hook::HandleRequest, ctx).await
    }

    async fn handle_response(&self, ctx: &mut InvocationContext) -> HookResult {
        self.run(Hook::HandleResponse, ctx).await
    }

    async fn handle_fault(&self, ctx: &mut InvocationContext) -> HookResult {
        self.run(Hook::HandleFault, ctx).await
    }
}
