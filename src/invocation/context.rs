//! Per-invocation state threaded through the interceptor chain

use crate::error::{PipelineError, PipelineResult};
use crate::invocation::Fault;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Interaction phase of an in-flight invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InteractionType {
    /// Resolution phase, travelling forward
    Locate,
    /// Resolution result, travelling backward
    LocateResult,
    /// Execution phase, travelling forward
    Invoke,
    /// Execution result, travelling backward
    InvokeResult,
    /// Fault unwinding, travelling backward
    InvokeFault,
}

/// Natural direction of travel for a phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Backward,
}

impl InteractionType {
    pub const ALL: [InteractionType; 5] = [
        InteractionType::Locate,
        InteractionType::LocateResult,
        InteractionType::Invoke,
        InteractionType::InvokeResult,
        InteractionType::InvokeFault,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionType::Locate => "LOCATE",
            InteractionType::LocateResult => "LOCATE_RESULT",
            InteractionType::Invoke => "INVOKE",
            InteractionType::InvokeResult => "INVOKE_RESULT",
            InteractionType::InvokeFault => "INVOKE_FAULT",
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            InteractionType::Locate | InteractionType::Invoke => Direction::Forward,
            InteractionType::LocateResult
            | InteractionType::InvokeResult
            | InteractionType::InvokeFault => Direction::Backward,
        }
    }

    pub fn is_forward(&self) -> bool {
        self.direction() == Direction::Forward
    }
}

impl fmt::Display for InteractionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InteractionType {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase();
        InteractionType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| PipelineError::InvalidInteraction(s.to_string()))
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => f.write_str("forward"),
            Direction::Backward => f.write_str("backward"),
        }
    }
}

/// Mutable state of one in-flight invocation.
///
/// Owned by the driver and lent mutably to whichever stage currently holds
/// control, so at most one stage touches it at a time. A context belongs to
/// exactly one invocation and is never reused.
#[derive(Debug, Clone, Serialize)]
pub struct InvocationContext {
    id: Uuid,
    created_at: DateTime<Utc>,
    interaction: InteractionType,
    current_processor: Option<String>,
    fault: Option<Fault>,
    /// Opaque request payload
    pub input: Value,
    /// Opaque response payload, set by the invoked target or a stage
    pub output: Option<Value>,
    answered: bool,
    /// Per-invocation state shared between stages
    pub attributes: HashMap<String, Value>,
}

impl InvocationContext {
    /// Create a context at the `LOCATE` phase
    pub fn new(input: Value) -> Self {
        Self::build(InteractionType::Locate, None, input)
    }

    /// Create a context at an arbitrary non-fault phase.
    ///
    /// `INVOKE_FAULT` needs a fault attached; use
    /// [`InvocationContext::faulted`] for that.
    pub fn with_interaction(interaction: InteractionType, input: Value) -> PipelineResult<Self> {
        if interaction == InteractionType::InvokeFault {
            return Err(PipelineError::IllegalTransition {
                from: InteractionType::Locate,
                to: interaction,
            });
        }
        Ok(Self::build(interaction, None, input))
    }

    /// Create a context that is already unwinding `fault`
    pub fn faulted(fault: Fault, input: Value) -> Self {
        Self::build(InteractionType::InvokeFault, Some(fault), input)
    }

    fn build(interaction: InteractionType, fault: Option<Fault>, input: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            interaction,
            current_processor: None,
            fault,
            input,
            output: None,
            answered: false,
            attributes: HashMap::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn interaction(&self) -> InteractionType {
        self.interaction
    }

    /// Name of the stage presently handling the context (diagnostics only)
    pub fn current_processor(&self) -> Option<&str> {
        self.current_processor.as_deref()
    }

    pub(crate) fn set_current_processor(&mut self, name: &str) {
        if self.current_processor.as_deref() != Some(name) {
            self.current_processor = Some(name.to_string());
        }
    }

    /// Fault attached to the context; present iff the phase is `INVOKE_FAULT`
    pub fn fault(&self) -> Option<&Fault> {
        self.fault.as_ref()
    }

    pub fn is_faulted(&self) -> bool {
        self.interaction == InteractionType::InvokeFault
    }

    /// Move the context to another non-fault phase.
    ///
    /// The fault phase is entered only through [`switch_to_fault`] and is
    /// never left again.
    ///
    /// [`switch_to_fault`]: InvocationContext::switch_to_fault
    pub fn set_interaction(&mut self, interaction: InteractionType) -> PipelineResult<()> {
        if self.is_faulted() || interaction == InteractionType::InvokeFault {
            return Err(PipelineError::IllegalTransition {
                from: self.interaction,
                to: interaction,
            });
        }
        self.interaction = interaction;
        Ok(())
    }

    /// Enter the fault phase with `fault` attached.
    ///
    /// If the context is already faulted the first fault is kept.
    pub fn switch_to_fault(&mut self, fault: Fault) {
        if self.is_faulted() {
            return;
        }
        self.interaction = InteractionType::InvokeFault;
        self.fault = Some(fault);
    }

    /// Answer the request from inside the chain.
    ///
    /// The driver skips the target's `invoke` for an answered context and
    /// sends it straight back through the chain as `INVOKE_RESULT`.
    pub fn answer(&mut self, output: Value) {
        self.output = Some(output);
        self.answered = true;
    }

    /// Whether a stage answered the request with [`InvocationContext::answer`]
    pub fn is_answered(&self) -> bool {
        self.answered
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn set_attribute<K: Into<String>>(&mut self, key: K, value: Value) {
        self.attributes.insert(key.into(), value);
    }
}
