//! Invocation state: interaction phases, the per-request context and faults

pub mod context;
pub mod fault;

pub use context::{Direction, InteractionType, InvocationContext};
pub use fault::{Fault, FaultReport, FaultSource};
