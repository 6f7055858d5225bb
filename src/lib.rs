//! Proxify - bidirectional interceptor pipeline
//!
//! A chain of named, independently pluggable stages ("interceptors") that
//! cooperatively process one in-flight invocation as it travels forward
//! (resolution, then execution) and backward (response, then unwind).
//!
//! # Overview
//!
//! This crate provides:
//! - The invocation context and its interaction state machine
//! - The `Interceptor` capability trait and built-in stages
//! - A doubly traversable processor chain and its assembly from configuration
//! - The dispatch engine, including the fault switching protocol
//! - An owned interceptor registry
//! - A standard driver that runs an invocation against a target
//! - Stock echo and failing targets
//!
//! # Quick Start
//!
//! ```rust
//! use proxify::chain::ChainBuilder;
//! use proxify::config::PipelineConfig;
//! use proxify::driver::Invoker;
//! use proxify::interceptor::builtin::builtin_registry;
//! use proxify::invocation::InvocationContext;
//! use proxify::targets::EchoTarget;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let config = PipelineConfig::from_toml_str(
//!     "interceptors = [\"logging\"]\n[pipeline]\nname = \"orders\"\n",
//! )
//! .unwrap();
//! let registry = builtin_registry().unwrap();
//! let chain = ChainBuilder::new(&registry).build(&config).unwrap();
//!
//! let invoker = Invoker::new(Arc::new(chain), Arc::new(EchoTarget));
//! let outcome = invoker
//!     .invoke(InvocationContext::new(json!({"order": 42})))
//!     .await
//!     .unwrap();
//!
//! assert!(!outcome.is_faulted());
//! assert_eq!(outcome.context.output, Some(json!({"echo": {"order": 42}})));
//! # }
//! ```

pub mod chain;
pub mod config;
pub mod dispatch;
pub mod driver;
pub mod error;
pub mod interceptor;
pub mod invocation;
pub mod observability;
pub mod registry;
pub mod targets;
pub mod testing;

pub use chain::{Chain, ChainBuilder, ChainExit, ChainNode, Link};
pub use config::{ConfigError, InterceptorConfig, PipelineConfig};
pub use dispatch::{process_stage, spawn_dispatch, ProcessStatus, Transition};
pub use driver::{InvocationOutcome, Invoker, Target, TARGET_ORIGIN};
pub use error::{PipelineError, PipelineResult};
pub use interceptor::{HookError, HookResult, Interceptor};
pub use invocation::{Direction, Fault, FaultReport, InteractionType, InvocationContext};
pub use registry::{InterceptorMetadata, InterceptorRegistry, RegistryError, RESERVED_PREFIX};
pub use targets::{EchoTarget, FailingTarget};
