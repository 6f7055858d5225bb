//! Observability for the interceptor pipeline
//!
//! Structured logging setup with span macros, and process-wide metrics.

pub mod logging;
pub mod metrics;

// Re-export for convenience
pub use logging::{
    init_default_logging, init_logging, parse_log_level, LogFormat, LoggingSettings, LOG_TARGET,
};
pub use metrics::{metrics, MetricsSnapshot, PipelineMetrics, StageStats};

// Span macros for structured logging
pub use logging::{assembly_span, invocation_span, stage_span};
