//! Logging setup for the pipeline
//!
//! Everything this crate emits sits under the `proxify` target: one span per
//! invocation, one per dispatch step and one per chain assembly. Other crates
//! are held at WARN unless `RUST_LOG` says otherwise.
//!
//! [`LoggingSettings::from_env`] reads:
//!
//! - `LOG_LEVEL`: level for `proxify` targets (ERROR..TRACE), default INFO
//! - `LOG_FORMAT`: `json`, `pretty` or `compact`, default `json`
//! - `LOG_SPANS`: `true` to log span open/close events, default off
//! - `RUST_LOG`: replaces the computed filter entirely
//!
//! ```bash
//! LOG_FORMAT=pretty LOG_LEVEL=DEBUG proxify -c pipeline.toml run
//! ```

use std::env;
use tracing::{Level, Subscriber};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer};

/// Target prefix shared by every event of this crate
pub const LOG_TARGET: &str = "proxify";

const LEVEL_VAR: &str = "LOG_LEVEL";
const FORMAT_VAR: &str = "LOG_FORMAT";
const SPANS_VAR: &str = "LOG_SPANS";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event
    #[default]
    Json,
    /// Multi-line, coloured
    Pretty,
    /// Single-line, coloured, without targets
    Compact,
}

impl LogFormat {
    /// Format called `name` (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "pretty" => Some(LogFormat::Pretty),
            "compact" => Some(LogFormat::Compact),
            _ => None,
        }
    }
}

/// Parse a level name (case-insensitive)
pub fn parse_log_level(level: &str) -> Option<Level> {
    match level.trim().to_uppercase().as_str() {
        "ERROR" => Some(Level::ERROR),
        "WARN" => Some(Level::WARN),
        "INFO" => Some(Level::INFO),
        "DEBUG" => Some(Level::DEBUG),
        "TRACE" => Some(Level::TRACE),
        _ => None,
    }
}

fn span_events(include_spans: bool) -> FmtSpan {
    if include_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    }
}

/// How the global subscriber is set up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Level applied to `proxify` targets
    pub level: Level,
    pub format: LogFormat,
    /// Log span open and close events
    pub include_spans: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::default(),
            include_spans: false,
        }
    }
}

impl LoggingSettings {
    /// Settings from `LOG_LEVEL`, `LOG_FORMAT` and `LOG_SPANS`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Settings from an arbitrary variable lookup. Missing or unparseable
    /// values keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            level: lookup(LEVEL_VAR)
                .and_then(|l| parse_log_level(&l))
                .unwrap_or(defaults.level),
            format: lookup(FORMAT_VAR)
                .and_then(|f| LogFormat::from_name(&f))
                .unwrap_or(defaults.format),
            include_spans: lookup(SPANS_VAR)
                .map(|v| v.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.include_spans),
        }
    }

    /// Filter directives used when `RUST_LOG` is unset
    pub fn directives(&self) -> String {
        format!("warn,{LOG_TARGET}={}", self.level.as_str().to_lowercase())
    }

    /// `RUST_LOG` if set and valid, otherwise [`LoggingSettings::directives`]
    pub fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.directives()))
    }

    fn output_layer<S>(&self) -> Box<dyn Layer<S> + Send + Sync>
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        let events = span_events(self.include_spans);
        match self.format {
            LogFormat::Json => fmt::layer().json().with_span_events(events).boxed(),
            LogFormat::Pretty => fmt::layer().pretty().with_span_events(events).boxed(),
            LogFormat::Compact => fmt::layer()
                .compact()
                .with_target(false)
                .with_span_events(events)
                .boxed(),
        }
    }

    /// Subscriber writing to stdout through `filter`
    pub fn subscriber(&self, filter: EnvFilter) -> impl Subscriber + Send + Sync + 'static {
        tracing_subscriber::registry()
            .with(filter)
            .with(self.output_layer())
    }

    /// Install as the global subscriber.
    ///
    /// Returns `false` if a global subscriber was already set; the existing
    /// one is kept.
    pub fn install(&self) -> bool {
        self.subscriber(self.filter()).try_init().is_ok()
    }
}

/// Initialize logging with manual configuration
pub fn init_logging(level: Level, format: LogFormat, include_spans: bool) -> bool {
    LoggingSettings {
        level,
        format,
        include_spans,
    }
    .install()
}

/// Initialize logging from environment variables
pub fn init_default_logging() -> bool {
    LoggingSettings::from_env().install()
}

/// Create an invocation span with contextual information
#[macro_export]
macro_rules! invocation_span {
    ($($field:tt)*) => {
        tracing::info_span!("invocation", $($field)*)
    };
}

/// Create a span for one dispatch step of a stage
#[macro_export]
macro_rules! stage_span {
    ($($field:tt)*) => {
        tracing::debug_span!("stage", $($field)*)
    };
}

/// Create a chain assembly span
#[macro_export]
macro_rules! assembly_span {
    ($($field:tt)*) => {
        tracing::info_span!("chain_assembly", $($field)*)
    };
}

// Re-export macros for convenience
pub use {assembly_span, invocation_span, stage_span};

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(vars: &[(&str, &str)]) -> LoggingSettings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LoggingSettings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_parse_log_level() {
        let test_cases = vec![
            ("ERROR", Some(Level::ERROR)),
            ("warn", Some(Level::WARN)),
            ("Info", Some(Level::INFO)),
            ("DEBUG", Some(Level::DEBUG)),
            (" trace ", Some(Level::TRACE)),
            ("invalid", None),
            ("", None),
        ];

        for (input, expected) in test_cases {
            assert_eq!(parse_log_level(input), expected, "Failed for input: {input}");
        }
    }

    #[test]
    fn test_span_events_toggle() {
        assert_eq!(span_events(false), FmtSpan::NONE);
        assert_eq!(span_events(true), FmtSpan::NEW | FmtSpan::CLOSE);
    }

    #[test]
    fn test_empty_environment_gives_defaults() {
        assert_eq!(settings_from(&[]), LoggingSettings::default());
    }

    #[test]
    fn test_settings_read_every_variable() {
        let settings = settings_from(&[
            ("LOG_LEVEL", "debug"),
            ("LOG_FORMAT", "Compact"),
            ("LOG_SPANS", "TRUE"),
        ]);

        assert_eq!(settings.level, Level::DEBUG);
        assert_eq!(settings.format, LogFormat::Compact);
        assert!(settings.include_spans);
    }

    #[test]
    fn test_unparseable_values_keep_defaults() {
        let settings = settings_from(&[
            ("LOG_LEVEL", "verbose"),
            ("LOG_FORMAT", "xml"),
            ("LOG_SPANS", "yes"),
        ]);

        assert_eq!(settings, LoggingSettings::default());
    }

    #[test]
    fn test_directives_scope_level_to_crate() {
        let settings = LoggingSettings {
            level: Level::TRACE,
            ..LoggingSettings::default()
        };

        assert_eq!(settings.directives(), "warn,proxify=trace");
        assert!(EnvFilter::try_new(settings.directives()).is_ok());
    }

    #[test]
    fn test_every_format_builds_a_subscriber() {
        for format in [LogFormat::Json, LogFormat::Pretty, LogFormat::Compact] {
            let settings = LoggingSettings {
                format,
                include_spans: true,
                ..LoggingSettings::default()
            };
            let subscriber = settings.subscriber(EnvFilter::new("off"));

            tracing::subscriber::with_default(subscriber, || {
                let span = crate::invocation_span!(invocation_id = "abc");
                let _entered = span.enter();
                tracing::info!(target: "proxify::dispatch", "filtered out");
            });
        }
    }
}
