//! Invocation-level fault model
//!
//! A [`Fault`] is the typed error value carried by an [`InvocationContext`]
//! while it unwinds through the `INVOKE_FAULT` phase. Stages downstream of the
//! failure may read it but never replace it.
//!
//! [`InvocationContext`]: crate::invocation::InvocationContext

use crate::interceptor::HookError;
use crate::registry::RESERVED_PREFIX;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// Maximum length of a sanitized fault message
const MAX_REPORT_MESSAGE_LEN: usize = 500;

static SECRET_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(password|token|key|secret)[=:]\s*\S+").expect("secret pattern is valid")
});

static SENSITIVE_PATH_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/[a-zA-Z0-9._/-]+/(secrets?|\.ssh|\.aws|\.config)/[a-zA-Z0-9._/-]+")
        .expect("path pattern is valid")
});

/// Raw failure retained behind a fault
pub type FaultSource = Arc<dyn StdError + Send + Sync + 'static>;

/// Typed invocation fault
#[derive(Clone, Serialize, Deserialize)]
pub struct Fault {
    /// Name of the stage that raised or first observed the error
    pub origin_name: String,
    /// Optional machine-readable error code
    pub error_code: Option<String>,
    /// Human-readable reason
    pub reason: Option<String>,
    /// Free-form diagnostic payload
    pub details: Option<Value>,
    #[serde(skip)]
    source: Option<FaultSource>,
}

impl Fault {
    /// Create a fault raised by `origin_name`
    pub fn new<S: Into<String>>(origin_name: S) -> Self {
        Self {
            origin_name: origin_name.into(),
            error_code: None,
            reason: None,
            details: None,
            source: None,
        }
    }

    /// Whether the fault was raised by the framework rather than a stage
    pub fn is_framework_raised(&self) -> bool {
        self.origin_name.starts_with(RESERVED_PREFIX)
    }

    /// Builder method to set the error code
    pub fn with_code<S: Into<String>>(mut self, error_code: S) -> Self {
        self.error_code = Some(error_code.into());
        self
    }

    /// Builder method to set the reason
    pub fn with_reason<S: Into<String>>(mut self, reason: S) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Builder method to attach diagnostic details
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Builder method to keep the raw failure behind this fault
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    /// Convert a hook outcome into a fault observed by `observer`.
    ///
    /// An existing fault is returned untouched, keeping its original origin.
    /// A raw failure is wrapped: the observer becomes the origin, code and
    /// reason are copied and the failure itself is kept as details and source.
    pub fn from_hook_error(observer: &str, error: HookError) -> Self {
        match error {
            HookError::Fault(fault) => fault,
            HookError::Failed {
                error_code,
                reason,
                source,
            } => {
                let cause = source.as_ref().map(|s| s.to_string());
                let details = json!({
                    "error_code": error_code,
                    "reason": reason,
                    "cause": cause,
                });

                Self {
                    origin_name: observer.to_string(),
                    error_code,
                    reason: Some(reason),
                    details: Some(details),
                    source: source.map(Arc::from),
                }
            }
        }
    }

    /// Raw failure behind this fault, if one was kept
    pub fn cause(&self) -> Option<&FaultSource> {
        self.source.as_ref()
    }

    /// Caller-safe summary of this fault
    pub fn report(&self) -> FaultReport {
        let message = self
            .reason
            .as_deref()
            .map(sanitize_fault_message)
            .unwrap_or_default();

        FaultReport {
            origin: self.origin_name.clone(),
            code: self.error_code.clone(),
            message,
        }
    }
}

impl fmt::Debug for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fault")
            .field("origin_name", &self.origin_name)
            .field("error_code", &self.error_code)
            .field("reason", &self.reason)
            .field("details", &self.details)
            .field("has_source", &self.source.is_some())
            .finish()
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fault raised by '{}'", self.origin_name)?;
        if let Some(code) = &self.error_code {
            write!(f, " [{code}]")?;
        }
        if let Some(reason) = &self.reason {
            write!(f, ": {reason}")?;
        }
        Ok(())
    }
}

impl StdError for Fault {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn StdError + 'static))
    }
}

impl PartialEq for Fault {
    fn eq(&self, other: &Self) -> bool {
        self.origin_name == other.origin_name
            && self.error_code == other.error_code
            && self.reason == other.reason
            && self.details == other.details
    }
}

/// Serializable fault summary handed back to the invoking application
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FaultReport {
    pub origin: String,
    pub code: Option<String>,
    pub message: String,
}

/// Redact secrets and sensitive paths, then cap the length
fn sanitize_fault_message(message: &str) -> String {
    let mut sanitized = SECRET_PATTERN
        .replace_all(message, "${1}=***")
        .to_string();

    sanitized = SENSITIVE_PATH_PATTERN
        .replace_all(&sanitized, "/***REDACTED***/")
        .to_string();

    if sanitized.len() > MAX_REPORT_MESSAGE_LEN {
        let truncate_suffix = "...[truncated]";
        let mut cut = MAX_REPORT_MESSAGE_LEN - truncate_suffix.len();
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized = format!("{}{}", &sanitized[..cut], truncate_suffix);
    }

    sanitized
}
