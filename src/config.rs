//! Pipeline configuration
//!
//! Declares which interceptors make up a pipeline, in order, and the opaque
//! configuration each one is constructed with. The registry resolves the
//! declared names at assembly time.

use crate::registry::RESERVED_PREFIX;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use thiserror::Error;

/// Top-level pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    pub pipeline: PipelineSection,
    /// Interceptors in chain order, head first
    #[serde(default)]
    pub interceptors: Vec<InterceptorConfig>,
}

/// Pipeline identity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineSection {
    /// Pipeline name (must match [a-zA-Z0-9._-]+)
    pub name: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
}

/// Interceptor declaration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum InterceptorConfig {
    /// Simple form: "name"
    Simple(String),
    /// Complex form: { name = "name", config = { ... } }
    Complex {
        name: String,
        #[serde(default)]
        config: HashMap<String, Value>,
    },
}

impl InterceptorConfig {
    pub fn name(&self) -> &str {
        match self {
            InterceptorConfig::Simple(name) => name,
            InterceptorConfig::Complex { name, .. } => name,
        }
    }

    /// Configuration handed to the interceptor factory; `Null` for the simple form
    pub fn config_value(&self) -> Value {
        match self {
            InterceptorConfig::Simple(_) => Value::Null,
            InterceptorConfig::Complex { config, .. } => {
                Value::Object(config.clone().into_iter().collect())
            }
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Invalid pipeline name format: {0}")]
    InvalidPipelineName(String),
    #[error("Interceptor name is reserved: {0}")]
    ReservedInterceptorName(String),
    #[error("Interceptor declared more than once: {0}")]
    DuplicateInterceptor(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PipelineConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate names and interceptor declarations
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_pipeline_name(&self.pipeline.name)?;

        let mut seen = HashSet::new();
        for interceptor in &self.interceptors {
            let name = interceptor.name();
            if name.trim().is_empty() {
                return Err(ConfigError::InvalidConfig(
                    "Interceptor name must not be empty".to_string(),
                ));
            }
            if name.starts_with(RESERVED_PREFIX) {
                return Err(ConfigError::ReservedInterceptorName(name.to_string()));
            }
            if !seen.insert(name) {
                return Err(ConfigError::DuplicateInterceptor(name.to_string()));
            }
        }

        Ok(())
    }

    /// Declared interceptor names in chain order
    pub fn interceptor_names(&self) -> Vec<&str> {
        self.interceptors.iter().map(InterceptorConfig::name).collect()
    }

    /// Create a test configuration for unit testing
    #[cfg(test)]
    pub fn test_config() -> Self {
        let toml_content = r#"
interceptors = ["logging", { name = "attributes", config = { set = { tenant = "acme" } } }]

[pipeline]
name = "test-pipeline"
description = "A test pipeline"
"#;
        toml::from_str(toml_content).expect("Test config should parse")
    }
}

/// Validate pipeline name format
fn validate_pipeline_name(name: &str) -> Result<(), ConfigError> {
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-');

    if name.is_empty() || !valid_chars {
        return Err(ConfigError::InvalidPipelineName(format!(
            "Pipeline name '{name}' must match pattern [a-zA-Z0-9._-]+"
        )));
    }

    Ok(())
}
