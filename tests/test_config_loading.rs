//! Configuration loading and validation tests
//!
//! Tests focus on BEHAVIOR of configuration loading and chain assembly from
//! files, not on the details of TOML parsing.

use proxify::chain::ChainBuilder;
use proxify::config::{ConfigError, PipelineConfig};
use proxify::error::PipelineError;
use proxify::interceptor::builtin::builtin_registry;
use serde_json::json;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(temp_file, "{content}").unwrap();
    temp_file
}

#[test]
fn test_config_loads_successfully_from_valid_toml() {
    let temp_file = write_config(
        r#"
interceptors = ["logging", { name = "attributes", config = { set = { region = "eu" } } }]

[pipeline]
name = "orders"
description = "Order service pipeline"
"#,
    );

    let config = PipelineConfig::load_from_file(temp_file.path()).unwrap();

    assert_eq!(config.pipeline.name, "orders");
    assert_eq!(
        config.pipeline.description.as_deref(),
        Some("Order service pipeline")
    );
    assert_eq!(config.interceptor_names(), vec!["logging", "attributes"]);
    assert_eq!(
        config.interceptors[1].config_value(),
        json!({"set": {"region": "eu"}})
    );
}

#[test]
fn test_missing_file_is_read_error() {
    let result = PipelineConfig::load_from_file(Path::new("/nonexistent/pipeline.toml"));

    assert!(matches!(result, Err(ConfigError::FileRead(_))));
}

#[test]
fn test_missing_pipeline_section_fails() {
    let temp_file = write_config(r#"interceptors = ["logging"]"#);

    let result = PipelineConfig::load_from_file(temp_file.path());

    assert!(matches!(result, Err(ConfigError::TomlParse(_))));
}

#[test]
fn test_reserved_name_rejected_on_load() {
    let temp_file = write_config(
        r#"
interceptors = ["system:target"]

[pipeline]
name = "orders"
"#,
    );

    let result = PipelineConfig::load_from_file(temp_file.path());

    assert!(matches!(result, Err(ConfigError::ReservedInterceptorName(_))));
}

#[test]
fn test_loaded_config_assembles_chain() {
    let temp_file = write_config(
        r#"
[pipeline]
name = "orders"

[[interceptors]]
name = "attributes"
config = { set = { tenant = "acme" }, phases = ["LOCATE"] }

[[interceptors]]
name = "logging"
config = { level = "debug" }
"#,
    );

    let config = PipelineConfig::load_from_file(temp_file.path()).unwrap();
    let registry = builtin_registry().unwrap();
    let chain = ChainBuilder::new(&registry).build(&config).unwrap();

    assert_eq!(chain.stage_names(), vec!["attributes", "logging"]);
}

#[test]
fn test_unknown_interceptor_fails_assembly() {
    let temp_file = write_config(
        r#"
interceptors = ["logging", "rate-limit"]

[pipeline]
name = "orders"
"#,
    );

    let config = PipelineConfig::load_from_file(temp_file.path()).unwrap();
    let registry = builtin_registry().unwrap();
    let result = ChainBuilder::new(&registry).build(&config);

    assert!(matches!(result, Err(PipelineError::Assembly { .. })));
}
