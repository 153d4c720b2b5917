use std::io::Write;

use proxyql::{BuilderConfig, ConfigError, ParamStyle};
use tempfile::NamedTempFile;

#[test]
fn test_builder_config_from_yaml_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "param_style: named\nmax_subquery_depth: 4\njoin_elision: false"
    )
    .unwrap();

    let config = BuilderConfig::from_yaml_file(file.path()).unwrap();
    assert_eq!(config.param_style, ParamStyle::Named);
    assert_eq!(config.max_subquery_depth, 4);
    assert!(!config.join_elision);
}

#[test]
fn test_partial_yaml_keeps_defaults() {
    let config = BuilderConfig::from_yaml_str("param_style: ordinal").unwrap();
    assert_eq!(config.param_style, ParamStyle::Ordinal);
    assert_eq!(config.max_subquery_depth, 16);
    assert!(config.join_elision);
}

#[test]
fn test_out_of_range_depth_rejected() {
    let err = BuilderConfig::from_yaml_str("max_subquery_depth: 100").unwrap_err();
    assert!(matches!(err, ConfigError::Validation(_)));
}

#[test]
fn test_missing_file_reported() {
    let err = BuilderConfig::from_yaml_file("/nonexistent/proxyql.yaml").unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}
