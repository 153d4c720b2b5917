use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use validator::Validate;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// How parameter placeholders are written into the statement text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamStyle {
    /// `?` for every parameter
    #[default]
    Positional,
    /// `?1`, `?2`, ... in emission order
    Ordinal,
    /// `:p1`, `:p2`, ... in emission order
    Named,
}

impl ParamStyle {
    /// Placeholder for the `index`-th (1-based) anonymous parameter.
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            ParamStyle::Positional => "?".to_string(),
            ParamStyle::Ordinal => format!("?{}", index),
            ParamStyle::Named => format!(":p{}", index),
        }
    }

    /// True if `name` can collide with a generated placeholder of this style.
    pub fn reserves(&self, name: &str) -> bool {
        match self {
            ParamStyle::Named => name.strip_prefix('p').is_some_and(|digits| {
                !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
            }),
            ParamStyle::Positional | ParamStyle::Ordinal => false,
        }
    }
}

impl fmt::Display for ParamStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamStyle::Positional => "positional",
            ParamStyle::Ordinal => "ordinal",
            ParamStyle::Named => "named",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
#[error("unknown parameter style `{0}` (expected positional, ordinal or named)")]
pub struct ParamStyleParseError(String);

impl FromStr for ParamStyle {
    type Err = ParamStyleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positional" => Ok(ParamStyle::Positional),
            "ordinal" => Ok(ParamStyle::Ordinal),
            "named" => Ok(ParamStyle::Named),
            other => Err(ParamStyleParseError(other.to_string())),
        }
    }
}

/// Query builder configuration with validation
#[derive(Clone, Debug, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Placeholder style for anonymous parameters
    pub param_style: ParamStyle,

    /// Maximum nesting depth of sub-queries below a root query
    #[validate(range(
        min = 1,
        max = 64,
        message = "Max sub-query depth must be between 1 and 64"
    ))]
    pub max_subquery_depth: u32,

    /// Skip join clauses for entities that are only read through their identifier
    pub join_elision: bool,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            param_style: ParamStyle::Positional,
            max_subquery_depth: 16,
            join_elision: true,
        }
    }
}

impl BuilderConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            param_style: parse_env_var("PROXYQL_PARAM_STYLE", "positional")?,
            max_subquery_depth: parse_env_var("PROXYQL_MAX_SUBQUERY_DEPTH", "16")?,
            join_elision: parse_env_var("PROXYQL_JOIN_ELISION", "true")?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from a YAML document
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content.to_string(),
            source: Box::new(e),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;
        Self::from_yaml_str(&content)
    }
}

/// Parse an environment variable with a default value. Unset falls back to
/// the default; a set but non-unicode value is an error.
fn parse_env_var<T: FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = match env::var(key) {
        Ok(value) => value,
        Err(env::VarError::NotPresent) => default.to_string(),
        Err(e) => return Err(e.into()),
    };
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}
