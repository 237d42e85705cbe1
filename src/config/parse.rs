use super::types::*;
use crate::config::{env_var_pattern, expand_env_vars, expand_tilde};
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation failed:\n{}", .0.join("\n"))]
    ValidationList(Vec<String>),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("input file [{}] does not exist", .0.display())]
    MissingInput(PathBuf),

    #[error("failed to load application registration '{}': {source}", .path.display())]
    Registration {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid application registration '{}': {source}", .path.display())]
    InvalidRegistration {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Read, parse and validate a config file.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let config = read_config(path)?;
    validate_config(&config)?;
    Ok(config)
}

/// Read and parse a config file without validating it, so callers can
/// apply overrides first.
pub fn read_config(path: &Path) -> Result<Config, ConfigError> {
    use std::io::Read;

    let mut file = File::open(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to open config file '{}': {}", path.display(), e),
        ))
    })?;

    let mut yaml_string = String::new();
    file.read_to_string(&mut yaml_string).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;

    deserialize_config(&yaml_string)
}

/// Parse and validate a YAML config document.
pub fn parse_config(yaml: &str) -> Result<Config, ConfigError> {
    let config = deserialize_config(yaml)?;
    validate_config(&config)?;
    Ok(config)
}

fn deserialize_config(yaml: &str) -> Result<Config, ConfigError> {
    let yaml_string = expand_env_vars(yaml);
    check_unexpanded_vars(&yaml_string)?;

    // An empty document means "all defaults"
    let mut config: Config = if yaml_string.trim().is_empty() {
        Config::default()
    } else {
        serde_yaml::from_str(&yaml_string)?
    };

    config.auth.appreg = expand_tilde(&config.auth.appreg);

    Ok(config)
}

fn check_unexpanded_vars(yaml_string: &str) -> Result<(), ConfigError> {
    let mut unexpanded_vars: Vec<String> = env_var_pattern()
        .captures_iter(yaml_string)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
        .collect();

    if unexpanded_vars.is_empty() {
        return Ok(());
    }

    unexpanded_vars.sort();
    unexpanded_vars.dedup();

    let error_msg = if unexpanded_vars.len() == 1 {
        format!(
            "Environment variable $env{{{0}}} is not set.\n\
             \n\
             To fix this, either:\n\
             1. Set the environment variable: export {0}=...\n\
             2. Replace $env{{{0}}} in the config file with an actual value",
            unexpanded_vars[0]
        )
    } else {
        format!(
            "Environment variables are not set: {}\n\
             \n\
             To fix this, either:\n\
             1. Set the environment variables\n\
             2. Replace the variables in the config file with actual values",
            unexpanded_vars.join(", ")
        )
    };

    Err(ConfigError::Validation(error_msg))
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.auth.token_url.trim().is_empty() {
        errors.push("auth.token_url cannot be empty".to_string());
    }

    if config.ingest.url.trim().is_empty() {
        errors.push("ingest.url cannot be empty".to_string());
    }

    if config.http.timeout.is_zero() {
        errors.push("http.timeout must be greater than zero".to_string());
    }

    if config.batch.max_bytes == 0 {
        errors.push("batch.max_bytes must be greater than zero".to_string());
    }

    if config.batch.max_events == 0 {
        errors.push("batch.max_events must be greater than zero".to_string());
    }

    if config.batch.record_overhead >= config.batch.max_bytes {
        errors.push(format!(
            "batch.record_overhead ({}) must be smaller than batch.max_bytes ({})",
            config.batch.record_overhead, config.batch.max_bytes
        ));
    }

    if config.pipeline.channel_capacity == 0 {
        errors.push("pipeline.channel_capacity must be greater than zero".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationList(errors))
    }
}
