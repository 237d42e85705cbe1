use super::ConfigError;
use crate::event::EventProperties;
use crate::source::InputFormat;
use std::path::PathBuf;

/// Per-invocation parameters: what to load and under which tenant.
#[derive(Debug, Clone)]
pub struct RunParams {
    pub input: PathBuf,
    pub format: InputFormat,
    pub tenant: String,
    pub properties: EventProperties,
}

impl RunParams {
    /// The format falls back to the input's extension when not given.
    pub fn new(
        input: PathBuf,
        format: Option<InputFormat>,
        tenant: String,
        properties: EventProperties,
    ) -> Self {
        let format = format.unwrap_or_else(|| InputFormat::from_path(&input));
        Self {
            input,
            format,
            tenant,
            properties,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.input.exists() {
            return Err(ConfigError::MissingInput(self.input.clone()));
        }

        if self.tenant.trim().is_empty() {
            return Err(ConfigError::Validation(
                "tenant identifier is required".to_string(),
            ));
        }

        Ok(())
    }
}
