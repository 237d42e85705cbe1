use super::ConfigError;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;

/// Client credentials of the registered application.
#[derive(Clone, Deserialize)]
pub struct AppRegistration {
    #[serde(alias = "clientId")]
    pub client_id: String,
    #[serde(alias = "clientSecret")]
    pub client_secret: String,
}

impl AppRegistration {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Registration {
            path: path.to_path_buf(),
            source,
        })?;

        let registration: AppRegistration =
            serde_json::from_str(&contents).map_err(|source| {
                ConfigError::InvalidRegistration {
                    path: path.to_path_buf(),
                    source,
                }
            })?;

        if registration.client_id.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "application registration '{}' has an empty client_id",
                path.display()
            )));
        }

        Ok(registration)
    }
}

impl fmt::Debug for AppRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppRegistration")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}
