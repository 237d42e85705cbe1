pub mod params;
pub mod parse;
pub mod registration;
pub mod types;

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub use params::RunParams;
pub use parse::{load_config, parse_config, read_config, validate_config, ConfigError};
pub use registration::AppRegistration;
pub use types::{BatchConfig, Config, OversizePolicy};

/// Matches `$env{VAR_NAME}` where VAR_NAME starts with a letter or underscore.
fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$env\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env var pattern is valid")
    })
}

/// Expands environment variables in a string.
/// Supports $env{VAR_NAME} syntax.
/// If an environment variable is not set, it's left unchanged.
pub fn expand_env_vars(text: &str) -> String {
    env_var_pattern()
        .replace_all(text, |caps: &regex::Captures| {
            let whole = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
            caps.get(1)
                .and_then(|name| std::env::var(name.as_str()).ok())
                .unwrap_or_else(|| whole.to_string())
        })
        .to_string()
}

/// Expands tilde (~) in paths to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();

    if let Some(rest) = path_str.strip_prefix("~/") {
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(rest);
        }
    } else if path_str == "~" {
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir;
        }
    }

    path.to_path_buf()
}

/// Resolves the config file path based on explicit argument or default locations.
/// Returns the first existing path from:
/// 1. Explicit path (if provided, with tilde expansion)
/// 2. ~/.config/scp-load/config.yml
/// 3. /etc/scp-load/config.yml
///
/// `None` means the built-in defaults apply.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(expand_tilde(path));
    }

    if let Some(home_dir) = dirs::home_dir() {
        let user_config = home_dir.join(".config/scp-load/config.yml");
        if user_config.exists() {
            return Some(user_config);
        }
    }

    let system_config = PathBuf::from("/etc/scp-load/config.yml");
    if system_config.exists() {
        return Some(system_config);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_vars_replaces_set_variable() {
        std::env::set_var("SCP_LOAD_TEST_TENANT_HOST", "ingest.example.com");
        let result = expand_env_vars("url: https://$env{SCP_LOAD_TEST_TENANT_HOST}/v1");
        assert_eq!(result, "url: https://ingest.example.com/v1");
        std::env::remove_var("SCP_LOAD_TEST_TENANT_HOST");
    }

    #[test]
    fn test_expand_env_vars_leaves_unset_variable() {
        let text = "appreg: $env{SCP_LOAD_TEST_DEFINITELY_UNSET}/appreg.json";
        assert_eq!(expand_env_vars(text), text);
    }

    #[test]
    fn test_expand_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde(Path::new("~/appreg.json")), home.join("appreg.json"));
            assert_eq!(expand_tilde(Path::new("~")), home);
        }
        assert_eq!(expand_tilde(Path::new("./appreg.json")), PathBuf::from("./appreg.json"));
    }

    #[test]
    fn test_explicit_config_path_wins() {
        let path = resolve_config_path(Some(Path::new("/tmp/scp-load.yml")));
        assert_eq!(path, Some(PathBuf::from("/tmp/scp-load.yml")));
    }
}
