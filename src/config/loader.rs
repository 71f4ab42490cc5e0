//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding `listener.bind_address`.
pub const ENV_LISTEN_ADDR: &str = "PROXY_LISTEN_ADDR";

/// Environment variable overriding the url of every configured upstream's
/// single-target case: applied when exactly one upstream is configured.
pub const ENV_UPSTREAM_URL: &str = "PROXY_UPSTREAM_URL";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation failed: {}", format_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration.
///
/// With no path, starts from the built-in defaults. Environment overrides
/// are applied after the file is parsed and before validation.
pub fn load_config(path: Option<&Path>) -> Result<ProxyConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => ProxyConfig::default(),
    };

    apply_env_overrides(&mut config);

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn apply_env_overrides(config: &mut ProxyConfig) {
    if let Ok(addr) = std::env::var(ENV_LISTEN_ADDR) {
        if !addr.is_empty() {
            config.listener.bind_address = addr;
        }
    }
    if let Ok(url) = std::env::var(ENV_UPSTREAM_URL) {
        if !url.is_empty() && config.upstreams.len() == 1 {
            config.upstreams[0].url = url;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_no_file() {
        let config = load_config(None).unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.upstreams[0].url, "http://localhost:3007");
    }

    #[test]
    fn parses_toml_file() {
        let dir = std::env::temp_dir().join("cors-proxy-loader-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("proxy.toml");
        std::fs::write(
            &path,
            r#"
[listener]
bind_address = "127.0.0.1:9999"

[[upstreams]]
name = "api"
url = "http://127.0.0.1:3000"

[[routes]]
name = "api"
path_prefix = "/api"
upstream = "api"
"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:9999");
        assert_eq!(config.routes[0].upstream, "api");
        assert_eq!(config.timeouts.connect_secs, 5);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let dir = std::env::temp_dir().join("cors-proxy-loader-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.toml");
        std::fs::write(
            &path,
            r#"
[[routes]]
name = "dangling"
path_prefix = "/x"
upstream = "ghost"
"#,
        )
        .unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }
}
