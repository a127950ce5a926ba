//! Configuration loading

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::Config;

/// Load and validate configuration
///
/// Config file search order:
/// 1. `SYNCTV_CONFIG_PATH` environment variable (explicit path)
/// 2. ./config.yaml (current working directory)
/// 3. Environment variables only
///
/// Environment variables override file values in every case.
pub fn load_config() -> Result<Config> {
    let path = config_path(std::env::var("SYNCTV_CONFIG_PATH").ok());
    let config = match &path {
        Some(path) => Config::from_file(path).with_context(|| format!("loading {path}"))?,
        None => Config::from_env().context("loading config from environment")?,
    };

    if let Err(errors) = config.validate() {
        for error in &errors {
            tracing::error!("Config validation error: {}", error);
        }
        return Err(anyhow::anyhow!(
            "Configuration validation failed with {} error(s): {}",
            errors.len(),
            errors.join("; ")
        ));
    }

    info!(
        file = path.as_deref().unwrap_or("<env>"),
        proxy_prefix = %config.media.proxy_path_prefix,
        "Configuration loaded and validated"
    );
    Ok(config)
}

fn config_path(explicit: Option<String>) -> Option<String> {
    explicit
        .filter(|p| Path::new(p).exists())
        .or_else(|| Path::new("config.yaml").exists().then(|| "config.yaml".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_must_exist() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        let path = file.path().to_str().unwrap().to_string();
        assert_eq!(config_path(Some(path.clone())), Some(path));
        assert_ne!(
            config_path(Some("/nonexistent/synctv.yaml".to_string())),
            Some("/nonexistent/synctv.yaml".to_string())
        );
    }
}
