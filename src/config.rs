use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/checker/config.json";
pub const CONFIG_PATH_ENV: &str = "CHECKER_CONFIG";

fn default_port() -> u16 {
    5000
}

/// Application configuration, persisted as JSON so it stays readable by
/// the tooling that already manages `/etc/checker/config.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckerConfig {
    /// Port the HTTP listener binds to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Status fields stripped from HTTP responses before serialization.
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            exclude: Vec::new(),
        }
    }
}

/// Config file location: `CHECKER_CONFIG` when set, the system default
/// otherwise.
pub fn config_path() -> PathBuf {
    std::env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Load configuration from a JSON file. A missing file is not an error:
/// the config may never have been written, so defaults apply.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CheckerConfig, String> {
    let path = path.as_ref();

    if !path.exists() {
        debug!("no config at {}, using defaults", path.display());
        return Ok(CheckerConfig::default());
    }

    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

    let config: CheckerConfig = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse JSON config '{}': {}", path.display(), e))?;

    debug!("loaded config from {}", path.display());
    Ok(config)
}

/// Persist configuration, creating the parent directory on first use.
pub fn save_config<P: AsRef<Path>>(path: P, config: &CheckerConfig) -> Result<(), String> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create '{}': {}", parent.display(), e))?;
    }

    let contents = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;

    fs::write(path, contents)
        .map_err(|e| format!("Failed to write config file '{}': {}", path.display(), e))?;

    info!("saved config to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();

        let config = load_config(dir.path().join("config.json")).unwrap();

        assert_eq!(config, CheckerConfig::default());
        assert_eq!(config.port, 5000);
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("etc").join("config.json");

        let config = CheckerConfig {
            port: 8080,
            exclude: vec!["time_online".to_string()],
        };
        save_config(&path, &config).unwrap();

        assert_eq!(load_config(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"port": 9000}"#).unwrap();

        let config = load_config(&path).unwrap();

        assert_eq!(config.port, 9000);
        assert!(config.exclude.is_empty());
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();

        assert!(load_config(&path).is_err());
    }
}
