use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    #[default]
    Local,
    S3,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct S3Config {
    pub bucket: String,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub public_base_url: Option<String>,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: None,
            endpoint_url: None,
            public_base_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub storage: StorageMode,
    pub s3: S3Config,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            storage: StorageMode::Local,
            s3: S3Config::default(),
        }
    }
}

impl Config {
    pub fn from_raw(raw_config: &str) -> Self {
        match serde_json::from_str::<Config>(raw_config) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(
                    "Failed to parse config (line {}, column {}): {}, using default",
                    e.line(),
                    e.column(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Environment variables beat the file on every startup.
    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(host) = std::env::var("HOST")
            && !host.trim().is_empty()
        {
            self.host = host;
        }
        if let Ok(port) = std::env::var("PORT") {
            match port.parse() {
                Ok(port) => self.port = port,
                Err(_) => tracing::warn!("Ignoring unparseable PORT value '{port}'"),
            }
        }
        if let Ok(mode) = std::env::var("TASKBOARD_STORAGE") {
            match mode.to_lowercase().as_str() {
                "local" => self.storage = StorageMode::Local,
                "s3" => self.storage = StorageMode::S3,
                other => tracing::warn!("Ignoring unknown TASKBOARD_STORAGE value '{other}'"),
            }
        }
        if let Ok(bucket) = std::env::var("TASKBOARD_S3_BUCKET") {
            self.s3.bucket = bucket;
        }
        if let Ok(region) = std::env::var("TASKBOARD_S3_REGION") {
            self.s3.region = Some(region);
        }
        if let Ok(endpoint) = std::env::var("TASKBOARD_S3_ENDPOINT") {
            self.s3.endpoint_url = Some(endpoint);
        }
        if let Ok(url) = std::env::var("TASKBOARD_S3_PUBLIC_URL") {
            self.s3.public_base_url = Some(url);
        }
        self
    }
}

/// Will always return config, falling back to defaults on missing/invalid files.
pub fn load_config_from_file(config_path: &PathBuf) -> Config {
    match std::fs::read_to_string(config_path) {
        Ok(raw_config) => Config::from_raw(&raw_config),
        Err(err) => {
            if err.kind() == std::io::ErrorKind::NotFound {
                tracing::info!("No config file found, using defaults");
            } else {
                tracing::warn!("Failed to read config file: {}", err);
            }
            Config::default()
        }
    }
}

pub fn save_config_to_file(config: &Config, config_path: &PathBuf) -> Result<(), ConfigError> {
    let raw_config = serde_json::to_string_pretty(config)?;
    std::fs::write(config_path, raw_config)?;
    Ok(())
}

/// Loads `config.json` from the asset dir and applies env overrides.
pub fn load() -> Config {
    load_config_from_file(&utils::assets::config_path()).apply_env_overrides()
}

#[cfg(test)]
mod tests {
    use test_support::EnvGuard;

    use super::*;

    #[test]
    fn invalid_json_falls_back_to_defaults() {
        let config = Config::from_raw("{not json");
        assert_eq!(config.port, 3000);
        assert_eq!(config.storage, StorageMode::Local);
    }

    #[test]
    fn partial_file_keeps_defaults_for_the_rest() {
        let config = Config::from_raw(r#"{"port": 8080}"#);
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "127.0.0.1");
    }

    #[test]
    fn env_overrides_beat_file_values() {
        let _guard = EnvGuard::set(&[
            ("PORT", "9999"),
            ("TASKBOARD_STORAGE", "s3"),
            ("TASKBOARD_S3_BUCKET", "my-bucket"),
        ]);
        let config = Config::from_raw(r#"{"port": 8080}"#).apply_env_overrides();
        assert_eq!(config.port, 9999);
        assert_eq!(config.storage, StorageMode::S3);
        assert_eq!(config.s3.bucket, "my-bucket");
    }

    #[test]
    fn unknown_storage_mode_is_ignored() {
        let _guard = EnvGuard::set(&[("TASKBOARD_STORAGE", "tape")]);
        let config = Config::default().apply_env_overrides();
        assert_eq!(config.storage, StorageMode::Local);
    }

    #[test]
    fn roundtrips_through_file() {
        let dir = test_support::temp_dir();
        let path = dir.path().join("config.json");
        let mut config = Config::default();
        config.port = 4242;
        save_config_to_file(&config, &path).unwrap();
        let loaded = load_config_from_file(&path);
        assert_eq!(loaded.port, 4242);
    }
}
