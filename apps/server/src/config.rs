//! Server configuration
//!
//! Sources, later ones winning:
//! 1. built-in defaults
//! 2. `ncez.toml` in the working directory, or the file named by `NCEZ_CONFIG`
//! 3. environment variables `NCEZ__<SECTION>__<KEY>`, e.g. `NCEZ__SERVER__PORT=9090`
//!
//! A `.env` file is read into the environment first.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const CONFIG_PATH_ENV: &str = "NCEZ_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "ncez.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub terminology: TerminologyConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins; empty disables CORS headers.
    pub cors_origins: Vec<String>,
    pub max_request_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: Vec::new(),
            max_request_body_size: 2 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminologyConfig {
    pub codesets_dir: PathBuf,
    pub valuesets_dir: PathBuf,
    pub conceptmaps_dir: PathBuf,
    pub watch_enabled: bool,
    pub poll_interval_ms: u64,
    pub debounce_ms: u64,
}

impl Default for TerminologyConfig {
    fn default() -> Self {
        Self {
            codesets_dir: PathBuf::from("Data/CodeSets"),
            valuesets_dir: PathBuf::from("Data/ValueSets"),
            conceptmaps_dir: PathBuf::from("Data/ConceptMaps"),
            watch_enabled: true,
            poll_interval_ms: 2_000,
            debounce_ms: 500,
        }
    }
}

impl TerminologyConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root for runtime records; allocations live in `<data_root>/RidAllocation`.
    pub data_root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("Data/runtime"),
        }
    }
}

impl StorageConfig {
    pub fn allocations_dir(&self) -> PathBuf {
        self.data_root.join("RidAllocation")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
    pub file_enabled: bool,
    pub file_directory: String,
    pub file_prefix: String,
    /// daily | hourly | minutely | never
    pub file_rotation: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file_enabled: false,
            file_directory: "logs".to_string(),
            file_prefix: "ncez-simulator".to_string(),
            file_rotation: "daily".to_string(),
        }
    }
}

impl Config {
    /// Load from defaults, the optional config file and the environment.
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&path)
    }

    pub fn load_from(path: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Config::try_from(&Config::default())?)
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("NCEZ")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins"),
            )
            .build()?
            .try_deserialize()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be non-zero".to_string());
        }
        if self.server.max_request_body_size == 0 {
            return Err("server.max_request_body_size must be non-zero".to_string());
        }

        let dirs = [
            ("terminology.codesets_dir", &self.terminology.codesets_dir),
            ("terminology.valuesets_dir", &self.terminology.valuesets_dir),
            ("terminology.conceptmaps_dir", &self.terminology.conceptmaps_dir),
            ("storage.data_root", &self.storage.data_root),
        ];
        for (key, dir) in dirs {
            if dir.as_os_str().is_empty() {
                return Err(format!("{key} must not be empty"));
            }
        }

        if self.terminology.poll_interval_ms == 0 {
            return Err("terminology.poll_interval_ms must be non-zero".to_string());
        }
        if self.terminology.debounce_ms == 0 {
            return Err("terminology.debounce_ms must be non-zero".to_string());
        }
        if !matches!(
            self.logging.file_rotation.as_str(),
            "daily" | "hourly" | "minutely" | "never"
        ) {
            return Err(format!(
                "logging.file_rotation must be one of daily, hourly, minutely, never (got '{}')",
                self.logging.file_rotation
            ));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.socket_addr().unwrap().port(), 8080);
        assert_eq!(
            config.storage.allocations_dir(),
            PathBuf::from("Data/runtime/RidAllocation")
        );
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().unwrap_err().contains("port"));

        let mut config = Config::default();
        config.terminology.codesets_dir = PathBuf::new();
        assert!(config.validate().unwrap_err().contains("codesets_dir"));

        let mut config = Config::default();
        config.terminology.debounce_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.logging.file_rotation = "weekly".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ncez.toml");
        std::fs::write(
            &path,
            "[server]\nport = 9191\n\n[terminology]\nwatch_enabled = false\ncodesets_dir = \"/srv/codes\"\n",
        )
        .unwrap();

        let config = Config::load_from(path.to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 9191);
        assert_eq!(config.server.host, "0.0.0.0");
        assert!(!config.terminology.watch_enabled);
        assert_eq!(config.terminology.codesets_dir, PathBuf::from("/srv/codes"));
        assert_eq!(config.terminology.debounce_ms, 500);
    }
}
