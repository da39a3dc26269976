// config/types.rs
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

pub const DEFAULT_CONFIG_PATH: &str = "console_config.json";

/// Process-level settings for the console. The connection profile itself is
/// kept separately in `rc_file`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub rc_file: String,
    pub port: u16,
    pub log_file: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        let rc_file = dirs::config_dir()
            .map(|dir| dir.join("cluster-console").join("rc.yaml"))
            .unwrap_or_else(|| PathBuf::from("~/.cluster-console/rc.yaml"));
        Self {
            rc_file: rc_file.to_string_lossy().into_owned(),
            port: 3000,
            log_file: None,
            request_timeout_secs: 10,
        }
    }
}

impl ConsoleConfig {
    pub fn load_from_file(path: &str) -> io::Result<Self> {
        let config_str = fs::read_to_string(path)?;
        serde_json::from_str(&config_str).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Loads `path`, writing the defaults there first when it does not exist.
    pub fn load_or_init(path: &str) -> io::Result<Self> {
        match Self::load_from_file(path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let config = Self::default();
                config.save_to_file(path)?;
                Ok(config)
            }
            other => other,
        }
    }

    pub fn save_to_file(&self, path: &str) -> io::Result<()> {
        let config_str = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, config_str)
    }

    pub fn validate(&self) -> io::Result<()> {
        if self.port == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "port must be between 1 and 65535",
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "request_timeout_secs must be positive",
            ));
        }
        if self.rc_file.trim().is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "rc_file must not be empty",
            ));
        }
        Ok(())
    }

    pub fn rc_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.rc_file).into_owned())
    }

    pub fn log_path(&self) -> Option<PathBuf> {
        self.log_file
            .as_deref()
            .map(|f| PathBuf::from(shellexpand::tilde(f).into_owned()))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_writes_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("console_config.json");
        let path = path.to_str().unwrap();

        let config = ConsoleConfig::load_or_init(path).unwrap();
        assert_eq!(config, ConsoleConfig::default());
        assert_eq!(ConsoleConfig::load_from_file(path).unwrap(), config);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("console_config.json");
        fs::write(&path, r#"{"port": 8080}"#).unwrap();

        let config = ConsoleConfig::load_or_init(path.to_str().unwrap()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.request_timeout_secs, 10);
        assert!(config.rc_file.ends_with("rc.yaml"));
    }

    #[test]
    fn malformed_file_is_invalid_data() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("console_config.json");
        fs::write(&path, "{ not json").unwrap();

        let err = ConsoleConfig::load_or_init(path.to_str().unwrap()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn validate_rejects_zero_port_and_timeout() {
        assert!(ConsoleConfig::default().validate().is_ok());

        let config = ConsoleConfig {
            port: 0,
            ..ConsoleConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ConsoleConfig {
            request_timeout_secs: 0,
            ..ConsoleConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rc_path_expands_tilde() {
        let config = ConsoleConfig {
            rc_file: "~/rc.yaml".to_string(),
            ..ConsoleConfig::default()
        };
        assert!(!config.rc_path().to_string_lossy().starts_with('~'));
    }
}
