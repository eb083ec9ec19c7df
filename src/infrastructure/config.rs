use crate::domain::config::{DeviceProfile, SerTermConfig};
use crate::domain::error::{SerTermError, SerTermResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const CONFIG_DIR: &str = ".serterm";
const CONFIG_FILE: &str = "config.toml";

/// Configuration manager
pub struct ConfigManager {
    global_config_path: Option<PathBuf>,
    project_config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Locate the global and nearest project configuration files.
    pub fn new() -> Self {
        Self {
            global_config_path: Self::get_global_config_path(),
            project_config_path: std::env::current_dir()
                .ok()
                .and_then(|dir| Self::find_project_config_path(&dir)),
        }
    }

    /// Manager that only knows the given paths.
    pub fn with_paths(global: Option<PathBuf>, project: Option<PathBuf>) -> Self {
        Self {
            global_config_path: global,
            project_config_path: project,
        }
    }

    /// Load configuration from files
    pub fn load_config(&self) -> SerTermResult<SerTermConfig> {
        // Start with default configuration
        let mut config = SerTermConfig::default();

        if let Some(global_path) = self.global_config_path.as_deref().filter(|p| p.exists()) {
            config = Self::load_config_from_path(global_path)?;
        }

        // Project device profiles are added to the global ones
        if let Some(project_path) = self.project_config_path.as_deref().filter(|p| p.exists()) {
            let project_config = Self::load_config_from_path(project_path)?;
            config.devices.extend(project_config.devices);
        }

        Ok(config)
    }

    /// Get global configuration path
    fn get_global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config").join("serterm").join(CONFIG_FILE))
    }

    /// Find project configuration path by walking up directory tree
    pub fn find_project_config_path(start: &Path) -> Option<PathBuf> {
        let mut path = start;

        loop {
            let config_path = path.join(CONFIG_DIR).join(CONFIG_FILE);
            if config_path.exists() {
                return Some(config_path);
            }

            path = path.parent()?;
        }
    }

    /// Load configuration from specific path
    pub fn load_config_from_path(path: &Path) -> SerTermResult<SerTermConfig> {
        debug!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path).map_err(|e| SerTermError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        toml::from_str(&content).map_err(|e| SerTermError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })
    }

    /// Save configuration to specific path
    pub fn save_config_to_path(path: &Path, config: &SerTermConfig) -> SerTermResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| SerTermError::Config {
                message: format!("Failed to create config directory: {}", e),
            })?;
        }

        let content = toml::to_string_pretty(config).map_err(|e| SerTermError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(path, content).map_err(|e| SerTermError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })
    }

    /// Write the global configuration with defaults only.
    pub fn init_global_config(&self) -> SerTermResult<PathBuf> {
        let path = self.global_config_path.clone().ok_or_else(|| SerTermError::Config {
            message: "Could not determine home directory".to_string(),
        })?;
        if path.exists() {
            return Err(SerTermError::Config {
                message: format!("Global configuration already exists at {}", path.display()),
            });
        }
        Self::save_config_to_path(&path, &SerTermConfig::default())?;
        Ok(path)
    }

    /// Create default project configuration
    pub fn init_project_config(&self, dir: &Path) -> SerTermResult<PathBuf> {
        let config_file = dir.join(CONFIG_DIR).join(CONFIG_FILE);

        if config_file.exists() {
            return Err(SerTermError::Config {
                message: "Project configuration already exists".to_string(),
            });
        }

        let default_config = SerTermConfig {
            defaults: Default::default(),
            devices: vec![
                DeviceProfile {
                    name: "example_serial".to_string(),
                    description: "Example serial device".to_string(),
                    address: "/dev/ttyUSB0".to_string(),
                    baud_rate: Some(9600),
                    eol: None,
                    display: None,
                    width: None,
                    log_file: None,
                },
                DeviceProfile {
                    name: "example_tcp".to_string(),
                    description: "Example TCP device".to_string(),
                    address: "tcp://192.168.1.100:2323".to_string(),
                    baud_rate: None,
                    eol: None,
                    display: None,
                    width: None,
                    log_file: None,
                },
            ],
        };

        Self::save_config_to_path(&config_file, &default_config)?;
        Ok(config_file)
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
