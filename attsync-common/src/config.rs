//! Configuration loading and root folder resolution
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. `ATTSYNC_ROOT_FOLDER`, then `ATTSYNC_ROOT` environment variable
//! 3. TOML config file (`root_folder` key)
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or unreadable TOML file is never fatal: a warning is logged and
//! compiled defaults are used instead.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "attsync.db";

/// Compiled-in defaults for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            log_level: "info".to_string(),
        }
    }
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/attsync (or /var/lib/attsync for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("attsync"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/attsync"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("attsync"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/attsync"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("attsync"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\attsync"))
    } else {
        PathBuf::from("./attsync_data")
    }
}

/// Logging section of the TOML config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: CompiledDefaults::for_current_platform().log_level,
        }
    }
}

/// HTTP server section of the TOML config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 5780,
        }
    }
}

/// Device sync section of the TOML config
///
/// Every field is optional; unset values fall through to compiled defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub page_size: Option<u32>,
    pub utc_offset: Option<String>,
    pub interval_secs: Option<u64>,
    pub job_timeout_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
}

/// Per-module TOML configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub logging: LoggingConfig,
    pub server: ServerConfig,
    pub sync: SyncConfig,
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }
}

/// Resolves the root folder (and the TOML config) for one module
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            cli_arg: None,
        }
    }

    /// Set a command-line override (highest priority)
    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    /// Resolve the root folder. Never fails; falls back to compiled defaults.
    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        if let Ok(path) = std::env::var("ATTSYNC_ROOT_FOLDER") {
            return PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("ATTSYNC_ROOT") {
            return PathBuf::from(path);
        }

        if let Some(root) = self.load_config().root_folder {
            return root;
        }

        CompiledDefaults::for_current_platform().root_folder
    }

    /// Load the module's TOML config, or defaults if none is usable
    pub fn load_config(&self) -> TomlConfig {
        let Some(path) = self.config_file_path() else {
            debug!(module = %self.module_name, "No config file found, using defaults");
            return TomlConfig::default();
        };

        match TomlConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring config file {}: {}", path.display(), e);
                TomlConfig::default()
            }
        }
    }

    /// First existing config file for this module
    fn config_file_path(&self) -> Option<PathBuf> {
        let file_name = format!("{}.toml", self.module_name);

        let user_config = dirs::config_dir().map(|d| d.join("attsync").join(&file_name));
        if let Some(path) = user_config {
            if path.exists() {
                return Some(path);
            }
        }

        if cfg!(target_os = "linux") {
            let system_config = PathBuf::from("/etc/attsync").join(&file_name);
            if system_config.exists() {
                return Some(system_config);
            }
        }

        None
    }
}

/// Creates the root folder and locates the database within it
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }

    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_arg_wins() {
        let resolver = RootFolderResolver::new("test-module")
            .with_cli_arg(Some(PathBuf::from("/tmp/attsync-cli")));
        assert_eq!(resolver.resolve(), PathBuf::from("/tmp/attsync-cli"));
    }

    #[test]
    fn test_sync_section_defaults_to_unset() {
        let config: TomlConfig = toml::from_str("").unwrap();
        assert_eq!(config.sync, SyncConfig::default());
        assert_eq!(config.server.port, 5780);
        assert_eq!(config.logging.level, "info");
    }
}
