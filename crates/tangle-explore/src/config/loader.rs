//! Configuration loader with multi-source merging

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;

use super::{ConfigError, ExploreConfig};

/// XDG-compliant paths for tangle
pub struct Paths {
    project_dirs: Option<ProjectDirs>,
}

impl Paths {
    pub fn new() -> Self {
        Self {
            project_dirs: ProjectDirs::from("dev", "Tangle", "tangle"),
        }
    }

    /// Get user config file path (~/.config/tangle/config.toml)
    pub fn user_config_file(&self) -> Result<PathBuf, ConfigError> {
        self.project_dirs
            .as_ref()
            .map(|p| p.config_dir().join("config.toml"))
            .ok_or_else(|| {
                ConfigError::XdgError("Failed to determine user config directory".to_string())
            })
    }

    /// Get project config file path (tangle.toml)
    pub fn project_config_file(project_dir: impl AsRef<Path>) -> PathBuf {
        project_dir.as_ref().join("tangle.toml")
    }

    /// Get local config file path (tangle.local.toml, gitignored)
    pub fn local_config_file(project_dir: impl AsRef<Path>) -> PathBuf {
        project_dir.as_ref().join("tangle.local.toml")
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration loader with builder pattern
pub struct ConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
    include_user_config: bool,
}

impl ConfigLoader {
    /// Create a new config loader with default project directory (current dir)
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "TANGLE".to_string(),
            include_user_config: true,
        }
    }

    /// Set the project directory
    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the environment variable prefix (default: "TANGLE")
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Skip ~/.config/tangle/config.toml
    pub fn without_user_config(mut self) -> Self {
        self.include_user_config = false;
        self
    }

    /// Load configuration from all sources with proper precedence
    pub fn load(self) -> Result<ExploreConfig> {
        let mut builder = ::config::Config::builder();

        // 1. Start with built-in defaults
        let defaults = ExploreConfig::default();
        builder = builder.add_source(::config::Config::try_from(&defaults)?);

        // 2. User config (~/.config/tangle/config.toml)
        if self.include_user_config {
            if let Ok(user_config_file) = Paths::new().user_config_file() {
                if user_config_file.exists() {
                    builder = builder.add_source(
                        ::config::File::from(user_config_file)
                            .required(false)
                            .format(::config::FileFormat::Toml),
                    );
                }
            }
        }

        // 3. Project config (tangle.toml)
        let project_config_file = Paths::project_config_file(&self.project_dir);
        if project_config_file.exists() {
            builder = builder.add_source(
                ::config::File::from(project_config_file)
                    .required(false)
                    .format(::config::FileFormat::Toml),
            );
        }

        // 4. Local config (tangle.local.toml, gitignored)
        let local_config_file = Paths::local_config_file(&self.project_dir);
        if local_config_file.exists() {
            builder = builder.add_source(
                ::config::File::from(local_config_file)
                    .required(false)
                    .format(::config::FileFormat::Toml),
            );
        }

        // 5. Environment variables (TANGLE_*). Field names contain underscores,
        // so nesting uses a double underscore.
        builder = builder.add_source(
            ::config::Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        let explore_config: ExploreConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        explore_config
            .validate()
            .context("Configuration failed validation")?;

        Ok(explore_config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default(self) -> ExploreConfig {
        self.load().unwrap_or_default()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
