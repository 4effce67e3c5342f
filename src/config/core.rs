use super::{RenderConfig, WindowConfig};
use crate::utils::error::ConfigError;
use directories::ProjectDirs;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "quadshader.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub shader_path: PathBuf,
    pub log_level: String,
    pub window: WindowConfig,
    pub render: RenderConfig,

    /// File the config was read from, `None` for built-in defaults.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            shader_path: PathBuf::from("res/shaders/Basic.shader"),
            log_level: "info".to_string(),
            window: WindowConfig::default(),
            render: RenderConfig::default(),
            source: None,
        }
    }
}

impl AppConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Loads the first existing file among [`AppConfig::search_paths`],
    /// falling back to defaults when there is none.
    pub fn load_or_default() -> Result<Self, ConfigError> {
        Self::load_first(&Self::search_paths())
    }

    pub fn load_first(candidates: &[PathBuf]) -> Result<Self, ConfigError> {
        match candidates.iter().find(|path| path.is_file()) {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Working directory first, then the per-user config directory.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(dirs) = ProjectDirs::from("com", "MetroManDevTeam", "quadshader") {
            paths.push(dirs.config_dir().join(CONFIG_FILE_NAME));
        }
        paths
    }

    pub fn log_level_filter(&self) -> Result<LevelFilter, ConfigError> {
        self.log_level
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("unknown log level `{}`", self.log_level)))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }
        if self.render.gl_version[0] < 3 {
            return Err(ConfigError::Invalid(format!(
                "OpenGL {}.{} has no vertex array objects, 3.0 or newer is required",
                self.render.gl_version[0], self.render.gl_version[1]
            )));
        }
        self.log_level_filter()?;
        Ok(())
    }
}
