use crate::render::source::ShaderStage;
use std::ffi::NulError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Failed to open shader file {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read shader source: {0}")]
    Read(#[from] io::Error),

    #[error("Line {line}: shader source appears before any `#shader` marker")]
    ContentBeforeMarker { line: usize },
}

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("Failed to compile {stage} shader!\n{message}")]
    Compile { stage: ShaderStage, message: String },

    #[error("Program linking failed: {0}")]
    Link(String),

    #[error("Program validation failed: {0}")]
    Validate(String),

    #[error("The driver could not create a {0} object")]
    Create(&'static str),

    #[error("{0} shader source contains a null byte: {1}")]
    Nul(ShaderStage, #[source] NulError),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("The driver could not create a {0} object")]
    Create(&'static str),

    #[error(transparent)]
    Shader(#[from] ShaderError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum InitError {
    #[error("Event loop creation failed: {0}")]
    EventLoop(String),

    #[error("Window creation failed: {0}")]
    Window(String),

    #[error("OpenGL context creation failed: {0}")]
    Context(String),

    #[error("OpenGL surface creation failed: {0}")]
    Surface(String),
}
