pub mod config;
pub mod render;
pub mod utils;

// Re-export commonly used types
pub use config::core::AppConfig;
pub use render::backend::GlBackend;
pub use render::core::Renderer;
pub use render::shaders::{ProgramBuilder, ShaderProgram};
pub use render::source::{ShaderProgramSource, ShaderStage};
pub use utils::error::{ConfigError, InitError, ParseError, RenderError, ShaderError};
