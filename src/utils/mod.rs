pub mod error;

pub use error::{ConfigError, InitError, ParseError, RenderError, ShaderError};
