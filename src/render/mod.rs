pub mod backend;
pub mod core;
pub mod mesh;
pub mod shaders;
pub mod source;

pub use self::core::Renderer;
pub use backend::{DrawBackend, GlBackend, ProgramHandle, ShaderBackend, StageHandle};
pub use mesh::QuadMesh;
pub use shaders::{ProgramBuilder, ShaderProgram};
pub use source::{split, ShaderProgramSource, ShaderStage};
