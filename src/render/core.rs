use crate::config::RenderConfig;
use crate::render::{
    backend::{DrawBackend, ShaderBackend},
    mesh::QuadMesh,
    shaders::{ProgramBuilder, ShaderProgram},
    source::ShaderProgramSource,
};
use crate::utils::error::RenderError;

/// Owns the quad and the program that draws it, and issues the per-frame calls.
pub struct Renderer<B: ShaderBackend + DrawBackend + Clone> {
    backend: B,
    program: ShaderProgram<B>,
    mesh: QuadMesh<B>,
}

impl<B: ShaderBackend + DrawBackend + Clone> Renderer<B> {
    /// Uploads the quad, then builds and activates the program.
    ///
    /// Geometry goes first so a vertex array is bound when the program is
    /// validated.
    pub fn new(backend: B, config: &RenderConfig, source: &ShaderProgramSource) -> Result<Self, RenderError> {
        backend.set_clear_color(config.clear_color);

        let mesh = QuadMesh::upload(backend.clone())?;
        let program = ProgramBuilder::new(backend.clone()).build(source)?;
        program.set_used();

        log::info!("Shader program {} ready", program.id().get());

        Ok(Self {
            backend,
            program,
            mesh,
        })
    }

    pub fn program(&self) -> &ShaderProgram<B> {
        &self.program
    }

    pub fn resize(&self, width: u32, height: u32) {
        self.backend.viewport(width as i32, height as i32);
    }

    pub fn render_frame(&self) {
        self.backend.clear_color_buffer();
        self.mesh.draw();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backend::mock::{MockBackend, BROKEN_SOURCE};
    use crate::utils::error::ShaderError;

    fn basic_source() -> ShaderProgramSource {
        "#shader vertex\nvoid main() {}\n#shader fragment\nvoid main() {}\n"
            .parse()
            .unwrap()
    }

    #[test]
    fn test_setup_order() {
        let backend = MockBackend::new();
        let renderer = Renderer::new(backend.clone(), &RenderConfig::default(), &basic_source()).unwrap();

        let calls = backend.calls();
        let position = |prefix: &str| calls.iter().position(|c| c.starts_with(prefix)).unwrap();
        assert_eq!(position("set_clear_color"), 0);
        assert!(position("upload_buffer Index") < position("validate_program"));
        assert_eq!(calls.last().unwrap(), &format!("use_program {}", renderer.program().id().get()));
    }

    #[test]
    fn test_frame_clears_then_draws() {
        let backend = MockBackend::new();
        let renderer = Renderer::new(backend.clone(), &RenderConfig::default(), &basic_source()).unwrap();
        let before = backend.calls().len();

        renderer.render_frame();
        renderer.render_frame();

        let calls = backend.calls();
        assert_eq!(
            &calls[before..],
            [
                "clear_color_buffer",
                "bind_vertex_array 1",
                "draw_indexed_triangles 6",
                "clear_color_buffer",
                "bind_vertex_array 1",
                "draw_indexed_triangles 6",
            ]
        );
    }

    #[test]
    fn test_resize_sets_viewport() {
        let backend = MockBackend::new();
        let renderer = Renderer::new(backend.clone(), &RenderConfig::default(), &basic_source()).unwrap();

        renderer.resize(800, 600);
        assert_eq!(backend.calls().last().unwrap(), "viewport 800 600");
    }

    #[test]
    fn test_broken_shader_releases_everything() {
        let backend = MockBackend::new();
        let source = ShaderProgramSource {
            vertex: "void main() {}\n".to_owned(),
            fragment: BROKEN_SOURCE.to_owned(),
        };

        let err = Renderer::new(backend.clone(), &RenderConfig::default(), &source)
            .err()
            .unwrap();
        assert!(matches!(err, RenderError::Shader(ShaderError::Compile { .. })));

        let state = backend.state.borrow();
        assert!(state.live_shaders.is_empty());
        assert!(state.live_programs.is_empty());
        assert!(state.live_buffers.is_empty());
        assert!(state.live_vertex_arrays.is_empty());
    }

    #[test]
    fn test_drop_releases_program_and_mesh() {
        let backend = MockBackend::new();
        let renderer = Renderer::new(backend.clone(), &RenderConfig::default(), &basic_source()).unwrap();
        drop(renderer);

        let state = backend.state.borrow();
        assert!(state.live_programs.is_empty());
        assert!(state.live_buffers.is_empty());
        assert!(state.live_vertex_arrays.is_empty());
    }
}
