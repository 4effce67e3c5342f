// shaders.rs - Compiles shader stages and links them into a program

use crate::render::backend::{ProgramHandle, ShaderBackend, StageHandle};
use crate::render::source::{ShaderProgramSource, ShaderStage};
use crate::utils::error::ShaderError;
use log::{debug, error};
use std::ffi::CString;
use std::fmt;

/// Turns a pair of stage sources into a linked, validated program.
///
/// Every failure is terminal for the build attempt: stages created along the
/// way are released and the error is returned, nothing is retried.
pub struct ProgramBuilder<B: ShaderBackend + Clone> {
    backend: B,
}

impl<B: ShaderBackend + Clone> ProgramBuilder<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Compiles and links both stages of `source`.
    ///
    /// If the vertex stage fails the fragment stage is never compiled, and a
    /// failing fragment stage releases the already compiled vertex stage.
    /// No program object is created unless both stages compiled.
    pub fn build(&self, source: &ShaderProgramSource) -> Result<ShaderProgram<B>, ShaderError> {
        let vertex = self.compile_stage(ShaderStage::Vertex, source.source(ShaderStage::Vertex))?;
        let fragment = match self.compile_stage(ShaderStage::Fragment, source.source(ShaderStage::Fragment)) {
            Ok(fragment) => fragment,
            Err(e) => {
                self.backend.delete_shader(vertex);
                return Err(e);
            }
        };

        self.link(vertex, fragment)
    }

    pub fn compile_stage(&self, stage: ShaderStage, source: &str) -> Result<StageHandle, ShaderError> {
        let source = CString::new(source.as_bytes()).map_err(|e| ShaderError::Nul(stage, e))?;

        let shader = self
            .backend
            .create_shader(stage)
            .ok_or(ShaderError::Create("shader"))?;

        self.backend.shader_source(shader, &source);
        self.backend.compile_shader(shader);

        if !self.backend.compile_status(shader) {
            let message = self.backend.shader_info_log(shader);
            error!("Failed to compile {} shader!", stage);
            error!("{}", message);
            self.backend.delete_shader(shader);
            return Err(ShaderError::Compile { stage, message });
        }

        debug!("Compiled {} shader {}", stage, shader.get());
        Ok(shader)
    }

    /// Links `vertex` and `fragment` into a program and validates it.
    ///
    /// Both stages are deleted before this returns, whatever the outcome.
    pub fn link(&self, vertex: StageHandle, fragment: StageHandle) -> Result<ShaderProgram<B>, ShaderError> {
        let Some(program) = self.backend.create_program() else {
            self.backend.delete_shader(vertex);
            self.backend.delete_shader(fragment);
            return Err(ShaderError::Create("program"));
        };

        self.backend.attach_shader(program, vertex);
        self.backend.attach_shader(program, fragment);
        self.backend.link_program(program);
        self.backend.validate_program(program);

        // Stages are no longer needed once linked in
        self.backend.delete_shader(vertex);
        self.backend.delete_shader(fragment);

        if !self.backend.link_status(program) {
            let message = self.backend.program_info_log(program);
            error!("Failed to link shader program!");
            error!("{}", message);
            self.backend.delete_program(program);
            return Err(ShaderError::Link(message));
        }

        if !self.backend.validate_status(program) {
            let message = self.backend.program_info_log(program);
            error!("Shader program failed validation!");
            error!("{}", message);
            self.backend.delete_program(program);
            return Err(ShaderError::Validate(message));
        }

        debug!("Linked shader program {}", program.get());
        Ok(ShaderProgram {
            backend: self.backend.clone(),
            id: program,
        })
    }
}

/// A linked program. The GL object is deleted on drop.
pub struct ShaderProgram<B: ShaderBackend> {
    backend: B,
    id: ProgramHandle,
}

impl<B: ShaderBackend> ShaderProgram<B> {
    pub fn id(&self) -> ProgramHandle {
        self.id
    }

    pub fn set_used(&self) {
        self.backend.use_program(self.id);
    }
}

impl<B: ShaderBackend> fmt::Debug for ShaderProgram<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderProgram").field("id", &self.id).finish()
    }
}

impl<B: ShaderBackend> Drop for ShaderProgram<B> {
    fn drop(&mut self) {
        debug!("Deleting shader program {}", self.id.get());
        self.backend.delete_program(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backend::mock::{MockBackend, BROKEN_SOURCE};

    const VERTEX: &str = "#version 330 core\nlayout(location = 0) in vec4 position;\nvoid main() { gl_Position = position; }\n";
    const FRAGMENT: &str = "#version 330 core\nlayout(location = 0) out vec4 color;\nvoid main() { color = vec4(1.0); }\n";

    fn source(vertex: &str, fragment: &str) -> ShaderProgramSource {
        ShaderProgramSource {
            vertex: vertex.to_owned(),
            fragment: fragment.to_owned(),
        }
    }

    #[test]
    fn test_compile_stage_success() {
        let backend = MockBackend::new();
        let builder = ProgramBuilder::new(backend.clone());

        let shader = builder.compile_stage(ShaderStage::Vertex, VERTEX).unwrap();

        assert_ne!(shader.get(), 0);
        let state = backend.state.borrow();
        assert!(!state.calls.iter().any(|c| c.starts_with("shader_info_log")));
        assert_eq!(state.sources[&shader.get()], VERTEX);
        assert!(state.live_shaders.contains(&shader.get()));
    }

    #[test]
    fn test_compile_stage_failure_names_stage() {
        let backend = MockBackend::new();
        let builder = ProgramBuilder::new(backend.clone());

        let err = builder
            .compile_stage(ShaderStage::Fragment, BROKEN_SOURCE)
            .unwrap_err();

        match &err {
            ShaderError::Compile { stage, message } => {
                assert_eq!(*stage, ShaderStage::Fragment);
                assert!(message.contains("syntax error"));
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(err.to_string().contains("fragment"));
        assert!(backend.state.borrow().live_shaders.is_empty());
    }

    #[test]
    fn test_compile_stage_rejects_nul() {
        let backend = MockBackend::new();
        let builder = ProgramBuilder::new(backend.clone());

        let err = builder
            .compile_stage(ShaderStage::Vertex, "void main() {}\0")
            .unwrap_err();

        assert!(matches!(err, ShaderError::Nul(ShaderStage::Vertex, _)));
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_build_links_and_releases_stages() {
        let backend = MockBackend::new();
        let builder = ProgramBuilder::new(backend.clone());

        let program = builder.build(&source(VERTEX, FRAGMENT)).unwrap();

        assert_eq!(
            backend.calls(),
            vec![
                "create_shader vertex -> 1",
                "shader_source 1",
                "compile_shader 1",
                "create_shader fragment -> 2",
                "shader_source 2",
                "compile_shader 2",
                "create_program -> 3",
                "attach_shader 3 1",
                "attach_shader 3 2",
                "link_program 3",
                "validate_program 3",
                "delete_shader 1",
                "delete_shader 2",
            ]
        );
        assert_eq!(program.id().get(), 3);
        assert!(backend.state.borrow().live_shaders.is_empty());

        program.set_used();
        drop(program);
        let calls = backend.calls();
        assert_eq!(&calls[calls.len() - 2..], ["use_program 3", "delete_program 3"]);
        assert!(backend.state.borrow().live_programs.is_empty());
    }

    #[test]
    fn test_build_stops_at_failed_vertex_stage() {
        let backend = MockBackend::new();
        let builder = ProgramBuilder::new(backend.clone());

        let err = builder.build(&source(BROKEN_SOURCE, FRAGMENT)).unwrap_err();

        assert!(matches!(err, ShaderError::Compile { stage: ShaderStage::Vertex, .. }));
        let calls = backend.calls();
        assert!(!calls.iter().any(|c| c.starts_with("create_program")));
        assert!(!calls.iter().any(|c| c.contains("fragment")));
        assert!(backend.state.borrow().live_shaders.is_empty());
    }

    #[test]
    fn test_build_releases_vertex_when_fragment_fails() {
        let backend = MockBackend::new();
        let builder = ProgramBuilder::new(backend.clone());

        let err = builder.build(&source(VERTEX, BROKEN_SOURCE)).unwrap_err();

        assert!(matches!(err, ShaderError::Compile { stage: ShaderStage::Fragment, .. }));
        let state = backend.state.borrow();
        assert!(state.live_shaders.is_empty());
        assert!(state.live_programs.is_empty());
        assert!(!state.calls.iter().any(|c| c.starts_with("attach_shader")));
    }

    #[test]
    fn test_link_failure_is_reported() {
        let backend = MockBackend::new();
        backend.state.borrow_mut().fail_link = true;
        let builder = ProgramBuilder::new(backend.clone());

        let err = builder.build(&source(VERTEX, FRAGMENT)).unwrap_err();

        match err {
            ShaderError::Link(message) => assert!(message.contains("v_color")),
            other => panic!("unexpected error {:?}", other),
        }
        let state = backend.state.borrow();
        assert!(state.live_shaders.is_empty());
        assert!(state.live_programs.is_empty());
    }

    #[test]
    fn test_validate_failure_is_reported() {
        let backend = MockBackend::new();
        backend.state.borrow_mut().fail_validate = true;
        let builder = ProgramBuilder::new(backend.clone());

        let err = builder.build(&source(VERTEX, FRAGMENT)).unwrap_err();

        assert!(matches!(err, ShaderError::Validate(_)));
        assert!(backend.state.borrow().live_programs.is_empty());
    }

    #[test]
    fn test_create_failure() {
        let backend = MockBackend::new();
        backend.state.borrow_mut().fail_create = true;
        let builder = ProgramBuilder::new(backend.clone());

        let err = builder.compile_stage(ShaderStage::Vertex, VERTEX).unwrap_err();
        assert!(matches!(err, ShaderError::Create("shader")));
    }

    #[test]
    fn test_build_success_fetches_no_diagnostics() {
        let backend = MockBackend::new();
        let program = ProgramBuilder::new(backend.clone())
            .build(&source(VERTEX, FRAGMENT))
            .unwrap();

        let calls = backend.calls();
        assert!(!calls.iter().any(|c| c.starts_with("shader_info_log")));
        assert!(!calls.iter().any(|c| c.starts_with("program_info_log")));
        assert_eq!(format!("{:?}", program), format!("ShaderProgram {{ id: {:?} }}", program.id()));
    }

    #[test]
    fn test_failed_stage_fetches_its_log() {
        let backend = MockBackend::new();
        let err = ProgramBuilder::new(backend.clone())
            .build(&source(VERTEX, BROKEN_SOURCE))
            .unwrap_err();

        assert!(matches!(err, ShaderError::Compile { stage: ShaderStage::Fragment, .. }));
        assert!(backend.calls().contains(&"shader_info_log 2".to_string()));
    }

    #[test]
    fn test_build_from_split_file() {
        let text = format!("#shader vertex\n{}#shader fragment\n{}", VERTEX, FRAGMENT);
        let parsed: ShaderProgramSource = text.parse().unwrap();
        let backend = MockBackend::new();

        let program = ProgramBuilder::new(backend.clone()).build(&parsed).unwrap();

        let state = backend.state.borrow();
        assert_eq!(state.sources[&1], VERTEX);
        assert_eq!(state.sources[&2], FRAGMENT);
        drop(state);
        drop(program);
    }
}
