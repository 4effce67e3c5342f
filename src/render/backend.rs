//! The graphics calls the rest of the crate makes, behind two small traits.
//!
//! Every call takes the object it acts on explicitly; nothing relies on
//! whatever program or buffer happens to be bound. `GlBackend` forwards to
//! the global `gl` function pointers and is only obtained through
//! [`GlBackend::load`].

use crate::render::source::ShaderStage;
use gl::types::*;
use std::ffi::{c_void, CStr};
use std::num::NonZeroU32;
use std::ptr;

macro_rules! gl_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(NonZeroU32);

        impl $name {
            /// `None` for the zero name, which GL uses to signal failure.
            pub fn new(id: u32) -> Option<Self> {
                NonZeroU32::new(id).map(Self)
            }

            pub fn get(self) -> u32 {
                self.0.get()
            }
        }
    };
}

gl_handle!(
    /// A compiled shader stage. Lives only while a program is being built.
    StageHandle
);
gl_handle!(
    /// A linked program, owned by the host until shutdown.
    ProgramHandle
);
gl_handle!(BufferHandle);
gl_handle!(VertexArrayHandle);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferTarget {
    Vertex,
    Index,
}

pub trait ShaderBackend {
    fn create_shader(&self, stage: ShaderStage) -> Option<StageHandle>;
    fn shader_source(&self, shader: StageHandle, source: &CStr);
    fn compile_shader(&self, shader: StageHandle);
    fn compile_status(&self, shader: StageHandle) -> bool;
    fn shader_info_log(&self, shader: StageHandle) -> String;
    fn delete_shader(&self, shader: StageHandle);

    fn create_program(&self) -> Option<ProgramHandle>;
    fn attach_shader(&self, program: ProgramHandle, shader: StageHandle);
    fn link_program(&self, program: ProgramHandle);
    fn link_status(&self, program: ProgramHandle) -> bool;
    fn validate_program(&self, program: ProgramHandle);
    fn validate_status(&self, program: ProgramHandle) -> bool;
    fn program_info_log(&self, program: ProgramHandle) -> String;
    fn use_program(&self, program: ProgramHandle);
    fn delete_program(&self, program: ProgramHandle);
}

pub trait DrawBackend {
    fn create_vertex_array(&self) -> Option<VertexArrayHandle>;
    fn bind_vertex_array(&self, vao: VertexArrayHandle);
    fn delete_vertex_array(&self, vao: VertexArrayHandle);

    fn create_buffer(&self) -> Option<BufferHandle>;
    /// Binds `buffer` to `target` and fills it with static data.
    fn upload_buffer(&self, target: BufferTarget, buffer: BufferHandle, data: &[u8]);
    fn delete_buffer(&self, buffer: BufferHandle);

    /// Enables float attribute `index` reading from the bound vertex buffer.
    fn vertex_attrib_f32(&self, index: u32, components: i32, stride: i32, offset: usize);

    fn viewport(&self, width: i32, height: i32);
    fn set_clear_color(&self, rgba: [f32; 4]);
    fn clear_color_buffer(&self);
    /// Draws `count` `u32` indices from the bound index buffer as triangles.
    fn draw_indexed_triangles(&self, count: i32);
}

#[derive(Debug, Clone, Copy)]
pub struct GlBackend {
    _loaded: (),
}

impl GlBackend {
    /// Loads the GL function pointers through `loader` for the current context.
    pub fn load<F>(loader: F) -> Self
    where
        F: FnMut(&'static str) -> *const c_void,
    {
        gl::load_with(loader);
        Self { _loaded: () }
    }

    pub fn is_loaded(&self) -> bool {
        gl::CreateShader::is_loaded()
            && gl::CreateProgram::is_loaded()
            && gl::DrawElements::is_loaded()
    }

    pub fn version(&self) -> Option<String> {
        self.get_string(gl::VERSION)
    }

    pub fn renderer(&self) -> Option<String> {
        self.get_string(gl::RENDERER)
    }

    fn get_string(&self, name: GLenum) -> Option<String> {
        unsafe {
            let raw = gl::GetString(name);
            if raw.is_null() {
                None
            } else {
                Some(CStr::from_ptr(raw as *const _).to_string_lossy().into_owned())
            }
        }
    }
}

fn stage_enum(stage: ShaderStage) -> GLenum {
    match stage {
        ShaderStage::Vertex => gl::VERTEX_SHADER,
        ShaderStage::Fragment => gl::FRAGMENT_SHADER,
    }
}

fn buffer_enum(target: BufferTarget) -> GLenum {
    match target {
        BufferTarget::Vertex => gl::ARRAY_BUFFER,
        BufferTarget::Index => gl::ELEMENT_ARRAY_BUFFER,
    }
}

/// Fetches an info log of `len` bytes (terminator included) through `fetch`.
fn read_info_log<F>(len: GLint, fetch: F) -> String
where
    F: FnOnce(GLsizei, *mut GLsizei, *mut GLchar),
{
    if len <= 0 {
        return String::new();
    }

    let mut buffer = vec![0u8; len as usize];
    let mut written: GLsizei = 0;
    fetch(len, &mut written, buffer.as_mut_ptr() as *mut GLchar);
    buffer.truncate(written.clamp(0, len) as usize);

    String::from_utf8_lossy(&buffer).trim_end().to_owned()
}

impl ShaderBackend for GlBackend {
    fn create_shader(&self, stage: ShaderStage) -> Option<StageHandle> {
        StageHandle::new(unsafe { gl::CreateShader(stage_enum(stage)) })
    }

    fn shader_source(&self, shader: StageHandle, source: &CStr) {
        unsafe {
            gl::ShaderSource(shader.get(), 1, &source.as_ptr(), ptr::null());
        }
    }

    fn compile_shader(&self, shader: StageHandle) {
        unsafe { gl::CompileShader(shader.get()) }
    }

    fn compile_status(&self, shader: StageHandle) -> bool {
        let mut success = gl::FALSE as GLint;
        unsafe { gl::GetShaderiv(shader.get(), gl::COMPILE_STATUS, &mut success) };
        success != gl::FALSE as GLint
    }

    fn shader_info_log(&self, shader: StageHandle) -> String {
        let mut len = 0;
        unsafe { gl::GetShaderiv(shader.get(), gl::INFO_LOG_LENGTH, &mut len) };
        read_info_log(len, |cap, written, buf| unsafe {
            gl::GetShaderInfoLog(shader.get(), cap, written, buf)
        })
    }

    fn delete_shader(&self, shader: StageHandle) {
        unsafe { gl::DeleteShader(shader.get()) }
    }

    fn create_program(&self) -> Option<ProgramHandle> {
        ProgramHandle::new(unsafe { gl::CreateProgram() })
    }

    fn attach_shader(&self, program: ProgramHandle, shader: StageHandle) {
        unsafe { gl::AttachShader(program.get(), shader.get()) }
    }

    fn link_program(&self, program: ProgramHandle) {
        unsafe { gl::LinkProgram(program.get()) }
    }

    fn link_status(&self, program: ProgramHandle) -> bool {
        let mut success = gl::FALSE as GLint;
        unsafe { gl::GetProgramiv(program.get(), gl::LINK_STATUS, &mut success) };
        success != gl::FALSE as GLint
    }

    fn validate_program(&self, program: ProgramHandle) {
        unsafe { gl::ValidateProgram(program.get()) }
    }

    fn validate_status(&self, program: ProgramHandle) -> bool {
        let mut success = gl::FALSE as GLint;
        unsafe { gl::GetProgramiv(program.get(), gl::VALIDATE_STATUS, &mut success) };
        success != gl::FALSE as GLint
    }

    fn program_info_log(&self, program: ProgramHandle) -> String {
        let mut len = 0;
        unsafe { gl::GetProgramiv(program.get(), gl::INFO_LOG_LENGTH, &mut len) };
        read_info_log(len, |cap, written, buf| unsafe {
            gl::GetProgramInfoLog(program.get(), cap, written, buf)
        })
    }

    fn use_program(&self, program: ProgramHandle) {
        unsafe { gl::UseProgram(program.get()) }
    }

    fn delete_program(&self, program: ProgramHandle) {
        unsafe { gl::DeleteProgram(program.get()) }
    }
}

impl DrawBackend for GlBackend {
    fn create_vertex_array(&self) -> Option<VertexArrayHandle> {
        let mut vao = 0;
        unsafe { gl::GenVertexArrays(1, &mut vao) };
        VertexArrayHandle::new(vao)
    }

    fn bind_vertex_array(&self, vao: VertexArrayHandle) {
        unsafe { gl::BindVertexArray(vao.get()) }
    }

    fn delete_vertex_array(&self, vao: VertexArrayHandle) {
        let id = vao.get();
        unsafe { gl::DeleteVertexArrays(1, &id) }
    }

    fn create_buffer(&self) -> Option<BufferHandle> {
        let mut buffer = 0;
        unsafe { gl::GenBuffers(1, &mut buffer) };
        BufferHandle::new(buffer)
    }

    fn upload_buffer(&self, target: BufferTarget, buffer: BufferHandle, data: &[u8]) {
        let target = buffer_enum(target);
        unsafe {
            gl::BindBuffer(target, buffer.get());
            gl::BufferData(
                target,
                data.len() as GLsizeiptr,
                data.as_ptr() as *const _,
                gl::STATIC_DRAW,
            );
        }
    }

    fn delete_buffer(&self, buffer: BufferHandle) {
        let id = buffer.get();
        unsafe { gl::DeleteBuffers(1, &id) }
    }

    fn vertex_attrib_f32(&self, index: u32, components: i32, stride: i32, offset: usize) {
        unsafe {
            gl::EnableVertexAttribArray(index);
            gl::VertexAttribPointer(
                index,
                components,
                gl::FLOAT,
                gl::FALSE,
                stride,
                offset as *const _,
            );
        }
    }

    fn viewport(&self, width: i32, height: i32) {
        unsafe { gl::Viewport(0, 0, width, height) }
    }

    fn set_clear_color(&self, rgba: [f32; 4]) {
        unsafe { gl::ClearColor(rgba[0], rgba[1], rgba[2], rgba[3]) }
    }

    fn clear_color_buffer(&self) {
        unsafe { gl::Clear(gl::COLOR_BUFFER_BIT) }
    }

    fn draw_indexed_triangles(&self, count: i32) {
        unsafe { gl::DrawElements(gl::TRIANGLES, count, gl::UNSIGNED_INT, ptr::null()) }
    }
}
