use crate::render::backend::{BufferHandle, BufferTarget, DrawBackend, VertexArrayHandle};
use crate::utils::error::RenderError;
use glam::Vec2;
use std::mem;

pub const QUAD_POSITIONS: [Vec2; 4] = [
    Vec2::new(-0.5, -0.5), // 0
    Vec2::new(0.5, -0.5),  // 1
    Vec2::new(0.5, 0.5),   // 2
    Vec2::new(-0.5, 0.5),  // 3
];

pub const QUAD_INDICES: [u32; 6] = [0, 1, 2, 2, 3, 0];

/// Attribute slot the vertex shader reads positions from.
pub const POSITION_ATTRIBUTE: u32 = 0;

/// The static quad, resident on the GPU for as long as this value lives.
pub struct QuadMesh<B: DrawBackend> {
    backend: B,
    vao: VertexArrayHandle,
    vbo: BufferHandle,
    ibo: BufferHandle,
    index_count: i32,
}

impl<B: DrawBackend> QuadMesh<B> {
    pub fn upload(backend: B) -> Result<Self, RenderError> {
        let vao = backend
            .create_vertex_array()
            .ok_or(RenderError::Create("vertex array"))?;
        backend.bind_vertex_array(vao);

        let Some(vbo) = backend.create_buffer() else {
            backend.delete_vertex_array(vao);
            return Err(RenderError::Create("vertex buffer"));
        };
        backend.upload_buffer(BufferTarget::Vertex, vbo, bytemuck::cast_slice(&QUAD_POSITIONS));
        backend.vertex_attrib_f32(POSITION_ATTRIBUTE, 2, mem::size_of::<Vec2>() as i32, 0);

        let Some(ibo) = backend.create_buffer() else {
            backend.delete_buffer(vbo);
            backend.delete_vertex_array(vao);
            return Err(RenderError::Create("index buffer"));
        };
        backend.upload_buffer(BufferTarget::Index, ibo, bytemuck::cast_slice(&QUAD_INDICES));

        log::debug!(
            "Uploaded quad: {} vertices, {} indices",
            QUAD_POSITIONS.len(),
            QUAD_INDICES.len()
        );

        Ok(Self {
            backend,
            vao,
            vbo,
            ibo,
            index_count: QUAD_INDICES.len() as i32,
        })
    }

    pub fn index_count(&self) -> i32 {
        self.index_count
    }

    pub fn draw(&self) {
        self.backend.bind_vertex_array(self.vao);
        self.backend.draw_indexed_triangles(self.index_count);
    }
}

impl<B: DrawBackend> Drop for QuadMesh<B> {
    fn drop(&mut self) {
        self.backend.delete_buffer(self.ibo);
        self.backend.delete_buffer(self.vbo);
        self.backend.delete_vertex_array(self.vao);
    }
}
