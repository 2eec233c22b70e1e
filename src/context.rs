//! The seam between particle shading and a graphics API.
//!
//! [`GraphicsContext`] is a small, state-machine shaped view of a GPU:
//! a current program, an active texture unit, textures bound per unit and
//! uniforms addressed by location. Shading variants talk only to this trait,
//! which keeps their binding order observable and testable. The wgpu
//! implementation lives in [`crate::gpu`].

use glam::Mat4;

use crate::error::ShaderError;
use crate::textures::TextureConfig;
use crate::vertex::ParticleVertex;

/// A texture unit. Particle shading uses two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureUnit {
    /// Primary particle image.
    Unit0,
    /// Color table.
    Unit1,
}

impl TextureUnit {
    /// Numeric unit index, as written into sampler uniforms.
    pub fn index(self) -> i32 {
        match self {
            TextureUnit::Unit0 => 0,
            TextureUnit::Unit1 => 1,
        }
    }
}

/// Resolved location of a uniform within a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

/// Vertex and fragment source of one shader program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramSource {
    pub label: &'static str,
    pub vertex: String,
    pub fragment: String,
}

/// GPU state operations needed to shade and draw particle quads.
pub trait GraphicsContext {
    /// Compiled program handle. Cheap to clone.
    type Program: Clone;
    /// Texture handle. Dropping it releases the texture.
    type Texture;
    /// Uploaded vertex + index buffers of one quad buffer.
    type Geometry;

    /// Compile a program from WGSL vertex and fragment sources.
    fn compile_program(&mut self, source: &ProgramSource) -> Result<Self::Program, ShaderError>;

    /// Make `program` current for subsequent uniform writes and draws.
    fn use_program(&mut self, program: &Self::Program);

    /// Look up a uniform by name; `None` when the program does not use it.
    fn uniform_location(&self, program: &Self::Program, name: &str) -> Option<UniformLocation>;

    /// Select the unit that [`GraphicsContext::bind_texture`] targets.
    fn active_texture(&mut self, unit: TextureUnit);

    /// Bind `texture` to the active unit.
    fn bind_texture(&mut self, texture: &Self::Texture);

    /// Unbind whatever texture the active unit holds.
    fn unbind_texture(&mut self);

    fn set_uniform_i32(&mut self, location: UniformLocation, value: i32);

    fn set_uniform_f32(&mut self, location: UniformLocation, value: f32);

    fn set_uniform_mat4(&mut self, location: UniformLocation, value: &Mat4);

    /// Create a texture from RGBA pixels.
    fn create_texture(&mut self, image: &TextureConfig) -> Self::Texture;

    /// Upload vertices and indices into new GPU buffers.
    fn create_geometry(&mut self, vertices: &[ParticleVertex], indices: &[u16]) -> Self::Geometry;

    /// Overwrite vertices starting at `first_vertex`.
    fn upload_vertices(
        &mut self,
        geometry: &Self::Geometry,
        first_vertex: usize,
        vertices: &[ParticleVertex],
    );

    /// Draw `index_count` indices of `geometry` with the current state.
    fn draw_indexed(&mut self, geometry: &Self::Geometry, index_count: u32);
}
