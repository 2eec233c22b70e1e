//! A [`GraphicsContext`] that records calls instead of talking to a GPU.

#![allow(dead_code)]

use std::collections::HashMap;

use tinted_quads::{
    GraphicsContext, Mat4, ParticleVertex, ProgramSource, ShaderError, TextureConfig, TextureUnit,
    UniformLocation,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Compile(&'static str),
    Use(&'static str),
    Active(TextureUnit),
    Bind(u32),
    Unbind,
    Int(&'static str, i32),
    Float(&'static str, f32),
    Matrix(&'static str),
    Texture(u32),
    Geometry(u32),
    Upload { geometry: u32, first: usize, count: usize },
    Draw { geometry: u32, indices: u32 },
}

const UNIFORMS: [&str; 4] = ["transform", "opacity", "timestamp", "colortable"];

#[derive(Debug, Default)]
pub struct Recorder {
    pub ops: Vec<Op>,
    /// Mirror of uploaded vertex buffers, by geometry id.
    pub buffers: HashMap<u32, Vec<ParticleVertex>>,
    /// Fails every compile when set.
    pub reject_compiles: bool,
    next_id: u32,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.ops.clear();
    }

    pub fn count(&self, pred: impl Fn(&Op) -> bool) -> usize {
        self.ops.iter().filter(|op| pred(op)).count()
    }

    fn id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

impl GraphicsContext for Recorder {
    type Program = &'static str;
    type Texture = u32;
    type Geometry = u32;

    fn compile_program(&mut self, source: &ProgramSource) -> Result<Self::Program, ShaderError> {
        if self.reject_compiles {
            return Err(ShaderError::ShaderCompile {
                label: source.label.to_string(),
                message: "rejected".into(),
            });
        }
        self.ops.push(Op::Compile(source.label));
        Ok(source.label)
    }

    fn use_program(&mut self, program: &Self::Program) {
        self.ops.push(Op::Use(*program));
    }

    fn uniform_location(&self, _program: &Self::Program, name: &str) -> Option<UniformLocation> {
        UNIFORMS
            .iter()
            .position(|n| *n == name)
            .map(|i| UniformLocation(i as u32))
    }

    fn active_texture(&mut self, unit: TextureUnit) {
        self.ops.push(Op::Active(unit));
    }

    fn bind_texture(&mut self, texture: &Self::Texture) {
        self.ops.push(Op::Bind(*texture));
    }

    fn unbind_texture(&mut self) {
        self.ops.push(Op::Unbind);
    }

    fn set_uniform_i32(&mut self, location: UniformLocation, value: i32) {
        self.ops.push(Op::Int(UNIFORMS[location.0 as usize], value));
    }

    fn set_uniform_f32(&mut self, location: UniformLocation, value: f32) {
        self.ops.push(Op::Float(UNIFORMS[location.0 as usize], value));
    }

    fn set_uniform_mat4(&mut self, location: UniformLocation, _value: &Mat4) {
        self.ops.push(Op::Matrix(UNIFORMS[location.0 as usize]));
    }

    fn create_texture(&mut self, _image: &TextureConfig) -> Self::Texture {
        let id = self.id();
        self.ops.push(Op::Texture(id));
        id
    }

    fn create_geometry(&mut self, vertices: &[ParticleVertex], _indices: &[u16]) -> Self::Geometry {
        let id = self.id();
        self.buffers.insert(id, vertices.to_vec());
        self.ops.push(Op::Geometry(id));
        id
    }

    fn upload_vertices(
        &mut self,
        geometry: &Self::Geometry,
        first_vertex: usize,
        vertices: &[ParticleVertex],
    ) {
        if let Some(buffer) = self.buffers.get_mut(geometry) {
            buffer[first_vertex..first_vertex + vertices.len()].copy_from_slice(vertices);
        }
        self.ops.push(Op::Upload {
            geometry: *geometry,
            first: first_vertex,
            count: vertices.len(),
        });
    }

    fn draw_indexed(&mut self, geometry: &Self::Geometry, index_count: u32) {
        self.ops.push(Op::Draw {
            geometry: *geometry,
            indices: index_count,
        });
    }
}
