//! Vertex layout for particle quads.
//!
//! Every particle occupies four [`ParticleVertex`] entries. The shader sees
//! them through five attributes:
//!
//! | Location | Name     | Format      | Contents                          |
//! |----------|----------|-------------|-----------------------------------|
//! | 0        | `vPos`   | `Float32x2` | position relative to the origin   |
//! | 1        | `vTex`   | `Float32x2` | fixed corner texture coordinate   |
//! | 2        | `vData`  | `Float32x4` | `t`, life span, size, end size    |
//! | 3        | `vVec`   | `Float32x4` | velocity xy, acceleration xy      |
//! | 4        | `vColor` | `Unorm8x4`  | spawn color                       |

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

/// 8-bit RGBA color shared by the four vertices of a slot.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const WHITE: Rgba8 = Rgba8::new(255, 255, 255, 255);
    pub const TRANSPARENT: Rgba8 = Rgba8::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

impl From<[u8; 4]> for Rgba8 {
    fn from(c: [u8; 4]) -> Self {
        Self::new(c[0], c[1], c[2], c[3])
    }
}

/// Physical state of one particle as handed over by the simulation.
///
/// The renderer treats these as opaque floats; only the position is
/// shifted by the system origin before it lands in the buffer.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ParticleState {
    pub x: f32,
    pub y: f32,
    /// Birth time in seconds, or a negative value for "not alive".
    pub t: f32,
    pub life_span: f32,
    pub size: f32,
    pub end_size: f32,
    pub sx: f32,
    pub sy: f32,
    pub ax: f32,
    pub ay: f32,
}

/// One corner of a particle quad, laid out exactly as the GPU reads it.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ParticleVertex {
    pub x: f32,
    pub y: f32,
    pub tx: f32,
    pub ty: f32,
    pub t: f32,
    pub life_span: f32,
    pub size: f32,
    pub end_size: f32,
    pub sx: f32,
    pub sy: f32,
    pub ax: f32,
    pub ay: f32,
    pub color: Rgba8,
}

impl ParticleVertex {
    /// Byte stride of one vertex.
    pub const STRIDE: usize = std::mem::size_of::<ParticleVertex>();

    const ATTRIBS: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
        0 => Float32x2,
        1 => Float32x2,
        2 => Float32x4,
        3 => Float32x4,
        4 => Unorm8x4
    ];

    /// A vertex that is not alive yet: `t = -1`, everything else zero.
    pub(crate) fn unborn(tx: f32, ty: f32) -> Self {
        Self {
            tx,
            ty,
            t: -1.0,
            ..Self::zeroed()
        }
    }

    /// Copy the physical fields of `p`, shifted by `origin`.
    ///
    /// Texture coordinates and color are left alone.
    #[inline]
    pub(crate) fn copy_state(&mut self, p: &ParticleState, origin: Vec2) {
        self.x = p.x - origin.x;
        self.y = p.y - origin.y;
        self.t = p.t;
        self.life_span = p.life_span;
        self.size = p.size;
        self.end_size = p.end_size;
        self.sx = p.sx;
        self.sy = p.sy;
        self.ax = p.ax;
        self.ay = p.ay;
    }

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: Self::STRIDE as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}
