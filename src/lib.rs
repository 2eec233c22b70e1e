//! # Tinted Quads - particle quad rendering
//!
//! Draws particles as textured, color-tinted quads. Each particle owns one
//! slot in a fixed-size vertex buffer; the simulation writes its physical
//! state into that slot and the vertex shader animates the quad from there.
//!
//! ## Quick Start
//!
//! ```ignore
//! use tinted_quads::prelude::*;
//!
//! let config = ParticleConfig::new()
//!     .with_image("assets/spark.png")
//!     .with_color(Rgba8::new(255, 160, 40, 255))
//!     .with_capacity(2000);
//!
//! let mut ctx = GpuContext::new(device, queue, surface_format);
//! let mut renderer = ParticleRenderer::new(&EmbeddedShaders, config)?;
//! let mut time = Time::new();
//!
//! loop {
//!     time.update();
//!     renderer.prepare_frame(&mut ctx, &time)?;
//!     renderer.on_spawn(slot, &particle);
//!     renderer.submit(&mut ctx, &FrameUniforms::default());
//!     ctx.encode(&mut render_pass);
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Slots
//!
//! A [`QuadBuffer`] holds `capacity` quads, four vertices each, indexed by
//! a static 16-bit index list. That caps capacity at 16383 slots. A slot
//! whose particle is not alive yet has `t = -1` and collapses to nothing.
//!
//! ### Shading
//!
//! | Variant | Textures | Extra uniforms |
//! |---------|----------|----------------|
//! | [`BaseShading`] | image on unit 0 | - |
//! | [`ColorTableShading`] | image on unit 0, table on unit 1 | `colortable` |
//!
//! The color-table variant is chosen when a color table is configured and
//! loads; otherwise the base variant is used.
//!
//! ### Lifecycle
//!
//! [`ParticleRenderer`] builds its render unit on the first running frame,
//! replaces it whole after [`ParticleRenderer::reset`] or a capacity change
//! and drops particle writes while nothing is ready.

mod config;
mod context;
mod error;
pub mod gpu;
mod quad_buffer;
mod renderer;
pub mod shading;
pub mod textures;
pub mod time;
mod vertex;
mod writer;

pub use config::{ColorSettings, ImageSource, ParticleConfig};
pub use context::{GraphicsContext, ProgramSource, TextureUnit, UniformLocation};
pub use error::{
    BuildError, RenderError, ShaderError, SlotOutOfRange, TextureError, MAX_VERTICES,
};
pub use glam::{Mat4, Vec2};
pub use gpu::GpuContext;
pub use quad_buffer::{QuadBuffer, CORNERS};
pub use renderer::{DrawNode, LifecycleState, ParticleRenderer};
pub use shading::{
    BaseShading, ColorTableShading, EmbeddedShaders, FrameUniforms, ResourceStore,
    ShaderLibrary, Shading, ShadingVariant,
};
pub use textures::{AddressMode, FilterMode, TextureConfig};
pub use time::{ManualClock, SimulationClock, Time};
pub use vertex::{ParticleState, ParticleVertex, Rgba8};
pub use writer::spawn_color;

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use tinted_quads::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{ColorSettings, ImageSource, ParticleConfig};
    pub use crate::gpu::GpuContext;
    pub use crate::renderer::{LifecycleState, ParticleRenderer};
    pub use crate::shading::{EmbeddedShaders, FrameUniforms};
    pub use crate::textures::TextureConfig;
    pub use crate::time::{SimulationClock, Time};
    pub use crate::vertex::{ParticleState, Rgba8};
    pub use crate::{Mat4, Vec2};
}
