use crate::context::{GraphicsContext, TextureUnit, UniformLocation};

use super::{FrameUniforms, Shading, ShadingVariant};

/// Uniform locations of the shared uniform set.
///
/// `None` entries are uniforms the program optimized away; writes to them
/// are skipped.
#[derive(Debug, Clone, Copy)]
struct BaseLocations {
    transform: Option<UniformLocation>,
    opacity: Option<UniformLocation>,
    timestamp: Option<UniformLocation>,
}

/// Plain textured particles: one image on unit 0, tinted by the spawn color.
pub struct BaseShading<C: GraphicsContext> {
    program: C::Program,
    texture: C::Texture,
    timestamp: f32,
    /// Resolved on first activation.
    locations: Option<BaseLocations>,
}

impl<C: GraphicsContext> BaseShading<C> {
    pub fn new(program: C::Program, texture: C::Texture) -> Self {
        Self {
            program,
            texture,
            timestamp: 0.0,
            locations: None,
        }
    }

    /// The particle image.
    pub fn texture(&self) -> &C::Texture {
        &self.texture
    }
}

impl<C: GraphicsContext> Shading<C> for BaseShading<C> {
    fn variant(&self) -> ShadingVariant {
        ShadingVariant::Base
    }

    fn program(&self) -> &C::Program {
        &self.program
    }

    fn timestamp(&self) -> f32 {
        self.timestamp
    }

    fn set_timestamp(&mut self, seconds: f32) {
        self.timestamp = seconds;
    }

    fn activate(&mut self, ctx: &mut C, frame: &FrameUniforms) {
        // A freshly resolved program has never seen the matrix.
        let first = self.locations.is_none();
        let program = &self.program;
        let loc = *self.locations.get_or_insert_with(|| BaseLocations {
            transform: ctx.uniform_location(program, "transform"),
            opacity: ctx.uniform_location(program, "opacity"),
            timestamp: ctx.uniform_location(program, "timestamp"),
        });

        ctx.active_texture(TextureUnit::Unit0);
        ctx.bind_texture(&self.texture);

        if let Some(l) = loc.opacity {
            ctx.set_uniform_f32(l, frame.opacity);
        }
        if let Some(l) = loc.timestamp {
            ctx.set_uniform_f32(l, self.timestamp);
        }
        if frame.matrix_dirty || first {
            if let Some(l) = loc.transform {
                ctx.set_uniform_mat4(l, &frame.transform);
            }
        }
    }

    fn deactivate(&mut self, ctx: &mut C) {
        ctx.active_texture(TextureUnit::Unit0);
        ctx.unbind_texture();
    }
}
