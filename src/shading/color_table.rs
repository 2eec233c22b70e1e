use crate::context::{GraphicsContext, TextureUnit, UniformLocation};

use super::{BaseShading, FrameUniforms, Shading, ShadingVariant};

/// Particles recolored through a lookup strip on texture unit 1.
///
/// Composes a [`BaseShading`] for everything on unit 0.
pub struct ColorTableShading<C: GraphicsContext> {
    base: BaseShading<C>,
    color_table: C::Texture,
    /// Outer `None` until the first activation resolves it.
    colortable_location: Option<Option<UniformLocation>>,
}

impl<C: GraphicsContext> ColorTableShading<C> {
    pub fn new(program: C::Program, texture: C::Texture, color_table: C::Texture) -> Self {
        Self {
            base: BaseShading::new(program, texture),
            color_table,
            colortable_location: None,
        }
    }

    /// The lookup strip.
    pub fn color_table(&self) -> &C::Texture {
        &self.color_table
    }
}

impl<C: GraphicsContext> Shading<C> for ColorTableShading<C> {
    fn variant(&self) -> ShadingVariant {
        ShadingVariant::ColorTable
    }

    fn program(&self) -> &C::Program {
        self.base.program()
    }

    fn timestamp(&self) -> f32 {
        self.base.timestamp()
    }

    fn set_timestamp(&mut self, seconds: f32) {
        self.base.set_timestamp(seconds);
    }

    fn activate(&mut self, ctx: &mut C, frame: &FrameUniforms) {
        let program = self.base.program();
        let location = *self
            .colortable_location
            .get_or_insert_with(|| ctx.uniform_location(program, "colortable"));

        // Unit 1 first: the base pass switches back to unit 0 and stays there.
        ctx.active_texture(TextureUnit::Unit1);
        ctx.bind_texture(&self.color_table);
        if let Some(l) = location {
            ctx.set_uniform_i32(l, TextureUnit::Unit1.index());
        }

        self.base.activate(ctx, frame);
    }

    fn deactivate(&mut self, ctx: &mut C) {
        ctx.active_texture(TextureUnit::Unit1);
        ctx.unbind_texture();
        self.base.deactivate(ctx);
    }
}
