//! Shading variants for particle quads.
//!
//! Two variants share one capability, [`Shading`]:
//!
//! - [`BaseShading`]: the particle image on unit 0, tinted by the spawn
//!   color, with `transform`, `opacity` and `timestamp` uniforms.
//! - [`ColorTableShading`]: wraps a [`BaseShading`] and adds a color table
//!   on unit 1 plus the `colortable` uniform.
//!
//! The color-table variant binds its extra texture *before* running the base
//! pass. The base pass always ends with unit 0 active, so the binding order
//! is what keeps unit 0 current once activation is done.
//!
//! Shader sources come from a [`ResourceStore`] and are loaded once into a
//! [`ShaderLibrary`], which compiles each variant's program at most once.

mod base;
mod color_table;

use std::borrow::Cow;
use std::collections::HashMap;

use glam::Mat4;

use crate::context::{GraphicsContext, ProgramSource};
use crate::error::ShaderError;

pub use base::BaseShading;
pub use color_table::ColorTableShading;

/// Resource key of the plain vertex stage.
pub const BASE_VERTEX: &str = "shaders/particle.vert.wgsl";
/// Resource key of the plain fragment stage.
pub const BASE_FRAGMENT: &str = "shaders/particle.frag.wgsl";
/// Resource key of the color-table vertex stage.
pub const COLOR_TABLE_VERTEX: &str = "shaders/colortable.vert.wgsl";
/// Resource key of the color-table fragment stage.
pub const COLOR_TABLE_FRAGMENT: &str = "shaders/colortable.frag.wgsl";

/// Which shading variant a render unit uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShadingVariant {
    Base,
    ColorTable,
}

impl ShadingVariant {
    fn label(self) -> &'static str {
        match self {
            ShadingVariant::Base => "particle",
            ShadingVariant::ColorTable => "particle colortable",
        }
    }

    fn source_keys(self) -> (&'static str, &'static str) {
        match self {
            ShadingVariant::Base => (BASE_VERTEX, BASE_FRAGMENT),
            ShadingVariant::ColorTable => (COLOR_TABLE_VERTEX, COLOR_TABLE_FRAGMENT),
        }
    }
}

/// Per-draw renderer state handed to [`Shading::activate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUniforms {
    /// Combined projection/model matrix.
    pub transform: Mat4,
    /// Inherited opacity of the particle item.
    pub opacity: f32,
    /// Set when `transform` changed since the previous draw.
    pub matrix_dirty: bool,
}

impl Default for FrameUniforms {
    fn default() -> Self {
        Self {
            transform: Mat4::IDENTITY,
            opacity: 1.0,
            matrix_dirty: true,
        }
    }
}

/// Uniform and texture binding for one particle draw.
pub trait Shading<C: GraphicsContext> {
    fn variant(&self) -> ShadingVariant;

    /// Program to make current before [`Shading::activate`].
    fn program(&self) -> &C::Program;

    /// Simulation time in seconds pushed on the next activation.
    fn timestamp(&self) -> f32;

    fn set_timestamp(&mut self, seconds: f32);

    /// Bind textures and push uniforms. Leaves texture unit 0 active.
    fn activate(&mut self, ctx: &mut C, frame: &FrameUniforms);

    /// Release texture bindings after drawing.
    fn deactivate(&mut self, ctx: &mut C);
}

/// String-keyed lookup of raw shader sources.
pub trait ResourceStore {
    fn get(&self, key: &str) -> Option<Cow<'_, [u8]>>;
}

impl ResourceStore for HashMap<String, Vec<u8>> {
    fn get(&self, key: &str) -> Option<Cow<'_, [u8]>> {
        HashMap::get(self, key).map(|bytes| Cow::Borrowed(bytes.as_slice()))
    }
}

/// Shader sources compiled into the crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbeddedShaders;

impl ResourceStore for EmbeddedShaders {
    fn get(&self, key: &str) -> Option<Cow<'_, [u8]>> {
        let bytes: &'static [u8] = match key {
            BASE_VERTEX => include_bytes!("../shaders/particle.vert.wgsl"),
            BASE_FRAGMENT => include_bytes!("../shaders/particle.frag.wgsl"),
            COLOR_TABLE_VERTEX => include_bytes!("../shaders/colortable.vert.wgsl"),
            COLOR_TABLE_FRAGMENT => include_bytes!("../shaders/colortable.frag.wgsl"),
            _ => return None,
        };
        Some(Cow::Borrowed(bytes))
    }
}

struct VariantProgram<C: GraphicsContext> {
    source: ProgramSource,
    compiled: Option<C::Program>,
}

/// Shader sources of both variants and their compiled programs.
///
/// Owned by the renderer; every render unit of the same variant shares the
/// program compiled here.
pub struct ShaderLibrary<C: GraphicsContext> {
    base: VariantProgram<C>,
    color_table: VariantProgram<C>,
}

impl<C: GraphicsContext> ShaderLibrary<C> {
    /// Load all four shader sources.
    ///
    /// # Errors
    ///
    /// [`ShaderError::ShaderSourceMissing`] if any key is absent and
    /// [`ShaderError::InvalidEncoding`] if a source is not UTF-8. Both mean
    /// nothing can ever be drawn.
    pub fn load(store: &dyn ResourceStore) -> Result<Self, ShaderError> {
        Ok(Self {
            base: VariantProgram {
                source: load_program(store, ShadingVariant::Base)?,
                compiled: None,
            },
            color_table: VariantProgram {
                source: load_program(store, ShadingVariant::ColorTable)?,
                compiled: None,
            },
        })
    }

    /// Source of a variant's program.
    pub fn source(&self, variant: ShadingVariant) -> &ProgramSource {
        &self.slot(variant).source
    }

    /// Whether the variant's program has been compiled already.
    pub fn is_compiled(&self, variant: ShadingVariant) -> bool {
        self.slot(variant).compiled.is_some()
    }

    /// The variant's program, compiled on first request.
    pub fn program(&mut self, variant: ShadingVariant, ctx: &mut C) -> Result<C::Program, ShaderError> {
        let slot = match variant {
            ShadingVariant::Base => &mut self.base,
            ShadingVariant::ColorTable => &mut self.color_table,
        };
        if let Some(program) = &slot.compiled {
            return Ok(program.clone());
        }
        let program = ctx.compile_program(&slot.source)?;
        slot.compiled = Some(program.clone());
        Ok(program)
    }

    fn slot(&self, variant: ShadingVariant) -> &VariantProgram<C> {
        match variant {
            ShadingVariant::Base => &self.base,
            ShadingVariant::ColorTable => &self.color_table,
        }
    }
}

fn load_program(store: &dyn ResourceStore, variant: ShadingVariant) -> Result<ProgramSource, ShaderError> {
    let (vertex, fragment) = variant.source_keys();
    Ok(ProgramSource {
        label: variant.label(),
        vertex: load_source(store, vertex)?,
        fragment: load_source(store, fragment)?,
    })
}

fn load_source(store: &dyn ResourceStore, key: &'static str) -> Result<String, ShaderError> {
    let bytes = store
        .get(key)
        .ok_or(ShaderError::ShaderSourceMissing { key })?;
    std::str::from_utf8(&bytes)
        .map(str::to_owned)
        .map_err(|source| ShaderError::InvalidEncoding { key, source })
}
