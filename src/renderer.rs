//! Render-unit lifecycle and per-particle writes.
//!
//! [`ParticleRenderer`] owns at most one render unit: a [`QuadBuffer`], its
//! uploaded geometry, and the shading variant drawing it. The unit is built
//! lazily on the first frame, replaced as a whole after a reset or capacity
//! change, and never exposed half-built.
//!
//! ```text
//!            prepare_frame             ok
//!   Empty ───────────────▶ Building ────────▶ Ready
//!     ▲                        │                │ reset / set_capacity
//!     │         build failed   │                ▼
//!     ├────────────────────────┘           Invalidated
//!     │      next prepare_frame drops the old unit │
//!     └────────────────────────────────────────────┘
//! ```
//!
//! # Frame flow
//!
//! ```ignore
//! let mut renderer = ParticleRenderer::new(&EmbeddedShaders, config)?;
//!
//! // each frame, on the render thread:
//! renderer.prepare_frame(&mut ctx, &clock)?;
//! for (slot, particle) in spawned {
//!     renderer.on_spawn(slot, &particle);
//! }
//! for (slot, particle) in moved {
//!     renderer.on_update(slot, &particle);
//! }
//! renderer.submit(&mut ctx, &frame);
//! ```

use glam::Vec2;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{ImageSource, ParticleConfig};
use crate::context::GraphicsContext;
use crate::error::{BuildError, RenderError, ShaderError, SlotOutOfRange, TextureError};
use crate::quad_buffer::QuadBuffer;
use crate::shading::{
    BaseShading, ColorTableShading, FrameUniforms, ResourceStore, ShaderLibrary, Shading,
    ShadingVariant,
};
use crate::time::SimulationClock;
use crate::vertex::{ParticleState, Rgba8};
use crate::writer::spawn_color;

/// Observable lifecycle state of the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// No render unit.
    Empty,
    /// A render unit is being built.
    Building,
    /// A render unit is valid and drawable.
    Ready,
    /// The render unit is stale and gets dropped on the next frame.
    Invalidated,
}

/// Handle to the drawable of one render-unit generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawNode {
    generation: u64,
    variant: ShadingVariant,
    index_count: u32,
    dirty: bool,
}

impl DrawNode {
    /// Increments with every successful build.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn variant(&self) -> ShadingVariant {
        self.variant
    }

    /// Number of indices a draw of this node covers.
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Whether material state changed since the last [`DrawNode::take_dirty`].
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Consume the dirty signal.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    fn mark_material_dirty(&mut self) {
        self.dirty = true;
    }
}

/// One generation of buffer, geometry and shading. Dropped as a whole.
struct RenderUnit<C: GraphicsContext> {
    buffer: QuadBuffer,
    geometry: C::Geometry,
    shading: Box<dyn Shading<C>>,
    node: DrawNode,
}

enum NodeState<C: GraphicsContext> {
    Empty,
    Building,
    Ready(RenderUnit<C>),
    Invalidated(RenderUnit<C>),
}

/// Why a build attempt produced no unit.
enum BuildFailure {
    /// Retried next frame.
    Build(BuildError),
    /// Fatal.
    Shader(ShaderError),
}

impl From<BuildError> for BuildFailure {
    fn from(e: BuildError) -> Self {
        BuildFailure::Build(e)
    }
}

impl From<ShaderError> for BuildFailure {
    fn from(e: ShaderError) -> Self {
        BuildFailure::Shader(e)
    }
}

/// Particle quad renderer driven once per frame.
pub struct ParticleRenderer<C: GraphicsContext + 'static> {
    config: ParticleConfig,
    shaders: ShaderLibrary<C>,
    state: NodeState<C>,
    origin: Vec2,
    rng: StdRng,
    generation: u64,
    /// Bumped by every configuration change and reset.
    revision: u64,
    /// Revision whose build failure was already reported at warn level.
    reported_revision: Option<u64>,
    last_build_error: Option<BuildError>,
}

impl<C: GraphicsContext + 'static> ParticleRenderer<C> {
    /// Create a renderer, loading all shader sources up front.
    ///
    /// # Errors
    ///
    /// Fails if the resource store lacks a shader source. Without it no
    /// variant can ever draw, so this should abort startup.
    pub fn new(store: &dyn ResourceStore, config: ParticleConfig) -> Result<Self, ShaderError> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            shaders: ShaderLibrary::load(store)?,
            config,
            state: NodeState::Empty,
            origin: Vec2::ZERO,
            rng,
            generation: 0,
            revision: 0,
            reported_revision: None,
            last_build_error: None,
        })
    }

    pub fn state(&self) -> LifecycleState {
        match self.state {
            NodeState::Empty => LifecycleState::Empty,
            NodeState::Building => LifecycleState::Building,
            NodeState::Ready(_) => LifecycleState::Ready,
            NodeState::Invalidated(_) => LifecycleState::Invalidated,
        }
    }

    pub fn config(&self) -> &ParticleConfig {
        &self.config
    }

    /// Draw node of the current generation, while ready.
    pub fn draw_node(&self) -> Option<&DrawNode> {
        self.ready().map(|unit| &unit.node)
    }

    /// Mutable draw node, for consuming its dirty signal.
    pub fn draw_node_mut(&mut self) -> Option<&mut DrawNode> {
        self.ready_mut().map(|unit| &mut unit.node)
    }

    /// CPU copy of the current quad buffer, while ready.
    pub fn quad_buffer(&self) -> Option<&QuadBuffer> {
        self.ready().map(|unit| &unit.buffer)
    }

    /// Timestamp last pushed into the shading, in seconds.
    pub fn timestamp(&self) -> Option<f32> {
        self.ready().map(|unit| unit.shading.timestamp())
    }

    /// Error of the most recent failed build, cleared by a successful one.
    pub fn last_build_error(&self) -> Option<&BuildError> {
        self.last_build_error.as_ref()
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// Takes effect at the next build.
    pub fn set_image(&mut self, image: Option<ImageSource>) {
        if self.config.image != image {
            self.config.image = image;
            self.revision += 1;
        }
    }

    /// Takes effect at the next build.
    pub fn set_color_table(&mut self, table: Option<ImageSource>) {
        if self.config.color_table != table {
            self.config.color_table = table;
            self.revision += 1;
        }
    }

    /// Takes effect at the next spawn.
    pub fn set_color(&mut self, color: Rgba8) {
        if self.config.colors.color != color {
            self.config.colors.color = color;
            self.revision += 1;
        }
    }

    pub fn set_color_variation(&mut self, variation: f32) {
        if self.config.colors.color_variation != variation {
            self.config.colors.color_variation = variation;
            self.revision += 1;
        }
    }

    pub fn set_additive(&mut self, additive: f32) {
        if self.config.colors.additive != additive {
            self.config.colors.additive = additive;
            self.revision += 1;
        }
    }

    pub fn set_alpha_variation(&mut self, variation: f32) {
        if self.config.colors.alpha_variation != variation {
            self.config.colors.alpha_variation = variation;
            self.revision += 1;
        }
    }

    /// Change the number of slots. Invalidates the current unit.
    pub fn set_capacity(&mut self, capacity: i64) {
        self.config.capacity = capacity;
        self.reset();
    }

    /// Request a rebuild from the current configuration on the next frame.
    pub fn reset(&mut self) {
        self.revision += 1;
        self.state = match std::mem::replace(&mut self.state, NodeState::Empty) {
            NodeState::Ready(unit) | NodeState::Invalidated(unit) => NodeState::Invalidated(unit),
            other => other,
        };
    }

    /// Origin subtracted from particle positions on every slot write.
    pub fn set_system_offset(&mut self, origin: Vec2) {
        self.origin = origin;
    }

    // ------------------------------------------------------------------
    // Frame
    // ------------------------------------------------------------------

    /// Advance the renderer by one frame.
    ///
    /// Drops an invalidated unit, builds a new one if needed while the
    /// clock runs, pushes the clock's time into the shading and marks the
    /// draw node dirty once. Returns the draw node if one is ready.
    ///
    /// # Errors
    ///
    /// Only shader compilation failures are returned. Capacity and image
    /// problems are logged, leave the renderer empty, and are retried on
    /// the next frame.
    pub fn prepare_frame(
        &mut self,
        ctx: &mut C,
        clock: &dyn SimulationClock,
    ) -> Result<Option<&DrawNode>, RenderError> {
        if let NodeState::Invalidated(_) = self.state {
            // Old buffer, geometry and textures go before anything new exists.
            self.state = NodeState::Empty;
            log::debug!("Dropped invalidated particle render unit");
        }

        if clock.is_running() {
            if let NodeState::Empty = self.state {
                self.build(ctx)?;
            }
            if let NodeState::Ready(unit) = &mut self.state {
                let seconds = (clock.now() as f64 / 1000.0) as f32;
                unit.shading.set_timestamp(seconds);
            }
        }

        Ok(match &mut self.state {
            NodeState::Ready(unit) => {
                unit.node.mark_material_dirty();
                Some(&unit.node)
            }
            _ => None,
        })
    }

    /// Upload pending slot writes and record the draw.
    ///
    /// Returns `false` when there is nothing to draw.
    pub fn submit(&mut self, ctx: &mut C, frame: &FrameUniforms) -> bool {
        let Some(unit) = self.ready_mut() else {
            return false;
        };

        if let Some(range) = unit.buffer.take_dirty_range() {
            let first = range.start;
            ctx.upload_vertices(&unit.geometry, first, &unit.buffer.vertices()[range]);
        }

        ctx.use_program(unit.shading.program());
        unit.shading.activate(ctx, frame);
        ctx.draw_indexed(&unit.geometry, unit.node.index_count);
        unit.shading.deactivate(ctx);
        true
    }

    // ------------------------------------------------------------------
    // Particle writes
    // ------------------------------------------------------------------

    /// A particle was born in `slot`: pick its color and write its state.
    ///
    /// Dropped while no unit is ready.
    pub fn on_spawn(&mut self, slot: usize, particle: &ParticleState) {
        let NodeState::Ready(unit) = &mut self.state else {
            return;
        };
        let color = spawn_color(&self.config.colors, &mut self.rng);
        let written = unit
            .buffer
            .write_color(slot, color)
            .and_then(|()| unit.buffer.write_slot(slot, particle, self.origin));
        if let Err(err) = written {
            slot_misuse(err);
        }
    }

    /// A live particle moved. Its color stays as spawned.
    ///
    /// Dropped while no unit is ready.
    pub fn on_update(&mut self, slot: usize, particle: &ParticleState) {
        let NodeState::Ready(unit) = &mut self.state else {
            return;
        };
        if let Err(err) = unit.buffer.write_slot(slot, particle, self.origin) {
            slot_misuse(err);
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn ready(&self) -> Option<&RenderUnit<C>> {
        match &self.state {
            NodeState::Ready(unit) => Some(unit),
            _ => None,
        }
    }

    fn ready_mut(&mut self) -> Option<&mut RenderUnit<C>> {
        match &mut self.state {
            NodeState::Ready(unit) => Some(unit),
            _ => None,
        }
    }

    fn build(&mut self, ctx: &mut C) -> Result<(), ShaderError> {
        self.state = NodeState::Building;

        match self.build_unit(ctx) {
            Ok(unit) => {
                log::info!(
                    "Built particle render unit #{}: {} slots, {:?} shading",
                    unit.node.generation,
                    unit.buffer.capacity(),
                    unit.node.variant
                );
                self.state = NodeState::Ready(unit);
                self.last_build_error = None;
                self.reported_revision = None;
                Ok(())
            }
            Err(BuildFailure::Build(err)) => {
                if self.reported_revision == Some(self.revision) {
                    log::debug!("Particle render unit still not buildable: {err}");
                } else {
                    log::warn!("Particle render unit not built: {err}");
                    self.reported_revision = Some(self.revision);
                }
                self.state = NodeState::Empty;
                self.last_build_error = Some(err);
                Ok(())
            }
            Err(BuildFailure::Shader(err)) => {
                self.state = NodeState::Empty;
                Err(err)
            }
        }
    }

    fn build_unit(&mut self, ctx: &mut C) -> Result<RenderUnit<C>, BuildFailure> {
        let buffer = QuadBuffer::build(self.config.capacity)?;

        let image = self
            .config
            .image
            .as_ref()
            .ok_or(TextureError::NoSource)
            .and_then(ImageSource::load)
            .map_err(BuildError::ImageLoadFailed)?;

        let table = self.config.color_table.as_ref().and_then(|source| {
            source
                .load()
                .inspect_err(|err| {
                    log::debug!("Color table unavailable, using plain shading: {err}")
                })
                .ok()
        });

        let shading: Box<dyn Shading<C>> = match table {
            Some(table) => {
                let program = self.shaders.program(ShadingVariant::ColorTable, ctx)?;
                let texture = ctx.create_texture(&image);
                let color_table = ctx.create_texture(&table);
                Box::new(ColorTableShading::new(program, texture, color_table))
            }
            None => {
                let program = self.shaders.program(ShadingVariant::Base, ctx)?;
                let texture = ctx.create_texture(&image);
                Box::new(BaseShading::new(program, texture))
            }
        };

        let geometry = ctx.create_geometry(buffer.vertices(), buffer.indices());

        self.generation += 1;
        let node = DrawNode {
            generation: self.generation,
            variant: shading.variant(),
            index_count: buffer.indices().len() as u32,
            dirty: false,
        };

        Ok(RenderUnit {
            buffer,
            geometry,
            shading,
            node,
        })
    }
}

/// A write outside the buffer means the slot mapping upstream is broken.
fn slot_misuse(err: SlotOutOfRange) {
    if cfg!(debug_assertions) {
        panic!("particle slot mapping is out of sync: {err}");
    }
    log::error!("Ignoring particle write: {err}");
}
