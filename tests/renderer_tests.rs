//! Integration tests for the particle renderer lifecycle.
//!
//! These drive [`ParticleRenderer`] frame by frame against a recording
//! graphics context and check what a submission loop would observe.

mod common;

use common::{Op, Recorder};
use tinted_quads::{
    BuildError, EmbeddedShaders, FrameUniforms, LifecycleState, ManualClock, ParticleConfig,
    ParticleRenderer, ParticleState, RenderError, Rgba8, ShaderError, ShadingVariant,
    TextureConfig, TextureUnit, Vec2, CORNERS,
};

fn base_config(capacity: i64) -> ParticleConfig {
    ParticleConfig::new()
        .with_image(TextureConfig::solid(255, 255, 255, 255))
        .with_capacity(capacity)
        .with_seed(1)
}

fn renderer(config: ParticleConfig) -> ParticleRenderer<Recorder> {
    ParticleRenderer::new(&EmbeddedShaders, config).unwrap()
}

fn particle(x: f32, y: f32, t: f32) -> ParticleState {
    ParticleState {
        x,
        y,
        t,
        life_span: 2.0,
        size: 8.0,
        end_size: 2.0,
        sx: 1.0,
        sy: -1.0,
        ax: 0.0,
        ay: 9.8,
    }
}

// ============================================================================
// Scenario
// ============================================================================

#[test]
fn test_spawn_scenario() {
    let mut ctx = Recorder::new();
    let clock = ManualClock::new(0);
    let config = base_config(100)
        .with_color(Rgba8::new(255, 0, 0, 255))
        .with_color_variation(0.0)
        .with_additive(0.0)
        .with_alpha_variation(0.0);
    let mut r = renderer(config);

    r.reset();
    r.prepare_frame(&mut ctx, &clock).unwrap();
    assert_eq!(r.state(), LifecycleState::Ready);

    let buffer = r.quad_buffer().unwrap();
    assert_eq!(buffer.capacity(), 100);
    assert!(buffer.vertices().iter().all(|v| v.t == -1.0));

    // Born, but its clock has not started yet.
    r.on_spawn(5, &ParticleState { t: -1.0, ..Default::default() });
    let quad = r.quad_buffer().unwrap().read_slot(5).unwrap();
    for vertex in quad {
        assert_eq!(vertex.color, Rgba8::new(255, 0, 0, 255));
        assert_eq!(vertex.t, -1.0);
    }

    r.on_update(5, &particle(3.0, 4.0, 0.25));
    let quad = r.quad_buffer().unwrap().read_slot(5).unwrap();
    for (vertex, corner) in quad.iter().zip(CORNERS) {
        assert_eq!(vertex.color, Rgba8::new(255, 0, 0, 255));
        assert_eq!(vertex.t, 0.25);
        assert_eq!((vertex.x, vertex.y), (3.0, 4.0));
        assert_eq!([vertex.tx, vertex.ty], corner);
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_rebuild_never_exposes_stale_node() {
    let mut ctx = Recorder::new();
    let clock = ManualClock::new(0);
    let mut r = renderer(base_config(10));

    let first = r.prepare_frame(&mut ctx, &clock).unwrap().unwrap().generation();
    r.set_capacity(20);

    // Between the request and the next frame nothing is drawable.
    assert_eq!(r.state(), LifecycleState::Invalidated);
    assert!(r.draw_node().is_none());
    assert!(r.quad_buffer().is_none());
    assert!(!r.submit(&mut ctx, &FrameUniforms::default()));

    let node = r.prepare_frame(&mut ctx, &clock).unwrap().unwrap();
    assert_eq!(node.generation(), first + 1);
    assert_eq!(node.index_count(), 120);
    assert_eq!(r.quad_buffer().unwrap().capacity(), 20);
}

#[test]
fn test_rebuild_creates_fresh_resources() {
    let mut ctx = Recorder::new();
    let clock = ManualClock::new(0);
    let mut r = renderer(base_config(4));

    r.prepare_frame(&mut ctx, &clock).unwrap();
    r.reset();
    r.prepare_frame(&mut ctx, &clock).unwrap();

    assert_eq!(ctx.count(|op| matches!(op, Op::Geometry(_))), 2);
    assert_eq!(ctx.count(|op| matches!(op, Op::Texture(_))), 2);
    // Programs are shared across generations.
    assert_eq!(ctx.count(|op| matches!(op, Op::Compile(_))), 1);
}

#[test]
fn test_reset_before_first_build_is_harmless() {
    let mut ctx = Recorder::new();
    let mut r = renderer(base_config(4));
    r.reset();
    r.reset();
    assert_eq!(r.state(), LifecycleState::Empty);
    assert!(r.prepare_frame(&mut ctx, &ManualClock::new(0)).unwrap().is_some());
}

#[test]
fn test_failed_build_retries_every_frame() {
    let mut ctx = Recorder::new();
    let clock = ManualClock::new(0);
    let mut r = renderer(ParticleConfig::new().with_capacity(4));

    for _ in 0..3 {
        assert!(r.prepare_frame(&mut ctx, &clock).unwrap().is_none());
        assert_eq!(r.state(), LifecycleState::Empty);
    }
    assert!(matches!(
        r.last_build_error(),
        Some(BuildError::ImageLoadFailed(_))
    ));

    r.set_image(Some(TextureConfig::solid(0, 255, 0, 255).into()));
    assert!(r.prepare_frame(&mut ctx, &clock).unwrap().is_some());
}

#[test]
fn test_capacity_limit_boundary() {
    let mut ctx = Recorder::new();
    let clock = ManualClock::new(0);

    let mut r = renderer(base_config(16383));
    assert!(r.prepare_frame(&mut ctx, &clock).unwrap().is_some());

    r.set_capacity(16384);
    assert!(r.prepare_frame(&mut ctx, &clock).unwrap().is_none());
    assert!(matches!(
        r.last_build_error(),
        Some(BuildError::CapacityExceeded { capacity: 16384 })
    ));
}

#[test]
fn test_compile_failure_is_fatal() {
    let mut ctx = Recorder::new();
    ctx.reject_compiles = true;
    let mut r = renderer(base_config(4));

    let err = r.prepare_frame(&mut ctx, &ManualClock::new(0)).unwrap_err();
    assert!(matches!(
        err,
        RenderError::Shader(ShaderError::ShaderCompile { .. })
    ));
    assert_eq!(r.state(), LifecycleState::Empty);
}

#[test]
fn test_missing_shader_source_aborts_construction() {
    let store: std::collections::HashMap<String, Vec<u8>> = Default::default();
    let result = ParticleRenderer::<Recorder>::new(&store, base_config(4));
    assert!(matches!(
        result,
        Err(ShaderError::ShaderSourceMissing { .. })
    ));
}

#[test]
fn test_paused_clock_keeps_node_and_timestamp() {
    let mut ctx = Recorder::new();
    let mut clock = ManualClock::new(1500);
    let mut r = renderer(base_config(4));
    r.prepare_frame(&mut ctx, &clock).unwrap();
    assert_eq!(r.timestamp(), Some(1.5));

    clock.running = false;
    clock.advance(1000);
    let node = r.prepare_frame(&mut ctx, &clock).unwrap();
    assert!(node.is_some_and(|n| n.is_dirty()));
    assert_eq!(r.timestamp(), Some(1.5));
}

// ============================================================================
// Writes
// ============================================================================

#[test]
fn test_writes_before_build_are_dropped() {
    let mut ctx = Recorder::new();
    let mut r = renderer(base_config(8));

    r.on_spawn(2, &particle(1.0, 1.0, 0.5));
    r.on_update(2, &particle(1.0, 1.0, 0.5));
    r.prepare_frame(&mut ctx, &ManualClock::new(0)).unwrap();

    let quad = r.quad_buffer().unwrap().read_slot(2).unwrap();
    assert!(quad.iter().all(|v| v.t == -1.0));
}

#[test]
fn test_writes_while_invalidated_are_dropped() {
    let mut ctx = Recorder::new();
    let clock = ManualClock::new(0);
    let mut r = renderer(base_config(8));
    r.prepare_frame(&mut ctx, &clock).unwrap();

    r.reset();
    r.on_update(3, &particle(1.0, 1.0, 0.5));
    r.prepare_frame(&mut ctx, &clock).unwrap();

    let quad = r.quad_buffer().unwrap().read_slot(3).unwrap();
    assert!(quad.iter().all(|v| v.t == -1.0));
}

#[test]
fn test_update_keeps_spawn_color() {
    let mut ctx = Recorder::new();
    let mut r = renderer(base_config(8).with_color_variation(1.0));
    r.prepare_frame(&mut ctx, &ManualClock::new(0)).unwrap();

    r.on_spawn(1, &particle(0.0, 0.0, 0.0));
    let color = r.quad_buffer().unwrap().read_slot(1).unwrap()[0].color;
    for step in 1..10 {
        r.on_update(1, &particle(step as f32, 0.0, step as f32 / 10.0));
    }
    let quad = r.quad_buffer().unwrap().read_slot(1).unwrap();
    assert!(quad.iter().all(|v| v.color == color));
}

#[test]
fn test_default_additive_spawns_zero_alpha() {
    let mut ctx = Recorder::new();
    let mut r = renderer(base_config(2));
    r.prepare_frame(&mut ctx, &ManualClock::new(0)).unwrap();

    r.on_spawn(0, &particle(0.0, 0.0, 0.0));
    assert_eq!(r.quad_buffer().unwrap().read_slot(0).unwrap()[0].color.a, 0);
}

#[test]
fn test_seeded_renderers_agree() {
    let mut colors = Vec::new();
    for _ in 0..2 {
        let mut ctx = Recorder::new();
        let mut r = renderer(base_config(4).with_seed(99).with_color_variation(0.7));
        r.prepare_frame(&mut ctx, &ManualClock::new(0)).unwrap();
        for slot in 0..4 {
            r.on_spawn(slot, &particle(0.0, 0.0, 0.0));
        }
        let buffer = r.quad_buffer().unwrap();
        colors.push((0..4).map(|s| buffer.read_slot(s).unwrap()[0].color).collect::<Vec<_>>());
    }
    assert_eq!(colors[0], colors[1]);
}

// ============================================================================
// Submission
// ============================================================================

#[test]
fn test_one_dirty_edge_per_frame() {
    let mut ctx = Recorder::new();
    let clock = ManualClock::new(0);
    let mut r = renderer(base_config(50));
    r.prepare_frame(&mut ctx, &clock).unwrap();

    for slot in 0..50 {
        r.on_spawn(slot, &particle(0.0, 0.0, 0.0));
    }
    let node = r.draw_node_mut().unwrap();
    assert!(node.take_dirty());
    assert!(!node.take_dirty());

    r.prepare_frame(&mut ctx, &clock).unwrap();
    let node = r.draw_node_mut().unwrap();
    assert!(node.take_dirty());
    assert!(!node.take_dirty());
}

#[test]
fn test_submit_keeps_gpu_copy_in_sync() {
    let mut ctx = Recorder::new();
    let mut r = renderer(base_config(16));
    r.prepare_frame(&mut ctx, &ManualClock::new(0)).unwrap();
    r.set_system_offset(Vec2::new(100.0, 50.0));

    r.on_spawn(3, &particle(110.0, 60.0, 0.1));
    r.on_update(9, &particle(90.0, 40.0, 0.2));
    assert!(r.submit(&mut ctx, &FrameUniforms::default()));

    let Some(Op::Geometry(id)) = ctx.ops.iter().find(|op| matches!(op, Op::Geometry(_))).cloned()
    else {
        panic!("no geometry created");
    };
    assert_eq!(ctx.buffers[&id].as_slice(), r.quad_buffer().unwrap().vertices());
    assert_eq!(ctx.buffers[&id][12].x, 10.0);
    assert_eq!(ctx.buffers[&id][36].y, -10.0);
}

#[test]
fn test_submit_order_base() {
    let mut ctx = Recorder::new();
    let mut r = renderer(base_config(4));
    r.prepare_frame(&mut ctx, &ManualClock::new(3000)).unwrap();
    ctx.clear();

    r.submit(&mut ctx, &FrameUniforms::default());
    assert_eq!(
        ctx.ops,
        vec![
            Op::Use("particle"),
            Op::Active(TextureUnit::Unit0),
            Op::Bind(1),
            Op::Float("opacity", 1.0),
            Op::Float("timestamp", 3.0),
            Op::Matrix("transform"),
            Op::Draw {
                geometry: 2,
                indices: 24
            },
            Op::Active(TextureUnit::Unit0),
            Op::Unbind,
        ]
    );
}

#[test]
fn test_submit_order_color_table() {
    let mut ctx = Recorder::new();
    let table = TextureConfig::gradient(16, [255, 255, 0, 255], [255, 0, 0, 255]);
    let mut r = renderer(base_config(4).with_color_table(table));
    let node = r.prepare_frame(&mut ctx, &ManualClock::new(0)).unwrap().unwrap();
    assert_eq!(node.variant(), ShadingVariant::ColorTable);
    ctx.clear();

    r.submit(&mut ctx, &FrameUniforms::default());
    let unit1 = ctx
        .ops
        .iter()
        .position(|op| *op == Op::Active(TextureUnit::Unit1))
        .unwrap();
    let unit0 = ctx
        .ops
        .iter()
        .position(|op| *op == Op::Active(TextureUnit::Unit0))
        .unwrap();
    assert!(unit1 < unit0);
    assert_eq!(ctx.ops[unit1 + 1], Op::Bind(2));
    assert_eq!(ctx.ops[unit1 + 2], Op::Int("colortable", 1));

    // Unit 0 is active when the draw is issued.
    let draw = ctx
        .ops
        .iter()
        .position(|op| matches!(op, Op::Draw { .. }))
        .unwrap();
    let last_active = ctx.ops[..draw]
        .iter()
        .rev()
        .find_map(|op| match op {
            Op::Active(unit) => Some(*unit),
            _ => None,
        });
    assert_eq!(last_active, Some(TextureUnit::Unit0));
}

#[test]
fn test_color_table_file_missing_falls_back() {
    let mut ctx = Recorder::new();
    let mut r = renderer(base_config(4).with_color_table("does/not/exist.png"));
    let node = r.prepare_frame(&mut ctx, &ManualClock::new(0)).unwrap().unwrap();
    assert_eq!(node.variant(), ShadingVariant::Base);
    assert!(r.last_build_error().is_none());
}
