//! wgpu implementation of [`GraphicsContext`].
//!
//! wgpu has no global binding state, so [`GpuContext`] keeps the state
//! machine on the CPU: the current program, the texture bound to each unit
//! and one uniform block that every `set_uniform_*` call writes into. A
//! draw copies that block into its own pooled uniform buffer and queues it;
//! the caller replays the queue into its own render pass with
//! [`GpuContext::encode`].
//!
//! Textures are uploaded premultiplied to match the blend state.
//!
//! ```ignore
//! let mut ctx = GpuContext::new(device, queue, surface_format);
//!
//! renderer.prepare_frame(&mut ctx, &time)?;
//! renderer.submit(&mut ctx, &frame);
//!
//! let mut pass = encoder.begin_render_pass(&pass_desc);
//! ctx.encode(&mut pass);
//! ```

use std::sync::{Arc, Weak};

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use wgpu::util::DeviceExt;

use crate::context::{GraphicsContext, ProgramSource, TextureUnit, UniformLocation};
use crate::error::ShaderError;
use crate::textures::TextureConfig;
use crate::vertex::ParticleVertex;

/// Uniform block shared by both shading variants. Mirrors `Uniforms` in the
/// WGSL sources.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct ParticleUniforms {
    transform: [[f32; 4]; 4],
    opacity: f32,
    timestamp: f32,
    colortable: i32,
    _padding: f32,
}

impl Default for ParticleUniforms {
    fn default() -> Self {
        Self {
            transform: Mat4::IDENTITY.to_cols_array_2d(),
            opacity: 1.0,
            timestamp: 0.0,
            colortable: 1,
            _padding: 0.0,
        }
    }
}

/// Byte offset of each uniform inside [`ParticleUniforms`]. Locations are
/// these offsets.
const UNIFORM_OFFSETS: [(&str, u32); 4] = [
    ("transform", 0),
    ("opacity", 64),
    ("timestamp", 68),
    ("colortable", 72),
];

/// A compiled particle pipeline.
pub struct GpuProgram {
    label: &'static str,
    pipeline: wgpu::RenderPipeline,
}

impl GpuProgram {
    pub fn label(&self) -> &'static str {
        self.label
    }
}

/// A sampled texture with its sampler.
pub struct GpuTexture {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
}

/// Vertex and index buffers of one quad buffer.
pub struct GpuGeometry {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
}

struct DrawCall {
    program: Arc<GpuProgram>,
    /// Index into the uniform slot pool.
    slot: usize,
    geometry: Arc<GpuGeometry>,
    index_count: u32,
}

/// Textures a bind group was built from.
///
/// Weak handles keep the allocations alive, so a freed texture's address
/// is never reused for a different one while the key exists.
struct BindingKey<T> {
    image: Weak<T>,
    table: Weak<T>,
}

impl<T> BindingKey<T> {
    fn new(image: &Arc<T>, table: &Arc<T>) -> Self {
        Self {
            image: Arc::downgrade(image),
            table: Arc::downgrade(table),
        }
    }

    fn matches(&self, image: &Arc<T>, table: &Arc<T>) -> bool {
        Weak::ptr_eq(&self.image, &Arc::downgrade(image))
            && Weak::ptr_eq(&self.table, &Arc::downgrade(table))
    }
}

/// Uniform buffer and bind group reused by the n-th draw between encodes.
struct UniformSlot {
    buffer: wgpu::Buffer,
    key: BindingKey<GpuTexture>,
    bind_group: wgpu::BindGroup,
}

/// Particle rendering state on top of a wgpu device.
pub struct GpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    format: wgpu::TextureFormat,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    uniforms: ParticleUniforms,
    program: Option<Arc<GpuProgram>>,
    active_unit: TextureUnit,
    units: [Option<Arc<GpuTexture>>; 2],
    /// Bound to units nothing else is bound to.
    fallback: Arc<GpuTexture>,
    slots: Vec<UniformSlot>,
    draws: Vec<DrawCall>,
}

impl GpuContext {
    /// Create a context rendering into targets of `format`.
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, format: wgpu::TextureFormat) -> Self {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Particle Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                texture_entry(1),
                sampler_entry(2),
                texture_entry(3),
                sampler_entry(4),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Particle Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let fallback = Arc::new(upload_texture(
            &device,
            &queue,
            &TextureConfig::solid(255, 255, 255, 255),
        ));

        Self {
            device,
            queue,
            format,
            bind_group_layout,
            pipeline_layout,
            uniforms: ParticleUniforms::default(),
            program: None,
            active_unit: TextureUnit::Unit0,
            units: [None, None],
            fallback,
            slots: Vec::new(),
            draws: Vec::new(),
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Number of draws queued since the last [`GpuContext::encode`].
    pub fn pending_draws(&self) -> usize {
        self.draws.len()
    }

    /// Replay queued draws into `pass` and clear the queue.
    pub fn encode(&mut self, pass: &mut wgpu::RenderPass<'_>) {
        for draw in self.draws.drain(..) {
            let slot = &self.slots[draw.slot];
            pass.set_pipeline(&draw.program.pipeline);
            pass.set_bind_group(0, &slot.bind_group, &[]);
            pass.set_vertex_buffer(0, draw.geometry.vertices.slice(..));
            pass.set_index_buffer(draw.geometry.indices.slice(..), wgpu::IndexFormat::Uint16);
            pass.draw_indexed(0..draw.index_count, 0, 0..1);
        }
    }

    fn write_uniform(&mut self, location: UniformLocation, bytes: &[u8]) {
        let start = location.0 as usize;
        let block = bytemuck::bytes_of_mut(&mut self.uniforms);
        match block.get_mut(start..start + bytes.len()) {
            Some(dst) => dst.copy_from_slice(bytes),
            None => log::warn!("Uniform write at offset {start} outside the uniform block"),
        }
    }

    fn unit_texture(&self, unit: TextureUnit) -> Arc<GpuTexture> {
        let bound = self.units[unit.index() as usize].as_ref();
        Arc::clone(bound.unwrap_or(&self.fallback))
    }
}

impl GraphicsContext for GpuContext {
    type Program = Arc<GpuProgram>;
    type Texture = Arc<GpuTexture>;
    type Geometry = Arc<GpuGeometry>;

    fn compile_program(&mut self, source: &ProgramSource) -> Result<Self::Program, ShaderError> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let vertex = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(source.label),
            source: wgpu::ShaderSource::Wgsl(source.vertex.as_str().into()),
        });
        let fragment = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(source.label),
            source: wgpu::ShaderSource::Wgsl(source.fragment.as_str().into()),
        });

        let pipeline = self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(source.label),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex,
                entry_point: Some("vs_main"),
                buffers: &[ParticleVertex::desc()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &fragment,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.format,
                    // Colors are premultiplied; alpha 0 adds light.
                    blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(ShaderError::ShaderCompile {
                label: source.label.to_string(),
                message: error.to_string(),
            });
        }

        log::debug!("Compiled particle program '{}'", source.label);
        Ok(Arc::new(GpuProgram {
            label: source.label,
            pipeline,
        }))
    }

    fn use_program(&mut self, program: &Self::Program) {
        self.program = Some(Arc::clone(program));
    }

    fn uniform_location(&self, _program: &Self::Program, name: &str) -> Option<UniformLocation> {
        UNIFORM_OFFSETS
            .iter()
            .find(|(uniform, _)| *uniform == name)
            .map(|&(_, offset)| UniformLocation(offset))
    }

    fn active_texture(&mut self, unit: TextureUnit) {
        self.active_unit = unit;
    }

    fn bind_texture(&mut self, texture: &Self::Texture) {
        self.units[self.active_unit.index() as usize] = Some(Arc::clone(texture));
    }

    fn unbind_texture(&mut self) {
        self.units[self.active_unit.index() as usize] = None;
    }

    fn set_uniform_i32(&mut self, location: UniformLocation, value: i32) {
        self.write_uniform(location, &value.to_ne_bytes());
    }

    fn set_uniform_f32(&mut self, location: UniformLocation, value: f32) {
        self.write_uniform(location, &value.to_ne_bytes());
    }

    fn set_uniform_mat4(&mut self, location: UniformLocation, value: &Mat4) {
        let cols = value.to_cols_array();
        self.write_uniform(location, bytemuck::cast_slice(&cols));
    }

    fn create_texture(&mut self, image: &TextureConfig) -> Self::Texture {
        Arc::new(upload_texture(&self.device, &self.queue, image))
    }

    fn create_geometry(&mut self, vertices: &[ParticleVertex], indices: &[u16]) -> Self::Geometry {
        let vertices = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle Vertex Buffer"),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        let indices = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle Index Buffer"),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Arc::new(GpuGeometry { vertices, indices })
    }

    fn upload_vertices(
        &mut self,
        geometry: &Self::Geometry,
        first_vertex: usize,
        vertices: &[ParticleVertex],
    ) {
        let offset = (first_vertex * ParticleVertex::STRIDE) as wgpu::BufferAddress;
        self.queue
            .write_buffer(&geometry.vertices, offset, bytemuck::cast_slice(vertices));
    }

    fn draw_indexed(&mut self, geometry: &Self::Geometry, index_count: u32) {
        let Some(program) = self.program.clone() else {
            log::warn!("Particle draw without a current program skipped");
            return;
        };

        let image = self.unit_texture(TextureUnit::Unit0);
        let table = self.unit_texture(TextureUnit::Unit1);
        let index = self.draws.len();

        // Each draw until the next encode needs its own buffer: writes to
        // one buffer before a submit collapse into the last one.
        if let Some(slot) = self.slots.get_mut(index) {
            self.queue
                .write_buffer(&slot.buffer, 0, bytemuck::bytes_of(&self.uniforms));
            if !slot.key.matches(&image, &table) {
                slot.bind_group = create_bind_group(
                    &self.device,
                    &self.bind_group_layout,
                    &slot.buffer,
                    &image,
                    &table,
                );
                slot.key = BindingKey::new(&image, &table);
            }
        } else {
            let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Particle Uniform Buffer"),
                contents: bytemuck::bytes_of(&self.uniforms),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
            let bind_group =
                create_bind_group(&self.device, &self.bind_group_layout, &buffer, &image, &table);
            self.slots.push(UniformSlot {
                buffer,
                key: BindingKey::new(&image, &table),
                bind_group,
            });
            log::debug!("Particle uniform pool grew to {} slots", self.slots.len());
        }

        self.draws.push(DrawCall {
            program,
            slot: index,
            geometry: Arc::clone(geometry),
            index_count,
        });
    }
}

fn create_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    uniforms: &wgpu::Buffer,
    image: &GpuTexture,
    table: &GpuTexture,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Particle Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniforms.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&image.view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(&image.sampler),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::TextureView(&table.view),
            },
            wgpu::BindGroupEntry {
                binding: 4,
                resource: wgpu::BindingResource::Sampler(&table.sampler),
            },
        ],
    })
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

fn upload_texture(device: &wgpu::Device, queue: &wgpu::Queue, image: &TextureConfig) -> GpuTexture {
    let empty;
    let image = if image.width == 0 || image.height == 0 {
        log::warn!("Empty texture image replaced by a transparent pixel");
        empty = TextureConfig::solid(0, 0, 0, 0);
        &empty
    } else {
        image
    };

    let size = wgpu::Extent3d {
        width: image.width,
        height: image.height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Particle Texture"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &image.premultiplied(),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(image.width * 4),
            rows_per_image: Some(image.height),
        },
        size,
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("Particle Sampler"),
        address_mode_u: image.address_mode.to_wgpu(),
        address_mode_v: image.address_mode.to_wgpu(),
        address_mode_w: image.address_mode.to_wgpu(),
        mag_filter: image.filter.to_wgpu(),
        min_filter: image.filter.to_wgpu(),
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    });

    GpuTexture {
        _texture: texture,
        view,
        sampler,
    }
}
