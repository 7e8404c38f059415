//! wgpu implementation of the render boundary.
//!
//! [`GpuRenderer`] owns one instance buffer of `capacity` [`InstanceRecord`]s,
//! allocated up front, and draws it as a single instanced quad batch. All
//! per-particle math happens in the vertex shader from [`shader`].

mod camera;
pub mod shader;

use std::sync::Arc;

use glam::Vec3;
use wgpu::util::DeviceExt;
use winit::window::Window;

pub use camera::Camera;
use shader::{render_shader, Uniforms};

use crate::error::GpuError;
use crate::render::{FrameParams, InstanceSink};
use crate::shape::{Motion, ShapeConstants};
use crate::stream::InstanceRecord;

const INSTANCE_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32, 1 => Float32];

/// How overlapping particles combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    /// Standard alpha blending.
    #[default]
    Alpha,
    /// Colors add up, so dense regions glow.
    Additive,
}

impl BlendMode {
    fn to_wgpu(self) -> wgpu::BlendState {
        match self {
            BlendMode::Alpha => wgpu::BlendState::ALPHA_BLENDING,
            BlendMode::Additive => wgpu::BlendState {
                color: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::SrcAlpha,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
                alpha: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
            },
        }
    }
}

/// Look-related settings fixed for the renderer's lifetime.
#[derive(Debug, Clone, Copy)]
pub struct RenderStyle {
    /// Colors and fade/shrink flags.
    pub constants: ShapeConstants,
    /// World-space emitter position.
    pub origin: Vec3,
    /// Blend mode.
    pub blend: BlendMode,
    /// Clear color.
    pub background: wgpu::Color,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            constants: ShapeConstants::default(),
            origin: Vec3::ZERO,
            blend: BlendMode::Alpha,
            background: wgpu::Color {
                r: 0.02,
                g: 0.02,
                b: 0.05,
                a: 1.0,
            },
        }
    }
}

/// Instanced particle renderer bound to one window surface.
pub struct GpuRenderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    render_pipeline: wgpu::RenderPipeline,
    instance_buffer: wgpu::Buffer,
    instance_capacity: u32,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    style: RenderStyle,
    pub camera: Camera,
}

impl GpuRenderer {
    /// Set up the device, surface and pipeline for `motion`, with room for
    /// `capacity` instances.
    pub async fn new(
        window: Arc<Window>,
        capacity: u32,
        motion: &Motion,
        style: RenderStyle,
    ) -> Result<Self, GpuError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;

        log::info!("using adapter: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                trace: Default::default(),
                experimental_features: Default::default(),
            })
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let (surface_format, alpha_mode) =
            surface_settings(&surface_caps.formats, &surface_caps.alpha_modes)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let instance_buffer = create_instance_buffer(&device, capacity);

        let camera = Camera::looking_at(style.origin);
        let uniforms = build_uniforms(&camera, &config, &style, 0.0, 1.0, style.constants.particle_size);
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Uniform Buffer"),
            contents: bytemuck::bytes_of(&uniforms),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Uniform Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Uniform Bind Group"),
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let shader_src = render_shader(motion);
        let render_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Particle Shader"),
            source: wgpu::ShaderSource::Wgsl(shader_src.into()),
        });

        let render_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Render Pipeline Layout"),
                bind_group_layouts: &[&uniform_bind_group_layout],
                push_constant_ranges: &[],
            });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Render Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &render_shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: InstanceRecord::STRIDE as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Instance,
                    attributes: &INSTANCE_ATTRIBUTES,
                }],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &render_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(style.blend.to_wgpu()),
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

        log::info!(
            "renderer ready: {}x{}, {} instance slots",
            config.width,
            config.height,
            capacity
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            render_pipeline,
            instance_buffer,
            instance_capacity: capacity,
            uniform_buffer,
            uniform_bind_group,
            style,
            camera,
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    /// Reconfigure the surface at its current size, after it was lost or outdated.
    pub fn recover_surface(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }

    /// Number of instances the GPU buffer holds.
    pub fn instance_capacity(&self) -> u32 {
        self.instance_capacity
    }
}

impl InstanceSink for GpuRenderer {
    type Error = wgpu::SurfaceError;

    fn upload(&mut self, records: &[InstanceRecord]) -> Result<(), Self::Error> {
        let needed = records.len() as u32;
        if needed != self.instance_capacity {
            // Only happens when the ring was reconfigured.
            log::debug!("reallocating instance buffer: {} -> {}", self.instance_capacity, needed);
            self.instance_buffer = create_instance_buffer(&self.device, needed);
            self.instance_capacity = needed;
        }
        self.queue
            .write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(records));
        Ok(())
    }

    fn draw(&mut self, frame: &FrameParams) -> Result<(), Self::Error> {
        let uniforms = build_uniforms(
            &self.camera,
            &self.config,
            &self.style,
            frame.time,
            frame.life_duration,
            frame.particle_size,
        );
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Particle Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.style.background),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            // instance_index stays the slot index, so the tail is drawn in place.
            let instances = frame.instances();
            let end = instances.end.min(self.instance_capacity);
            render_pass.set_pipeline(&self.render_pipeline);
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.instance_buffer.slice(..));
            render_pass.draw(0..6, instances.start.min(end)..end);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

/// Prefer an sRGB format; take the first alpha mode.
fn surface_settings(
    formats: &[wgpu::TextureFormat],
    alpha_modes: &[wgpu::CompositeAlphaMode],
) -> Result<(wgpu::TextureFormat, wgpu::CompositeAlphaMode), GpuError> {
    let format = formats
        .iter()
        .find(|f| f.is_srgb())
        .or_else(|| formats.first())
        .copied()
        .ok_or(GpuError::IncompatibleSurface)?;
    let alpha_mode = alpha_modes
        .first()
        .copied()
        .ok_or(GpuError::IncompatibleSurface)?;
    Ok((format, alpha_mode))
}

fn create_instance_buffer(device: &wgpu::Device, capacity: u32) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Instance Buffer"),
        size: (capacity.max(1) as usize * InstanceRecord::STRIDE) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn build_uniforms(
    camera: &Camera,
    config: &wgpu::SurfaceConfiguration,
    style: &RenderStyle,
    time: f32,
    life_duration: f32,
    particle_size: f32,
) -> Uniforms {
    let aspect = config.width as f32 / config.height as f32;
    let constants = &style.constants;
    Uniforms {
        view_proj: camera.view_proj(aspect).to_cols_array_2d(),
        start_color: constants.start_color.extend(1.0).to_array(),
        end_color: constants.end_color.extend(1.0).to_array(),
        origin: style.origin.extend(1.0).to_array(),
        time,
        life_duration,
        particle_size,
        fade_out: constants.fade_out as u32,
        shrink_out: constants.shrink_out as u32,
        _padding: [0; 3],
    }
}
