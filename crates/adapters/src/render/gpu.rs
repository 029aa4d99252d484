use std::sync::mpsc;

use bytemuck::{Pod, Zeroable};
use photo_lab_application::ApplicationError;
use photo_lab_domain::{gaussian_kernel, Bitmap, Effect, EffectStage, Rgba, WHITE_BALANCE_GAIN};
use tracing::trace;
use wgpu::util::DeviceExt;

use super::StageExecutor;

const WORKGROUP_EDGE: u32 = 8;
const PIXEL_BYTES: u64 = std::mem::size_of::<Rgba>() as u64;

const SATURATION_FLAG: u32 = 1;
const CONTRAST_FLAG: u32 = 2;
const EXPOSURE_FLAG: u32 = 4;
const WHITE_BALANCE_FLAG: u32 = 8;

const STAGE_SHADER: &str = r#"
struct Params {
    width: u32,
    height: u32,
    radius: u32,
    flags: u32,
    saturation: f32,
    contrast: f32,
    exposure: f32,
    temperature: f32,
    tint: f32,
    wb_gain: f32,
    pad0: f32,
    pad1: f32,
}

@group(0) @binding(0)
var<storage, read> input_pixels: array<vec4<f32>>;

@group(0) @binding(1)
var<storage, read_write> output_pixels: array<vec4<f32>>;

@group(0) @binding(2)
var<uniform> params: Params;

@group(0) @binding(3)
var<storage, read> weights: array<f32>;

const LUMA = vec3<f32>(0.2126, 0.7152, 0.0722);

fn saturate_rgb(rgb: vec3<f32>) -> vec3<f32> {
    let luma = vec3<f32>(dot(rgb, LUMA));
    return clamp(luma + (rgb - luma) * params.saturation, vec3<f32>(0.0), vec3<f32>(1.0));
}

@compute @workgroup_size(8, 8)
fn color_main(@builtin(global_invocation_id) gid: vec3<u32>) {
    if (gid.x >= params.width || gid.y >= params.height) {
        return;
    }
    let i = gid.y * params.width + gid.x;
    let pixel = input_pixels[i];
    var rgb = pixel.rgb;

    if ((params.flags & 1u) != 0u) {
        rgb = saturate_rgb(rgb);
    }
    if ((params.flags & 2u) != 0u) {
        let factor = exp2(2.0 * params.contrast);
        let centred = (rgb - vec3<f32>(0.5)) * factor + vec3<f32>(0.5);
        rgb = clamp(centred, vec3<f32>(0.0), vec3<f32>(1.0));
    }
    if ((params.flags & 4u) != 0u) {
        rgb = clamp(rgb * exp2(params.exposure), vec3<f32>(0.0), vec3<f32>(1.0));
    }
    if ((params.flags & 8u) != 0u) {
        let gains = vec3<f32>(
            1.0 + params.wb_gain * params.temperature,
            1.0 - params.wb_gain * params.tint,
            1.0 - params.wb_gain * params.temperature
        );
        rgb = clamp(rgb * gains, vec3<f32>(0.0), vec3<f32>(1.0));
    }

    output_pixels[i] = vec4<f32>(rgb, pixel.a);
}

@compute @workgroup_size(8, 8)
fn blur_horizontal(@builtin(global_invocation_id) gid: vec3<u32>) {
    if (gid.x >= params.width || gid.y >= params.height) {
        return;
    }
    let radius = i32(params.radius);
    let last = i32(params.width) - 1;
    let row = gid.y * params.width;
    var acc = vec4<f32>(0.0);
    for (var k = 0; k <= 2 * radius; k = k + 1) {
        let sx = clamp(i32(gid.x) + k - radius, 0, last);
        acc = acc + weights[k] * input_pixels[row + u32(sx)];
    }
    output_pixels[row + gid.x] = acc;
}

@compute @workgroup_size(8, 8)
fn blur_vertical(@builtin(global_invocation_id) gid: vec3<u32>) {
    if (gid.x >= params.width || gid.y >= params.height) {
        return;
    }
    let radius = i32(params.radius);
    let last = i32(params.height) - 1;
    var acc = vec4<f32>(0.0);
    for (var k = 0; k <= 2 * radius; k = k + 1) {
        let sy = clamp(i32(gid.y) + k - radius, 0, last);
        acc = acc + weights[k] * input_pixels[u32(sy) * params.width + gid.x];
    }
    output_pixels[gid.y * params.width + gid.x] = clamp(acc, vec4<f32>(0.0), vec4<f32>(1.0));
}
"#;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
struct GpuParams {
    width: u32,
    height: u32,
    radius: u32,
    flags: u32,
    saturation: f32,
    contrast: f32,
    exposure: f32,
    temperature: f32,
    tint: f32,
    wb_gain: f32,
    _padding: [f32; 2],
}

/// Uniforms and blur weights for one pass over `stages`.
fn pack_stages(
    stages: &[EffectStage],
    pixel_scale: f32,
) -> Result<(GpuParams, Vec<f32>), ApplicationError> {
    let mut params = GpuParams {
        saturation: 1.0,
        wb_gain: WHITE_BALANCE_GAIN,
        ..GpuParams::default()
    };
    let mut weights = vec![1.0];
    // Stages must arrive in the order the shader applies them.
    let mut last_rank = 0;

    for stage in stages {
        let effect = stage.effect().effective();
        let rank = match effect {
            Effect::Saturation { .. } => 1,
            Effect::Contrast { .. } => 2,
            Effect::Exposure { .. } => 3,
            Effect::TemperatureAndTint { .. } => 4,
            Effect::GaussianBlur { .. } => 5,
        };
        if rank <= last_rank {
            return Err(ApplicationError::Backend(format!(
                "stage {} is out of order for the gpu pipeline",
                stage.name()
            )));
        }
        last_rank = rank;
        if effect.is_identity() {
            continue;
        }

        match effect {
            Effect::Saturation { saturation } => {
                params.flags |= SATURATION_FLAG;
                params.saturation = saturation;
            }
            Effect::Contrast { contrast } => {
                params.flags |= CONTRAST_FLAG;
                params.contrast = contrast;
            }
            Effect::Exposure { exposure } => {
                params.flags |= EXPOSURE_FLAG;
                params.exposure = exposure;
            }
            Effect::TemperatureAndTint { temperature, tint } => {
                params.flags |= WHITE_BALANCE_FLAG;
                params.temperature = temperature;
                params.tint = tint;
            }
            Effect::GaussianBlur { blur_amount } => {
                weights = gaussian_kernel(blur_amount * pixel_scale);
                params.radius = (weights.len() / 2) as u32;
            }
        }
    }
    Ok((params, weights))
}

/// Runs chain stages as wgpu compute passes: one colour pass, then a
/// horizontal and a vertical blur pass when the blur is active.
pub struct WgpuStageExecutor {
    device: wgpu::Device,
    queue: wgpu::Queue,
    bind_group_layout: wgpu::BindGroupLayout,
    color_pipeline: wgpu::ComputePipeline,
    blur_horizontal_pipeline: wgpu::ComputePipeline,
    blur_vertical_pipeline: wgpu::ComputePipeline,
}

impl WgpuStageExecutor {
    pub fn new() -> Result<Self, ApplicationError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| ApplicationError::Backend("no suitable wgpu adapter found".to_string()))?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("photo-lab-stage-device"),
                required_features: wgpu::Features::empty(),
                required_limits: adapter.limits(),
            },
            None,
        ))
        .map_err(|error| {
            ApplicationError::Backend(format!("failed to create wgpu device: {error}"))
        })?;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("photo-lab-stage-shader"),
            source: wgpu::ShaderSource::Wgsl(STAGE_SHADER.into()),
        });

        let storage = |binding, read_only| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("photo-lab-stage-bind-group-layout"),
            entries: &[
                storage(0, true),
                storage(1, false),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                storage(3, true),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("photo-lab-stage-pipeline-layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let pipeline = |entry_point| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(entry_point),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point,
            })
        };
        let color_pipeline = pipeline("color_main");
        let blur_horizontal_pipeline = pipeline("blur_horizontal");
        let blur_vertical_pipeline = pipeline("blur_vertical");

        Ok(Self {
            device,
            queue,
            bind_group_layout,
            color_pipeline,
            blur_horizontal_pipeline,
            blur_vertical_pipeline,
        })
    }

    fn check_limits(&self, width: u32, height: u32) -> Result<(u32, u32), ApplicationError> {
        let limits = self.device.limits();
        let bytes = u64::from(width) * u64::from(height) * PIXEL_BYTES;
        let max_binding = u64::from(limits.max_storage_buffer_binding_size);
        if bytes > max_binding || bytes > limits.max_buffer_size {
            return Err(ApplicationError::RenderTarget(format!(
                "{width}x{height} exceeds the gpu buffer limit"
            )));
        }
        let groups_x = width.div_ceil(WORKGROUP_EDGE);
        let groups_y = height.div_ceil(WORKGROUP_EDGE);
        let max_groups = limits.max_compute_workgroups_per_dimension;
        if groups_x > max_groups || groups_y > max_groups {
            return Err(ApplicationError::RenderTarget(format!(
                "{width}x{height} exceeds the gpu dispatch limit"
            )));
        }
        Ok((groups_x, groups_y))
    }

    fn bind_group(
        &self,
        input: &wgpu::Buffer,
        output: &wgpu::Buffer,
        params: &wgpu::Buffer,
        weights: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("photo-lab-stage-bind-group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: input.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: output.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: params.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: weights.as_entire_binding(),
                },
            ],
        })
    }
}

impl StageExecutor for WgpuStageExecutor {
    fn name(&self) -> &'static str {
        "wgpu"
    }

    fn execute(
        &self,
        stages: &[EffectStage],
        source: &Bitmap,
        pixel_scale: f32,
    ) -> Result<Bitmap, ApplicationError> {
        let (width, height) = (source.width(), source.height());
        let (groups_x, groups_y) = self.check_limits(width, height)?;
        let (mut params, weights) = pack_stages(stages, pixel_scale)?;
        params.width = width;
        params.height = height;
        let blur_active = params.radius > 0;
        let pixel_bytes = u64::from(width) * u64::from(height) * PIXEL_BYTES;

        let ping = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("photo-lab-stage-ping"),
                contents: bytemuck::cast_slice(source.pixels()),
                usage: wgpu::BufferUsages::STORAGE,
            });
        let pong = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("photo-lab-stage-pong"),
            size: pixel_bytes,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let params_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("photo-lab-stage-params"),
                contents: bytemuck::bytes_of(&params),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let weights_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("photo-lab-stage-weights"),
                contents: bytemuck::cast_slice(&weights),
                usage: wgpu::BufferUsages::STORAGE,
            });
        let readback = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("photo-lab-stage-readback"),
            size: pixel_bytes,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let forward = self.bind_group(&ping, &pong, &params_buffer, &weights_buffer);
        let backward = self.bind_group(&pong, &ping, &params_buffer, &weights_buffer);
        let mut passes = vec![(&self.color_pipeline, &forward)];
        if blur_active {
            passes.push((&self.blur_horizontal_pipeline, &backward));
            passes.push((&self.blur_vertical_pipeline, &forward));
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("photo-lab-stage-encoder"),
            });
        for (pipeline, bind_group) in passes {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("photo-lab-stage-pass"),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(pipeline);
            compute_pass.set_bind_group(0, bind_group, &[]);
            compute_pass.dispatch_workgroups(groups_x, groups_y, 1);
        }
        encoder.copy_buffer_to_buffer(&pong, 0, &readback, 0, pixel_bytes);
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = readback.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|error| ApplicationError::Backend(format!("gpu map channel failed: {error}")))?
            .map_err(|error| {
                ApplicationError::Backend(format!("gpu readback map failed: {error}"))
            })?;

        let data = slice.get_mapped_range();
        let pixels: Vec<Rgba> = bytemuck::cast_slice(&data).to_vec();
        drop(data);
        readback.unmap();
        trace!(width, height, blur_active, "gpu stages executed");

        Ok(Bitmap::new(source.size(), pixels)?)
    }
}
