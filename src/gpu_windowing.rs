use crate::windowing::Window;

use image::{GrayImage, ImageBuffer};
use ndarray::ArrayView2;
use std::borrow::Cow;
use thiserror::Error;
use wgpu::{PollType, util::DeviceExt};

const WORKGROUP_SIZE: u32 = 64;
const MAX_DISPATCH: u32 = 65_535;

#[derive(Debug, Error)]
pub enum GpuError {
    #[error("No GPU adapter available: {0}")]
    NoAdapter(#[from] wgpu::RequestAdapterError),

    #[error("Failed to create GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("Failed to map GPU buffer: {0}")]
    BufferMap(#[from] wgpu::BufferAsyncError),

    #[error("Failed to wait for the GPU: {0}")]
    Poll(#[from] wgpu::PollError),

    #[error("GPU buffer mapping was cancelled")]
    Cancelled,

    #[error("Slice is empty")]
    EmptySlice,
}

pub struct WGPU {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl WGPU {
    /// Request a device and queue from the default adapter.
    ///
    /// # Errors
    ///
    /// Returns an error if no adapter or device is available.
    pub async fn request() -> Result<Self, GpuError> {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions::default())
            .await?;
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Windowing Device"),
                ..Default::default()
            })
            .await?;
        Ok(Self { device, queue })
    }
}

/// Window transform evaluated in a compute shader, one invocation per pixel.
pub struct GpuWindowing {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct Uniforms {
    center: f32,
    width: f32,
    pixel_count: u32,
    row_stride: u32,
}

impl GpuWindowing {
    pub fn new(wgpu: WGPU) -> Self {
        let WGPU { device, queue } = wgpu;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Window Shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(include_str!("shaders/window.wgsl"))),
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
            label: Some("Window Bind Group Layout"),
            entries: &[
                // Input intensities
                storage(0, true),
                // Output grey levels
                storage(1, false),
                // Uniforms
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
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Window Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Window Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        Self {
            device,
            queue,
            pipeline,
            bind_group_layout,
        }
    }

    /// Window a slice on the GPU. Matches [`Window::apply_value`] up to one
    /// grey level of rounding.
    ///
    /// # Errors
    ///
    /// Returns an error if the slice is empty or the result cannot be read
    /// back.
    pub async fn apply(
        &self,
        slice: &ArrayView2<'_, f32>,
        window: Window,
    ) -> Result<GrayImage, GpuError> {
        let (height, width) = slice.dim();
        let pixel_count = height * width;
        if pixel_count == 0 {
            return Err(GpuError::EmptySlice);
        }
        // Row-major copy regardless of the view's layout.
        let input: Vec<f32> = slice.iter().copied().collect();

        let groups = (pixel_count as u32).div_ceil(WORKGROUP_SIZE);
        let dispatch_x = groups.min(MAX_DISPATCH);
        let dispatch_y = groups.div_ceil(dispatch_x);

        let uniforms = Uniforms {
            center: window.center(),
            width: window.width(),
            pixel_count: pixel_count as u32,
            row_stride: dispatch_x * WORKGROUP_SIZE,
        };

        let input_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Input Buffer"),
                contents: bytemuck::cast_slice(&input),
                usage: wgpu::BufferUsages::STORAGE,
            });
        let uniform_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Uniform Buffer"),
                contents: bytemuck::bytes_of(&uniforms),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let output_size = (pixel_count * std::mem::size_of::<u32>()) as u64;
        let output_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Output Buffer"),
            size: output_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let staging_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Staging Buffer"),
            size: output_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Window Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: input_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: output_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: uniform_buffer.as_entire_binding(),
                },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Window Encoder"),
            });
        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Window Pass"),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(&self.pipeline);
            compute_pass.set_bind_group(0, &bind_group, &[]);
            compute_pass.dispatch_workgroups(dispatch_x, dispatch_y, 1);
        }
        encoder.copy_buffer_to_buffer(&output_buffer, 0, &staging_buffer, 0, output_size);
        self.queue.submit(Some(encoder.finish()));

        let buffer_slice = staging_buffer.slice(..);
        let (sender, receiver) = futures::channel::oneshot::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device.poll(PollType::Wait {
            submission_index: None,
            timeout: None,
        })?;
        receiver.await.map_err(|_| GpuError::Cancelled)??;

        let data = buffer_slice.get_mapped_range();
        let levels: &[u32] = bytemuck::cast_slice(&data);
        let pixels: Vec<u8> = levels.iter().map(|&v| v.min(255) as u8).collect();
        drop(data);
        staging_buffer.unmap();

        ImageBuffer::from_raw(width as u32, height as u32, pixels).ok_or(GpuError::EmptySlice)
    }
}
