//! wgpu compute backend.
//!
//! Owns a `wgpu::Device`/`wgpu::Queue` pair and maps the [`ComputeDevice`]
//! handle tables onto real GPU objects. Kernels are compiled to compute
//! pipelines up front; each submitted pass builds one bind group, encodes its
//! dispatches, and pushes a single command buffer to the queue.
//!
//! ## Usage
//! ```ignore
//! let mut device = WgpuDevice::new()?; // picks the default adapter
//! let buffer = device.create_storage_buffer("indices", bytes)?;
//! ```
//!
//! Validation errors are captured through wgpu error scopes and reported as
//! [`Error::ResourceCreation`] instead of reaching the uncaptured-error
//! handler.

use wgpu::util::DeviceExt;

use super::{BufferId, Compute, ComputeDevice, KernelDesc, KernelId};
use crate::util::{Error, Result};

struct GpuBuffer {
    label: String,
    buffer: wgpu::Buffer,
    size: u64,
}

struct GpuKernel {
    label: String,
    pipeline: wgpu::ComputePipeline,
    layout: wgpu::BindGroupLayout,
    uniforms: u32,
    storages: u32,
    workgroup_size: u32,
}

/// [`ComputeDevice`] backed by a real wgpu device.
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    adapter_name: String,
    buffers: Vec<Option<GpuBuffer>>,
    kernels: Vec<Option<GpuKernel>>,
}

impl WgpuDevice {
    /// Acquire the default high-performance adapter and create a device on
    /// it. Fails with a resource error when the host has no usable adapter.
    pub fn new() -> Result<Self> {
        let instance = wgpu::Instance::default();
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            ..Default::default()
        }))
        .map_err(|e| Error::resource(format!("no compute adapter available: {e}")))?;

        let info = adapter.get_info();
        tracing::info!(adapter = %info.name, backend = ?info.backend, "acquired compute adapter");

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("swarmgraph compute device"),
            ..Default::default()
        }))
        .map_err(|e| Error::resource(format!("compute device request failed: {e}")))?;

        Ok(Self::from_parts(device, queue, info.name))
    }

    /// Wrap an existing device/queue pair, for hosts that already own one
    /// (a windowed renderer sharing its device with the swarm).
    pub fn from_parts(device: wgpu::Device, queue: wgpu::Queue, adapter_name: String) -> Self {
        Self {
            device,
            queue,
            adapter_name,
            buffers: Vec::new(),
            kernels: Vec::new(),
        }
    }

    fn buffer(&self, id: BufferId) -> Option<&GpuBuffer> {
        self.buffers.get(id.0 as usize)?.as_ref()
    }

    fn kernel(&self, id: KernelId) -> Option<&GpuKernel> {
        self.kernels.get(id.0 as usize)?.as_ref()
    }

    /// Drain this device's error scope, mapping any captured validation
    /// error to a resource error tagged with `what`.
    fn pop_scope(&self, what: &str) -> Result<()> {
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(err) => Err(Error::resource(format!("{what}: {err}"))),
            None => Ok(()),
        }
    }
}

impl ComputeDevice for WgpuDevice {
    fn name(&self) -> &str {
        &self.adapter_name
    }

    fn create_storage_buffer(&mut self, label: &str, contents: &[u8]) -> Result<BufferId> {
        if contents.is_empty() {
            return Err(Error::resource(format!("buffer '{label}': empty contents")));
        }
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        });
        self.pop_scope(&format!("buffer '{label}'"))?;

        let id = BufferId(self.buffers.len() as u32);
        self.buffers.push(Some(GpuBuffer {
            label: label.to_string(),
            buffer,
            size: contents.len() as u64,
        }));
        Ok(id)
    }

    fn write_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]) -> Result<()> {
        let slot = self
            .buffer(buffer)
            .ok_or_else(|| Error::resource(format!("write to dead buffer {:?}", buffer)))?;
        if offset + data.len() as u64 > slot.size {
            return Err(Error::resource(format!(
                "write of {}..{} past end of buffer '{}' ({} bytes)",
                offset,
                offset + data.len() as u64,
                slot.label,
                slot.size
            )));
        }
        self.queue.write_buffer(&slot.buffer, offset, data);
        Ok(())
    }

    fn destroy_buffer(&mut self, buffer: BufferId) {
        if let Some(slot) = self.buffers.get_mut(buffer.0 as usize) {
            if let Some(gpu) = slot.take() {
                gpu.buffer.destroy();
            }
        }
    }

    fn create_kernel(&mut self, desc: &KernelDesc<'_>) -> Result<KernelId> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(desc.label),
            source: wgpu::ShaderSource::Wgsl(desc.source.into()),
        });

        // Uniform blocks first, storage buffers after, per the KernelDesc
        // binding convention.
        let mut entries = Vec::with_capacity((desc.uniforms + desc.storages) as usize);
        for binding in 0..desc.uniforms {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            });
        }
        for slot in 0..desc.storages {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: desc.uniforms + slot,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: false },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            });
        }

        let layout = self
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(desc.label),
                entries: &entries,
            });
        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(desc.label),
                bind_group_layouts: &[&layout],
                push_constant_ranges: &[],
            });
        let pipeline = self
            .device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(desc.label),
                layout: Some(&pipeline_layout),
                module: &module,
                entry_point: Some(desc.entry_point),
                compilation_options: Default::default(),
                cache: None,
            });

        self.pop_scope(&format!("kernel '{}'", desc.label))?;

        let id = KernelId(self.kernels.len() as u32);
        self.kernels.push(Some(GpuKernel {
            label: desc.label.to_string(),
            pipeline,
            layout,
            uniforms: desc.uniforms,
            storages: desc.storages,
            workgroup_size: desc.workgroup_size,
        }));
        Ok(id)
    }

    fn destroy_kernel(&mut self, kernel: KernelId) {
        if let Some(slot) = self.kernels.get_mut(kernel.0 as usize) {
            *slot = None;
        }
    }

    fn begin_compute(&mut self) -> Box<dyn Compute + '_> {
        Box::new(WgpuCompute {
            device: self,
            kernel: None,
            uniforms: Vec::new(),
            storages: Vec::new(),
            pending: Vec::new(),
        })
    }

    fn live_buffers(&self) -> usize {
        self.buffers.iter().flatten().count()
    }

    fn live_kernels(&self) -> usize {
        self.kernels.iter().flatten().count()
    }
}

struct WgpuCompute<'a> {
    device: &'a mut WgpuDevice,
    kernel: Option<KernelId>,
    uniforms: Vec<(u32, Vec<u8>)>,
    storages: Vec<(u32, BufferId)>,
    pending: Vec<u32>,
}

impl Compute for WgpuCompute<'_> {
    fn set_kernel(&mut self, kernel: KernelId) {
        self.kernel = Some(kernel);
    }

    fn set_uniform(&mut self, slot: u32, data: &[u8]) {
        self.uniforms.retain(|(s, _)| *s != slot);
        self.uniforms.push((slot, data.to_vec()));
        self.uniforms.sort_by_key(|(s, _)| *s);
    }

    fn set_storage_buffer(&mut self, slot: u32, buffer: BufferId) {
        self.storages.retain(|(s, _)| *s != slot);
        self.storages.push((slot, buffer));
        self.storages.sort_by_key(|(s, _)| *s);
    }

    fn dispatch(&mut self, invocations: u32) {
        self.pending.push(invocations);
    }

    fn barrier(&mut self, _buffer: BufferId) {
        // wgpu inserts storage barriers between dispatches on the same
        // resource; the call marks the sync point, nothing to encode.
    }

    fn submit(self: Box<Self>) -> Result<()> {
        let kernel_id = self
            .kernel
            .ok_or_else(|| Error::resource("compute pass submitted without a kernel"))?;
        let kernel = self
            .device
            .kernel(kernel_id)
            .ok_or_else(|| Error::resource(format!("dispatch with dead kernel {:?}", kernel_id)))?;

        if self.storages.len() as u32 != kernel.storages {
            return Err(Error::resource(format!(
                "kernel '{}': {} storage bindings set, {} declared",
                kernel.label,
                self.storages.len(),
                kernel.storages
            )));
        }

        let device = &self.device.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        // Uniform data is tiny (one parameter block per pass), so a fresh
        // init buffer per submit is cheaper than a persistent ring.
        let uniform_buffers: Vec<(u32, wgpu::Buffer)> = self
            .uniforms
            .iter()
            .map(|(slot, bytes)| {
                let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("pass uniforms"),
                    contents: bytes,
                    usage: wgpu::BufferUsages::UNIFORM,
                });
                (*slot, buffer)
            })
            .collect();

        let mut entries = Vec::with_capacity(self.uniforms.len() + self.storages.len());
        for (slot, buffer) in &uniform_buffers {
            entries.push(wgpu::BindGroupEntry {
                binding: *slot,
                resource: buffer.as_entire_binding(),
            });
        }
        for (slot, id) in &self.storages {
            let gpu = self.device.buffer(*id).ok_or_else(|| {
                Error::resource(format!(
                    "kernel '{}': storage slot {} bound to dead buffer {:?}",
                    kernel.label, slot, id
                ))
            })?;
            entries.push(wgpu::BindGroupEntry {
                binding: kernel.uniforms + slot,
                resource: gpu.buffer.as_entire_binding(),
            });
        }

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&kernel.label),
            layout: &kernel.layout,
            entries: &entries,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some(&kernel.label),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(&kernel.label),
                timestamp_writes: None,
            });
            pass.set_pipeline(&kernel.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            for invocations in &self.pending {
                pass.dispatch_workgroups(invocations.div_ceil(kernel.workgroup_size), 1, 1);
            }
        }
        self.device.queue.submit(Some(encoder.finish()));

        self.device
            .pop_scope(&format!("compute pass '{}'", kernel.label))
    }
}
