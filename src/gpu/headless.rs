//! Validating in-memory compute backend.
//!
//! No GPU work happens here: buffers live in host memory, kernels are
//! validated descriptors, and every submitted dispatch is recorded with its
//! full binding state. Hosts without a GPU can still run the frame loop
//! against it, and suites use the records plus [`DeviceLimits`] to observe
//! binding behavior and inject resource failures.

use super::{BufferId, Compute, ComputeDevice, KernelDesc, KernelId};
use crate::util::{Error, Result};

/// Resource budget for a [`HeadlessDevice`].
#[derive(Debug, Clone, Copy)]
pub struct DeviceLimits {
    /// Maximum simultaneously live buffers.
    pub max_buffers: usize,
    /// Maximum simultaneously live kernels.
    pub max_kernels: usize,
    /// Maximum size of one buffer in bytes.
    pub max_buffer_bytes: u64,
}

impl Default for DeviceLimits {
    fn default() -> Self {
        Self {
            max_buffers: usize::MAX,
            max_kernels: usize::MAX,
            max_buffer_bytes: u64::MAX,
        }
    }
}

/// One recorded dispatch with the binding state it was submitted under.
#[derive(Debug, Clone)]
pub struct DispatchRecord {
    pub kernel: KernelId,
    /// Uniform slot → bytes, in slot order.
    pub uniforms: Vec<(u32, Vec<u8>)>,
    /// Storage slot → buffer, in slot order.
    pub storages: Vec<(u32, BufferId)>,
    /// Invocations requested by the caller.
    pub invocations: u32,
    /// Workgroups actually launched (invocations rounded up).
    pub workgroups: u32,
    /// Buffers the pass issued barriers on.
    pub barriers: Vec<BufferId>,
}

#[derive(Debug)]
struct HeadlessBuffer {
    label: String,
    data: Vec<u8>,
}

#[derive(Debug)]
struct HeadlessKernel {
    label: String,
    uniforms: u32,
    storages: u32,
    workgroup_size: u32,
}

/// In-memory [`ComputeDevice`]. Handle tables are tombstoned so destroyed
/// handles are never reissued.
#[derive(Debug, Default)]
pub struct HeadlessDevice {
    buffers: Vec<Option<HeadlessBuffer>>,
    kernels: Vec<Option<HeadlessKernel>>,
    limits: DeviceLimits,
    dispatches: Vec<DispatchRecord>,
    submits: u64,
}

impl HeadlessDevice {
    /// Device with unlimited resources.
    pub fn new() -> Self {
        Self::default()
    }

    /// Device with a fixed resource budget.
    pub fn with_limits(limits: DeviceLimits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    /// Replace the resource budget; existing resources are untouched.
    pub fn set_limits(&mut self, limits: DeviceLimits) {
        self.limits = limits;
    }

    /// Contents of a live buffer.
    pub fn buffer_bytes(&self, id: BufferId) -> Option<&[u8]> {
        self.buffers
            .get(id.0 as usize)?
            .as_ref()
            .map(|b| b.data.as_slice())
    }

    /// Label of a live buffer.
    pub fn buffer_label(&self, id: BufferId) -> Option<&str> {
        self.buffers
            .get(id.0 as usize)?
            .as_ref()
            .map(|b| b.label.as_str())
    }

    /// All dispatches submitted so far, oldest first.
    pub fn dispatches(&self) -> &[DispatchRecord] {
        &self.dispatches
    }

    /// Most recent dispatch, if any.
    pub fn last_dispatch(&self) -> Option<&DispatchRecord> {
        self.dispatches.last()
    }

    /// Number of submitted passes.
    pub fn submits(&self) -> u64 {
        self.submits
    }

    fn kernel(&self, id: KernelId) -> Option<&HeadlessKernel> {
        self.kernels.get(id.0 as usize)?.as_ref()
    }
}

impl ComputeDevice for HeadlessDevice {
    fn name(&self) -> &str {
        "headless"
    }

    fn create_storage_buffer(&mut self, label: &str, contents: &[u8]) -> Result<BufferId> {
        if self.live_buffers() >= self.limits.max_buffers {
            return Err(Error::resource(format!(
                "buffer budget exhausted ({} live, limit {})",
                self.live_buffers(),
                self.limits.max_buffers
            )));
        }
        if contents.len() as u64 > self.limits.max_buffer_bytes {
            return Err(Error::resource(format!(
                "buffer '{}' of {} bytes exceeds limit of {} bytes",
                label,
                contents.len(),
                self.limits.max_buffer_bytes
            )));
        }
        let id = BufferId(self.buffers.len() as u32);
        self.buffers.push(Some(HeadlessBuffer {
            label: label.to_string(),
            data: contents.to_vec(),
        }));
        Ok(id)
    }

    fn write_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]) -> Result<()> {
        let slot = self
            .buffers
            .get_mut(buffer.0 as usize)
            .and_then(Option::as_mut)
            .ok_or_else(|| Error::resource(format!("write to dead buffer {:?}", buffer)))?;
        let start = offset as usize;
        let end = start + data.len();
        if end > slot.data.len() {
            return Err(Error::resource(format!(
                "write of {}..{} past end of buffer '{}' ({} bytes)",
                start,
                end,
                slot.label,
                slot.data.len()
            )));
        }
        slot.data[start..end].copy_from_slice(data);
        Ok(())
    }

    fn destroy_buffer(&mut self, buffer: BufferId) {
        if let Some(slot) = self.buffers.get_mut(buffer.0 as usize) {
            *slot = None;
        }
    }

    fn create_kernel(&mut self, desc: &KernelDesc<'_>) -> Result<KernelId> {
        if self.live_kernels() >= self.limits.max_kernels {
            return Err(Error::resource(format!(
                "kernel budget exhausted ({} live, limit {})",
                self.live_kernels(),
                self.limits.max_kernels
            )));
        }
        if desc.source.trim().is_empty() {
            return Err(Error::resource(format!(
                "kernel '{}': empty shader source",
                desc.label
            )));
        }
        if !desc.source.contains(desc.entry_point) {
            return Err(Error::resource(format!(
                "kernel '{}': entry point '{}' not present in source",
                desc.label, desc.entry_point
            )));
        }
        if desc.workgroup_size == 0 {
            return Err(Error::resource(format!(
                "kernel '{}': zero workgroup size",
                desc.label
            )));
        }
        let id = KernelId(self.kernels.len() as u32);
        self.kernels.push(Some(HeadlessKernel {
            label: desc.label.to_string(),
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
        Box::new(HeadlessCompute {
            device: self,
            kernel: None,
            uniforms: Vec::new(),
            storages: Vec::new(),
            pending: Vec::new(),
            barriers: Vec::new(),
        })
    }

    fn live_buffers(&self) -> usize {
        self.buffers.iter().flatten().count()
    }

    fn live_kernels(&self) -> usize {
        self.kernels.iter().flatten().count()
    }
}

struct HeadlessCompute<'a> {
    device: &'a mut HeadlessDevice,
    kernel: Option<KernelId>,
    uniforms: Vec<(u32, Vec<u8>)>,
    storages: Vec<(u32, BufferId)>,
    pending: Vec<u32>,
    barriers: Vec<BufferId>,
}

impl Compute for HeadlessCompute<'_> {
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

    fn barrier(&mut self, buffer: BufferId) {
        self.barriers.push(buffer);
    }

    fn submit(self: Box<Self>) -> Result<()> {
        let kernel_id = self
            .kernel
            .ok_or_else(|| Error::resource("compute pass submitted without a kernel"))?;
        let kernel = self
            .device
            .kernel(kernel_id)
            .ok_or_else(|| Error::resource(format!("dispatch with dead kernel {:?}", kernel_id)))?;

        for (slot, _) in &self.uniforms {
            if *slot >= kernel.uniforms {
                return Err(Error::resource(format!(
                    "kernel '{}': uniform slot {} out of range (declares {})",
                    kernel.label, slot, kernel.uniforms
                )));
            }
        }
        if self.storages.len() as u32 != kernel.storages {
            return Err(Error::resource(format!(
                "kernel '{}': {} storage bindings set, {} declared",
                kernel.label,
                self.storages.len(),
                kernel.storages
            )));
        }
        for (slot, buffer) in &self.storages {
            if *slot >= kernel.storages {
                return Err(Error::resource(format!(
                    "kernel '{}': storage slot {} out of range (declares {})",
                    kernel.label, slot, kernel.storages
                )));
            }
            if self.device.buffer_bytes(*buffer).is_none() {
                return Err(Error::resource(format!(
                    "kernel '{}': storage slot {} bound to dead buffer {:?}",
                    kernel.label, slot, buffer
                )));
            }
        }

        let workgroup_size = kernel.workgroup_size;
        for invocations in &self.pending {
            let record = DispatchRecord {
                kernel: kernel_id,
                uniforms: self.uniforms.clone(),
                storages: self.storages.clone(),
                invocations: *invocations,
                workgroups: invocations.div_ceil(workgroup_size),
                barriers: self.barriers.clone(),
            };
            self.device.dispatches.push(record);
        }
        self.device.submits += 1;
        Ok(())
    }
}
