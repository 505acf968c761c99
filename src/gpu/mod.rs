//! Compute device seam.
//!
//! The swarm subsystem talks to the GPU through two object-safe traits:
//! [`ComputeDevice`] owns resources (storage buffers, compiled kernels) and
//! hands out plain integer handles; [`Compute`] records one pass worth of
//! bindings, dispatches, and barriers, submitted as a unit. Backends:
//!
//! - [`WgpuDevice`] (feature `gpu`) - real compute dispatch through wgpu
//! - [`HeadlessDevice`] - validating in-memory backend for hosts without a
//!   GPU; stores buffer bytes and records every dispatch
//!
//! [`shader`] handles source loading and define expansion; kernels receive
//! preprocessed WGSL only.

mod headless;
pub mod shader;
#[cfg(feature = "gpu")]
mod wgpu;

pub use headless::{DeviceLimits, DispatchRecord, HeadlessDevice};
#[cfg(feature = "gpu")]
pub use self::wgpu::WgpuDevice;

use crate::util::Result;

/// Handle to a device storage buffer. Handles are never reused within one
/// device, so a stale handle stays invalid instead of aliasing a newer
/// resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub(crate) u32);

/// Handle to a compiled compute kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KernelId(pub(crate) u32);

/// Everything a backend needs to compile one compute kernel.
///
/// Binding convention: uniform blocks occupy bindings `0..uniforms`, storage
/// buffers follow at `uniforms..uniforms + storages`, all in bind group 0.
/// [`Compute::set_uniform`] and [`Compute::set_storage_buffer`] take slots
/// relative to their own range, matching this layout.
#[derive(Debug, Clone)]
pub struct KernelDesc<'a> {
    pub label: &'a str,
    /// Preprocessed WGSL source (see [`shader`]).
    pub source: &'a str,
    /// Kernel entry point name.
    pub entry_point: &'a str,
    /// Number of uniform bindings.
    pub uniforms: u32,
    /// Number of storage-buffer bindings.
    pub storages: u32,
    /// Workgroup width of the entry point; dispatches round invocation
    /// counts up to whole workgroups.
    pub workgroup_size: u32,
}

// ============================================================================
// Device
// ============================================================================

/// Resource owner for one logical compute device.
pub trait ComputeDevice: Send {
    /// Backend name for diagnostics.
    fn name(&self) -> &str;

    /// Create a storage buffer with fixed size and initial contents.
    fn create_storage_buffer(&mut self, label: &str, contents: &[u8]) -> Result<BufferId>;

    /// Overwrite a byte range of an existing buffer. The range must lie
    /// within the buffer's original size.
    fn write_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]) -> Result<()>;

    /// Release a buffer. Unknown or already-released handles are ignored.
    fn destroy_buffer(&mut self, buffer: BufferId);

    /// Compile a compute kernel from preprocessed source.
    fn create_kernel(&mut self, desc: &KernelDesc<'_>) -> Result<KernelId>;

    /// Release a kernel. Unknown or already-released handles are ignored.
    fn destroy_kernel(&mut self, kernel: KernelId);

    /// Begin recording a compute pass.
    fn begin_compute(&mut self) -> Box<dyn Compute + '_>;

    /// Number of live buffers (resource-leak accounting).
    fn live_buffers(&self) -> usize;

    /// Number of live kernels.
    fn live_kernels(&self) -> usize;
}

// ============================================================================
// Pass recorder
// ============================================================================

/// Records one compute pass: kernel, bindings, dispatches, barriers.
///
/// Nothing reaches the device until [`Compute::submit`]; recording itself is
/// infallible and validation errors surface at submission.
pub trait Compute {
    /// Select the kernel for subsequent dispatches.
    fn set_kernel(&mut self, kernel: KernelId);

    /// Bind uniform data to a uniform slot.
    fn set_uniform(&mut self, slot: u32, data: &[u8]);

    /// Bind a buffer to a storage slot.
    fn set_storage_buffer(&mut self, slot: u32, buffer: BufferId);

    /// Record one dispatch covering `invocations` kernel invocations. The
    /// backend rounds up to whole workgroups; the kernel must bounds-check.
    fn dispatch(&mut self, invocations: u32);

    /// Memory barrier on a storage buffer: all writes from prior dispatches
    /// in this pass become visible to later device and host reads of that
    /// buffer once the pass is submitted.
    fn barrier(&mut self, buffer: BufferId);

    /// Finish recording and hand the pass to the device.
    fn submit(self: Box<Self>) -> Result<()>;
}
