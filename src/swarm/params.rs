//! GPU parameter blocks.

use bytemuck::{Pod, Zeroable};

/// Uniform parameter block for the instance transform kernel, rebuilt and
/// uploaded every dispatch.
///
/// Layout matches the WGSL `Params` struct: four 32-bit words, 16 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TransformParams {
    /// Storage slot of the first instance. The kernel derives a stable
    /// per-body salt as `slot - node_address_base`.
    pub node_address_base: u32,
    /// Live instance count; invocations past it are masked out.
    pub instance_count: u32,
    /// Scene time of the previous simulated frame, in seconds.
    pub time: f32,
    /// Keeps the block at a 16-byte uniform stride.
    pub _pad: u32,
}

impl TransformParams {
    pub fn new(node_address_base: u32, instance_count: u32, time: f32) -> Self {
        Self {
            node_address_base,
            instance_count,
            time,
            _pad: 0,
        }
    }
}
