//! Shared transform storage heap.
//!
//! Every node's world transform occupies one `Mat4` slot in a scene-global
//! heap. The heap keeps a CPU staging copy plus a GPU mirror buffer; compute
//! kernels write transforms directly into the mirror, so after a dispatch the
//! GPU side is authoritative and the staging copy only reflects host-side
//! writes.

use glam::Mat4;

use crate::gpu::{BufferId, ComputeDevice};
use crate::util::Result;

const HEAP_LABEL: &str = "scene transform heap";

/// Slot-allocated transform heap with a lazily created GPU mirror.
#[derive(Debug, Default)]
pub struct TransformHeap {
    slots: Vec<Mat4>,
    free: Vec<u32>,
    // Inclusive slot span touched on the CPU since the last sync.
    dirty: Option<(u32, u32)>,
    buffer: Option<BufferId>,
    buffer_slots: u32,
}

impl TransformHeap {
    pub fn new() -> Self {
        Self::default()
    }

    /// High-water slot count (including freed slots).
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Currently allocated slot count.
    pub fn allocated(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Allocate a slot, reusing freed ones first. New slots hold identity.
    pub fn allocate(&mut self) -> u32 {
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot as usize] = Mat4::IDENTITY;
                slot
            }
            None => {
                self.slots.push(Mat4::IDENTITY);
                (self.slots.len() - 1) as u32
            }
        };
        self.touch(slot);
        slot
    }

    /// Return a slot to the free list. Contents are left in place; the GPU
    /// mirror is not rewritten for releases.
    pub fn release(&mut self, slot: u32) {
        debug_assert!((slot as usize) < self.slots.len());
        self.free.push(slot);
    }

    /// Read a slot.
    pub fn get(&self, slot: u32) -> Mat4 {
        self.slots[slot as usize]
    }

    /// Write a slot on the CPU side and widen the pending upload span.
    pub fn set(&mut self, slot: u32, transform: Mat4) {
        self.slots[slot as usize] = transform;
        self.touch(slot);
    }

    /// The GPU mirror handle, if one has been created.
    pub fn buffer(&self) -> Option<BufferId> {
        self.buffer
    }

    /// Staging contents as raw bytes (one 64-byte column-major matrix per
    /// slot).
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.slots)
    }

    /// Bring the GPU mirror up to date with the staging copy and return its
    /// handle. Creates or recreates the buffer when the heap has grown;
    /// otherwise uploads only the dirty span. Returns `None` for an empty
    /// heap.
    pub fn sync(&mut self, device: &mut dyn ComputeDevice) -> Result<Option<BufferId>> {
        if self.slots.is_empty() {
            return Ok(None);
        }

        let slot_count = self.slots.len() as u32;
        match self.buffer {
            Some(id) if self.buffer_slots == slot_count => {
                if let Some((lo, hi)) = self.dirty.take() {
                    let bytes = self.as_bytes();
                    let stride = std::mem::size_of::<Mat4>();
                    let start = lo as usize * stride;
                    let end = (hi as usize + 1) * stride;
                    device.write_buffer(id, start as u64, &bytes[start..end])?;
                }
                Ok(Some(id))
            }
            _ => {
                if let Some(old) = self.buffer.take() {
                    device.destroy_buffer(old);
                }
                let id = device.create_storage_buffer(HEAP_LABEL, self.as_bytes())?;
                self.buffer = Some(id);
                self.buffer_slots = slot_count;
                self.dirty = None;
                Ok(Some(id))
            }
        }
    }

    /// Drop the GPU mirror. The staging copy survives; the next sync
    /// recreates the buffer.
    pub fn release_gpu(&mut self, device: &mut dyn ComputeDevice) {
        if let Some(id) = self.buffer.take() {
            device.destroy_buffer(id);
        }
        self.buffer_slots = 0;
        self.dirty = None;
    }

    fn touch(&mut self, slot: u32) {
        self.dirty = Some(match self.dirty {
            Some((lo, hi)) => (lo.min(slot), hi.max(slot)),
            None => (slot, slot),
        });
    }
}
