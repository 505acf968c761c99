//! Procedural instanced-body swarm.
//!
//! [`InstanceSwarm`] owns a family of template-instanced scene nodes and the
//! GPU resources that animate them: an immutable instance index buffer
//! mapping array slots to storage addresses, and a compute kernel that
//! rewrites every instance transform in the shared heap each frame.
//!
//! Lifecycle: the swarm starts empty, constructs itself on the first
//! [`InstanceSwarm::update`] (retrying on later frames if construction
//! fails), then dispatches one compute pass per frame until
//! [`InstanceSwarm::release`]. Construction is all-or-nothing; a failed
//! attempt rolls back every node and device handle it created.

mod config;
mod construct;
mod params;

pub use config::{DriverChain, SwarmConfig};
pub use params::TransformParams;

use crate::gpu::{BufferId, ComputeDevice, KernelId};
use crate::scene::{NodeId, Scene};
use crate::util::{Error, Result};

/// Outcome of one frame tick.
#[derive(Debug)]
pub enum FrameStatus {
    /// Nothing to do: the swarm is configured for zero instances.
    Idle,
    /// This frame's work failed and was skipped. A construction failure has
    /// been fully rolled back and will be retried next frame; a dispatch
    /// failure keeps the built state and retries the dispatch.
    Deferred(Error),
    /// Instances were constructed this frame; the first dispatch covering
    /// them was submitted in the same tick.
    Constructed { instances: u32 },
    /// Steady state: one dispatch covering every instance.
    Simulated { instances: u32 },
}

impl FrameStatus {
    /// True for the frames that submitted a dispatch.
    pub fn simulated(&self) -> bool {
        matches!(
            self,
            FrameStatus::Constructed { .. } | FrameStatus::Simulated { .. }
        )
    }
}

// ============================================================================
// InstanceSwarm
// ============================================================================

/// Scheduler and owner of one instanced-body family.
pub struct InstanceSwarm {
    config: SwarmConfig,
    /// Instance nodes, in creation order (equals index-buffer slot order).
    nodes: Vec<NodeId>,
    /// Storage address per slot, the host copy of the index buffer.
    indices: Vec<u32>,
    index_buffer: Option<BufferId>,
    kernel: Option<KernelId>,
    instance_count: u32,
    /// Storage address of slot 0.
    base: u32,
    /// Final value of the running motion hash after construction.
    motion_hash: u32,
    /// Scene time observed on the previous tick; next dispatch's timestamp.
    last_time: f32,
    /// Lifetime tick count.
    frames: u64,
}

impl InstanceSwarm {
    pub fn new(config: SwarmConfig) -> Self {
        Self {
            config,
            nodes: Vec::new(),
            indices: Vec::new(),
            index_buffer: None,
            kernel: None,
            instance_count: 0,
            base: 0,
            motion_hash: 0,
            last_time: 0.0,
            frames: 0,
        }
    }

    /// Tick the swarm: construct on the first call (or after a failure or
    /// release), then dispatch the transform kernel and run the scene
    /// propagation passes. Never fails; failures are reported through
    /// [`FrameStatus::Deferred`] and retried on the next tick.
    pub fn update(&mut self, scene: &mut Scene, device: &mut dyn ComputeDevice) -> FrameStatus {
        let mut constructed = false;
        if self.kernel.is_none() {
            if self.config.instance_count == 0 {
                return FrameStatus::Idle;
            }
            if let Err(err) = self.construct(scene, device) {
                tracing::warn!(error = %err, "swarm construction failed, deferring to next frame");
                self.release(scene, device);
                return FrameStatus::Deferred(err);
            }
            constructed = true;
        }
        let Some(kernel) = self.kernel else {
            return FrameStatus::Idle;
        };

        // The parameter block carries the previous tick's timestamp: marshal
        // the stored time first, then replace it with the current clock.
        let params = TransformParams::new(self.base, self.instance_count, self.last_time);
        self.last_time = scene.time() as f32;

        let status = match self.dispatch(scene, device, kernel, params) {
            Ok(()) => {
                if constructed {
                    FrameStatus::Constructed {
                        instances: self.instance_count,
                    }
                } else {
                    FrameStatus::Simulated {
                        instances: self.instance_count,
                    }
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "transform dispatch failed, skipping frame");
                FrameStatus::Deferred(err)
            }
        };

        // Propagation runs spatial, then object, then commit; consumers key
        // off the commit stamp to pick up both tree passes.
        scene.update_spatial_tree();
        scene.update_object_tree();
        if let Err(err) = scene.commit(device) {
            tracing::warn!(error = %err, "scene commit failed");
        }

        self.frames += 1;
        status
    }

    fn dispatch(
        &self,
        scene: &mut Scene,
        device: &mut dyn ComputeDevice,
        kernel: KernelId,
        params: TransformParams,
    ) -> Result<()> {
        let indices = self
            .index_buffer
            .ok_or_else(|| Error::resource("instance index buffer missing"))?;
        // Sync flushes any host-side transform writes (driver motion) so the
        // kernel reads this frame's driver state.
        let heap = scene.storage_buffer(device)?;

        let mut pass = device.begin_compute();
        pass.set_kernel(kernel);
        pass.set_uniform(0, bytemuck::bytes_of(&params));
        pass.set_storage_buffer(0, indices);
        pass.set_storage_buffer(1, heap);
        pass.dispatch(self.instance_count);
        pass.barrier(heap);
        pass.submit()
    }

    /// Tear down everything the swarm created: the kernel, the index buffer,
    /// and every instance node, then commit so consumers never observe the
    /// released slots. Safe to call at any point in the lifecycle; with
    /// nothing constructed it touches neither the scene nor the device.
    pub fn release(&mut self, scene: &mut Scene, device: &mut dyn ComputeDevice) {
        if let Some(kernel) = self.kernel.take() {
            device.destroy_kernel(kernel);
        }
        if let Some(buffer) = self.index_buffer.take() {
            device.destroy_buffer(buffer);
        }
        if !self.nodes.is_empty() {
            tracing::info!(instances = self.nodes.len(), "releasing instance swarm");
            for id in self.nodes.drain(..) {
                scene.remove_node(id);
            }
            if let Err(err) = scene.commit(device) {
                tracing::warn!(error = %err, "commit after swarm release failed");
            }
        }
        self.indices.clear();
        self.instance_count = 0;
        self.base = 0;
        self.motion_hash = 0;
        self.last_time = 0.0;
    }

    /// Construction settings this swarm was created with.
    pub fn config(&self) -> &SwarmConfig {
        &self.config
    }

    /// Live instance count; zero until construction succeeds.
    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    /// Host copy of the instance index buffer (slot order).
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Device handle of the instance index buffer.
    pub fn index_buffer(&self) -> Option<BufferId> {
        self.index_buffer
    }

    /// Final motion hash from the last successful construction.
    pub fn motion_hash(&self) -> u32 {
        self.motion_hash
    }

    /// True once construction has succeeded and the kernel is live.
    pub fn is_ready(&self) -> bool {
        self.kernel.is_some()
    }

    /// Lifetime tick count.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::HeadlessDevice;

    #[test]
    fn test_zero_instances_is_idle() {
        let mut scene = Scene::new();
        let mut device = HeadlessDevice::new();
        let mut swarm = InstanceSwarm::new(SwarmConfig {
            instance_count: 0,
            ..Default::default()
        });
        assert!(matches!(
            swarm.update(&mut scene, &mut device),
            FrameStatus::Idle
        ));
        assert!(!swarm.is_ready());
        assert_eq!(device.live_buffers(), 0);
    }

    #[test]
    fn test_release_before_construction_is_safe() {
        let mut scene = Scene::new();
        let mut device = HeadlessDevice::new();
        let mut swarm = InstanceSwarm::new(SwarmConfig::default());
        swarm.release(&mut scene, &mut device);
        swarm.release(&mut scene, &mut device);
        assert_eq!(swarm.instance_count(), 0);
        assert_eq!(scene.node_count(), 0);
    }

    #[test]
    fn test_missing_graph_defers() {
        let mut scene = Scene::new();
        let mut device = HeadlessDevice::new();
        let mut swarm = InstanceSwarm::new(SwarmConfig {
            instance_count: 4,
            ..Default::default()
        });
        match swarm.update(&mut scene, &mut device) {
            FrameStatus::Deferred(err) => {
                assert!(err.is_resolution(), "expected a resolution error: {err}")
            }
            other => panic!("expected deferral, got {other:?}"),
        }
        assert!(!swarm.is_ready());
        assert_eq!(device.live_buffers(), 0);
        assert_eq!(device.live_kernels(), 0);
    }
}
