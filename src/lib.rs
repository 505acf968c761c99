//! # Swarmgraph
//!
//! Procedural instanced-body simulation over a compute device.
//!
//! A handful of animated driver nodes steers hundreds of thousands of
//! template-instanced bodies. Instance transforms live in a shared storage
//! heap and are rewritten every frame by a single GPU compute dispatch; the
//! host keeps a hash-linked record of each instance's driving ancestry so
//! renderers can detect motion without touching per-instance state.
//!
//! ## Modules
//!
//! - [`util`] - Error and result types
//! - [`scene`] - In-memory scene graph: nodes, templates, transform heap
//! - [`gpu`] - Compute device seam (wgpu and headless backends)
//! - [`swarm`] - Instance construction, motion hashing, per-frame dispatch
//! - [`body`] - Host-side driver simulations
//!
//! ## Example
//!
//! ```ignore
//! use swarmgraph::prelude::*;
//!
//! let mut scene = Scene::new();
//! // populate graph "Gravity" with driver nodes and Asteroid_* templates
//! let mut device = HeadlessDevice::new();
//! let mut swarm = InstanceSwarm::new(SwarmConfig::default());
//!
//! for frame in 0..600 {
//!     scene.set_time(frame as f64 / 60.0);
//!     if let FrameStatus::Deferred(err) = swarm.update(&mut scene, &mut device) {
//!         eprintln!("frame deferred: {err}");
//!     }
//! }
//! swarm.release(&mut scene, &mut device);
//! ```

pub mod body;
pub mod gpu;
pub mod scene;
pub mod swarm;
pub mod util;

// Re-export commonly used types
pub use util::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::body::{create_body, BodyBackend, BodySimulation, KinematicBodies};
    #[cfg(feature = "gpu")]
    pub use crate::gpu::WgpuDevice;
    pub use crate::gpu::{ComputeDevice, HeadlessDevice};
    pub use crate::scene::{Scene, SceneStats};
    pub use crate::swarm::{DriverChain, FrameStatus, InstanceSwarm, SwarmConfig, TransformParams};
    pub use crate::util::{Error, Result};
}
