//! Swarm construction settings.

use std::path::PathBuf;

/// Named driver nodes threaded through the motion hash, in chain order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverChain {
    /// Chain root. Resolved at construction for validation but excluded
    /// from the hash; its transform reaches the kernel through the shared
    /// storage heap like any other node.
    pub root: String,
    /// Environment driver, hashed first.
    pub environment: String,
    /// Surface driver, hashed second.
    pub surface: String,
    /// Depth driver, hashed last.
    pub depth: String,
}

impl Default for DriverChain {
    fn default() -> Self {
        Self {
            root: "Sun".into(),
            environment: "Galaxy".into(),
            surface: "Earth_Surface".into(),
            depth: "Earth_Depth".into(),
        }
    }
}

/// Everything an [`InstanceSwarm`](super::InstanceSwarm) needs to construct
/// itself against a scene. Plain data, captured once at creation.
#[derive(Debug, Clone)]
pub struct SwarmConfig {
    /// Name of the scene graph holding the drivers and templates.
    pub graph: String,
    /// Driver nodes resolved at construction.
    pub drivers: DriverChain,
    /// Template family prefix; `Asteroid_` matches `Asteroid_0`,
    /// `Asteroid_1` and so on.
    pub template_prefix: String,
    /// Number of bodies to instantiate.
    pub instance_count: u32,
    /// Seed for the template assignment stream. Equal seeds against equal
    /// scenes give byte-identical index buffers.
    pub seed: u64,
    /// Path to the transform kernel source.
    pub shader: PathBuf,
    /// Kernel workgroup width; dispatches round invocation counts up to
    /// whole groups.
    pub workgroup_size: u32,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            graph: "Gravity".into(),
            drivers: DriverChain::default(),
            template_prefix: "Asteroid_".into(),
            instance_count: 200_000,
            seed: 0,
            shader: PathBuf::from("shaders/transform.wgsl"),
            workgroup_size: 64,
        }
    }
}
