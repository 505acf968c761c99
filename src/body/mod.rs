//! Host-side body simulation backends.
//!
//! The instanced swarm animates its bodies entirely on the GPU; something
//! still has to move the driver nodes those bodies hash against.
//! [`BodySimulation`] is that seam: resolve scene references once, step
//! internal state, write results back into the scene. Backends are picked
//! per run through [`BodyBackend`] instead of being baked in at compile
//! time, and every instance owns its own state.

mod kinematic;

pub use kinematic::KinematicBodies;

use crate::scene::Scene;
use crate::swarm::DriverChain;
use crate::util::Result;

/// One host-side body simulation driving scene nodes.
pub trait BodySimulation: Send {
    /// Resolve scene references and prime internal state. Calling again
    /// rebinds against the scene and restarts the clock.
    fn create(&mut self, scene: &mut Scene) -> Result<()>;

    /// Advance the simulation by one internal step.
    fn update(&mut self);

    /// Write the current simulation state into the scene.
    fn update_scene(&mut self, scene: &mut Scene);

    /// Steps simulated since creation.
    fn frame_count(&self) -> u64;
}

/// Available [`BodySimulation`] backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyBackend {
    /// Analytic orbital motion, no external solver.
    #[default]
    Kinematic,
}

/// Instantiate the configured backend against a named graph and its driver
/// chain.
pub fn create_body(
    backend: BodyBackend,
    graph: &str,
    drivers: DriverChain,
) -> Box<dyn BodySimulation> {
    match backend {
        BodyBackend::Kinematic => Box::new(KinematicBodies::new(graph, drivers)),
    }
}
