//! Analytic driver motion.

use glam::{Mat4, Vec3};

use super::BodySimulation;
use crate::scene::{NodeId, Scene};
use crate::swarm::DriverChain;
use crate::util::Result;

/// Internal step length, independent of the host frame rate.
const STEP: f64 = 1.0 / 60.0;

// Angular speeds in radians per simulated second.
const ROOT_SPIN: f64 = 0.05;
const ENVIRONMENT_SPIN: f64 = 0.002;
const ORBIT_SPEED: f64 = 0.1;
const SURFACE_SPIN: f64 = 0.4;

const ORBIT_RADIUS: f32 = 150.0;
/// The depth frame trails below the surface frame.
const DEPTH_OFFSET: f32 = -4.0;

struct Drivers {
    root: NodeId,
    environment: NodeId,
    surface: NodeId,
    depth: NodeId,
}

/// Kinematic body backend: the chain root spins in place, the environment
/// rotates slowly, and the surface and depth frames ride a circular orbit.
/// Fully deterministic for a given step count.
pub struct KinematicBodies {
    graph: String,
    chain: DriverChain,
    drivers: Option<Drivers>,
    time: f64,
    frames: u64,
}

impl KinematicBodies {
    pub fn new(graph: impl Into<String>, chain: DriverChain) -> Self {
        Self {
            graph: graph.into(),
            chain,
            drivers: None,
            time: 0.0,
            frames: 0,
        }
    }

    /// Simulated seconds elapsed.
    pub fn time(&self) -> f64 {
        self.time
    }
}

impl BodySimulation for KinematicBodies {
    fn create(&mut self, scene: &mut Scene) -> Result<()> {
        let graph = scene.require_graph(&self.graph)?;
        self.drivers = Some(Drivers {
            root: scene.require_node(graph, &self.chain.root)?,
            environment: scene.require_node(graph, &self.chain.environment)?,
            surface: scene.require_node(graph, &self.chain.surface)?,
            depth: scene.require_node(graph, &self.chain.depth)?,
        });
        self.time = 0.0;
        self.frames = 0;
        tracing::debug!(graph = %self.graph, "kinematic bodies bound");
        Ok(())
    }

    fn update(&mut self) {
        self.time += STEP;
        self.frames += 1;
    }

    fn update_scene(&mut self, scene: &mut Scene) {
        let Some(drivers) = &self.drivers else {
            return;
        };
        let t = self.time;
        let orbit_angle = (t * ORBIT_SPEED) as f32;
        let orbit = Vec3::new(
            ORBIT_RADIUS * orbit_angle.cos(),
            0.0,
            ORBIT_RADIUS * orbit_angle.sin(),
        );

        scene.set_node_transform(drivers.root, Mat4::from_rotation_y((t * ROOT_SPIN) as f32));
        scene.set_node_transform(
            drivers.environment,
            Mat4::from_rotation_y((t * ENVIRONMENT_SPIN) as f32),
        );
        scene.set_node_transform(
            drivers.surface,
            Mat4::from_translation(orbit) * Mat4::from_rotation_y((t * SURFACE_SPIN) as f32),
        );
        scene.set_node_transform(
            drivers.depth,
            Mat4::from_translation(orbit + Vec3::new(0.0, DEPTH_OFFSET, 0.0)),
        );
    }

    fn frame_count(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver_scene() -> Scene {
        let mut scene = Scene::new();
        let graph = scene.create_graph("Gravity");
        for name in ["Sun", "Galaxy", "Earth_Surface", "Earth_Depth"] {
            scene.create_node(graph, name);
        }
        scene
    }

    #[test]
    fn test_create_resolves_chain() {
        let mut scene = driver_scene();
        let mut bodies = KinematicBodies::new("Gravity", DriverChain::default());
        bodies
            .create(&mut scene)
            .expect("Failed to bind kinematic bodies");
        assert_eq!(bodies.frame_count(), 0);
    }

    #[test]
    fn test_create_reports_missing_node() {
        let mut scene = Scene::new();
        let graph = scene.create_graph("Gravity");
        scene.create_node(graph, "Sun");
        let mut bodies = KinematicBodies::new("Gravity", DriverChain::default());
        let err = bodies.create(&mut scene).unwrap_err();
        assert!(err.is_resolution());
        assert!(err.to_string().contains("Galaxy"));
    }

    #[test]
    fn test_update_moves_drivers() {
        let mut scene = driver_scene();
        let graph = scene.find_graph("Gravity").unwrap();
        let surface = scene.find_node(graph, "Earth_Surface").unwrap();

        let mut bodies = KinematicBodies::new("Gravity", DriverChain::default());
        bodies.create(&mut scene).expect("Failed to bind");
        let before = scene.node_transform(surface).unwrap();
        for _ in 0..30 {
            bodies.update();
        }
        bodies.update_scene(&mut scene);
        let after = scene.node_transform(surface).unwrap();
        assert_eq!(bodies.frame_count(), 30);
        assert_ne!(before, after, "surface frame should have moved");
        assert!(after.w_axis.truncate().length() > 1.0);
    }

    #[test]
    fn test_motion_is_deterministic() {
        let run = || {
            let mut scene = driver_scene();
            let graph = scene.find_graph("Gravity").unwrap();
            let depth = scene.find_node(graph, "Earth_Depth").unwrap();
            let mut bodies = KinematicBodies::new("Gravity", DriverChain::default());
            bodies.create(&mut scene).expect("Failed to bind");
            for _ in 0..120 {
                bodies.update();
            }
            bodies.update_scene(&mut scene);
            scene.node_transform(depth).unwrap()
        };
        assert_eq!(run(), run());
    }
}
