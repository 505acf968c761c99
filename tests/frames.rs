//! Integration tests for the per-frame loop: dispatch recording, uniform
//! marshalling, propagation ordering, and motion-hash behavior over time.

use swarmgraph::body::{create_body, BodyBackend};
use swarmgraph::gpu::HeadlessDevice;
use swarmgraph::scene::Scene;
use swarmgraph::swarm::{DriverChain, FrameStatus, InstanceSwarm, SwarmConfig, TransformParams};

fn demo_scene(templates: u32) -> Scene {
    let mut scene = Scene::new();
    let graph = scene.create_graph("Gravity");
    for name in ["Sun", "Galaxy", "Earth_Surface", "Earth_Depth"] {
        scene.create_node(graph, name);
    }
    for i in 0..templates {
        scene.create_object(graph, &format!("Asteroid_{i:02}"));
    }
    scene
}

fn test_config(instances: u32) -> SwarmConfig {
    SwarmConfig {
        instance_count: instances,
        ..SwarmConfig::default()
    }
}

fn read_params(record: &swarmgraph::gpu::DispatchRecord) -> TransformParams {
    let (slot, bytes) = &record.uniforms[0];
    assert_eq!(*slot, 0, "Parameters bind at uniform slot 0");
    bytemuck::pod_read_unaligned(bytes)
}

#[test]
fn test_construction_frame_also_dispatches() {
    let mut scene = demo_scene(4);
    let mut device = HeadlessDevice::new();
    let mut swarm = InstanceSwarm::new(test_config(130));

    let status = swarm.update(&mut scene, &mut device);
    assert!(matches!(status, FrameStatus::Constructed { instances: 130 }));

    let record = device.last_dispatch().expect("Construction frame should dispatch");
    assert_eq!(record.invocations, 130, "One invocation per instance");
    assert_eq!(record.workgroups, 3, "130 invocations round up to 3 groups of 64");
}

#[test]
fn test_uniform_carries_previous_frame_time() {
    let mut scene = demo_scene(3);
    let mut device = HeadlessDevice::new();
    let mut swarm = InstanceSwarm::new(test_config(16));

    for time in [0.25, 0.5, 0.75] {
        scene.set_time(time);
        let status = swarm.update(&mut scene, &mut device);
        assert!(
            !matches!(status, FrameStatus::Deferred(_)),
            "Frame at {time} deferred: {status:?}"
        );
    }

    let dispatches = device.dispatches();
    assert_eq!(dispatches.len(), 3);
    // The kernel consumes the committed state of the previous frame, so its
    // timestamp lags the scene clock by one frame.
    assert_eq!(read_params(&dispatches[0]).time, 0.0);
    assert_eq!(read_params(&dispatches[1]).time, 0.25);
    assert_eq!(read_params(&dispatches[2]).time, 0.5);
}

#[test]
fn test_uniform_names_base_address_and_count() {
    let mut scene = demo_scene(3);
    let mut device = HeadlessDevice::new();
    let mut swarm = InstanceSwarm::new(test_config(24));

    swarm.update(&mut scene, &mut device);
    let params = read_params(device.last_dispatch().expect("Should have dispatched"));
    assert_eq!(params.instance_count, 24);
    assert_eq!(
        params.node_address_base,
        swarm.indices()[0],
        "Base address anchors the first created instance"
    );
}

#[test]
fn test_dispatch_binds_indices_then_heap() {
    let mut scene = demo_scene(2);
    let mut device = HeadlessDevice::new();
    let mut swarm = InstanceSwarm::new(test_config(10));

    swarm.update(&mut scene, &mut device);

    let indices = swarm.index_buffer().expect("Index buffer should exist");
    let heap = scene.heap().buffer().expect("Heap should have a device buffer");
    let record = device.last_dispatch().expect("Should have dispatched");
    assert_eq!(
        record.storages,
        vec![(0, indices), (1, heap)],
        "Storage slot 0 is the index buffer, slot 1 the transform heap"
    );
    assert_eq!(record.barriers, vec![heap], "The shared heap is fenced");
}

#[test]
fn test_steady_state_simulates_every_frame() {
    let mut scene = demo_scene(4);
    let mut device = HeadlessDevice::new();
    let mut swarm = InstanceSwarm::new(test_config(32));

    let mut constructed = 0;
    let mut simulated = 0;
    for frame in 0..5 {
        scene.set_time(frame as f64 / 60.0);
        match swarm.update(&mut scene, &mut device) {
            FrameStatus::Constructed { instances } => {
                constructed += 1;
                assert_eq!(instances, 32);
            }
            FrameStatus::Simulated { instances } => {
                simulated += 1;
                assert_eq!(instances, 32);
            }
            other => panic!("Unexpected frame status: {other:?}"),
        }
    }

    assert_eq!(constructed, 1, "Construction happens exactly once");
    assert_eq!(simulated, 4);
    assert_eq!(swarm.frames(), 5);
    assert_eq!(device.dispatches().len(), 5, "One dispatch per frame");
    assert!(device.dispatches().iter().all(|d| d.invocations == 32));
}

#[test]
fn test_commit_follows_propagation_passes() {
    let mut scene = demo_scene(2);
    let mut device = HeadlessDevice::new();
    let mut swarm = InstanceSwarm::new(test_config(8));

    swarm.update(&mut scene, &mut device);

    let stats = scene.stats();
    assert!(stats.spatial_updates >= 1);
    assert!(stats.object_updates >= 1);
    assert!(
        stats.last_spatial_seq < stats.last_object_seq,
        "Spatial pass runs before the object pass"
    );
    assert!(
        stats.last_object_seq < stats.last_commit_seq,
        "Commit lands after both propagation passes"
    );
    assert!(stats.bounds.is_some(), "Live nodes should produce bounds");
}

#[test]
fn test_motion_hash_depends_on_driver_order() {
    let run = |drivers: DriverChain| {
        let mut scene = demo_scene(3);
        let mut device = HeadlessDevice::new();
        let mut swarm = InstanceSwarm::new(SwarmConfig {
            instance_count: 16,
            drivers,
            ..SwarmConfig::default()
        });
        let status = swarm.update(&mut scene, &mut device);
        assert!(matches!(status, FrameStatus::Constructed { .. }), "got {status:?}");
        swarm.motion_hash()
    };

    let forward = run(DriverChain::default());
    let swapped = run(DriverChain {
        surface: "Earth_Depth".into(),
        depth: "Earth_Surface".into(),
        ..DriverChain::default()
    });
    assert_ne!(
        forward, swapped,
        "Reordering the driver chain must change the threaded hash"
    );
}

#[test]
fn test_motion_hash_is_fixed_after_construction() {
    let mut scene = demo_scene(3);
    let mut device = HeadlessDevice::new();
    let mut swarm = InstanceSwarm::new(test_config(16));

    swarm.update(&mut scene, &mut device);
    let hash = swarm.motion_hash();
    assert_ne!(hash, 0, "Threading four drivers and 16 instances should mix bits");

    for frame in 1..4 {
        scene.set_time(frame as f64 / 60.0);
        swarm.update(&mut scene, &mut device);
    }
    assert_eq!(swarm.motion_hash(), hash, "Simulation frames never rehash");
}

#[test]
fn test_driver_motion_lands_in_heap_buffer() {
    let mut scene = demo_scene(3);
    let mut device = HeadlessDevice::new();
    let mut swarm = InstanceSwarm::new(test_config(12));
    let mut bodies = create_body(BodyBackend::Kinematic, "Gravity", DriverChain::default());
    bodies.create(&mut scene).expect("Kinematic bodies should resolve the demo scene");

    // One simulated second: the surface driver orbits away from the origin.
    for frame in 0..60 {
        scene.set_time(frame as f64 / 60.0);
        bodies.update();
        bodies.update_scene(&mut scene);
        let status = swarm.update(&mut scene, &mut device);
        assert!(!matches!(status, FrameStatus::Deferred(_)), "got {status:?}");
    }

    let graph = scene.find_graph("Gravity").expect("Demo graph should exist");
    let surface = scene
        .find_node(graph, "Earth_Surface")
        .expect("Surface driver should exist");
    let slot = scene.node(surface).expect("Driver should be live").address().value() as usize;

    let heap = scene.heap().buffer().expect("Heap should have a device buffer");
    let bytes = device.buffer_bytes(heap).expect("Heap buffer should be live");
    let cells: [f32; 16] = bytemuck::pod_read_unaligned(&bytes[slot * 64..slot * 64 + 64]);
    let (x, z) = (cells[12], cells[14]);
    let radius = (x * x + z * z).sqrt();
    assert!(
        (radius - 150.0).abs() < 1e-3,
        "Surface driver should sit on its orbit radius, got {radius}"
    );
}
