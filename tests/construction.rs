//! Integration tests for swarm construction: index buffer layout, driver
//! resolution, rollback on device faults, and teardown.

use swarmgraph::gpu::{ComputeDevice, DeviceLimits, HeadlessDevice};
use swarmgraph::scene::{NodeAddress, Scene};
use swarmgraph::swarm::{FrameStatus, InstanceSwarm, SwarmConfig};

/// Scene with the default driver chain plus `templates` instanceable shapes.
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

#[test]
fn test_construction_fills_index_buffer_in_slot_order() {
    let mut scene = demo_scene(5);
    let mut device = HeadlessDevice::new();
    let mut swarm = InstanceSwarm::new(test_config(1000));

    let status = swarm.update(&mut scene, &mut device);
    assert!(
        matches!(status, FrameStatus::Constructed { instances: 1000 }),
        "First update should construct and dispatch, got {status:?}"
    );
    assert_eq!(scene.node_count(), 4 + 1000, "Drivers plus one node per instance");

    let buffer = swarm.index_buffer().expect("Index buffer should exist after construction");
    let bytes = device.buffer_bytes(buffer).expect("Index buffer should be live");
    let uploaded: Vec<u32> = bytemuck::pod_collect_to_vec(bytes);
    assert_eq!(uploaded, swarm.indices(), "Device copy must mirror the host indices");

    // Every slot written to the buffer must resolve back to a live instance.
    for &raw in &uploaded {
        let id = scene
            .node_at_address(NodeAddress::from_raw(raw))
            .expect("Buffer slot should address a live node");
        let node = scene.node(id).expect("Resolved node should be fetchable");
        assert!(node.is_internal(), "Instances are marked internal");
        assert!(node.object().is_some(), "Instances bind a template");
    }
}

#[test]
fn test_two_identical_runs_produce_identical_buffers() {
    let run = || {
        let mut scene = demo_scene(5);
        let mut device = HeadlessDevice::new();
        let mut swarm = InstanceSwarm::new(test_config(512));
        let status = swarm.update(&mut scene, &mut device);
        assert!(matches!(status, FrameStatus::Constructed { .. }));
        let buffer = swarm.index_buffer().expect("Index buffer should exist");
        let bytes = device.buffer_bytes(buffer).expect("Buffer should be live").to_vec();
        (bytes, swarm.motion_hash())
    };

    let (bytes_a, hash_a) = run();
    let (bytes_b, hash_b) = run();
    assert_eq!(bytes_a, bytes_b, "Same seed must upload the same bytes");
    assert_eq!(hash_a, hash_b, "Same seed must thread the same motion hash");
}

#[test]
fn test_missing_driver_defers_and_retries() {
    let mut scene = Scene::new();
    let graph = scene.create_graph("Gravity");
    for name in ["Sun", "Galaxy", "Earth_Surface"] {
        scene.create_node(graph, name);
    }
    scene.create_object(graph, "Asteroid_00");
    let nodes_before = scene.node_count();

    let mut device = HeadlessDevice::new();
    let mut swarm = InstanceSwarm::new(test_config(32));

    match swarm.update(&mut scene, &mut device) {
        FrameStatus::Deferred(err) => {
            assert!(err.is_resolution(), "Missing driver is a resolution error");
            assert!(
                err.to_string().contains("Earth_Depth"),
                "Error should name the missing node, got: {err}"
            );
        }
        other => panic!("Expected deferral, got {other:?}"),
    }
    assert_eq!(scene.node_count(), nodes_before, "No instances may leak");
    assert_eq!(swarm.instance_count(), 0);
    assert_eq!(device.live_buffers(), 0, "Resolution fails before any device work");
    assert_eq!(device.live_kernels(), 0);

    // Next frame the driver exists, so the same swarm recovers on its own.
    scene.create_node(graph, "Earth_Depth");
    let status = swarm.update(&mut scene, &mut device);
    assert!(
        matches!(status, FrameStatus::Constructed { instances: 32 }),
        "Expected construction, got {status:?}"
    );
    assert!(swarm.is_ready());
}

#[test]
fn test_empty_template_family_defers() {
    let mut scene = demo_scene(0);
    let mut device = HeadlessDevice::new();
    let mut swarm = InstanceSwarm::new(test_config(16));

    match swarm.update(&mut scene, &mut device) {
        FrameStatus::Deferred(err) => {
            assert!(err.is_resolution());
            assert!(
                err.to_string().contains("Asteroid_"),
                "Error should name the template prefix, got: {err}"
            );
        }
        other => panic!("Expected deferral, got {other:?}"),
    }
    assert_eq!(scene.node_count(), 4, "Driver chain alone survives");
}

#[test]
fn test_index_buffer_failure_rolls_back_nodes() {
    let mut scene = demo_scene(3);
    // One buffer is enough for the scene transform heap, not for the
    // instance indices that come after it.
    let mut device = HeadlessDevice::with_limits(DeviceLimits {
        max_buffers: 1,
        ..DeviceLimits::default()
    });
    let mut swarm = InstanceSwarm::new(test_config(64));

    match swarm.update(&mut scene, &mut device) {
        FrameStatus::Deferred(err) => {
            assert!(!err.is_resolution(), "Exhausted device is a resource error");
        }
        other => panic!("Expected deferral, got {other:?}"),
    }
    assert_eq!(scene.node_count(), 4, "Created instances must be released");
    assert_eq!(device.live_buffers(), 1, "Only the scene heap buffer survives");
    assert_eq!(device.live_kernels(), 0);
    assert!(!swarm.is_ready());

    // Lift the limit and the retry path constructs cleanly.
    device.set_limits(DeviceLimits::default());
    let status = swarm.update(&mut scene, &mut device);
    assert!(
        matches!(status, FrameStatus::Constructed { instances: 64 }),
        "Retry should construct, got {status:?}"
    );
    assert_eq!(device.live_buffers(), 2, "Heap plus index buffer");
    assert_eq!(device.live_kernels(), 1);
}

#[test]
fn test_kernel_failure_destroys_index_buffer_too() {
    let mut scene = demo_scene(3);
    let mut device = HeadlessDevice::with_limits(DeviceLimits {
        max_kernels: 0,
        ..DeviceLimits::default()
    });
    let mut swarm = InstanceSwarm::new(test_config(48));

    match swarm.update(&mut scene, &mut device) {
        FrameStatus::Deferred(err) => assert!(!err.is_resolution()),
        other => panic!("Expected deferral, got {other:?}"),
    }
    assert_eq!(scene.node_count(), 4);
    assert_eq!(
        device.live_buffers(),
        1,
        "Rollback must destroy the index buffer, leaving only the heap"
    );
    assert_eq!(device.live_kernels(), 0);

    device.set_limits(DeviceLimits::default());
    let status = swarm.update(&mut scene, &mut device);
    assert!(
        matches!(status, FrameStatus::Constructed { instances: 48 }),
        "Expected construction, got {status:?}"
    );
}

#[test]
fn test_bad_shader_path_defers_with_resolution_error() {
    let mut scene = demo_scene(2);
    let mut device = HeadlessDevice::new();
    let mut swarm = InstanceSwarm::new(SwarmConfig {
        instance_count: 8,
        shader: "shaders/does_not_exist.wgsl".into(),
        ..SwarmConfig::default()
    });

    match swarm.update(&mut scene, &mut device) {
        FrameStatus::Deferred(err) => assert!(err.is_resolution()),
        other => panic!("Expected deferral, got {other:?}"),
    }
    assert_eq!(scene.node_count(), 4, "Instances roll back on shader errors");
    assert_eq!(device.live_buffers(), 1, "Index buffer is destroyed, heap stays");
}

#[test]
fn test_release_returns_scene_to_initial_shape() {
    let mut scene = demo_scene(4);
    let mut device = HeadlessDevice::new();
    let mut swarm = InstanceSwarm::new(test_config(64));

    let status = swarm.update(&mut scene, &mut device);
    assert!(
        matches!(status, FrameStatus::Constructed { instances: 64 }),
        "Expected construction, got {status:?}"
    );

    swarm.release(&mut scene, &mut device);
    assert_eq!(scene.node_count(), 4, "Release must remove every instance node");
    assert_eq!(swarm.instance_count(), 0);
    assert!(swarm.indices().is_empty());
    assert!(swarm.index_buffer().is_none());
    assert!(!swarm.is_ready());
    assert_eq!(device.live_kernels(), 0);
    assert_eq!(device.live_buffers(), 1, "Heap belongs to the scene, not the swarm");

    // Teardown is idempotent.
    swarm.release(&mut scene, &mut device);
    assert_eq!(scene.node_count(), 4);

    // A released swarm can be rebuilt against the same scene.
    let status = swarm.update(&mut scene, &mut device);
    assert!(
        matches!(status, FrameStatus::Constructed { instances: 64 }),
        "Rebuild after release should construct, got {status:?}"
    );
    assert_eq!(scene.node_count(), 4 + 64);
}

#[test]
fn test_template_scan_is_prefix_bound() {
    let mut scene = demo_scene(3);
    let graph = scene.find_graph("Gravity").expect("Demo graph should exist");
    let rock = scene.create_object(graph, "Rock_00");

    let mut device = HeadlessDevice::new();
    let mut swarm = InstanceSwarm::new(test_config(90));
    let status = swarm.update(&mut scene, &mut device);
    assert!(
        matches!(status, FrameStatus::Constructed { instances: 90 }),
        "Expected construction, got {status:?}"
    );

    assert_eq!(
        scene.object(rock).expect("Rock template should exist").instance_count(),
        0,
        "Templates outside the prefix must not receive instances"
    );
    let graph = scene.graph(graph).expect("Graph should be live");
    let total: u32 = graph
        .objects_with_prefix("Asteroid_")
        .iter()
        .map(|&id| scene.object(id).expect("Template should be live").instance_count())
        .sum();
    assert_eq!(total, 90, "Every instance binds some Asteroid_* template");
}
