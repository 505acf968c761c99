//! Swarmgraph CLI - demo driver for the instanced-body simulation.

use swarmgraph::prelude::*;
use std::env;

use std::sync::atomic::{AtomicU8, Ordering};

/// Verbosity level (thread-safe)
const LOG_QUIET: u8 = 0;
const LOG_INFO: u8 = 1;
const LOG_DEBUG: u8 = 2;
const LOG_TRACE: u8 = 3;

static LOG_LEVEL: AtomicU8 = AtomicU8::new(LOG_INFO);

#[inline]
fn log_level() -> u8 {
    LOG_LEVEL.load(Ordering::Relaxed)
}

#[inline]
fn set_log_level(level: u8) {
    LOG_LEVEL.store(level, Ordering::Relaxed);
}

macro_rules! info {
    ($($arg:tt)*) => {
        if log_level() >= LOG_INFO {
            println!("[INFO] {}", format!($($arg)*));
        }
    };
}

macro_rules! debug {
    ($($arg:tt)*) => {
        if log_level() >= LOG_DEBUG {
            println!("[DEBUG] {}", format!($($arg)*));
        }
    };
}

macro_rules! trace {
    ($($arg:tt)*) => {
        if log_level() >= LOG_TRACE {
            println!("[TRACE] {}", format!($($arg)*));
        }
    };
}

fn main() {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut headless = false;
    let mut filtered_args: Vec<&str> = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "-v" | "--verbose" => set_log_level(LOG_DEBUG),
            "-vv" | "--trace" => set_log_level(LOG_TRACE),
            "-q" | "--quiet" => set_log_level(LOG_QUIET),
            "--headless" => headless = true,
            _ => filtered_args.push(arg),
        }
    }

    init_tracing();

    if filtered_args.is_empty() {
        print_help();
        return;
    }

    match filtered_args[0] {
        // Run command - simulate frames
        "run" | "r" => {
            let frames: u64 = parse_or(filtered_args.get(1), 300);
            let instances: u32 = parse_or(filtered_args.get(2), 10_000);
            cmd_run(frames, instances, headless);
        }

        // Hash command - construct once, print the determinism signature
        "hash" => {
            let instances: u32 = parse_or(filtered_args.get(1), 10_000);
            cmd_hash(instances);
        }

        // Info command - build and configuration summary
        "info" | "i" => cmd_info(),

        "help" | "h" | "-h" | "--help" => print_help(),

        other => {
            eprintln!("Unknown command: {}", other);
            print_help();
            std::process::exit(1);
        }
    }
}

fn parse_or<T: std::str::FromStr>(arg: Option<&&str>, default: T) -> T {
    arg.and_then(|s| s.parse().ok()).unwrap_or(default)
}

/// Route library tracing through a fmt layer; RUST_LOG wins over the CLI
/// verbosity flags when set.
fn init_tracing() {
    use tracing_subscriber::prelude::*;

    let default = match log_level() {
        LOG_QUIET => "error",
        LOG_INFO => "info",
        LOG_DEBUG => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    let subscriber = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(filter);
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        debug!("tracing already initialized");
    }
}

/// Procedural stand-in for a loaded scene: one graph, four driver nodes,
/// and a family of template objects.
fn demo_scene(templates: u32) -> Scene {
    let mut scene = Scene::new();
    let graph = scene.create_graph("Gravity");
    for name in ["Sun", "Galaxy", "Earth_Surface", "Earth_Depth"] {
        scene.create_node(graph, name);
    }
    for i in 0..templates {
        scene.create_object(graph, &format!("Asteroid_{:02}", i));
    }
    scene
}

#[cfg(feature = "gpu")]
fn make_device(headless: bool) -> Box<dyn ComputeDevice> {
    if !headless {
        match WgpuDevice::new() {
            Ok(device) => {
                info!("using wgpu adapter '{}'", device.name());
                return Box::new(device);
            }
            Err(err) => info!("wgpu unavailable ({}), falling back to headless", err),
        }
    }
    Box::new(HeadlessDevice::new())
}

#[cfg(not(feature = "gpu"))]
fn make_device(_headless: bool) -> Box<dyn ComputeDevice> {
    Box::new(HeadlessDevice::new())
}

fn cmd_run(frames: u64, instances: u32, headless: bool) {
    info!("simulating {} frames with {} instances", frames, instances);

    let config = SwarmConfig {
        instance_count: instances,
        ..Default::default()
    };
    let mut scene = demo_scene(8);
    let mut device = make_device(headless);

    let mut bodies = create_body(BodyBackend::Kinematic, &config.graph, config.drivers.clone());
    if let Err(err) = bodies.create(&mut scene) {
        eprintln!("Body setup error: {}", err);
        std::process::exit(1);
    }

    let mut swarm = InstanceSwarm::new(config);
    let mut deferred = 0u64;
    for frame in 0..frames {
        scene.set_time(frame as f64 / 60.0);
        bodies.update();
        bodies.update_scene(&mut scene);
        match swarm.update(&mut scene, device.as_mut()) {
            FrameStatus::Constructed { instances: built } => {
                info!(
                    "frame {}: constructed {} instances (hash {:#010x})",
                    frame,
                    built,
                    swarm.motion_hash()
                );
            }
            FrameStatus::Simulated { .. } => trace!("frame {}: simulated", frame),
            FrameStatus::Deferred(err) => {
                deferred += 1;
                debug!("frame {}: deferred ({})", frame, err);
            }
            FrameStatus::Idle => {}
        }
    }

    let stats = scene.stats();
    info!(
        "simulated {} frames on '{}' ({} deferred)",
        swarm.frames(),
        device.name(),
        deferred
    );
    info!(
        "scene: {} nodes, {} commits, {} spatial passes",
        scene.node_count(),
        stats.commits,
        stats.spatial_updates
    );
    if let Some((min, max)) = stats.bounds {
        info!(
            "bounds: [{:.1} {:.1} {:.1}] .. [{:.1} {:.1} {:.1}]",
            min.x, min.y, min.z, max.x, max.y, max.z
        );
    }

    swarm.release(&mut scene, device.as_mut());
    scene.release_gpu(device.as_mut());
    debug!(
        "released: {} live buffers, {} live kernels",
        device.live_buffers(),
        device.live_kernels()
    );
}

fn cmd_hash(instances: u32) {
    let config = SwarmConfig {
        instance_count: instances,
        ..Default::default()
    };
    let mut scene = demo_scene(8);
    let mut device = HeadlessDevice::new();
    let mut swarm = InstanceSwarm::new(config);
    match swarm.update(&mut scene, &mut device) {
        FrameStatus::Constructed { instances: built } => {
            println!("instances:   {}", built);
            println!("base:        {}", swarm.indices().first().copied().unwrap_or(0));
            println!("motion hash: {:#010x}", swarm.motion_hash());
        }
        FrameStatus::Deferred(err) => {
            eprintln!("Construction error: {}", err);
            std::process::exit(1);
        }
        _ => {}
    }
}

fn cmd_info() {
    println!(
        "swarmgraph {} ({} {})",
        env!("CARGO_PKG_VERSION"),
        env!("SWARMGRAPH_BUILD_DATE"),
        env!("SWARMGRAPH_BUILD_TIME")
    );
    #[cfg(feature = "gpu")]
    println!("gpu backend: wgpu (pass --headless to bypass)");
    #[cfg(not(feature = "gpu"))]
    println!("gpu backend: headless only (rebuild with: cargo build --features gpu)");

    let config = SwarmConfig::default();
    println!();
    println!("DEFAULTS:");
    println!("    graph:      {}", config.graph);
    println!(
        "    drivers:    {}, {}, {}, {}",
        config.drivers.root,
        config.drivers.environment,
        config.drivers.surface,
        config.drivers.depth
    );
    println!("    templates:  {}*", config.template_prefix);
    println!("    instances:  {}", config.instance_count);
    println!("    seed:       {}", config.seed);
    println!("    shader:     {}", config.shader.display());
    println!("    workgroup:  {}", config.workgroup_size);
}

fn print_help() {
    println!("swarmgraph - instanced-body simulation demo");
    println!();
    println!("USAGE:");
    println!("    swarmgraph [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    r, run  [frames] [instances]   Simulate frames (default 300 x 10000)");
    println!("    hash    [instances]            Construct once, print the motion hash");
    println!("    i, info                        Show build and default configuration");
    println!("    h, help                        Show this help");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose    Show debug output");
    println!("    -vv, --trace     Show trace output (very verbose)");
    println!("    -q, --quiet      Suppress all output");
    println!("    --headless       Use the in-memory device even with GPU support built");
    println!();
    println!("EXAMPLES:");
    println!("    swarmgraph run                        # 300 frames, 10000 instances");
    println!("    swarmgraph run 600 200000             # full-size swarm, 10 seconds");
    println!("    swarmgraph --headless run 60 1000     # no GPU required");
    println!("    swarmgraph hash 200000                # determinism signature");
    println!("    swarmgraph -v run                     # verbose run");
    println!();
    println!("NOTES:");
    println!("    - RUST_LOG overrides the verbosity flags for library logging");
    println!("    - The demo scene is procedural; no assets are required");
}
