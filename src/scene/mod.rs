//! In-memory host scene graph.
//!
//! This module is the concrete form of the collaborator contract the swarm
//! subsystem consumes: named graphs, driver nodes, template objects, a shared
//! transform storage heap with a GPU mirror, a scene clock, and the
//! tree-propagation entry points ([`Scene::update_spatial_tree`],
//! [`Scene::update_object_tree`], [`Scene::commit`]). It is deliberately not
//! a rendering engine: no meshes, no serialization, no hierarchy solve.
//! Just enough scene for procedurally generated content to live in.
//!
//! - [`Scene`] - graphs, nodes, objects, heap, clock, stats
//! - [`Graph`] - per-graph name registries
//! - [`Node`] / [`NodeAddress`] - nodes and their storage slots
//! - [`ObjectTemplate`] - template shapes instances bind to
//! - [`NameRegistry`] - ordered name → handle mapping with prefix queries
//! - [`motion`] - motion-hash mixing

mod graph;
pub mod motion;
mod node;
mod object;
mod registry;
mod storage;

pub use graph::{Graph, GraphId};
pub use node::{Node, NodeAddress, NodeId};
pub use object::{ObjectId, ObjectTemplate};
pub use registry::NameRegistry;
pub use storage::TransformHeap;

use glam::{Mat4, Vec3};
use rayon::prelude::*;

use crate::gpu::{BufferId, ComputeDevice};
use crate::util::{Error, Result};

/// Observable pass counters and sequence stamps.
///
/// Each propagation pass takes the next value of a scene-wide sequence, so
/// callers can assert pass ordering (spatial before object before commit)
/// without instrumenting the scene.
#[derive(Debug, Default, Clone)]
pub struct SceneStats {
    pub spatial_updates: u64,
    pub object_updates: u64,
    pub commits: u64,
    pub last_spatial_seq: u64,
    pub last_object_seq: u64,
    pub last_commit_seq: u64,
    /// World-space bounds over live node positions, from the last spatial
    /// pass. `None` until a pass has seen at least one node.
    pub bounds: Option<(Vec3, Vec3)>,
}

/// The scene: graphs, node/object arenas, shared transform storage, clock.
#[derive(Debug, Default)]
pub struct Scene {
    graphs: Vec<Graph>,
    graph_names: NameRegistry,
    nodes: Vec<Option<Node>>,
    free_nodes: Vec<u32>,
    objects: Vec<ObjectTemplate>,
    heap: TransformHeap,
    time: f64,
    seq: u64,
    stats: SceneStats,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Graphs
    // ========================================================================

    /// Create a graph. Re-using a name rebinds it to the new graph.
    pub fn create_graph(&mut self, name: &str) -> GraphId {
        let id = GraphId(self.graphs.len() as u32);
        self.graphs.push(Graph::new(name.to_string()));
        self.graph_names.insert(name, id.0);
        id
    }

    /// Look up a graph by name.
    pub fn find_graph(&self, name: &str) -> Option<GraphId> {
        self.graph_names.get(name).map(GraphId)
    }

    /// Access a graph.
    pub fn graph(&self, id: GraphId) -> Option<&Graph> {
        self.graphs.get(id.0 as usize)
    }

    // ========================================================================
    // Nodes and objects
    // ========================================================================

    /// Create a named node in `graph` with an identity transform.
    pub fn create_node(&mut self, graph: GraphId, name: &str) -> NodeId {
        let address = NodeAddress(self.heap.allocate());
        let id = self.push_node(Node::new(
            graph,
            Some(name.to_string()),
            None,
            address,
        ));
        if let Some(g) = self.graphs.get_mut(graph.0 as usize) {
            g.register_node(name, id);
        }
        id
    }

    /// Create an unnamed instance node bound to a template object.
    pub fn create_node_object(&mut self, graph: GraphId, object: ObjectId) -> NodeId {
        let address = NodeAddress(self.heap.allocate());
        self.push_node(Node::new(graph, None, Some(object), address))
    }

    /// Register a template object in `graph`.
    pub fn create_object(&mut self, graph: GraphId, name: &str) -> ObjectId {
        let id = ObjectId(self.objects.len() as u32);
        self.objects.push(ObjectTemplate::new(graph, name.to_string()));
        if let Some(g) = self.graphs.get_mut(graph.0 as usize) {
            g.register_object(name, id);
        }
        id
    }

    /// Look up a named node within a graph.
    pub fn find_node(&self, graph: GraphId, name: &str) -> Option<NodeId> {
        self.graph(graph)?.find_node(name)
    }

    /// Look up a template object within a graph.
    pub fn find_object(&self, graph: GraphId, name: &str) -> Option<ObjectId> {
        self.graph(graph)?.find_object(name)
    }

    /// Like [`Scene::find_graph`], failing with a resolution error.
    pub fn require_graph(&self, name: &str) -> Result<GraphId> {
        self.find_graph(name)
            .ok_or_else(|| Error::resolution(format!("graph '{name}' not found")))
    }

    /// Like [`Scene::find_node`], failing with a resolution error that
    /// names both the node and the graph.
    pub fn require_node(&self, graph: GraphId, name: &str) -> Result<NodeId> {
        self.find_node(graph, name).ok_or_else(|| {
            let graph_name = self.graph(graph).map(|g| g.name()).unwrap_or("<dead>");
            Error::resolution(format!("node '{name}' not found in graph '{graph_name}'"))
        })
    }

    /// Access a node.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)?.as_ref()
    }

    /// Mutable access to a node.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0 as usize)?.as_mut()
    }

    /// Access a template object.
    pub fn object(&self, id: ObjectId) -> Option<&ObjectTemplate> {
        self.objects.get(id.0 as usize)
    }

    /// Detach a node: release its storage slot and name binding. The slot
    /// instantly becomes reusable; the id goes dangling.
    pub fn remove_node(&mut self, id: NodeId) {
        let Some(slot) = self.nodes.get_mut(id.0 as usize) else {
            return;
        };
        let Some(node) = slot.take() else {
            return;
        };
        self.heap.release(node.address().value());
        if let Some(name) = node.name() {
            if let Some(g) = self.graphs.get_mut(node.graph().0 as usize) {
                g.unregister_node(name);
            }
        }
        self.free_nodes.push(id.0);
    }

    /// Live node count.
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free_nodes.len()
    }

    /// Registered template count.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Reverse lookup: which live node occupies a storage slot.
    pub fn node_at_address(&self, address: NodeAddress) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.as_ref().is_some_and(|n| n.address() == address))
            .map(|i| NodeId(i as u32))
    }

    // ========================================================================
    // Transforms and time
    // ========================================================================

    /// A node's world transform from the staging heap. Note that after a
    /// compute dispatch the GPU mirror is authoritative; this reflects
    /// host-side writes only.
    pub fn node_transform(&self, id: NodeId) -> Option<Mat4> {
        Some(self.heap.get(self.node(id)?.address().value()))
    }

    /// Write a node's world transform. Returns false for a dangling id.
    pub fn set_node_transform(&mut self, id: NodeId, transform: Mat4) -> bool {
        let Some(node) = self.node(id) else {
            return false;
        };
        let slot = node.address().value();
        self.heap.set(slot, transform);
        true
    }

    /// Current scene time in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Advance (or rewind) the scene clock.
    pub fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    // ========================================================================
    // Propagation passes
    // ========================================================================

    /// Recompute world bounds over live nodes (the bounding/light tree pass).
    pub fn update_spatial_tree(&mut self) {
        let heap = &self.heap;
        let bounds = self
            .nodes
            .par_iter()
            .filter_map(|slot| slot.as_ref())
            .map(|n| {
                let p = heap.get(n.address().value()).w_axis.truncate();
                (p, p)
            })
            .reduce_with(|a, b| (a.0.min(b.0), a.1.max(b.1)));

        self.stats.bounds = bounds;
        self.stats.spatial_updates += 1;
        self.stats.last_spatial_seq = self.next_seq();
    }

    /// Refresh per-template instance counts (the object tree pass).
    pub fn update_object_tree(&mut self) {
        let mut counts = vec![0u32; self.objects.len()];
        for node in self.nodes.iter().flatten() {
            if let Some(obj) = node.object() {
                counts[obj.0 as usize] += 1;
            }
        }
        for (object, count) in self.objects.iter_mut().zip(counts) {
            object.set_instance_count(count);
        }
        self.stats.object_updates += 1;
        self.stats.last_object_seq = self.next_seq();
    }

    /// Commit the scene: flush pending host-side transform writes to the GPU
    /// mirror and stamp the pass sequence.
    pub fn commit(&mut self, device: &mut dyn ComputeDevice) -> Result<()> {
        self.heap.sync(device)?;
        self.stats.commits += 1;
        self.stats.last_commit_seq = self.next_seq();
        tracing::trace!(commits = self.stats.commits, "scene commit");
        Ok(())
    }

    /// The shared transform storage buffer, synced and ready to bind.
    /// Fails on an empty heap: there is nothing to bind a kernel to.
    pub fn storage_buffer(&mut self, device: &mut dyn ComputeDevice) -> Result<BufferId> {
        self.heap
            .sync(device)?
            .ok_or_else(|| Error::resource("transform heap is empty, no storage to bind"))
    }

    /// Drop GPU-side scene resources. Safe to call repeatedly.
    pub fn release_gpu(&mut self, device: &mut dyn ComputeDevice) {
        self.heap.release_gpu(device);
    }

    /// Pass counters and bounds.
    pub fn stats(&self) -> &SceneStats {
        &self.stats
    }

    /// Storage heap view (slot count, raw bytes).
    pub fn heap(&self) -> &TransformHeap {
        &self.heap
    }

    fn push_node(&mut self, node: Node) -> NodeId {
        match self.free_nodes.pop() {
            Some(index) => {
                self.nodes[index as usize] = Some(node);
                NodeId(index)
            }
            None => {
                self.nodes.push(Some(node));
                NodeId((self.nodes.len() - 1) as u32)
            }
        }
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }
}
