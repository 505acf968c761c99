//! Named graphs: node and object namespaces inside a scene.

use smallvec::SmallVec;

use super::node::NodeId;
use super::object::ObjectId;
use super::registry::NameRegistry;

/// Handle to a graph owned by a [`Scene`](super::Scene).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GraphId(pub(crate) u32);

/// One graph: a namespace of driver nodes and template objects.
///
/// Instance nodes created in bulk are unnamed and never appear in the
/// registries; only externally addressable handles are registered.
#[derive(Debug)]
pub struct Graph {
    name: String,
    nodes: NameRegistry,
    objects: NameRegistry,
}

impl Graph {
    pub(crate) fn new(name: String) -> Self {
        Self {
            name,
            nodes: NameRegistry::new(),
            objects: NameRegistry::new(),
        }
    }

    /// Graph name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a named node.
    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.nodes.get(name).map(NodeId)
    }

    /// Look up a template object by exact name.
    pub fn find_object(&self, name: &str) -> Option<ObjectId> {
        self.objects.get(name).map(ObjectId)
    }

    /// Ordered list of template objects whose names start with `prefix`.
    pub fn objects_with_prefix(&self, prefix: &str) -> SmallVec<[ObjectId; 8]> {
        self.objects
            .with_prefix(prefix)
            .into_iter()
            .map(ObjectId)
            .collect()
    }

    /// Number of registered (named) nodes.
    pub fn named_node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of registered template objects.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub(crate) fn register_node(&mut self, name: &str, id: NodeId) {
        self.nodes.insert(name, id.0);
    }

    pub(crate) fn unregister_node(&mut self, name: &str) {
        self.nodes.remove(name);
    }

    pub(crate) fn register_object(&mut self, name: &str, id: ObjectId) {
        self.objects.insert(name, id.0);
    }
}
