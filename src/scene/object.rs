//! Template objects.

use super::graph::GraphId;

/// Handle to a template object owned by a [`Scene`](super::Scene).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(pub(crate) u32);

impl ObjectId {
    /// Raw arena index.
    pub fn index(self) -> u32 {
        self.0
    }
}

/// A named template shape that instance nodes bind to.
///
/// The scene tracks how many live nodes reference each template; the count
/// is refreshed by the object-tree pass, not on every node mutation.
#[derive(Debug, Clone)]
pub struct ObjectTemplate {
    graph: GraphId,
    name: String,
    instance_count: u32,
}

impl ObjectTemplate {
    pub(crate) fn new(graph: GraphId, name: String) -> Self {
        Self {
            graph,
            name,
            instance_count: 0,
        }
    }

    /// Owning graph.
    pub fn graph(&self) -> GraphId {
        self.graph
    }

    /// Template name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Live instances bound to this template, as of the last object-tree
    /// update.
    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    pub(crate) fn set_instance_count(&mut self, count: u32) {
        self.instance_count = count;
    }
}
