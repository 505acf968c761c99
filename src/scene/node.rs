//! Scene-graph nodes.

use super::graph::GraphId;
use super::motion;
use super::object::ObjectId;

/// Handle to a node owned by a [`Scene`](super::Scene).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Raw arena index.
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Opaque slot handle into the scene's shared transform storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeAddress(pub(crate) u32);

impl NodeAddress {
    /// Reconstruct an address from a raw slot, as read back from an
    /// instance index buffer.
    pub fn from_raw(slot: u32) -> Self {
        Self(slot)
    }

    /// Raw storage slot, as consumed by compute kernels.
    pub fn value(self) -> u32 {
        self.0
    }
}

/// One scene-graph node: a named driver or an unnamed template instance.
///
/// A node's world transform lives in the scene's shared storage heap at
/// [`Node::address`], not in the node itself.
#[derive(Debug, Clone)]
pub struct Node {
    graph: GraphId,
    name: Option<String>,
    object: Option<ObjectId>,
    address: NodeAddress,
    motion_hash: u32,
    internal: bool,
}

impl Node {
    pub(crate) fn new(
        graph: GraphId,
        name: Option<String>,
        object: Option<ObjectId>,
        address: NodeAddress,
    ) -> Self {
        Self {
            graph,
            name,
            object,
            address,
            motion_hash: 0,
            internal: false,
        }
    }

    /// Owning graph.
    pub fn graph(&self) -> GraphId {
        self.graph
    }

    /// Node name; instance nodes are unnamed.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Template object this node instantiates, if any.
    pub fn object(&self) -> Option<ObjectId> {
        self.object
    }

    /// Slot in the shared transform storage.
    pub fn address(&self) -> NodeAddress {
        self.address
    }

    /// Last motion hash threaded through this node.
    pub fn motion_hash(&self) -> u32 {
        self.motion_hash
    }

    /// Internal nodes are excluded from normal scene export/serialization.
    pub fn is_internal(&self) -> bool {
        self.internal
    }

    /// Mark or unmark this node as internally owned.
    pub fn set_internal(&mut self, internal: bool) {
        self.internal = internal;
    }

    /// Thread the running motion hash through this node.
    ///
    /// Mixes the node's identity into `hash`, stores the result for later
    /// change detection, and returns it for the next node in the chain.
    pub fn thread_motion_hash(&mut self, hash: u32) -> u32 {
        let h = motion::mix(hash, self.address.0);
        self.motion_hash = h;
        h
    }
}
