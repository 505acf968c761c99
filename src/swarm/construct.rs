//! Swarm construction.
//!
//! Builds the whole instanced family in one shot: resolve the graph, driver
//! chain, and template family, thread the motion hash through drivers and
//! instances, then create the GPU resources. On any failure `self` is left
//! partially filled and the caller rolls back through
//! [`InstanceSwarm::release`], so a deferred frame leaks nothing.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::InstanceSwarm;
use crate::gpu::{shader, ComputeDevice, KernelDesc};
use crate::scene::Scene;
use crate::util::{Error, Result};

/// Upper bound on one template family, inherited from the 16-bit suffix of
/// the template naming scheme.
const MAX_TEMPLATE_FAMILY: usize = 65_535;

impl InstanceSwarm {
    #[tracing::instrument(skip_all, fields(graph = %self.config.graph))]
    pub(super) fn construct(
        &mut self,
        scene: &mut Scene,
        device: &mut dyn ComputeDevice,
    ) -> Result<()> {
        let graph_id = scene.require_graph(&self.config.graph)?;

        // Resolve the whole driver chain before creating anything, so a
        // misnamed scene defers construction with the scene untouched. The
        // chain root is validated here but stays out of the hash; its motion
        // reaches the kernel through the storage heap like any other node.
        let chain = self.config.drivers.clone();
        scene.require_node(graph_id, &chain.root)?;
        let drivers = [
            scene.require_node(graph_id, &chain.environment)?,
            scene.require_node(graph_id, &chain.surface)?,
            scene.require_node(graph_id, &chain.depth)?,
        ];

        let mut templates = scene
            .graph(graph_id)
            .map(|g| g.objects_with_prefix(&self.config.template_prefix))
            .unwrap_or_default();
        if templates.is_empty() {
            return Err(Error::resolution(format!(
                "no '{}*' templates in graph '{}'",
                self.config.template_prefix, self.config.graph
            )));
        }
        if templates.len() > MAX_TEMPLATE_FAMILY {
            tracing::warn!(
                found = templates.len(),
                limit = MAX_TEMPLATE_FAMILY,
                "template family exceeds the addressing limit, truncating"
            );
            templates.truncate(MAX_TEMPLATE_FAMILY);
        }

        // Thread the motion hash through the drivers in chain order.
        let mut hash = 0u32;
        for id in drivers {
            let node = scene
                .node_mut(id)
                .ok_or_else(|| Error::resolution("driver node vanished during construction"))?;
            hash = node.thread_motion_hash(hash);
        }

        // Instance creation order defines index-buffer slot order; seeded
        // template assignment keeps the layout reproducible run to run. The
        // hash continues from the drivers into the instances, slot by slot.
        let count = self.config.instance_count as usize;
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        self.nodes.reserve(count);
        self.indices.reserve(count);
        for _ in 0..count {
            let template = templates[rng.gen_range(0..templates.len())];
            let id = scene.create_node_object(graph_id, template);
            self.nodes.push(id);
            let node = scene
                .node_mut(id)
                .ok_or_else(|| Error::resolution("instance node vanished during construction"))?;
            self.indices.push(node.address().value());
            hash = node.thread_motion_hash(hash);
            node.set_internal(true);
        }

        // One commit makes every threaded hash visible before first use.
        scene.commit(device)?;

        let index_buffer =
            device.create_storage_buffer("swarm instance indices", bytemuck::cast_slice(&self.indices))?;
        self.index_buffer = Some(index_buffer);

        let workgroup = self.config.workgroup_size.to_string();
        let defines = [
            ("COMPUTE_SHADER", "1"),
            ("WORKGROUP_SIZE", workgroup.as_str()),
        ];
        let source = shader::load(&self.config.shader, &defines)?;
        let kernel = device.create_kernel(&KernelDesc {
            label: "instance transform",
            source: &source,
            entry_point: "main",
            uniforms: 1,
            storages: 2,
            workgroup_size: self.config.workgroup_size,
        })?;
        self.kernel = Some(kernel);

        self.instance_count = self.config.instance_count;
        self.base = self.indices.first().copied().unwrap_or(0);
        self.motion_hash = hash;

        tracing::info!(
            instances = self.instance_count,
            templates = templates.len(),
            base = self.base,
            hash = format_args!("{hash:#010x}"),
            "constructed instance swarm"
        );
        Ok(())
    }
}
