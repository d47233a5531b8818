use assert2::debug_assert;

use crate::{
    geometry::{LocalVertex, Transform, Triangle, WorldBox, WorldPoint},
    mesh::Mesh,
};

use super::{BuildSettings, BuildStatistics, Bvh, BvhTriangle, NodeIdx, NodeLinks, TriangleIdx};

/// Local to world transforms of the instances being ingested.
#[derive(Copy, Clone, Debug)]
pub enum InstanceTransforms<'a> {
    /// All instances use the same transform.
    Shared(&'a Transform),
    /// One transform per instance, must be at least as long as the instance count.
    PerInstance(&'a [Transform]),
}

impl InstanceTransforms<'_> {
    fn get(&self, instance: usize) -> &Transform {
        match self {
            InstanceTransforms::Shared(m) => m,
            InstanceTransforms::PerInstance(ms) => &ms[instance],
        }
    }
}

impl Bvh {
    /// Transforms all instances of the mesh into the triangle array, resets the triangle
    /// permutation to identity and clears the tree. `build` must be called before the tree
    /// is used.
    ///
    /// The total triangle count (`instance_count * mesh.triangle_count()`) must not exceed
    /// the capacity.
    pub fn init(&mut self, instance_count: usize, mesh: &Mesh, transforms: InstanceTransforms) {
        self.ingest(instance_count, mesh, transforms);

        self.reset_permutation();
        self.nodes_used = 1;
        self.statistics = BuildStatistics::default();
        self.links[NodeIdx::ROOT] = NodeLinks::new_leaf(0, self.triangle_count(), None);
        self.bounds[NodeIdx::ROOT] = WorldBox::empty();
    }

    /// Recomputes the triangle positions and refits the existing tree to them.
    ///
    /// Topology and the triangle permutation are kept, so the instance count and the mesh
    /// topology must match the last `init`.
    pub fn update(&mut self, instance_count: usize, mesh: &Mesh, transforms: InstanceTransforms) {
        debug_assert!(instance_count == self.instance_count);
        debug_assert!(mesh.triangle_count() == self.triangles_per_instance);

        self.ingest(instance_count, mesh, transforms);
        self.refit();
    }

    /// Full rebuild from scratch, `init` followed by `build`.
    pub fn rebuild(
        &mut self,
        instance_count: usize,
        mesh: &Mesh,
        transforms: InstanceTransforms,
        settings: &BuildSettings,
    ) {
        self.init(instance_count, mesh, transforms);
        self.build(settings);
    }

    fn ingest(&mut self, instance_count: usize, mesh: &Mesh, transforms: InstanceTransforms) {
        let triangles_per_instance = mesh.triangle_count();
        debug_assert!(triangles_per_instance * instance_count <= self.triangle_capacity());
        if let InstanceTransforms::PerInstance(ms) = transforms {
            debug_assert!(ms.len() >= instance_count);
        }

        self.triangles_per_instance = triangles_per_instance;
        self.instance_count = instance_count;

        for instance in 0..instance_count {
            let m = transforms.get(instance);
            for (local, vertex_indices) in mesh.indices().iter().enumerate() {
                let id = TriangleIdx::from_usize(triangles_per_instance * instance + local);
                let [a, b, c] = vertex_indices.map(|i| to_world(m, &mesh.vertices()[i as usize]));
                self.triangles[id] = BvhTriangle::new(Triangle::new(a, b, c));
            }
        }

        log::trace!(
            "Ingested {} instances x {} triangles",
            instance_count,
            triangles_per_instance
        );
    }
}

fn to_world(m: &Transform, v: &LocalVertex) -> WorldPoint {
    WorldPoint::from((m * v).xyz())
}
