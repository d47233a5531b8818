mod building;
mod gpu;
mod ingestion;
mod printing;
mod refit;
mod settings;
pub mod split;
mod statistics;
mod traversal;

use std::ops::Range;

use bytemuck::{Pod, Zeroable};
use index_vec::IndexVec;

use crate::geometry::{Triangle, WorldBox, WorldPoint};

pub use gpu::{GpuAabb, GpuBuffers, GpuTriangleIndex};
pub use ingestion::InstanceTransforms;
pub use printing::TreeDump;
pub use settings::{BuildSettings, MAX_SAH_STEPS, SettingsError, SplitStrategy};
pub use statistics::BuildStatistics;
pub use traversal::Hit;

/// Bounding volume hierarchy over the world space triangles of all instances of a mesh.
///
/// All storage is allocated up front for a fixed maximum triangle count.
/// Triangles are addressed by a global id `triangles_per_instance * instance + local_triangle`
/// which stays stable across rebuilds; only the permutation in `triangle_indices` is reordered.
#[derive(Clone, Debug)]
pub struct Bvh {
    triangles: IndexVec<TriangleIdx, BvhTriangle>,
    triangle_indices: Vec<TriangleIdx>,

    bounds: IndexVec<NodeIdx, WorldBox>,
    links: IndexVec<NodeIdx, NodeLinks>,
    nodes_used: usize,

    triangles_per_instance: usize,
    instance_count: usize,

    statistics: BuildStatistics,
}

/// World space triangle with precomputed centroid.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BvhTriangle {
    pub vertices: Triangle<WorldPoint>,
    pub centroid: WorldPoint,
}

impl BvhTriangle {
    pub fn new(vertices: Triangle<WorldPoint>) -> Self {
        BvhTriangle {
            centroid: vertices.centroid(),
            vertices,
        }
    }
}

impl Default for BvhTriangle {
    fn default() -> Self {
        let o = WorldPoint::origin();
        BvhTriangle::new(Triangle::new(o, o, o))
    }
}

index_vec::define_index_type! {
    pub struct NodeIdx = u32;
    MAX_INDEX = i32::MAX as usize;
}

index_vec::define_index_type! {
    pub struct TriangleIdx = u32;
    MAX_INDEX = i32::MAX as usize;
}

impl NodeIdx {
    pub const ROOT: NodeIdx = NodeIdx::from_raw_unchecked(0);
}

/// Linkage of a single node, in the layout consumed by the GPU traversal.
///
/// Inner nodes have `count == 0` and their children stored at `left` and `left + 1`.
/// Leaves own `count` triangles starting at `first` in the triangle index permutation.
/// Unused fields and the parent of the root are `NULL`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct NodeLinks {
    pub left: i32,
    pub first: i32,
    pub count: i32,
    pub parent: i32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Inner { left: NodeIdx },
    Leaf { triangles: Range<usize> },
}

impl NodeLinks {
    pub const NULL: i32 = -1;

    pub fn new_leaf(first: usize, count: usize, parent: Option<NodeIdx>) -> Self {
        NodeLinks {
            left: Self::NULL,
            first: first as i32,
            count: count as i32,
            parent: Self::encode_parent(parent),
        }
    }

    pub fn new_inner(left: NodeIdx, parent: Option<NodeIdx>) -> Self {
        NodeLinks {
            left: left.raw() as i32,
            first: Self::NULL,
            count: 0,
            parent: Self::encode_parent(parent),
        }
    }

    /// A zero count normally marks an inner node, except for the root of an empty tree
    /// which has no children to point to.
    pub fn decode(&self) -> NodeKind {
        if self.count > 0 || self.left == Self::NULL {
            let first = self.first.max(0) as usize;
            NodeKind::Leaf {
                triangles: first..(first + self.count.max(0) as usize),
            }
        } else {
            NodeKind::Inner {
                left: NodeIdx::from_usize(self.left as usize),
            }
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.decode(), NodeKind::Leaf { .. })
    }

    pub fn parent(&self) -> Option<NodeIdx> {
        (self.parent != Self::NULL).then(|| NodeIdx::from_usize(self.parent as usize))
    }

    fn encode_parent(parent: Option<NodeIdx>) -> i32 {
        parent.map_or(Self::NULL, |p| p.raw() as i32)
    }
}

impl Default for NodeLinks {
    fn default() -> Self {
        NodeLinks::new_leaf(0, 0, None)
    }
}

impl Bvh {
    /// Allocates storage for up to `max_triangles` triangles in total (over all instances).
    pub fn with_capacity(max_triangles: usize) -> Bvh {
        let max_nodes = Self::node_capacity_for(max_triangles);
        Bvh {
            triangles: IndexVec::from_vec(vec![BvhTriangle::default(); max_triangles]),
            triangle_indices: (0..max_triangles).map(TriangleIdx::from_usize).collect(),

            bounds: IndexVec::from_vec(vec![WorldBox::empty(); max_nodes]),
            links: IndexVec::from_vec(vec![NodeLinks::default(); max_nodes]),
            nodes_used: 1,

            triangles_per_instance: 0,
            instance_count: 0,

            statistics: BuildStatistics::default(),
        }
    }

    /// Binary tree split down to single triangles has at most 2N - 1 nodes.
    /// There is always room for at least the root.
    pub fn node_capacity_for(max_triangles: usize) -> usize {
        (2 * max_triangles).saturating_sub(1).max(1)
    }

    pub fn triangle_capacity(&self) -> usize {
        self.triangles.len()
    }

    pub fn node_capacity(&self) -> usize {
        self.links.len()
    }

    /// Number of triangles covered by the last ingestion.
    pub fn triangle_count(&self) -> usize {
        self.triangles_per_instance * self.instance_count
    }

    pub fn triangles_per_instance(&self) -> usize {
        self.triangles_per_instance
    }

    pub fn instance_count(&self) -> usize {
        self.instance_count
    }

    pub fn nodes_used(&self) -> usize {
        self.nodes_used
    }

    pub fn triangle(&self, id: TriangleIdx) -> &BvhTriangle {
        &self.triangles[id]
    }

    /// Active part of the triangle array, indexed by triangle id.
    pub fn triangles(&self) -> &[BvhTriangle] {
        &self.triangles.as_raw_slice()[..self.triangle_count()]
    }

    /// Active part of the triangle id permutation.
    pub fn triangle_indices(&self) -> &[TriangleIdx] {
        &self.triangle_indices[..self.triangle_count()]
    }

    /// Bounds of the used nodes, index aligned with `links()`.
    pub fn bounds(&self) -> &[WorldBox] {
        &self.bounds.as_raw_slice()[..self.nodes_used]
    }

    pub fn links(&self) -> &[NodeLinks] {
        &self.links.as_raw_slice()[..self.nodes_used]
    }

    pub fn node_bounds(&self, node: NodeIdx) -> &WorldBox {
        &self.bounds[node]
    }

    pub fn node_links(&self, node: NodeIdx) -> &NodeLinks {
        &self.links[node]
    }

    /// Triangle ids owned by a node, in permutation order.
    pub fn node_triangles(&self, node: NodeIdx) -> &[TriangleIdx] {
        &self.triangle_indices[self.node_range(node)]
    }

    pub fn statistics(&self) -> &BuildStatistics {
        &self.statistics
    }

    /// Range of the permutation array owned by a node, both for leaves and for inner nodes.
    fn node_range(&self, node: NodeIdx) -> Range<usize> {
        match self.links[node].decode() {
            NodeKind::Leaf { triangles } => triangles,
            NodeKind::Inner { left } => {
                let start = self.node_range(left).start;
                let end = self.node_range(left + 1).end;
                start..end
            }
        }
    }
}
