use crate::util::Stats;

use super::{Bvh, NodeIdx};

/// Diagnostics collected while building, reset at the start of every build.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BuildStatistics {
    /// Depth of each leaf, the root has depth 0.
    pub leaf_depth: Stats,
    /// Triangle count of each leaf.
    pub leaf_size: Stats,
}

impl BuildStatistics {
    pub fn leafs(&self) -> usize {
        self.leaf_depth.count
    }

    /// Returns None if no leaf was finalized yet.
    pub fn depth_min(&self) -> Option<usize> {
        (!self.leaf_depth.is_empty()).then_some(self.leaf_depth.min)
    }

    pub fn depth_max(&self) -> Option<usize> {
        (!self.leaf_depth.is_empty()).then_some(self.leaf_depth.max)
    }
}

impl Bvh {
    /// Number of parent links between the node and the root.
    pub fn depth(&self, mut node: NodeIdx) -> usize {
        let mut d = 0;
        while let Some(parent) = self.links[node].parent() {
            node = parent;
            d += 1;
        }
        d
    }

    pub(super) fn update_depths(&mut self, leaf: NodeIdx) {
        let depth = self.depth(leaf);
        let size = self.node_triangles(leaf).len();
        self.statistics.leaf_depth.add_sample(depth);
        self.statistics.leaf_size.add_sample(size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bvh::{BuildSettings, NodeKind, SplitStrategy, test_util::cube_scene};
    use crate::geometry::WorldVector;
    use assert2::assert;

    #[test]
    fn empty_statistics() {
        let stats = BuildStatistics::default();
        assert!(stats.leafs() == 0);
        assert!(stats.depth_min() == None);
        assert!(stats.depth_max() == None);
    }

    #[test]
    fn depth_follows_parent_links() {
        let mut bvh = cube_scene(&[WorldVector::zeros()]);
        bvh.build(
            &BuildSettings::builder()
                .strategy(SplitStrategy::Dichotomy)
                .triangles_per_leaf(1)
                .build(),
        );

        assert!(bvh.depth(NodeIdx::ROOT) == 0);
        for i in 1..bvh.nodes_used() {
            let node = NodeIdx::from_usize(i);
            let parent = bvh.node_links(node).parent().unwrap();
            assert!(bvh.depth(node) == bvh.depth(parent) + 1);
        }

        let leaf_depths: Vec<usize> = (0..bvh.nodes_used())
            .map(NodeIdx::from_usize)
            .filter(|n| matches!(bvh.node_links(*n).decode(), NodeKind::Leaf { .. }))
            .map(|n| bvh.depth(n))
            .collect();
        let stats = bvh.statistics();
        assert!(stats.leafs() == leaf_depths.len());
        assert!(stats.depth_min() == leaf_depths.iter().copied().min());
        assert!(stats.depth_max() == leaf_depths.iter().copied().max());
        assert!(stats.leaf_size.count == stats.leafs());
    }

    #[test]
    fn statistics_reset_on_rebuild() {
        let mut bvh = cube_scene(&[WorldVector::zeros(), WorldVector::new(2.0, 0.0, 0.0)]);
        let settings = BuildSettings::default();
        bvh.build(&settings);
        let first = bvh.statistics().clone();
        bvh.build(&settings);
        assert!(bvh.statistics() == &first);
    }
}
