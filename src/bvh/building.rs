use std::ops::Range;

use assert2::debug_assert;

use super::{
    BuildSettings, BuildStatistics, Bvh, MAX_SAH_STEPS, NodeIdx, NodeLinks, SplitStrategy,
    TriangleIdx,
    split::{self, SplitPlane},
};

impl Bvh {
    /// Builds the tree from scratch over the triangles of the last `init`.
    ///
    /// The root is node 0, children are always allocated as an adjacent pair after their
    /// parent and nodes are numbered in the order of a left first depth first walk.
    /// The result only depends on the triangles and the settings, repeated builds give
    /// identical node arrays and permutations.
    pub fn build(&mut self, settings: &BuildSettings) {
        debug_assert!(settings.validate().is_ok());

        self.reset_permutation();
        self.nodes_used = 1;
        self.statistics = BuildStatistics::default();
        self.links[NodeIdx::ROOT] = NodeLinks::new_leaf(0, self.triangle_count(), None);
        self.update_node_bounds(NodeIdx::ROOT);

        let mut stack = vec![NodeIdx::ROOT];
        while let Some(node) = stack.pop() {
            match self.subdivide(node, settings) {
                Some(left) => {
                    stack.push(left + 1);
                    stack.push(left);
                }
                None => self.update_depths(node),
            }
        }

        log::debug!(
            "Built BVH over {} triangles: {} nodes, leaf depth {}, leaf size {}",
            self.triangle_count(),
            self.nodes_used,
            self.statistics.leaf_depth,
            self.statistics.leaf_size,
        );
    }

    /// Splits a leaf in two. Returns the index of the new left child, or None if the node
    /// stays a leaf.
    fn subdivide(&mut self, node: NodeIdx, settings: &BuildSettings) -> Option<NodeIdx> {
        let plane = self.choose_split(node, settings)?;

        let range = self.node_range(node);
        let (first, count) = (range.start, range.len());
        let left_count = self.partition(range, plane);
        if left_count == 0 || left_count == count {
            return None;
        }

        let left = NodeIdx::from_usize(self.nodes_used);
        let right = left + 1;
        self.nodes_used += 2;

        let parent = self.links[node].parent();
        self.links[left] = NodeLinks::new_leaf(first, left_count, Some(node));
        self.links[right] = NodeLinks::new_leaf(first + left_count, count - left_count, Some(node));
        self.links[node] = NodeLinks::new_inner(left, parent);

        self.update_node_bounds(left);
        self.update_node_bounds(right);
        self.bounds[node] = self.bounds[left].union(&self.bounds[right]);

        Some(left)
    }

    /// Puts the active triangle ids back into ascending order.
    pub(super) fn reset_permutation(&mut self) {
        let count = self.triangle_count();
        for (slot, id) in self.triangle_indices[..count].iter_mut().enumerate() {
            *id = TriangleIdx::from_usize(slot);
        }
    }

    fn choose_split(&self, node: NodeIdx, settings: &BuildSettings) -> Option<SplitPlane> {
        let input = self.node_split_input(node);
        let steps = settings.sah_step.clamp(1, MAX_SAH_STEPS);

        let candidate = match settings.strategy {
            SplitStrategy::Dichotomy => {
                return (input.len() > settings.triangles_per_leaf)
                    .then(|| split::dichotomy(input.bounds));
            }
            SplitStrategy::ExhaustiveSah => split::exhaustive_sah(&input),
            SplitStrategy::SteppedSah => split::stepped_sah(&input, steps),
            SplitStrategy::BinnedSah => split::binned_sah(&input, steps),
        }?;

        (candidate.cost < input.leaf_cost()).then_some(candidate.plane)
    }

    /// Reorders a range of the permutation so that triangles with centroids below the plane
    /// come first, returns their count.
    fn partition(&mut self, range: Range<usize>, plane: SplitPlane) -> usize {
        let axis = plane.axis.index();
        let (mut i, mut j) = (range.start, range.end);
        while i < j {
            let id = self.triangle_indices[i];
            if self.triangles[id].centroid[axis] < plane.position {
                i += 1;
            } else {
                j -= 1;
                self.triangle_indices.swap(i, j);
            }
        }
        i - range.start
    }
}
