use crate::geometry::WorldBox;

use super::{Bvh, NodeIdx, NodeKind};

impl Bvh {
    /// Recomputes bounds of a node directly from the vertices of the triangles it owns.
    pub fn update_node_bounds(&mut self, node: NodeIdx) {
        let mut bounds = WorldBox::empty();
        for id in self.node_triangles(node) {
            bounds.grow_triangle(&self.triangles[*id].vertices);
        }
        self.bounds[node] = bounds;
    }

    /// Refits all node bounds to the current triangle positions without changing topology.
    ///
    /// Children are always allocated after their parent, so a single pass from the last used
    /// node down to the root refreshes children before parents.
    pub fn refit(&mut self) {
        for i in (0..self.nodes_used).rev() {
            let node = NodeIdx::from_usize(i);
            match self.links[node].decode() {
                NodeKind::Leaf { .. } => self.update_node_bounds(node),
                NodeKind::Inner { left } => {
                    self.bounds[node] = self.bounds[left].union(&self.bounds[left + 1]);
                }
            }
        }
        log::trace!("Refitted {} nodes", self.nodes_used);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bvh::{
            BuildSettings, InstanceTransforms, SplitStrategy,
            test_util::{check_invariants, cube_scene},
        },
        geometry::{Transform, WorldPoint, WorldVector},
        mesh::Mesh,
    };
    use assert2::assert;
    use proptest::prelude::ProptestConfig;
    use test_strategy::proptest;

    /// Reference refit by explicit post-order recursion.
    fn refit_recursive(bvh: &Bvh, node: NodeIdx, out: &mut Vec<WorldBox>) -> WorldBox {
        let b = match bvh.links[node].decode() {
            NodeKind::Leaf { .. } => {
                let mut b = WorldBox::empty();
                for id in bvh.node_triangles(node) {
                    b.grow_triangle(&bvh.triangles[*id].vertices);
                }
                b
            }
            NodeKind::Inner { left } => {
                let l = refit_recursive(bvh, left, out);
                let r = refit_recursive(bvh, left + 1, out);
                l.union(&r)
            }
        };
        out[node.index()] = b;
        b
    }

    fn instance_transforms(offsets: &[(f32, f32, f32)], angle: f32) -> Vec<Transform> {
        offsets
            .iter()
            .map(|&(x, y, z)| {
                Transform::new_translation(&WorldVector::new(x, y, z))
                    * Transform::new_rotation(WorldVector::new(0.0, angle, 0.0))
            })
            .collect()
    }

    #[proptest(ProptestConfig { cases: 64, ..ProptestConfig::default() })]
    fn refit_matches_recursive_refit(
        #[strategy(proptest::collection::vec((-20.0f32..20.0, -20.0f32..20.0, -20.0f32..20.0), 1..8))]
        offsets: Vec<(f32, f32, f32)>,
        #[strategy(-3.0f32..3.0)] angle: f32,
        #[strategy(proptest::sample::select(SplitStrategy::ALL.to_vec()))] strategy: SplitStrategy,
    ) {
        let mesh = Mesh::unit_cube();
        let mut bvh = Bvh::with_capacity(12 * offsets.len());
        bvh.init(
            offsets.len(),
            &mesh,
            InstanceTransforms::PerInstance(&instance_transforms(&offsets, 0.0)),
        );
        bvh.build(&BuildSettings::builder().strategy(strategy).build());

        let moved = instance_transforms(&offsets, angle);
        bvh.update(offsets.len(), &mesh, InstanceTransforms::PerInstance(&moved));

        let mut expected = vec![WorldBox::empty(); bvh.nodes_used()];
        refit_recursive(&bvh, NodeIdx::ROOT, &mut expected);
        assert!(bvh.bounds() == expected.as_slice());

        check_invariants(&bvh);
    }

    #[test]
    fn refit_before_build_covers_root() {
        let mut bvh = cube_scene(&[WorldVector::zeros(), WorldVector::new(0.0, 0.0, 4.0)]);
        bvh.refit();
        let root = bvh.node_bounds(NodeIdx::ROOT);
        assert!(root.min == WorldPoint::new(-0.5, -0.5, -0.5));
        assert!(root.max == WorldPoint::new(0.5, 0.5, 4.5));
    }

    #[test]
    fn refit_after_build_is_noop() {
        let mut bvh = cube_scene(&[
            WorldVector::zeros(),
            WorldVector::new(2.0, 0.0, 0.0),
            WorldVector::new(0.0, 2.0, 0.0),
        ]);
        bvh.build(&BuildSettings::default());
        let bounds = bvh.bounds().to_vec();
        bvh.refit();
        assert!(bvh.bounds() == bounds.as_slice());
    }
}
