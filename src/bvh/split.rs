//! Split plane selection for a single node.
//!
//! Triangles are assigned to the sides of a plane by their centroids (centroid < position
//! goes left), while the cost uses the boxes around the full triangles.

use arrayvec::ArrayVec;
use index_vec::IndexSlice;
use ordered_float::OrderedFloat;

use crate::geometry::{Axis, FloatType, WorldBox};

use super::{Bvh, BvhTriangle, MAX_SAH_STEPS, NodeIdx, TriangleIdx};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SplitPlane {
    pub axis: Axis,
    pub position: FloatType,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SplitCandidate {
    pub plane: SplitPlane,
    pub cost: FloatType,
}

/// Triangles owned by a single node together with its bounds.
#[derive(Copy, Clone)]
pub struct NodeTriangles<'a> {
    pub triangles: &'a IndexSlice<TriangleIdx, [BvhTriangle]>,
    pub owned: &'a [TriangleIdx],
    pub bounds: &'a WorldBox,
}

impl<'a> NodeTriangles<'a> {
    pub fn iter(&self) -> impl Iterator<Item = &'a BvhTriangle> + use<'a> {
        let triangles = self.triangles;
        self.owned.iter().map(move |id| &triangles[*id])
    }

    pub fn len(&self) -> usize {
        self.owned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owned.is_empty()
    }

    /// Cost of keeping all the triangles in a single leaf.
    pub fn leaf_cost(&self) -> FloatType {
        self.bounds.area() * self.len() as FloatType
    }
}

impl Bvh {
    pub fn node_split_input(&self, node: NodeIdx) -> NodeTriangles<'_> {
        NodeTriangles {
            triangles: self.triangles.as_slice(),
            owned: self.node_triangles(node),
            bounds: &self.bounds[node],
        }
    }
}

/// Count and bounds of a group of triangles.
#[derive(Copy, Clone, Debug)]
struct Bin {
    count: usize,
    bounds: WorldBox,
}

impl Default for Bin {
    fn default() -> Self {
        Bin {
            count: 0,
            bounds: WorldBox::empty(),
        }
    }
}

impl Bin {
    fn add_triangle(&mut self, triangle: &BvhTriangle) {
        self.count += 1;
        self.bounds.grow_triangle(&triangle.vertices);
    }

    fn add_bin(&mut self, other: &Bin) {
        self.count += other.count;
        self.bounds.grow_box(&other.bounds);
    }
}

/// Midpoint of the longest axis of the box. Ties go to the lower axis.
pub fn dichotomy(bounds: &WorldBox) -> SplitPlane {
    let axis = [Axis::Y, Axis::Z].into_iter().fold(Axis::X, |best, axis| {
        if bounds.extent(axis) > bounds.extent(best) {
            axis
        } else {
            best
        }
    });

    SplitPlane {
        axis,
        position: bounds.min[axis.index()] + bounds.extent(axis) / 2.0,
    }
}

/// Surface area heuristic cost of a split.
/// A cost of exactly zero (or NaN) is replaced by the maximum cost, so that a degenerate
/// split never looks free.
pub fn sah_cost(
    left_count: usize,
    left_area: FloatType,
    right_count: usize,
    right_area: FloatType,
) -> FloatType {
    let cost = left_count as FloatType * left_area + right_count as FloatType * right_area;
    if cost > 0.0 { cost } else { FloatType::MAX }
}

/// Evaluates the SAH cost of a single plane by partitioning all node triangles.
pub fn evaluate_sah(node: &NodeTriangles, plane: SplitPlane) -> FloatType {
    let mut left = Bin::default();
    let mut right = Bin::default();
    for triangle in node.iter() {
        if triangle.centroid[plane.axis.index()] < plane.position {
            left.add_triangle(triangle);
        } else {
            right.add_triangle(triangle);
        }
    }
    sah_cost(
        left.count,
        left.bounds.area(),
        right.count,
        right.bounds.area(),
    )
}

/// Tries every triangle centroid on every axis as a split position.
/// Quadratic in the triangle count.
pub fn exhaustive_sah(node: &NodeTriangles) -> Option<SplitCandidate> {
    let candidates = Axis::ALL
        .into_iter()
        .flat_map(|axis| {
            node.iter().map(move |triangle| SplitPlane {
                axis,
                position: triangle.centroid[axis.index()],
            })
        })
        .map(|plane| SplitCandidate {
            plane,
            cost: evaluate_sah(node, plane),
        });
    cheapest(candidates)
}

/// Evaluates `steps - 1` equally spaced planes strictly inside the node bounds on each axis
/// with non-zero extent.
pub fn stepped_sah(node: &NodeTriangles, steps: usize) -> Option<SplitCandidate> {
    let candidates = Axis::ALL
        .into_iter()
        .filter(|axis| node.bounds.extent(*axis) > 0.0)
        .flat_map(|axis| {
            let min = node.bounds.min[axis.index()];
            let step = node.bounds.extent(axis) / steps as FloatType;
            (1..steps).map(move |i| SplitPlane {
                axis,
                position: min + i as FloatType * step,
            })
        })
        .map(|plane| SplitCandidate {
            plane,
            cost: evaluate_sah(node, plane),
        });
    cheapest(candidates)
}

/// Same planes as `stepped_sah`, but the triangles are binned by centroid only once per
/// axis and the costs of all planes come from prefix sums over the bins.
/// Fewer than two bins have no boundary to split at.
///
/// Panics if `bins` is larger than `MAX_SAH_STEPS`.
pub fn binned_sah(node: &NodeTriangles, bins: usize) -> Option<SplitCandidate> {
    assert!(bins <= MAX_SAH_STEPS);
    if bins < 2 {
        return None;
    }

    let candidates = Axis::ALL
        .into_iter()
        .filter(|axis| node.bounds.extent(*axis) > 0.0)
        .flat_map(|axis| binned_axis_candidates(node, axis, bins));
    cheapest(candidates)
}

/// Lowest cost candidate, ties go to the lower axis and then to the lower position so that
/// the result does not depend on the order of the node triangles.
fn cheapest(candidates: impl Iterator<Item = SplitCandidate>) -> Option<SplitCandidate> {
    candidates.min_by_key(|candidate| {
        (
            OrderedFloat(candidate.cost),
            candidate.plane.axis.index(),
            OrderedFloat(candidate.plane.position),
        )
    })
}

fn binned_axis_candidates(
    node: &NodeTriangles,
    axis: Axis,
    bin_count: usize,
) -> ArrayVec<SplitCandidate, MAX_SAH_STEPS> {
    let min = node.bounds.min[axis.index()];
    let extent = node.bounds.extent(axis);
    let scale = bin_count as FloatType / extent;

    let mut bins: ArrayVec<Bin, MAX_SAH_STEPS> = (0..bin_count).map(|_| Bin::default()).collect();
    for triangle in node.iter() {
        // Centroid at the upper bound would land one past the last bin
        let i = (((triangle.centroid[axis.index()] - min) * scale) as usize).min(bin_count - 1);
        bins[i].add_triangle(triangle);
    }

    // Entry i describes the two sides of the boundary between bins i and i + 1
    let boundaries = bin_count.saturating_sub(1);
    let mut left = [(0usize, 0.0 as FloatType); MAX_SAH_STEPS];
    let mut right = [(0usize, 0.0 as FloatType); MAX_SAH_STEPS];

    let mut acc = Bin::default();
    for i in 0..boundaries {
        acc.add_bin(&bins[i]);
        left[i] = (acc.count, acc.bounds.area());
    }

    let mut acc = Bin::default();
    for i in (0..boundaries).rev() {
        acc.add_bin(&bins[i + 1]);
        right[i] = (acc.count, acc.bounds.area());
    }

    let step = extent / bin_count as FloatType;
    (0..boundaries)
        .map(|i| SplitCandidate {
            plane: SplitPlane {
                axis,
                position: min + (i + 1) as FloatType * step,
            },
            cost: sah_cost(left[i].0, left[i].1, right[i].0, right[i].1),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bvh::test_util::{soup_scene, triangle_soup_strategy};
    use crate::geometry::WorldPoint;
    use assert2::{assert, let_assert};
    use test_case::test_case;
    use test_strategy::proptest;

    /// Thin triangles, triangle i spans x in [i, i + 1] and has centroid x at i + 0.5.
    fn slots(count: usize) -> Bvh {
        let triangles: Vec<_> = (0..count)
            .map(|i| {
                let x = i as f32;
                [[x, 0.0, 0.0], [x + 1.0, 0.0, 0.0], [x + 0.5, 1.0, 0.0]]
            })
            .collect();
        let mut bvh = soup_scene(&triangles);
        bvh.refit();
        bvh
    }

    #[test_case(1.0, 2.0, 3.0, Axis::Z)]
    #[test_case(3.0, 2.0, 1.0, Axis::X)]
    #[test_case(1.0, 3.0, 2.0, Axis::Y)]
    #[test_case(2.0, 2.0, 1.0, Axis::X ; "tie_xy")]
    #[test_case(1.0, 2.0, 2.0, Axis::Y ; "tie_yz")]
    #[test_case(2.0, 1.0, 2.0, Axis::X ; "tie_xz")]
    #[test_case(1.0, 1.0, 1.0, Axis::X ; "tie_all")]
    fn dichotomy_longest_axis(x: f32, y: f32, z: f32, expected: Axis) {
        let bounds = WorldBox::new(WorldPoint::new(1.0, 1.0, 1.0), WorldPoint::new(1.0 + x, 1.0 + y, 1.0 + z));
        let plane = dichotomy(&bounds);
        assert!(plane.axis == expected);
        assert!(plane.position == 1.0 + bounds.extent(expected) / 2.0);
    }

    #[test_case(0, 0.0, 0, 0.0, FloatType::MAX ; "nothing")]
    #[test_case(2, 0.0, 0, 0.0, FloatType::MAX ; "flat_all_left")]
    #[test_case(0, 0.0, 3, 2.0, 6.0 ; "empty_left")]
    #[test_case(2, 1.5, 3, 2.0, 9.0 ; "both_sides")]
    fn cost(left_count: usize, left_area: f32, right_count: usize, right_area: f32, expected: f32) {
        assert!(sah_cost(left_count, left_area, right_count, right_area) == expected);
    }

    #[test]
    fn evaluate_plane() {
        let bvh = slots(8);
        let node = bvh.node_split_input(NodeIdx::ROOT);
        // Both halves are 4x1 flat boxes with area 8
        let cost = evaluate_sah(&node, SplitPlane { axis: Axis::X, position: 4.0 });
        assert!(cost == 64.0);
        assert!(node.leaf_cost() == 8.0 * 16.0);
    }

    #[test]
    fn exact_variants_agree_on_separated_triangles() {
        let bvh = slots(8);
        let node = bvh.node_split_input(NodeIdx::ROOT);

        let_assert!(Some(exhaustive) = exhaustive_sah(&node));
        let_assert!(Some(stepped) = stepped_sah(&node, 8));
        let_assert!(Some(binned) = binned_sah(&node, 8));

        assert!(exhaustive.cost == 64.0);
        assert!(exhaustive.plane == SplitPlane { axis: Axis::X, position: 4.5 });
        assert!(stepped.cost == 64.0);
        assert!(stepped.plane == SplitPlane { axis: Axis::X, position: 4.0 });
        assert!(binned == stepped);
    }

    #[test_case(false ; "in_order")]
    #[test_case(true ; "reversed")]
    fn exhaustive_ties_go_to_the_lower_position(reversed: bool) {
        // Splitting off either outer triangle costs 2 + 2 * 22
        let mut triangles: Vec<_> = [0.0f32, 10.0, 20.0]
            .into_iter()
            .map(|x| [[x, 0.0, 0.0], [x + 1.0, 0.0, 0.0], [x + 0.5, 1.0, 0.0]])
            .collect();
        if reversed {
            triangles.reverse();
        }
        let mut bvh = soup_scene(&triangles);
        bvh.refit();
        let node = bvh.node_split_input(NodeIdx::ROOT);

        let_assert!(Some(candidate) = exhaustive_sah(&node));
        assert!(candidate.cost == 46.0);
        assert!(candidate.plane == SplitPlane { axis: Axis::X, position: 10.5 });
    }

    #[test_case(0)]
    #[test_case(1)]
    #[test_case(2)]
    #[test_case(3)]
    fn too_few_steps_give_no_useful_candidate(steps: usize) {
        let bvh = slots(8);
        let node = bvh.node_split_input(NodeIdx::ROOT);
        let stepped = stepped_sah(&node, steps);
        let binned = binned_sah(&node, steps);
        if steps < 2 {
            assert!(stepped.is_none());
            assert!(binned.is_none());
        } else {
            let_assert!(Some(stepped) = stepped);
            let_assert!(Some(binned) = binned);
            assert!(stepped.cost < node.leaf_cost());
            assert!(binned.cost < node.leaf_cost());
        }
    }

    #[test]
    fn identical_centroids_never_improve() {
        let triangle = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 1.0]];
        let mut bvh = soup_scene(&[triangle; 5]);
        bvh.refit();
        let node = bvh.node_split_input(NodeIdx::ROOT);

        for candidate in [
            exhaustive_sah(&node),
            stepped_sah(&node, 4),
            binned_sah(&node, 4),
        ] {
            let_assert!(Some(candidate) = candidate);
            assert!(candidate.cost >= node.leaf_cost());
        }
    }

    #[test]
    fn empty_node_has_no_candidates() {
        let bvh = Bvh::with_capacity(4);
        let node = bvh.node_split_input(NodeIdx::ROOT);
        assert!(node.is_empty());
        assert!(exhaustive_sah(&node).is_none());
        assert!(stepped_sah(&node, 4).is_none());
        assert!(binned_sah(&node, 4).is_none());
    }

    #[proptest]
    fn approximations_never_beat_exhaustive(
        #[strategy(triangle_soup_strategy(16))] triangles: Vec<[[f32; 3]; 3]>,
        #[strategy(1usize..=MAX_SAH_STEPS)] steps: usize,
    ) {
        let mut bvh = soup_scene(&triangles);
        bvh.refit();
        let node = bvh.node_split_input(NodeIdx::ROOT);

        let_assert!(Some(exhaustive) = exhaustive_sah(&node));
        for approximation in [stepped_sah(&node, steps), binned_sah(&node, steps)]
            .into_iter()
            .flatten()
        {
            assert!(approximation.cost >= exhaustive.cost);
        }
    }

    #[proptest]
    fn binned_and_stepped_skip_the_same_axes(
        #[strategy(triangle_soup_strategy(16))] triangles: Vec<[[f32; 3]; 3]>,
        #[strategy(2usize..=MAX_SAH_STEPS)] steps: usize,
    ) {
        let mut bvh = soup_scene(&triangles);
        bvh.refit();
        let node = bvh.node_split_input(NodeIdx::ROOT);

        // Flat soups have no candidate planes on their zero extent axes
        assert!(stepped_sah(&node, steps).is_some() == binned_sah(&node, steps).is_some());
    }
}
