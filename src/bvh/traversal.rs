//! CPU versions of the ray queries that the GPU runs over the exported buffers.
//! Mostly useful for validating a built tree.

use std::ops::Range;

use crate::geometry::{BarycentricCoordinates, FloatType, Ray, RayIntersectionExt as _};

use super::{Bvh, NodeIdx, NodeKind, TriangleIdx};

/// Nearest ray hit.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Hit {
    pub t: FloatType,
    pub barycentric: BarycentricCoordinates,
    /// Global triangle id.
    pub triangle: TriangleIdx,
    pub instance: usize,
    /// Index of the triangle within the mesh of its instance.
    pub local_triangle: usize,
}

/// Where the stackless walk entered the current node from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Entry {
    FromParent,
    FromSibling,
    FromChild,
}

impl Bvh {
    /// Finds the nearest hit with `t` inside the range using an explicit stack of nodes.
    pub fn intersect(&self, ray: &Ray, t_range: Range<FloatType>) -> Option<Hit> {
        let mut best = None;
        let mut stack = vec![NodeIdx::ROOT];

        while let Some(node) = stack.pop() {
            if !self.ray_hits_node(node, ray, &t_range, &best) {
                continue;
            }
            match self.links[node].decode() {
                NodeKind::Inner { left } => {
                    stack.push(left);
                    stack.push(left + 1);
                }
                NodeKind::Leaf { triangles } => {
                    self.intersect_leaf(triangles, ray, &t_range, &mut best)
                }
            }
        }

        best
    }

    /// Same query as `intersect`, but walks the tree using the parent links only.
    pub fn intersect_stackless(&self, ray: &Ray, t_range: Range<FloatType>) -> Option<Hit> {
        let mut best = None;

        let NodeKind::Inner { left } = self.links[NodeIdx::ROOT].decode() else {
            if self.ray_hits_node(NodeIdx::ROOT, ray, &t_range, &best) {
                self.intersect_leaf(self.node_range(NodeIdx::ROOT), ray, &t_range, &mut best);
            }
            return best;
        };

        let mut node = left;
        let mut entry = Entry::FromParent;
        while node != NodeIdx::ROOT {
            (node, entry) = match entry {
                Entry::FromParent | Entry::FromSibling => {
                    // Where to continue once this subtree is done
                    let next = if entry == Entry::FromParent {
                        (self.sibling(node), Entry::FromSibling)
                    } else {
                        (self.parent(node), Entry::FromChild)
                    };

                    if !self.ray_hits_node(node, ray, &t_range, &best) {
                        next
                    } else {
                        match self.links[node].decode() {
                            NodeKind::Inner { left } => (left, Entry::FromParent),
                            NodeKind::Leaf { triangles } => {
                                self.intersect_leaf(triangles, ray, &t_range, &mut best);
                                next
                            }
                        }
                    }
                }
                Entry::FromChild => {
                    let parent = self.parent(node);
                    if self.links[parent].decode() == (NodeKind::Inner { left: node }) {
                        (self.sibling(node), Entry::FromSibling)
                    } else {
                        (parent, Entry::FromChild)
                    }
                }
            };
        }

        best
    }

    /// Tests every active triangle.
    pub fn intersect_brute_force(&self, ray: &Ray, t_range: Range<FloatType>) -> Option<Hit> {
        let mut best = None;
        for id in (0..self.triangle_count()).map(TriangleIdx::from_usize) {
            self.intersect_triangle(id, ray, &t_range, &mut best);
        }
        best
    }

    fn ray_hits_node(
        &self,
        node: NodeIdx,
        ray: &Ray,
        t_range: &Range<FloatType>,
        best: &Option<Hit>,
    ) -> bool {
        let far = best.as_ref().map_or(t_range.end, |hit| hit.t);
        let (t1, t2) = self.bounds[node].intersect(ray);
        t1 <= t2 && t2 >= t_range.start && t1 <= far
    }

    fn intersect_leaf(
        &self,
        slots: Range<usize>,
        ray: &Ray,
        t_range: &Range<FloatType>,
        best: &mut Option<Hit>,
    ) {
        for id in &self.triangle_indices[slots] {
            self.intersect_triangle(*id, ray, t_range, best);
        }
    }

    fn intersect_triangle(
        &self,
        id: TriangleIdx,
        ray: &Ray,
        t_range: &Range<FloatType>,
        best: &mut Option<Hit>,
    ) {
        let Some((t, barycentric)) = self.triangles[id].vertices.intersect(ray) else {
            return;
        };
        let far = best.as_ref().map_or(t_range.end, |hit| hit.t);
        if t < t_range.start || t >= far {
            return;
        }

        *best = Some(Hit {
            t,
            barycentric,
            triangle: id,
            instance: id.index() / self.triangles_per_instance,
            local_triangle: id.index() % self.triangles_per_instance,
        });
    }

    /// Only valid for nodes other than the root.
    fn parent(&self, node: NodeIdx) -> NodeIdx {
        self.links[node].parent().unwrap_or(NodeIdx::ROOT)
    }

    fn sibling(&self, node: NodeIdx) -> NodeIdx {
        match self.links[self.parent(node)].decode() {
            NodeKind::Inner { left } if left == node => left + 1,
            _ => node - 1,
        }
    }
}
