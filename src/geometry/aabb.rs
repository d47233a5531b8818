use super::{Axis, FloatType, Triangle, WorldPoint};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AABB<Point> {
    pub min: Point,
    pub max: Point,
}

impl<Point> AABB<Point> {
    pub fn new(min: Point, max: Point) -> AABB<Point> {
        AABB { min, max }
    }
}

impl AABB<WorldPoint> {
    /// Inverted box that contains nothing; growing it by any point gives a box around
    /// that point only.
    pub fn empty() -> Self {
        AABB {
            min: WorldPoint::from([FloatType::INFINITY; 3]),
            max: WorldPoint::from([FloatType::NEG_INFINITY; 3]),
        }
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a WorldPoint>) -> Self {
        let mut ret = Self::empty();
        for p in points {
            ret.grow(p);
        }
        ret
    }

    pub fn is_empty(&self) -> bool {
        (0..3).any(|i| self.min[i] > self.max[i])
    }

    pub fn grow(&mut self, p: &WorldPoint) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    pub fn grow_triangle(&mut self, triangle: &Triangle<WorldPoint>) {
        for p in triangle.iter() {
            self.grow(p);
        }
    }

    pub fn grow_box(&mut self, other: &Self) {
        self.min = self.min.inf(&other.min);
        self.max = self.max.sup(&other.max);
    }

    pub fn union(&self, other: &Self) -> Self {
        let mut ret = *self;
        ret.grow_box(other);
        ret
    }

    pub fn extent(&self, axis: Axis) -> FloatType {
        self.max[axis.index()] - self.min[axis.index()]
    }

    /// Total surface area of the box, zero for an empty box.
    pub fn area(&self) -> FloatType {
        if self.is_empty() {
            return 0.0;
        }
        let e = self.max - self.min;
        2.0 * (e.x * e.y + e.y * e.z + e.z * e.x)
    }

    /// Closed containment, points on the surface are inside.
    pub fn contains_point(&self, p: &WorldPoint) -> bool {
        (0..3).all(|i| self.min[i] <= p[i] && p[i] <= self.max[i])
    }

    /// Returns true if the other box fits inside this one; empty box fits anywhere.
    pub fn contains_box(&self, other: &Self) -> bool {
        other.is_empty() || (self.contains_point(&other.min) && self.contains_point(&other.max))
    }
}
