mod aabb;
mod ray_box_intersection;
mod ray_triangle_intersection;
mod triangle;

pub use aabb::AABB;
pub use ray_box_intersection::RayIntersectionExt;
pub use triangle::{BarycentricCoordinates, Triangle};

pub type FloatType = f32;

pub type WorldPoint = nalgebra::Point3<FloatType>;
pub type WorldVector = nalgebra::Vector3<FloatType>;
pub type WorldBox = AABB<WorldPoint>;

/// Homogeneous vertex position in mesh local space.
pub type LocalVertex = nalgebra::Vector4<FloatType>;

/// Local to world transform of a single mesh instance.
pub type Transform = nalgebra::Matrix4<FloatType>;

pub const EPSILON: FloatType = 1e-8;

/// One of the three coordinate axes of the world space.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Copy, Clone, Debug)]
pub struct Ray {
    pub origin: WorldPoint,
    /// Normalized direction of the ray
    pub direction: WorldVector,

    /// Componentwise inverse of the ray direction
    /// Zeros in direction get turned into positive infinity regardless of the sign of the zero
    pub inv_direction: WorldVector,
}

impl Ray {
    pub fn new(origin: WorldPoint, direction: WorldVector) -> Ray {
        let direction = direction.normalize();
        let inv_direction = direction.map(|x| if x == 0.0 { FloatType::INFINITY } else { 1.0 / x });

        Ray {
            origin,
            direction,
            inv_direction,
        }
    }

    pub fn point_at(&self, distance: FloatType) -> WorldPoint {
        self.origin + self.direction * distance
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert2::assert;
    use test_case::test_case;

    #[test_case(Axis::X, 0)]
    #[test_case(Axis::Y, 1)]
    #[test_case(Axis::Z, 2)]
    fn axis_index(axis: Axis, expected: usize) {
        assert!(axis.index() == expected);
        assert!(Axis::ALL[expected] == axis);
    }

    #[test]
    fn ray_direction_is_normalized() {
        let ray = Ray::new(WorldPoint::origin(), WorldVector::new(0.0, 3.0, 4.0));
        assert!((ray.direction.norm() - 1.0).abs() < 1e-6);
        assert!(ray.inv_direction.x == FloatType::INFINITY);
        assert!((ray.point_at(5.0) - WorldPoint::new(0.0, 3.0, 4.0)).norm() < 1e-5);
    }
}
