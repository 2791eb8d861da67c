//! Bounding volumes for spatial culling
//!
//! Provides the sphere primitive stored per batch and per instance, and an
//! approximate fitting routine (Ritter's algorithm) run once per mesh.

use crate::foundation::math::{distance_squared, Vec3};

/// A bounding sphere in the local space of a mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    /// The center position of the sphere
    pub center: Vec3,
    /// The radius of the sphere, never negative
    pub radius: f32,
}

impl Default for BoundingSphere {
    fn default() -> Self {
        Self::degenerate()
    }
}

impl BoundingSphere {
    /// Creates a new bounding sphere with the given center and radius
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius: radius.max(0.0) }
    }

    /// Zero-radius sphere at the origin
    pub fn degenerate() -> Self {
        Self { center: Vec3::zeros(), radius: 0.0 }
    }

    /// Check whether a point lies inside the sphere, allowing `epsilon` slack
    pub fn contains_point(&self, point: &Vec3, epsilon: f32) -> bool {
        (point - self.center).magnitude() <= self.radius + epsilon
    }

    /// Check if this sphere intersects with another
    pub fn intersects(&self, other: &BoundingSphere) -> bool {
        let radius_sum = self.radius + other.radius;
        distance_squared(&self.center, &other.center) <= radius_sum * radius_sum
    }

    /// Grow the sphere just enough to include `point`
    ///
    /// The center moves toward the point by half the excess distance and the
    /// radius grows by the same amount. Returns `true` if the sphere changed.
    pub fn expand_to_include(&mut self, point: &Vec3) -> bool {
        let offset = point - self.center;
        let distance = offset.magnitude();
        if distance <= self.radius {
            return false;
        }

        let excess = (distance - self.radius) * 0.5;
        self.center += offset * (excess / distance);
        self.radius += excess;
        true
    }
}

/// Fit an approximate bounding sphere around `positions` (Ritter's algorithm)
///
/// The result always contains every input point up to floating-point error,
/// but is not guaranteed to be the minimal enclosing sphere. An empty input
/// yields [`BoundingSphere::degenerate`].
pub fn compute_bounding_sphere(positions: &[Vec3]) -> BoundingSphere {
    let Some(first) = positions.first() else {
        return BoundingSphere::degenerate();
    };

    // (min x, min y, min z, max x, max y, max z)
    let mut extremes = [*first; 6];
    for p in positions.iter().skip(1) {
        for axis in 0..3 {
            if p[axis] < extremes[axis][axis] {
                extremes[axis] = *p;
            }
            if p[axis] > extremes[axis + 3][axis] {
                extremes[axis + 3] = *p;
            }
        }
    }

    let mut seed = (extremes[0], extremes[0]);
    let mut max_distance_sq = 0.0_f32;
    for (i, a) in extremes.iter().enumerate() {
        for b in &extremes[i + 1..] {
            let d = distance_squared(a, b);
            if d > max_distance_sq {
                max_distance_sq = d;
                seed = (*a, *b);
            }
        }
    }

    let mut sphere = BoundingSphere::new((seed.0 + seed.1) * 0.5, max_distance_sq.sqrt() * 0.5);
    for p in positions {
        sphere.expand_to_include(p);
    }

    sphere
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use rand::{rngs::StdRng, Rng, SeedableRng};

    const EPSILON: f32 = 1e-4;

    fn unit_cube() -> Vec<Vec3> {
        vec![
            Vec3::new(-0.5, -0.5, 0.5),
            Vec3::new(0.5, -0.5, 0.5),
            Vec3::new(0.5, 0.5, 0.5),
            Vec3::new(-0.5, 0.5, 0.5),
            Vec3::new(-0.5, -0.5, -0.5),
            Vec3::new(0.5, -0.5, -0.5),
            Vec3::new(0.5, 0.5, -0.5),
            Vec3::new(-0.5, 0.5, -0.5),
        ]
    }

    #[test]
    fn test_unit_cube_sphere_is_tight() {
        let points = unit_cube();
        let sphere = compute_bounding_sphere(&points);

        assert_abs_diff_eq!(sphere.center, Vec3::zeros(), epsilon = 1e-6);
        assert_relative_eq!(sphere.radius, 3.0_f32.sqrt() * 0.5, epsilon = 1e-6);
        for p in &points {
            assert!(sphere.contains_point(p, EPSILON), "{p:?} outside {sphere:?}");
        }
    }

    #[test]
    fn test_random_point_cloud_is_contained() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..20 {
            let count = rng.gen_range(1..500);
            let offset = Vec3::new(
                rng.gen_range(-100.0..100.0),
                rng.gen_range(-100.0..100.0),
                rng.gen_range(-100.0..100.0),
            );
            let points: Vec<Vec3> = (0..count)
                .map(|_| {
                    offset + Vec3::new(
                        rng.gen_range(-10.0..10.0),
                        rng.gen_range(-3.0..3.0),
                        rng.gen_range(-7.0..7.0),
                    )
                })
                .collect();

            let sphere = compute_bounding_sphere(&points);
            assert!(sphere.radius >= 0.0);
            for p in &points {
                assert!(sphere.contains_point(p, EPSILON), "{p:?} outside {sphere:?}");
            }
        }
    }

    #[test]
    fn test_negative_only_coordinates() {
        // Every coordinate negative: maxima must still be tracked per axis
        let points = vec![
            Vec3::new(-4.0, -1.0, -1.0),
            Vec3::new(-2.0, -3.0, -1.0),
            Vec3::new(-3.0, -2.0, -6.0),
        ];
        let sphere = compute_bounding_sphere(&points);
        for p in &points {
            assert!(sphere.contains_point(p, EPSILON));
        }
    }

    #[test]
    fn test_single_point_and_empty_input() {
        let single = compute_bounding_sphere(&[Vec3::new(1.0, 2.0, 3.0)]);
        assert_eq!(single.center, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(single.radius, 0.0);

        let empty = compute_bounding_sphere(&[]);
        assert_eq!(empty, BoundingSphere::degenerate());
    }

    #[test]
    fn test_expand_to_include() {
        let mut sphere = BoundingSphere::new(Vec3::zeros(), 1.0);
        assert!(!sphere.expand_to_include(&Vec3::new(0.5, 0.0, 0.0)));
        assert!(sphere.expand_to_include(&Vec3::new(3.0, 0.0, 0.0)));

        assert_relative_eq!(sphere.radius, 2.0);
        assert_relative_eq!(sphere.center, Vec3::new(1.0, 0.0, 0.0));
        assert!(sphere.contains_point(&Vec3::new(-1.0, 0.0, 0.0), EPSILON));
    }

    #[test]
    fn test_sphere_intersection() {
        let a = BoundingSphere::new(Vec3::zeros(), 1.0);
        let b = BoundingSphere::new(Vec3::new(2.0, 0.0, 0.0), 1.0);
        let c = BoundingSphere::new(Vec3::new(2.5, 0.0, 0.0), 1.0);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }
}
