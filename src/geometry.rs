pub type Point3 = nalgebra::Point3<f32>;
pub type Vector3 = nalgebra::Vector3<f32>;

/// Axis-aligned bounding box.
///
/// An empty box is represented by inverted bounds (`min > max` on every
/// axis), so extending an empty box by a point yields the degenerate box of
/// that point.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb {
    pub min: Point3,
    pub max: Point3,
}

impl Aabb {
    pub fn new(min: Point3, max: Point3) -> Aabb {
        Aabb { min, max }
    }

    pub const fn empty() -> Aabb {
        Aabb {
            min: Point3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Point3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    pub fn from_points(points: impl IntoIterator<Item = Point3>) -> Aabb {
        let mut result = Aabb::empty();
        for p in points {
            result.extend_point(&p);
        }
        result
    }

    pub fn is_empty(&self) -> bool {
        (0..3).any(|axis| self.min[axis] > self.max[axis])
    }

    pub fn extend_point(&mut self, p: &Point3) {
        self.min = Point3::from(self.min.coords.inf(&p.coords));
        self.max = Point3::from(self.max.coords.sup(&p.coords));
    }

    pub fn extend(&mut self, other: &Aabb) {
        self.min = Point3::from(self.min.coords.inf(&other.min.coords));
        self.max = Point3::from(self.max.coords.sup(&other.max.coords));
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        let mut result = *self;
        result.extend(other);
        result
    }

    pub fn center(&self) -> Point3 {
        Point3::from((self.min.coords + self.max.coords) * 0.5)
    }

    /// Size of the box. Negative components for an empty box.
    pub fn extent(&self) -> Vector3 {
        self.max - self.min
    }

    /// Half of the surface area, the quantity the SAH cost model weighs
    /// ranges by. Zero for empty boxes.
    pub fn half_area(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let d = self.extent();
        d.x * d.y + d.y * d.z + d.z * d.x
    }

    /// Axis with the largest extent, ties resolved towards the lower index.
    pub fn largest_axis(&self) -> usize {
        let d = self.extent();
        let mut best = 0;
        for axis in 1..3 {
            if d[axis] > d[best] {
                best = axis;
            }
        }
        best
    }

    pub fn contains_box(&self, other: &Aabb) -> bool {
        if other.is_empty() {
            return true;
        }
        (0..3).all(|axis| self.min[axis] <= other.min[axis] && self.max[axis] >= other.max[axis])
    }
}

impl Default for Aabb {
    fn default() -> Aabb {
        Aabb::empty()
    }
}

#[cfg(test)]
pub mod test {
    use super::*;

    use assert2::assert;
    use proptest::prelude::*;
    use test_strategy::proptest;

    pub fn point_strategy() -> impl Strategy<Value = Point3> {
        let coord = -100.0f32..100.0f32;
        (coord.clone(), coord.clone(), coord).prop_map(|(x, y, z)| Point3::new(x, y, z))
    }

    pub fn aabb_strategy() -> impl Strategy<Value = Aabb> {
        (point_strategy(), point_strategy()).prop_map(|(a, b)| {
            let mut result = Aabb::empty();
            result.extend_point(&a);
            result.extend_point(&b);
            result
        })
    }

    #[test]
    fn empty_is_empty() {
        assert!(Aabb::empty().is_empty());
        assert!(Aabb::empty().half_area() == 0.0);
    }

    #[test]
    fn half_area_unit_cube() {
        let unit = Aabb::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        assert!(unit.half_area() == 3.0);
    }

    #[test]
    fn largest_axis_prefers_lower_index_on_ties() {
        let cube = Aabb::new(Point3::origin(), Point3::new(2.0, 2.0, 1.0));
        assert!(cube.largest_axis() == 0);
    }

    #[test]
    fn largest_axis_basic() {
        let slab = Aabb::new(Point3::origin(), Point3::new(1.0, 5.0, 2.0));
        assert!(slab.largest_axis() == 1);
    }

    #[proptest]
    fn union_contains_both(
        #[strategy(aabb_strategy())] a: Aabb,
        #[strategy(aabb_strategy())] b: Aabb,
    ) {
        let u = a.union(&b);
        assert!(u.contains_box(&a));
        assert!(u.contains_box(&b));
    }

    #[proptest]
    fn extend_point_contains_point(
        #[strategy(aabb_strategy())] a: Aabb,
        #[strategy(point_strategy())] p: Point3,
    ) {
        let mut extended = a;
        extended.extend_point(&p);
        assert!(extended.contains_box(&Aabb::new(p, p)));
        assert!(extended.contains_box(&a));
    }

    #[proptest]
    fn center_inside(#[strategy(aabb_strategy())] a: Aabb) {
        let c = a.center();
        assert!(a.contains_box(&Aabb::new(c, c)));
    }
}
