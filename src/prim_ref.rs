use crate::geometry::{Aabb, Point3};

/// A single primitive reference, the unit the builder partitions.
///
/// Carries the primitive's bounding box and a payload identifier (geometry id
/// and primitive id packed into one integer). Never mutated by the builder,
/// only moved around within the caller's slice.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PrimRef {
    bounds: Aabb,
    ids: u64,
}

impl PrimRef {
    pub fn new(bounds: Aabb, geom_id: u32, prim_id: u32) -> PrimRef {
        PrimRef {
            bounds,
            ids: ((geom_id as u64) << 32) | prim_id as u64,
        }
    }

    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    pub fn geom_id(&self) -> u32 {
        (self.ids >> 32) as u32
    }

    pub fn prim_id(&self) -> u32 {
        self.ids as u32
    }

    /// The packed identifier, unique per (geometry, primitive) pair.
    pub fn ids(&self) -> u64 {
        self.ids
    }

    /// Centroid of the bounding box, the coordinate binning works on.
    pub fn center(&self) -> Point3 {
        self.bounds.center()
    }
}

/// Aggregate statistics over a contiguous range of primitive references.
///
/// Recomputed for every sub-range during recursion; `geom_bounds` drives the
/// SAH area terms, `centroid_bounds` drives the binning.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PrimInfo {
    pub count: usize,
    pub geom_bounds: Aabb,
    pub centroid_bounds: Aabb,
}

impl PrimInfo {
    pub fn empty() -> PrimInfo {
        PrimInfo {
            count: 0,
            geom_bounds: Aabb::empty(),
            centroid_bounds: Aabb::empty(),
        }
    }

    pub fn from_prims(prims: &[PrimRef]) -> PrimInfo {
        let mut result = PrimInfo::empty();
        for prim in prims {
            result.add(prim);
        }
        result
    }

    pub fn add(&mut self, prim: &PrimRef) {
        self.count += 1;
        self.geom_bounds.extend(prim.bounds());
        self.centroid_bounds.extend_point(&prim.center());
    }

    pub fn merge(&mut self, other: &PrimInfo) {
        self.count += other.count;
        self.geom_bounds.extend(&other.geom_bounds);
        self.centroid_bounds.extend(&other.centroid_bounds);
    }
}

impl Default for PrimInfo {
    fn default() -> PrimInfo {
        PrimInfo::empty()
    }
}
