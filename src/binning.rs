use crate::{
    geometry::Aabb,
    prim_ref::{PrimInfo, PrimRef},
    settings::{BuildSettings, MAX_BINS},
};

/// Best split found by the cost evaluator.
///
/// Carries the exact binning mapping (`axis`, `bin_origin`, `bin_scale`,
/// `split_bin`) so the partitioner classifies primitives identically to the
/// sweep that produced the cost, plus the resulting counts and bounds.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Split {
    pub axis: usize,
    pub split_bin: usize,
    pub bin_origin: f32,
    pub bin_scale: f32,
    /// World-space coordinate of the chosen bin boundary.
    pub position: f32,
    pub cost: f32,
    pub left_count: usize,
    pub right_count: usize,
    pub left_bounds: Aabb,
    pub right_bounds: Aabb,
}

impl Split {
    pub fn goes_left(&self, prim: &PrimRef) -> bool {
        // The f32 -> usize cast saturates at zero, and values past the last
        // bin compare >= split_bin either way, so no clamping is needed here.
        let bin = ((prim.center()[self.axis] - self.bin_origin) * self.bin_scale) as usize;
        bin < self.split_bin
    }
}

/// Finds the cheapest binned SAH split of `prims`, or `None` when every axis
/// is degenerate (all centroids coincide) or the range has no surface area.
///
/// One linear binning pass per axis, then a suffix sweep accumulating the
/// right-hand bounds and counts and a prefix sweep evaluating
/// `traversal_cost + intersection_cost * (leftArea*leftCount +
/// rightArea*rightCount) / totalArea` at every bin boundary. Ties keep the
/// first candidate in axis order 0, 1, 2.
pub(crate) fn find_best_split(
    prims: &[PrimRef],
    info: &PrimInfo,
    settings: &BuildSettings,
) -> Option<Split> {
    let total_area = info.geom_bounds.half_area();
    if !(total_area > 0.0) {
        return None;
    }

    let bin_count = settings.bin_count;
    let mut best: Option<Split> = None;

    for axis in 0..3 {
        let origin = info.centroid_bounds.min[axis];
        let extent = info.centroid_bounds.max[axis] - origin;
        if !(extent > 0.0) {
            continue;
        }
        let scale = bin_count as f32 / extent;

        let mut counts = [0usize; MAX_BINS];
        let mut bounds = [Aabb::empty(); MAX_BINS];
        for prim in prims {
            let bin = (((prim.center()[axis] - origin) * scale) as usize).min(bin_count - 1);
            counts[bin] += 1;
            bounds[bin].extend(prim.bounds());
        }

        // Suffix sweep: bounds and count of everything right of boundary i.
        let mut right_bounds = [Aabb::empty(); MAX_BINS];
        let mut right_counts = [0usize; MAX_BINS];
        let mut acc_bounds = Aabb::empty();
        let mut acc_count = 0;
        for bin in (1..bin_count).rev() {
            acc_bounds.extend(&bounds[bin]);
            acc_count += counts[bin];
            right_bounds[bin] = acc_bounds;
            right_counts[bin] = acc_count;
        }

        // Prefix sweep evaluating every boundary.
        let mut left_bounds = Aabb::empty();
        let mut left_count = 0;
        for split_bin in 1..bin_count {
            left_bounds.extend(&bounds[split_bin - 1]);
            left_count += counts[split_bin - 1];

            let right_count = right_counts[split_bin];
            if left_count == 0 || right_count == 0 {
                continue;
            }

            let cost = settings.traversal_cost
                + settings.intersection_cost
                    * (left_bounds.half_area() * left_count as f32
                        + right_bounds[split_bin].half_area() * right_count as f32)
                    / total_area;

            if best.as_ref().is_none_or(|b| cost < b.cost) {
                best = Some(Split {
                    axis,
                    split_bin,
                    bin_origin: origin,
                    bin_scale: scale,
                    position: origin + split_bin as f32 / scale,
                    cost,
                    left_count,
                    right_count,
                    left_bounds,
                    right_bounds: right_bounds[split_bin],
                });
            }
        }
    }

    best
}
