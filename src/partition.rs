use ordered_float::OrderedFloat;

use crate::{
    binning::Split,
    prim_ref::{PrimInfo, PrimRef},
};

/// Physically reorders `prims` in place around `split` and returns the index
/// of the first right-hand element together with exact `PrimInfo` for both
/// sides.
///
/// Classification reuses the split's binning mapping, so the resulting counts
/// match the ones the cost evaluator predicted. Should floating-point ties
/// still produce an empty side, the partition falls back to a median-count
/// split on the split axis to guarantee forward progress.
pub(crate) fn partition(prims: &mut [PrimRef], split: &Split) -> (usize, PrimInfo, PrimInfo) {
    let mut left_info = PrimInfo::empty();

    let mut i = 0;
    let mut j = prims.len();
    while i < j {
        if split.goes_left(&prims[i]) {
            left_info.add(&prims[i]);
            i += 1;
        } else {
            j -= 1;
            prims.swap(i, j);
        }
    }

    let mid = i;
    if mid == 0 || mid == prims.len() {
        log::trace!(
            "split of {} primitives degenerated on axis {}, using median fallback",
            prims.len(),
            split.axis
        );
        return median_partition(prims, split.axis);
    }

    let right_info = PrimInfo::from_prims(&prims[mid..]);
    (mid, left_info, right_info)
}

/// Deterministic forced split at `count / 2`, ordered by centroid along
/// `axis`. Used when the cost evaluator finds no split (all centroids
/// coincident) and as the degenerate-partition fallback; always makes
/// progress for ranges of two or more primitives.
pub(crate) fn median_partition(prims: &mut [PrimRef], axis: usize) -> (usize, PrimInfo, PrimInfo) {
    debug_assert!(prims.len() >= 2);
    let mid = prims.len() / 2;
    prims.select_nth_unstable_by_key(mid, |prim| OrderedFloat(prim.center()[axis]));

    let left_info = PrimInfo::from_prims(&prims[..mid]);
    let right_info = PrimInfo::from_prims(&prims[mid..]);
    (mid, left_info, right_info)
}
