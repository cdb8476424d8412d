use std::{
    ops::Range,
    sync::atomic::{AtomicUsize, Ordering},
    thread,
};

use arrayvec::ArrayVec;
use itertools::Itertools as _;
use ordered_float::OrderedFloat;
use thiserror::Error;

use crate::{
    binning::{Split, find_best_split},
    geometry::Aabb,
    partition::{median_partition, partition},
    prim_ref::{PrimInfo, PrimRef},
    settings::{BuildSettings, MAX_BRANCHING},
};

/// Node and leaf construction strategy, supplied per build.
///
/// The builder is agnostic to the node representation: it drives the
/// partitioning and calls back into the factory to materialize leaves and
/// internal nodes. `Record` is whatever the factory hands back for a finished
/// subtree; the plain and quantized factories use a bare node handle, the
/// motion blur factory a handle annotated with bounds and a time range.
pub trait NodeFactory: Sync {
    type Record: Send;

    /// Sentinel for a build over zero primitives.
    fn empty(&self) -> Self::Record;

    /// Materialize a leaf over a finished primitive range.
    fn create_leaf(&self, prims: &[PrimRef], bounds: &Aabb) -> Self::Record;

    /// Allocate an internal node before its children are built.
    fn create_inner(&self, child_count: usize) -> Self::Record;

    /// Attach finished children to a node allocated by [`create_inner`],
    /// returning the finalized record.
    ///
    /// [`create_inner`]: NodeFactory::create_inner
    fn set_children(
        &self,
        parent: Self::Record,
        children: &[Self::Record],
        bounds: &[Aabb],
    ) -> Self::Record;
}

#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Continue {
    Continue,
    Stop,
}

/// Periodic build progress callback, also the cancellation point.
///
/// Called once per leaf created with the number of primitives placed into
/// leaves so far and the total. Returning [`Continue::Stop`] unwinds the
/// build; no partial tree is handed back.
pub trait ProgressMonitor: Sync {
    fn report(&self, done: usize, total: usize) -> Continue;
}

impl<F: Fn(usize, usize) -> Continue + Sync> ProgressMonitor for F {
    fn report(&self, done: usize, total: usize) -> Continue {
        self(done, total)
    }
}

/// Monitor that never cancels.
#[derive(Copy, Clone, Debug, Default)]
pub struct NullMonitor;

impl ProgressMonitor for NullMonitor {
    fn report(&self, _done: usize, _total: usize) -> Continue {
        Continue::Continue
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Error)]
pub enum BuildError {
    #[error("invalid build settings: {0}")]
    InvalidSettings(#[from] crate::settings::SettingsError),

    #[error("build cancelled by the progress monitor")]
    Cancelled,
}

/// Builds a BVH over `prims`, returning the root record.
///
/// The slice is permuted in place so that every leaf covers a contiguous
/// range; `info` must describe the slice as passed in. An empty slice yields
/// the factory's empty sentinel without recursing. The resulting partition of
/// primitives into leaves depends only on the input order and the settings,
/// not on the parallel schedule.
pub fn build<F: NodeFactory, M: ProgressMonitor>(
    factory: &F,
    monitor: &M,
    prims: &mut [PrimRef],
    info: PrimInfo,
    settings: &BuildSettings,
) -> Result<F::Record, BuildError> {
    settings.validate()?;
    if prims.is_empty() {
        return Ok(factory.empty());
    }
    assert!(
        info.count == prims.len(),
        "PrimInfo does not match the primitive slice"
    );

    log::debug!(
        "building BVH over {} primitives (branching factor {}, {} bins)",
        prims.len(),
        settings.branching_factor,
        settings.bin_count,
    );

    let context = BuildContext {
        factory,
        monitor,
        settings,
        total: prims.len(),
        placed: AtomicUsize::new(0),
        // Enough fork levels to keep every core busy; past that the scoped
        // threads would only add scheduling overhead.
        parallel_depth: (num_cpus::get().max(1) as u32).ilog2() + 3,
    };
    context.recurse(prims, info, 0)
}

struct BuildContext<'a, F: NodeFactory, M: ProgressMonitor> {
    factory: &'a F,
    monitor: &'a M,
    settings: &'a BuildSettings,
    total: usize,
    placed: AtomicUsize,
    parallel_depth: u32,
}

/// One pending sub-range during the N-ary flattening loop. Ranges index into
/// the slice owned by the current recursion step.
struct Child {
    range: Range<usize>,
    info: PrimInfo,
    /// No beneficial split exists and the range fits in a leaf; keep it as a
    /// future leaf instead of re-picking it.
    done: bool,
}

impl<F: NodeFactory, M: ProgressMonitor> BuildContext<'_, F, M> {
    fn recurse(
        &self,
        prims: &mut [PrimRef],
        info: PrimInfo,
        depth: u32,
    ) -> Result<F::Record, BuildError> {
        debug_assert!(info.count == prims.len());
        let settings = self.settings;

        if depth >= settings.max_depth || info.count <= settings.min_leaf_size {
            return self.create_leaf(prims, &info);
        }

        // Compare the best split against just intersecting everything here.
        // The shared totalArea / intersection_cost factor cancels out of the
        // comparison, leaving the plain primitive count as the leaf cost.
        let entry_split = find_best_split(prims, &info, settings);
        let leaf_is_cheaper = info.count <= settings.max_leaf_size
            && match &entry_split {
                None => true,
                Some(split) => info.count as f32 <= split.cost / settings.intersection_cost,
            };
        if leaf_is_cheaper {
            return self.create_leaf(prims, &info);
        }

        let children = self.flatten_children(prims, info, entry_split);
        debug_assert!(children.len() >= 2);

        let parent = self.factory.create_inner(children.len());
        let bounds: ArrayVec<Aabb, MAX_BRANCHING> =
            children.iter().map(|c| c.info.geom_bounds).collect();
        let records = self.build_children(prims, children, depth)?;

        Ok(self.factory.set_children(parent, &records, &bounds))
    }

    /// Splits the range into up to `branching_factor` sub-ranges, always
    /// re-splitting the widest child (largest bounding-box surface area)
    /// first. The returned children exactly cover the input range and are
    /// ordered by offset.
    fn flatten_children(
        &self,
        prims: &mut [PrimRef],
        info: PrimInfo,
        entry_split: Option<Split>,
    ) -> ArrayVec<Child, MAX_BRANCHING> {
        let settings = self.settings;

        let mut children: ArrayVec<Child, MAX_BRANCHING> = ArrayVec::new();
        children.push(Child {
            range: 0..prims.len(),
            info,
            done: false,
        });
        // The first child picked is always the whole range, whose split the
        // leaf decision already computed.
        let mut entry_split = Some(entry_split);

        while children.len() < settings.branching_factor {
            let Some(pick) = children.iter().position_max_by_key(|c| {
                if c.done || c.info.count <= settings.min_leaf_size {
                    OrderedFloat(f32::NEG_INFINITY)
                } else {
                    OrderedFloat(c.info.geom_bounds.half_area())
                }
            }) else {
                unreachable!("children never empty");
            };
            if children[pick].done || children[pick].info.count <= settings.min_leaf_size {
                break;
            }

            let child = children.remove(pick);
            let sub = &mut prims[child.range.clone()];

            let split = match entry_split.take() {
                Some(split) => split,
                None => find_best_split(sub, &child.info, settings),
            };
            let (mid, left_info, right_info) = match split {
                Some(split) => partition(sub, &split),
                None if child.info.count <= settings.max_leaf_size => {
                    children.push(Child { done: true, ..child });
                    continue;
                }
                None => {
                    // All centroids coincide but the range is too big for a
                    // leaf; force a median split to guarantee progress.
                    log::trace!(
                        "no beneficial split for {} primitives, forcing median split",
                        child.info.count
                    );
                    median_partition(sub, child.info.centroid_bounds.largest_axis())
                }
            };

            let start = child.range.start;
            children.push(Child {
                range: start..start + mid,
                info: left_info,
                done: false,
            });
            children.push(Child {
                range: start + mid..child.range.end,
                info: right_info,
                done: false,
            });
        }

        children.sort_unstable_by_key(|c| c.range.start);
        children
    }

    /// Recurses into the child sub-ranges, forking scoped threads over the
    /// disjoint slices for large ranges. The fork changes only the schedule;
    /// all partitioning happened before this point.
    fn build_children(
        &self,
        prims: &mut [PrimRef],
        children: ArrayVec<Child, MAX_BRANCHING>,
        depth: u32,
    ) -> Result<ArrayVec<F::Record, MAX_BRANCHING>, BuildError> {
        let parallel = prims.len() >= self.settings.parallel_threshold
            && depth < self.parallel_depth;

        if parallel {
            thread::scope(|scope| {
                let mut handles = Vec::with_capacity(children.len());
                let mut rest = prims;
                for child in children {
                    let (sub, tail) = rest.split_at_mut(child.range.len());
                    rest = tail;
                    handles.push(scope.spawn(move || self.recurse(sub, child.info, depth + 1)));
                }
                handles
                    .into_iter()
                    .map(|handle| handle.join().expect("Worker thread panicked!"))
                    .collect()
            })
        } else {
            let mut records = ArrayVec::new();
            let mut rest = prims;
            for child in children {
                let (sub, tail) = rest.split_at_mut(child.range.len());
                rest = tail;
                records.push(self.recurse(sub, child.info, depth + 1)?);
            }
            Ok(records)
        }
    }

    fn create_leaf(&self, prims: &[PrimRef], info: &PrimInfo) -> Result<F::Record, BuildError> {
        let record = self.factory.create_leaf(prims, &info.geom_bounds);
        let placed = self.placed.fetch_add(prims.len(), Ordering::Relaxed) + prims.len();
        match self.monitor.report(placed, self.total) {
            Continue::Continue => Ok(record),
            Continue::Stop => Err(BuildError::Cancelled),
        }
    }
}
