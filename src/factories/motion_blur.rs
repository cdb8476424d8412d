use arrayvec::ArrayVec;
use index_vec::IndexVec;

use crate::{
    arena::Arena,
    builder::NodeFactory,
    factories::LeafNode,
    geometry::Aabb,
    node_ref::{InnerNodeId, LeafNodeId, NodeKind, NodeRef},
    prim_ref::PrimRef,
    settings::MAX_BRANCHING,
};

/// Closed interval of normalized shutter time, `0.0..=1.0` for the full
/// camera shutter.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TimeRange {
    pub start: f32,
    pub end: f32,
}

impl TimeRange {
    pub const UNIT: TimeRange = TimeRange {
        start: 0.0,
        end: 1.0,
    };

    pub fn new(start: f32, end: f32) -> TimeRange {
        TimeRange { start, end }
    }

    pub fn intersection(&self, other: &TimeRange) -> TimeRange {
        TimeRange {
            start: self.start.max(other.start),
            end: self.end.min(other.end),
        }
    }

    pub fn union(&self, other: &TimeRange) -> TimeRange {
        TimeRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.start <= self.end)
    }
}

impl Default for TimeRange {
    fn default() -> TimeRange {
        TimeRange::UNIT
    }
}

/// Finished-subtree record of the motion blur factory: the node handle
/// annotated with the bounds and the shutter interval over which they are
/// valid. A parent's interval is the intersection of its children's, so
/// records shrink towards the root and the tree stays valid over the whole
/// interval stored at any node.
#[derive(Copy, Clone, Debug)]
pub struct NodeRecordMb {
    pub node: NodeRef,
    pub bounds: Aabb,
    pub time_range: TimeRange,
}

/// Internal node for motion blurred geometry: per-child bounds plus the
/// shutter interval each child's bounds cover.
#[derive(Clone, Debug, Default)]
pub struct MotionNode {
    pub child_links: ArrayVec<NodeRef, MAX_BRANCHING>,
    pub child_bounds: ArrayVec<Aabb, MAX_BRANCHING>,
    pub child_time_ranges: ArrayVec<TimeRange, MAX_BRANCHING>,
}

/// The motion blur instantiation. Built over primitive references whose
/// bounds already enclose the motion over `time_range`; the factory threads
/// that interval through every record it hands out.
#[derive(Debug)]
pub struct MotionBlurNodeFactory {
    time_range: TimeRange,
    inner_nodes: Arena<InnerNodeId, MotionNode>,
    leaf_nodes: Arena<LeafNodeId, LeafNode>,
}

impl MotionBlurNodeFactory {
    pub fn new(time_range: TimeRange) -> MotionBlurNodeFactory {
        MotionBlurNodeFactory {
            time_range,
            inner_nodes: Arena::new(),
            leaf_nodes: Arena::new(),
        }
    }

    pub fn finish(self, root: NodeRecordMb) -> MotionBlurBvh {
        MotionBlurBvh {
            root,
            inner_nodes: self.inner_nodes.into_inner(),
            leaf_nodes: self.leaf_nodes.into_inner(),
        }
    }
}

impl NodeFactory for MotionBlurNodeFactory {
    type Record = NodeRecordMb;

    fn empty(&self) -> NodeRecordMb {
        NodeRecordMb {
            node: NodeRef::EMPTY,
            bounds: Aabb::empty(),
            time_range: self.time_range,
        }
    }

    fn create_leaf(&self, prims: &[PrimRef], bounds: &Aabb) -> NodeRecordMb {
        let id = self.leaf_nodes.alloc(LeafNode {
            prims: prims.to_vec(),
        });
        NodeRecordMb {
            node: NodeRef::new_leaf(id),
            bounds: *bounds,
            time_range: self.time_range,
        }
    }

    fn create_inner(&self, _child_count: usize) -> NodeRecordMb {
        NodeRecordMb {
            node: NodeRef::new_inner(self.inner_nodes.alloc(MotionNode::default())),
            bounds: Aabb::empty(),
            time_range: self.time_range,
        }
    }

    fn set_children(
        &self,
        parent: NodeRecordMb,
        children: &[NodeRecordMb],
        bounds: &[Aabb],
    ) -> NodeRecordMb {
        let NodeKind::Inner(id) = parent.node.decode() else {
            unreachable!("set_children on a non-inner record");
        };
        self.inner_nodes.update(id, |node| {
            node.child_links = children.iter().map(|c| c.node).collect();
            node.child_bounds = bounds.iter().copied().collect();
            node.child_time_ranges = children.iter().map(|c| c.time_range).collect();
        });

        let mut record = NodeRecordMb {
            node: parent.node,
            bounds: Aabb::empty(),
            time_range: self.time_range,
        };
        for (child, child_bounds) in children.iter().zip(bounds) {
            record.bounds.extend(child_bounds);
            record.time_range = record.time_range.intersection(&child.time_range);
        }
        record
    }
}

/// Finished tree over motion blur nodes.
#[derive(Clone, Debug)]
pub struct MotionBlurBvh {
    root: NodeRecordMb,
    inner_nodes: IndexVec<InnerNodeId, MotionNode>,
    leaf_nodes: IndexVec<LeafNodeId, LeafNode>,
}

impl MotionBlurBvh {
    pub fn root(&self) -> &NodeRecordMb {
        &self.root
    }

    pub fn inner_node(&self, id: InnerNodeId) -> &MotionNode {
        &self.inner_nodes[id]
    }

    pub fn leaf(&self, id: LeafNodeId) -> &LeafNode {
        &self.leaf_nodes[id]
    }

    pub fn node_count(&self) -> usize {
        self.inner_nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_nodes.len()
    }

    pub fn for_each_leaf(&self, mut f: impl FnMut(&LeafNode)) {
        let mut stack = vec![self.root.node];
        while let Some(link) = stack.pop() {
            match link.decode() {
                NodeKind::Empty => {}
                NodeKind::Inner(id) => {
                    stack.extend(self.inner_nodes[id].child_links.iter().rev().copied());
                }
                NodeKind::Leaf(id) => f(&self.leaf_nodes[id]),
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        builder::{NullMonitor, build},
        geometry::Point3,
        prim_ref::PrimInfo,
        settings::BuildSettings,
    };

    use assert2::assert;
    use itertools::Itertools as _;

    #[test]
    fn time_range_intersection_and_union() {
        let a = TimeRange::new(0.0, 0.6);
        let b = TimeRange::new(0.4, 1.0);
        assert!(a.intersection(&b) == TimeRange::new(0.4, 0.6));
        assert!(a.union(&b) == TimeRange::UNIT);
        assert!(!a.intersection(&b).is_empty());
        assert!(TimeRange::new(0.8, 0.2).is_empty());
    }

    #[test]
    fn set_children_intersects_time_ranges() {
        let factory = MotionBlurNodeFactory::new(TimeRange::new(0.25, 0.75));
        let bounds = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let prims = [PrimRef::new(bounds, 0, 0)];

        let parent = factory.create_inner(2);
        let mut left = factory.create_leaf(&prims, &bounds);
        let right = factory.create_leaf(&prims, &bounds);
        // A child whose bounds are only valid over part of the shutter.
        left.time_range = TimeRange::new(0.5, 1.0);

        let record = factory.set_children(parent, &[left, right], &[bounds, bounds]);
        assert!(record.time_range == TimeRange::new(0.5, 0.75));
        assert!(record.bounds == bounds);

        let bvh = factory.finish(record);
        let NodeKind::Inner(id) = record.node.decode() else {
            panic!("record should be an inner node");
        };
        assert!(bvh.inner_node(id).child_time_ranges[0] == TimeRange::new(0.5, 1.0));
        assert!(bvh.inner_node(id).child_time_ranges[1] == TimeRange::new(0.25, 0.75));
    }

    #[test]
    fn builds_a_tree_with_the_shutter_interval() {
        let prims: Vec<PrimRef> = (0..64)
            .map(|i| {
                let x = i as f32;
                PrimRef::new(
                    Aabb::new(Point3::new(x, 0.0, 0.0), Point3::new(x + 2.0, 1.0, 1.0)),
                    1,
                    i as u32,
                )
            })
            .collect();
        let settings = BuildSettings::builder().max_leaf_size(4).build();

        let mut working = prims.clone();
        let info = PrimInfo::from_prims(&working);
        let factory = MotionBlurNodeFactory::new(TimeRange::UNIT);
        let root = build(&factory, &NullMonitor, &mut working, info, &settings).unwrap();
        assert!(root.time_range == TimeRange::UNIT);
        assert!(root.bounds == info.geom_bounds);

        let bvh = factory.finish(root);
        let mut placed = Vec::new();
        bvh.for_each_leaf(|leaf| placed.extend(leaf.prims.iter().map(|p| p.ids())));
        placed.sort_unstable();
        let expected: Vec<u64> = prims.iter().map(|p| p.ids()).sorted().collect();
        assert!(placed == expected);
    }

    #[test]
    fn empty_build_keeps_the_factory_interval() {
        let factory = MotionBlurNodeFactory::new(TimeRange::new(0.1, 0.9));
        let record = factory.empty();
        assert!(record.node == NodeRef::EMPTY);
        assert!(record.bounds.is_empty());
        assert!(record.time_range == TimeRange::new(0.1, 0.9));
    }
}
