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

/// Internal node with exact per-child float bounding boxes.
#[derive(Clone, Debug, Default)]
pub struct InnerNode {
    pub child_bounds: ArrayVec<Aabb, MAX_BRANCHING>,
    pub child_links: ArrayVec<NodeRef, MAX_BRANCHING>,
}

/// The plain AABB node instantiation. Nodes and leaves live in two arenas
/// carved concurrently during the build; [`AabbNodeFactory::finish`] releases
/// them into an immutable [`Bvh`].
#[derive(Debug)]
pub struct AabbNodeFactory {
    inner_nodes: Arena<InnerNodeId, InnerNode>,
    leaf_nodes: Arena<LeafNodeId, LeafNode>,
}

impl Default for AabbNodeFactory {
    fn default() -> AabbNodeFactory {
        AabbNodeFactory::new()
    }
}

impl AabbNodeFactory {
    pub fn new() -> AabbNodeFactory {
        AabbNodeFactory {
            inner_nodes: Arena::new(),
            leaf_nodes: Arena::new(),
        }
    }

    pub fn finish(self, root: NodeRef) -> Bvh {
        Bvh {
            root,
            inner_nodes: self.inner_nodes.into_inner(),
            leaf_nodes: self.leaf_nodes.into_inner(),
        }
    }
}

impl NodeFactory for AabbNodeFactory {
    type Record = NodeRef;

    fn empty(&self) -> NodeRef {
        NodeRef::EMPTY
    }

    fn create_leaf(&self, prims: &[PrimRef], _bounds: &Aabb) -> NodeRef {
        NodeRef::new_leaf(self.leaf_nodes.alloc(LeafNode {
            prims: prims.to_vec(),
        }))
    }

    fn create_inner(&self, _child_count: usize) -> NodeRef {
        NodeRef::new_inner(self.inner_nodes.alloc(InnerNode::default()))
    }

    fn set_children(&self, parent: NodeRef, children: &[NodeRef], bounds: &[Aabb]) -> NodeRef {
        let NodeKind::Inner(id) = parent.decode() else {
            unreachable!("set_children on a non-inner record");
        };
        self.inner_nodes.update(id, |node| {
            node.child_links = children.iter().copied().collect();
            node.child_bounds = bounds.iter().copied().collect();
        });
        parent
    }
}

/// Finished tree over plain AABB nodes.
#[derive(Clone, Debug)]
pub struct Bvh {
    root: NodeRef,
    inner_nodes: IndexVec<InnerNodeId, InnerNode>,
    leaf_nodes: IndexVec<LeafNodeId, LeafNode>,
}

impl Bvh {
    pub fn root(&self) -> NodeRef {
        self.root
    }

    pub fn inner_node(&self, id: InnerNodeId) -> &InnerNode {
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

    /// Bounding box of the whole tree.
    pub fn bounds(&self) -> Aabb {
        self.node_bounds(self.root)
    }

    /// Bounding box of the subtree behind `link`, recomputed from storage.
    pub fn node_bounds(&self, link: NodeRef) -> Aabb {
        match link.decode() {
            NodeKind::Empty => Aabb::empty(),
            NodeKind::Inner(id) => {
                let mut result = Aabb::empty();
                for child_bounds in &self.inner_nodes[id].child_bounds {
                    result.extend(child_bounds);
                }
                result
            }
            NodeKind::Leaf(id) => self.leaf_nodes[id].bounds(),
        }
    }

    /// Visits every leaf, depth first in child order.
    pub fn for_each_leaf(&self, mut f: impl FnMut(&LeafNode)) {
        let mut stack = vec![self.root];
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
    use crate::geometry::Point3;

    use assert2::assert;

    fn prim(x: f32, id: u32) -> PrimRef {
        PrimRef::new(
            Aabb::new(Point3::new(x, 0.0, 0.0), Point3::new(x + 1.0, 1.0, 1.0)),
            0,
            id,
        )
    }

    #[test]
    fn factory_assembles_a_two_leaf_tree() {
        let factory = AabbNodeFactory::new();
        let left_prims = [prim(0.0, 0), prim(1.0, 1)];
        let right_prims = [prim(10.0, 2)];

        let left_bounds = left_prims[0].bounds().union(left_prims[1].bounds());
        let right_bounds = *right_prims[0].bounds();

        let parent = factory.create_inner(2);
        let left = factory.create_leaf(&left_prims, &left_bounds);
        let right = factory.create_leaf(&right_prims, &right_bounds);
        let root = factory.set_children(parent, &[left, right], &[left_bounds, right_bounds]);
        let bvh = factory.finish(root);

        assert!(bvh.node_count() == 1);
        assert!(bvh.leaf_count() == 2);
        assert!(bvh.bounds() == left_bounds.union(&right_bounds));
        assert!(bvh.node_bounds(left) == left_bounds);

        let mut visited = Vec::new();
        bvh.for_each_leaf(|leaf| visited.push(leaf.prims.len()));
        assert!(visited == vec![2, 1]);
    }

    #[test]
    fn empty_record_is_the_sentinel() {
        let factory = AabbNodeFactory::new();
        assert!(factory.empty() == NodeRef::EMPTY);
        let bvh = factory.finish(NodeRef::EMPTY);
        assert!(bvh.bounds().is_empty());
        bvh.for_each_leaf(|_| panic!("empty tree has no leaves"));
    }
}
