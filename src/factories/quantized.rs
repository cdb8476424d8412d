use arrayvec::ArrayVec;
use index_vec::IndexVec;

use crate::{
    arena::Arena,
    builder::NodeFactory,
    factories::LeafNode,
    geometry::{Aabb, Point3, Vector3},
    node_ref::{InnerNodeId, LeafNodeId, NodeKind, NodeRef},
    prim_ref::PrimRef,
    settings::MAX_BRANCHING,
};

/// Largest grid coordinate of the per-node quantization lattice.
const QUANT_MAX: u32 = u8::MAX as u32;

/// Internal node with child bounds compressed to u8 grid coordinates
/// relative to the node's own bounding box.
///
/// Compression rounds outwards, so the decompressed boxes are conservative:
/// they always contain the exact child bounds, never less. Traversal works on
/// the decompressed values.
#[derive(Clone, Debug)]
pub struct QuantizedNode {
    origin: Point3,
    scale: Vector3,
    qmin: ArrayVec<[u8; 3], MAX_BRANCHING>,
    qmax: ArrayVec<[u8; 3], MAX_BRANCHING>,
    pub child_links: ArrayVec<NodeRef, MAX_BRANCHING>,
}

impl QuantizedNode {
    pub fn child_count(&self) -> usize {
        self.child_links.len()
    }

    /// Decompressed (conservative) bounding box of child `i`.
    pub fn child_bounds(&self, i: usize) -> Aabb {
        let dequant = |q: &[u8; 3]| {
            Point3::new(
                self.origin.x + q[0] as f32 * self.scale.x,
                self.origin.y + q[1] as f32 * self.scale.y,
                self.origin.z + q[2] as f32 * self.scale.z,
            )
        };
        Aabb::new(dequant(&self.qmin[i]), dequant(&self.qmax[i]))
    }

    /// Union of the decompressed child bounds.
    pub fn bounds(&self) -> Aabb {
        let mut result = Aabb::empty();
        for i in 0..self.child_count() {
            result.extend(&self.child_bounds(i));
        }
        result
    }
}

impl Default for QuantizedNode {
    fn default() -> QuantizedNode {
        QuantizedNode {
            origin: Point3::origin(),
            scale: Vector3::zeros(),
            qmin: ArrayVec::new(),
            qmax: ArrayVec::new(),
            child_links: ArrayVec::new(),
        }
    }
}

/// Grid step so that `origin + QUANT_MAX * scale` reaches at least `max`
/// despite rounding; a degenerate axis maps everything to grid zero.
fn axis_scale(origin: f32, max: f32) -> f32 {
    let extent = max - origin;
    if extent > 0.0 {
        let mut scale = extent / QUANT_MAX as f32;
        while origin + QUANT_MAX as f32 * scale < max {
            scale = scale.next_up();
        }
        scale
    } else {
        1.0
    }
}

fn quantize_floor(value: f32, origin: f32, scale: f32) -> u8 {
    let mut q = ((value - origin) / scale).floor().clamp(0.0, QUANT_MAX as f32) as u32;
    while q > 0 && origin + q as f32 * scale > value {
        q -= 1;
    }
    q as u8
}

fn quantize_ceil(value: f32, origin: f32, scale: f32) -> u8 {
    let mut q = ((value - origin) / scale).ceil().clamp(0.0, QUANT_MAX as f32) as u32;
    while q < QUANT_MAX && (origin + q as f32 * scale) < value {
        q += 1;
    }
    q as u8
}

/// The quantized node instantiation: same tree shape as the plain factory,
/// quarter the per-child bounds footprint.
#[derive(Debug)]
pub struct QuantizedNodeFactory {
    inner_nodes: Arena<InnerNodeId, QuantizedNode>,
    leaf_nodes: Arena<LeafNodeId, LeafNode>,
}

impl QuantizedNodeFactory {
    pub fn new() -> QuantizedNodeFactory {
        QuantizedNodeFactory {
            inner_nodes: Arena::new(),
            leaf_nodes: Arena::new(),
        }
    }

    pub fn finish(self, root: NodeRef) -> QuantizedBvh {
        QuantizedBvh {
            root,
            inner_nodes: self.inner_nodes.into_inner(),
            leaf_nodes: self.leaf_nodes.into_inner(),
        }
    }
}

impl Default for QuantizedNodeFactory {
    fn default() -> QuantizedNodeFactory {
        QuantizedNodeFactory::new()
    }
}

impl NodeFactory for QuantizedNodeFactory {
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
        NodeRef::new_inner(self.inner_nodes.alloc(QuantizedNode::default()))
    }

    fn set_children(&self, parent: NodeRef, children: &[NodeRef], bounds: &[Aabb]) -> NodeRef {
        let NodeKind::Inner(id) = parent.decode() else {
            unreachable!("set_children on a non-inner record");
        };

        let mut parent_bounds = Aabb::empty();
        for child_bounds in bounds {
            parent_bounds.extend(child_bounds);
        }
        let origin = parent_bounds.min;
        let scale = Vector3::new(
            axis_scale(origin.x, parent_bounds.max.x),
            axis_scale(origin.y, parent_bounds.max.y),
            axis_scale(origin.z, parent_bounds.max.z),
        );

        self.inner_nodes.update(id, |node| {
            node.origin = origin;
            node.scale = scale;
            node.child_links = children.iter().copied().collect();
            node.qmin = bounds
                .iter()
                .map(|b| {
                    std::array::from_fn(|axis| {
                        quantize_floor(b.min[axis], origin[axis], scale[axis])
                    })
                })
                .collect();
            node.qmax = bounds
                .iter()
                .map(|b| {
                    std::array::from_fn(|axis| {
                        quantize_ceil(b.max[axis], origin[axis], scale[axis])
                    })
                })
                .collect();
        });
        parent
    }
}

/// Finished tree over quantized nodes.
#[derive(Clone, Debug)]
pub struct QuantizedBvh {
    root: NodeRef,
    inner_nodes: IndexVec<InnerNodeId, QuantizedNode>,
    leaf_nodes: IndexVec<LeafNodeId, LeafNode>,
}

impl QuantizedBvh {
    pub fn root(&self) -> NodeRef {
        self.root
    }

    pub fn inner_node(&self, id: InnerNodeId) -> &QuantizedNode {
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

    /// Conservative bounding box of the subtree behind `link`.
    pub fn node_bounds(&self, link: NodeRef) -> Aabb {
        match link.decode() {
            NodeKind::Empty => Aabb::empty(),
            NodeKind::Inner(id) => self.inner_nodes[id].bounds(),
            NodeKind::Leaf(id) => self.leaf_nodes[id].bounds(),
        }
    }

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
