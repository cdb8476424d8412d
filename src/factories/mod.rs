//! The concrete node factory instantiations: plain AABB nodes, quantized
//! nodes and motion blur nodes. Each one is a strategy plugged into
//! [`crate::build`]; swapping the factory swaps the tree representation
//! without touching the builder.

pub mod aabb_node;
pub mod motion_blur;
pub mod quantized;

use crate::{geometry::Aabb, prim_ref::PrimRef};

/// Leaf storage shared by all factory variants: the primitive references of
/// one finished range, copied out of the build slice.
#[derive(Clone, Debug)]
pub struct LeafNode {
    pub prims: Vec<PrimRef>,
}

impl LeafNode {
    pub fn bounds(&self) -> Aabb {
        let mut result = Aabb::empty();
        for prim in &self.prims {
            result.extend(prim.bounds());
        }
        result
    }
}
