index_vec::define_index_type! {
    pub struct InnerNodeId = u32;
    MAX_INDEX = NodeRef::MAX_INDEX as usize;
    IMPL_RAW_CONVERSIONS = true;
}

index_vec::define_index_type! {
    pub struct LeafNodeId = u32;
    MAX_INDEX = NodeRef::MAX_INDEX as usize;
    IMPL_RAW_CONVERSIONS = true;
}

/// Opaque handle to a constructed node, packed into a single u32.
///
/// The low bit tags inner nodes vs. leaves, the remaining bits carry the
/// arena index. A reserved all-ones pattern is the empty-tree sentinel.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct NodeRef(u32);

/// Decoded form of a [`NodeRef`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Empty,
    Inner(InnerNodeId),
    Leaf(LeafNodeId),
}

impl NodeRef {
    const TAG_BITS: u32 = 1;
    const LEAF_TAG: u32 = 1;
    const EMPTY_VALUE: u32 = u32::MAX;

    pub const MAX_INDEX: u32 = (u32::MAX >> Self::TAG_BITS) - 1;
    pub const EMPTY: Self = Self(Self::EMPTY_VALUE);

    /// Create an inner node handle, panics if the index is out of range
    pub fn new_inner(index: InnerNodeId) -> Self {
        Self(index.raw() << Self::TAG_BITS)
    }

    /// Create a leaf handle, panics if the index is out of range
    pub fn new_leaf(index: LeafNodeId) -> Self {
        Self(index.raw() << Self::TAG_BITS | Self::LEAF_TAG)
    }

    pub fn decode(self) -> NodeKind {
        if self.is_empty() {
            NodeKind::Empty
        } else {
            let index = self.0 >> Self::TAG_BITS;
            if self.0 & Self::LEAF_TAG == 0 {
                NodeKind::Inner(InnerNodeId::from_raw_unchecked(index))
            } else {
                NodeKind::Leaf(LeafNodeId::from_raw_unchecked(index))
            }
        }
    }

    pub fn is_empty(self) -> bool {
        self.0 == Self::EMPTY_VALUE
    }
}

impl Default for NodeRef {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl std::fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRef")
            .field("0", &self.0)
            .field("<decoded>", &self.decode())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use assert2::{assert, let_assert};
    use test_strategy::proptest;

    #[proptest]
    fn construction_inner(#[strategy(0u32..=NodeRef::MAX_INDEX)] index: u32) {
        let node = NodeRef::new_inner(index.into());
        let_assert!(NodeKind::Inner(decoded) = node.decode());
        assert!(decoded.raw() == index);
        assert!(!node.is_empty());
    }

    #[proptest]
    fn construction_leaf(#[strategy(0u32..=NodeRef::MAX_INDEX)] index: u32) {
        let node = NodeRef::new_leaf(index.into());
        let_assert!(NodeKind::Leaf(decoded) = node.decode());
        assert!(decoded.raw() == index);
        assert!(!node.is_empty());
    }

    #[test]
    fn construction_empty() {
        assert!(NodeRef::EMPTY.decode() == NodeKind::Empty);
        assert!(NodeRef::EMPTY.is_empty());
        assert!(NodeRef::default() == NodeRef::EMPTY);
    }

    #[test]
    #[should_panic]
    fn inner_index_out_of_range() {
        NodeRef::new_inner((NodeRef::MAX_INDEX + 1).into());
    }

    #[test]
    #[should_panic]
    fn leaf_index_out_of_range() {
        NodeRef::new_leaf((NodeRef::MAX_INDEX + 1).into());
    }
}
