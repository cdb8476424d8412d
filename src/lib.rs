//! Binned SAH BVH construction.
//!
//! [`build`] drives a top-down binned surface area heuristic build over a
//! slice of [`PrimRef`]s, producing an N-ary tree through a pluggable
//! [`NodeFactory`]. The factories in [`factories`] cover the common node
//! layouts: exact per-child boxes, quantized boxes and motion blurred boxes
//! with shutter intervals.

pub mod arena;
mod binning;
mod builder;
pub mod factories;
pub mod geometry;
pub mod node_ref;
mod partition;
mod prim_ref;
mod settings;

pub use builder::{BuildError, Continue, NodeFactory, NullMonitor, ProgressMonitor, build};
pub use geometry::{Aabb, Point3, Vector3};
pub use node_ref::{InnerNodeId, LeafNodeId, NodeKind, NodeRef};
pub use prim_ref::{PrimInfo, PrimRef};
pub use settings::{BuildSettings, MAX_BINS, MAX_BRANCHING, SettingsError};
