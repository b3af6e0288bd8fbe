#![forbid(unsafe_code)]

//! Persistent tidy-tree layout kernel.
//!
//! The kernel owns a rooted tree of sized nodes addressed by numeric [`NodeId`]s and computes
//! non-layered tidy positions for it: siblings never overlap (separated by a peer margin), every
//! parent is centered over its first and last child, and each child sits one parent-child margin
//! below the bottom edge of its parent.
//!
//! Two entry points share the same contour bookkeeping:
//!
//! - [`TidyTree::layout`] runs the bulk first/second walk over the whole tree.
//! - [`TidyTree::partial_layout`] re-walks only the changed nodes and their ancestor chains,
//!   reusing the relative positions of every untouched subtree.
//!
//! All traversals use explicit work stacks, so long chains do not grow the call stack.

pub mod error;
pub mod tree;

mod contour;
mod walk;

pub use error::{Error, Result};
pub use tree::{Anchor, NodeId, Point, TidyConfig, TidyTree};
