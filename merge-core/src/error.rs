//! Error taxonomy for the tree model and the merge algorithm.
//!
//! Mirrors spec.md §7: tree-mutation errors are always surfaced directly to
//! callers; content and structural conflicts are routed through the
//! pluggable [`crate::conflict_handler::ConflictHandler`] first and only
//! become a hard [`MergeError`] if the handler re-raises (the default
//! handler always does).

use std::fmt::Debug;

use thiserror::Error;

/// Why a `move` was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidMoveReason {
    /// The target parent is the mover itself or one of its descendants.
    Cycle,
    /// The root has no parent and cannot be moved.
    MovingRoot,
}

/// Errors raised by [`crate::tree::Addressable`] and
/// [`crate::tree::Mutable`] operations.
#[derive(Debug, Error)]
pub enum TreeError<K: Debug> {
    #[error("node not found: {0:?}")]
    NodeNotFound(K),
    #[error("duplicate id: {0:?}")]
    DuplicateId(K),
    #[error("invalid move of {mover:?} to parent {target:?}: {reason:?}")]
    InvalidMove {
        mover: K,
        target: K,
        reason: InvalidMoveReason,
    },
    #[error("position {pos} out of range 0..={max}")]
    InvalidPosition { pos: usize, max: usize },
}

impl<K: Debug> TreeError<K> {
    pub fn node_not_found(id: K) -> Self {
        TreeError::NodeNotFound(id)
    }
}

/// Raised by a [`crate::node_merger::NodeMerger`] when an update to an
/// existing node diverges on both branches and cannot be reconciled
/// automatically. Routed through
/// [`crate::conflict_handler::ConflictHandler::conflicting_content`].
#[derive(Debug, Error)]
#[error("content conflict at node {id:?}")]
pub struct ContentConflict<K: Debug, C: Debug> {
    pub id: K,
    pub base: C,
    pub first: C,
    pub second: C,
}

/// Raised when both branches insert a node with the same id but different
/// content (there is no base content to diff against). Routed through
/// [`crate::conflict_handler::ConflictHandler::colliding_content`].
#[derive(Debug, Error)]
#[error("colliding insert content at node {id:?}")]
pub struct CollidingContent<K: Debug, C: Debug> {
    pub id: K,
    pub first: C,
    pub second: C,
}

/// The structural conflict subkinds from spec.md §7.
#[derive(Debug, Error)]
pub enum StructuralConflict<K: Debug> {
    #[error("colliding insert of {first:?} and {second:?} at the same position")]
    CollidingInsert { first: K, second: K },
    #[error("{node:?} placed in mutually incompatible positions")]
    ConflictingPosition { node: K },
    #[error("{id:?} deleted on one side but changed/moved on the other (delete/move)")]
    DeleteMove { id: K },
    #[error("{id:?} deleted on one side but content changed on the other (delete/change)")]
    DeleteChange { id: K },
    #[error("{id:?} moved out of a subtree deleted on the other side")]
    MovedOutOfDeletedSubtree { id: K },
    #[error("{id:?} inserted into a subtree deleted on the other side")]
    InsertedIntoDeletedSubtree { id: K },
    #[error("{id:?} was inserted by one side and the merged tree lost it")]
    InsertedThenDeleted { id: K },
    #[error("merging {id:?} would create a cycle")]
    CyclicMerge { id: K },
}

/// The top-level error returned by [`crate::merger::merge`].
#[derive(Debug, Error)]
pub enum MergeError<K: Debug, C: Debug> {
    #[error(transparent)]
    Tree(#[from] TreeError<K>),
    #[error(transparent)]
    Content(#[from] ContentConflict<K, C>),
    #[error(transparent)]
    CollidingContent(#[from] CollidingContent<K, C>),
    #[error(transparent)]
    Structural(#[from] StructuralConflict<K>),
    /// An assertion about the algorithm's own invariants failed. This
    /// indicates a bug in this crate, not bad input — see spec.md §7.
    #[error("internal error: {0}")]
    Internal(String),
}
