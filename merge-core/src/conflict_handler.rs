//! [`ConflictHandler`]: the policy hook from spec.md §4.3. Each hook may
//! resolve a conflict or re-raise; the default handler re-raises on all
//! four, matching spec.md's "fail-on-any-conflict" reference handler.
//!
//! spec.md lets a resolving handler "mutate the passed node holders or
//! advance cursors" in place. This crate narrows that to resolution enums
//! returned from each hook instead of exposing live cursor state to
//! implementors — see DESIGN.md for the open-question writeup.

use std::fmt::Debug;

use crate::error::{CollidingContent, ContentConflict, MergeError};

/// How a `collidingNode` conflict (two different new ids at the same
/// position) is resolved: which side's insert goes first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollidingNodeResolution {
    FirstThenSecond,
    SecondThenFirst,
}

/// How a `conflictingPosition` conflict (one node placed in mutually
/// incompatible positions) is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionResolution {
    KeepFirst,
    KeepSecond,
}

pub trait ConflictHandler<K: Debug, C: Debug> {
    /// Inserts with the same id and different content.
    fn colliding_content(
        &mut self,
        conflict: CollidingContent<K, C>,
    ) -> Result<C, MergeError<K, C>>;

    /// Diverging updates to an existing node.
    fn conflicting_content(
        &mut self,
        conflict: ContentConflict<K, C>,
    ) -> Result<C, MergeError<K, C>>;

    /// Different new ids inserted at the same position.
    fn colliding_node(&mut self, first: &K, second: &K) -> Result<CollidingNodeResolution, MergeError<K, C>>;

    /// The same node placed in mutually incompatible positions.
    fn conflicting_position(&mut self, node: &K) -> Result<PositionResolution, MergeError<K, C>>;
}

/// Re-raises every conflict as a terminating [`MergeError`] — spec.md
/// §4.3's "default handler".
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultConflictHandler;

impl<K, C> ConflictHandler<K, C> for DefaultConflictHandler
where
    K: Debug + Clone,
    C: Debug + Clone,
{
    fn colliding_content(
        &mut self,
        conflict: CollidingContent<K, C>,
    ) -> Result<C, MergeError<K, C>> {
        Err(conflict.into())
    }

    fn conflicting_content(
        &mut self,
        conflict: ContentConflict<K, C>,
    ) -> Result<C, MergeError<K, C>> {
        Err(conflict.into())
    }

    fn colliding_node(&mut self, first: &K, second: &K) -> Result<CollidingNodeResolution, MergeError<K, C>> {
        Err(MergeError::Structural(crate::error::StructuralConflict::CollidingInsert {
            first: first.clone(),
            second: second.clone(),
        }))
    }

    fn conflicting_position(&mut self, node: &K) -> Result<PositionResolution, MergeError<K, C>> {
        Err(MergeError::Structural(crate::error::StructuralConflict::ConflictingPosition {
            node: node.clone(),
        }))
    }
}
