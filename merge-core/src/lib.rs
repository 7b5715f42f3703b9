//! Three-way merge engine for ordered, labeled trees with opaque
//! content/ids (spec.md §1-2).
//!
//! The capability tiers [`tree::Traversable`] → [`tree::Addressable`] →
//! [`mutable_tree::Mutable`] describe what a tree can do; [`MutableTree`]
//! is the one concrete implementation, backing both merge inputs and the
//! output under construction. [`merger::merge`] runs the algorithm itself,
//! pluggable via [`node_merger::NodeMerger`] (content merge) and
//! [`conflict_handler::ConflictHandler`] (conflict policy); feed its
//! result to [`edit_script::generate`] to turn a merge into a replayable
//! edit script.
//!
//! [`html`] is a reference `NodeMerger` for an element/text/comment
//! content domain, exercising the generic core end to end.

pub mod config;
pub mod conflict_handler;
pub mod edit_script;
pub mod error;
pub mod html;
pub mod merger;
pub mod mutable_tree;
pub mod node_merger;
pub mod tree;

pub use config::MergeConfig;
pub use conflict_handler::{CollidingNodeResolution, ConflictHandler, DefaultConflictHandler, PositionResolution};
pub use edit_script::{Edit, EditHandler, EditLog, NodeOrigins, Origin};
pub use error::{CollidingContent, ContentConflict, InvalidMoveReason, MergeError, StructuralConflict, TreeError};
pub use html::{HtmlContent, HtmlNodeMerger};
pub use merger::merge;
pub use mutable_tree::{Mutable, MutableTree};
pub use node_merger::{NodeMerger, NullNodeMerger};
pub use tree::{Addressable, Node, Traversable};
